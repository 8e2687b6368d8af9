use crate::domain_model::{Account, AccountId, NewAccount};

#[derive(Debug, thiserror::Error)]
pub enum AccountServiceError {
    #[error("account not found")]
    NotFound,
    #[error("account service transport error: {0}")]
    Transport(String),
}

/// Remote service owning account records and password checks.
#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// Returns the new id, or `AccountId(0)` if the service declined to create it.
    async fn create_account(
        &self,
        account: NewAccount,
        password: &str,
    ) -> Result<AccountId, AccountServiceError>;
    /// Returns `AccountId(0)` when the credentials do not match an account.
    async fn check_account_valid(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AccountId, AccountServiceError>;
    async fn is_username_taken(&self, username: &str) -> Result<bool, AccountServiceError>;
    async fn get_account(&self, account_id: AccountId) -> Result<Account, AccountServiceError>;
}
