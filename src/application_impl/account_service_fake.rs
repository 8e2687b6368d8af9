use crate::application_port::*;
use crate::domain_model::*;
use std::collections::HashMap;
use std::sync::Mutex;

struct FakeAccount {
    account: Account,
    password: String,
}

#[derive(Default)]
struct Accounts {
    next_id: u64,
    by_username: HashMap<String, FakeAccount>,
}

/// In-process account service for local runs and tests.
///
/// Passwords are kept in plain text; never point this at real users.
#[derive(Default)]
pub struct FakeAccountService {
    accounts: Mutex<Accounts>,
}

impl FakeAccountService {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_accounts<T>(
        &self,
        f: impl FnOnce(&mut Accounts) -> T,
    ) -> Result<T, AccountServiceError> {
        let mut accounts = self
            .accounts
            .lock()
            .map_err(|_| AccountServiceError::Transport("fake account store poisoned".into()))?;
        Ok(f(&mut accounts))
    }
}

#[async_trait::async_trait]
impl AccountService for FakeAccountService {
    async fn create_account(
        &self,
        account: NewAccount,
        password: &str,
    ) -> Result<AccountId, AccountServiceError> {
        self.with_accounts(|accounts| {
            if accounts.by_username.contains_key(&account.username) {
                return AccountId(0);
            }
            accounts.next_id += 1;
            let id = AccountId(accounts.next_id);
            let phone_number = account
                .phone_number
                .map(|p| format!("{} {}", p.country_code, p.number))
                .unwrap_or_default();
            accounts.by_username.insert(
                account.username.clone(),
                FakeAccount {
                    account: Account {
                        id,
                        username: account.username,
                        fullname: account.fullname,
                        email: account.email,
                        phone_number,
                    },
                    password: password.to_string(),
                },
            );
            id
        })
    }

    async fn check_account_valid(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AccountId, AccountServiceError> {
        self.with_accounts(|accounts| match accounts.by_username.get(username) {
            Some(found) if found.password == password => found.account.id,
            _ => AccountId(0),
        })
    }

    async fn is_username_taken(&self, username: &str) -> Result<bool, AccountServiceError> {
        self.with_accounts(|accounts| accounts.by_username.contains_key(username))
    }

    async fn get_account(&self, account_id: AccountId) -> Result<Account, AccountServiceError> {
        self.with_accounts(|accounts| {
            accounts
                .by_username
                .values()
                .find(|a| a.account.id == account_id)
                .map(|a| a.account.clone())
        })?
        .ok_or(AccountServiceError::NotFound)
    }
}
