use crate::application_port::*;
use crate::domain_model::*;
use std::time::Duration;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tracing::error;

/// Wire messages of `account_service.AccountService`.
mod wire {
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct AccountInfo {
        #[prost(string, tag = "1")]
        pub username: String,
        #[prost(string, tag = "2")]
        pub fullname: String,
        #[prost(string, tag = "3")]
        pub email: String,
        #[prost(string, tag = "4")]
        pub phone_number: String,
        #[prost(int32, tag = "5")]
        pub role: i32,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct CreateAccountRequest {
        #[prost(message, optional, tag = "1")]
        pub account_info: Option<AccountInfo>,
        #[prost(string, tag = "2")]
        pub password: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct CreateAccountResponse {
        #[prost(uint64, tag = "1")]
        pub account_id: u64,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct CheckAccountValidRequest {
        #[prost(string, tag = "1")]
        pub username: String,
        #[prost(string, tag = "2")]
        pub password: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct CheckAccountValidResponse {
        #[prost(uint64, tag = "1")]
        pub account_id: u64,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct IsUsernameTakenRequest {
        #[prost(string, tag = "1")]
        pub username: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct IsUsernameTakenResponse {
        #[prost(bool, tag = "1")]
        pub is_taken: bool,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct GetAccountRequest {
        #[prost(uint64, tag = "1")]
        pub account_id: u64,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct GetAccountResponse {
        #[prost(message, optional, tag = "1")]
        pub account: Option<AccountInfo>,
    }
}

use wire::*;

const CREATE_ACCOUNT: &str = "/account_service.AccountService/CreateAccount";
const CHECK_ACCOUNT_VALID: &str = "/account_service.AccountService/CheckAccountValid";
const IS_USERNAME_TAKEN: &str = "/account_service.AccountService/IsUsernameTaken";
const GET_ACCOUNT: &str = "/account_service.AccountService/GetAccount";

/// Members are created with the "member" role.
const MEMBER_ROLE: i32 = 2;

pub struct GrpcAccountService {
    channel: Channel,
}

impl GrpcAccountService {
    /// Build a client that dials `address` on first use.
    pub fn connect_lazy(address: &str, timeout: Duration) -> Result<Self, AccountServiceError> {
        let channel = Endpoint::from_shared(address.to_string())
            .map_err(|e| AccountServiceError::Transport(e.to_string()))?
            .connect_timeout(timeout)
            .timeout(timeout)
            .connect_lazy();
        Ok(GrpcAccountService { channel })
    }

    async fn unary<Req, Resp>(
        &self,
        method: &'static str,
        request: Req,
    ) -> Result<Resp, AccountServiceError>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = Grpc::new(self.channel.clone());
        grpc.ready().await.map_err(|e| {
            error!(%e, method, "account service not ready");
            AccountServiceError::Transport(e.to_string())
        })?;
        let codec: ProstCodec<Req, Resp> = ProstCodec::default();
        grpc.unary(
            tonic::Request::new(request),
            PathAndQuery::from_static(method),
            codec,
        )
        .await
        .map(tonic::Response::into_inner)
        .map_err(|status| match status.code() {
            tonic::Code::NotFound => AccountServiceError::NotFound,
            _ => {
                error!(
                    code = ?status.code(),
                    message = status.message(),
                    method,
                    "account service call failed"
                );
                AccountServiceError::Transport(status.to_string())
            }
        })
    }
}

#[async_trait::async_trait]
impl AccountService for GrpcAccountService {
    async fn create_account(
        &self,
        account: NewAccount,
        password: &str,
    ) -> Result<AccountId, AccountServiceError> {
        let phone_number = account
            .phone_number
            .map(|p| format!("{} {}", p.country_code, p.number))
            .unwrap_or_default();
        let request = CreateAccountRequest {
            account_info: Some(AccountInfo {
                username: account.username,
                fullname: account.fullname,
                email: account.email,
                phone_number,
                role: MEMBER_ROLE,
            }),
            password: password.to_string(),
        };
        let response: CreateAccountResponse = self.unary(CREATE_ACCOUNT, request).await?;
        Ok(AccountId(response.account_id))
    }

    async fn check_account_valid(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AccountId, AccountServiceError> {
        let request = CheckAccountValidRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response: CheckAccountValidResponse =
            self.unary(CHECK_ACCOUNT_VALID, request).await?;
        Ok(AccountId(response.account_id))
    }

    async fn is_username_taken(&self, username: &str) -> Result<bool, AccountServiceError> {
        let request = IsUsernameTakenRequest {
            username: username.to_string(),
        };
        let response: IsUsernameTakenResponse = self.unary(IS_USERNAME_TAKEN, request).await?;
        Ok(response.is_taken)
    }

    async fn get_account(&self, account_id: AccountId) -> Result<Account, AccountServiceError> {
        let request = GetAccountRequest {
            account_id: account_id.0,
        };
        let response: GetAccountResponse = self.unary(GET_ACCOUNT, request).await?;
        let info = response.account.ok_or(AccountServiceError::NotFound)?;
        Ok(Account {
            id: account_id,
            username: info.username,
            fullname: info.fullname,
            email: info.email,
            phone_number: info.phone_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_unparseable_address() {
        let result = GrpcAccountService::connect_lazy("not a uri", Duration::from_secs(1));
        assert!(matches!(result, Err(AccountServiceError::Transport(_))));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        let service =
            GrpcAccountService::connect_lazy("http://127.0.0.1:1", Duration::from_millis(200))
                .unwrap();
        let result = service.is_username_taken("alice").await;
        assert!(matches!(result, Err(AccountServiceError::Transport(_))));
    }
}
