use crate::application_port::*;
use crate::domain_model::{AccountId, NewAccount, PhoneNumber};
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const USERNAME_TAKEN: &str = "username is taken";
const INVALID_CREDENTIALS: &str = "invalid username or password";
const INVALID_REFRESH_TOKEN: &str = "invalid or expired refresh token";
const REFRESH_TOKEN_REQUIRED: &str = "refresh token is required";

pub struct RealSessionService {
    account_service: Arc<dyn AccountService>,
    token_issuer: Arc<dyn TokenIssuer>,
    refresh_tokens: RefreshTokenStore,
    reservations: UsernameReservations,
    rotation: RotationMode,
}

impl RealSessionService {
    pub fn new(
        account_service: Arc<dyn AccountService>,
        token_issuer: Arc<dyn TokenIssuer>,
        cache: Arc<dyn CacheStore>,
        rotation: RotationMode,
    ) -> Self {
        Self {
            account_service,
            token_issuer,
            refresh_tokens: RefreshTokenStore::new(cache.clone()),
            reservations: UsernameReservations::new(cache),
            rotation,
        }
    }

    fn ttl_until(until: DateTime<Utc>) -> Duration {
        (until - Utc::now())
            .to_std()
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or(Duration::from_secs(1))
    }

    fn internal<E: Display>(context: &'static str) -> impl FnOnce(E) -> SessionError {
        move |e| {
            error!(error = %e, "{}", context);
            SessionError::Internal(context.to_string())
        }
    }

    fn require_token(token: Option<&str>) -> Result<&str, SessionError> {
        match token.map(str::trim) {
            Some(t) if !t.is_empty() => Ok(t),
            _ => Err(SessionError::BadRequest(REFRESH_TOKEN_REQUIRED.to_string())),
        }
    }

    fn trimmed_account(account: NewAccount) -> NewAccount {
        NewAccount {
            username: account.username.trim().to_string(),
            fullname: account.fullname.trim().to_string(),
            email: account.email.trim().to_string(),
            phone_number: account.phone_number.map(|p| PhoneNumber {
                country_code: p.country_code.trim().to_string(),
                number: p.number.trim().to_string(),
            }),
        }
    }

    /// Mint an access/refresh pair and persist the refresh record.
    async fn issue(
        &self,
        account_id: AccountId,
        lifetime: RefreshLifetime,
    ) -> Result<IssuedTokens, SessionError> {
        let (access_token, access_token_expires_at) = self
            .token_issuer
            .generate_access_token(account_id)
            .map_err(Self::internal("failed to generate access token"))?;
        let (refresh_token, refresh_expires_at) = self
            .token_issuer
            .generate_refresh_token(lifetime)
            .map_err(Self::internal("failed to generate refresh token"))?;

        let refresh_token_ttl = Self::ttl_until(refresh_expires_at);
        self.refresh_tokens
            .set(&refresh_token.0, account_id, refresh_token_ttl)
            .await
            .map_err(Self::internal("failed to save refresh token"))?;

        Ok(IssuedTokens {
            account_id,
            access_token,
            access_token_expires_at,
            refresh_token,
            refresh_token_ttl,
        })
    }
}

#[async_trait::async_trait]
impl SessionService for RealSessionService {
    async fn signup(&self, input: SignupInput) -> Result<String, SessionError> {
        let account = Self::trimmed_account(input.account);
        let password = input.password.trim();
        if account.username.is_empty()
            || account.fullname.is_empty()
            || account.email.is_empty()
            || password.is_empty()
        {
            return Err(SessionError::BadRequest(
                "username, password, fullname and email are required".to_string(),
            ));
        }
        let username = account.username.clone();

        match self.reservations.has(&username).await {
            Ok(true) => return Err(SessionError::BadRequest(USERNAME_TAKEN.to_string())),
            Ok(false) => {}
            Err(e) => warn!(%e, %username, "reservation lookup failed, asking account service"),
        }

        let taken = self
            .account_service
            .is_username_taken(&username)
            .await
            .map_err(Self::internal("failed to check username availability"))?;
        if taken {
            if let Err(e) = self.reservations.add(&username).await {
                warn!(%e, %username, "failed to record taken username");
            }
            return Err(SessionError::BadRequest(USERNAME_TAKEN.to_string()));
        }

        let account_id = self
            .account_service
            .create_account(account, password)
            .await
            .map_err(Self::internal("failed to create account"))?;
        if !account_id.is_valid() {
            return Err(SessionError::BadRequest(
                "account service declined to create the account".to_string(),
            ));
        }

        info!(%account_id, %username, "account created");
        Ok(username)
    }

    async fn signin(&self, input: SigninInput) -> Result<SigninResult, SessionError> {
        let username = input.username.trim();
        let password = input.password.trim();
        if username.is_empty() || password.is_empty() {
            return Err(SessionError::BadRequest(INVALID_CREDENTIALS.to_string()));
        }

        let account_id = self
            .account_service
            .check_account_valid(username, password)
            .await
            .map_err(Self::internal("failed to check account credentials"))?;
        if !account_id.is_valid() {
            return Err(SessionError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let lifetime = if input.remember_me {
            RefreshLifetime::Extended
        } else {
            RefreshLifetime::Standard
        };
        let tokens = self.issue(account_id, lifetime).await?;

        info!(%account_id, remember_me = input.remember_me, "signed in");
        Ok(SigninResult {
            username: username.to_string(),
            tokens,
        })
    }

    async fn refresh(&self, refresh_token: Option<&str>) -> Result<IssuedTokens, SessionError> {
        let old = Self::require_token(refresh_token)?;

        let lookup = match self.rotation {
            RotationMode::Lenient => self.refresh_tokens.get(old).await,
            RotationMode::Strict => self.refresh_tokens.take(old).await,
        };
        let account_id = match lookup {
            Ok(id) if id.is_valid() => id,
            Ok(_) | Err(CacheError::Miss) => {
                return Err(SessionError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()));
            }
            Err(e) => return Err(Self::internal("failed to look up refresh token")(e)),
        };

        // Rotation never carries the extended "remember me" lifetime forward.
        let tokens = self.issue(account_id, RefreshLifetime::Standard).await?;

        if self.rotation == RotationMode::Lenient {
            if let Err(e) = self.refresh_tokens.del(old).await {
                warn!(%e, %account_id, "failed to delete rotated refresh token");
            }
        }

        Ok(tokens)
    }

    async fn signout(&self, refresh_token: Option<&str>) -> Result<(), SessionError> {
        let token = Self::require_token(refresh_token)?;
        self.refresh_tokens
            .del(token)
            .await
            .map_err(Self::internal("failed to delete refresh token"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{FakeAccountService, JwtHs256Issuer, TokenConfig};
    use crate::domain_model::Account;
    use crate::infra::RamCacheStore;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const SHORT_TTL: Duration = Duration::from_secs(3600);
    const LONG_TTL: Duration = Duration::from_secs(30 * 24 * 3600);

    /// Counts uniqueness checks and can simulate an unreachable service.
    #[derive(Default)]
    struct ProbeAccountService {
        inner: FakeAccountService,
        taken_checks: AtomicUsize,
        offline: AtomicBool,
    }

    impl ProbeAccountService {
        fn check(&self) -> Result<(), AccountServiceError> {
            if self.offline.load(Ordering::SeqCst) {
                Err(AccountServiceError::Transport("connection refused".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait::async_trait]
    impl AccountService for ProbeAccountService {
        async fn create_account(
            &self,
            account: NewAccount,
            password: &str,
        ) -> Result<AccountId, AccountServiceError> {
            self.check()?;
            self.inner.create_account(account, password).await
        }

        async fn check_account_valid(
            &self,
            username: &str,
            password: &str,
        ) -> Result<AccountId, AccountServiceError> {
            self.check()?;
            self.inner.check_account_valid(username, password).await
        }

        async fn is_username_taken(&self, username: &str) -> Result<bool, AccountServiceError> {
            self.check()?;
            self.taken_checks.fetch_add(1, Ordering::SeqCst);
            self.inner.is_username_taken(username).await
        }

        async fn get_account(&self, id: AccountId) -> Result<Account, AccountServiceError> {
            self.check()?;
            self.inner.get_account(id).await
        }
    }

    /// RAM cache whose deletes can be made to fail and whose reads can hand
    /// control back to the scheduler, so concurrent callers interleave.
    #[derive(Default)]
    struct FlakyCache {
        inner: RamCacheStore,
        fail_del: AtomicBool,
        yield_after_read: AtomicBool,
    }

    impl FlakyCache {
        async fn after_read<T>(&self, result: T) -> T {
            if self.yield_after_read.load(Ordering::SeqCst) {
                tokio::task::yield_now().await;
            }
            result
        }
    }

    #[async_trait::async_trait]
    impl CacheStore for FlakyCache {
        async fn set(&self, key: &str, value: CacheValue, ttl: Duration) -> Result<(), CacheError> {
            self.inner.set(key, value, ttl).await
        }
        async fn get(&self, key: &str) -> Result<CacheValue, CacheError> {
            let result = self.inner.get(key).await;
            self.after_read(result).await
        }
        async fn take(&self, key: &str) -> Result<CacheValue, CacheError> {
            let result = self.inner.take(key).await;
            self.after_read(result).await
        }
        async fn del(&self, keys: &[&str]) -> Result<(), CacheError> {
            if self.fail_del.load(Ordering::SeqCst) {
                return Err(CacheError::Store("connection reset".into()));
            }
            self.inner.del(keys).await
        }
        async fn add_to_set(&self, key: &str, members: &[&str]) -> Result<(), CacheError> {
            self.inner.add_to_set(key, members).await
        }
        async fn is_member(&self, key: &str, member: &str) -> Result<bool, CacheError> {
            self.inner.is_member(key, member).await
        }
    }

    struct Fixture {
        accounts: Arc<ProbeAccountService>,
        cache: Arc<FlakyCache>,
        service: RealSessionService,
    }

    impl Fixture {
        fn new(rotation: RotationMode) -> Self {
            let accounts = Arc::new(ProbeAccountService::default());
            let cache = Arc::new(FlakyCache::default());
            let issuer = Arc::new(JwtHs256Issuer::new(TokenConfig {
                secret: b"test-secret-key-123".to_vec(),
                access_ttl: Duration::from_secs(900),
                refresh_ttl: SHORT_TTL,
                refresh_long_ttl: LONG_TTL,
                refresh_token_bytes: 64,
            }));
            let service =
                RealSessionService::new(accounts.clone(), issuer, cache.clone(), rotation);
            Fixture {
                accounts,
                cache,
                service,
            }
        }

        fn refresh_tokens(&self) -> RefreshTokenStore {
            RefreshTokenStore::new(self.cache.clone())
        }

        async fn register(&self, username: &str, password: &str) {
            self.service
                .signup(signup_input(username, password))
                .await
                .unwrap();
        }

        async fn signin(&self, username: &str, password: &str) -> SigninResult {
            self.service
                .signin(SigninInput {
                    username: username.into(),
                    password: password.into(),
                    remember_me: false,
                })
                .await
                .unwrap()
        }
    }

    fn signup_input(username: &str, password: &str) -> SignupInput {
        SignupInput {
            account: NewAccount {
                username: username.into(),
                fullname: "Test User".into(),
                email: "test@example.com".into(),
                phone_number: None,
            },
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn signup_trims_and_returns_username() {
        let f = Fixture::new(RotationMode::Lenient);
        let username = f
            .service
            .signup(signup_input("  alice ", " correct "))
            .await
            .unwrap();
        assert_eq!(username, "alice");
        assert!(f.accounts.inner.is_username_taken("alice").await.unwrap());
    }

    #[tokio::test]
    async fn signup_rejects_blank_fields() {
        let f = Fixture::new(RotationMode::Lenient);
        let result = f.service.signup(signup_input("   ", "pw")).await;
        assert!(matches!(result, Err(SessionError::BadRequest(_))));
        assert_eq!(f.accounts.taken_checks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn taken_username_is_reserved_and_short_circuits() {
        let f = Fixture::new(RotationMode::Lenient);
        f.register("alice", "pw").await;

        let second = f.service.signup(signup_input("alice", "pw")).await;
        assert!(matches!(second, Err(SessionError::BadRequest(m)) if m == USERNAME_TAKEN));
        assert_eq!(f.accounts.taken_checks.load(Ordering::SeqCst), 2);

        let third = f.service.signup(signup_input("alice", "pw")).await;
        assert!(matches!(third, Err(SessionError::BadRequest(_))));
        assert_eq!(f.accounts.taken_checks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn signup_transport_failure_is_internal() {
        let f = Fixture::new(RotationMode::Lenient);
        f.accounts.offline.store(true, Ordering::SeqCst);
        let result = f.service.signup(signup_input("alice", "pw")).await;
        assert!(matches!(result, Err(SessionError::Internal(_))));
    }

    #[tokio::test]
    async fn signin_stores_refresh_token_with_standard_ttl() {
        let f = Fixture::new(RotationMode::Lenient);
        f.register("alice", "correct").await;
        let result = f.signin("alice", "correct").await;

        assert_eq!(result.username, "alice");
        assert!(!result.tokens.access_token.0.is_empty());
        assert!(result.tokens.refresh_token_ttl <= SHORT_TTL);
        assert!(result.tokens.refresh_token_ttl > SHORT_TTL - Duration::from_secs(5));
        let stored = f
            .refresh_tokens()
            .get(&result.tokens.refresh_token.0)
            .await
            .unwrap();
        assert_eq!(stored, result.tokens.account_id);
    }

    #[tokio::test]
    async fn remember_me_uses_extended_ttl() {
        let f = Fixture::new(RotationMode::Lenient);
        f.register("alice", "correct").await;
        let result = f
            .service
            .signin(SigninInput {
                username: "alice".into(),
                password: "correct".into(),
                remember_me: true,
            })
            .await
            .unwrap();
        assert!(result.tokens.refresh_token_ttl > SHORT_TTL);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized_and_stores_nothing() {
        let f = Fixture::new(RotationMode::Lenient);
        f.register("alice", "correct").await;
        let before = f.cache.inner.len().unwrap();
        let result = f
            .service
            .signin(SigninInput {
                username: "alice".into(),
                password: "wrong".into(),
                remember_me: false,
            })
            .await;
        assert!(matches!(result, Err(SessionError::Unauthorized(_))));
        assert_eq!(f.cache.inner.len().unwrap(), before);
    }

    #[tokio::test]
    async fn blank_signin_is_bad_request() {
        let f = Fixture::new(RotationMode::Lenient);
        let result = f
            .service
            .signin(SigninInput {
                username: " ".into(),
                password: "pw".into(),
                remember_me: false,
            })
            .await;
        assert!(matches!(result, Err(SessionError::BadRequest(_))));
    }

    #[tokio::test]
    async fn refresh_rotates_the_token() {
        for mode in [RotationMode::Lenient, RotationMode::Strict] {
            let f = Fixture::new(mode);
            f.register("alice", "correct").await;
            let signed_in = f.signin("alice", "correct").await;
            let old = signed_in.tokens.refresh_token.0;

            let rotated = f.service.refresh(Some(&old)).await.unwrap();
            assert_ne!(rotated.refresh_token.0, old);
            assert!(f.refresh_tokens().get(&old).await.unwrap_err().is_miss());
            assert_eq!(
                f.refresh_tokens().get(&rotated.refresh_token.0).await.unwrap(),
                signed_in.tokens.account_id
            );

            let reused = f.service.refresh(Some(&old)).await;
            assert!(matches!(reused, Err(SessionError::Unauthorized(_))));
        }
    }

    #[tokio::test]
    async fn rotation_drops_remember_me_lifetime() {
        let f = Fixture::new(RotationMode::Lenient);
        f.register("alice", "correct").await;
        let signed_in = f
            .service
            .signin(SigninInput {
                username: "alice".into(),
                password: "correct".into(),
                remember_me: true,
            })
            .await
            .unwrap();
        let rotated = f
            .service
            .refresh(Some(&signed_in.tokens.refresh_token.0))
            .await
            .unwrap();
        assert!(rotated.refresh_token_ttl <= SHORT_TTL);
    }

    #[tokio::test]
    async fn refresh_requires_a_known_token() {
        let f = Fixture::new(RotationMode::Lenient);
        assert!(matches!(
            f.service.refresh(None).await,
            Err(SessionError::BadRequest(_))
        ));
        assert!(matches!(
            f.service.refresh(Some("  ")).await,
            Err(SessionError::BadRequest(_))
        ));
        assert!(matches!(
            f.service.refresh(Some("never-stored")).await,
            Err(SessionError::Unauthorized(m)) if m == INVALID_REFRESH_TOKEN
        ));
    }

    #[tokio::test]
    async fn zero_account_record_is_unauthorized() {
        let f = Fixture::new(RotationMode::Lenient);
        f.refresh_tokens()
            .set("zero", AccountId(0), Duration::ZERO)
            .await
            .unwrap();
        assert!(matches!(
            f.service.refresh(Some("zero")).await,
            Err(SessionError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn failed_delete_of_old_token_does_not_fail_refresh() {
        let f = Fixture::new(RotationMode::Lenient);
        f.register("alice", "correct").await;
        let signed_in = f.signin("alice", "correct").await;
        f.cache.fail_del.store(true, Ordering::SeqCst);
        let rotated = f
            .service
            .refresh(Some(&signed_in.tokens.refresh_token.0))
            .await;
        assert!(rotated.is_ok());
    }

    /// Both refreshes read the old record before either finishes rotating.
    async fn concurrent_refresh_winners(rotation: RotationMode) -> u8 {
        let f = Fixture::new(rotation);
        f.register("alice", "correct").await;
        let old = f.signin("alice", "correct").await.tokens.refresh_token.0;
        f.cache.yield_after_read.store(true, Ordering::SeqCst);
        let (a, b) = tokio::join!(f.service.refresh(Some(&old)), f.service.refresh(Some(&old)));
        a.is_ok() as u8 + b.is_ok() as u8
    }

    #[tokio::test]
    async fn lenient_rotation_lets_concurrent_refreshes_all_win() {
        assert_eq!(concurrent_refresh_winners(RotationMode::Lenient).await, 2);
    }

    #[tokio::test]
    async fn strict_rotation_lets_one_concurrent_refresh_win() {
        assert_eq!(concurrent_refresh_winners(RotationMode::Strict).await, 1);
    }

    #[tokio::test]
    async fn signout_revokes_the_token() {
        let f = Fixture::new(RotationMode::Lenient);
        f.register("alice", "correct").await;
        let token = f.signin("alice", "correct").await.tokens.refresh_token.0;
        f.service.signout(Some(&token)).await.unwrap();
        assert!(matches!(
            f.service.refresh(Some(&token)).await,
            Err(SessionError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn signout_failures() {
        let f = Fixture::new(RotationMode::Lenient);
        assert!(matches!(
            f.service.signout(None).await,
            Err(SessionError::BadRequest(_))
        ));
        f.cache.fail_del.store(true, Ordering::SeqCst);
        assert!(matches!(
            f.service.signout(Some("tok")).await,
            Err(SessionError::Internal(_))
        ));
    }
}
