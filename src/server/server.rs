use crate::api::v1::{AccessGate, CookiePolicy, SameSite};
use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::CacheStore;
use crate::infra::RamCacheStore;
use crate::infra_redis::RedisCacheStore;
use crate::logger::*;
use crate::settings::Settings;
use anyhow::anyhow;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Server {
    pub session_service: Arc<dyn SessionService>,
    pub account_service: Arc<dyn AccountService>,
    pub access_gate: Arc<AccessGate>,
    pub cookie_policy: Arc<CookiePolicy>,
    sweeper_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let cancel = CancellationToken::new();

        let auth = &settings.auth;
        let token_issuer: Arc<dyn TokenIssuer> = Arc::new(JwtHs256Issuer::new(TokenConfig {
            secret: auth.secret.clone().into_bytes(),
            access_ttl: Duration::from_secs(auth.access_token_ttl_secs),
            refresh_ttl: Duration::from_secs(auth.refresh_token_ttl_secs),
            refresh_long_ttl: Duration::from_secs(auth.refresh_token_long_ttl_secs),
            refresh_token_bytes: auth.refresh_token_bytes,
        }));

        let rotation = match auth.rotation.as_str() {
            "lenient" => RotationMode::Lenient,
            "strict" => RotationMode::Strict,
            other => return Err(anyhow!("Unknown rotation mode: {}", other)),
        };
        let same_site = match auth.same_site.as_str() {
            "Strict" | "strict" => SameSite::Strict,
            "Lax" | "lax" => SameSite::Lax,
            other => return Err(anyhow!("Unknown SameSite value: {}", other)),
        };

        let mut sweeper_handle = None;
        let cache: Arc<dyn CacheStore> = match settings.cache.backend.as_str() {
            "ram" => {
                let store = Arc::new(RamCacheStore::new());
                let every = Duration::from_secs(settings.cache.sweep_interval_secs);
                sweeper_handle = Some(store.spawn_sweeper(every, cancel.clone()));
                store as Arc<dyn CacheStore>
            }
            "redis" => {
                let dsn = settings
                    .cache
                    .dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("cache.dsn is required for the redis backend"))?;
                let op_timeout = Duration::from_millis(settings.cache.op_timeout_ms);
                Arc::new(RedisCacheStore::connect(dsn, op_timeout).await?)
            }
            other => return Err(anyhow!("Unknown cache backend: {}", other)),
        };

        let account_service: Arc<dyn AccountService> =
            match settings.account_service.backend.as_str() {
                "fake" => Arc::new(FakeAccountService::new()),
                "grpc" => {
                    let address = settings.account_service.address.as_deref().ok_or_else(|| {
                        anyhow!("account_service.address is required for the grpc backend")
                    })?;
                    let timeout = Duration::from_millis(settings.account_service.timeout_ms);
                    Arc::new(GrpcAccountService::connect_lazy(address, timeout)?)
                }
                other => return Err(anyhow!("Unknown account service backend: {}", other)),
            };

        let session_service: Arc<dyn SessionService> = Arc::new(RealSessionService::new(
            account_service.clone(),
            token_issuer.clone(),
            cache,
            rotation,
        ));

        info!(
            cache = %settings.cache.backend,
            accounts = %settings.account_service.backend,
            ?rotation,
            "server started"
        );

        Ok(Self {
            session_service,
            account_service,
            access_gate: Arc::new(AccessGate::new(token_issuer)),
            cookie_policy: Arc::new(CookiePolicy {
                path: auth.cookie_path.clone(),
                same_site,
            }),
            sweeper_handle: Mutex::new(sweeper_handle),
            cancel,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let handle = match self.sweeper_handle.lock() {
            Ok(mut lock) => lock.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            let r = handle.await;
            info!("cache sweeper handle dropped: {:?}", r);
        }
    }
}
