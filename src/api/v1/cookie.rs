use std::fmt;
use std::time::Duration;

pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Lax,
    #[default]
    Strict,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Lax => f.write_str("Lax"),
            SameSite::Strict => f.write_str("Strict"),
        }
    }
}

/// Attributes of the refresh-token cookie. It is always `Secure` and `HttpOnly`.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    pub path: String,
    pub same_site: SameSite,
}

impl CookiePolicy {
    pub fn refresh_cookie(&self, token: &str, ttl: Duration) -> String {
        format!(
            "{REFRESH_COOKIE_NAME}={token}; Path={}; Max-Age={}; Secure; HttpOnly; SameSite={}",
            self.path,
            ttl.as_secs(),
            self.same_site
        )
    }

    /// Expire the cookie immediately.
    pub fn cleared_refresh_cookie(&self) -> String {
        format!(
            "{REFRESH_COOKIE_NAME}=; Path={}; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Secure; HttpOnly; SameSite={}",
            self.path, self.same_site
        )
    }
}
