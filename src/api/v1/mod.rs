mod cookie;
mod error;
mod gate;
mod handler;
mod router;

pub use cookie::{CookiePolicy, REFRESH_COOKIE_NAME, SameSite};
pub use error::{ApiError, ApiErrorCode, ErrorBody, recover_error};
pub use gate::{AccessGate, with_verification};
pub use router::routes;
