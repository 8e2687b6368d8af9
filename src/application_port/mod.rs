mod account_service;
mod session_service;
mod token_issuer;

pub use account_service::*;
pub use session_service::*;
pub use token_issuer::*;
