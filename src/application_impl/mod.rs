mod account_service_fake;
mod account_service_grpc;
mod session_service_impl;
mod token_issuer_jwt;

pub use account_service_fake::*;
pub use account_service_grpc::*;
pub use session_service_impl::*;
pub use token_issuer_jwt::*;
