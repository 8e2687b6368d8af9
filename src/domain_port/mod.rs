// store

mod cache_store;

pub use cache_store::*;

// cache-backed stores

mod refresh_token_store;
mod username_reservations;

pub use refresh_token_store::*;
pub use username_reservations::*;
