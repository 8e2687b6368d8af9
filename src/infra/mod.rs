mod cache_store_ram;

pub use cache_store_ram::*;
