pub mod in_memory;
pub mod password;
pub mod paystack;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod sandbox;
pub mod signature;
pub mod tokens;
