// src/chain/mod.rs

pub mod amounts;
pub mod clients;
pub mod error;
pub mod models;
pub mod nonce;
pub mod registry;
pub mod resolver;
pub mod services;

// Re-export commonly used types
pub use clients::ClientCache;
pub use error::ChainError;
pub use registry::NetworkDescriptor;

pub use ethers_core::types::{Address, H256, U256};
