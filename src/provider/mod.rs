pub mod backend;
pub mod client;
pub mod error;
pub mod types;

#[cfg(test)]
pub mod tests;

pub use backend::{BackendError, BackendOutput, CompletionBackend};
pub use client::ProviderClient;
pub use error::AttemptError;
pub use types::*;
