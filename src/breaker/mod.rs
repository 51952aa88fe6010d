pub mod circuit_breaker;
pub mod types;

#[cfg(test)]
pub mod tests;

pub use circuit_breaker::CircuitBreaker;
pub use types::*;
