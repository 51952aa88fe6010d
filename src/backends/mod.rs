//! Ready-made [`CompletionBackend`](crate::provider::CompletionBackend) implementations.

pub mod command;
pub mod scripted;
pub mod simulated;

pub use command::CommandBackend;
pub use scripted::{ScriptStep, ScriptedBackend};
pub use simulated::SimulatedBackend;
