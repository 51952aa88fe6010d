pub mod attempt;
pub mod error;
pub mod metrics;
pub mod observer;
pub mod orchestrator;


pub use attempt::{AttemptOutcome, AttemptRecord, CallSummary};
pub use error::{AllProvidersExhaustedError, GatewayBuildError};
pub use metrics::{GatewayMetrics, MetricsAggregator};
pub use observer::{GatewayObserver, JsonlAuditObserver, TracingObserver};
pub use orchestrator::{CallReport, Gateway, GatewayBuilder, ProviderStatus};
