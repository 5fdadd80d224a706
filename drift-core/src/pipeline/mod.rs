pub mod clock;
pub mod event_store;
pub mod gate;
pub mod http;
pub mod jenkins;
pub mod mock;
pub mod monitor;
pub mod skew;
pub mod traits;

pub use clock::SystemClock;
pub use event_store::ElasticEventStore;
pub use gate::{TriggerGate, TriggerOutcome};
pub use jenkins::JenkinsTrigger;
pub use mock::{LogOnlyTrigger, UnconfiguredTrigger};
pub use monitor::{CycleOutcome, CycleReport, DriftMonitor};
pub use skew::{calculate_distribution, detect_skew, drift_reason};
pub use traits::{Clock, EventSource, MetricsSource, RetrainTrigger};
