pub mod drift;
pub mod event;
pub mod ids;
pub mod metrics;
pub mod selection;

pub use drift::{Distribution, DriftVerdict};
pub use event::{PredictionEvent, RawPredictionEvent};
pub use ids::CycleId;
pub use metrics::{MetricSet, RawTrainingMetricRecord, TrainingMetricRecord};
pub use selection::{ModelSelection, Score};
