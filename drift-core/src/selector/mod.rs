pub mod best;
pub mod index;
pub mod store;

pub use best::{pick_best, BestModelSelector};
pub use index::LatestRecordIndex;
pub use store::ElasticMetricsStore;
