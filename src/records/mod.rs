mod filter;
mod store;

pub use filter::{CategoryVocabulary, FilterSummary, filter_category};
pub use store::{NON_IMP_SENTINEL, Observation, RecordStore, ScenarioKey};
