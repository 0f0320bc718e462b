pub mod fallback;
pub mod model;
pub mod pipeline;
pub mod script;
pub mod summary;

pub use model::{ResultItem, RetrievalPlan, SearchQuery, TimeWindow};
pub use script::TargetScript;
