// Library crate for the comparables analysis engine

pub mod analysis;

pub use analysis::analyzer::{analyze, reconcile_arv_estimates};
pub use analysis::arv::{calculate_arv, calculate_weight, validate_arv_result};
pub use analysis::config::AnalysisConfig;
pub use analysis::ComparablesAnalysisResult;
