//! Analysis runner - reads an analysis request from JSON and prints the
//! text summary. The engine itself is pure; this binary is the only I/O.

use anyhow::{Context, Result};
use arv_engine::analysis::analyzer;
use arv_engine::analysis::arv::validate_arv_result;
use arv_engine::analysis::input::AnalysisRequest;
use arv_engine::analysis::report;
use arv_engine::analysis::{ComparableProperty, SubjectProperty};
use chrono::Utc;
use std::env;
use std::fs;
use tracing::{info, warn};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    let path = env::args()
        .nth(1)
        .context("usage: arv-analyzer <request.json>")?;

    info!("Loading analysis request from {}", path);
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path))?;
    let request: AnalysisRequest =
        serde_json::from_str(&raw).context("failed to parse analysis request")?;

    let subject: SubjectProperty = request
        .subject
        .try_into()
        .context("invalid subject record")?;

    let comparables: Vec<ComparableProperty> = request
        .comparables
        .into_iter()
        .enumerate()
        .map(|(idx, record)| {
            record
                .try_into()
                .with_context(|| format!("invalid comparable record at index {}", idx))
        })
        .collect::<Result<_>>()?;

    let config = request.config.unwrap_or_default();
    info!("Analyzing {} comparables", comparables.len());

    let result = analyzer::analyze(&subject, &comparables, &config, Utc::now().date_naive());

    let problems = validate_arv_result(&result.arv_calculation);
    for problem in &problems {
        warn!("Validation: {}", problem);
    }

    println!("{}", report::format_summary(&result));

    Ok(())
}
