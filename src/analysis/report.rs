//! Report output - flatten the analysis into display-ready rows and a
//! human-readable text summary

use crate::analysis::types::{ComparablesAnalysisResult, PriceAdjustment};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// One comparable flattened for tables and exports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    pub address: String,
    pub sale_price: f64,
    pub sale_date: String,
    pub adjusted_price: f64,
    pub net_adjustment: f64,
    pub gross_adjustment_percent: f64,
    pub similarity_score: f64,
    pub distance_miles: f64,
    pub weight: f64,
    pub included: bool,
    pub exclusion_reason: Option<String>,
    pub adjustments: Vec<PriceAdjustment>,
}

/// Flatten every analyzed comparable into a display row, included first
pub fn report_rows(result: &ComparablesAnalysisResult) -> Vec<ReportRow> {
    result
        .arv_calculation
        .comparables
        .iter()
        .map(|c| ReportRow {
            address: c
                .comparable
                .address
                .clone()
                .unwrap_or_else(|| "(unknown address)".to_string()),
            sale_price: c.comparable.sale_price,
            sale_date: c.comparable.sale_date.to_string(),
            adjusted_price: c.adjustment.adjusted_price,
            net_adjustment: c.adjustment.net_adjustment,
            gross_adjustment_percent: c.adjustment.gross_adjustment_percent,
            similarity_score: c.similarity.overall,
            distance_miles: c.similarity.distance_miles,
            weight: c.weight,
            included: c.included_in_arv,
            exclusion_reason: c.exclusion_reason.clone(),
            adjustments: c.adjustment.adjustments.clone(),
        })
        .collect()
}

/// Multi-line text summary of a completed analysis
pub fn format_summary(result: &ComparablesAnalysisResult) -> String {
    let calc = &result.arv_calculation;
    let mut out = String::new();

    let _ = writeln!(out, "=== Comparables Analysis ===");
    let _ = writeln!(
        out,
        "Final ARV: ${:.0} (method: {})",
        result.final_arv, result.reconciliation_method
    );
    let _ = writeln!(out, "  {}", result.reconciliation_reasoning);
    let _ = writeln!(
        out,
        "Weighted ARV: ${:.0} ({}), confidence {:.0}/95",
        calc.arv, calc.calculation_method, calc.confidence
    );
    let _ = writeln!(
        out,
        "Range: ${:.0} - ${:.0}",
        calc.confidence_range.low, calc.confidence_range.high
    );
    if let Some(sqft_arv) = result.price_per_sqft_arv {
        let _ = writeln!(out, "Price-per-sqft ARV: ${:.0}", sqft_arv);
    }

    let _ = writeln!(
        out,
        "Comparables: {} used of {} provided (avg similarity {:.1})",
        result.statistics.comparables_used,
        result.statistics.comparables_provided,
        result.statistics.average_similarity
    );
    let _ = writeln!(
        out,
        "Adjusted prices: median ${:.0}, average ${:.0}, range ${:.0} (CV {:.2})",
        result.statistics.median_adjusted_price,
        result.statistics.average_adjusted_price,
        result.statistics.price_range,
        result.statistics.coefficient_of_variation
    );
    let _ = writeln!(
        out,
        "Quality: {} (data completeness {:.0}%)",
        result.quality.overall_rating,
        result.quality.data_completeness * 100.0
    );

    if !result.warnings.is_empty() {
        let _ = writeln!(out, "Warnings:");
        for warning in &result.warnings {
            let _ = writeln!(out, "  - {}", warning);
        }
    }

    if !result.recommendations.is_empty() {
        let _ = writeln!(out, "Recommendations:");
        for rec in &result.recommendations {
            let _ = writeln!(out, "  - {}", rec);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::analyze;
    use crate::analysis::config::AnalysisConfig;
    use crate::analysis::types::{ComparableProperty, SubjectProperty};
    use chrono::NaiveDate;

    fn mock_subject() -> SubjectProperty {
        SubjectProperty {
            latitude: 40.4406,
            longitude: -79.9959,
            sqft: Some(1500.0),
            lot_sqft: Some(6000.0),
            bedrooms: Some(3),
            bathrooms: Some(2.0),
            year_built: Some(1990),
            stories: Some(1),
            property_type: Some("single family".to_string()),
            style: Some("ranch".to_string()),
            garage_spaces: Some(2),
            has_pool: Some(false),
            has_basement: Some(true),
            basement_finished: Some(true),
            condition_rating: Some(3),
            location_rating: Some(3),
            premium_features: Vec::new(),
        }
    }

    fn mock_result() -> ComparablesAnalysisResult {
        let mut property = mock_subject();
        property.latitude += 0.001;
        let comps = vec![ComparableProperty {
            address: Some("12 Oak St".to_string()),
            property,
            sale_price: 185_000.0,
            sale_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        }];
        analyze(
            &mock_subject(),
            &comps,
            &AnalysisConfig::default(),
            NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
        )
    }

    #[test]
    fn test_report_rows_flatten_comparables() {
        let result = mock_result();
        let rows = report_rows(&result);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].address, "12 Oak St");
        assert_eq!(rows[0].sale_price, 185_000.0);
        assert!(rows[0].included);
    }

    #[test]
    fn test_summary_mentions_final_arv_and_method() {
        let result = mock_result();
        let summary = format_summary(&result);

        assert!(summary.contains("Final ARV"));
        assert!(summary.contains(&result.reconciliation_method));
        assert!(summary.contains("Comparables: 1 used of 1 provided"));
    }
}
