//! End-to-end comparables analysis - pre-filter, calculate, reconcile, assess
//!
//! Composes the similarity scorer, price adjustments, and ARV calculation
//! into the single externally consumed result, then layers on an alternate
//! price-per-square-foot estimate, a reconciled final value, and a quality
//! assessment with advisory recommendations.

use crate::analysis::arv::{self, calculate_weight};
use crate::analysis::config::AnalysisConfig;
use crate::analysis::similarity::haversine_miles;
use crate::analysis::types::{
    AnalyzedComparable, ArvCalculation, ComparableProperty, ComparablesAnalysisResult, CountBucket,
    QualityAssessment, QualityRating, SimilarityBucket, SubjectProperty, SummaryStatistics,
    VariationBucket,
};
use chrono::NaiveDate;
use tracing::{debug, info};

const DAYS_PER_MONTH: f64 = 30.44;

/// Fixed reconciliation weights for the median and price-per-sqft estimates;
/// the weighted ARV participates at confidence/100
const MEDIAN_RECONCILE_WEIGHT: f64 = 0.8;
const SQFT_RECONCILE_WEIGHT: f64 = 0.6;

/// Outcome of reconciling the candidate estimates
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub final_arv: f64,
    pub method: String,
    pub reasoning: String,
}

/// Run the full analysis pipeline for one subject property
pub fn analyze(
    subject: &SubjectProperty,
    comparables: &[ComparableProperty],
    config: &AnalysisConfig,
    as_of: NaiveDate,
) -> ComparablesAnalysisResult {
    let mut warnings = Vec::new();

    // Step 1: distance/recency pre-filter; removed records never reach the
    // ARV calculation
    let filtered: Vec<ComparableProperty> = comparables
        .iter()
        .filter(|comp| {
            let miles = haversine_miles(
                subject.latitude,
                subject.longitude,
                comp.property.latitude,
                comp.property.longitude,
            );
            let age_months = (as_of - comp.sale_date).num_days().max(0) as f64 / DAYS_PER_MONTH;
            miles <= config.max_distance_miles && age_months <= config.max_sale_age_months
        })
        .cloned()
        .collect();

    let removed = comparables.len() - filtered.len();
    if removed > 0 {
        warnings.push(format!(
            "{} of {} comparables removed by distance/recency pre-filter",
            removed,
            comparables.len()
        ));
        debug!("Pre-filter removed {} comparables", removed);
    }

    // Step 2: core ARV calculation
    let arv_calculation = arv::calculate_arv(subject, &filtered, config, as_of);

    // Step 3: independent price-per-sqft estimate
    let price_per_sqft_arv = price_per_sqft_arv(subject, &arv_calculation.comparables, config);

    // Step 4: reconcile the candidate estimates
    let reconciliation = reconcile_arv_estimates(
        arv_calculation.arv,
        arv_calculation.median,
        price_per_sqft_arv,
        arv_calculation.confidence,
    );

    warnings.extend(arv_calculation.warnings.iter().cloned());

    let average_similarity = average_similarity(&arv_calculation.comparables);

    let statistics = SummaryStatistics {
        comparables_used: arv_calculation.comparables_used,
        comparables_provided: comparables.len(),
        average_adjusted_price: arv_calculation.simple_average,
        median_adjusted_price: arv_calculation.median,
        price_range: arv_calculation.price_range,
        coefficient_of_variation: arv_calculation.coefficient_of_variation,
        average_similarity,
    };

    // Step 5: quality assessment from the completed numbers
    let quality = assess_quality(subject, &arv_calculation, average_similarity, warnings.len());

    // Step 6: advisory recommendations; never alter the numeric result
    let recommendations = build_recommendations(&quality, &arv_calculation);

    info!(
        "Analysis complete: final ARV {:.0} via {} (quality {})",
        reconciliation.final_arv, reconciliation.method, quality.overall_rating
    );

    ComparablesAnalysisResult {
        arv_calculation,
        price_per_sqft_arv,
        final_arv: reconciliation.final_arv,
        reconciliation_method: reconciliation.method,
        reconciliation_reasoning: reconciliation.reasoning,
        statistics,
        quality,
        warnings,
        recommendations,
    }
}

/// Weighted average of adjusted price per square foot across included
/// comparables, scaled by the subject's living area. None when the subject
/// or every comparable lacks square footage.
fn price_per_sqft_arv(
    subject: &SubjectProperty,
    analyzed: &[AnalyzedComparable],
    config: &AnalysisConfig,
) -> Option<f64> {
    let subject_sqft = subject.sqft.filter(|&s| s > 0.0)?;

    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;

    for comp in analyzed.iter().filter(|c| c.included_in_arv) {
        let sqft = match comp.comparable.property.sqft {
            Some(s) if s > 0.0 => s,
            _ => continue,
        };
        let weight = calculate_weight(comp.similarity.overall, config.arv.weight_exponent);
        weighted_sum += comp.adjustment.adjusted_price / sqft * weight;
        weight_sum += weight;
    }

    if weight_sum <= 0.0 {
        return None;
    }

    Some((weighted_sum / weight_sum * subject_sqft).round())
}

/// Combine the weighted ARV, median adjusted price, and price-per-sqft
/// estimate via a normalized weighted average. The estimate carrying the
/// largest normalized weight is reported as the primary method.
pub fn reconcile_arv_estimates(
    weighted_arv: f64,
    median_price: f64,
    price_per_sqft_arv: Option<f64>,
    confidence: f64,
) -> Reconciliation {
    let mut candidates: Vec<(&str, f64, f64)> = Vec::new();

    if weighted_arv > 0.0 {
        candidates.push(("weighted_comparables", weighted_arv, confidence / 100.0));
    }
    if median_price > 0.0 {
        candidates.push(("median", median_price, MEDIAN_RECONCILE_WEIGHT));
    }
    if let Some(sqft_arv) = price_per_sqft_arv.filter(|&v| v > 0.0) {
        candidates.push(("price_per_sqft", sqft_arv, SQFT_RECONCILE_WEIGHT));
    }

    let weight_sum: f64 = candidates.iter().map(|(_, _, w)| w).sum();
    if candidates.is_empty() || weight_sum <= 0.0 {
        return Reconciliation {
            final_arv: 0.0,
            method: "none".to_string(),
            reasoning: "No usable estimates to reconcile".to_string(),
        };
    }

    let final_arv =
        (candidates.iter().map(|(_, v, w)| v * w).sum::<f64>() / weight_sum).round();

    let (method, _, top_weight) = candidates
        .iter()
        .cloned()
        .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or(("none", 0.0, 0.0));

    let reasoning = format!(
        "Blended {} estimates; {} carried the largest weight ({:.0}% of total)",
        candidates.len(),
        method,
        top_weight / weight_sum * 100.0
    );

    Reconciliation {
        final_arv,
        method: method.to_string(),
        reasoning,
    }
}

fn average_similarity(analyzed: &[AnalyzedComparable]) -> f64 {
    let included: Vec<f64> = analyzed
        .iter()
        .filter(|c| c.included_in_arv)
        .map(|c| c.similarity.overall)
        .collect();
    if included.is_empty() {
        return 0.0;
    }
    included.iter().sum::<f64>() / included.len() as f64
}

/// Fraction of the ten tracked subject attributes present
fn data_completeness(subject: &SubjectProperty) -> f64 {
    let present = [
        subject.sqft.is_some(),
        subject.lot_sqft.is_some(),
        subject.bedrooms.is_some(),
        subject.bathrooms.is_some(),
        subject.year_built.is_some(),
        subject.property_type.is_some(),
        subject.style.is_some(),
        subject.stories.is_some(),
        subject.condition_rating.is_some(),
        subject.location_rating.is_some(),
    ]
    .iter()
    .filter(|&&p| p)
    .count();

    present as f64 / 10.0
}

fn assess_quality(
    subject: &SubjectProperty,
    calc: &ArvCalculation,
    average_similarity: f64,
    warning_count: usize,
) -> QualityAssessment {
    let comparable_count = match calc.comparables_used {
        n if n >= 5 => CountBucket::Sufficient,
        n if n >= 3 => CountBucket::Marginal,
        _ => CountBucket::Insufficient,
    };

    let similarity = match average_similarity {
        s if s >= 75.0 => SimilarityBucket::High,
        s if s >= 55.0 => SimilarityBucket::Medium,
        _ => SimilarityBucket::Low,
    };

    let price_variation = match calc.coefficient_of_variation {
        cv if cv <= 0.10 => VariationBucket::Low,
        cv if cv <= 0.20 => VariationBucket::Moderate,
        _ => VariationBucket::High,
    };

    let overall_rating = overall_rating(
        calc.confidence,
        calc.comparables_used,
        calc.coefficient_of_variation,
        warning_count,
    );

    QualityAssessment {
        data_completeness: data_completeness(subject),
        comparable_count,
        similarity,
        price_variation,
        overall_rating,
    }
}

/// Letter rating: confidence adjusted by comparable count, price variation,
/// and the number of warnings the analysis accumulated
fn overall_rating(
    confidence: f64,
    comparables_used: usize,
    coefficient_of_variation: f64,
    warning_count: usize,
) -> QualityRating {
    let mut score = confidence;

    if comparables_used >= 5 {
        score += 5.0;
    } else if comparables_used <= 2 {
        score -= 15.0;
    }

    if coefficient_of_variation <= 0.10 {
        score += 5.0;
    } else if coefficient_of_variation > 0.20 {
        score -= 10.0;
    }

    score -= warning_count as f64 * 5.0;

    match score {
        s if s >= 90.0 => QualityRating::Excellent,
        s if s >= 70.0 => QualityRating::Good,
        s if s >= 50.0 => QualityRating::Fair,
        _ => QualityRating::Poor,
    }
}

fn build_recommendations(
    quality: &QualityAssessment,
    calc: &ArvCalculation,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    match quality.comparable_count {
        CountBucket::Insufficient => recommendations.push(
            "Fewer than 3 comparables used; widen the search radius or extend the sale-date window"
                .to_string(),
        ),
        CountBucket::Marginal => recommendations.push(
            "Consider widening the search radius to find additional comparables".to_string(),
        ),
        CountBucket::Sufficient => {}
    }

    if quality.similarity == SimilarityBucket::Low {
        recommendations.push(
            "Comparable similarity is low; review factor weights or expand matching criteria"
                .to_string(),
        );
    }

    if quality.price_variation == VariationBucket::High {
        recommendations.push(
            "High price variation among comparables; inspect for outliers or mixed market segments"
                .to_string(),
        );
    }

    if quality.data_completeness < 0.5 {
        recommendations.push(
            "Subject property data is sparse; collecting more attributes would improve adjustment accuracy"
                .to_string(),
        );
    }

    if calc.confidence < 50.0 {
        recommendations
            .push("Treat this estimate as indicative only; confidence is low".to_string());
    }

    if recommendations.is_empty() {
        recommendations
            .push("Estimate is well supported by the comparable set".to_string());
    }

    recommendations
}
