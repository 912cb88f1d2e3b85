//! Similarity scoring - how comparable is a sale to the subject property?
//!
//! Ten independent per-factor sub-scores (each 0-100) combined by a weighted
//! sum. A factor where either side lacks data scores a neutral 50 and is
//! excluded from the data-availability confidence. All functions are pure.

use crate::analysis::config::SimilarityWeights;
use crate::analysis::types::{ComparableProperty, FactorScores, SimilarityResult, SubjectProperty};
use chrono::NaiveDate;
use tracing::debug;

/// Neutral score when either side lacks data for a factor
const NEUTRAL_SCORE: f64 = 50.0;

/// Distance beyond which the distance score is zero, miles
const MAX_DISTANCE_MILES: f64 = 3.0;

/// Sale age beyond which the recency score is zero, months
const MAX_SALE_AGE_MONTHS: f64 = 12.0;

/// Linear-decay thresholds
const MAX_SQFT_DIFF_RATIO: f64 = 0.5;
const MAX_LOT_DIFF_RATIO: f64 = 1.0;
const MAX_BEDROOM_DIFF: f64 = 2.0;
const MAX_BATHROOM_DIFF: f64 = 2.0;
const MAX_AGE_DIFF_YEARS: f64 = 20.0;

/// Average days per month, for sale-age conversion
const DAYS_PER_MONTH: f64 = 30.44;

/// Score a comparable against the subject across all ten factors.
/// `as_of` anchors the recency factor so results are deterministic.
pub fn score(
    subject: &SubjectProperty,
    comparable: &ComparableProperty,
    weights: &SimilarityWeights,
    as_of: NaiveDate,
) -> SimilarityResult {
    let distance_miles = haversine_miles(
        subject.latitude,
        subject.longitude,
        comparable.property.latitude,
        comparable.property.longitude,
    );

    let comp = &comparable.property;

    // Each factor reports (score, had data on both sides)
    let distance = (score_distance(distance_miles), true);
    let sqft = score_linear_ratio(subject.sqft, comp.sqft, MAX_SQFT_DIFF_RATIO);
    let lot = score_linear_ratio(subject.lot_sqft, comp.lot_sqft, MAX_LOT_DIFF_RATIO);
    let bedrooms = score_linear_diff(
        subject.bedrooms.map(f64::from),
        comp.bedrooms.map(f64::from),
        MAX_BEDROOM_DIFF,
    );
    let bathrooms = score_linear_diff(subject.bathrooms, comp.bathrooms, MAX_BATHROOM_DIFF);
    let age = score_linear_diff(
        subject.year_built.map(f64::from),
        comp.year_built.map(f64::from),
        MAX_AGE_DIFF_YEARS,
    );
    let recency = (score_recency(comparable.sale_date, as_of), true);
    let property_type = score_property_type(
        subject.property_type.as_deref(),
        comp.property_type.as_deref(),
    );
    let style = score_style(subject.style.as_deref(), comp.style.as_deref());
    let features = score_features(subject, comp);

    let factor_scores = FactorScores {
        distance: distance.0,
        sqft: sqft.0,
        lot: lot.0,
        bedrooms: bedrooms.0,
        bathrooms: bathrooms.0,
        age: age.0,
        recency: recency.0,
        property_type: property_type.0,
        style: style.0,
        features: features.0,
    };

    let weighted_contributions = FactorScores {
        distance: factor_scores.distance * weights.distance,
        sqft: factor_scores.sqft * weights.sqft,
        lot: factor_scores.lot * weights.lot,
        bedrooms: factor_scores.bedrooms * weights.bedrooms,
        bathrooms: factor_scores.bathrooms * weights.bathrooms,
        age: factor_scores.age * weights.age,
        recency: factor_scores.recency * weights.recency,
        property_type: factor_scores.property_type * weights.property_type,
        style: factor_scores.style * weights.style,
        features: factor_scores.features * weights.features,
    };

    let overall = weighted_contributions.distance
        + weighted_contributions.sqft
        + weighted_contributions.lot
        + weighted_contributions.bedrooms
        + weighted_contributions.bathrooms
        + weighted_contributions.age
        + weighted_contributions.recency
        + weighted_contributions.property_type
        + weighted_contributions.style
        + weighted_contributions.features;

    let factors_with_data = [
        distance.1,
        sqft.1,
        lot.1,
        bedrooms.1,
        bathrooms.1,
        age.1,
        recency.1,
        property_type.1,
        style.1,
        features.1,
    ]
    .iter()
    .filter(|&&has_data| has_data)
    .count();

    let data_confidence = factors_with_data as f64 / 10.0;

    debug!(
        "Similarity {:.1} at {:.2} mi (data confidence {:.0}%)",
        overall,
        distance_miles,
        data_confidence * 100.0
    );

    SimilarityResult {
        factor_scores,
        weighted_contributions,
        overall,
        data_confidence,
        distance_miles,
    }
}

/// Great-circle distance via the Haversine formula, in miles
pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_MILES: f64 = 3_958.8;

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MILES * c
}

/// Exponential decay in distance: 100 at 0 miles, 0 at or beyond 3 miles.
/// Non-linear because small distance differences matter far more than large
/// ones at the margin.
fn score_distance(miles: f64) -> f64 {
    if miles <= 0.0 {
        return 100.0;
    }
    if miles >= MAX_DISTANCE_MILES {
        return 0.0;
    }
    100.0 * (-miles / 1.0).exp()
}

/// Exponential decay in sale age: 100 for a sale today, 0 beyond 12 months
fn score_recency(sale_date: NaiveDate, as_of: NaiveDate) -> f64 {
    let days = (as_of - sale_date).num_days().max(0) as f64;
    let months = days / DAYS_PER_MONTH;

    if months > MAX_SALE_AGE_MONTHS {
        return 0.0;
    }
    100.0 * (-months / 6.0).exp()
}

/// Linear decay over the relative difference |delta| / subject, zero at or
/// beyond `max_ratio`. Used for sqft and lot size.
fn score_linear_ratio(subject: Option<f64>, comp: Option<f64>, max_ratio: f64) -> (f64, bool) {
    let (s, c) = match (subject, comp) {
        (Some(s), Some(c)) => (s, c),
        _ => return (NEUTRAL_SCORE, false),
    };

    if s <= 0.0 {
        // Cannot form a ratio against a zero-size subject
        return (NEUTRAL_SCORE, false);
    }

    let ratio = (s - c).abs() / s;
    if ratio >= max_ratio {
        return (0.0, true);
    }
    (100.0 * (1.0 - ratio), true)
}

/// Linear decay over the absolute difference, zero at or beyond `max_diff`.
/// Used for bedrooms, bathrooms, and age. A genuine zero (studio, new build)
/// is data, not absence.
fn score_linear_diff(subject: Option<f64>, comp: Option<f64>, max_diff: f64) -> (f64, bool) {
    let (s, c) = match (subject, comp) {
        (Some(s), Some(c)) => (s, c),
        _ => return (NEUTRAL_SCORE, false),
    };

    let diff = (s - c).abs();
    if diff >= max_diff {
        return (0.0, true);
    }
    (100.0 * (1.0 - diff / max_diff), true)
}

/// Categorical: exact match 100, same semantic group 80, otherwise 20
fn score_property_type(subject: Option<&str>, comp: Option<&str>) -> (f64, bool) {
    let (s, c) = match (subject, comp) {
        (Some(s), Some(c)) => (s, c),
        _ => return (NEUTRAL_SCORE, false),
    };

    if normalize_category(s) == normalize_category(c) {
        return (100.0, true);
    }

    match (property_type_group(s), property_type_group(c)) {
        (Some(a), Some(b)) if a == b => (80.0, true),
        _ => (20.0, true),
    }
}

/// Categorical: exact match 100, same semantic group 75, otherwise 40
fn score_style(subject: Option<&str>, comp: Option<&str>) -> (f64, bool) {
    let (s, c) = match (subject, comp) {
        (Some(s), Some(c)) => (s, c),
        _ => return (NEUTRAL_SCORE, false),
    };

    if normalize_category(s) == normalize_category(c) {
        return (100.0, true);
    }

    match (style_group(s), style_group(c)) {
        (Some(a), Some(b)) if a == b => (75.0, true),
        _ => (40.0, true),
    }
}

/// Fraction of the boolean feature flags (garage, pool, basement) that match,
/// scaled to 0-100. Only flags known on both sides are comparable; if none
/// are, the factor is neutral.
fn score_features(subject: &SubjectProperty, comp: &SubjectProperty) -> (f64, bool) {
    let pairs = [
        (
            subject.garage_spaces.map(|g| g > 0),
            comp.garage_spaces.map(|g| g > 0),
        ),
        (subject.has_pool, comp.has_pool),
        (subject.has_basement, comp.has_basement),
    ];

    let mut comparable_flags = 0;
    let mut matching = 0;

    for (s, c) in pairs {
        if let (Some(s), Some(c)) = (s, c) {
            comparable_flags += 1;
            if s == c {
                matching += 1;
            }
        }
    }

    if comparable_flags == 0 {
        return (NEUTRAL_SCORE, false);
    }

    (matching as f64 / comparable_flags as f64 * 100.0, true)
}

fn normalize_category(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Map free-text property types onto semantic groups
fn property_type_group(raw: &str) -> Option<&'static str> {
    let lower = normalize_category(raw);

    // Townhouse before the broader "house" match, or "Townhouse" would be
    // captured into single_family
    if lower.contains("townhouse") || lower.contains("townhome") || lower.contains("row") {
        Some("townhouse")
    } else if lower.contains("single") || lower.contains("detached") || lower.contains("house") || lower == "sfr" {
        Some("single_family")
    } else if lower.contains("condo") || lower.contains("apartment") {
        Some("condo")
    } else if lower.contains("duplex")
        || lower.contains("triplex")
        || lower.contains("fourplex")
        || lower.contains("multi")
    {
        Some("multi_family")
    } else if lower.contains("mobile") || lower.contains("manufactured") {
        Some("mobile")
    } else if lower.contains("vacant") || lower.contains("land") || lower.contains("lot") {
        Some("land")
    } else {
        None
    }
}

/// Map free-text architectural styles onto semantic groups
fn style_group(raw: &str) -> Option<&'static str> {
    let lower = normalize_category(raw);

    if lower.contains("ranch") || lower.contains("rambler") {
        Some("ranch")
    } else if lower.contains("colonial") || lower.contains("traditional") {
        Some("traditional")
    } else if lower.contains("two story") || lower.contains("2 story") || lower.contains("two-story")
    {
        Some("two_story")
    } else if lower.contains("cape") {
        Some("cape_cod")
    } else if lower.contains("craftsman") || lower.contains("bungalow") {
        Some("craftsman")
    } else if lower.contains("contemporary") || lower.contains("modern") {
        Some("contemporary")
    } else if lower.contains("split") || lower.contains("tri-level") || lower.contains("tri level")
    {
        Some("split_level")
    } else if lower.contains("victorian") {
        Some("victorian")
    } else {
        None
    }
}
