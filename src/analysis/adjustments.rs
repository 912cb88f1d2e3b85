//! Price adjustments - normalize a comparable's sale price to the subject
//!
//! Each quantifiable difference between subject and comparable becomes a
//! signed dollar line item from the static dollar table. The adjusted price
//! answers "what would this comparable have sold for if it were identical to
//! the subject," and is the only price figure the ARV calculation uses.

use crate::analysis::config::AdjustmentValues;
use crate::analysis::types::{
    AdjustmentDirection, AdjustmentResult, ComparableProperty, PriceAdjustment, SubjectProperty,
};
use chrono::NaiveDate;
use tracing::debug;

const DAYS_PER_MONTH: f64 = 30.44;

/// Compute all adjustments for one comparable. A factor missing on either
/// side contributes no line item; every amount is rounded to whole dollars
/// so `adjusted_price == sale_price + net_adjustment` holds exactly.
pub fn adjust(
    subject: &SubjectProperty,
    comparable: &ComparableProperty,
    values: &AdjustmentValues,
    as_of: NaiveDate,
) -> AdjustmentResult {
    let comp = &comparable.property;
    let mut adjustments = Vec::new();

    push_diff(
        &mut adjustments,
        "square footage",
        subject.sqft,
        comp.sqft,
        values.per_sqft,
    );
    push_diff(
        &mut adjustments,
        "lot size",
        subject.lot_sqft,
        comp.lot_sqft,
        values.per_lot_sqft,
    );
    push_diff(
        &mut adjustments,
        "bedrooms",
        subject.bedrooms.map(f64::from),
        comp.bedrooms.map(f64::from),
        values.per_bedroom,
    );
    push_diff(
        &mut adjustments,
        "bathrooms",
        subject.bathrooms,
        comp.bathrooms,
        values.per_bathroom,
    );
    // Newer construction is worth more, so the year-built difference is
    // valued directly (subject newer -> comparable adjusted upward)
    push_diff(
        &mut adjustments,
        "age",
        subject.year_built.map(f64::from),
        comp.year_built.map(f64::from),
        values.per_year_age,
    );
    push_diff(
        &mut adjustments,
        "condition",
        subject.condition_rating.map(f64::from),
        comp.condition_rating.map(f64::from),
        values.per_condition_point,
    );
    push_diff(
        &mut adjustments,
        "location quality",
        subject.location_rating.map(f64::from),
        comp.location_rating.map(f64::from),
        values.per_location_point,
    );
    push_diff(
        &mut adjustments,
        "garage",
        subject.garage_spaces.map(f64::from),
        comp.garage_spaces.map(f64::from),
        values.per_garage_space,
    );

    push_flag(
        &mut adjustments,
        "pool",
        subject.has_pool,
        comp.has_pool,
        values.pool,
    );
    push_flag(
        &mut adjustments,
        "basement",
        subject.has_basement,
        comp.has_basement,
        values.basement,
    );
    push_flag(
        &mut adjustments,
        "basement finish",
        subject.basement_finished,
        comp.basement_finished,
        values.basement_finish,
    );

    if let Some(amount) = premium_feature_adjustment(subject, comp, values.per_premium_feature) {
        push(&mut adjustments, "premium features", amount);
    }

    if let Some(amount) =
        time_adjustment(comparable.sale_price, comparable.sale_date, as_of, values)
    {
        push(&mut adjustments, "time of sale", amount);
    }

    let net_adjustment: f64 = adjustments.iter().map(|a| a.amount).sum();
    let gross: f64 = adjustments.iter().map(|a| a.amount.abs()).sum();
    let gross_adjustment_percent = if comparable.sale_price > 0.0 {
        gross / comparable.sale_price * 100.0
    } else {
        0.0
    };

    let adjusted_price = comparable.sale_price + net_adjustment;

    debug!(
        "Adjusted {:.0} -> {:.0} ({} line items, gross {:.1}%)",
        comparable.sale_price,
        adjusted_price,
        adjustments.len(),
        gross_adjustment_percent
    );

    AdjustmentResult {
        adjustments,
        net_adjustment,
        adjusted_price,
        gross_adjustment_percent,
    }
}

fn push(adjustments: &mut Vec<PriceAdjustment>, factor: &str, amount: f64) {
    let amount = amount.round();
    if amount == 0.0 {
        return;
    }
    adjustments.push(PriceAdjustment {
        factor: factor.to_string(),
        amount,
        direction: AdjustmentDirection::from_amount(amount),
    });
}

/// Numeric difference times a per-unit dollar value, when both sides have data
fn push_diff(
    adjustments: &mut Vec<PriceAdjustment>,
    factor: &str,
    subject: Option<f64>,
    comp: Option<f64>,
    per_unit: f64,
) {
    if let (Some(s), Some(c)) = (subject, comp) {
        push(adjustments, factor, (s - c) * per_unit);
    }
}

/// Flat value for a boolean feature one side has and the other lacks
fn push_flag(
    adjustments: &mut Vec<PriceAdjustment>,
    factor: &str,
    subject: Option<bool>,
    comp: Option<bool>,
    value: f64,
) {
    if let (Some(s), Some(c)) = (subject, comp) {
        match (s, c) {
            (true, false) => push(adjustments, factor, value),
            (false, true) => push(adjustments, factor, -value),
            _ => {}
        }
    }
}

/// Net count of premium features one side has over the other, flat-valued.
/// Feature names match case-insensitively on the trimmed string.
fn premium_feature_adjustment(
    subject: &SubjectProperty,
    comp: &SubjectProperty,
    per_feature: f64,
) -> Option<f64> {
    if subject.premium_features.is_empty() && comp.premium_features.is_empty() {
        return None;
    }

    let normalize = |features: &[String]| -> Vec<String> {
        features.iter().map(|f| f.trim().to_lowercase()).collect()
    };

    let subject_features = normalize(&subject.premium_features);
    let comp_features = normalize(&comp.premium_features);

    let subject_only = subject_features
        .iter()
        .filter(|f| !comp_features.contains(f))
        .count() as f64;
    let comp_only = comp_features
        .iter()
        .filter(|f| !subject_features.contains(f))
        .count() as f64;

    Some((subject_only - comp_only) * per_feature)
}

/// Market-conditions adjustment: carry an older sale forward to the as-of
/// date at the configured monthly appreciation rate
fn time_adjustment(
    sale_price: f64,
    sale_date: NaiveDate,
    as_of: NaiveDate,
    values: &AdjustmentValues,
) -> Option<f64> {
    let days = (as_of - sale_date).num_days();
    if days <= 0 {
        return None;
    }
    let months = days as f64 / DAYS_PER_MONTH;
    Some(sale_price * values.monthly_appreciation * months)
}
