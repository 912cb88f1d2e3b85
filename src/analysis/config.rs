//! Analysis configuration - immutable defaults, overridable per call
//!
//! Every struct here is passed by reference into the calculation functions.
//! Callers that need different thresholds build their own value; there is no
//! shared mutable configuration, so concurrent analyses cannot interfere.

use serde::{Deserialize, Serialize};

/// Per-factor similarity weights. Named fields rather than a positional
/// array so a factor can never be paired with the wrong weight.
///
/// Callers are expected to keep the weights summing to 1.0; `normalize`
/// repairs arbitrary non-negative weights.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityWeights {
    pub distance: f64,
    pub sqft: f64,
    pub lot: f64,
    pub bedrooms: f64,
    pub bathrooms: f64,
    pub age: f64,
    pub recency: f64,
    pub property_type: f64,
    pub style: f64,
    pub features: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        SimilarityWeights {
            distance: 0.20,
            sqft: 0.15,
            lot: 0.05,
            bedrooms: 0.10,
            bathrooms: 0.05,
            age: 0.10,
            recency: 0.15,
            property_type: 0.10,
            style: 0.05,
            features: 0.05,
        }
    }
}

impl SimilarityWeights {
    /// Renormalize so the ten weights sum to 1.0.
    /// An all-zero input yields uniform weights rather than dividing by zero.
    pub fn normalize(&self) -> SimilarityWeights {
        let sum = self.distance
            + self.sqft
            + self.lot
            + self.bedrooms
            + self.bathrooms
            + self.age
            + self.recency
            + self.property_type
            + self.style
            + self.features;

        if sum <= 0.0 {
            let uniform = 1.0 / 10.0;
            return SimilarityWeights {
                distance: uniform,
                sqft: uniform,
                lot: uniform,
                bedrooms: uniform,
                bathrooms: uniform,
                age: uniform,
                recency: uniform,
                property_type: uniform,
                style: uniform,
                features: uniform,
            };
        }

        SimilarityWeights {
            distance: self.distance / sum,
            sqft: self.sqft / sum,
            lot: self.lot / sum,
            bedrooms: self.bedrooms / sum,
            bathrooms: self.bathrooms / sum,
            age: self.age / sum,
            recency: self.recency / sum,
            property_type: self.property_type / sum,
            style: self.style / sum,
            features: self.features / sum,
        }
    }

    pub fn sum(&self) -> f64 {
        self.distance
            + self.sqft
            + self.lot
            + self.bedrooms
            + self.bathrooms
            + self.age
            + self.recency
            + self.property_type
            + self.style
            + self.features
    }
}

/// Standard dollar values for price adjustments. All values are per unit of
/// difference between subject and comparable; positive differences in the
/// subject's favor raise the comparable's adjusted price.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentValues {
    /// Dollars per square foot of living area difference
    pub per_sqft: f64,
    /// Dollars per square foot of lot size difference
    pub per_lot_sqft: f64,
    pub per_bedroom: f64,
    pub per_bathroom: f64,
    /// Dollars per year of effective-age difference
    pub per_year_age: f64,
    /// Dollars per point of condition rating (1-5) difference
    pub per_condition_point: f64,
    /// Dollars per point of location quality rating (1-5) difference
    pub per_location_point: f64,
    pub per_garage_space: f64,
    pub pool: f64,
    pub basement: f64,
    pub basement_finish: f64,
    /// Flat value for each premium feature one side has and the other lacks
    pub per_premium_feature: f64,
    /// Monthly market appreciation applied to sale price for time-of-sale,
    /// as a fraction (0.004 = 0.4% per month)
    pub monthly_appreciation: f64,
}

impl Default for AdjustmentValues {
    fn default() -> Self {
        AdjustmentValues {
            per_sqft: 40.0,
            per_lot_sqft: 0.5,
            per_bedroom: 5_000.0,
            per_bathroom: 7_500.0,
            per_year_age: 500.0,
            per_condition_point: 10_000.0,
            per_location_point: 7_500.0,
            per_garage_space: 7_000.0,
            pool: 15_000.0,
            basement: 15_000.0,
            basement_finish: 10_000.0,
            per_premium_feature: 5_000.0,
            monthly_appreciation: 0.004,
        }
    }
}

/// Thresholds and knobs for the ARV calculation itself
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ArvConfig {
    /// Comparables scoring below this are excluded
    pub min_similarity_score: f64,
    /// Comparables whose gross adjustment exceeds this percent are excluded
    pub max_adjustment_percent: f64,
    /// Fewer used comparables than this produces a warning
    pub min_comparables: usize,
    /// Included comparables are truncated to this many, best-first
    pub max_comparables: usize,
    /// Weight = (similarity/100)^exponent; higher punishes imperfect matches
    pub weight_exponent: f64,
    /// Base confidence as a fraction (0.8 -> start at 80)
    pub confidence_factor: f64,
    pub use_weighted_average: bool,
}

impl Default for ArvConfig {
    fn default() -> Self {
        ArvConfig {
            min_similarity_score: 50.0,
            max_adjustment_percent: 25.0,
            min_comparables: 3,
            max_comparables: 10,
            weight_exponent: 2.0,
            confidence_factor: 0.8,
            use_weighted_average: true,
        }
    }
}

/// Full configuration for an end-to-end analysis
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub weights: SimilarityWeights,
    pub adjustments: AdjustmentValues,
    pub arv: ArvConfig,
    /// Comparables farther than this never enter the calculation
    pub max_distance_miles: f64,
    /// Comparables that sold longer ago than this are pre-filtered out
    pub max_sale_age_months: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            weights: SimilarityWeights::default(),
            adjustments: AdjustmentValues::default(),
            arv: ArvConfig::default(),
            max_distance_miles: 3.0,
            max_sale_age_months: 12.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let weights = SimilarityWeights::default();
        assert!((weights.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_arbitrary_weights() {
        // Lopsided positive weights should renormalize to sum 1.0
        let weights = SimilarityWeights {
            distance: 5.0,
            sqft: 3.0,
            lot: 1.0,
            bedrooms: 2.0,
            bathrooms: 1.0,
            age: 2.0,
            recency: 4.0,
            property_type: 1.0,
            style: 0.5,
            features: 0.5,
        };

        let normalized = weights.normalize();
        assert!((normalized.sum() - 1.0).abs() < 1e-9);
        // Relative order preserved
        assert!(normalized.distance > normalized.sqft);
    }

    #[test]
    fn test_normalize_all_zero_weights() {
        // All-zero weights should fall back to uniform, not divide by zero
        let weights = SimilarityWeights {
            distance: 0.0,
            sqft: 0.0,
            lot: 0.0,
            bedrooms: 0.0,
            bathrooms: 0.0,
            age: 0.0,
            recency: 0.0,
            property_type: 0.0,
            style: 0.0,
            features: 0.0,
        };

        let normalized = weights.normalize();
        assert!((normalized.distance - 0.1).abs() < 1e-9);
        assert!((normalized.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_config_defaults() {
        let config = ArvConfig::default();
        assert_eq!(config.min_similarity_score, 50.0);
        assert_eq!(config.max_adjustment_percent, 25.0);
        assert_eq!(config.max_comparables, 10);
        assert!(config.use_weighted_average);
    }
}
