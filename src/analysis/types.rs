//! Core data types for comparables analysis
//! Pure data structures with no behavior

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The parcel being valued. Coordinates are required; everything else is
/// optional, and absence is a first-class state (`Some(0)` bedrooms is a
/// real studio, not missing data).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectProperty {
    pub latitude: f64,
    pub longitude: f64,

    // Physical attributes
    pub sqft: Option<f64>,
    pub lot_sqft: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub year_built: Option<i32>,
    pub stories: Option<u32>,

    // Categorical attributes (free text from data providers)
    pub property_type: Option<String>,
    pub style: Option<String>,

    // Feature flags and ordinal ratings
    pub garage_spaces: Option<u32>,
    pub has_pool: Option<bool>,
    pub has_basement: Option<bool>,
    pub basement_finished: Option<bool>,
    /// Condition rating, 1 (poor) to 5 (excellent)
    pub condition_rating: Option<u8>,
    /// Location quality rating, 1 to 5
    pub location_rating: Option<u8>,

    #[serde(default)]
    pub premium_features: Vec<String>,
}

/// A recently sold property used as a reference point. Immutable once
/// received from ingestion; analysis only annotates derived values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparableProperty {
    pub address: Option<String>,
    #[serde(flatten)]
    pub property: SubjectProperty,
    /// Observed sale price, always positive
    pub sale_price: f64,
    pub sale_date: NaiveDate,
}

/// Per-factor 0-100 sub-scores for one (subject, comparable) pair
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactorScores {
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

/// Similarity between a subject and one comparable. Created once per pair,
/// never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub factor_scores: FactorScores,
    /// Each factor's score times its weight
    pub weighted_contributions: FactorScores,
    /// Weighted overall score, 0-100
    pub overall: f64,
    /// Fraction of the ten factors with data on both sides, 0.0-1.0
    pub data_confidence: f64,
    /// Great-circle distance between subject and comparable
    pub distance_miles: f64,
}

/// Direction of a single price adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentDirection {
    Upward,
    Downward,
    None,
}

impl AdjustmentDirection {
    pub fn from_amount(amount: f64) -> Self {
        if amount > 0.0 {
            AdjustmentDirection::Upward
        } else if amount < 0.0 {
            AdjustmentDirection::Downward
        } else {
            AdjustmentDirection::None
        }
    }
}

/// One named adjustment line item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceAdjustment {
    pub factor: String,
    /// Signed dollar amount, positive raises the comparable's price
    pub amount: f64,
    pub direction: AdjustmentDirection,
}

/// Result of normalizing one comparable's sale price to the subject.
/// Invariant: `adjusted_price == sale_price + net_adjustment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentResult {
    pub adjustments: Vec<PriceAdjustment>,
    pub net_adjustment: f64,
    pub adjusted_price: f64,
    /// Sum of absolute adjustments over sale price, as a percent
    pub gross_adjustment_percent: f64,
}

/// A comparable enriched with everything the ARV calculation derived for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedComparable {
    pub comparable: ComparableProperty,
    pub similarity: SimilarityResult,
    pub adjustment: AdjustmentResult,
    /// Normalized weight, 0-1; included weights sum to 1
    pub weight: f64,
    /// `adjusted_price * weight`, dollars
    pub arv_contribution: f64,
    pub included_in_arv: bool,
    pub exclusion_reason: Option<String>,
}

/// Which method produced the point estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMethod {
    Weighted,
    Simple,
}

impl std::fmt::Display for CalculationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalculationMethod::Weighted => write!(f, "weighted"),
            CalculationMethod::Simple => write!(f, "simple"),
        }
    }
}

/// Low/mid/high band around the point estimate
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceRange {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

/// Aggregate result of the ARV calculation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArvCalculation {
    /// Point estimate, whole dollars
    pub arv: f64,
    pub simple_average: f64,
    pub median: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub price_range: f64,
    /// Population standard deviation of adjusted prices
    pub std_dev: f64,
    /// std_dev / mean, a price-dispersion risk signal
    pub coefficient_of_variation: f64,
    pub avg_price_per_sqft: Option<f64>,
    /// 0-95; the model never claims near-certainty
    pub confidence: f64,
    pub confidence_range: ConfidenceRange,
    pub comparables_used: usize,
    pub comparables_provided: usize,
    pub comparables: Vec<AnalyzedComparable>,
    pub warnings: Vec<String>,
    pub calculation_method: CalculationMethod,
}

/// Comparable-count adequacy bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountBucket {
    Sufficient,
    Marginal,
    Insufficient,
}

/// Average-similarity quality bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityBucket {
    High,
    Medium,
    Low,
}

/// Price-dispersion bucket from the coefficient of variation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationBucket {
    Low,
    Moderate,
    High,
}

/// Overall letter rating for the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl std::fmt::Display for QualityRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityRating::Excellent => write!(f, "excellent"),
            QualityRating::Good => write!(f, "good"),
            QualityRating::Fair => write!(f, "fair"),
            QualityRating::Poor => write!(f, "poor"),
        }
    }
}

/// Quality assessment derived from the completed calculation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// Fraction of the ten tracked subject attributes present, 0.0-1.0
    pub data_completeness: f64,
    pub comparable_count: CountBucket,
    pub similarity: SimilarityBucket,
    pub price_variation: VariationBucket,
    pub overall_rating: QualityRating,
}

/// Summary statistics over the included comparables' adjusted prices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub comparables_used: usize,
    pub comparables_provided: usize,
    pub average_adjusted_price: f64,
    pub median_adjusted_price: f64,
    pub price_range: f64,
    pub coefficient_of_variation: f64,
    pub average_similarity: f64,
}

/// Top-level output, the only externally consumed artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparablesAnalysisResult {
    pub arv_calculation: ArvCalculation,
    /// Alternate estimate from price per square foot, when sqft is known
    pub price_per_sqft_arv: Option<f64>,
    /// Reconciled final estimate, whole dollars
    pub final_arv: f64,
    pub reconciliation_method: String,
    pub reconciliation_reasoning: String,
    pub statistics: SummaryStatistics,
    pub quality: QualityAssessment,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}
