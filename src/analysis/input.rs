//! Input boundary - adapt snake_case provider records to the internal model
//!
//! A thin, lossless renaming layer. The only hard preconditions in the whole
//! crate live here: coordinates must be present and sale prices positive.
//! Violations are caller bugs and get rejected before the core runs.

use crate::analysis::config::AnalysisConfig;
use crate::analysis::types::{ComparableProperty, SubjectProperty};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural problems in provider records
#[derive(Debug, Error)]
pub enum InputError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("sale_price must be positive, got {0}")]
    NonPositiveSalePrice(f64),
}

/// Subject property as the database/provider layer ships it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub living_area_sqft: Option<f64>,
    pub lot_size_sqft: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub year_built: Option<i32>,
    pub stories: Option<u32>,
    pub property_type: Option<String>,
    pub architectural_style: Option<String>,
    pub garage_spaces: Option<u32>,
    pub has_pool: Option<bool>,
    pub has_basement: Option<bool>,
    pub basement_finished: Option<bool>,
    pub condition_rating: Option<u8>,
    pub location_rating: Option<u8>,
    #[serde(default)]
    pub premium_features: Vec<String>,
}

/// Comparable-sale record from the market-data provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparableSaleRecord {
    pub address: Option<String>,
    #[serde(flatten)]
    pub property: SubjectRecord,
    pub sale_price: Option<f64>,
    pub sale_date: Option<NaiveDate>,
}

/// A complete analysis request: subject, comparable sales, and an optional
/// configuration override (any subset of fields)
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
    pub subject: SubjectRecord,
    pub comparables: Vec<ComparableSaleRecord>,
    #[serde(default)]
    pub config: Option<AnalysisConfig>,
}

impl TryFrom<SubjectRecord> for SubjectProperty {
    type Error = InputError;

    fn try_from(record: SubjectRecord) -> Result<Self, Self::Error> {
        let latitude = record
            .latitude
            .ok_or(InputError::MissingField("latitude"))?;
        let longitude = record
            .longitude
            .ok_or(InputError::MissingField("longitude"))?;

        Ok(SubjectProperty {
            latitude,
            longitude,
            sqft: record.living_area_sqft,
            lot_sqft: record.lot_size_sqft,
            bedrooms: record.bedrooms,
            bathrooms: record.bathrooms,
            year_built: record.year_built,
            stories: record.stories,
            property_type: record.property_type,
            style: record.architectural_style,
            garage_spaces: record.garage_spaces,
            has_pool: record.has_pool,
            has_basement: record.has_basement,
            basement_finished: record.basement_finished,
            condition_rating: record.condition_rating,
            location_rating: record.location_rating,
            premium_features: record.premium_features,
        })
    }
}

impl TryFrom<ComparableSaleRecord> for ComparableProperty {
    type Error = InputError;

    fn try_from(record: ComparableSaleRecord) -> Result<Self, Self::Error> {
        let sale_price = record
            .sale_price
            .ok_or(InputError::MissingField("sale_price"))?;
        if sale_price <= 0.0 {
            return Err(InputError::NonPositiveSalePrice(sale_price));
        }
        let sale_date = record
            .sale_date
            .ok_or(InputError::MissingField("sale_date"))?;

        Ok(ComparableProperty {
            address: record.address,
            property: record.property.try_into()?,
            sale_price,
            sale_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_record() -> SubjectRecord {
        SubjectRecord {
            latitude: Some(40.44),
            longitude: Some(-79.99),
            living_area_sqft: Some(1500.0),
            lot_size_sqft: Some(6000.0),
            bedrooms: Some(3),
            bathrooms: Some(2.0),
            year_built: Some(1990),
            stories: Some(1),
            property_type: Some("single family".to_string()),
            architectural_style: Some("ranch".to_string()),
            garage_spaces: Some(2),
            has_pool: Some(false),
            has_basement: Some(true),
            basement_finished: Some(true),
            condition_rating: Some(3),
            location_rating: Some(3),
            premium_features: vec!["fireplace".to_string()],
        }
    }

    #[test]
    fn test_subject_conversion_is_lossless() {
        let subject: SubjectProperty = full_record().try_into().unwrap();

        assert_eq!(subject.latitude, 40.44);
        assert_eq!(subject.sqft, Some(1500.0));
        assert_eq!(subject.style.as_deref(), Some("ranch"));
        assert_eq!(subject.premium_features, vec!["fireplace".to_string()]);
    }

    #[test]
    fn test_missing_coordinates_rejected() {
        let mut record = full_record();
        record.latitude = None;

        let result: Result<SubjectProperty, _> = record.try_into();
        assert!(matches!(result, Err(InputError::MissingField("latitude"))));
    }

    #[test]
    fn test_non_positive_sale_price_rejected() {
        let record = ComparableSaleRecord {
            address: None,
            property: full_record(),
            sale_price: Some(0.0),
            sale_date: NaiveDate::from_ymd_opt(2025, 5, 1),
        };

        let result: Result<ComparableProperty, _> = record.try_into();
        assert!(matches!(result, Err(InputError::NonPositiveSalePrice(_))));
    }

    #[test]
    fn test_request_deserializes_from_snake_case_json() {
        let json = r#"{
            "subject": {
                "latitude": 40.44,
                "longitude": -79.99,
                "living_area_sqft": 1500,
                "lot_size_sqft": 6000,
                "bedrooms": 3,
                "year_built": 1990
            },
            "comparables": [{
                "address": "12 Oak St",
                "latitude": 40.441,
                "longitude": -79.994,
                "living_area_sqft": 1480,
                "bedrooms": 3,
                "sale_price": 185000,
                "sale_date": "2025-05-01"
            }],
            "config": { "arv": { "max_comparables": 5 } }
        }"#;

        let request: AnalysisRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.comparables.len(), 1);
        assert_eq!(request.comparables[0].sale_price, Some(185_000.0));
        let config = request.config.unwrap();
        assert_eq!(config.arv.max_comparables, 5);
        // Unspecified override fields keep their defaults
        assert_eq!(config.arv.min_similarity_score, 50.0);
        assert_eq!(config.max_distance_miles, 3.0);
    }
}
