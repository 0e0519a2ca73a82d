use chrono::NaiveDate;
use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::services::normalizer::normalize;

/// Wine style as listed in the catalog.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum WineColor {
    Red,
    White,
    Rose,
    Sparkling,
    Dessert,
    Fortified,
}

/// One grape in a blend, in label order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct GrapeVariety {
    #[garde(length(min = 1, max = 100))]
    pub name: String,

    #[garde(range(min = 0.0, max = 100.0))]
    pub percentage: Option<f64>,
}

/// Catalog entry: a wine, optionally paired with its review.
///
/// Optional fields are always serialized (as `null` when absent) so the local
/// cache file round-trips "absent" as absent rather than as a default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct Wine {
    #[garde(skip)]
    pub id: Uuid,

    #[garde(length(min = 1, max = 200))]
    pub producer: String,

    #[garde(length(max = 200))]
    pub name: String,

    #[garde(range(min = 1800, max = 2100))]
    pub vintage: Option<i32>,

    #[garde(skip)]
    pub region: Option<String>,
    #[garde(skip)]
    pub sub_region: Option<String>,
    #[garde(skip)]
    pub appellation: Option<String>,
    #[garde(skip)]
    pub country: Option<String>,
    #[garde(skip)]
    pub color: Option<WineColor>,

    #[garde(dive)]
    pub grapes: Vec<GrapeVariety>,

    #[garde(range(min = 0.0, max = 100.0))]
    pub alcohol_percent: Option<f64>,

    // Review-derived fields
    #[garde(range(min = 0, max = 100))]
    pub score: Option<u8>,
    #[garde(skip)]
    pub tasting_note: Option<String>,
    #[garde(skip)]
    pub reviewer: Option<String>,
    #[garde(skip)]
    pub review_date: Option<NaiveDate>,
    #[garde(skip)]
    pub drink_window_start: Option<i32>,
    #[garde(skip)]
    pub drink_window_end: Option<i32>,
    #[garde(range(min = 0.0))]
    pub release_price: Option<f64>,
    #[garde(skip)]
    pub price_currency: Option<String>,
}

impl Wine {
    /// Minimal entry with only the identifying fields set.
    pub fn new(id: Uuid, producer: impl Into<String>, name: impl Into<String>, vintage: Option<i32>) -> Self {
        Self {
            id,
            producer: producer.into(),
            name: name.into(),
            vintage,
            region: None,
            sub_region: None,
            appellation: None,
            country: None,
            color: None,
            grapes: Vec::new(),
            alcohol_percent: None,
            score: None,
            tasting_note: None,
            reviewer: None,
            review_date: None,
            drink_window_start: None,
            drink_window_end: None,
            release_price: None,
            price_currency: None,
        }
    }

    /// Normalized "producer name", the key for exact matching.
    pub fn display_name(&self) -> String {
        normalize(&format!("{} {}", self.producer, self.name))
    }

    /// Normalized "producer name region", the text fed to the term index.
    pub fn search_text(&self) -> String {
        normalize(&format!(
            "{} {} {}",
            self.producer,
            self.name,
            self.region.as_deref().unwrap_or_default()
        ))
    }

    /// Human-readable "producer name vintage" with empty parts skipped.
    pub fn full_name(&self) -> String {
        let vintage = self.vintage.map(|v| v.to_string());
        [Some(self.producer.as_str()), Some(self.name.as_str()), vintage.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
