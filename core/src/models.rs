use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Food {
    pub fdc_id: i64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<NaiveDate>,
    #[serde(default)]
    pub conversion_factors: Vec<NutrientConversionFactor>,
}

/// A measurement context under which a food's calories can be derived.
/// Carries at most one calorie conversion; factors without one exist in the
/// source data and never take part in ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutrientConversionFactor {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calorie_conversion: Option<CalorieConversionFactor>,
}

/// Per-gram macro multipliers for one conversion factor. Each field is
/// absent when the source data carries no value — absent and zero are
/// different things and must stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalorieConversionFactor {
    pub protein_value: Option<f64>,
    pub fat_value: Option<f64>,
    pub carbohydrate_value: Option<f64>,
}

impl CalorieConversionFactor {
    /// Completeness score: how many of protein, fat and carbohydrate are
    /// present. Range 0..=3.
    #[must_use]
    pub fn macro_count(&self) -> usize {
        [self.protein_value, self.fat_value, self.carbohydrate_value]
            .iter()
            .filter(|v| v.is_some())
            .count()
    }

    /// Display calories from the present macros using Atwater 4/9/4
    /// factors. `None` when no macro is present at all.
    #[must_use]
    pub fn total_calories(&self) -> Option<f64> {
        if self.macro_count() == 0 {
            return None;
        }
        let protein = self.protein_value.unwrap_or(0.0) * 4.0;
        let fat = self.fat_value.unwrap_or(0.0) * 9.0;
        let carbs = self.carbohydrate_value.unwrap_or(0.0) * 4.0;
        Some(protein + fat + carbs)
    }
}

impl Food {
    /// The most complete calorie conversion among this food's factors, or
    /// `None` when no factor carries one. Ties keep the earliest factor.
    #[must_use]
    pub fn best_calorie_conversion(&self) -> Option<&CalorieConversionFactor> {
        let mut best: Option<&CalorieConversionFactor> = None;
        for factor in &self.conversion_factors {
            let Some(conversion) = factor.calorie_conversion.as_ref() else {
                continue;
            };
            if best.is_none_or(|b| conversion.macro_count() > b.macro_count()) {
                best = Some(conversion);
            }
        }
        best
    }
}

/// A household-measure serving for a food.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodPortion {
    pub id: i64,
    pub fdc_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq_num: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gram_weight: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct NewFood {
    pub fdc_id: i64,
    pub description: String,
    pub data_type: Option<String>,
    pub category: Option<String>,
    pub publication_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct NewPortion {
    pub id: i64,
    pub fdc_id: i64,
    pub seq_num: Option<i64>,
    pub amount: Option<f64>,
    pub unit_name: Option<String>,
    pub gram_weight: Option<f64>,
}

/// Validate an ingested food row: the identifier must be positive and the
/// description non-empty.
pub fn validate_food_data(food: &NewFood) -> Result<()> {
    if food.fdc_id <= 0 {
        bail!("fdc_id must be positive (got {})", food.fdc_id);
    }
    if food.description.trim().is_empty() {
        bail!("Food description must not be empty");
    }
    Ok(())
}

/// Validate an ingested calorie conversion: present macro values must not
/// be negative.
pub fn validate_calorie_conversion(conversion: &CalorieConversionFactor) -> Result<()> {
    if conversion.protein_value.is_some_and(|v| v < 0.0) {
        bail!("protein_value must not be negative");
    }
    if conversion.fat_value.is_some_and(|v| v < 0.0) {
        bail!("fat_value must not be negative");
    }
    if conversion.carbohydrate_value.is_some_and(|v| v < 0.0) {
        bail!("carbohydrate_value must not be negative");
    }
    Ok(())
}

/// Validate an ingested portion row: amount and gram weight, when present,
/// must be positive.
pub fn validate_portion_data(portion: &NewPortion) -> Result<()> {
    if portion.amount.is_some_and(|v| v <= 0.0) {
        bail!("Portion amount must be greater than 0");
    }
    if portion.gram_weight.is_some_and(|v| v <= 0.0) {
        bail!("Portion gram_weight must be greater than 0");
    }
    Ok(())
}
