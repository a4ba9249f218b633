use std::path::Path;

use anyhow::{Context, Result};

use crate::db::Database;
use crate::fdc_import::{self, FdcImportSummary};
use crate::models::{Food, FoodPortion};
use crate::search;

/// Read-side facade over the catalog.
///
/// Every operation fetches a fresh snapshot from the store and works on it
/// in memory; nothing is cached between calls and the snapshot is never
/// mutated.
pub struct FoodService {
    db: Database,
}

impl FoodService {
    pub fn new(db_path: &Path) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self { db })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn get_all_foods(&self) -> Result<Vec<Food>> {
        self.db.all_foods()
    }

    pub fn get_food_by_id(&self, fdc_id: i64) -> Result<Food> {
        self.db.food_by_id(fdc_id)
    }

    /// All foods whose description contains every whitespace-separated
    /// word of `query`, case-insensitively, in catalog order.
    pub fn search_by_description_words(&self, query: &str) -> Result<Vec<Food>> {
        let snapshot = self.db.all_foods()?;
        Ok(search::filter_by_words(&snapshot, query)
            .into_iter()
            .cloned()
            .collect())
    }

    /// The matching food with the most complete calorie conversion.
    /// Fails when nothing matches or no match has a calorie conversion.
    pub fn search_best_by_description(&self, query: &str) -> Result<Food> {
        let snapshot = self.db.all_foods()?;
        search::best_match(&snapshot, query)
            .cloned()
            .with_context(|| format!("No nutrition information found for: {query}"))
    }

    /// The food's first portion (lowest sequence number).
    pub fn get_portion(&self, fdc_id: i64) -> Result<FoodPortion> {
        self.db
            .first_portion(fdc_id)?
            .with_context(|| format!("No portion found for fdcId {fdc_id}"))
    }

    /// Load a FoodData Central CSV distribution directory into the store.
    pub fn import_fdc_dir(&self, dir: &Path) -> Result<FdcImportSummary> {
        fdc_import::import_fdc_dir(&self.db, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CalorieConversionFactor, NewFood, NewPortion};

    fn seed_food(svc: &FoodService, fdc_id: i64, description: &str) {
        svc.database()
            .insert_food(&NewFood {
                fdc_id,
                description: description.to_string(),
                data_type: None,
                category: None,
                publication_date: None,
            })
            .unwrap();
    }

    fn seed_conversion(
        svc: &FoodService,
        factor_id: i64,
        fdc_id: i64,
        macros: Option<(Option<f64>, Option<f64>, Option<f64>)>,
    ) {
        svc.database()
            .insert_conversion_factor(factor_id, fdc_id)
            .unwrap();
        if let Some((protein, fat, carbs)) = macros {
            svc.database()
                .set_calorie_conversion(
                    factor_id,
                    &CalorieConversionFactor {
                        protein_value: protein,
                        fat_value: fat,
                        carbohydrate_value: carbs,
                    },
                )
                .unwrap();
        }
    }

    /// Scenario from the original behavior: "chicken breast" has protein
    /// and fat, "chicken soup" has all three macros.
    fn chicken_service() -> FoodService {
        let svc = FoodService::new_in_memory().unwrap();
        seed_food(&svc, 1, "chicken breast");
        seed_conversion(&svc, 10, 1, Some((Some(30.0), Some(3.0), None)));
        seed_food(&svc, 2, "chicken soup");
        seed_conversion(&svc, 20, 2, Some((Some(5.0), Some(2.0), Some(10.0))));
        svc
    }

    #[test]
    fn test_get_all_foods() {
        let svc = chicken_service();
        let foods = svc.get_all_foods().unwrap();
        assert_eq!(foods.len(), 2);
        assert_eq!(foods[0].fdc_id, 1);
    }

    #[test]
    fn test_get_food_by_id() {
        let svc = chicken_service();
        let food = svc.get_food_by_id(2).unwrap();
        assert_eq!(food.description, "chicken soup");
        assert_eq!(food.conversion_factors.len(), 1);
    }

    #[test]
    fn test_get_food_by_id_not_found() {
        let svc = chicken_service();
        let err = svc.get_food_by_id(42).unwrap_err();
        assert!(err.to_string().contains("Food not found with fdcId 42"));
    }

    #[test]
    fn test_search_by_description_words() {
        let svc = chicken_service();
        let foods = svc.search_by_description_words("chicken").unwrap();
        assert_eq!(foods.len(), 2);

        let foods = svc.search_by_description_words("chicken soup").unwrap();
        assert_eq!(foods.len(), 1);
        assert_eq!(foods[0].fdc_id, 2);
    }

    #[test]
    fn test_search_best_prefers_complete_macros() {
        let svc = chicken_service();
        let best = svc.search_best_by_description("chicken").unwrap();
        assert_eq!(best.fdc_id, 2);
    }

    #[test]
    fn test_search_best_not_found_without_conversions() {
        // Matching food exists but has no conversion factors at all
        let svc = FoodService::new_in_memory().unwrap();
        seed_food(&svc, 1, "apple pie");

        let filtered = svc.search_by_description_words("apple").unwrap();
        assert_eq!(filtered.len(), 1);

        let err = svc.search_best_by_description("apple").unwrap_err();
        assert!(
            err.to_string()
                .contains("No nutrition information found for: apple")
        );
    }

    #[test]
    fn test_search_best_not_found_when_no_match() {
        let svc = chicken_service();
        let err = svc.search_best_by_description("xyz").unwrap_err();
        assert!(
            err.to_string()
                .contains("No nutrition information found for: xyz")
        );
    }

    #[test]
    fn test_search_best_ignores_bare_factors() {
        let svc = FoodService::new_in_memory().unwrap();
        seed_food(&svc, 1, "apple pie");
        seed_conversion(&svc, 10, 1, None);

        let err = svc.search_best_by_description("apple").unwrap_err();
        assert!(err.to_string().contains("No nutrition information"));
    }

    #[test]
    fn test_get_portion() {
        let svc = chicken_service();
        svc.database()
            .insert_portion(&NewPortion {
                id: 1,
                fdc_id: 2,
                seq_num: Some(1),
                amount: Some(1.0),
                unit_name: Some("cup".to_string()),
                gram_weight: Some(248.0),
            })
            .unwrap();

        let portion = svc.get_portion(2).unwrap();
        assert_eq!(portion.unit_name.as_deref(), Some("cup"));
        assert_eq!(portion.gram_weight, Some(248.0));
    }

    #[test]
    fn test_get_portion_not_found() {
        let svc = chicken_service();
        let err = svc.get_portion(1).unwrap_err();
        assert!(err.to_string().contains("No portion found for fdcId 1"));
    }
}
