use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::models::{
    CalorieConversionFactor, Food, FoodPortion, NewFood, NewPortion, NutrientConversionFactor,
};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS foods (
                    fdc_id INTEGER PRIMARY KEY,
                    description TEXT NOT NULL,
                    data_type TEXT,
                    category TEXT,
                    publication_date TEXT
                );

                CREATE TABLE IF NOT EXISTS nutrient_conversion_factors (
                    id INTEGER PRIMARY KEY,
                    fdc_id INTEGER NOT NULL REFERENCES foods(fdc_id) ON DELETE CASCADE
                );

                CREATE TABLE IF NOT EXISTS calorie_conversion_factors (
                    factor_id INTEGER PRIMARY KEY
                        REFERENCES nutrient_conversion_factors(id) ON DELETE CASCADE,
                    protein_value REAL,
                    fat_value REAL,
                    carbohydrate_value REAL
                );

                CREATE TABLE IF NOT EXISTS food_portions (
                    id INTEGER PRIMARY KEY,
                    fdc_id INTEGER NOT NULL REFERENCES foods(fdc_id) ON DELETE CASCADE,
                    seq_num INTEGER,
                    amount REAL,
                    unit_name TEXT,
                    gram_weight REAL
                );

                CREATE INDEX IF NOT EXISTS idx_conversion_factors_fdc
                    ON nutrient_conversion_factors(fdc_id);
                CREATE INDEX IF NOT EXISTS idx_food_portions_fdc
                    ON food_portions(fdc_id);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Ingestion writes ---

    pub fn insert_food(&self, food: &NewFood) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO foods (fdc_id, description, data_type, category, publication_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                food.fdc_id,
                food.description,
                food.data_type,
                food.category,
                food.publication_date.map(|d| d.format("%Y-%m-%d").to_string()),
            ],
        )?;
        Ok(())
    }

    pub fn insert_conversion_factor(&self, id: i64, fdc_id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO nutrient_conversion_factors (id, fdc_id) VALUES (?1, ?2)",
            params![id, fdc_id],
        )?;
        Ok(())
    }

    pub fn set_calorie_conversion(
        &self,
        factor_id: i64,
        conversion: &CalorieConversionFactor,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO calorie_conversion_factors
                 (factor_id, protein_value, fat_value, carbohydrate_value)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                factor_id,
                conversion.protein_value,
                conversion.fat_value,
                conversion.carbohydrate_value,
            ],
        )?;
        Ok(())
    }

    pub fn insert_portion(&self, portion: &NewPortion) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO food_portions
                 (id, fdc_id, seq_num, amount, unit_name, gram_weight)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                portion.id,
                portion.fdc_id,
                portion.seq_num,
                portion.amount,
                portion.unit_name,
                portion.gram_weight,
            ],
        )?;
        Ok(())
    }

    pub fn factor_exists(&self, id: i64) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM nutrient_conversion_factors WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn food_exists(&self, fdc_id: i64) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT fdc_id FROM foods WHERE fdc_id = ?1",
                params![fdc_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    // --- Snapshot reads ---

    /// Full catalog snapshot in `fdc_id` order, conversion factors attached.
    pub fn all_foods(&self) -> Result<Vec<Food>> {
        let mut stmt = self.conn.prepare(
            "SELECT fdc_id, description, data_type, category, publication_date
             FROM foods ORDER BY fdc_id",
        )?;
        let mut foods: Vec<Food> = stmt
            .query_map([], Self::food_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let index: HashMap<i64, usize> = foods
            .iter()
            .enumerate()
            .map(|(i, f)| (f.fdc_id, i))
            .collect();

        let mut stmt = self.conn.prepare(
            "SELECT n.id, n.fdc_id, c.factor_id,
                    c.protein_value, c.fat_value, c.carbohydrate_value
             FROM nutrient_conversion_factors n
             LEFT JOIN calorie_conversion_factors c ON c.factor_id = n.id
             ORDER BY n.id",
        )?;
        let factors = stmt.query_map([], |row| {
            let fdc_id: i64 = row.get(1)?;
            Ok((fdc_id, Self::factor_from_row(row)?))
        })?;

        for result in factors {
            let (fdc_id, factor) = result?;
            if let Some(&i) = index.get(&fdc_id) {
                foods[i].conversion_factors.push(factor);
            }
        }

        Ok(foods)
    }

    pub fn food_by_id(&self, fdc_id: i64) -> Result<Food> {
        let mut food = self
            .conn
            .query_row(
                "SELECT fdc_id, description, data_type, category, publication_date
                 FROM foods WHERE fdc_id = ?1",
                params![fdc_id],
                Self::food_from_row,
            )
            .with_context(|| format!("Food not found with fdcId {fdc_id}"))?;

        let mut stmt = self.conn.prepare(
            "SELECT n.id, n.fdc_id, c.factor_id,
                    c.protein_value, c.fat_value, c.carbohydrate_value
             FROM nutrient_conversion_factors n
             LEFT JOIN calorie_conversion_factors c ON c.factor_id = n.id
             WHERE n.fdc_id = ?1
             ORDER BY n.id",
        )?;
        food.conversion_factors = stmt
            .query_map(params![fdc_id], Self::factor_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(food)
    }

    /// First portion for a food, lowest `seq_num` (then id) wins.
    pub fn first_portion(&self, fdc_id: i64) -> Result<Option<FoodPortion>> {
        self.conn
            .query_row(
                "SELECT id, fdc_id, seq_num, amount, unit_name, gram_weight
                 FROM food_portions WHERE fdc_id = ?1
                 ORDER BY seq_num ASC NULLS LAST, id ASC
                 LIMIT 1",
                params![fdc_id],
                |row| {
                    Ok(FoodPortion {
                        id: row.get(0)?,
                        fdc_id: row.get(1)?,
                        seq_num: row.get(2)?,
                        amount: row.get(3)?,
                        unit_name: row.get(4)?,
                        gram_weight: row.get(5)?,
                    })
                },
            )
            .optional()
            .context("Failed to query food portion")
    }

    pub fn food_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM foods", [], |row| row.get(0))?;
        Ok(count)
    }

    // --- Row mapping ---

    fn food_from_row(row: &Row) -> rusqlite::Result<Food> {
        let publication_date: Option<String> = row.get(4)?;
        Ok(Food {
            fdc_id: row.get(0)?,
            description: row.get(1)?,
            data_type: row.get(2)?,
            category: row.get(3)?,
            publication_date: publication_date
                .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            conversion_factors: Vec::new(),
        })
    }

    fn factor_from_row(row: &Row) -> rusqlite::Result<NutrientConversionFactor> {
        // factor_id is NULL when no calorie conversion row joined; a row of
        // all-NULL values is a real conversion with score 0.
        let calorie_row: Option<i64> = row.get(2)?;
        let calorie_conversion = if calorie_row.is_some() {
            Some(CalorieConversionFactor {
                protein_value: row.get(3)?,
                fat_value: row.get(4)?,
                carbohydrate_value: row.get(5)?,
            })
        } else {
            None
        };
        Ok(NutrientConversionFactor {
            id: row.get(0)?,
            calorie_conversion,
        })
    }
}
