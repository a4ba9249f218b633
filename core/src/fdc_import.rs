//! Ingestion of the USDA FoodData Central CSV distribution.
//!
//! A distribution directory contains one CSV per table. `food.csv`,
//! `food_nutrient_conversion_factor.csv` and
//! `food_calorie_conversion_factor.csv` are required; categories, portions
//! and measure units are loaded when present.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;

use crate::db::Database;
use crate::models::{
    CalorieConversionFactor, NewFood, NewPortion, validate_calorie_conversion, validate_food_data,
    validate_portion_data,
};

/// A single row parsed from `food.csv`.
#[derive(Debug, Clone)]
pub struct FoodRow {
    pub fdc_id: i64,
    pub data_type: Option<String>,
    pub description: String,
    pub food_category_id: Option<String>,
    pub publication_date: Option<NaiveDate>,
}

/// A single row parsed from `food_nutrient_conversion_factor.csv`.
#[derive(Debug, Clone)]
pub struct ConversionFactorRow {
    pub id: i64,
    pub fdc_id: i64,
}

/// A single row parsed from `food_calorie_conversion_factor.csv`.
#[derive(Debug, Clone)]
pub struct CalorieFactorRow {
    pub factor_id: i64,
    pub conversion: CalorieConversionFactor,
}

/// A single row parsed from `food_portion.csv`.
#[derive(Debug, Clone)]
pub struct PortionRow {
    pub id: i64,
    pub fdc_id: i64,
    pub seq_num: Option<i64>,
    pub amount: Option<f64>,
    pub measure_unit_id: Option<String>,
    pub modifier: Option<String>,
    pub gram_weight: Option<f64>,
}

/// Counts of what an FDC import did. Skipped rows are orphans (unknown
/// food or factor references) or rows that failed validation.
#[derive(Debug, Clone, Default)]
pub struct FdcImportSummary {
    pub foods_imported: usize,
    pub foods_skipped: usize,
    pub conversion_factors_imported: usize,
    pub conversion_factors_skipped: usize,
    pub calorie_conversions_imported: usize,
    pub calorie_conversions_skipped: usize,
    pub portions_imported: usize,
    pub portions_skipped: usize,
}

fn reader_from<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Case-insensitive column lookup, as the distributions are not consistent
/// about header casing.
fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}

fn require_columns(headers: &csv::StringRecord, names: &[&str], file: &str) -> Result<()> {
    for name in names {
        if column(headers, name).is_none() {
            bail!("Missing required column '{name}' in {file}");
        }
    }
    Ok(())
}

fn opt_string(record: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn opt_f64(record: &csv::StringRecord, idx: Option<usize>) -> Option<f64> {
    idx.and_then(|i| record.get(i))
        .and_then(|v| v.trim().parse::<f64>().ok())
}

fn opt_i64(record: &csv::StringRecord, idx: Option<usize>) -> Option<i64> {
    idx.and_then(|i| record.get(i))
        .and_then(|v| v.trim().parse::<i64>().ok())
}

/// Parse a publication date, tolerating both ISO and US-style values.
fn parse_publication_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%Y"))
        .ok()
}

/// Parse `food.csv` from any reader. Rows without a parseable `fdc_id` or
/// with an empty description are dropped.
pub fn parse_food_csv<R: Read>(reader: R) -> Result<Vec<FoodRow>> {
    let mut rdr = reader_from(reader);
    let headers = rdr
        .headers()
        .context("Failed to read food.csv headers")?
        .clone();
    require_columns(&headers, &["fdc_id", "description"], "food.csv")?;

    let idx_id = column(&headers, "fdc_id");
    let idx_type = column(&headers, "data_type");
    let idx_desc = column(&headers, "description");
    let idx_category = column(&headers, "food_category_id");
    let idx_date = column(&headers, "publication_date");

    let mut rows = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let record =
            result.with_context(|| format!("Failed to parse food.csv row {}", line_num + 2))?;

        let Some(fdc_id) = opt_i64(&record, idx_id) else {
            continue;
        };
        let Some(description) = opt_string(&record, idx_desc) else {
            continue;
        };

        rows.push(FoodRow {
            fdc_id,
            data_type: opt_string(&record, idx_type),
            description,
            food_category_id: opt_string(&record, idx_category),
            publication_date: opt_string(&record, idx_date)
                .and_then(|d| parse_publication_date(&d)),
        });
    }

    Ok(rows)
}

/// Parse a two-column id → value lookup file (`food_category.csv` with its
/// `description` column, `measure_unit.csv` with its `name` column).
pub fn parse_lookup_csv<R: Read>(
    reader: R,
    value_column: &str,
    file: &str,
) -> Result<HashMap<String, String>> {
    let mut rdr = reader_from(reader);
    let headers = rdr
        .headers()
        .with_context(|| format!("Failed to read {file} headers"))?
        .clone();
    require_columns(&headers, &["id", value_column], file)?;

    let idx_id = column(&headers, "id");
    let idx_value = column(&headers, value_column);

    let mut map = HashMap::new();
    for (line_num, result) in rdr.records().enumerate() {
        let record =
            result.with_context(|| format!("Failed to parse {file} row {}", line_num + 2))?;
        let (Some(id), Some(value)) = (
            opt_string(&record, idx_id),
            opt_string(&record, idx_value),
        ) else {
            continue;
        };
        map.insert(id, value);
    }

    Ok(map)
}

/// Parse `food_nutrient_conversion_factor.csv`.
pub fn parse_conversion_factor_csv<R: Read>(reader: R) -> Result<Vec<ConversionFactorRow>> {
    let mut rdr = reader_from(reader);
    let headers = rdr
        .headers()
        .context("Failed to read food_nutrient_conversion_factor.csv headers")?
        .clone();
    require_columns(
        &headers,
        &["id", "fdc_id"],
        "food_nutrient_conversion_factor.csv",
    )?;

    let idx_id = column(&headers, "id");
    let idx_fdc = column(&headers, "fdc_id");

    let mut rows = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let record = result.with_context(|| {
            format!(
                "Failed to parse food_nutrient_conversion_factor.csv row {}",
                line_num + 2
            )
        })?;
        let (Some(id), Some(fdc_id)) = (opt_i64(&record, idx_id), opt_i64(&record, idx_fdc))
        else {
            continue;
        };
        rows.push(ConversionFactorRow { id, fdc_id });
    }

    Ok(rows)
}

/// Parse `food_calorie_conversion_factor.csv`. Empty macro cells become
/// absent values, never zero.
pub fn parse_calorie_factor_csv<R: Read>(reader: R) -> Result<Vec<CalorieFactorRow>> {
    let mut rdr = reader_from(reader);
    let headers = rdr
        .headers()
        .context("Failed to read food_calorie_conversion_factor.csv headers")?
        .clone();
    require_columns(
        &headers,
        &["food_nutrient_conversion_factor_id"],
        "food_calorie_conversion_factor.csv",
    )?;

    let idx_factor = column(&headers, "food_nutrient_conversion_factor_id");
    let idx_protein = column(&headers, "protein_value");
    let idx_fat = column(&headers, "fat_value");
    let idx_carbs = column(&headers, "carbohydrate_value");

    let mut rows = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let record = result.with_context(|| {
            format!(
                "Failed to parse food_calorie_conversion_factor.csv row {}",
                line_num + 2
            )
        })?;
        let Some(factor_id) = opt_i64(&record, idx_factor) else {
            continue;
        };
        rows.push(CalorieFactorRow {
            factor_id,
            conversion: CalorieConversionFactor {
                protein_value: opt_f64(&record, idx_protein),
                fat_value: opt_f64(&record, idx_fat),
                carbohydrate_value: opt_f64(&record, idx_carbs),
            },
        });
    }

    Ok(rows)
}

/// Parse `food_portion.csv`.
pub fn parse_portion_csv<R: Read>(reader: R) -> Result<Vec<PortionRow>> {
    let mut rdr = reader_from(reader);
    let headers = rdr
        .headers()
        .context("Failed to read food_portion.csv headers")?
        .clone();
    require_columns(&headers, &["id", "fdc_id"], "food_portion.csv")?;

    let idx_id = column(&headers, "id");
    let idx_fdc = column(&headers, "fdc_id");
    let idx_seq = column(&headers, "seq_num");
    let idx_amount = column(&headers, "amount");
    let idx_unit = column(&headers, "measure_unit_id");
    let idx_modifier = column(&headers, "modifier");
    let idx_weight = column(&headers, "gram_weight");

    let mut rows = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let record = result
            .with_context(|| format!("Failed to parse food_portion.csv row {}", line_num + 2))?;
        let (Some(id), Some(fdc_id)) = (opt_i64(&record, idx_id), opt_i64(&record, idx_fdc))
        else {
            continue;
        };
        rows.push(PortionRow {
            id,
            fdc_id,
            seq_num: opt_i64(&record, idx_seq),
            amount: opt_f64(&record, idx_amount),
            measure_unit_id: opt_string(&record, idx_unit),
            modifier: opt_string(&record, idx_modifier),
            gram_weight: opt_f64(&record, idx_weight),
        });
    }

    Ok(rows)
}

/// Resolve a portion's display unit: the measure-unit name when known,
/// otherwise the free-text modifier. The FDC sentinel `undetermined`
/// counts as no unit.
#[must_use]
pub fn resolve_unit_name(
    row: &PortionRow,
    measure_units: &HashMap<String, String>,
) -> Option<String> {
    let from_unit = row
        .measure_unit_id
        .as_ref()
        .and_then(|id| measure_units.get(id))
        .filter(|name| !name.eq_ignore_ascii_case("undetermined"))
        .cloned();
    from_unit.or_else(|| row.modifier.clone())
}

/// Import parsed rows into the store, in foreign-key order. Orphan rows
/// are skipped and counted, not fatal: the public distributions contain
/// references into tables they do not ship.
pub fn import_fdc_rows(
    db: &Database,
    foods: &[FoodRow],
    categories: &HashMap<String, String>,
    factors: &[ConversionFactorRow],
    calories: &[CalorieFactorRow],
    portions: &[PortionRow],
    measure_units: &HashMap<String, String>,
) -> Result<FdcImportSummary> {
    let mut summary = FdcImportSummary::default();

    for row in foods {
        let food = NewFood {
            fdc_id: row.fdc_id,
            description: row.description.clone(),
            data_type: row.data_type.clone(),
            category: row
                .food_category_id
                .as_ref()
                .and_then(|id| categories.get(id))
                .cloned(),
            publication_date: row.publication_date,
        };
        if validate_food_data(&food).is_err() {
            summary.foods_skipped += 1;
            continue;
        }
        db.insert_food(&food)?;
        summary.foods_imported += 1;
    }

    for row in factors {
        if db.food_exists(row.fdc_id)? {
            db.insert_conversion_factor(row.id, row.fdc_id)?;
            summary.conversion_factors_imported += 1;
        } else {
            summary.conversion_factors_skipped += 1;
        }
    }

    for row in calories {
        if validate_calorie_conversion(&row.conversion).is_err()
            || !db.factor_exists(row.factor_id)?
        {
            summary.calorie_conversions_skipped += 1;
            continue;
        }
        db.set_calorie_conversion(row.factor_id, &row.conversion)?;
        summary.calorie_conversions_imported += 1;
    }

    for row in portions {
        let portion = NewPortion {
            id: row.id,
            fdc_id: row.fdc_id,
            seq_num: row.seq_num,
            amount: row.amount,
            unit_name: resolve_unit_name(row, measure_units),
            gram_weight: row.gram_weight,
        };
        if validate_portion_data(&portion).is_err() || !db.food_exists(row.fdc_id)? {
            summary.portions_skipped += 1;
            continue;
        }
        db.insert_portion(&portion)?;
        summary.portions_imported += 1;
    }

    Ok(summary)
}

/// Load an FDC distribution directory into the store.
pub fn import_fdc_dir(db: &Database, dir: &Path) -> Result<FdcImportSummary> {
    let open = |name: &str| -> Result<File> {
        File::open(dir.join(name)).with_context(|| format!("Failed to open {name} in {}", dir.display()))
    };
    let open_optional = |name: &str| -> Result<Option<File>> {
        let path = dir.join(name);
        if path.exists() {
            Ok(Some(open(name)?))
        } else {
            Ok(None)
        }
    };

    let categories = match open_optional("food_category.csv")? {
        Some(file) => parse_lookup_csv(file, "description", "food_category.csv")?,
        None => HashMap::new(),
    };
    let measure_units = match open_optional("measure_unit.csv")? {
        Some(file) => parse_lookup_csv(file, "name", "measure_unit.csv")?,
        None => HashMap::new(),
    };

    let foods = parse_food_csv(open("food.csv")?)?;
    let factors = parse_conversion_factor_csv(open("food_nutrient_conversion_factor.csv")?)?;
    let calories = parse_calorie_factor_csv(open("food_calorie_conversion_factor.csv")?)?;
    let portions = match open_optional("food_portion.csv")? {
        Some(file) => parse_portion_csv(file)?,
        None => Vec::new(),
    };

    import_fdc_rows(
        db,
        &foods,
        &categories,
        &factors,
        &calories,
        &portions,
        &measure_units,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOOD_CSV: &str = "\
fdc_id,data_type,description,food_category_id,publication_date
321360,sr_legacy_food,\"Hummus, commercial\",16,2019-04-01
321500,sr_legacy_food,\"Chicken, broilers or fryers, breast, meat only, raw\",5,2019-04-01
321999,sr_legacy_food,,5,2019-04-01
";

    const CATEGORY_CSV: &str = "\
id,code,description
5,0500,Poultry Products
16,1600,Legumes and Legume Products
";

    const FACTOR_CSV: &str = "\
id,fdc_id
1001,321360
1002,321500
1003,999999
";

    const CALORIE_CSV: &str = "\
food_nutrient_conversion_factor_id,protein_value,fat_value,carbohydrate_value
1001,3.47,8.37,4.07
1002,4.27,9.02,
1003,4.27,9.02,3.87
";

    const PORTION_CSV: &str = "\
id,fdc_id,seq_num,amount,measure_unit_id,portion_description,modifier,gram_weight,data_points,footnote,min_year_acquired
81549,321360,1,1,1000,,cup,246,,,
81550,321500,1,0.5,9999,,breast,118,,,
81551,999999,1,1,1000,,cup,100,,,
";

    const MEASURE_UNIT_CSV: &str = "\
id,name
1000,cup
9999,undetermined
";

    #[test]
    fn test_parse_food_csv() {
        let rows = parse_food_csv(FOOD_CSV.as_bytes()).unwrap();
        // The blank-description row is dropped at parse time
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fdc_id, 321_360);
        assert_eq!(rows[0].description, "Hummus, commercial");
        assert_eq!(rows[0].food_category_id.as_deref(), Some("16"));
        assert_eq!(
            rows[0].publication_date,
            NaiveDate::from_ymd_opt(2019, 4, 1)
        );
    }

    #[test]
    fn test_parse_food_csv_missing_required_column() {
        let bad = "fdc_id,data_type\n1,sr_legacy_food\n";
        let err = parse_food_csv(bad.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("description"));
    }

    #[test]
    fn test_parse_food_csv_us_dates() {
        let csv = "fdc_id,description,publication_date\n7,Oats,4/1/2019\n";
        let rows = parse_food_csv(csv.as_bytes()).unwrap();
        assert_eq!(
            rows[0].publication_date,
            NaiveDate::from_ymd_opt(2019, 4, 1)
        );
    }

    #[test]
    fn test_parse_calorie_factor_csv_empty_cells_are_absent() {
        let rows = parse_calorie_factor_csv(CALORIE_CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].conversion.macro_count(), 3);
        assert_eq!(rows[1].conversion.carbohydrate_value, None);
        assert_eq!(rows[1].conversion.macro_count(), 2);
    }

    #[test]
    fn test_parse_lookup_csv() {
        let map = parse_lookup_csv(CATEGORY_CSV.as_bytes(), "description", "food_category.csv")
            .unwrap();
        assert_eq!(map.get("5").map(String::as_str), Some("Poultry Products"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_resolve_unit_name() {
        let units = parse_lookup_csv(MEASURE_UNIT_CSV.as_bytes(), "name", "measure_unit.csv")
            .unwrap();
        let rows = parse_portion_csv(PORTION_CSV.as_bytes()).unwrap();
        assert_eq!(resolve_unit_name(&rows[0], &units).as_deref(), Some("cup"));
        // undetermined unit falls back to the modifier text
        assert_eq!(
            resolve_unit_name(&rows[1], &units).as_deref(),
            Some("breast")
        );
    }

    fn import_fixture(db: &Database) -> FdcImportSummary {
        let foods = parse_food_csv(FOOD_CSV.as_bytes()).unwrap();
        let categories =
            parse_lookup_csv(CATEGORY_CSV.as_bytes(), "description", "food_category.csv").unwrap();
        let factors = parse_conversion_factor_csv(FACTOR_CSV.as_bytes()).unwrap();
        let calories = parse_calorie_factor_csv(CALORIE_CSV.as_bytes()).unwrap();
        let portions = parse_portion_csv(PORTION_CSV.as_bytes()).unwrap();
        let units =
            parse_lookup_csv(MEASURE_UNIT_CSV.as_bytes(), "name", "measure_unit.csv").unwrap();
        import_fdc_rows(db, &foods, &categories, &factors, &calories, &portions, &units).unwrap()
    }

    #[test]
    fn test_import_counts() {
        let db = Database::open_in_memory().unwrap();
        let summary = import_fixture(&db);

        assert_eq!(summary.foods_imported, 2);
        assert_eq!(summary.foods_skipped, 0);
        assert_eq!(summary.conversion_factors_imported, 2);
        assert_eq!(summary.conversion_factors_skipped, 1);
        assert_eq!(summary.calorie_conversions_imported, 2);
        assert_eq!(summary.calorie_conversions_skipped, 1);
        assert_eq!(summary.portions_imported, 2);
        assert_eq!(summary.portions_skipped, 1);
    }

    #[test]
    fn test_import_resolves_categories() {
        let db = Database::open_in_memory().unwrap();
        import_fixture(&db);

        let food = db.food_by_id(321_360).unwrap();
        assert_eq!(
            food.category.as_deref(),
            Some("Legumes and Legume Products")
        );
    }

    #[test]
    fn test_import_attaches_conversions() {
        let db = Database::open_in_memory().unwrap();
        import_fixture(&db);

        let food = db.food_by_id(321_500).unwrap();
        assert_eq!(food.conversion_factors.len(), 1);
        let conversion = food.conversion_factors[0].calorie_conversion.unwrap();
        assert_eq!(conversion.protein_value, Some(4.27));
        assert_eq!(conversion.carbohydrate_value, None);
    }

    #[test]
    fn test_import_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        import_fixture(&db);
        let summary = import_fixture(&db);

        assert_eq!(summary.foods_imported, 2);
        assert_eq!(db.food_count().unwrap(), 2);
        let food = db.food_by_id(321_500).unwrap();
        assert_eq!(food.conversion_factors.len(), 1);
    }

    #[test]
    fn test_import_fdc_dir_missing_required_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let err = import_fdc_dir(&db, dir.path()).unwrap_err();
        assert!(err.to_string().contains("food.csv"));
    }

    #[test]
    fn test_import_fdc_dir_full_fixture() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("food.csv"), FOOD_CSV).unwrap();
        std::fs::write(dir.path().join("food_category.csv"), CATEGORY_CSV).unwrap();
        std::fs::write(
            dir.path().join("food_nutrient_conversion_factor.csv"),
            FACTOR_CSV,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("food_calorie_conversion_factor.csv"),
            CALORIE_CSV,
        )
        .unwrap();
        std::fs::write(dir.path().join("food_portion.csv"), PORTION_CSV).unwrap();
        std::fs::write(dir.path().join("measure_unit.csv"), MEASURE_UNIT_CSV).unwrap();

        let db = Database::open_in_memory().unwrap();
        let summary = import_fdc_dir(&db, dir.path()).unwrap();
        assert_eq!(summary.foods_imported, 2);
        assert_eq!(summary.portions_imported, 2);

        let hummus = db.food_by_id(321_360).unwrap();
        assert_eq!(hummus.category.as_deref(), Some("Legumes and Legume Products"));
        let portion = db.first_portion(321_360).unwrap().unwrap();
        assert_eq!(portion.unit_name.as_deref(), Some("cup"));
    }

    #[test]
    fn test_import_fdc_dir_without_optional_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("food.csv"), FOOD_CSV).unwrap();
        std::fs::write(
            dir.path().join("food_nutrient_conversion_factor.csv"),
            FACTOR_CSV,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("food_calorie_conversion_factor.csv"),
            CALORIE_CSV,
        )
        .unwrap();

        let db = Database::open_in_memory().unwrap();
        let summary = import_fdc_dir(&db, dir.path()).unwrap();
        assert_eq!(summary.foods_imported, 2);
        assert_eq!(summary.portions_imported, 0);

        // No category file means the id stays unresolved
        let hummus = db.food_by_id(321_360).unwrap();
        assert!(hummus.category.is_none());
    }
}
