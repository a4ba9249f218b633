use anyhow::Result;
use std::path::Path;

use nutridash_core::service::FoodService;

pub(crate) fn cmd_import(service: &FoodService, dir: &Path, json: bool) -> Result<()> {
    let summary = service.import_fdc_dir(dir)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "foods_imported": summary.foods_imported,
                "foods_skipped": summary.foods_skipped,
                "conversion_factors_imported": summary.conversion_factors_imported,
                "conversion_factors_skipped": summary.conversion_factors_skipped,
                "calorie_conversions_imported": summary.calorie_conversions_imported,
                "calorie_conversions_skipped": summary.calorie_conversions_skipped,
                "portions_imported": summary.portions_imported,
                "portions_skipped": summary.portions_skipped,
            })
        );
    } else {
        println!("Import complete.\n");
        println!(
            "  Foods:               {} ({} skipped)",
            summary.foods_imported, summary.foods_skipped
        );
        println!(
            "  Conversion factors:  {} ({} skipped)",
            summary.conversion_factors_imported, summary.conversion_factors_skipped
        );
        println!(
            "  Calorie conversions: {} ({} skipped)",
            summary.calorie_conversions_imported, summary.calorie_conversions_skipped
        );
        println!(
            "  Portions:            {} ({} skipped)",
            summary.portions_imported, summary.portions_skipped
        );
    }

    Ok(())
}
