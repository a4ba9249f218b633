use anyhow::Result;
use std::process;

use nutridash_core::models::Food;
use nutridash_core::service::FoodService;

use super::helpers::{format_macro, json_error, print_food_table};

pub(crate) fn cmd_list(service: &FoodService, json: bool) -> Result<()> {
    let foods = service.get_all_foods()?;

    if foods.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("Catalog is empty (run 'nutridash import <dir>' first)");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&foods)?);
    } else {
        let refs: Vec<&Food> = foods.iter().collect();
        print_food_table(&refs);
    }

    Ok(())
}

pub(crate) fn cmd_show(service: &FoodService, fdc_id: i64, json: bool) -> Result<()> {
    let food = service.get_food_by_id(fdc_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&food)?);
        return Ok(());
    }

    print_food_detail(&food);
    Ok(())
}

pub(crate) fn cmd_portion(service: &FoodService, fdc_id: i64, json: bool) -> Result<()> {
    let portion = match service.get_portion(fdc_id) {
        Ok(p) => p,
        Err(e) => {
            if json {
                println!("{}", json_error(&format!("{e:#}")));
            } else {
                eprintln!("{e:#}");
            }
            process::exit(2);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&portion)?);
    } else {
        let amount = portion
            .amount
            .map_or("N/A".to_string(), |v| format!("{v}"));
        let unit = portion.unit_name.as_deref().unwrap_or("N/A");
        let weight = portion
            .gram_weight
            .map_or("N/A".to_string(), |v| format!("{v} g"));
        println!("Amount:      {amount}");
        println!("Unit:        {unit}");
        println!("Gram weight: {weight}");
    }

    Ok(())
}

pub(crate) fn print_food_detail(food: &Food) {
    println!("{} (fdcId {})", food.description, food.fdc_id);
    if let Some(category) = &food.category {
        println!("Category: {category}");
    }
    if let Some(data_type) = &food.data_type {
        println!("Type: {data_type}");
    }
    if let Some(date) = food.publication_date {
        println!("Published: {date}");
    }

    if food.conversion_factors.is_empty() {
        println!("No nutrient conversion factors.");
        return;
    }

    println!("Conversion factors:");
    for factor in &food.conversion_factors {
        match &factor.calorie_conversion {
            Some(c) => {
                println!(
                    "  #{}: protein {} / fat {} / carbs {}",
                    factor.id,
                    format_macro(c.protein_value),
                    format_macro(c.fat_value),
                    format_macro(c.carbohydrate_value),
                );
            }
            None => println!("  #{}: no calorie conversion", factor.id),
        }
    }
}
