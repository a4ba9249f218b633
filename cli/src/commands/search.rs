use anyhow::Result;
use std::process;

use nutridash_core::models::Food;
use nutridash_core::service::FoodService;

use super::helpers::{format_macro, json_error, print_food_table};

pub(crate) fn cmd_search(service: &FoodService, query: &str, json: bool) -> Result<()> {
    let foods = service.search_by_description_words(query)?;

    if foods.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No results found for '{query}'");
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

pub(crate) fn cmd_best(service: &FoodService, query: &str, json: bool) -> Result<()> {
    let food = match service.search_best_by_description(query) {
        Ok(f) => f,
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
        println!("{}", serde_json::to_string_pretty(&food)?);
        return Ok(());
    }

    println!("Nutrition Facts: {}", food.description);
    if let Some(category) = &food.category {
        println!("Category: {category}");
    }

    // A best match always carries at least one calorie conversion.
    if let Some(conversion) = food.best_calorie_conversion() {
        println!("Protein:       {} g", format_macro(conversion.protein_value));
        println!("Fat:           {} g", format_macro(conversion.fat_value));
        println!(
            "Carbohydrates: {} g",
            format_macro(conversion.carbohydrate_value)
        );
        match conversion.total_calories() {
            Some(calories) => println!("Calories:      {calories:.0}"),
            None => println!("Calories:      N/A"),
        }
    }

    Ok(())
}
