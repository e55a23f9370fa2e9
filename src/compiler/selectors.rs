//! Field selector tables for parse steps
//!
//! Maps requested field names to CSS selector lists. The primary table is
//! used on first compilation; the fallback table is substituted when a
//! repair directive asks for the parse step to be replaced (stale selector).

use serde_json::{Map, Value};

use crate::domain::goal::GoalSpec;

/// Primary selector for a field name
pub fn primary_selector(field: &str) -> String {
    match field {
        "title" => "title, h1.product-title, h1.title, h1".to_string(),
        "price" => ".price, .product-price, span[itemprop='price']".to_string(),
        "description" => {
            "meta[name='description'], #description, .product-description".to_string()
        }
        "image" => "img.product-image, meta[property='og:image']".to_string(),
        "rating" => ".rating, .product-rating, [itemprop='ratingValue']".to_string(),
        other => format!(".{}, [itemprop='{}'], #{}", other, other, other),
    }
}

/// Fallback selector for a field name, used after a selector failure
pub fn fallback_selector(field: &str) -> String {
    match field {
        "title" => "[data-title], .heading, header h1, h2".to_string(),
        "price" => "[data-price], .amount, .cost, [class*='price']".to_string(),
        "description" => "[data-description], .summary, article p".to_string(),
        "image" => "picture img, [data-image], figure img".to_string(),
        "rating" => "[data-rating], .stars, [class*='rating']".to_string(),
        other => format!("[data-{}], [class*='{}']", other, other),
    }
}

/// Build the selectors map for a parse step
pub fn selectors_for(goal: &GoalSpec, fallback: bool) -> Value {
    let mut map = Map::new();
    for field in &goal.fields {
        let selector = if fallback {
            fallback_selector(&field.name)
        } else {
            primary_selector(&field.name)
        };
        map.insert(field.name.clone(), Value::String(selector));
    }
    Value::Object(map)
}
