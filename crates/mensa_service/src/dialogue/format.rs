//! Chat-facing rendering of menus.

use std::collections::HashMap;

use crate::openmensa::{is_closed_name, Meal, MenuDate};

/// Emoji prefix per menu category. Cosmetic, covers the categories of the
/// German and Luxembourgish canteens the service is used with.
fn category_emoji(category: &str) -> Option<&'static str> {
    if category == "Tellergericht" || category.contains("Entrée") {
        Some("🍽")
    } else if category == "Vegetarisch" || category.contains("Végétarien") {
        Some("🥗")
    } else if category == "Klassiker" || category.contains("Protidique") {
        Some("👨🏻‍🍳")
    } else if category == "Empfehlung des Tages" {
        Some("👌🏿👨🏿‍🍳")
    } else if category == "Wok" {
        Some("🥘")
    } else if category == "Ofenkartoffel" {
        Some("🥔")
    } else if category == "Pasta" {
        Some("🍝")
    } else if category.contains("Pizza") {
        Some("🍕")
    } else if category.contains("Burger") {
        Some("🍔")
    } else if category.contains("Sandwich") {
        Some("🥪")
    } else if category.contains("Flammengrill") {
        Some("🔥")
    } else if category.contains("Grill") {
        Some("🥩")
    } else {
        None
    }
}

/// Chat header for a menu, including the weekend notice when the requested
/// day was shifted to Monday.
pub fn menu_header(mensa_name: &str, date: &MenuDate) -> String {
    let mut head = String::new();
    if date.weekend_shifted {
        head.push_str("Please note that canteens are closed on week-ends. This is the menu for Monday\n");
    }
    head.push_str(&format!(
        "Here is the menu for mensa {} on {} : \n \n",
        mensa_name,
        date.weekday()
    ));
    head
}

/// Format a menu as chat text. Closed sentinels and beverage entries are
/// skipped; a dish with a usable average rating gets a rating line.
pub fn render_menu(items: &[Meal], averages: &HashMap<i32, f32>) -> String {
    let mut out = String::new();
    for item in items {
        if is_closed_name(&item.name) || item.name.contains("Boisson") {
            continue;
        }
        match category_emoji(&item.category) {
            Some(emoji) => out.push_str(&format!("{} {}: {}\n", emoji, item.category, item.name)),
            None => out.push_str(&format!("{}: {}\n", item.category, item.name)),
        }
        if let Some(avg) = averages.get(&item.id) {
            if *avg >= 1.0 {
                out.push_str(&format!("Average rating: {:.2} out of 5 ⭐ \n", avg));
            }
        }
        out.push('\n');
    }
    out.push_str("___\n");
    out
}
