use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::{ingredients::model::Category, recipes::model::Recipe};

/// One line of the shopping list: the total of an ingredient in one unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingRow {
    pub ingredient_id: Uuid,
    pub name: String,
    pub category: Category,
    pub quantity: f64,
    pub unit: String,
}

impl ShoppingRow {
    /// Quantity rendered with one decimal place.
    pub fn display_quantity(&self) -> String {
        format!("{:.1}", self.quantity)
    }
}

/// Sums the lines of `recipes` per `(ingredient, unit)`. A recipe listed
/// twice counts twice. Units are never converted, so one ingredient may
/// yield several rows. Rows are ordered by name, then ingredient id, then
/// unit.
pub fn aggregate<'a, I>(recipes: I) -> Vec<ShoppingRow>
where
    I: IntoIterator<Item = &'a Recipe>,
{
    let mut groups: HashMap<(Uuid, String), ShoppingRow> = HashMap::new();

    for recipe in recipes {
        for line in &recipe.lines {
            groups
                .entry((line.ingredient_id, line.unit.clone()))
                .and_modify(|row| row.quantity += line.quantity)
                .or_insert_with(|| ShoppingRow {
                    ingredient_id: line.ingredient_id,
                    name: line.ingredient_name.clone(),
                    category: line.category,
                    quantity: line.quantity,
                    unit: line.unit.clone(),
                });
        }
    }

    let mut rows: Vec<ShoppingRow> = groups.into_values().collect();
    rows.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then(a.ingredient_id.cmp(&b.ingredient_id))
            .then(a.unit.cmp(&b.unit))
    });
    rows
}
