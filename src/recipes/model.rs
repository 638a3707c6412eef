use std::collections::BTreeSet;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::ingredients::model::{Category, Ingredient};

pub const DEFAULT_SERVINGS: i32 = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub prep_minutes: Option<i32>,
    pub servings: i32,
    pub lines: Vec<RecipeLine>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// One ingredient of a recipe. `unit` is free text and need not match the
/// ingredient's default unit. Name and category are read from the
/// ingredient when the line is loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeLine {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub category: Category,
    pub quantity: f64,
    pub unit: String,
}

impl RecipeLine {
    pub fn new(ingredient: &Ingredient, quantity: f64, unit: String) -> Self {
        Self {
            ingredient_id: ingredient.id,
            ingredient_name: ingredient.name.clone(),
            category: ingredient.category,
            quantity,
            unit,
        }
    }
}

impl Recipe {
    /// Distinct categories among the recipe's ingredients.
    pub fn categories_present(&self) -> BTreeSet<Category> {
        self.lines.iter().map(|l| l.category).collect()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn ingredient(name: &str, unit: &str, category: Category) -> Ingredient {
        Ingredient::new(name.into(), unit.into(), category)
    }

    pub fn recipe(name: &str, lines: Vec<RecipeLine>) -> Recipe {
        let now = OffsetDateTime::now_utc();
        Recipe {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            prep_minutes: None,
            servings: DEFAULT_SERVINGS,
            lines,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{ingredient, recipe};
    use super::*;

    #[test]
    fn categories_present_is_distinct() {
        let carrot = ingredient("Carrot", "g", Category::Vegetables);
        let leek = ingredient("Leek", "g", Category::Vegetables);
        let rice = ingredient("Rice", "g", Category::GrainsAndStarches);
        let r = recipe(
            "Stir fry",
            vec![
                RecipeLine::new(&carrot, 200.0, "g".into()),
                RecipeLine::new(&leek, 1.0, "piece".into()),
                RecipeLine::new(&rice, 150.0, "g".into()),
            ],
        );
        let cats: Vec<_> = r.categories_present().into_iter().collect();
        assert_eq!(cats, vec![Category::Vegetables, Category::GrainsAndStarches]);
    }

    #[test]
    fn recipe_without_lines_has_no_categories() {
        assert!(recipe("Water", vec![]).categories_present().is_empty());
    }
}
