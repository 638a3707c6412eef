use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Food category of an ingredient. The set is closed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Category {
    Vegetables,
    Fruits,
    Meats,
    Fish,
    Dairy,
    #[serde(rename = "Grains & Starches")]
    GrainsAndStarches,
    #[serde(rename = "Spices & Condiments")]
    SpicesAndCondiments,
    #[serde(rename = "Oils & Fats")]
    OilsAndFats,
    #[serde(rename = "Sugars & Sweets")]
    SugarsAndSweets,
    Beverages,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Vegetables,
        Category::Fruits,
        Category::Meats,
        Category::Fish,
        Category::Dairy,
        Category::GrainsAndStarches,
        Category::SpicesAndCondiments,
        Category::OilsAndFats,
        Category::SugarsAndSweets,
        Category::Beverages,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Vegetables => "Vegetables",
            Category::Fruits => "Fruits",
            Category::Meats => "Meats",
            Category::Fish => "Fish",
            Category::Dairy => "Dairy",
            Category::GrainsAndStarches => "Grains & Starches",
            Category::SpicesAndCondiments => "Spices & Condiments",
            Category::OilsAndFats => "Oils & Fats",
            Category::SugarsAndSweets => "Sugars & Sweets",
            Category::Beverages => "Beverages",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown ingredient category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub category: Category,
}

impl Ingredient {
    pub fn new(name: String, unit: String, category: Category) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            unit,
            category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_names_round_trip_through_from_str() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn category_serializes_with_display_name() {
        let json = serde_json::to_string(&Category::GrainsAndStarches).unwrap();
        assert_eq!(json, "\"Grains & Starches\"");
        let back: Category = serde_json::from_str("\"Oils & Fats\"").unwrap();
        assert_eq!(back, Category::OilsAndFats);
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = "Legumes".parse::<Category>().unwrap_err();
        assert!(err.to_string().contains("Legumes"));
        assert!(serde_json::from_str::<Category>("\"Legumes\"").is_err());
    }

    #[test]
    fn category_lookup_is_case_sensitive() {
        assert!("vegetables".parse::<Category>().is_err());
    }
}
