use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::rules::{BalanceRules, FoodGroup};
use crate::ingredients::model::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictLevel {
    Empty,
    Unbalanced,
    Moderate,
    Balanced,
}

impl VerdictLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            3.. => VerdictLevel::Balanced,
            2 => VerdictLevel::Moderate,
            _ => VerdictLevel::Unbalanced,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            VerdictLevel::Empty => "No recipe assigned",
            VerdictLevel::Unbalanced => "Unbalanced meal",
            VerdictLevel::Moderate => "Fairly balanced meal",
            VerdictLevel::Balanced => "Balanced meal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceVerdict {
    pub level: VerdictLevel,
    pub score: u8,
    pub categories: Vec<Category>,
    pub missing: Vec<FoodGroup>,
    pub message: String,
    pub has_protein: bool,
    pub has_vegetable: bool,
    pub has_starch: bool,
}

impl BalanceVerdict {
    /// Verdict for a slot without a recipe.
    pub fn empty() -> Self {
        Self {
            level: VerdictLevel::Empty,
            score: 0,
            categories: Vec::new(),
            missing: FoodGroup::ALL.to_vec(),
            message: VerdictLevel::Empty.message().to_string(),
            has_protein: false,
            has_vegetable: false,
            has_starch: false,
        }
    }
}

/// Classifies a recipe from the categories of its ingredients.
pub fn classify(present: &BTreeSet<Category>, rules: &BalanceRules) -> BalanceVerdict {
    let has_protein = rules.is_covered(FoodGroup::Protein, present);
    let has_vegetable = rules.is_covered(FoodGroup::Vegetable, present);
    let has_starch = rules.is_covered(FoodGroup::Starch, present);

    let missing: Vec<FoodGroup> = [
        (FoodGroup::Protein, has_protein),
        (FoodGroup::Vegetable, has_vegetable),
        (FoodGroup::Starch, has_starch),
    ]
    .into_iter()
    .filter_map(|(group, covered)| (!covered).then_some(group))
    .collect();

    let score = [has_protein, has_vegetable, has_starch]
        .into_iter()
        .filter(|covered| *covered)
        .count() as u8;
    let level = VerdictLevel::from_score(score);

    BalanceVerdict {
        level,
        score,
        categories: present.iter().copied().collect(),
        missing,
        message: level.message().to_string(),
        has_protein,
        has_vegetable,
        has_starch,
    }
}
