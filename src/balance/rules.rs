use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ingredients::model::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FoodGroup {
    Protein,
    Vegetable,
    Starch,
}

impl FoodGroup {
    pub const ALL: [FoodGroup; 3] = [FoodGroup::Protein, FoodGroup::Vegetable, FoodGroup::Starch];
}

/// Which ingredient categories count toward each food group.
///
/// Grains & Starches sits in both `protein` and `starch` by default. The
/// mapping is loaded from configuration so it can be changed without a
/// rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRules {
    pub protein: BTreeSet<Category>,
    pub vegetable: BTreeSet<Category>,
    pub starch: BTreeSet<Category>,
}

impl Default for BalanceRules {
    fn default() -> Self {
        Self {
            protein: [Category::Meats, Category::Fish, Category::GrainsAndStarches].into(),
            vegetable: [Category::Vegetables].into(),
            starch: [Category::GrainsAndStarches].into(),
        }
    }
}

impl BalanceRules {
    pub fn categories_for(&self, group: FoodGroup) -> &BTreeSet<Category> {
        match group {
            FoodGroup::Protein => &self.protein,
            FoodGroup::Vegetable => &self.vegetable,
            FoodGroup::Starch => &self.starch,
        }
    }

    pub fn is_covered(&self, group: FoodGroup, present: &BTreeSet<Category>) -> bool {
        !self.categories_for(group).is_disjoint(present)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mapping_double_counts_grains() {
        let rules = BalanceRules::default();
        assert!(rules.protein.contains(&Category::GrainsAndStarches));
        assert!(rules.starch.contains(&Category::GrainsAndStarches));
        assert_eq!(rules.vegetable.len(), 1);
    }

    #[test]
    fn rules_parse_from_json_category_names() {
        let rules = BalanceRules::from_json(
            r#"{"protein":["Meats","Fish","Dairy"],"vegetable":["Vegetables","Fruits"],"starch":["Grains & Starches"]}"#,
        )
        .unwrap();
        assert!(rules.protein.contains(&Category::Dairy));
        assert!(!rules.protein.contains(&Category::GrainsAndStarches));
        assert!(rules.vegetable.contains(&Category::Fruits));
    }

    #[test]
    fn rules_reject_unknown_categories() {
        let err = BalanceRules::from_json(r#"{"protein":["Tofu"],"vegetable":[],"starch":[]}"#);
        assert!(err.is_err());
    }

    #[test]
    fn coverage_is_set_intersection() {
        let rules = BalanceRules::default();
        let present: BTreeSet<_> = [Category::Fish, Category::Dairy].into();
        assert!(rules.is_covered(FoodGroup::Protein, &present));
        assert!(!rules.is_covered(FoodGroup::Vegetable, &present));
        assert!(!rules.is_covered(FoodGroup::Starch, &BTreeSet::new()));
    }
}
