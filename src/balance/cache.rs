use tracing::debug;

use super::{
    classifier::{classify, BalanceVerdict},
    rules::BalanceRules,
};
use crate::{planner::model::MenuSlot, recipes::model::Recipe};

/// Serialized form stored in `MenuSlot::balance_cache`.
pub fn encode(verdict: &BalanceVerdict) -> String {
    // A verdict is plain data; serialization cannot fail.
    serde_json::to_string(verdict).unwrap_or_default()
}

pub fn decode(blob: &str) -> Result<BalanceVerdict, serde_json::Error> {
    serde_json::from_str(blob)
}

/// Verdict computed from the recipe as it is now. A slot without a recipe,
/// or whose recipe no longer exists, is empty.
pub fn compute(slot: &MenuSlot, recipe: Option<&Recipe>, rules: &BalanceRules) -> BalanceVerdict {
    match (slot.recipe_id, recipe) {
        (Some(_), Some(recipe)) => classify(&recipe.categories_present(), rules),
        _ => BalanceVerdict::empty(),
    }
}

/// Reads a slot's verdict, preferring the cached blob when `use_cache` is
/// set and the blob decodes. Never writes the cache.
pub fn read_verdict(
    slot: &MenuSlot,
    recipe: Option<&Recipe>,
    rules: &BalanceRules,
    use_cache: bool,
) -> BalanceVerdict {
    if slot.recipe_id.is_none() {
        return BalanceVerdict::empty();
    }
    if use_cache {
        if let Some(blob) = slot.balance_cache.as_deref() {
            match decode(blob) {
                Ok(verdict) => return verdict,
                Err(e) => {
                    debug!(slot_id = %slot.id, error = %e, "cached verdict unreadable; recomputing")
                }
            }
        }
    }
    compute(slot, recipe, rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        balance::classifier::VerdictLevel,
        ingredients::model::Category,
        planner::model::{Day, Moment},
        recipes::model::{
            fixtures::{ingredient, recipe},
            RecipeLine,
        },
    };
    use time::macros::date;

    fn slot_with(recipe: Option<&Recipe>) -> MenuSlot {
        MenuSlot::new(
            Day::Tuesday,
            Moment::Evening,
            date!(2024 - 01 - 08),
            recipe.map(|r| r.id),
            None,
        )
    }

    fn chicken_rice() -> Recipe {
        let chicken = ingredient("Chicken", "g", Category::Meats);
        let rice = ingredient("Rice", "g", Category::GrainsAndStarches);
        recipe(
            "Chicken rice",
            vec![
                RecipeLine::new(&chicken, 300.0, "g".into()),
                RecipeLine::new(&rice, 200.0, "g".into()),
            ],
        )
    }

    #[test]
    fn empty_slot_ignores_any_cache() {
        let mut slot = slot_with(None);
        let balanced = classify(
            &[Category::Meats, Category::Vegetables, Category::GrainsAndStarches].into(),
            &BalanceRules::default(),
        );
        slot.balance_cache = Some(encode(&balanced));

        for use_cache in [true, false] {
            let v = read_verdict(&slot, None, &BalanceRules::default(), use_cache);
            assert_eq!(v, BalanceVerdict::empty());
        }
    }

    #[test]
    fn cached_read_equals_fresh_computation() {
        let rules = BalanceRules::default();
        let r = chicken_rice();
        let mut slot = slot_with(Some(&r));
        let fresh = compute(&slot, Some(&r), &rules);
        slot.balance_cache = Some(encode(&fresh));

        assert_eq!(read_verdict(&slot, Some(&r), &rules, true), fresh);
        assert_eq!(read_verdict(&slot, Some(&r), &rules, false), fresh);
    }

    #[test]
    fn stale_cache_is_returned_until_refreshed() {
        let rules = BalanceRules::default();
        let mut r = chicken_rice();
        let mut slot = slot_with(Some(&r));
        slot.balance_cache = Some(encode(&compute(&slot, Some(&r), &rules)));

        let carrot = ingredient("Carrot", "g", Category::Vegetables);
        r.lines.push(RecipeLine::new(&carrot, 100.0, "g".into()));

        let cached = read_verdict(&slot, Some(&r), &rules, true);
        assert_eq!(cached.level, VerdictLevel::Moderate);
        let bypass = read_verdict(&slot, Some(&r), &rules, false);
        assert_eq!(bypass.level, VerdictLevel::Balanced);
    }

    #[test]
    fn corrupt_cache_degrades_to_recompute() {
        let rules = BalanceRules::default();
        let r = chicken_rice();
        let mut slot = slot_with(Some(&r));
        slot.balance_cache = Some("{not json".into());

        let v = read_verdict(&slot, Some(&r), &rules, true);
        assert_eq!(v, compute(&slot, Some(&r), &rules));
    }

    #[test]
    fn structurally_wrong_cache_degrades_to_recompute() {
        let rules = BalanceRules::default();
        let r = chicken_rice();
        let mut slot = slot_with(Some(&r));
        slot.balance_cache = Some(r#"{"niveau":"equilibre","score":3}"#.into());

        let v = read_verdict(&slot, Some(&r), &rules, true);
        assert_eq!(v.level, VerdictLevel::Moderate);
    }

    #[test]
    fn dangling_recipe_reference_is_empty() {
        let r = chicken_rice();
        let slot = slot_with(Some(&r));
        assert_eq!(
            read_verdict(&slot, None, &BalanceRules::default(), false),
            BalanceVerdict::empty()
        );
    }
}
