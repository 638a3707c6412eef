use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    cache::{compute, encode, read_verdict},
    classifier::BalanceVerdict,
    rules::BalanceRules,
};
use crate::{
    error::{AppError, AppResult},
    planner::model::MenuSlot,
    recipes::model::Recipe,
    store::MenuStore,
};

/// Memoizes recipe lookups across a batch of slots.
struct RecipeLookup<'a> {
    store: &'a dyn MenuStore,
    seen: HashMap<Uuid, Option<Recipe>>,
}

impl<'a> RecipeLookup<'a> {
    fn new(store: &'a dyn MenuStore) -> Self {
        Self {
            store,
            seen: HashMap::new(),
        }
    }

    async fn for_slot(&mut self, slot: &MenuSlot) -> AppResult<Option<&Recipe>> {
        let Some(id) = slot.recipe_id else {
            return Ok(None);
        };
        if !self.seen.contains_key(&id) {
            let recipe = self.store.get_recipe(id).await?;
            self.seen.insert(id, recipe);
        }
        Ok(self.seen.get(&id).and_then(Option::as_ref))
    }
}

/// Recomputes the slot's verdict and overwrites its stored cache. Slots
/// without a recipe have their cache cleared. The write is skipped when the
/// slot was reassigned after `slot` was read; whoever reassigned it stored
/// the matching cache.
pub async fn refresh_slot(
    store: &dyn MenuStore,
    rules: &BalanceRules,
    slot: &MenuSlot,
    recipe: Option<&Recipe>,
) -> AppResult<BalanceVerdict> {
    let verdict = compute(slot, recipe, rules);
    let blob = slot.recipe_id.map(|_| encode(&verdict));
    if store
        .set_balance_cache(slot.id, slot.recipe_id, blob.as_deref())
        .await?
    {
        debug!(slot_id = %slot.id, level = ?verdict.level, "balance cache refreshed");
    } else {
        debug!(slot_id = %slot.id, "slot changed since read, cache left as is");
    }
    Ok(verdict)
}

/// Refreshes every slot that references one of `recipe_ids`. Returns the
/// number of slots touched.
pub async fn refresh_for_recipes(
    store: &dyn MenuStore,
    rules: &BalanceRules,
    recipe_ids: &[Uuid],
) -> AppResult<usize> {
    let mut touched = 0;
    for &recipe_id in recipe_ids {
        let recipe = store.get_recipe(recipe_id).await?;
        for slot in store.list_slots_for_recipe(recipe_id).await? {
            refresh_slot(store, rules, &slot, recipe.as_ref()).await?;
            touched += 1;
        }
    }
    if touched > 0 {
        info!(recipes = recipe_ids.len(), slots = touched, "balance caches refreshed");
    }
    Ok(touched)
}

/// `refresh_for_recipes` after a write that has already committed. A
/// failure is logged and leaves stale caches that `?refresh=true` repairs.
pub async fn refresh_after_write(
    store: &dyn MenuStore,
    rules: &BalanceRules,
    recipe_ids: &[Uuid],
) -> usize {
    match refresh_for_recipes(store, rules, recipe_ids).await {
        Ok(touched) => touched,
        Err(e) => {
            warn!(error = %e, recipes = recipe_ids.len(), "balance cache refresh failed");
            0
        }
    }
}

/// Verdict of one slot. `refresh` recomputes and stores; otherwise the
/// cache is preferred when `use_cache` is set.
pub async fn slot_verdict(
    store: &dyn MenuStore,
    rules: &BalanceRules,
    slot_id: Uuid,
    use_cache: bool,
    refresh: bool,
) -> AppResult<BalanceVerdict> {
    let slot = store
        .get_slot(slot_id)
        .await?
        .ok_or(AppError::NotFound("slot"))?;
    let mut recipes = RecipeLookup::new(store);
    let recipe = recipes.for_slot(&slot).await?;

    if refresh {
        refresh_slot(store, rules, &slot, recipe).await
    } else {
        Ok(read_verdict(&slot, recipe, rules, use_cache))
    }
}

/// Verdicts for many slots at once. Ids that match no slot are skipped.
pub async fn bulk_verdicts(
    store: &dyn MenuStore,
    rules: &BalanceRules,
    slot_ids: &[Uuid],
    use_cache: bool,
    refresh: bool,
) -> AppResult<BTreeMap<Uuid, BalanceVerdict>> {
    let mut recipes = RecipeLookup::new(store);
    let mut out = BTreeMap::new();

    for &slot_id in slot_ids {
        if out.contains_key(&slot_id) {
            continue;
        }
        let Some(slot) = store.get_slot(slot_id).await? else {
            debug!(%slot_id, "bulk balance: unknown slot skipped");
            continue;
        };
        let recipe = recipes.for_slot(&slot).await?;
        let verdict = if refresh {
            refresh_slot(store, rules, &slot, recipe).await?
        } else {
            read_verdict(&slot, recipe, rules, use_cache)
        };
        out.insert(slot_id, verdict);
    }
    Ok(out)
}

/// Cache-preferred verdicts for slots already loaded, e.g. a week grid.
pub async fn verdicts_for_slots(
    store: &dyn MenuStore,
    rules: &BalanceRules,
    slots: &[MenuSlot],
) -> AppResult<HashMap<Uuid, (Option<String>, BalanceVerdict)>> {
    let mut recipes = RecipeLookup::new(store);
    let mut out = HashMap::with_capacity(slots.len());
    for slot in slots {
        let recipe = recipes.for_slot(slot).await?;
        let name = recipe.map(|r| r.name.clone());
        out.insert(slot.id, (name, read_verdict(slot, recipe, rules, true)));
    }
    Ok(out)
}
