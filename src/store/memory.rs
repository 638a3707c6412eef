use std::collections::HashMap;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{MenuStore, StoreError, StoreResult};
use crate::{
    ingredients::model::Ingredient,
    planner::model::{Day, MenuSlot, Moment, MoveOutcome},
    recipes::model::Recipe,
};

/// In-process store. Every operation runs under one lock, so multi-record
/// writes are atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    #[cfg(test)]
    reject_cache_writes: AtomicBool,
}

#[cfg(test)]
impl MemoryStore {
    /// Makes every later `set_balance_cache` call fail.
    pub fn reject_cache_writes(&self) {
        self.reject_cache_writes.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Inner {
    ingredients: HashMap<Uuid, Ingredient>,
    recipes: HashMap<Uuid, Recipe>,
    slots: HashMap<Uuid, MenuSlot>,
}

impl Inner {
    /// Refreshes line names and categories from the current ingredients.
    fn hydrate(&self, recipe: &Recipe) -> Recipe {
        let mut recipe = recipe.clone();
        recipe.lines.retain(|l| self.ingredients.contains_key(&l.ingredient_id));
        for line in &mut recipe.lines {
            if let Some(ing) = self.ingredients.get(&line.ingredient_id) {
                line.ingredient_name = ing.name.clone();
                line.category = ing.category;
            }
        }
        recipe
            .lines
            .sort_by(|a, b| a.ingredient_name.cmp(&b.ingredient_name));
        recipe
    }

    fn name_taken(&self, name: &str, except: Uuid) -> bool {
        self.ingredients
            .values()
            .any(|i| i.name == name && i.id != except)
    }

    fn occupant(&self, day: Day, moment: Moment, week_start: Date) -> Option<&MenuSlot> {
        self.slots
            .values()
            .find(|s| s.coordinates() == (day, moment, week_start))
    }
}

fn sorted_slots(mut slots: Vec<MenuSlot>) -> Vec<MenuSlot> {
    slots.sort_by_key(|s| (s.week_start, s.day, s.moment));
    slots
}

#[async_trait]
impl MenuStore for MemoryStore {
    async fn list_ingredients(&self) -> StoreResult<Vec<Ingredient>> {
        let inner = self.inner.read().await;
        let mut all: Vec<_> = inner.ingredients.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn get_ingredient(&self, id: Uuid) -> StoreResult<Option<Ingredient>> {
        Ok(self.inner.read().await.ingredients.get(&id).cloned())
    }

    async fn find_ingredient_by_name(&self, name: &str) -> StoreResult<Option<Ingredient>> {
        let inner = self.inner.read().await;
        Ok(inner.ingredients.values().find(|i| i.name == name).cloned())
    }

    async fn insert_ingredient(&self, ingredient: &Ingredient) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.name_taken(&ingredient.name, ingredient.id) {
            return Err(StoreError::Conflict(format!(
                "ingredient '{}' already exists",
                ingredient.name
            )));
        }
        inner.ingredients.insert(ingredient.id, ingredient.clone());
        Ok(())
    }

    async fn update_ingredient(&self, ingredient: &Ingredient) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        if !inner.ingredients.contains_key(&ingredient.id) {
            return Ok(false);
        }
        if inner.name_taken(&ingredient.name, ingredient.id) {
            return Err(StoreError::Conflict(format!(
                "ingredient '{}' already exists",
                ingredient.name
            )));
        }
        inner.ingredients.insert(ingredient.id, ingredient.clone());
        Ok(true)
    }

    async fn delete_ingredient(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.ingredients.remove(&id).is_none() {
            return Ok(false);
        }
        for recipe in inner.recipes.values_mut() {
            recipe.lines.retain(|l| l.ingredient_id != id);
        }
        Ok(true)
    }

    async fn recipe_ids_using_ingredient(&self, id: Uuid) -> StoreResult<Vec<Uuid>> {
        let inner = self.inner.read().await;
        let mut ids: Vec<_> = inner
            .recipes
            .values()
            .filter(|r| r.lines.iter().any(|l| l.ingredient_id == id))
            .map(|r| r.id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn list_recipes(&self) -> StoreResult<Vec<Recipe>> {
        let inner = self.inner.read().await;
        let mut all: Vec<_> = inner.recipes.values().map(|r| inner.hydrate(r)).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn get_recipe(&self, id: Uuid) -> StoreResult<Option<Recipe>> {
        let inner = self.inner.read().await;
        Ok(inner.recipes.get(&id).map(|r| inner.hydrate(r)))
    }

    async fn insert_recipe(&self, recipe: &Recipe) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(line) = recipe
            .lines
            .iter()
            .find(|l| !inner.ingredients.contains_key(&l.ingredient_id))
        {
            return Err(StoreError::Transaction(format!(
                "ingredient {} does not exist",
                line.ingredient_id
            )));
        }
        inner.recipes.insert(recipe.id, recipe.clone());
        Ok(())
    }

    async fn replace_recipe(&self, recipe: &Recipe) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        if !inner.recipes.contains_key(&recipe.id) {
            return Ok(false);
        }
        if let Some(line) = recipe
            .lines
            .iter()
            .find(|l| !inner.ingredients.contains_key(&l.ingredient_id))
        {
            return Err(StoreError::Transaction(format!(
                "ingredient {} does not exist",
                line.ingredient_id
            )));
        }
        inner.recipes.insert(recipe.id, recipe.clone());
        Ok(true)
    }

    async fn delete_recipe(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.recipes.remove(&id).is_none() {
            return Ok(false);
        }
        let now = OffsetDateTime::now_utc();
        for slot in inner.slots.values_mut() {
            if slot.recipe_id == Some(id) {
                slot.recipe_id = None;
                slot.balance_cache = None;
                slot.updated_at = now;
            }
        }
        Ok(true)
    }

    async fn list_slots_for_week(&self, week_start: Date) -> StoreResult<Vec<MenuSlot>> {
        let inner = self.inner.read().await;
        Ok(sorted_slots(
            inner
                .slots
                .values()
                .filter(|s| s.week_start == week_start)
                .cloned()
                .collect(),
        ))
    }

    async fn list_slots_for_recipe(&self, recipe_id: Uuid) -> StoreResult<Vec<MenuSlot>> {
        let inner = self.inner.read().await;
        Ok(sorted_slots(
            inner
                .slots
                .values()
                .filter(|s| s.recipe_id == Some(recipe_id))
                .cloned()
                .collect(),
        ))
    }

    async fn get_slot(&self, id: Uuid) -> StoreResult<Option<MenuSlot>> {
        Ok(self.inner.read().await.slots.get(&id).cloned())
    }

    async fn find_slot(
        &self,
        day: Day,
        moment: Moment,
        week_start: Date,
    ) -> StoreResult<Option<MenuSlot>> {
        let inner = self.inner.read().await;
        Ok(inner.occupant(day, moment, week_start).cloned())
    }

    async fn insert_slot(&self, slot: &MenuSlot) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner
            .occupant(slot.day, slot.moment, slot.week_start)
            .is_some()
        {
            return Err(StoreError::Conflict(format!(
                "a slot already exists for {} {} of week {}",
                slot.day, slot.moment, slot.week_start
            )));
        }
        inner.slots.insert(slot.id, slot.clone());
        Ok(())
    }

    async fn update_slot(&self, slot: &MenuSlot) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let Some(existing) = inner.slots.get_mut(&slot.id) else {
            return Ok(false);
        };
        existing.recipe_id = slot.recipe_id;
        existing.description = slot.description.clone();
        existing.balance_cache = slot.balance_cache.clone();
        existing.updated_at = slot.updated_at;
        Ok(true)
    }

    async fn delete_slot(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.inner.write().await.slots.remove(&id).is_some())
    }

    async fn set_balance_cache(
        &self,
        slot_id: Uuid,
        recipe_id: Option<Uuid>,
        blob: Option<&str>,
    ) -> StoreResult<bool> {
        #[cfg(test)]
        if self.reject_cache_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Transaction("cache writes rejected".into()));
        }
        let mut inner = self.inner.write().await;
        match inner.slots.get_mut(&slot_id) {
            Some(slot) if slot.recipe_id == recipe_id => {
                slot.balance_cache = blob.map(str::to_string);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn move_slot(
        &self,
        slot_id: Uuid,
        day: Day,
        moment: Moment,
    ) -> StoreResult<Option<MoveOutcome>> {
        let mut inner = self.inner.write().await;
        let Some(source) = inner.slots.get(&slot_id).cloned() else {
            return Ok(None);
        };
        if (source.day, source.moment) == (day, moment) {
            return Ok(Some(MoveOutcome {
                moved: source,
                displaced: None,
            }));
        }

        let now = OffsetDateTime::now_utc();
        let occupant_id = inner.occupant(day, moment, source.week_start).map(|s| s.id);

        let displaced = occupant_id.and_then(|id| inner.slots.get_mut(&id)).map(|occ| {
            occ.day = source.day;
            occ.moment = source.moment;
            occ.updated_at = now;
            occ.clone()
        });

        let moved = match inner.slots.get_mut(&slot_id) {
            Some(slot) => {
                slot.day = day;
                slot.moment = moment;
                slot.updated_at = now;
                slot.clone()
            }
            None => return Err(StoreError::Transaction("moved slot vanished".into())),
        };

        Ok(Some(MoveOutcome { moved, displaced }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ingredients::model::Category,
        recipes::model::{
            fixtures::{ingredient, recipe},
            RecipeLine,
        },
    };
    use time::macros::date;

    const WEEK: Date = date!(2024 - 01 - 08);

    #[tokio::test]
    async fn duplicate_ingredient_name_conflicts() {
        let store = MemoryStore::default();
        store
            .insert_ingredient(&ingredient("Salt", "g", Category::SpicesAndCondiments))
            .await
            .unwrap();
        let err = store
            .insert_ingredient(&ingredient("Salt", "kg", Category::Other))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        // names are case-sensitive
        store
            .insert_ingredient(&ingredient("salt", "g", Category::Other))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn deleting_ingredient_cascades_to_lines() {
        let store = MemoryStore::default();
        let tomato = ingredient("Tomato", "g", Category::Vegetables);
        let pasta = ingredient("Pasta", "g", Category::GrainsAndStarches);
        store.insert_ingredient(&tomato).await.unwrap();
        store.insert_ingredient(&pasta).await.unwrap();
        let r = recipe(
            "Pasta",
            vec![
                RecipeLine::new(&tomato, 2.0, "piece".into()),
                RecipeLine::new(&pasta, 250.0, "g".into()),
            ],
        );
        store.insert_recipe(&r).await.unwrap();

        assert_eq!(store.recipe_ids_using_ingredient(tomato.id).await.unwrap(), vec![r.id]);
        assert!(store.delete_ingredient(tomato.id).await.unwrap());

        let loaded = store.get_recipe(r.id).await.unwrap().unwrap();
        assert_eq!(loaded.lines.len(), 1);
        assert_eq!(loaded.lines[0].ingredient_name, "Pasta");
    }

    #[tokio::test]
    async fn recipe_lines_follow_ingredient_renames() {
        let store = MemoryStore::default();
        let mut leek = ingredient("Leek", "g", Category::Other);
        store.insert_ingredient(&leek).await.unwrap();
        let r = recipe("Soup", vec![RecipeLine::new(&leek, 1.0, "piece".into())]);
        store.insert_recipe(&r).await.unwrap();

        leek.name = "Leeks".into();
        leek.category = Category::Vegetables;
        assert!(store.update_ingredient(&leek).await.unwrap());

        let loaded = store.get_recipe(r.id).await.unwrap().unwrap();
        assert_eq!(loaded.lines[0].ingredient_name, "Leeks");
        assert_eq!(loaded.lines[0].category, Category::Vegetables);
    }

    #[tokio::test]
    async fn deleting_recipe_detaches_slots() {
        let store = MemoryStore::default();
        let r = recipe("Omelette", vec![]);
        store.insert_recipe(&r).await.unwrap();
        let mut slot = MenuSlot::new(Day::Monday, Moment::Midday, WEEK, Some(r.id), None);
        slot.balance_cache = Some("{}".into());
        store.insert_slot(&slot).await.unwrap();

        assert!(store.delete_recipe(r.id).await.unwrap());
        let kept = store.get_slot(slot.id).await.unwrap().unwrap();
        assert_eq!(kept.recipe_id, None);
        assert_eq!(kept.balance_cache, None);
    }

    #[tokio::test]
    async fn slot_coordinates_are_unique() {
        let store = MemoryStore::default();
        store
            .insert_slot(&MenuSlot::new(Day::Monday, Moment::Midday, WEEK, None, None))
            .await
            .unwrap();
        let err = store
            .insert_slot(&MenuSlot::new(Day::Monday, Moment::Midday, WEEK, None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        store
            .insert_slot(&MenuSlot::new(
                Day::Monday,
                Moment::Midday,
                date!(2024 - 01 - 15),
                None,
                None,
            ))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn move_onto_occupied_destination_swaps() {
        let store = MemoryStore::default();
        let a = MenuSlot::new(Day::Monday, Moment::Midday, WEEK, None, Some("A".into()));
        let b = MenuSlot::new(Day::Wednesday, Moment::Evening, WEEK, None, Some("B".into()));
        store.insert_slot(&a).await.unwrap();
        store.insert_slot(&b).await.unwrap();

        let outcome = store
            .move_slot(a.id, Day::Wednesday, Moment::Evening)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.moved.coordinates(), (Day::Wednesday, Moment::Evening, WEEK));
        let displaced = outcome.displaced.unwrap();
        assert_eq!(displaced.id, b.id);
        assert_eq!(displaced.coordinates(), (Day::Monday, Moment::Midday, WEEK));

        let week = store.list_slots_for_week(WEEK).await.unwrap();
        assert_eq!(week.len(), 2);
    }

    #[tokio::test]
    async fn move_to_free_destination_relocates() {
        let store = MemoryStore::default();
        let a = MenuSlot::new(Day::Monday, Moment::Midday, WEEK, None, None);
        store.insert_slot(&a).await.unwrap();

        let outcome = store
            .move_slot(a.id, Day::Friday, Moment::Midday)
            .await
            .unwrap()
            .unwrap();
        assert!(outcome.displaced.is_none());
        assert!(store
            .find_slot(Day::Monday, Moment::Midday, WEEK)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn move_unknown_slot_is_none() {
        let store = MemoryStore::default();
        assert!(store
            .move_slot(Uuid::new_v4(), Day::Friday, Moment::Midday)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn cache_write_requires_the_expected_recipe() {
        let store = MemoryStore::default();
        let planned = Uuid::new_v4();
        let slot = MenuSlot::new(Day::Tuesday, Moment::Evening, WEEK, Some(planned), None);
        store.insert_slot(&slot).await.unwrap();

        assert!(!store
            .set_balance_cache(slot.id, Some(Uuid::new_v4()), Some("stale"))
            .await
            .unwrap());
        assert!(!store.set_balance_cache(slot.id, None, None).await.unwrap());
        assert!(store
            .set_balance_cache(slot.id, Some(planned), Some("fresh"))
            .await
            .unwrap());

        let stored = store.get_slot(slot.id).await.unwrap().unwrap();
        assert_eq!(stored.balance_cache.as_deref(), Some("fresh"));
    }
}
