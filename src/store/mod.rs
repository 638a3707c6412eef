use async_trait::async_trait;
use thiserror::Error;
use time::Date;
use uuid::Uuid;

use crate::{
    ingredients::model::Ingredient,
    planner::model::{Day, MenuSlot, Moment, MoveOutcome},
    recipes::model::Recipe,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Transaction(String),

    #[error("corrupt stored value: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence boundary for the planner. Implementations serialize
/// concurrent writers; `insert_recipe`, `replace_recipe`, `delete_recipe`
/// and `move_slot` are each applied atomically.
#[async_trait]
pub trait MenuStore: Send + Sync {
    /// Sorted by name.
    async fn list_ingredients(&self) -> StoreResult<Vec<Ingredient>>;
    async fn get_ingredient(&self, id: Uuid) -> StoreResult<Option<Ingredient>>;
    async fn find_ingredient_by_name(&self, name: &str) -> StoreResult<Option<Ingredient>>;
    /// `Conflict` when the name is taken.
    async fn insert_ingredient(&self, ingredient: &Ingredient) -> StoreResult<()>;
    /// `Ok(false)` when the ingredient does not exist.
    async fn update_ingredient(&self, ingredient: &Ingredient) -> StoreResult<bool>;
    /// Deletes the ingredient and every recipe line referencing it.
    async fn delete_ingredient(&self, id: Uuid) -> StoreResult<bool>;
    async fn recipe_ids_using_ingredient(&self, id: Uuid) -> StoreResult<Vec<Uuid>>;

    /// Sorted by name, lines hydrated with their ingredient.
    async fn list_recipes(&self) -> StoreResult<Vec<Recipe>>;
    async fn get_recipe(&self, id: Uuid) -> StoreResult<Option<Recipe>>;
    async fn insert_recipe(&self, recipe: &Recipe) -> StoreResult<()>;
    /// Overwrites the recipe row and replaces all of its lines.
    async fn replace_recipe(&self, recipe: &Recipe) -> StoreResult<bool>;
    /// Deletes the recipe and its lines. Slots pointing at it are kept with
    /// no recipe and no cached verdict.
    async fn delete_recipe(&self, id: Uuid) -> StoreResult<bool>;

    async fn list_slots_for_week(&self, week_start: Date) -> StoreResult<Vec<MenuSlot>>;
    async fn list_slots_for_recipe(&self, recipe_id: Uuid) -> StoreResult<Vec<MenuSlot>>;
    async fn get_slot(&self, id: Uuid) -> StoreResult<Option<MenuSlot>>;
    async fn find_slot(
        &self,
        day: Day,
        moment: Moment,
        week_start: Date,
    ) -> StoreResult<Option<MenuSlot>>;
    /// `Conflict` when the coordinates are occupied.
    async fn insert_slot(&self, slot: &MenuSlot) -> StoreResult<()>;
    /// Writes recipe, description and cache of an existing slot.
    async fn update_slot(&self, slot: &MenuSlot) -> StoreResult<bool>;
    async fn delete_slot(&self, id: Uuid) -> StoreResult<bool>;
    /// Stores `blob` only while the slot still references `recipe_id`.
    /// `Ok(false)` when the slot is gone or now serves another recipe.
    async fn set_balance_cache(
        &self,
        slot_id: Uuid,
        recipe_id: Option<Uuid>,
        blob: Option<&str>,
    ) -> StoreResult<bool>;
    /// Moves a slot to `(day, moment)` within its week. A slot already at the
    /// destination takes the moved slot's former coordinates; both writes
    /// commit together. `Ok(None)` when `slot_id` does not exist.
    async fn move_slot(
        &self,
        slot_id: Uuid,
        day: Day,
        moment: Moment,
    ) -> StoreResult<Option<MoveOutcome>>;
}
