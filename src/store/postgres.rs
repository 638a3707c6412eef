use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::{Date, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::{MenuStore, StoreError, StoreResult};
use crate::{
    ingredients::model::Ingredient,
    planner::model::{Day, MenuSlot, Moment, MoveOutcome},
    recipes::model::{Recipe, RecipeLine},
};

/// Postgres-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

// ---- Row types ----

#[derive(Debug, FromRow)]
struct IngredientRow {
    id: Uuid,
    name: String,
    unit: String,
    category: String,
}

#[derive(Debug, FromRow)]
struct RecipeRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    prep_minutes: Option<i32>,
    servings: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
struct LineRow {
    recipe_id: Uuid,
    ingredient_id: Uuid,
    ingredient_name: String,
    category: String,
    quantity: f64,
    unit: String,
}

#[derive(Debug, FromRow)]
struct SlotRow {
    id: Uuid,
    day: String,
    moment: String,
    week_start: Date,
    recipe_id: Option<Uuid>,
    description: Option<String>,
    balance_cache: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<IngredientRow> for Ingredient {
    type Error = StoreError;

    fn try_from(r: IngredientRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            category: r
                .category
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("{e}")))?,
            name: r.name,
            unit: r.unit,
        })
    }
}

impl TryFrom<LineRow> for RecipeLine {
    type Error = StoreError;

    fn try_from(r: LineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            ingredient_id: r.ingredient_id,
            ingredient_name: r.ingredient_name,
            category: r
                .category
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("{e}")))?,
            quantity: r.quantity,
            unit: r.unit,
        })
    }
}

impl TryFrom<SlotRow> for MenuSlot {
    type Error = StoreError;

    fn try_from(r: SlotRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            day: r.day.parse().map_err(|e| StoreError::Corrupt(format!("{e}")))?,
            moment: r
                .moment
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("{e}")))?,
            week_start: r.week_start,
            recipe_id: r.recipe_id,
            description: r.description,
            balance_cache: r.balance_cache,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

const SLOT_COLUMNS: &str =
    "id, day, moment, week_start, recipe_id, description, balance_cache, created_at, updated_at";

fn tx_err(e: sqlx::Error) -> StoreError {
    StoreError::Transaction(e.to_string())
}

fn conflict_or(e: sqlx::Error, message: impl FnOnce() -> String) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(message()),
        _ => StoreError::Database(e),
    }
}

fn slots_from(rows: Vec<SlotRow>) -> StoreResult<Vec<MenuSlot>> {
    rows.into_iter().map(MenuSlot::try_from).collect()
}

impl PgStore {
    async fn lines_for(&self, recipe_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<RecipeLine>>> {
        let rows = sqlx::query_as::<_, LineRow>(
            r#"
            SELECT l.recipe_id, l.ingredient_id, i.name AS ingredient_name, i.category,
                   l.quantity, l.unit
              FROM recipe_lines l
              JOIN ingredients i ON i.id = l.ingredient_id
             WHERE l.recipe_id = ANY($1)
             ORDER BY i.name, l.id
            "#,
        )
        .bind(recipe_ids)
        .fetch_all(&self.db)
        .await?;

        let mut by_recipe: HashMap<Uuid, Vec<RecipeLine>> = HashMap::new();
        for row in rows {
            let recipe_id = row.recipe_id;
            by_recipe
                .entry(recipe_id)
                .or_default()
                .push(RecipeLine::try_from(row)?);
        }
        Ok(by_recipe)
    }

    async fn assemble(&self, rows: Vec<RecipeRow>) -> StoreResult<Vec<Recipe>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut lines = self.lines_for(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|r| Recipe {
                lines: lines.remove(&r.id).unwrap_or_default(),
                id: r.id,
                name: r.name,
                description: r.description,
                prep_minutes: r.prep_minutes,
                servings: r.servings,
                created_at: r.created_at,
                updated_at: r.updated_at,
            })
            .collect())
    }

    async fn insert_lines_tx(
        tx: &mut Transaction<'_, Postgres>,
        recipe: &Recipe,
    ) -> StoreResult<()> {
        for line in &recipe.lines {
            sqlx::query(
                r#"
                INSERT INTO recipe_lines (recipe_id, ingredient_id, quantity, unit)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(recipe.id)
            .bind(line.ingredient_id)
            .bind(line.quantity)
            .bind(&line.unit)
            .execute(&mut **tx)
            .await
            .map_err(tx_err)?;
        }
        Ok(())
    }

    /// Locks the slot and whatever occupies `(day, moment)` in its week, in
    /// id order, so opposite concurrent moves queue instead of deadlocking.
    async fn lock_move_pair_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        day: Day,
        moment: Moment,
    ) -> StoreResult<Vec<MenuSlot>> {
        let rows = sqlx::query_as::<_, SlotRow>(&format!(
            r#"
            SELECT {SLOT_COLUMNS}
              FROM menu_slots
             WHERE id = $1
                OR (day = $2 AND moment = $3
                    AND week_start = (SELECT week_start FROM menu_slots WHERE id = $1))
             ORDER BY id
               FOR UPDATE
            "#
        ))
        .bind(id)
        .bind(day.as_str())
        .bind(moment.as_str())
        .fetch_all(&mut **tx)
        .await
        .map_err(tx_err)?;
        slots_from(rows)
    }

    async fn set_coordinates_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        day: Day,
        moment: Moment,
        now: OffsetDateTime,
    ) -> StoreResult<MenuSlot> {
        let row = sqlx::query_as::<_, SlotRow>(&format!(
            r#"
            UPDATE menu_slots
               SET day = $2, moment = $3, updated_at = $4
             WHERE id = $1
            RETURNING {SLOT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(day.as_str())
        .bind(moment.as_str())
        .bind(now)
        .fetch_one(&mut **tx)
        .await
        .map_err(tx_err)?;
        MenuSlot::try_from(row)
    }
}

#[async_trait]
impl MenuStore for PgStore {
    async fn list_ingredients(&self) -> StoreResult<Vec<Ingredient>> {
        let rows = sqlx::query_as::<_, IngredientRow>(
            "SELECT id, name, unit, category FROM ingredients ORDER BY name, id",
        )
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(Ingredient::try_from).collect()
    }

    async fn get_ingredient(&self, id: Uuid) -> StoreResult<Option<Ingredient>> {
        let row = sqlx::query_as::<_, IngredientRow>(
            "SELECT id, name, unit, category FROM ingredients WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(Ingredient::try_from).transpose()
    }

    async fn find_ingredient_by_name(&self, name: &str) -> StoreResult<Option<Ingredient>> {
        let row = sqlx::query_as::<_, IngredientRow>(
            "SELECT id, name, unit, category FROM ingredients WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.db)
        .await?;
        row.map(Ingredient::try_from).transpose()
    }

    async fn insert_ingredient(&self, ingredient: &Ingredient) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ingredients (id, name, unit, category)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(ingredient.id)
        .bind(&ingredient.name)
        .bind(&ingredient.unit)
        .bind(ingredient.category.as_str())
        .execute(&self.db)
        .await
        .map_err(|e| {
            conflict_or(e, || format!("ingredient '{}' already exists", ingredient.name))
        })?;
        Ok(())
    }

    async fn update_ingredient(&self, ingredient: &Ingredient) -> StoreResult<bool> {
        let res = sqlx::query(
            r#"
            UPDATE ingredients
               SET name = $2, unit = $3, category = $4
             WHERE id = $1
            "#,
        )
        .bind(ingredient.id)
        .bind(&ingredient.name)
        .bind(&ingredient.unit)
        .bind(ingredient.category.as_str())
        .execute(&self.db)
        .await
        .map_err(|e| {
            conflict_or(e, || format!("ingredient '{}' already exists", ingredient.name))
        })?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_ingredient(&self, id: Uuid) -> StoreResult<bool> {
        // recipe_lines cascade via FK
        let res = sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn recipe_ids_using_ingredient(&self, id: Uuid) -> StoreResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT recipe_id
              FROM recipe_lines
             WHERE ingredient_id = $1
             ORDER BY recipe_id
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;
        Ok(ids)
    }

    async fn list_recipes(&self) -> StoreResult<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT id, name, description, prep_minutes, servings, created_at, updated_at
              FROM recipes
             ORDER BY name, id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        self.assemble(rows).await
    }

    async fn get_recipe(&self, id: Uuid) -> StoreResult<Option<Recipe>> {
        let row = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT id, name, description, prep_minutes, servings, created_at, updated_at
              FROM recipes
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        match row {
            Some(row) => Ok(self.assemble(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn insert_recipe(&self, recipe: &Recipe) -> StoreResult<()> {
        let mut tx = self.db.begin().await.map_err(tx_err)?;
        sqlx::query(
            r#"
            INSERT INTO recipes (id, name, description, prep_minutes, servings, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(recipe.id)
        .bind(&recipe.name)
        .bind(&recipe.description)
        .bind(recipe.prep_minutes)
        .bind(recipe.servings)
        .bind(recipe.created_at)
        .bind(recipe.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(tx_err)?;
        Self::insert_lines_tx(&mut tx, recipe).await?;
        tx.commit().await.map_err(tx_err)?;
        debug!(recipe_id = %recipe.id, lines = recipe.lines.len(), "recipe inserted");
        Ok(())
    }

    async fn replace_recipe(&self, recipe: &Recipe) -> StoreResult<bool> {
        let mut tx = self.db.begin().await.map_err(tx_err)?;
        let res = sqlx::query(
            r#"
            UPDATE recipes
               SET name = $2, description = $3, prep_minutes = $4, servings = $5, updated_at = $6
             WHERE id = $1
            "#,
        )
        .bind(recipe.id)
        .bind(&recipe.name)
        .bind(&recipe.description)
        .bind(recipe.prep_minutes)
        .bind(recipe.servings)
        .bind(recipe.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(tx_err)?;
        if res.rows_affected() == 0 {
            return Ok(false);
        }
        sqlx::query("DELETE FROM recipe_lines WHERE recipe_id = $1")
            .bind(recipe.id)
            .execute(&mut *tx)
            .await
            .map_err(tx_err)?;
        Self::insert_lines_tx(&mut tx, recipe).await?;
        tx.commit().await.map_err(tx_err)?;
        debug!(recipe_id = %recipe.id, lines = recipe.lines.len(), "recipe replaced");
        Ok(true)
    }

    async fn delete_recipe(&self, id: Uuid) -> StoreResult<bool> {
        let mut tx = self.db.begin().await.map_err(tx_err)?;
        sqlx::query(
            r#"
            UPDATE menu_slots
               SET recipe_id = NULL, balance_cache = NULL, updated_at = now()
             WHERE recipe_id = $1
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(tx_err)?;
        let res = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(tx_err)?;
        tx.commit().await.map_err(tx_err)?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_slots_for_week(&self, week_start: Date) -> StoreResult<Vec<MenuSlot>> {
        let rows = sqlx::query_as::<_, SlotRow>(&format!(
            "SELECT {SLOT_COLUMNS} FROM menu_slots WHERE week_start = $1"
        ))
        .bind(week_start)
        .fetch_all(&self.db)
        .await?;
        let mut slots = slots_from(rows)?;
        slots.sort_by_key(|s| (s.day, s.moment));
        Ok(slots)
    }

    async fn list_slots_for_recipe(&self, recipe_id: Uuid) -> StoreResult<Vec<MenuSlot>> {
        let rows = sqlx::query_as::<_, SlotRow>(&format!(
            "SELECT {SLOT_COLUMNS} FROM menu_slots WHERE recipe_id = $1 ORDER BY week_start"
        ))
        .bind(recipe_id)
        .fetch_all(&self.db)
        .await?;
        slots_from(rows)
    }

    async fn get_slot(&self, id: Uuid) -> StoreResult<Option<MenuSlot>> {
        let row = sqlx::query_as::<_, SlotRow>(&format!(
            "SELECT {SLOT_COLUMNS} FROM menu_slots WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(MenuSlot::try_from).transpose()
    }

    async fn find_slot(
        &self,
        day: Day,
        moment: Moment,
        week_start: Date,
    ) -> StoreResult<Option<MenuSlot>> {
        let row = sqlx::query_as::<_, SlotRow>(&format!(
            "SELECT {SLOT_COLUMNS} FROM menu_slots WHERE day = $1 AND moment = $2 AND week_start = $3"
        ))
        .bind(day.as_str())
        .bind(moment.as_str())
        .bind(week_start)
        .fetch_optional(&self.db)
        .await?;
        row.map(MenuSlot::try_from).transpose()
    }

    async fn insert_slot(&self, slot: &MenuSlot) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO menu_slots
                   (id, day, moment, week_start, recipe_id, description, balance_cache, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(slot.id)
        .bind(slot.day.as_str())
        .bind(slot.moment.as_str())
        .bind(slot.week_start)
        .bind(slot.recipe_id)
        .bind(&slot.description)
        .bind(&slot.balance_cache)
        .bind(slot.created_at)
        .bind(slot.updated_at)
        .execute(&self.db)
        .await
        .map_err(|e| {
            conflict_or(e, || {
                format!(
                    "a slot already exists for {} {} of week {}",
                    slot.day, slot.moment, slot.week_start
                )
            })
        })?;
        Ok(())
    }

    async fn update_slot(&self, slot: &MenuSlot) -> StoreResult<bool> {
        let res = sqlx::query(
            r#"
            UPDATE menu_slots
               SET recipe_id = $2, description = $3, balance_cache = $4, updated_at = $5
             WHERE id = $1
            "#,
        )
        .bind(slot.id)
        .bind(slot.recipe_id)
        .bind(&slot.description)
        .bind(&slot.balance_cache)
        .bind(slot.updated_at)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_slot(&self, id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM menu_slots WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn set_balance_cache(
        &self,
        slot_id: Uuid,
        recipe_id: Option<Uuid>,
        blob: Option<&str>,
    ) -> StoreResult<bool> {
        let res = sqlx::query(
            r#"
            UPDATE menu_slots
               SET balance_cache = $2
             WHERE id = $1 AND recipe_id IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(slot_id)
        .bind(blob)
        .bind(recipe_id)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn move_slot(
        &self,
        slot_id: Uuid,
        day: Day,
        moment: Moment,
    ) -> StoreResult<Option<MoveOutcome>> {
        let mut tx = self.db.begin().await.map_err(tx_err)?;

        let locked = Self::lock_move_pair_tx(&mut tx, slot_id, day, moment).await?;
        let Some(source) = locked.iter().find(|s| s.id == slot_id).cloned() else {
            return Ok(None);
        };
        if (source.day, source.moment) == (day, moment) {
            return Ok(Some(MoveOutcome {
                moved: source,
                displaced: None,
            }));
        }
        let occupant = locked
            .into_iter()
            .find(|s| s.id != slot_id && (s.day, s.moment) == (day, moment));

        // The coordinates constraint is deferred to commit, so the two
        // updates may pass through a transient duplicate.
        let now = OffsetDateTime::now_utc();
        let moved = Self::set_coordinates_tx(&mut tx, source.id, day, moment, now).await?;
        let displaced = match occupant {
            Some(other) => Some(
                Self::set_coordinates_tx(&mut tx, other.id, source.day, source.moment, now)
                    .await?,
            ),
            None => None,
        };

        tx.commit().await.map_err(tx_err)?;
        debug!(slot_id = %slot_id, swapped = displaced.is_some(), "slot moved");
        Ok(Some(MoveOutcome { moved, displaced }))
    }
}
