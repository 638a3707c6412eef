use std::collections::BTreeMap;

use time::{Date, OffsetDateTime};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{
    dto::{GridCell, MoveInput, SlotInput, SlotView, WeekGrid},
    model::{Day, MenuSlot, Moment, MoveOutcome},
    week::floor_to_monday,
};
use crate::{
    balance::{
        cache::{compute, encode},
        classifier::BalanceVerdict,
        services::{bulk_verdicts, slot_verdict, verdicts_for_slots},
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// All ten cells of the week, in day then moment order.
pub async fn week_grid(state: &AppState, week_start: Date) -> AppResult<WeekGrid> {
    let slots = state.store.list_slots_for_week(week_start).await?;
    let mut views = verdicts_for_slots(state.store.as_ref(), state.rules(), &slots).await?;
    let mut by_cell: BTreeMap<(Day, Moment), MenuSlot> =
        slots.into_iter().map(|s| ((s.day, s.moment), s)).collect();

    let mut cells = Vec::with_capacity(Day::ALL.len() * Moment::ALL.len());
    for day in Day::ALL {
        for moment in Moment::ALL {
            let slot = by_cell.remove(&(day, moment)).map(|slot| {
                let (name, verdict) = views
                    .remove(&slot.id)
                    .unwrap_or_else(|| (None, BalanceVerdict::empty()));
                SlotView::new(slot, name, verdict)
            });
            cells.push(GridCell { day, moment, slot });
        }
    }
    Ok(WeekGrid { week_start, cells })
}

/// Assigns a recipe and/or description to the slot at the given
/// coordinates, creating it when absent. The slot's cache is rewritten in
/// the same write. Returns the view and whether the slot was created.
pub async fn upsert_slot(state: &AppState, input: SlotInput) -> AppResult<(SlotView, bool)> {
    input.validate()?;
    let week_start = floor_to_monday(input.week_start);
    let recipe = match input.recipe_id {
        Some(id) => Some(
            state
                .store
                .get_recipe(id)
                .await?
                .ok_or(AppError::NotFound("recipe"))?,
        ),
        None => None,
    };
    let description = input
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let existing = state
        .store
        .find_slot(input.day, input.moment, week_start)
        .await?;
    let created = existing.is_none();
    let mut slot = match existing {
        Some(mut slot) => {
            slot.recipe_id = input.recipe_id;
            slot.description = description;
            slot.updated_at = OffsetDateTime::now_utc();
            slot
        }
        None => MenuSlot::new(input.day, input.moment, week_start, input.recipe_id, description),
    };

    let verdict = compute(&slot, recipe.as_ref(), state.rules());
    slot.balance_cache = slot.recipe_id.map(|_| encode(&verdict));

    if created {
        state.store.insert_slot(&slot).await?;
    } else if !state.store.update_slot(&slot).await? {
        return Err(AppError::NotFound("slot"));
    }
    info!(
        slot_id = %slot.id,
        day = %slot.day,
        moment = %slot.moment,
        week_start = %slot.week_start,
        created,
        "slot saved"
    );

    let name = recipe.map(|r| r.name);
    Ok((SlotView::new(slot, name, verdict), created))
}

pub async fn delete_slot(state: &AppState, id: Uuid) -> AppResult<()> {
    if !state.store.delete_slot(id).await? {
        return Err(AppError::NotFound("slot"));
    }
    info!(slot_id = %id, "slot deleted");
    Ok(())
}

/// Moves a slot within its week, swapping with any occupant of the
/// destination. Caches travel with their slots.
pub async fn move_slot(state: &AppState, id: Uuid, to: MoveInput) -> AppResult<MoveOutcome> {
    let outcome = state
        .store
        .move_slot(id, to.day, to.moment)
        .await?
        .ok_or(AppError::NotFound("slot"))?;
    info!(
        slot_id = %id,
        day = %to.day,
        moment = %to.moment,
        swapped_with = ?outcome.displaced.as_ref().map(|s| s.id),
        "slot moved"
    );
    Ok(outcome)
}

pub async fn balance(
    state: &AppState,
    id: Uuid,
    use_cache: bool,
    refresh: bool,
) -> AppResult<BalanceVerdict> {
    slot_verdict(state.store.as_ref(), state.rules(), id, use_cache, refresh).await
}

pub async fn bulk_balance(
    state: &AppState,
    ids: &[Uuid],
    use_cache: bool,
    refresh: bool,
) -> AppResult<BTreeMap<Uuid, BalanceVerdict>> {
    bulk_verdicts(state.store.as_ref(), state.rules(), ids, use_cache, refresh).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        balance::{cache::decode, classifier::VerdictLevel},
        ingredients::model::{Category, Ingredient},
        recipes::model::{fixtures::recipe, Recipe, RecipeLine},
    };
    use time::macros::date;

    const WEEK: Date = date!(2024 - 02 - 05);

    async fn stored_recipe(state: &AppState, name: &str, category: Category) -> Recipe {
        let ing = Ingredient::new(format!("{name} base"), "g".into(), category);
        state.store.insert_ingredient(&ing).await.unwrap();
        let r = recipe(name, vec![RecipeLine::new(&ing, 100.0, "g".into())]);
        state.store.insert_recipe(&r).await.unwrap();
        r
    }

    fn input(day: Day, moment: Moment, recipe_id: Option<Uuid>) -> SlotInput {
        SlotInput {
            day,
            moment,
            week_start: WEEK,
            recipe_id,
            description: None,
        }
    }

    #[tokio::test]
    async fn upsert_creates_then_updates_same_cell() {
        let state = AppState::fake();
        let rice = stored_recipe(&state, "Rice", Category::GrainsAndStarches).await;

        let (first, created) =
            upsert_slot(&state, input(Day::Monday, Moment::Midday, Some(rice.id)))
                .await
                .unwrap();
        assert!(created);
        assert_eq!(first.balance.level, VerdictLevel::Moderate);
        assert_eq!(first.recipe_name.as_deref(), Some("Rice"));

        let mut leftovers = input(Day::Monday, Moment::Midday, None);
        leftovers.description = Some("  leftovers ".into());
        let (second, created) = upsert_slot(&state, leftovers).await.unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.description.as_deref(), Some("leftovers"));
        assert_eq!(second.balance, BalanceVerdict::empty());

        let stored = state.store.get_slot(first.id).await.unwrap().unwrap();
        assert!(stored.balance_cache.is_none());
    }

    #[tokio::test]
    async fn upsert_writes_cache_matching_recompute() {
        let state = AppState::fake();
        let fish = stored_recipe(&state, "Cod", Category::Fish).await;
        let (view, _) = upsert_slot(&state, input(Day::Thursday, Moment::Evening, Some(fish.id)))
            .await
            .unwrap();
        let stored = state.store.get_slot(view.id).await.unwrap().unwrap();
        let cached = decode(stored.balance_cache.as_deref().unwrap()).unwrap();
        assert_eq!(cached, view.balance);
        assert_eq!(balance(&state, view.id, false, false).await.unwrap(), cached);
    }

    #[tokio::test]
    async fn upsert_rejects_unknown_recipe_and_long_description() {
        let state = AppState::fake();
        let err = upsert_slot(&state, input(Day::Monday, Moment::Midday, Some(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("recipe")));

        let mut long = input(Day::Monday, Moment::Midday, None);
        long.description = Some("x".repeat(501));
        assert!(matches!(upsert_slot(&state, long).await, Err(AppError::Validation(_))));
        assert!(state.store.list_slots_for_week(WEEK).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_floors_week_start() {
        let state = AppState::fake();
        let mut mid_week = input(Day::Friday, Moment::Midday, None);
        mid_week.week_start = date!(2024 - 02 - 08);
        mid_week.description = Some("pizza night".into());
        let (view, _) = upsert_slot(&state, mid_week).await.unwrap();
        assert_eq!(view.week_start, WEEK);
    }

    #[tokio::test]
    async fn grid_has_ten_cells_in_order() {
        let state = AppState::fake();
        let soup = stored_recipe(&state, "Soup", Category::Vegetables).await;
        upsert_slot(&state, input(Day::Wednesday, Moment::Evening, Some(soup.id)))
            .await
            .unwrap();

        let grid = week_grid(&state, WEEK).await.unwrap();
        assert_eq!(grid.cells.len(), 10);
        assert_eq!((grid.cells[0].day, grid.cells[0].moment), (Day::Monday, Moment::Midday));
        assert_eq!((grid.cells[9].day, grid.cells[9].moment), (Day::Friday, Moment::Evening));
        let filled: Vec<_> = grid.cells.iter().filter(|c| c.slot.is_some()).collect();
        assert_eq!(filled.len(), 1);
        assert_eq!((filled[0].day, filled[0].moment), (Day::Wednesday, Moment::Evening));
        assert_eq!(filled[0].slot.as_ref().unwrap().recipe_name.as_deref(), Some("Soup"));
    }

    #[tokio::test]
    async fn move_onto_occupied_cell_swaps() {
        let state = AppState::fake();
        let a_recipe = stored_recipe(&state, "A", Category::Meats).await;
        let b_recipe = stored_recipe(&state, "B", Category::Vegetables).await;
        let (a, _) = upsert_slot(&state, input(Day::Monday, Moment::Midday, Some(a_recipe.id)))
            .await
            .unwrap();
        let (b, _) = upsert_slot(&state, input(Day::Tuesday, Moment::Evening, Some(b_recipe.id)))
            .await
            .unwrap();

        let outcome = move_slot(
            &state,
            a.id,
            MoveInput {
                day: Day::Tuesday,
                moment: Moment::Evening,
            },
        )
        .await
        .unwrap();
        assert_eq!((outcome.moved.day, outcome.moved.moment), (Day::Tuesday, Moment::Evening));
        let displaced = outcome.displaced.unwrap();
        assert_eq!(displaced.id, b.id);
        assert_eq!((displaced.day, displaced.moment), (Day::Monday, Moment::Midday));

        let a_now = state.store.get_slot(a.id).await.unwrap().unwrap();
        assert_eq!(a_now.recipe_id, Some(a_recipe.id));
        assert!(a_now.balance_cache.is_some());
    }

    #[tokio::test]
    async fn move_to_free_cell_and_missing_slot() {
        let state = AppState::fake();
        let (view, _) = upsert_slot(&state, input(Day::Monday, Moment::Evening, None))
            .await
            .unwrap();
        let outcome = move_slot(
            &state,
            view.id,
            MoveInput {
                day: Day::Friday,
                moment: Moment::Midday,
            },
        )
        .await
        .unwrap();
        assert!(outcome.displaced.is_none());
        assert_eq!(outcome.moved.week_start, WEEK);

        let err = move_slot(
            &state,
            Uuid::new_v4(),
            MoveInput {
                day: Day::Friday,
                moment: Moment::Midday,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound("slot")));
    }

    #[tokio::test]
    async fn delete_slot_twice_is_not_found() {
        let state = AppState::fake();
        let (view, _) = upsert_slot(&state, input(Day::Monday, Moment::Evening, None))
            .await
            .unwrap();
        delete_slot(&state, view.id).await.unwrap();
        assert!(matches!(delete_slot(&state, view.id).await, Err(AppError::NotFound("slot"))));
    }
}
