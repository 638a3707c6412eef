use std::{collections::HashMap, fmt::Write};

use time::Date;
use tracing::debug;

use super::{aggregator::aggregate, dto::ShoppingList};
use crate::{error::AppResult, planner::week::iso_date, state::AppState};

/// Aggregated list for the week anchored at `week_start`. Slots whose
/// recipe has since disappeared contribute nothing.
pub async fn shopping_list(state: &AppState, week_start: Date) -> AppResult<ShoppingList> {
    let slots = state.store.list_slots_for_week(week_start).await?;

    let mut recipes = HashMap::new();
    let mut planned = Vec::new();
    for recipe_id in slots.iter().filter_map(|s| s.recipe_id) {
        if !recipes.contains_key(&recipe_id) {
            let recipe = state.store.get_recipe(recipe_id).await?;
            recipes.insert(recipe_id, recipe);
        }
        planned.push(recipe_id);
    }

    let rows = aggregate(
        planned
            .iter()
            .filter_map(|id| recipes.get(id).and_then(Option::as_ref)),
    );
    debug!(%week_start, meals = planned.len(), rows = rows.len(), "shopping list built");
    Ok(ShoppingList { week_start, rows })
}

/// Plain-text rendering, one `- name: quantity unit` line per row.
pub fn render_text(list: &ShoppingList) -> String {
    let mut out = format!(
        "Shopping list for the week of {}\n",
        iso_date::format(&list.week_start)
    );
    if list.rows.is_empty() {
        out.push_str("Nothing planned.\n");
    }
    for row in &list.rows {
        let _ = writeln!(out, "- {}: {} {}", row.name, row.display_quantity(), row.unit);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ingredients::model::{Category, Ingredient},
        planner::model::{Day, MenuSlot, Moment},
        recipes::model::{fixtures::recipe, RecipeLine},
    };
    use time::macros::date;

    const WEEK: Date = date!(2024 - 04 - 01);

    #[tokio::test]
    async fn recipe_planned_twice_counts_twice() {
        let state = AppState::fake();
        let lentils = Ingredient::new("Lentils".into(), "g".into(), Category::GrainsAndStarches);
        state.store.insert_ingredient(&lentils).await.unwrap();
        let dal = recipe("Dal", vec![RecipeLine::new(&lentils, 200.0, "g".into())]);
        state.store.insert_recipe(&dal).await.unwrap();

        for (day, moment) in [(Day::Monday, Moment::Evening), (Day::Thursday, Moment::Midday)] {
            let slot = MenuSlot::new(day, moment, WEEK, Some(dal.id), None);
            state.store.insert_slot(&slot).await.unwrap();
        }
        let other_week = MenuSlot::new(
            Day::Monday,
            Moment::Evening,
            date!(2024 - 04 - 08),
            Some(dal.id),
            None,
        );
        state.store.insert_slot(&other_week).await.unwrap();
        let note_only =
            MenuSlot::new(Day::Friday, Moment::Evening, WEEK, None, Some("restaurant".into()));
        state.store.insert_slot(&note_only).await.unwrap();

        let list = shopping_list(&state, WEEK).await.unwrap();
        assert_eq!(list.rows.len(), 1);
        assert_eq!(list.rows[0].quantity, 400.0);

        let text = render_text(&list);
        assert_eq!(
            text,
            "Shopping list for the week of 2024-04-01\n- Lentils: 400.0 g\n"
        );
    }

    #[tokio::test]
    async fn empty_week_renders_placeholder() {
        let state = AppState::fake();
        let list = shopping_list(&state, WEEK).await.unwrap();
        assert!(list.rows.is_empty());
        assert!(render_text(&list).ends_with("Nothing planned.\n"));
    }
}
