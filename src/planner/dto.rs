use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;
use validator::Validate;

use super::{
    model::{Day, MenuSlot, Moment},
    week::{floor_to_monday, iso_date, week_anchor},
};
use crate::{
    balance::classifier::BalanceVerdict,
    error::{AppError, AppResult},
};

fn yes() -> bool {
    true
}

/// Selects a week either by offset from the current week or by a date
/// inside it. `week_start` wins when both are given.
#[derive(Debug, Default, Deserialize)]
pub struct WeekQuery {
    pub week: Option<i64>,
    #[serde(default, with = "iso_date::option")]
    pub week_start: Option<Date>,
}

impl WeekQuery {
    pub fn anchor(&self, today: Date) -> AppResult<Date> {
        if let Some(date) = self.week_start {
            return Ok(floor_to_monday(date));
        }
        week_anchor(today, self.week.unwrap_or(0))
            .ok_or_else(|| AppError::validation("week: offset is out of range"))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SlotInput {
    pub day: Day,
    pub moment: Moment,
    #[serde(with = "iso_date")]
    pub week_start: Date,
    pub recipe_id: Option<Uuid>,
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MoveInput {
    pub day: Day,
    pub moment: Moment,
}

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    #[serde(default = "yes")]
    pub use_cache: bool,
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkBalanceInput {
    #[validate(length(max = 100, message = "at most 100 slots per request"))]
    pub slot_ids: Vec<Uuid>,
    #[serde(default = "yes")]
    pub use_cache: bool,
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Serialize)]
pub struct SlotView {
    pub id: Uuid,
    pub day: Day,
    pub moment: Moment,
    #[serde(with = "iso_date")]
    pub week_start: Date,
    pub recipe_id: Option<Uuid>,
    pub recipe_name: Option<String>,
    pub description: Option<String>,
    pub balance: BalanceVerdict,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl SlotView {
    pub fn new(slot: MenuSlot, recipe_name: Option<String>, balance: BalanceVerdict) -> Self {
        Self {
            id: slot.id,
            day: slot.day,
            moment: slot.moment,
            week_start: slot.week_start,
            recipe_id: slot.recipe_id,
            recipe_name,
            description: slot.description,
            balance,
            updated_at: slot.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GridCell {
    pub day: Day,
    pub moment: Moment,
    pub slot: Option<SlotView>,
}

#[derive(Debug, Serialize)]
pub struct WeekGrid {
    #[serde(with = "iso_date")]
    pub week_start: Date,
    pub cells: Vec<GridCell>,
}

#[derive(Debug, Serialize)]
pub struct MoveView {
    pub moved: MenuSlot,
    pub displaced: Option<MenuSlot>,
}
