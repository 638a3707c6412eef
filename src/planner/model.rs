use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::week::iso_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Moment {
    Midday,
    Evening,
}

impl Day {
    pub const ALL: [Day; 5] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Monday => "monday",
            Day::Tuesday => "tuesday",
            Day::Wednesday => "wednesday",
            Day::Thursday => "thursday",
            Day::Friday => "friday",
        }
    }
}

impl Moment {
    pub const ALL: [Moment; 2] = [Moment::Midday, Moment::Evening];

    pub fn as_str(&self) -> &'static str {
        match self {
            Moment::Midday => "midday",
            Moment::Evening => "evening",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for Day {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Day::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| UnknownValue {
                kind: "day",
                value: s.to_string(),
            })
    }
}

impl FromStr for Moment {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Moment::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownValue {
                kind: "moment",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Moment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(day, moment)` cell of a given week. `balance_cache` holds the
/// serialized verdict of the assigned recipe as of the last refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuSlot {
    pub id: Uuid,
    pub day: Day,
    pub moment: Moment,
    #[serde(with = "iso_date")]
    pub week_start: Date,
    pub recipe_id: Option<Uuid>,
    pub description: Option<String>,
    #[serde(skip)]
    pub balance_cache: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl MenuSlot {
    pub fn new(
        day: Day,
        moment: Moment,
        week_start: Date,
        recipe_id: Option<Uuid>,
        description: Option<String>,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            day,
            moment,
            week_start,
            recipe_id,
            description,
            balance_cache: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn coordinates(&self) -> (Day, Moment, Date) {
        (self.day, self.moment, self.week_start)
    }
}

/// Result of a move. `displaced` is the slot that previously occupied the
/// destination and now sits at the moved slot's former coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub moved: MenuSlot,
    pub displaced: Option<MenuSlot>,
}
