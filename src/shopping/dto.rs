use serde::Serialize;
use time::Date;

use super::aggregator::ShoppingRow;
use crate::planner::week::iso_date;

#[derive(Debug, Serialize)]
pub struct ShoppingList {
    #[serde(with = "iso_date")]
    pub week_start: Date,
    pub rows: Vec<ShoppingRow>,
}
