//! # Interpreter
//!
//! Reads the box as a word and a number.
//!
//! - Rows are read top to bottom, from the highest visible place down to `y = 0`
//! - A row with `c` beads reads as `legend[c]` and is worth `c`
//! - A blank row reads as `legend[0]` and is worth nothing
//! - Missing legend entries read as empty strings
//! - The sum is a `u128`, full rows in a huge base add past `u64`
use serde::{Deserialize, Serialize};

use crate::{abacus::AbacusBox, utils::lenient_int};

pub const DEFAULT_VISIBLE_ROWS: i64 = 16;
pub const MAX_VISIBLE_ROWS: i64 = 256;

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Rtl,
    Ltr,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Interpreter {
    pub legend: Vec<String>,
    #[serde(deserialize_with = "lenient_int")]
    pub visible_rows: i64,
    pub top_to_bottom: bool,
    pub direction: Direction,
    pub joiner: String,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct Reading {
    pub text: String,
    pub sum: u128,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self {
            legend: Vec::new(),
            visible_rows: DEFAULT_VISIBLE_ROWS,
            top_to_bottom: true,
            direction: Direction::Rtl,
            joiner: String::new(),
        }
    }
}

impl Interpreter {
    pub fn read(&self, abacus: &AbacusBox) -> Reading {
        let visible_rows = self.visible_rows.clamp(0, MAX_VISIBLE_ROWS);

        let mut cells: Vec<(&str, u64)> = (0..visible_rows)
            .rev()
            .map(|y| {
                let value = abacus.count(i128::from(y)).min(abacus.width());
                (self.symbol(value), value)
            })
            .collect();

        if !self.top_to_bottom {
            cells.reverse();
        }

        if self.direction == Direction::Ltr {
            cells.reverse();
        }

        let text = cells
            .iter()
            .map(|(symbol, _)| *symbol)
            .collect::<Vec<_>>()
            .join(&self.joiner);
        let sum = cells.iter().map(|(_, value)| u128::from(*value)).sum();

        Reading { text, sum }
    }

    fn symbol(&self, value: u64) -> &str {
        usize::try_from(value)
            .ok()
            .and_then(|index| self.legend.get(index))
            .map(String::as_str)
            .unwrap_or("")
    }
}
