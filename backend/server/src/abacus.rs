//! # Abacus
//!
//! Place-value abacus held in memory by the server.
//!
//! ## Model
//!
//! - A box of **rows**, each row is one place value `y` holding a bead count
//! - Every row holds at most **width** beads, where width is `base - 1`
//! - Only rows with beads are stored, empty rows are dropped after every operation
//! - A **divider** tracks the finest subdivision reached while halving
//!
//! ## Operations
//!
//! - `add`/`sub`: saturate at width or floor at zero, never carry or borrow
//! - `mul2`: if every row is full, carry the whole box up one place, otherwise double each row
//! - `div2`: if some row holds 2+ beads, halve the divider and clamp rows to it, otherwise
//!   borrow by moving the whole box down one place (stops at the units place)
//! - `convert_base`: clamp rows to the new width
//!
//! Nothing here fails except asking for a base below 2. Negative amounts and step counts
//! count as zero.
use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_BASE: i64 = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbacusError {
    #[error("Invalid base {base}, must be at least 2")]
    InvalidBase { base: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbacusBox {
    width: u64,
    rows: BTreeMap<i128, u64>,
    divider: u64,
}

/// Wire form of a box. Rows are `[y, count]` pairs in ascending `y`.
///
/// Requests address rows with `i64`, carries and borrows may move them past that range.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub width: u64,
    pub divider: u64,
    pub rows: Vec<(i128, u64)>,
}

fn width_for(base: i64) -> Result<u64, AbacusError> {
    if base < 2 {
        return Err(AbacusError::InvalidBase { base });
    }

    Ok((base - 1) as u64)
}

fn non_negative(amount: i64) -> u64 {
    amount.max(0) as u64
}

impl Default for AbacusBox {
    fn default() -> Self {
        let width = (DEFAULT_BASE - 1) as u64;

        Self {
            width,
            rows: BTreeMap::new(),
            divider: width,
        }
    }
}

impl AbacusBox {
    pub fn init(base: i64) -> Result<Self, AbacusError> {
        let width = width_for(base)?;

        Ok(Self {
            width,
            rows: BTreeMap::new(),
            divider: width,
        })
    }

    pub fn width(&self) -> u64 {
        self.width
    }

    pub fn divider(&self) -> u64 {
        self.divider
    }

    pub fn rows(&self) -> &BTreeMap<i128, u64> {
        &self.rows
    }

    pub fn count(&self, y: i128) -> u64 {
        self.rows.get(&y).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn add(&mut self, y: i64, k: i64) {
        self.reset_divider();

        let y = i128::from(y);
        let count = self
            .count(y)
            .saturating_add(non_negative(k))
            .min(self.width);
        self.rows.insert(y, count);

        self.compact();
    }

    pub fn sub(&mut self, y: i64, k: i64) {
        self.reset_divider();

        let y = i128::from(y);
        let count = self.count(y).saturating_sub(non_negative(k));
        self.rows.insert(y, count);

        self.compact();
    }

    /// Doubles the box `steps` times and returns how many steps were applied.
    ///
    /// Once every row is full each further step is a carry, so the remaining
    /// steps are applied as one shift.
    pub fn mul2(&mut self, steps: i64) -> u64 {
        let steps = non_negative(steps);
        let mut applied = 0;

        while applied < steps {
            self.reset_divider();

            if self.rows.is_empty() {
                applied = steps;
                break;
            }

            if self.all_full() {
                self.shift(i128::from(steps - applied));
                applied = steps;
            } else {
                let width = self.width;
                for count in self.rows.values_mut() {
                    *count = count.saturating_mul(2).min(width);
                }
                applied += 1;
            }

            self.compact();
        }

        applied
    }

    /// Halves the box up to `steps` times and returns how many steps were applied.
    ///
    /// Stops early on an empty box or when a borrow would move past the units place.
    /// Consecutive borrows are applied as one shift.
    pub fn div2(&mut self, steps: i64) -> u64 {
        let steps = non_negative(steps);
        let mut applied = 0;

        while applied < steps {
            let Some(&low) = self.rows.keys().next() else {
                self.reset_divider();
                break;
            };

            if self.rows.values().any(|&count| count >= 2) {
                self.divider = (self.divider / 2).max(1);

                let divider = self.divider;
                for count in self.rows.values_mut() {
                    *count = (*count).min(divider);
                }

                self.compact();
                applied += 1;
            } else {
                if low == 0 {
                    break;
                }

                let remaining = steps - applied;
                // rows below zero never reach the units place
                let borrows = if low > 0 {
                    remaining.min(u64::try_from(low).unwrap_or(u64::MAX))
                } else {
                    remaining
                };

                self.shift(-i128::from(borrows));
                self.compact();
                applied += borrows;
            }
        }

        applied
    }

    pub fn convert_base(&mut self, base: i64) -> Result<(), AbacusError> {
        let width = width_for(base)?;

        for count in self.rows.values_mut() {
            *count = (*count).min(width);
        }

        self.width = width;
        self.reset_divider();
        self.compact();

        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            width: self.width,
            divider: self.divider,
            rows: self.rows.iter().map(|(&y, &count)| (y, count)).collect(),
        }
    }

    fn all_full(&self) -> bool {
        !self.rows.is_empty() && self.rows.values().all(|&count| count == self.width)
    }

    /// Moves every row by `offset` places. Leaves the box as is if any row would overflow.
    fn shift(&mut self, offset: i128) {
        let shifted: Option<BTreeMap<i128, u64>> = self
            .rows
            .iter()
            .map(|(&y, &count)| y.checked_add(offset).map(|y| (y, count)))
            .collect();

        if let Some(rows) = shifted {
            self.rows = rows;
        }
    }

    fn reset_divider(&mut self) {
        self.divider = self.width;
    }

    fn compact(&mut self) {
        self.rows.retain(|_, count| *count > 0);
    }
}
