// src/services/cpi_store.rs
use dashmap::DashMap;
use rust_decimal::Decimal;

use crate::models::CpiPeriod;

/// In-memory CPI table shared between the refresh job and readers.
///
/// Entries are only ever inserted or overwritten, never removed, so a reader
/// racing a refresh sees either the previous or the new value for a period.
#[derive(Debug, Default)]
pub struct CpiStore {
    data: DashMap<CpiPeriod, Decimal>,
}

impl CpiStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, period: CpiPeriod) -> Option<Decimal> {
        self.data.get(&period).map(|value| *value)
    }

    /// Inserts or overwrites the value for `period`, returning the previous one.
    pub fn upsert(&self, period: CpiPeriod, value: Decimal) -> Option<Decimal> {
        self.data.insert(period, value)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Latest period currently held, if any.
    pub fn latest_period(&self) -> Option<CpiPeriod> {
        self.data.iter().map(|entry| *entry.key()).max()
    }
}
