// src/services/cpi.rs
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::models::{CpiData, CpiPeriod};
use crate::services::cpi_store::CpiStore;

/// The valuation method always uses the October index of the year before purchase.
pub const REFERENCE_MONTH: u32 = 10;

#[derive(Debug, Clone)]
pub struct CpiService {
    store: Arc<CpiStore>,
}

impl CpiService {
    pub fn new(store: Arc<CpiStore>) -> Self {
        CpiService { store }
    }

    pub fn get_cpi(&self, year: i32, month: u32) -> Option<Decimal> {
        self.store.get(CpiPeriod::new(year, month))
    }

    pub fn reference_period(purchase_year: i32) -> CpiPeriod {
        CpiPeriod::new(purchase_year.saturating_sub(1), REFERENCE_MONTH)
    }

    pub fn get_reference_value(&self, purchase_year: i32) -> Option<Decimal> {
        self.store.get(Self::reference_period(purchase_year))
    }

    pub fn reference_cpi_data(&self, purchase_year: i32) -> Option<CpiData> {
        let period = Self::reference_period(purchase_year);
        self.store
            .get(period)
            .map(|value| CpiData::new(period, value))
    }
}
