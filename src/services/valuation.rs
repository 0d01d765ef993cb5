// src/services/valuation.rs
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use thiserror::Error;

use crate::models::{CpiData, ManagementCosts, PropertyType, ValuationInput, ValuationResult};

/// CPI of October 2001 (base 2020 = 100), the reference point of the cost rates below.
pub const CPI_BASE_OCT_2001: Decimal = dec!(88.9);
const MONTHS_IN_YEAR: Decimal = dec!(12);

// Residential
const RES_ADMIN_BASE_RATE_PER_UNIT: Decimal = dec!(270); // € / unit
const RES_MAINTENANCE_BASE_RATE: Decimal = dec!(9.00); // € / m²
const RES_RENT_LOSS_FRACTION: Decimal = dec!(0.02);

// Commercial
const COM_ADMIN_FRACTION: Decimal = dec!(0.03);
const COM_MAINTENANCE_BASE_RATE: Decimal = dec!(9.00); // € / m²
const COM_RENT_LOSS_FRACTION: Decimal = dec!(0.04);

// Rounding
const MONEY_DECIMALS: u32 = 0;
const ADMIN_RATE_DECIMALS: u32 = 0;
const MAINTENANCE_RATE_DECIMALS: u32 = 1;
const FACTOR_DECIMALS: u32 = 4;
const PERCENT_DECIMALS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValuationError {
    #[error("theoretical total value must be positive, got {total}")]
    NonPositiveTotalValue { total: Decimal },
    #[error("{step} is outside the representable range")]
    Overflow { step: &'static str },
}

fn round_half_up(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

fn round_euro(value: Decimal) -> Decimal {
    round_half_up(value, MONEY_DECIMALS)
}

fn mul(a: Decimal, b: Decimal, step: &'static str) -> Result<Decimal, ValuationError> {
    a.checked_mul(b).ok_or(ValuationError::Overflow { step })
}

fn div(a: Decimal, b: Decimal, step: &'static str) -> Result<Decimal, ValuationError> {
    a.checked_div(b).ok_or(ValuationError::Overflow { step })
}

fn add(a: Decimal, b: Decimal, step: &'static str) -> Result<Decimal, ValuationError> {
    a.checked_add(b).ok_or(ValuationError::Overflow { step })
}

fn sub(a: Decimal, b: Decimal, step: &'static str) -> Result<Decimal, ValuationError> {
    a.checked_sub(b).ok_or(ValuationError::Overflow { step })
}

/// Income capitalization valuation (Ertragswertverfahren).
///
/// Stateless apart from the CPI baseline fixed at construction; every call
/// with the same arguments produces the same result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValuationService {
    cpi_base: Decimal,
}

impl Default for ValuationService {
    fn default() -> Self {
        ValuationService {
            cpi_base: CPI_BASE_OCT_2001,
        }
    }
}

impl ValuationService {
    pub fn new(cpi_base: Decimal) -> Self {
        ValuationService { cpi_base }
    }

    pub fn cpi_base(&self) -> Decimal {
        self.cpi_base
    }

    pub fn calculate_valuation(
        &self,
        input: &ValuationInput,
        cpi: &CpiData,
    ) -> Result<ValuationResult, ValuationError> {
        let land_value = land_value(input.land_value_per_sqm, input.plot_area)?;
        let annual_gross_income = annual_gross_income(input.monthly_net_rent)?;
        let index_factor = self.index_factor(cpi.index_value)?;

        let management_costs = management_costs(input, index_factor, annual_gross_income)?;

        let annual_net_income = sub(
            annual_gross_income,
            management_costs.total,
            "annual net income",
        )?;
        let land_interest = mul(
            land_value,
            input.property_yield / Decimal::ONE_HUNDRED,
            "land interest",
        )?;
        let building_net_income = sub(annual_net_income, land_interest, "building net income")?;

        let multiplier = multiplier(input.property_yield, input.remaining_useful_life);

        let theoretical_building_value =
            mul(building_net_income, multiplier, "theoretical building value")?;
        let theoretical_total_value =
            add(theoretical_building_value, land_value, "theoretical total value")?;

        if theoretical_total_value <= Decimal::ZERO {
            return Err(ValuationError::NonPositiveTotalValue {
                total: round_euro(theoretical_total_value),
            });
        }

        let building_share_percent = mul(
            div(theoretical_building_value, theoretical_total_value, "building share")?,
            Decimal::ONE_HUNDRED,
            "building share",
        )?;
        let land_share_percent = mul(
            div(land_value, theoretical_total_value, "land share")?,
            Decimal::ONE_HUNDRED,
            "land share",
        )?;

        let (actual_building_value, actual_land_value) = match input.actual_purchase_price {
            Some(price) => (
                Some(round_euro(
                    mul(price, building_share_percent, "actual building value")? / Decimal::ONE_HUNDRED,
                )),
                Some(round_euro(
                    mul(price, land_share_percent, "actual land value")? / Decimal::ONE_HUNDRED,
                )),
            ),
            None => (None, None),
        };

        Ok(ValuationResult {
            input_data: input.clone(),
            cpi_used: cpi.clone(),
            cpi_base_2001: self.cpi_base,
            index_factor: round_half_up(index_factor, FACTOR_DECIMALS),
            annual_gross_income: round_euro(annual_gross_income),
            land_value: round_euro(land_value),
            management_costs,
            annual_net_income: round_euro(annual_net_income),
            land_interest: round_euro(land_interest),
            building_net_income: round_euro(building_net_income),
            multiplier: round_half_up(multiplier, FACTOR_DECIMALS),
            theoretical_building_value: round_euro(theoretical_building_value),
            theoretical_total_value: round_euro(theoretical_total_value),
            building_share_percent: round_half_up(building_share_percent, PERCENT_DECIMALS),
            land_share_percent: round_half_up(land_share_percent, PERCENT_DECIMALS),
            actual_building_value,
            actual_land_value,
        })
    }

    fn index_factor(&self, current_cpi: Decimal) -> Result<Decimal, ValuationError> {
        div(current_cpi, self.cpi_base, "index factor")
    }
}

fn land_value(land_value_per_sqm: Decimal, plot_area: Decimal) -> Result<Decimal, ValuationError> {
    mul(land_value_per_sqm, plot_area, "land value")
}

fn annual_gross_income(monthly_net_rent: Decimal) -> Result<Decimal, ValuationError> {
    mul(monthly_net_rent, MONTHS_IN_YEAR, "annual gross income")
}

fn management_costs(
    input: &ValuationInput,
    index_factor: Decimal,
    annual_gross_income: Decimal,
) -> Result<ManagementCosts, ValuationError> {
    match input.property_type {
        PropertyType::Residential => residential_costs(input, index_factor, annual_gross_income),
        PropertyType::Commercial => commercial_costs(input, index_factor, annual_gross_income),
    }
}

fn maintenance(
    base_rate: Decimal,
    index_factor: Decimal,
    living_area: Decimal,
) -> Result<Decimal, ValuationError> {
    let rate_per_sqm = round_half_up(
        mul(base_rate, index_factor, "maintenance rate")?,
        MAINTENANCE_RATE_DECIMALS,
    );
    mul(rate_per_sqm, living_area, "maintenance")
}

fn residential_costs(
    input: &ValuationInput,
    index_factor: Decimal,
    annual_gross_income: Decimal,
) -> Result<ManagementCosts, ValuationError> {
    // Verwaltungskosten
    let administration = match input.residential_units {
        Some(units) if units > 0 => {
            let rate_per_unit = round_half_up(
                mul(RES_ADMIN_BASE_RATE_PER_UNIT, index_factor, "administration rate")?,
                ADMIN_RATE_DECIMALS,
            );
            mul(rate_per_unit, Decimal::from(units), "administration")?
        }
        _ => Decimal::ZERO,
    };

    // Instandhaltungskosten
    let maintenance = maintenance(RES_MAINTENANCE_BASE_RATE, index_factor, input.living_area)?;

    // Mietausfallwagnis
    let risk_of_rent_loss = annual_gross_income * RES_RENT_LOSS_FRACTION;

    build_costs(administration, maintenance, risk_of_rent_loss, annual_gross_income)
}

fn commercial_costs(
    input: &ValuationInput,
    index_factor: Decimal,
    annual_gross_income: Decimal,
) -> Result<ManagementCosts, ValuationError> {
    let administration = annual_gross_income * COM_ADMIN_FRACTION;
    let maintenance = maintenance(COM_MAINTENANCE_BASE_RATE, index_factor, input.living_area)?;
    let risk_of_rent_loss = annual_gross_income * COM_RENT_LOSS_FRACTION;

    build_costs(administration, maintenance, risk_of_rent_loss, annual_gross_income)
}

/// Rounds each cost line and sums the rounded lines, so `total` always
/// equals the sum of its parts.
fn build_costs(
    administration: Decimal,
    maintenance: Decimal,
    risk_of_rent_loss: Decimal,
    annual_gross_income: Decimal,
) -> Result<ManagementCosts, ValuationError> {
    // Fractions of the gross income stay below it, so only the total can overflow.
    let risk_percentage = if annual_gross_income.is_zero() {
        Decimal::ZERO
    } else {
        round_half_up(
            risk_of_rent_loss / annual_gross_income * Decimal::ONE_HUNDRED,
            PERCENT_DECIMALS,
        )
    };

    let administration = round_euro(administration);
    let maintenance = round_euro(maintenance);
    let risk_of_rent_loss = round_euro(risk_of_rent_loss);
    let total = add(
        add(administration, maintenance, "management costs")?,
        risk_of_rent_loss,
        "management costs",
    )?;

    Ok(ManagementCosts {
        administration,
        maintenance,
        risk_of_rent_loss,
        total,
        risk_percentage,
    })
}

/// Present value annuity factor `(1 - (1 + i)^-n) / i` for a yield in percent.
fn multiplier(property_yield: Decimal, remaining_useful_life: Decimal) -> Decimal {
    let i = property_yield / Decimal::ONE_HUNDRED;
    let n = remaining_useful_life;

    if i.is_zero() {
        return n;
    }

    let base = Decimal::ONE + i;
    let compounded = if n.fract().is_zero() {
        n.to_u64().and_then(|exp| base.checked_powu(exp))
    } else {
        base.checked_powd(n)
    };

    match compounded {
        Some(c) if !c.is_zero() => (Decimal::ONE - Decimal::ONE / c) / i,
        // (1 + i)^n beyond the decimal range: the discount term is negligible.
        _ => Decimal::ONE / i,
    }
}
