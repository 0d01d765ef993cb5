// src/models.rs
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Year/month key of a single CPI observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CpiPeriod {
    pub year: i32,
    pub month: u32,
}

impl CpiPeriod {
    pub const fn new(year: i32, month: u32) -> Self {
        CpiPeriod { year, month }
    }
}

impl fmt::Display for CpiPeriod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Residential,
    Commercial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationInput {
    pub property_type: PropertyType,
    pub purchase_date: NaiveDate,
    pub monthly_net_rent: Decimal,
    pub living_area: Decimal,
    #[serde(default)]
    pub residential_units: Option<u32>,
    #[serde(default)]
    pub parking_units: u32,
    pub land_value_per_sqm: Decimal,
    pub plot_area: Decimal,
    pub remaining_useful_life: Decimal,
    pub property_yield: Decimal,
    #[serde(default)]
    pub actual_purchase_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
}

impl ValuationInput {
    /// Range checks applied before an input is handed to the valuation engine.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let positive = [
            ("monthly_net_rent", self.monthly_net_rent),
            ("living_area", self.living_area),
            ("land_value_per_sqm", self.land_value_per_sqm),
            ("plot_area", self.plot_area),
            ("remaining_useful_life", self.remaining_useful_life),
            ("property_yield", self.property_yield),
        ];
        for (field, value) in positive {
            if value <= Decimal::ZERO {
                return Err(ValidationError::InvalidField {
                    field,
                    reason: "must be greater than 0",
                });
            }
        }

        if self.property_yield > Decimal::ONE_HUNDRED {
            return Err(ValidationError::InvalidField {
                field: "property_yield",
                reason: "must not exceed 100",
            });
        }

        if let Some(price) = self.actual_purchase_price {
            if price <= Decimal::ZERO {
                return Err(ValidationError::InvalidField {
                    field: "actual_purchase_price",
                    reason: "must be greater than 0",
                });
            }
        }

        Ok(())
    }
}

fn default_base_year() -> i32 {
    2020
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpiData {
    pub year: i32,
    pub month: u32,
    pub index_value: Decimal,
    #[serde(default = "default_base_year")]
    pub base_year: i32,
}

impl CpiData {
    pub fn new(period: CpiPeriod, index_value: Decimal) -> Self {
        CpiData {
            year: period.year,
            month: period.month,
            index_value,
            base_year: default_base_year(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagementCosts {
    pub administration: Decimal,
    pub maintenance: Decimal,
    pub risk_of_rent_loss: Decimal,
    pub total: Decimal,
    pub risk_percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub input_data: ValuationInput,

    pub cpi_used: CpiData,
    pub cpi_base_2001: Decimal,
    pub index_factor: Decimal,

    pub annual_gross_income: Decimal,
    pub land_value: Decimal,
    pub management_costs: ManagementCosts,
    pub annual_net_income: Decimal,
    pub land_interest: Decimal,
    pub building_net_income: Decimal,
    pub multiplier: Decimal,

    pub theoretical_building_value: Decimal,
    pub theoretical_total_value: Decimal,
    pub building_share_percent: Decimal,
    pub land_share_percent: Decimal,

    pub actual_building_value: Option<Decimal>,
    pub actual_land_value: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input() -> ValuationInput {
        ValuationInput {
            property_type: PropertyType::Residential,
            purchase_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            monthly_net_rent: dec!(2000.00),
            living_area: dec!(150.0),
            residential_units: Some(3),
            parking_units: 2,
            land_value_per_sqm: dec!(500.00),
            plot_area: dec!(400.0),
            remaining_useful_life: dec!(50.0),
            property_yield: dec!(5.0),
            actual_purchase_price: Some(dec!(500000.00)),
        }
    }

    #[test]
    fn period_display_pads_month() {
        assert_eq!(CpiPeriod::new(2023, 1).to_string(), "2023-01");
        assert_eq!(CpiPeriod::new(2023, 10).to_string(), "2023-10");
    }

    #[test]
    fn periods_compare_structurally() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(CpiPeriod::new(2023, 10));
        assert!(set.contains(&CpiPeriod::new(2023, 10)));
        assert!(!set.contains(&CpiPeriod::new(2023, 11)));
        assert!(CpiPeriod::new(2022, 12) < CpiPeriod::new(2023, 1));
    }

    #[test]
    fn valid_input_passes() {
        assert_eq!(input().validate(), Ok(()));
    }

    #[test]
    fn negative_rent_is_rejected() {
        let mut data = input();
        data.monthly_net_rent = dec!(-2000);
        assert_eq!(
            data.validate(),
            Err(ValidationError::InvalidField {
                field: "monthly_net_rent",
                reason: "must be greater than 0",
            })
        );
    }

    #[test]
    fn yield_above_hundred_is_rejected() {
        let mut data = input();
        data.property_yield = dec!(150);
        let err = data.validate().unwrap_err();
        assert_eq!(err.to_string(), "property_yield must not exceed 100");
    }

    #[test]
    fn zero_purchase_price_is_rejected() {
        let mut data = input();
        data.actual_purchase_price = Some(Decimal::ZERO);
        assert!(data.validate().is_err());
    }

    #[test]
    fn input_deserializes_from_frontend_json() {
        let json = r#"{
            "property_type": "commercial",
            "purchase_date": "2024-01-15",
            "monthly_net_rent": 5000.00,
            "living_area": 300.0,
            "residential_units": null,
            "parking_units": 5,
            "land_value_per_sqm": 800.00,
            "plot_area": 500.0,
            "remaining_useful_life": 40.0,
            "property_yield": 6.0,
            "actual_purchase_price": 1000000.00
        }"#;

        let parsed: ValuationInput = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.property_type, PropertyType::Commercial);
        assert_eq!(parsed.residential_units, None);
        assert_eq!(parsed.monthly_net_rent, dec!(5000));
        assert_eq!(parsed.actual_purchase_price, Some(dec!(1000000)));
    }

    #[test]
    fn unknown_property_type_fails_to_deserialize() {
        let json = r#"{
            "property_type": "invalid_type",
            "purchase_date": "2024-01-15",
            "monthly_net_rent": 2000,
            "living_area": 150,
            "land_value_per_sqm": 500,
            "plot_area": 400,
            "remaining_useful_life": 50,
            "property_yield": 5
        }"#;

        assert!(serde_json::from_str::<ValuationInput>(json).is_err());
    }
}
