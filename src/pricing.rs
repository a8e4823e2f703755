// Price estimation for packages, hourly bookings and add-ons
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::listing::{AddOnItem, PricedPackage};
use crate::time_range::ValidatedDuration;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("Select a package or a valid time window")]
    NoBasisSelected,

    #[error("Negative amount for {0}")]
    NegativeAmount(String),
}

/// Amounts are rounded half-up to this many decimal places.
pub const CURRENCY_DECIMALS: u32 = 2;

// Cents per currency unit
const MINOR_UNITS: i64 = 10i64.pow(CURRENCY_DECIMALS);
// Catalog amounts are read to six decimals before rounding to cents
const SUB_CENT_PRECISION: i64 = 10_000;
// Fee rates are applied in basis points
const RATE_SCALE: i64 = 10_000;
const SECONDS_PER_HOUR: i64 = 3600;

pub const DEFAULT_SERVICE_FEE_RATE: f64 = 0.10;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Marketplace fee charged on top of the subtotal
    pub service_fee_rate: f64,

    /// ISO currency code shown on summaries
    pub currency: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            service_fee_rate: DEFAULT_SERVICE_FEE_RATE,
            currency: "USD".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PriceBasis {
    Package {
        package: PricedPackage,
    },
    Hourly {
        hourly_rate: f64,
        hours: ValidatedDuration,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceSelectionInput {
    pub basis: Option<PriceBasis>,
    pub add_ons: Vec<AddOnItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBreakdown {
    pub base: f64,
    pub add_ons_total: f64,
    pub subtotal: f64,
    pub service_fee_rate: f64,
    pub service_fee: f64,
    pub total: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub label: String,
    pub amount: f64,
}

impl PriceBreakdown {
    /// Rows for the review step summary
    pub fn line_items(&self) -> Vec<LineItem> {
        let mut items = vec![LineItem {
            label: "Base price".to_string(),
            amount: self.base,
        }];
        if self.add_ons_total > 0.0 {
            items.push(LineItem {
                label: "Add-ons".to_string(),
                amount: self.add_ons_total,
            });
        }
        items.push(LineItem {
            label: format!("Service fee ({}%)", round_currency(self.service_fee_rate * 100.0)),
            amount: self.service_fee,
        });
        items.push(LineItem {
            label: "Total".to_string(),
            amount: self.total,
        });
        items
    }
}

/// Whole cents for a catalog amount, rounded half away from zero on the
/// decimal value as written (`10.345` -> 1035), not on its binary float.
pub fn to_minor_units(amount: f64) -> i64 {
    let scaled = (amount.abs() * (MINOR_UNITS * SUB_CENT_PRECISION) as f64).round() as i64;
    let cents = scaled.saturating_add(SUB_CENT_PRECISION / 2) / SUB_CENT_PRECISION;
    if amount < 0.0 {
        -cents
    } else {
        cents
    }
}

pub fn from_minor_units(cents: i64) -> f64 {
    cents as f64 / MINOR_UNITS as f64
}

pub fn round_currency(value: f64) -> f64 {
    from_minor_units(to_minor_units(value))
}

// Half-up integer division for non-negative operands
fn div_half_up(numerator: i64, denominator: i64) -> i64 {
    numerator.saturating_add(denominator / 2) / denominator
}

/// Render an amount for display: `$1,234.56` for dollars, `1,234.56 EUR`
/// for anything else.
pub fn format_amount(amount: f64, currency: &str) -> String {
    let cents = to_minor_units(amount);
    let whole = (cents.unsigned_abs() / MINOR_UNITS as u64).to_string();
    let fraction = format!(
        "{:0width$}",
        cents.unsigned_abs() % MINOR_UNITS as u64,
        width = CURRENCY_DECIMALS as usize
    );

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if cents < 0 { "-" } else { "" };
    let number = format!("{}.{}", grouped, fraction);

    match currency {
        "USD" => format!("{}${}", sign, number),
        other => format!("{}{} {}", sign, number, other),
    }
}

pub struct PriceEstimator {
    config: PricingConfig,
}

impl PriceEstimator {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Pure: identical input always yields an identical breakdown.
    ///
    /// All arithmetic runs on whole cents; the float fields of the result are
    /// converted back only at the end.
    pub fn estimate(&self, selection: &PriceSelectionInput) -> Result<PriceBreakdown, PricingError> {
        let base = match &selection.basis {
            None => return Err(PricingError::NoBasisSelected),
            Some(PriceBasis::Package { package }) => {
                ensure_non_negative(package.price, &package.id)?;
                to_minor_units(package.price)
            }
            Some(PriceBasis::Hourly { hourly_rate, hours }) => {
                ensure_non_negative(*hourly_rate, "hourly rate")?;
                let rate = to_minor_units(*hourly_rate);
                div_half_up(rate.saturating_mul(hours.seconds()), SECONDS_PER_HOUR)
            }
        };

        let mut add_ons_total: i64 = 0;
        for add_on in selection.add_ons.iter().filter(|a| a.selected) {
            ensure_non_negative(add_on.price, &add_on.id)?;
            add_ons_total = add_ons_total.saturating_add(to_minor_units(add_on.price));
        }

        let rate = self.config.service_fee_rate;
        ensure_non_negative(rate, "service fee rate")?;
        let rate_bps = (rate * RATE_SCALE as f64).round() as i64;

        let subtotal = base.saturating_add(add_ons_total);
        let service_fee = div_half_up(subtotal.saturating_mul(rate_bps), RATE_SCALE);
        let total = subtotal.saturating_add(service_fee);

        debug!(base, add_ons_total, service_fee, total, "price estimated in cents");

        Ok(PriceBreakdown {
            base: from_minor_units(base),
            add_ons_total: from_minor_units(add_ons_total),
            subtotal: from_minor_units(subtotal),
            service_fee_rate: rate,
            service_fee: from_minor_units(service_fee),
            total: from_minor_units(total),
            currency: self.config.currency.clone(),
        })
    }
}

impl Default for PriceEstimator {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

fn ensure_non_negative(amount: f64, what: &str) -> Result<(), PricingError> {
    if amount < 0.0 || amount.is_nan() {
        return Err(PricingError::NegativeAmount(what.to_string()));
    }
    Ok(())
}
