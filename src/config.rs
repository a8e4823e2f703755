// Business rules that used to be scattered literals: fee rate, duration bounds,
// required event fields and the time-slot grid.
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::listing::BookingOffer;
use crate::pricing::PricingConfig;
use crate::time_range::{time_slots, DurationConstraint};

const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    pub pricing: PricingConfig,
    pub booking: BookingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BookingConfig {
    /// Used when a listing carries no bounds of its own
    pub duration: DurationConstraint,
    /// Event detail keys that must be filled before review
    pub required_fields: Vec<String>,
    pub slot_open: NaiveTime,
    pub slot_close: NaiveTime,
    pub slot_step_minutes: u32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            duration: DurationConstraint::default(),
            required_fields: vec!["eventType".to_string()],
            slot_open: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            slot_close: NaiveTime::from_hms_opt(23, 30, 0).unwrap_or_default(),
            slot_step_minutes: 30,
        }
    }
}

impl BookingConfig {
    /// Listing-specific bounds win over the marketplace default.
    pub fn constraint_for(&self, offer: &BookingOffer) -> DurationConstraint {
        offer.duration.unwrap_or(self.duration)
    }

    pub fn time_slots(&self) -> Vec<NaiveTime> {
        time_slots(self.slot_open, self.slot_close, self.slot_step_minutes)
    }
}

impl MarketplaceConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::JsonParseError(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading marketplace config");
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    fn check(&self) -> Result<(), ConfigError> {
        let rate = self.pricing.service_fee_rate;
        if !(0.0..1.0).contains(&rate) {
            return Err(ConfigError::InvalidValue {
                field: "pricing.service_fee_rate".to_string(),
                reason: format!("{} is outside [0, 1)", rate),
            });
        }
        if self.pricing.currency.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "pricing.currency".to_string(),
                reason: "empty".to_string(),
            });
        }
        let step = self.booking.slot_step_minutes;
        if step == 0 || step > MINUTES_PER_DAY {
            return Err(ConfigError::InvalidValue {
                field: "booking.slot_step_minutes".to_string(),
                reason: format!("{} is outside 1..={}", step, MINUTES_PER_DAY),
            });
        }
        Ok(())
    }
}
