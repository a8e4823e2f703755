// Payment gateway seam used by the booking flow's final step
//
// The booking machine only ever talks to `PaymentGateway`. `StubPaymentGateway`
// performs the same card checks the checkout form did and never moves money.

use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaymentError {
    #[error("Payment declined: {0}")]
    Declined(String),

    #[error("Invalid payment method: {0}")]
    InvalidMethod(String),

    #[error("Payment service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PaymentMethod {
    pub card_type: String,
    pub cardholder_name: String,
    pub last_four: String,
    pub expiry: String, // MM/YY
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ConfirmationId(pub String);

impl fmt::Display for ConfirmationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    // Charge the given amount; exactly one attempt per call
    async fn charge(
        &self,
        amount: f64,
        method: &PaymentMethod,
    ) -> Result<ConfirmationId, PaymentError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRecord {
    pub confirmation_id: ConfirmationId,
    pub amount: f64,
    pub last_four: String,
}

pub struct StubPaymentGateway {
    available: AtomicBool,
    fail_next: AtomicUsize,
    latency: Option<Duration>,
    today: Option<NaiveDate>,
    charges: Mutex<Vec<ChargeRecord>>,
}

impl StubPaymentGateway {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            fail_next: AtomicUsize::new(0),
            latency: None,
            today: None,
            charges: Mutex::new(Vec::new()),
        }
    }

    /// Simulate a slow processor round trip.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Pin the date used for card expiry checks.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Decline the next `count` charges.
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn charges(&self) -> Vec<ChargeRecord> {
        self.charges.lock().clone()
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    fn check_method(&self, method: &PaymentMethod) -> Result<(), PaymentError> {
        if method.card_type.trim().is_empty() {
            return Err(PaymentError::InvalidMethod("card type is required".to_string()));
        }
        if method.cardholder_name.trim().is_empty() {
            return Err(PaymentError::InvalidMethod(
                "cardholder name is required".to_string(),
            ));
        }
        if method.last_four.len() != 4 || !method.last_four.chars().all(|c| c.is_ascii_digit()) {
            return Err(PaymentError::InvalidMethod(format!(
                "bad card digits: {}",
                method.last_four
            )));
        }

        let (month, year) = parse_expiry(&method.expiry)
            .ok_or_else(|| PaymentError::InvalidMethod(format!("bad expiry: {}", method.expiry)))?;
        let today = self.today();
        if (year, month) < (today.year(), today.month()) {
            return Err(PaymentError::Declined(format!(
                "card expired {}",
                method.expiry
            )));
        }

        Ok(())
    }
}

impl Default for StubPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

// "MM/YY" -> (month, four digit year)
fn parse_expiry(expiry: &str) -> Option<(u32, i32)> {
    let (month, year) = expiry.trim().split_once('/')?;
    let month: u32 = month.trim().parse().ok()?;
    let year: i32 = year.trim().parse().ok()?;
    if !(1..=12).contains(&month) || !(0..100).contains(&year) {
        return None;
    }
    Some((month, 2000 + year))
}

#[async_trait]
impl PaymentGateway for StubPaymentGateway {
    async fn charge(
        &self,
        amount: f64,
        method: &PaymentMethod,
    ) -> Result<ConfirmationId, PaymentError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if !self.available.load(Ordering::SeqCst) {
            return Err(PaymentError::Unavailable("processor offline".to_string()));
        }

        if !amount.is_finite() || amount < 0.0 {
            return Err(PaymentError::Declined(format!("invalid amount {}", amount)));
        }

        self.check_method(method)?;

        let scripted = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted {
            warn!(last_four = %method.last_four, "scripted decline");
            return Err(PaymentError::Declined("card declined".to_string()));
        }

        let confirmation_id = ConfirmationId(format!("CONF{:06}", rand::random::<u32>() % 1_000_000));
        self.charges.lock().push(ChargeRecord {
            confirmation_id: confirmation_id.clone(),
            amount,
            last_four: method.last_four.clone(),
        });

        info!(%confirmation_id, amount, "charge accepted");
        Ok(confirmation_id)
    }
}
