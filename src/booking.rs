// Booking wizard state machine shared by service and venue bookings
//
// Steps run TimeSelection -> EventDetails -> Review -> Confirmation. Every
// transition is checked here, not only by the UI, and a failed check leaves
// the machine where it was.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::MarketplaceConfig;
use crate::listing::{BookingOffer, ListingRecord};
use crate::payment::{ConfirmationId, PaymentError, PaymentGateway, PaymentMethod};
use crate::pricing::{PriceBasis, PriceBreakdown, PriceEstimator, PriceSelectionInput, PricingError};
use crate::session::Session;
use crate::time_range::{validate, DurationConstraint, TimeWindow, ValidatedDuration, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum StepState {
    TimeSelection,
    EventDetails,
    Review,
    Confirmation,
}

impl StepState {
    pub fn next(self) -> Option<Self> {
        match self {
            StepState::TimeSelection => Some(StepState::EventDetails),
            StepState::EventDetails => Some(StepState::Review),
            StepState::Review => Some(StepState::Confirmation),
            StepState::Confirmation => None,
        }
    }

    pub fn previous(self) -> Option<Self> {
        match self {
            StepState::TimeSelection => None,
            StepState::EventDetails => Some(StepState::TimeSelection),
            StepState::Review => Some(StepState::EventDetails),
            StepState::Confirmation => Some(StepState::Review),
        }
    }
}

// Why a step could not be entered; rendered inline next to the offending field
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GuardFailure {
    #[error("pick a date and time")]
    MissingWindow,

    #[error("{0}")]
    InvalidWindow(ValidationError),

    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("{0}")]
    Pricing(PricingError),

    #[error("add a payment method")]
    MissingPaymentMethod,

    #[error("steps cannot be skipped")]
    ForwardJump,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingError {
    #[error("Cannot continue to {target:?}: {reason}")]
    GuardNotSatisfied {
        target: StepState,
        reason: GuardFailure,
    },

    #[error("Unknown item: {0}")]
    UnknownItem(String),

    #[error("Listing {0} cannot be booked")]
    NotBookable(String),

    #[error("Listing {listing_id} offers item {item_id} more than once")]
    DuplicateItem { listing_id: String, item_id: String },

    #[error("User {0} is not allowed to book")]
    NotPermitted(String),

    #[error("Booking already confirmed; start a new booking")]
    FlowCompleted,

    #[error(transparent)]
    Payment(#[from] PaymentError),
}

/// In-progress booking state. Lives only as long as the flow does.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BookingDraft {
    pub selected_package_id: Option<String>,
    pub selected_add_on_ids: BTreeSet<String>,
    pub window: Option<TimeWindow>,
    pub event_details: BTreeMap<String, String>,
    pub payment_method: Option<PaymentMethod>,
    pub booked_by: Option<String>,
}

impl BookingDraft {
    fn for_session(session: &Session) -> Self {
        Self {
            booked_by: Some(session.user_id.clone()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingConfirmation {
    pub confirmation_id: ConfirmationId,
    pub listing_id: String,
    pub booked_by: String,
    pub window: Option<TimeWindow>,
    pub breakdown: PriceBreakdown,
}

pub struct BookingStepMachine {
    state: StepState,
    draft: BookingDraft,
    offer: BookingOffer,
    constraint: DurationConstraint,
    required_fields: Vec<String>,
    estimator: PriceEstimator,
    gateway: Arc<dyn PaymentGateway>,
    session: Session,
    confirmation: Option<BookingConfirmation>,
}

impl BookingStepMachine {
    /// Start a booking for a service or venue listing.
    pub fn new(
        listing: &ListingRecord,
        session: Session,
        config: &MarketplaceConfig,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Result<Self, BookingError> {
        let offer = BookingOffer::from_listing(listing)
            .ok_or_else(|| BookingError::NotBookable(listing.id().to_string()))?;
        Self::from_offer(offer, session, config, gateway)
    }

    pub fn from_offer(
        offer: BookingOffer,
        session: Session,
        config: &MarketplaceConfig,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Result<Self, BookingError> {
        if !session.can_book() {
            return Err(BookingError::NotPermitted(session.user_id));
        }
        if let Some(item_id) = offer.duplicate_item_id() {
            return Err(BookingError::DuplicateItem {
                listing_id: offer.listing_id.clone(),
                item_id: item_id.to_string(),
            });
        }

        debug!(
            listing = %offer.listing_id,
            kind = ?offer.listing_kind,
            user = %session.user_id,
            "booking flow started"
        );
        Ok(Self {
            state: StepState::TimeSelection,
            draft: BookingDraft::for_session(&session),
            constraint: config.booking.constraint_for(&offer),
            required_fields: config.booking.required_fields.clone(),
            estimator: PriceEstimator::new(config.pricing.clone()),
            offer,
            gateway,
            session,
            confirmation: None,
        })
    }

    pub fn state(&self) -> StepState {
        self.state
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn offer(&self) -> &BookingOffer {
        &self.offer
    }

    pub fn constraint(&self) -> &DurationConstraint {
        &self.constraint
    }

    pub fn confirmation(&self) -> Option<&BookingConfirmation> {
        self.confirmation.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.state == StepState::Confirmation
    }

    fn ensure_open(&self) -> Result<(), BookingError> {
        if self.is_complete() {
            return Err(BookingError::FlowCompleted);
        }
        Ok(())
    }

    // Draft editing. Allowed on any step before confirmation.

    pub fn set_window(&mut self, window: TimeWindow) -> Result<(), BookingError> {
        self.ensure_open()?;
        self.draft.window = Some(window);
        Ok(())
    }

    /// Re-run on every edit so the UI can show the message next to the inputs.
    pub fn validate_window(&self) -> Result<ValidatedDuration, ValidationError> {
        match &self.draft.window {
            Some(window) => validate(window, &self.constraint),
            None => Err(ValidationError::InvalidTime("no time selected".to_string())),
        }
    }

    pub fn select_package(&mut self, package_id: Option<&str>) -> Result<(), BookingError> {
        self.ensure_open()?;
        if let Some(id) = package_id {
            if self.offer.package(id).is_none() {
                return Err(BookingError::UnknownItem(id.to_string()));
            }
        }
        self.draft.selected_package_id = package_id.map(str::to_string);
        Ok(())
    }

    /// Flip an add-on and return whether it is now selected.
    pub fn toggle_add_on(&mut self, add_on_id: &str) -> Result<bool, BookingError> {
        self.ensure_open()?;
        if self.offer.add_on(add_on_id).is_none() {
            return Err(BookingError::UnknownItem(add_on_id.to_string()));
        }

        if self.draft.selected_add_on_ids.remove(add_on_id) {
            Ok(false)
        } else {
            self.draft.selected_add_on_ids.insert(add_on_id.to_string());
            Ok(true)
        }
    }

    pub fn set_event_detail(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), BookingError> {
        self.ensure_open()?;
        self.draft.event_details.insert(key.into(), value.into());
        Ok(())
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) -> Result<(), BookingError> {
        self.ensure_open()?;
        self.draft.payment_method = Some(method);
        Ok(())
    }

    /// Pricing input for the current draft. A selected package takes
    /// precedence over the hourly rate.
    pub fn selection_input(&self) -> PriceSelectionInput {
        let package_basis = self
            .draft
            .selected_package_id
            .as_deref()
            .and_then(|id| self.offer.package(id))
            .map(|package| PriceBasis::Package {
                package: package.clone(),
            });

        let basis = package_basis.or_else(|| {
            let hourly_rate = self.offer.hourly_rate?;
            let hours = self.validate_window().ok()?;
            Some(PriceBasis::Hourly { hourly_rate, hours })
        });

        let add_ons = self
            .offer
            .add_ons
            .iter()
            .map(|add_on| {
                let mut add_on = add_on.clone();
                add_on.selected = self.draft.selected_add_on_ids.contains(&add_on.id);
                add_on
            })
            .collect();

        PriceSelectionInput { basis, add_ons }
    }

    /// Live estimate for the current draft, usable from any step.
    pub fn estimate(&self) -> Result<PriceBreakdown, PricingError> {
        self.estimator.estimate(&self.selection_input())
    }

    /// Charge summary shown on the review step and after confirmation.
    pub fn summary(&self) -> Option<PriceBreakdown> {
        match self.state {
            StepState::Review => self.estimate().ok(),
            StepState::Confirmation => self.confirmation.as_ref().map(|c| c.breakdown.clone()),
            _ => None,
        }
    }

    // Guards. Entering a step re-checks every earlier step, since the draft
    // can be edited after it was first accepted.

    fn check_time_selection(&self) -> Result<ValidatedDuration, GuardFailure> {
        let window = self.draft.window.as_ref().ok_or(GuardFailure::MissingWindow)?;
        validate(window, &self.constraint).map_err(GuardFailure::InvalidWindow)
    }

    fn check_event_details(&self) -> Result<(), GuardFailure> {
        let missing: Vec<String> = self
            .required_fields
            .iter()
            .filter(|field| {
                self.draft
                    .event_details
                    .get(field.as_str())
                    .map_or(true, |value| value.trim().is_empty())
            })
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(GuardFailure::MissingFields(missing))
        }
    }

    fn check_guard(&self, target: StepState) -> Result<(), GuardFailure> {
        if target >= StepState::EventDetails {
            self.check_time_selection()?;
        }
        if target >= StepState::Review {
            self.check_event_details()?;
        }
        Ok(())
    }

    fn guard_error(&self, target: StepState, reason: GuardFailure) -> BookingError {
        warn!(from = ?self.state, to = ?target, %reason, "step guard rejected");
        BookingError::GuardNotSatisfied { target, reason }
    }

    /// Move one step forward. Entering `Confirmation` charges the payment
    /// gateway once; a failed charge leaves the flow on `Review` for retry.
    pub async fn advance(&mut self) -> Result<StepState, BookingError> {
        let target = self.state.next().ok_or(BookingError::FlowCompleted)?;

        if let Err(reason) = self.check_guard(target) {
            return Err(self.guard_error(target, reason));
        }

        if target == StepState::Confirmation {
            self.confirm().await?;
        }

        debug!(from = ?self.state, to = ?target, "step advanced");
        self.state = target;
        Ok(self.state)
    }

    async fn confirm(&mut self) -> Result<(), BookingError> {
        let target = StepState::Confirmation;
        let breakdown = match self.estimate() {
            Ok(breakdown) => breakdown,
            Err(e) => return Err(self.guard_error(target, GuardFailure::Pricing(e))),
        };
        let method = match &self.draft.payment_method {
            Some(method) => method.clone(),
            None => return Err(self.guard_error(target, GuardFailure::MissingPaymentMethod)),
        };

        let confirmation_id = match self.gateway.charge(breakdown.total, &method).await {
            Ok(id) => id,
            Err(e) => {
                warn!(listing = %self.offer.listing_id, error = %e, "payment failed");
                return Err(BookingError::Payment(e));
            }
        };

        info!(
            listing = %self.offer.listing_id,
            user = %self.session.user_id,
            %confirmation_id,
            total = breakdown.total,
            "booking confirmed"
        );
        self.confirmation = Some(BookingConfirmation {
            confirmation_id,
            listing_id: self.offer.listing_id.clone(),
            booked_by: self.session.user_id.clone(),
            window: self.draft.window,
            breakdown,
        });
        Ok(())
    }

    /// Step back one step. Entered data is kept.
    pub fn retreat(&mut self) -> Result<StepState, BookingError> {
        self.ensure_open()?;
        if let Some(previous) = self.state.previous() {
            debug!(from = ?self.state, to = ?previous, "step retreated");
            self.state = previous;
        }
        Ok(self.state)
    }

    /// Return to an earlier (or the current) step for editing.
    pub fn jump_to(&mut self, step: StepState) -> Result<StepState, BookingError> {
        self.ensure_open()?;
        if step > self.state {
            return Err(self.guard_error(step, GuardFailure::ForwardJump));
        }
        self.state = step;
        Ok(self.state)
    }

    /// Begin a fresh booking for the same listing, discarding the old draft.
    pub fn restart(&mut self) {
        debug!(listing = %self.offer.listing_id, "booking flow restarted");
        self.state = StepState::TimeSelection;
        self.draft = BookingDraft::for_session(&self.session);
        self.confirmation = None;
    }
}
