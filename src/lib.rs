// Booking and discovery core for the event marketplace

pub mod booking;
pub mod config;
pub mod filter;
pub mod listing;
pub mod payment;
pub mod pricing;
pub mod repository;
pub mod session;
pub mod time_range;

// Re-export key types for convenience
pub use booking::{
    BookingConfirmation, BookingDraft, BookingError, BookingStepMachine, GuardFailure, StepState,
};
pub use config::{BookingConfig, ConfigError, MarketplaceConfig};
pub use filter::{apply, FilterSortSpec, FilteredListings, SortKey};
pub use listing::{AddOnItem, BookingOffer, ListingKind, ListingRecord, PricedPackage};
pub use payment::{ConfirmationId, PaymentError, PaymentGateway, PaymentMethod, StubPaymentGateway};
pub use pricing::{
    PriceBasis, PriceBreakdown, PriceEstimator, PriceSelectionInput, PricingConfig, PricingError,
};
pub use repository::{InMemoryListingRepository, ListingRepository, RepositoryError};
pub use session::{Role, Session};
pub use time_range::{
    validate, DurationConstraint, TimeWindow, ValidatedDuration, ValidationError,
};
