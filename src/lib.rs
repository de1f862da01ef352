// Client library for the intercity bus booking service

// Export modules
pub mod api;
pub mod chat;
pub mod config;
pub mod models;
pub mod query;
pub mod render;
pub mod session;
pub mod stub;
pub mod validation;

// Re-export key types for convenience
pub use api::{ApiError, BookingService, ClientError, HttpBookingService};
pub use chat::{ChatAssistant, ChatMessage, Role};
pub use config::ClientConfig;
pub use models::{
    Booking, BookingReference, BookingStatus, BusProvider, District, ProviderDetails,
    RoutePoint, SearchResult,
};
pub use query::{filter_by_name, QueryClient, SearchCriteria};
pub use session::{new_idempotency_key, BookingForm, BookingSession, CancelOutcome, Confirmation};
pub use stub::StubBookingService;
pub use validation::ValidationError;
