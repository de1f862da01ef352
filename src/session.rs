// Booking session: reserve one itinerary, list and cancel bookings by phone
use chrono::{Local, NaiveDate};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::{ApiError, BookingService};
use crate::models::{Booking, BookingReference, BookingRequest, CancelRequest, SearchResult};
use crate::validation;

const IDEMPOTENCY_KEY_LENGTH: usize = 24;

/// Customer fields collected for a booking.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingForm {
    pub customer_name: String,
    pub customer_phone: String,
    pub travel_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub reference: BookingReference,
    pub booking: Option<Booking>,
}

impl Confirmation {
    /// The bookings are tied to nothing but this reference and the phone
    /// number, so the user has to keep it.
    pub fn notice(&self) -> String {
        format!(
            "Booking confirmed. Your booking reference is {}. Please save it: you need it \
             together with your phone number to view or cancel this booking.",
            self.reference
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CancelOutcome {
    pub reference: BookingReference,
    pub message: String,
}

/// Fresh key for `BookingSession::book_with_key`.
pub fn new_idempotency_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(IDEMPOTENCY_KEY_LENGTH)
        .map(char::from)
        .collect()
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

pub struct BookingSession {
    service: Arc<dyn BookingService>,
    today: fn() -> NaiveDate,
}

impl BookingSession {
    pub fn new(service: Arc<dyn BookingService>) -> Self {
        Self {
            service,
            today: local_today,
        }
    }

    /// Replaces the clock used for the travel date check.
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    fn request_for(
        &self,
        itinerary: &SearchResult,
        form: &BookingForm,
        idempotency_key: String,
    ) -> Result<BookingRequest, ApiError> {
        let name = validation::require("customer_name", &form.customer_name)?;
        let phone = validation::phone(&form.customer_phone)?;
        let date = validation::travel_date(form.travel_date, (self.today)())?;

        Ok(BookingRequest::for_itinerary(
            itinerary,
            name,
            phone,
            date,
            idempotency_key,
        ))
    }

    /// Submits one reservation attempt under a fresh idempotency key.
    ///
    /// The key is not handed back on failure. Callers that want to retry a
    /// timeout or network error without risking a second booking should
    /// take a key from [`new_idempotency_key`] and go through
    /// [`BookingSession::book_with_key`] instead.
    pub async fn book(
        &self,
        itinerary: &SearchResult,
        form: &BookingForm,
    ) -> Result<Confirmation, ApiError> {
        self.book_with_key(itinerary, form, new_idempotency_key())
            .await
    }

    /// Submits under a caller-held key. Reusing the key after a retryable
    /// failure, where the first attempt may or may not have landed, lets the
    /// service return the original booking instead of creating another.
    pub async fn book_with_key(
        &self,
        itinerary: &SearchResult,
        form: &BookingForm,
        idempotency_key: String,
    ) -> Result<Confirmation, ApiError> {
        let request = self.request_for(itinerary, form, idempotency_key)?;

        let response = match self.service.book_ticket(&request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    provider = %request.bus_provider,
                    retryable = err.is_retryable(),
                    error = %err,
                    "booking failed"
                );
                return Err(err);
            }
        };

        if response.success == Some(false) {
            return Err(ApiError::rejected("booking was not accepted"));
        }

        let reference = response
            .booking_reference
            .filter(|r| !r.as_str().trim().is_empty())
            .ok_or_else(|| {
                ApiError::Decode("book_ticket: response carries no booking_reference".to_string())
            })?;

        info!(
            reference = %reference,
            provider = %request.bus_provider,
            travel_date = %request.travel_date,
            "booking confirmed"
        );

        Ok(Confirmation {
            reference,
            booking: response.booking,
        })
    }

    /// Every booking for the phone number, any status. Unknown numbers
    /// yield an empty list.
    pub async fn list_mine(&self, customer_phone: &str) -> Result<Vec<Booking>, ApiError> {
        let phone = validation::require("customer_phone", customer_phone)?;
        self.service.my_bookings(phone).await
    }

    pub async fn cancel(
        &self,
        booking_reference: &str,
        customer_phone: &str,
    ) -> Result<CancelOutcome, ApiError> {
        let request = CancelRequest {
            booking_reference: validation::require("booking_reference", booking_reference)?
                .to_string(),
            customer_phone: validation::require("customer_phone", customer_phone)?.to_string(),
        };

        let response = match self.service.cancel_booking(&request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(reference = %request.booking_reference, error = %err, "cancellation failed");
                return Err(err);
            }
        };

        if !response.success {
            let message = response
                .message
                .unwrap_or_else(|| "Failed to cancel".to_string());
            warn!(reference = %request.booking_reference, %message, "cancellation refused");
            return Err(ApiError::rejected(message));
        }

        info!(reference = %request.booking_reference, "booking cancelled");
        Ok(CancelOutcome {
            reference: BookingReference::new(request.booking_reference),
            message: response
                .message
                .unwrap_or_else(|| "Booking cancelled successfully".to_string()),
        })
    }

    /// Cancels, then re-fetches the list; status is the service's to report.
    pub async fn cancel_and_refresh(
        &self,
        booking_reference: &str,
        customer_phone: &str,
    ) -> Result<Vec<Booking>, ApiError> {
        self.cancel(booking_reference, customer_phone).await?;
        self.list_mine(customer_phone).await
    }
}
