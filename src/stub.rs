// In-memory stand-in for the booking service
//
// Reproduces the observable behavior of the real service closely enough to
// drive the query client and booking session in tests and local demos.

use async_trait::async_trait;
use chrono::Local;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::api::{ApiError, BookingService};
use crate::models::{
    Booking, BookingReference, BookingRequest, BookingResponse, BookingStatus, BusProvider,
    CancelRequest, CancelResponse, District, ProviderDetails, RoutePoint, SearchRequest,
    SearchResult,
};
use crate::validation;

pub const REFERENCE_LENGTH: usize = 8;
const REFERENCE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

const BAD_REQUEST: u16 = 400;
const NOT_FOUND: u16 = 404;

struct CatalogDistrict {
    id: u32,
    name: String,
    dropping_points: Vec<(String, u32)>,
}

struct CatalogProvider {
    id: u32,
    name: String,
    contact_info: Option<String>,
    address: Option<String>,
    privacy_policy: Option<String>,
    website: Option<String>,
    coverage: Vec<String>,
}

impl CatalogProvider {
    fn serves(&self, district: &str) -> bool {
        self.coverage.iter().any(|d| d == district)
    }

    fn to_provider(&self) -> BusProvider {
        BusProvider {
            id: self.id.to_string(),
            name: self.name.clone(),
            contact_info: self.contact_info.clone(),
            address: self.address.clone(),
            privacy_policy: self.privacy_policy.clone(),
            website: self.website.clone(),
        }
    }
}

struct StoredBooking {
    seq: u64,
    booking: Booking,
}

pub struct StubBookingService {
    districts: Vec<CatalogDistrict>,
    providers: Vec<CatalogProvider>,
    bookings: DashMap<String, StoredBooking>,
    idempotency_keys: DashMap<String, BookingReference>,
    next_seq: Mutex<u64>,
    request_count: AtomicUsize,
    fail_next_requests: AtomicUsize,
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError::Rejected {
        status_code: Some(BAD_REQUEST),
        message: message.into(),
    }
}

fn district(id: u32, name: &str, points: &[(&str, u32)]) -> CatalogDistrict {
    CatalogDistrict {
        id,
        name: name.to_string(),
        dropping_points: points
            .iter()
            .map(|(point, price)| (point.to_string(), *price))
            .collect(),
    }
}

impl StubBookingService {
    /// A small catalog of districts and providers.
    pub fn seeded() -> Self {
        let districts = vec![
            district(1, "Dhaka", &[("Gabtoli", 600), ("Sayedabad", 650), ("Mohakhali", 700)]),
            district(2, "Chittagong", &[("GEC Circle", 700), ("Dampara", 650), ("Oxygen", 600)]),
            district(3, "Sylhet", &[("Kadamtali", 750), ("Subhanighat", 800)]),
            district(4, "Rajshahi", &[("Shaheb Bazar", 650), ("Rail Gate", 600)]),
            district(5, "Cox's Bazar", &[("Kolatoli", 1200)]),
        ];

        let providers = vec![
            CatalogProvider {
                id: 1,
                name: "Hanif Enterprise".to_string(),
                contact_info: Some("Hotline: 01713-049546\nEmail: info@hanif.example".to_string()),
                address: Some("Gabtoli Bus Terminal, Dhaka".to_string()),
                privacy_policy: Some("Passenger details are used for ticketing only.".to_string()),
                website: None,
                coverage: ["Dhaka", "Chittagong", "Sylhet", "Rajshahi", "Cox's Bazar"]
                    .map(String::from)
                    .to_vec(),
            },
            CatalogProvider {
                id: 2,
                name: "Shyamoli Paribahan".to_string(),
                contact_info: Some("Hotline: 01711-234567".to_string()),
                address: Some("Kallyanpur, Dhaka".to_string()),
                privacy_policy: None,
                website: Some("https://shyamoli.example".to_string()),
                coverage: ["Dhaka", "Sylhet", "Rajshahi"].map(String::from).to_vec(),
            },
            CatalogProvider {
                id: 3,
                name: "Green Line".to_string(),
                contact_info: Some("Hotline: 16594".to_string()),
                address: None,
                privacy_policy: None,
                website: Some("https://greenline.example".to_string()),
                coverage: ["Dhaka", "Chittagong", "Cox's Bazar"].map(String::from).to_vec(),
            },
            CatalogProvider {
                id: 4,
                name: "Ena Transport".to_string(),
                contact_info: None,
                address: None,
                privacy_policy: None,
                website: None,
                coverage: ["Dhaka", "Sylhet"].map(String::from).to_vec(),
            },
        ];

        Self {
            districts,
            providers,
            bookings: DashMap::new(),
            idempotency_keys: DashMap::new(),
            next_seq: Mutex::new(1),
            request_count: AtomicUsize::new(0),
            fail_next_requests: AtomicUsize::new(0),
        }
    }

    /// Makes the next `count` calls fail with a 500 service error.
    pub fn fail_next_requests(&self, count: usize) {
        self.fail_next_requests.store(count, Ordering::SeqCst);
    }

    /// Calls received so far, including failed ones.
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn booking_count(&self) -> usize {
        self.bookings.len()
    }

    fn begin(&self) -> Result<(), ApiError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);

        let should_fail = self
            .fail_next_requests
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(ApiError::Service {
                status_code: 500,
                message: "Internal Server Error".to_string(),
            });
        }
        Ok(())
    }

    fn find_district(&self, name: &str) -> Option<&CatalogDistrict> {
        self.districts.iter().find(|d| d.name == name)
    }

    fn find_provider(&self, name: &str) -> Option<&CatalogProvider> {
        self.providers.iter().find(|p| p.name == name)
    }

    fn sorted_providers(&self, keep: impl Fn(&CatalogProvider) -> bool) -> Vec<BusProvider> {
        let mut providers: Vec<BusProvider> = self
            .providers
            .iter()
            .filter(|p| keep(*p))
            .map(CatalogProvider::to_provider)
            .collect();
        providers.sort_by(|a, b| a.name.cmp(&b.name));
        providers
    }

    fn generate_reference(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let candidate: String = (0..REFERENCE_LENGTH)
                .map(|_| REFERENCE_CHARSET[rng.gen_range(0..REFERENCE_CHARSET.len())] as char)
                .collect();
            if !self.bookings.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    fn check_route(&self, request: &BookingRequest) -> Result<(), ApiError> {
        let provider = self
            .find_provider(&request.bus_provider)
            .ok_or_else(|| bad_request(format!("Unknown bus provider: {}", request.bus_provider)))?;

        if !provider.serves(&request.from_district) || !provider.serves(&request.to_district) {
            return Err(bad_request(format!(
                "{} does not operate {} to {}",
                provider.name, request.from_district, request.to_district
            )));
        }

        let destination = self
            .find_district(&request.to_district)
            .ok_or_else(|| bad_request(format!("Unknown district: {}", request.to_district)))?;
        if !destination
            .dropping_points
            .iter()
            .any(|(point, _)| *point == request.dropping_point)
        {
            return Err(bad_request(format!(
                "{} is not a dropping point in {}",
                request.dropping_point, request.to_district
            )));
        }
        Ok(())
    }

    fn create_booking(&self, request: &BookingRequest) -> Result<Booking, ApiError> {
        validation::require("customer_name", &request.customer_name)
            .map_err(|e| bad_request(e.to_string()))?;
        validation::phone(&request.customer_phone).map_err(|e| bad_request(e.to_string()))?;
        self.check_route(request)?;

        let seq = {
            let mut next = self.next_seq.lock();
            let seq = *next;
            *next += 1;
            seq
        };

        let reference = self.generate_reference();
        let booking = Booking {
            id: seq.to_string(),
            booking_reference: BookingReference::new(reference.clone()),
            customer_name: request.customer_name.clone(),
            customer_phone: request.customer_phone.clone(),
            from_district: request.from_district.clone(),
            to_district: request.to_district.clone(),
            dropping_point: request.dropping_point.clone(),
            bus_provider: request.bus_provider.clone(),
            travel_date: request.travel_date,
            fare: request.fare,
            status: BookingStatus::Confirmed,
            created_at: Some(Local::now().naive_local()),
        };

        self.bookings.insert(
            reference,
            StoredBooking {
                seq,
                booking: booking.clone(),
            },
        );
        Ok(booking)
    }

    fn booking_by_reference(&self, reference: &BookingReference) -> Option<Booking> {
        self.bookings
            .get(reference.as_str())
            .map(|stored| stored.booking.clone())
    }

    fn routes_summary(&self) -> String {
        self.providers
            .iter()
            .map(|p| format!("{}: {}", p.name, p.coverage.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for StubBookingService {
    fn default() -> Self {
        Self::seeded()
    }
}

#[async_trait]
impl BookingService for StubBookingService {
    async fn search_buses(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, ApiError> {
        self.begin()?;

        let Some(destination) = self.find_district(&request.to_district) else {
            return Ok(Vec::new());
        };

        let mut results = Vec::new();
        for provider in self.providers.iter().filter(|p| {
            p.serves(&request.from_district) && p.serves(&request.to_district)
        }) {
            for (point, price) in &destination.dropping_points {
                if request.max_price.is_some_and(|max| *price > max) {
                    continue;
                }
                results.push(SearchResult {
                    provider: provider.name.clone(),
                    provider_details: Some(provider.to_provider()),
                    from_district: request.from_district.clone(),
                    to_district: request.to_district.clone(),
                    dropping_point: point.clone(),
                    fare: *price,
                });
            }
        }
        Ok(results)
    }

    async fn book_ticket(&self, request: &BookingRequest) -> Result<BookingResponse, ApiError> {
        self.begin()?;

        // A repeated key returns the booking created by the first submission
        let booking = match self.idempotency_keys.entry(request.idempotency_key.clone()) {
            Entry::Occupied(existing) => self
                .booking_by_reference(existing.get())
                .ok_or_else(|| ApiError::Service {
                    status_code: 500,
                    message: "Idempotency record without booking".to_string(),
                })?,
            Entry::Vacant(slot) => {
                let booking = self.create_booking(request)?;
                slot.insert(booking.booking_reference.clone());
                booking
            }
        };

        Ok(BookingResponse {
            success: Some(true),
            booking_reference: Some(booking.booking_reference.clone()),
            booking: Some(booking),
        })
    }

    async fn my_bookings(&self, customer_phone: &str) -> Result<Vec<Booking>, ApiError> {
        self.begin()?;

        let mut found: Vec<(u64, Booking)> = self
            .bookings
            .iter()
            .filter(|entry| entry.booking.customer_phone == customer_phone)
            .map(|entry| (entry.seq, entry.booking.clone()))
            .collect();
        found.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(found.into_iter().map(|(_, booking)| booking).collect())
    }

    async fn cancel_booking(&self, request: &CancelRequest) -> Result<CancelResponse, ApiError> {
        self.begin()?;

        let mut stored = match self.bookings.get_mut(&request.booking_reference) {
            Some(stored) if stored.booking.customer_phone == request.customer_phone => stored,
            _ => {
                return Err(ApiError::Rejected {
                    status_code: Some(NOT_FOUND),
                    message: "Booking not found or phone number doesn't match".to_string(),
                })
            }
        };

        if stored.booking.status == BookingStatus::Cancelled {
            return Err(ApiError::Rejected {
                status_code: Some(NOT_FOUND),
                message: "Booking already cancelled".to_string(),
            });
        }

        stored.booking.status = BookingStatus::Cancelled;
        Ok(CancelResponse {
            success: true,
            message: Some("Booking cancelled successfully".to_string()),
        })
    }

    async fn districts(&self) -> Result<Vec<District>, ApiError> {
        self.begin()?;

        let mut districts: Vec<District> = self
            .districts
            .iter()
            .map(|d| District {
                id: d.id.to_string(),
                name: d.name.clone(),
                created_at: None,
            })
            .collect();
        districts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(districts)
    }

    async fn providers(&self) -> Result<Vec<BusProvider>, ApiError> {
        self.begin()?;
        Ok(self.sorted_providers(|_| true))
    }

    async fn providers_in_district(&self, district: &str) -> Result<Vec<BusProvider>, ApiError> {
        self.begin()?;
        Ok(self.sorted_providers(|p| p.serves(district)))
    }

    async fn provider_details(&self, name: &str) -> Result<ProviderDetails, ApiError> {
        self.begin()?;

        let provider = self.find_provider(name).ok_or_else(|| ApiError::Rejected {
            status_code: Some(NOT_FOUND),
            message: "Provider not found".to_string(),
        })?;

        let routes: BTreeMap<String, Vec<RoutePoint>> = provider
            .coverage
            .iter()
            .filter_map(|name| self.find_district(name))
            .map(|d| {
                let points = d
                    .dropping_points
                    .iter()
                    .map(|(point, price)| RoutePoint {
                        dropping_point: point.clone(),
                        price: *price,
                    })
                    .collect();
                (d.name.clone(), points)
            })
            .collect();

        Ok(ProviderDetails {
            name: provider.name.clone(),
            contact_info: provider.contact_info.clone(),
            address: provider.address.clone(),
            privacy_policy: provider.privacy_policy.clone(),
            website: provider.website.clone(),
            coverage_districts: provider.coverage.iter().cloned().collect::<BTreeSet<_>>(),
            routes,
        })
    }

    async fn chat(&self, message: &str) -> Result<String, ApiError> {
        self.begin()?;

        let query = message.to_lowercase();
        let reply = if ["contact", "phone", "email"].iter().any(|k| query.contains(k)) {
            let contacts = self
                .providers
                .iter()
                .filter_map(|p| {
                    let contact = p.contact_info.as_deref()?;
                    Some(format!("{}: {}", p.name, contact.replace('\n', ", ")))
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!("Here are the contact details I have:\n\n{contacts}")
        } else if ["district", "route", "serve"].iter().any(|k| query.contains(k)) {
            format!("Here are the available routes:\n\n{}", self.routes_summary())
        } else {
            "I can help you with information about bus routes, providers, bookings, and contact details. What would you like to know?".to_string()
        };
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn tomorrow() -> NaiveDate {
        Local::now().date_naive() + Duration::days(1)
    }

    fn booking_request(key: &str) -> BookingRequest {
        BookingRequest {
            customer_name: "Test User".to_string(),
            customer_phone: "01711111111".to_string(),
            from_district: "Dhaka".to_string(),
            to_district: "Chittagong".to_string(),
            dropping_point: "GEC Circle".to_string(),
            bus_provider: "Hanif Enterprise".to_string(),
            travel_date: tomorrow(),
            fare: 700,
            idempotency_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn test_search_pairs_providers_with_destination_points() {
        let stub = StubBookingService::seeded();
        let results = stub
            .search_buses(&SearchRequest {
                from_district: "Dhaka".to_string(),
                to_district: "Chittagong".to_string(),
                max_price: None,
            })
            .await
            .unwrap();

        // Hanif and Green Line each offer the three Chittagong points
        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| r.provider != "Shyamoli Paribahan"));
    }

    #[tokio::test]
    async fn test_reference_shape() {
        let stub = StubBookingService::seeded();
        let response = stub.book_ticket(&booking_request("k1")).await.unwrap();
        let reference = response.booking_reference.unwrap();

        assert_eq!(reference.as_str().len(), REFERENCE_LENGTH);
        assert!(reference
            .as_str()
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_repeated_idempotency_key_returns_first_booking() {
        let stub = StubBookingService::seeded();
        let first = stub.book_ticket(&booking_request("same")).await.unwrap();
        let second = stub.book_ticket(&booking_request("same")).await.unwrap();
        let third = stub.book_ticket(&booking_request("other")).await.unwrap();

        assert_eq!(first.booking_reference, second.booking_reference);
        assert_ne!(first.booking_reference, third.booking_reference);
        assert_eq!(stub.booking_count(), 2);
    }

    #[tokio::test]
    async fn test_rejected_booking_does_not_consume_key() {
        let stub = StubBookingService::seeded();
        let mut request = booking_request("retry-me");
        request.dropping_point = "Kolatoli".to_string();

        let err = stub.book_ticket(&request).await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected { .. }));
        assert_eq!(stub.booking_count(), 0);

        request.dropping_point = "GEC Circle".to_string();
        assert!(stub.book_ticket(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_provider_outside_route_is_rejected() {
        let stub = StubBookingService::seeded();
        let mut request = booking_request("k");
        request.bus_provider = "Shyamoli Paribahan".to_string();

        let err = stub.book_ticket(&request).await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected { ref message, .. } if message.contains("does not operate")));
        assert_eq!(err.status_code(), Some(400));
    }

    #[tokio::test]
    async fn test_fail_next_requests() {
        let stub = StubBookingService::seeded();
        stub.fail_next_requests(1);

        assert!(matches!(
            stub.districts().await,
            Err(ApiError::Service { status_code: 500, .. })
        ));
        assert_eq!(stub.districts().await.unwrap().len(), 5);
        assert_eq!(stub.request_count(), 2);
    }

    #[tokio::test]
    async fn test_provider_details_routes_follow_coverage() {
        let stub = StubBookingService::seeded();
        let details = stub.provider_details("Green Line").await.unwrap();

        assert!(details.address.is_none());
        assert_eq!(details.coverage_districts.len(), 3);
        assert_eq!(details.routes["Cox's Bazar"][0].dropping_point, "Kolatoli");

        let bare = stub.provider_details("Ena Transport").await.unwrap();
        assert!(bare.contact_info.is_none());
    }

    #[tokio::test]
    async fn test_chat_answers_route_questions() {
        let stub = StubBookingService::seeded();
        let reply = stub.chat("Which districts does Green Line serve?").await.unwrap();
        assert!(reply.contains("Green Line: Dhaka, Chittagong, Cox's Bazar"));

        let reply = stub.chat("hello").await.unwrap();
        assert!(reply.starts_with("I can help you"));
    }
}
