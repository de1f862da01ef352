// Records exchanged with the booking service
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// The service hands out numeric row ids; we keep them opaque
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

// Empty strings from the service mean "not provided"
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct District {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BusProvider {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub contact_info: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub privacy_policy: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RoutePoint {
    pub dropping_point: String,
    pub price: u32,
}

/// Full directory entry for one provider.
///
/// Everything except the name is optional on the wire: absent text fields
/// deserialize to `None`, absent collections to empty ones.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ProviderDetails {
    pub name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub contact_info: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub privacy_policy: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub website: Option<String>,
    #[serde(default)]
    pub coverage_districts: BTreeSet<String>,
    #[serde(default)]
    pub routes: BTreeMap<String, Vec<RoutePoint>>,
}

/// One itinerary offer returned by a search. Not persisted by the service.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SearchResult {
    pub provider: String,
    #[serde(default)]
    pub provider_details: Option<BusProvider>,
    pub from_district: String,
    pub to_district: String,
    pub dropping_point: String,
    pub fare: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service-issued handle for a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct BookingReference(String);

impl BookingReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Booking {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub booking_reference: BookingReference,
    pub customer_name: String,
    pub customer_phone: String,
    pub from_district: String,
    pub to_district: String,
    pub dropping_point: String,
    pub bus_provider: String,
    pub travel_date: NaiveDate,
    pub fare: u32,
    pub status: BookingStatus,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

impl Booking {
    pub fn is_cancellable(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }
}

// Request payloads

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub from_district: String,
    pub to_district: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingRequest {
    pub customer_name: String,
    pub customer_phone: String,
    pub from_district: String,
    pub to_district: String,
    pub dropping_point: String,
    pub bus_provider: String,
    pub travel_date: NaiveDate,
    pub fare: u32,
    // Travels as a header, not in the body
    #[serde(skip)]
    pub idempotency_key: String,
}

impl BookingRequest {
    /// Copies route, provider and fare verbatim from a search result.
    pub fn for_itinerary(
        itinerary: &SearchResult,
        customer_name: &str,
        customer_phone: &str,
        travel_date: NaiveDate,
        idempotency_key: String,
    ) -> Self {
        Self {
            customer_name: customer_name.trim().to_string(),
            customer_phone: customer_phone.trim().to_string(),
            from_district: itinerary.from_district.clone(),
            to_district: itinerary.to_district.clone(),
            dropping_point: itinerary.dropping_point.clone(),
            bus_provider: itinerary.provider.clone(),
            travel_date,
            fare: itinerary.fare,
            idempotency_key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelRequest {
    pub booking_reference: String,
    pub customer_phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub message: String,
}

// Response envelopes

#[derive(Debug, Deserialize, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BookingResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub booking_reference: Option<BookingReference>,
    #[serde(default)]
    pub booking: Option<Booking>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BookingsResponse {
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CancelResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DistrictsResponse {
    pub districts: Vec<District>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ProvidersResponse {
    #[serde(default)]
    pub providers: Vec<BusProvider>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_from_service_row() {
        let json = r#"{
            "id": 42,
            "booking_reference": "AB12CD34",
            "customer_name": "Test User",
            "customer_phone": "01711111111",
            "from_district": "Dhaka",
            "to_district": "Chittagong",
            "dropping_point": "GEC Circle",
            "bus_provider": "Hanif",
            "travel_date": "2026-10-18",
            "fare": 700,
            "status": "confirmed",
            "created_at": "2026-10-17T09:30:00"
        }"#;

        let booking: Booking = serde_json::from_str(json).unwrap();
        assert_eq!(booking.id, "42");
        assert_eq!(booking.booking_reference.as_str(), "AB12CD34");
        assert_eq!(booking.travel_date, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert!(booking.is_cancellable());
        assert!(booking.created_at.is_some());
    }

    #[test]
    fn test_provider_details_tolerates_missing_fields() {
        let details: ProviderDetails = serde_json::from_str(r#"{"name": "Ena"}"#).unwrap();
        assert_eq!(details.name, "Ena");
        assert!(details.address.is_none());
        assert!(details.website.is_none());
        assert!(details.privacy_policy.is_none());
        assert!(details.coverage_districts.is_empty());
        assert!(details.routes.is_empty());

        let details: ProviderDetails = serde_json::from_str(
            r#"{"name": "Ena", "address": "  ", "website": null, "routes": {}}"#,
        )
        .unwrap();
        assert!(details.address.is_none());
        assert!(details.website.is_none());
    }

    #[test]
    fn test_null_provider_contact_does_not_sink_the_list() {
        let providers: ProvidersResponse = serde_json::from_str(
            r#"{"providers": [
                {"id": 1, "name": "Hanif", "contact_info": null, "address": null},
                {"id": 2, "name": "Green Line", "contact_info": "Hotline: 16594"},
                {"id": 3, "name": "Ena"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(providers.providers.len(), 3);
        assert!(providers.providers[0].contact_info.is_none());
        assert_eq!(
            providers.providers[1].contact_info.as_deref(),
            Some("Hotline: 16594")
        );
        assert!(providers.providers[2].contact_info.is_none());

        let search: SearchResponse = serde_json::from_str(
            r#"{"results": [{
                "provider": "Hanif",
                "provider_details": {"id": 1, "name": "Hanif", "contact_info": null},
                "from_district": "Dhaka",
                "to_district": "Chittagong",
                "dropping_point": "GEC Circle",
                "fare": 700
            }]}"#,
        )
        .unwrap();
        let details = search.results[0].provider_details.as_ref().unwrap();
        assert!(details.contact_info.is_none());
    }

    #[test]
    fn test_search_request_omits_absent_max_price() {
        let request = SearchRequest {
            from_district: "Dhaka".to_string(),
            to_district: "Sylhet".to_string(),
            max_price: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("max_price").is_none());
    }

    #[test]
    fn test_booking_request_keeps_key_out_of_body() {
        let itinerary = SearchResult {
            provider: "Hanif".to_string(),
            provider_details: None,
            from_district: "Dhaka".to_string(),
            to_district: "Chittagong".to_string(),
            dropping_point: "GEC Circle".to_string(),
            fare: 700,
        };
        let request = BookingRequest::for_itinerary(
            &itinerary,
            " Test User ",
            "01711111111",
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            "key-1".to_string(),
        );

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["customer_name"], "Test User");
        assert_eq!(json["bus_provider"], "Hanif");
        assert_eq!(json["fare"], 700);
        assert_eq!(json["travel_date"], "2026-10-18");
        assert!(json.get("idempotency_key").is_none());
    }
}
