// Booking service seam: the trait every backend implements, and the HTTP client for the real one

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::models::{
    Booking, BookingRequest, BookingResponse, BookingsResponse, BusProvider, CancelRequest,
    CancelResponse, ChatRequest, ChatResponse, District, DistrictsResponse, ProviderDetails,
    ProvidersResponse, SearchRequest, SearchResponse, SearchResult,
};
use crate::validation::ValidationError;

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

// Error types for service calls
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// `status_code` is the HTTP status when the refusal came as an error
    /// response, `None` when a success response carried `success: false`.
    #[error("Rejected: {message}")]
    Rejected {
        status_code: Option<u16>,
        message: String,
    },

    #[error("Service error: {status_code} - {message}")]
    Service { status_code: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether resubmitting the same input can succeed. Validation failures
    /// and business rejections need the user to change something first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Network(_) | ApiError::Timeout(_) | ApiError::Service { .. }
        )
    }

    /// A refusal reported inside a success body rather than by status.
    pub fn rejected(message: impl Into<String>) -> Self {
        ApiError::Rejected {
            status_code: None,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status_code, .. } => *status_code,
            ApiError::Service { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

/// Operations offered by the remote booking service.
///
/// Implementations perform exactly one round trip per call and never cache.
#[async_trait]
pub trait BookingService: Send + Sync + 'static {
    async fn search_buses(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, ApiError>;

    async fn book_ticket(&self, request: &BookingRequest) -> Result<BookingResponse, ApiError>;

    async fn my_bookings(&self, customer_phone: &str) -> Result<Vec<Booking>, ApiError>;

    async fn cancel_booking(&self, request: &CancelRequest) -> Result<CancelResponse, ApiError>;

    async fn districts(&self) -> Result<Vec<District>, ApiError>;

    async fn providers(&self) -> Result<Vec<BusProvider>, ApiError>;

    async fn providers_in_district(&self, district: &str) -> Result<Vec<BusProvider>, ApiError>;

    async fn provider_details(&self, name: &str) -> Result<ProviderDetails, ApiError>;

    async fn chat(&self, message: &str) -> Result<String, ApiError>;
}

// FastAPI-style error body; detail is usually a string but validation
// failures carry a list of objects
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

fn error_from_status(status: StatusCode, body: &str) -> ApiError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };

    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
        ApiError::Rejected {
            status_code: Some(status.as_u16()),
            message,
        }
    } else {
        ApiError::Service {
            status_code: status.as_u16(),
            message,
        }
    }
}

/// HTTP/JSON client for the booking service.
#[derive(Debug, Clone)]
pub struct HttpBookingService {
    client: reqwest::Client,
    base_url: Url,
    timeout_ms: u64,
}

impl HttpBookingService {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;

        let base_url = Url::parse(config.base_url.trim()).map_err(|e| {
            ClientError::ConfigError(format!("invalid base_url {}: {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::ConfigError(format!(
                "base_url {} cannot carry a path",
                config.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::InitError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            timeout_ms: config.timeout_ms,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // Appends percent-encoded path segments to the base URL
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Network(format!("invalid base url {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout_ms)
        } else {
            ApiError::Network(err.to_string())
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await.map_err(|e| {
            let err = self.transport_error(e);
            warn!(operation, error = %err, "request failed");
            err
        })?;

        let status = response.status();
        debug!(operation, status = %status, "response received");

        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if status.is_success() {
            return serde_json::from_str(&body)
                .map_err(|e| ApiError::Decode(format!("{operation}: {e}")));
        }

        let err = error_from_status(status, &body);
        warn!(operation, error = %err, "service returned an error");
        Err(err)
    }
}

#[async_trait]
impl BookingService for HttpBookingService {
    async fn search_buses(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, ApiError> {
        let url = self.endpoint(&["search-buses"])?;
        let response: SearchResponse = self
            .send("search_buses", self.client.post(url).json(request))
            .await?;
        Ok(response.results)
    }

    async fn book_ticket(&self, request: &BookingRequest) -> Result<BookingResponse, ApiError> {
        let url = self.endpoint(&["book-ticket"])?;
        self.send(
            "book_ticket",
            self.client
                .post(url)
                .header(IDEMPOTENCY_HEADER, request.idempotency_key.as_str())
                .json(request),
        )
        .await
    }

    async fn my_bookings(&self, customer_phone: &str) -> Result<Vec<Booking>, ApiError> {
        let url = self.endpoint(&["my-bookings", customer_phone])?;
        let response: BookingsResponse = self.send("my_bookings", self.client.get(url)).await?;
        Ok(response.bookings)
    }

    async fn cancel_booking(&self, request: &CancelRequest) -> Result<CancelResponse, ApiError> {
        let url = self.endpoint(&["cancel-booking"])?;
        self.send("cancel_booking", self.client.post(url).json(request))
            .await
    }

    async fn districts(&self) -> Result<Vec<District>, ApiError> {
        let url = self.endpoint(&["districts"])?;
        let response: DistrictsResponse = self.send("districts", self.client.get(url)).await?;
        Ok(response.districts)
    }

    async fn providers(&self) -> Result<Vec<BusProvider>, ApiError> {
        let url = self.endpoint(&["bus-providers"])?;
        let response: ProvidersResponse = self.send("providers", self.client.get(url)).await?;
        Ok(response.providers)
    }

    async fn providers_in_district(&self, district: &str) -> Result<Vec<BusProvider>, ApiError> {
        let url = self.endpoint(&["bus-providers", "district", district])?;
        let response: ProvidersResponse = self
            .send("providers_in_district", self.client.get(url))
            .await?;
        Ok(response.providers)
    }

    async fn provider_details(&self, name: &str) -> Result<ProviderDetails, ApiError> {
        let url = self.endpoint(&["bus-providers", name])?;
        self.send("provider_details", self.client.get(url)).await
    }

    async fn chat(&self, message: &str) -> Result<String, ApiError> {
        let url = self.endpoint(&["chat"])?;
        let request = ChatRequest {
            message: message.to_string(),
        };
        let response: ChatResponse = self.send("chat", self.client.post(url).json(&request)).await?;
        Ok(response.response)
    }
}
