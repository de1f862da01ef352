// Client-side checks run before any request leaves the process
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::District;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid phone number: {0} (expected 11 digits starting with 01)")]
    InvalidPhone(String),

    #[error("Travel date {date} is before today ({today})")]
    DateInPast { date: NaiveDate, today: NaiveDate },

    #[error("Maximum price must be positive")]
    NonPositiveMaxPrice,

    #[error("Unknown district: {0}")]
    UnknownDistrict(String),
}

pub const PHONE_PREFIX: &str = "01";
pub const PHONE_LENGTH: usize = 11;

pub fn require<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed)
}

/// Shape check only: 11 ASCII digits with a leading "01". No checksum.
pub fn phone(value: &str) -> Result<&str, ValidationError> {
    let phone = require("customer_phone", value)?;
    let well_formed = phone.len() == PHONE_LENGTH
        && phone.starts_with(PHONE_PREFIX)
        && phone.chars().all(|c| c.is_ascii_digit());

    if !well_formed {
        return Err(ValidationError::InvalidPhone(phone.to_string()));
    }
    Ok(phone)
}

pub fn travel_date(date: NaiveDate, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    if date < today {
        return Err(ValidationError::DateInPast { date, today });
    }
    Ok(date)
}

pub fn max_price(value: Option<u32>) -> Result<Option<u32>, ValidationError> {
    match value {
        Some(0) => Err(ValidationError::NonPositiveMaxPrice),
        other => Ok(other),
    }
}

pub fn known_district<'a>(name: &'a str, districts: &[District]) -> Result<&'a str, ValidationError> {
    if districts.iter().any(|d| d.name == name) {
        Ok(name)
    } else {
        Err(ValidationError::UnknownDistrict(name.to_string()))
    }
}
