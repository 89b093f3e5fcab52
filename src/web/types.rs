//! Most of the structs in `web` module and their implementations live here.
//! Includes structs that need to be validated, their parsing implementations and tests for those

use lazy_regex::regex_is_match;
use serde::{de::Error as _, Serialize};
use serde_json::Value;

// ###################################
// ->   REQUESTS
// ###################################

/// The decoded body of `POST /interest`.
///
/// Decoding is loose on purpose: any JSON value is accepted, `email` is only picked up if the
/// value is an object whose `email` field is a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestRequest {
    pub email: Option<String>,
}

impl InterestRequest {
    /// Fails on malformed JSON and on a literal `null` body, which has no fields to read.
    pub fn decode(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(body)?;
        if value.is_null() {
            return Err(serde_json::Error::custom("request body is null"));
        }

        let email = value
            .get("email")
            .and_then(Value::as_str)
            .map(str::to_owned);

        Ok(Self { email })
    }

    /// Validates the decoded email field.
    pub fn valid_email(self) -> Result<ValidEmail, DataParsingError> {
        let email = self.email.ok_or(DataParsingError::EmailMissing)?;
        ValidEmail::parse(email)
    }
}

/// Validated, normalized email: trimmed, lowercase, `local@domain.tld` shaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidEmail(String);

impl AsRef<str> for ValidEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ValidEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ValidEmail {
    pub fn parse<S>(value: S) -> Result<Self, DataParsingError>
    where
        S: AsRef<str>,
    {
        let value = value.as_ref();
        if value.is_empty() {
            return Err(DataParsingError::EmailMissing);
        }

        let normalized = value.trim().to_lowercase();
        if regex_is_match!(r"^[^\s@]+@[^\s@]+\.[^\s@]+$", &normalized) {
            Ok(ValidEmail(normalized))
        } else {
            Err(DataParsingError::EmailInvalid)
        }
    }
}

// ###################################
// ->   RESPONSES
// ###################################

/// 201 body for a new signup, 200 body (with `already_exists`) for a repeated one.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestResponse {
    pub message: &'static str,
    pub email: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_exists: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CountResponse {
    Raw(RawCount),
    Capacity(CapacityCount),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCount {
    pub total_signups: u64,
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityCount {
    pub spots_remaining: u64,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub region: String,
}

// ###################################
// ->   ERROR
// ###################################
/// Validation failures. The display strings are sent to the client as-is.
#[derive(Debug, thiserror::Error)]
pub enum DataParsingError {
    #[error("Email is required")]
    BodyMissing,
    #[error("Valid email is required")]
    EmailMissing,
    #[error("Invalid email format")]
    EmailInvalid,
}
