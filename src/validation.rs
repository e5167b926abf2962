// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request bodies and the single validate-and-sanitize entry point.
//!
//! Field rules are declared with `validator` derives. Rules the derive cannot
//! express (quarter-hours, document ids) live in [`Sanitize::check`]. Free-text
//! fields are HTML-escaped after they pass validation.

use crate::error::AppError;
use axum::{
    extract::{FromRequest, Request},
    Json,
};
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationErrors};

/// One failed field, reported to clients in `error.exn`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Escape text for safe inclusion in HTML.
pub fn escape(text: &str) -> String {
    html_escape::encode_safe(text).into_owned()
}

/// Post-validation hooks for request bodies.
pub trait Sanitize {
    /// Checks beyond the derived field rules.
    fn check(&self) -> Vec<FieldError> {
        Vec::new()
    }

    /// Escape free-text fields in place.
    fn sanitize(&mut self) {}
}

/// Validate a request body and escape its free-text fields.
pub fn validate_and_sanitize<T>(mut value: T) -> Result<T, Vec<FieldError>>
where
    T: Validate + Sanitize,
{
    let mut errors = match value.validate() {
        Ok(()) => Vec::new(),
        Err(e) => field_errors(&e),
    };
    errors.extend(value.check());

    if !errors.is_empty() {
        return Err(errors);
    }

    value.sanitize();
    Ok(value)
}

fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = camel_case(&field);
            errs.iter().map(move |e| FieldError {
                field: field.clone(),
                message: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            })
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

/// Struct field names are reported the way clients send them.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// JSON body extractor that runs [`validate_and_sanitize`].
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Sanitize,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            tracing::debug!(error = %rejection.body_text(), "Rejected request body");
            AppError::BadRequest(rejection.body_text())
        })?;

        validate_and_sanitize(value)
            .map(ValidatedJson)
            .map_err(AppError::Validation)
    }
}

// ─── Field Helpers ───────────────────────────────────────────

/// Accepts `YYYY-MM-DD` or `M/D/YYYY`.
pub fn parse_trip_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%m/%d/%Y"))
        .ok()
}

fn deserialize_trip_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_trip_date(&text).ok_or_else(|| {
        serde::de::Error::custom(format!(
            "invalid tripDate '{}', expected YYYY-MM-DD or M/D/YYYY",
            text
        ))
    })
}

pub fn is_quarter_hour(minute: u8) -> bool {
    matches!(minute, 0 | 15 | 30 | 45)
}

/// Document ids are generated by the store: short, URL-safe tokens.
pub fn is_document_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn check_quarter_hour(minute: u8) -> Vec<FieldError> {
    if is_quarter_hour(minute) {
        Vec::new()
    } else {
        vec![FieldError::new(
            "tripQuarterHour",
            "must be one of 0, 15, 30, 45",
        )]
    }
}

// ─── Trip Requests ───────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TripCreateRequest {
    pub max_other_members: u32,
    #[serde(deserialize_with = "deserialize_trip_date")]
    pub trip_date: NaiveDate,
    #[validate(range(max = 23, message = "must be between 0 and 23"))]
    pub trip_hour: u8,
    pub trip_quarter_hour: u8,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub trip_name: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub college: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub airport: String,
}

impl Sanitize for TripCreateRequest {
    fn check(&self) -> Vec<FieldError> {
        check_quarter_hour(self.trip_quarter_hour)
    }

    fn sanitize(&mut self) {
        self.trip_name = escape(&self.trip_name);
        self.college = escape(&self.college);
        self.airport = escape(&self.airport);
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TripSearchRequest {
    #[serde(deserialize_with = "deserialize_trip_date")]
    pub trip_date: NaiveDate,
    #[validate(range(max = 23, message = "must be between 0 and 23"))]
    pub trip_hour: u8,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub college: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub airport: String,
}

impl Sanitize for TripSearchRequest {
    fn sanitize(&mut self) {
        self.college = escape(&self.college);
        self.airport = escape(&self.airport);
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinTripRequest {
    pub trip_id: String,
}

impl Sanitize for JoinTripRequest {
    fn check(&self) -> Vec<FieldError> {
        if is_document_id(&self.trip_id) {
            Vec::new()
        } else {
            vec![FieldError::new("tripId", "not a valid trip id")]
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GetMultipleRequest {
    pub trip_ids: Vec<String>,
}

impl Sanitize for GetMultipleRequest {
    fn check(&self) -> Vec<FieldError> {
        self.trip_ids
            .iter()
            .filter(|id| !is_document_id(id))
            .map(|id| FieldError {
                field: "tripIds".to_string(),
                message: format!("not a valid trip id: {}", escape(id)),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    #[serde(deserialize_with = "deserialize_trip_date")]
    pub trip_date: NaiveDate,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub airport: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub college: String,
    #[validate(range(max = 23, message = "must be between 0 and 23"))]
    pub trip_hour: u8,
    pub trip_quarter_hour: u8,
}

impl Sanitize for SubscribeRequest {
    fn check(&self) -> Vec<FieldError> {
        check_quarter_hour(self.trip_quarter_hour)
    }

    fn sanitize(&mut self) {
        self.airport = escape(&self.airport);
        self.college = escape(&self.college);
    }
}

// ─── User Requests ───────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserCreateRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub last_name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
}

impl Sanitize for UserCreateRequest {
    fn sanitize(&mut self) {
        self.first_name = escape(&self.first_name);
        self.last_name = escape(&self.last_name);
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserLoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
}

impl Sanitize for UserLoginRequest {}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(json: serde_json::Value) -> TripCreateRequest {
        serde_json::from_value(json).unwrap()
    }

    fn valid_trip() -> serde_json::Value {
        serde_json::json!({
            "maxOtherMembers": 3,
            "tripDate": "12/18/2026",
            "tripHour": 9,
            "tripQuarterHour": 30,
            "tripName": "Finals <done>",
            "college": "Tufts",
            "airport": "BOS"
        })
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("<script>alert('x') & \"y\"</script>"),
            "&lt;script&gt;alert(&#x27;x&#x27;) &amp; &quot;y&quot;&lt;&#x2F;script&gt;"
        );
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_parse_trip_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 12, 18);
        assert_eq!(parse_trip_date("2026-12-18"), expected);
        assert_eq!(parse_trip_date("12/18/2026"), expected);
        assert_eq!(parse_trip_date("1/2/2027"), NaiveDate::from_ymd_opt(2027, 1, 2));
        assert_eq!(parse_trip_date("18.12.2026"), None);
        assert_eq!(parse_trip_date("13/40/2026"), None);
    }

    #[test]
    fn test_valid_trip_is_sanitized() {
        let request = validate_and_sanitize(create_request(valid_trip())).unwrap();
        assert_eq!(request.trip_name, "Finals &lt;done&gt;");
        assert_eq!(request.trip_date, NaiveDate::from_ymd_opt(2026, 12, 18).unwrap());
    }

    #[test]
    fn test_quarter_hour_and_hour_ranges() {
        let mut json = valid_trip();
        json["tripQuarterHour"] = serde_json::json!(20);
        json["tripHour"] = serde_json::json!(24);
        json["tripName"] = serde_json::json!("");

        let errors = validate_and_sanitize(create_request(json)).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"tripHour"));
        assert!(fields.contains(&"tripName"));
        assert!(fields.contains(&"tripQuarterHour"));
    }

    #[test]
    fn test_negative_capacity_fails_to_parse() {
        let mut json = valid_trip();
        json["maxOtherMembers"] = serde_json::json!(-1);
        assert!(serde_json::from_value::<TripCreateRequest>(json).is_err());
    }

    #[test]
    fn test_bad_date_fails_to_parse() {
        let mut json = valid_trip();
        json["tripDate"] = serde_json::json!("next tuesday");
        assert!(serde_json::from_value::<TripCreateRequest>(json).is_err());
    }

    #[test]
    fn test_get_multiple_rejects_bad_ids() {
        let request = GetMultipleRequest {
            trip_ids: vec!["abc123".to_string(), "../etc".to_string()],
        };
        let errors = validate_and_sanitize(request).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "tripIds");
    }

    #[test]
    fn test_user_create_requires_email() {
        let request = UserCreateRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "not-an-email".to_string(),
            password: "pw".to_string(),
        };
        let errors = validate_and_sanitize(request).unwrap_err();
        assert_eq!(errors, vec![FieldError::new("email", "must be a valid email address")]);
    }

    #[test]
    fn test_camel_case_field_names() {
        assert_eq!(camel_case("trip_quarter_hour"), "tripQuarterHour");
        assert_eq!(camel_case("email"), "email");
    }
}
