//! Conversions from external infrastructure errors into domain errors.

use fieldcrm_domain::FieldCrmError;
use reqwest::header::InvalidHeaderValue;
use reqwest::Error as HttpError;
use url::ParseError as UrlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub FieldCrmError);

impl From<InfraError> for FieldCrmError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<FieldCrmError> for InfraError {
    fn from(value: FieldCrmError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoFieldCrmError {
    fn into_fieldcrm(self) -> FieldCrmError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → FieldCrmError */
/* -------------------------------------------------------------------------- */

// Timeouts never reach this conversion: `HttpClient::send` maps them to
// `FieldCrmError::Timeout` with the configured duration first.
impl IntoFieldCrmError for HttpError {
    fn into_fieldcrm(self) -> FieldCrmError {
        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return FieldCrmError::Network(format!("HTTP connection failure: {self}"));
        }

        if self.is_builder() {
            return FieldCrmError::Config(format!("invalid HTTP request: {self}"));
        }

        FieldCrmError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_fieldcrm())
    }
}

/* -------------------------------------------------------------------------- */
/* url::ParseError → FieldCrmError */
/* -------------------------------------------------------------------------- */

impl IntoFieldCrmError for UrlError {
    fn into_fieldcrm(self) -> FieldCrmError {
        FieldCrmError::Config(format!("invalid request URL: {self}"))
    }
}

impl From<UrlError> for InfraError {
    fn from(value: UrlError) -> Self {
        InfraError(value.into_fieldcrm())
    }
}

/* -------------------------------------------------------------------------- */
/* InvalidHeaderValue → FieldCrmError */
/* -------------------------------------------------------------------------- */

impl IntoFieldCrmError for InvalidHeaderValue {
    fn into_fieldcrm(self) -> FieldCrmError {
        FieldCrmError::InvalidInput(format!("header value is not valid: {self}"))
    }
}

impl From<InvalidHeaderValue> for InfraError {
    fn from(value: InvalidHeaderValue) -> Self {
        InfraError(value.into_fieldcrm())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
