//! # Error Handling
//!
//! Filters fail in two distinct ways and callers must be able to tell them apart:
//!
//! - **Configuration errors** are programmer mistakes (a filter without a title, a
//!   declaration naming a field that does not exist). They are raised while the
//!   filters for a request are being built and are never recovered from.
//! - **Invalid lookups** come from the request: a query-string value that cannot be
//!   coerced into the filtered field's type. They map to `400 Bad Request`.
//!
//! An empty result is *not* an error. A malformed parameter is.
//!
//! Both convert into an axum response. Internal details are logged through
//! `tracing` and never sent to clients:
//!
//! ```rust,ignore
//! async fn list(FullPath(path): FullPath) -> Result<Json<FilterContext>, FilterError> {
//!     let filtered = view.filter_collection(&path, &catalog, &messages)?;
//!     Ok(Json(view.context(&path, &filtered.resolution)))
//! }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Failure reported by a [`Collection`](crate::collection::Collection) or
/// [`ModelCatalog`](crate::collection::ModelCatalog) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// The catalog has no model with this name
    #[error("unknown model '{0}'")]
    UnknownModel(String),
    /// The model has no field with this name
    #[error("unknown field '{0}'")]
    UnknownField(String),
    /// The backing store rejected the query
    #[error("query failed: {0}")]
    Query(String),
}

/// Errors raised while building or applying list filters.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A filter or declaration is misconfigured. Raised at construction.
    #[error("improperly configured: {message}")]
    Configuration {
        /// Description of the mistake, naming the offending filter
        message: String,
    },

    /// A request parameter could not be turned into a lookup.
    #[error("incorrect lookup parameter '{parameter}': {reason}")]
    InvalidLookup {
        /// Query-string key that carried the bad value
        parameter: String,
        /// Why the value was rejected
        reason: String,
    },

    /// The data source failed outside of narrowing.
    #[error(transparent)]
    Collection(#[from] CollectionError),
}

impl FilterError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid-lookup error for `parameter`
    pub fn invalid_lookup(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLookup {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status this error maps to
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidLookup { .. } => StatusCode::BAD_REQUEST,
            Self::Configuration { .. } | Self::Collection(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client
    fn user_message(&self) -> String {
        match self {
            Self::InvalidLookup { .. } => self.to_string(),
            Self::Configuration { .. } | Self::Collection(_) => {
                "An internal error occurred".to_string()
            }
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Configuration { message } => {
                tracing::error!(details = %message, "List filter misconfigured");
            }
            Self::Collection(err) => {
                tracing::error!(error = %err, "List filter data source failed");
            }
            Self::InvalidLookup { parameter, reason } => {
                tracing::debug!(parameter = %parameter, reason = %reason, "Rejected lookup parameter");
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for FilterError {
    fn into_response(self) -> Response {
        self.log_internal();
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_lookup_is_bad_request() {
        let err = FilterError::invalid_lookup("price__exact", "'abc' is not an integer");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.user_message(),
            "incorrect lookup parameter 'price__exact': 'abc' is not an integer"
        );
    }

    #[test]
    fn test_configuration_error_is_sanitized() {
        let err = FilterError::configuration("filter 'StatusFilter' does not specify a title");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "An internal error occurred");
        assert!(err.to_string().contains("StatusFilter"));
    }

    #[test]
    fn test_collection_error_conversion() {
        let err: FilterError = CollectionError::UnknownModel("Widget".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "unknown model 'Widget'");
    }

    #[test]
    fn test_into_response_status() {
        let response = FilterError::invalid_lookup("id", "bad").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = FilterError::configuration("missing title").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
