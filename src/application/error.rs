use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::{reviews::ReviewError, upstream::OriginError};
use crate::{cache::CacheError, infra::error::InfraError};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        Self {
            status,
            public_message,
            report: ErrorReport::from_error(source, status, error),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Reviews(#[from] ReviewError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Cache(
                CacheError::InvalidKey { .. }
                | CacheError::UpstreamFetchFailed {
                    source: OriginError::InvalidId { .. },
                    ..
                },
            ) => StatusCode::BAD_REQUEST,
            AppError::Cache(CacheError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Cache(CacheError::UpstreamFetchFailed { .. }) => StatusCode::BAD_GATEWAY,
            AppError::Cache(CacheError::CorruptEntry { .. } | CacheError::Encode { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Infra(_) | AppError::Reviews(_) | AppError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn presentation_message(&self) -> &'static str {
        match self {
            AppError::Cache(
                CacheError::InvalidKey { .. }
                | CacheError::UpstreamFetchFailed {
                    source: OriginError::InvalidId { .. },
                    ..
                },
            ) => "Request could not be processed",
            AppError::Cache(CacheError::Unavailable(_)) => "Service temporarily unavailable",
            AppError::Cache(CacheError::UpstreamFetchFailed { .. }) => {
                "Content source unavailable"
            }
            AppError::Cache(CacheError::CorruptEntry { .. } | CacheError::Encode { .. })
            | AppError::Infra(_)
            | AppError::Reviews(_)
            | AppError::Unexpected(_) => "Unexpected error occurred",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.presentation_message();
        let report = ErrorReport::from_error("application::error::AppError", status, &self);
        let mut response = (status, message).into_response();
        report.attach(&mut response);
        response
    }
}

impl From<AppError> for HttpError {
    fn from(error: AppError) -> Self {
        HttpError::from_error(
            "application::error::AppError",
            error.status_code(),
            error.presentation_message(),
            &error,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_failure_maps_to_bad_gateway_with_chain() {
        let error = AppError::from(CacheError::UpstreamFetchFailed {
            key: "doc".to_string(),
            source: OriginError::Status {
                status: 500,
                body: "boom".to_string(),
            },
        });
        assert_eq!(error.status_code(), StatusCode::BAD_GATEWAY);

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.messages.len(), 2);
        assert!(report.messages[1].contains("boom"));
    }

    #[test]
    fn startup_failures_are_internal_errors() {
        let error = AppError::from(InfraError::telemetry("subscriber already set"));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.presentation_message(), "Unexpected error occurred");

        let error = AppError::unexpected("server task failed");
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_key_is_a_client_error() {
        let error = AppError::from(CacheError::InvalidKey { part: "id" });
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn ids_the_origin_refuses_are_client_errors() {
        let error = AppError::from(CacheError::UpstreamFetchFailed {
            key: "hello".to_string(),
            source: OriginError::InvalidId {
                id: "hello".to_string(),
            },
        });
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(error.presentation_message(), "Request could not be processed");
    }
}
