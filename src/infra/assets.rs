//! Serves relocated image assets from the local asset directory.

use std::{io::ErrorKind, path::PathBuf};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use mime_guess::Mime;
use tracing::warn;

use crate::application::error::ErrorReport;

const SOURCE: &str = "infra::assets::serve_image";

#[derive(Debug, Clone)]
pub struct AssetDirectory {
    root: PathBuf,
}

impl AssetDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a request path onto a file directly inside the root.
    fn resolve(&self, requested: &str) -> Option<PathBuf> {
        let candidate = requested.trim_start_matches('/');
        if candidate.is_empty()
            || candidate.contains("..")
            || candidate.contains(['/', '\\'])
        {
            return None;
        }
        Some(self.root.join(candidate))
    }
}

/// `GET /images/{file}`.
pub async fn serve_image(
    State(directory): State<AssetDirectory>,
    Path(file): Path<String>,
) -> Response {
    let Some(path) = directory.resolve(&file) else {
        return rejected_response(StatusCode::NOT_FOUND, "Asset request rejected");
    };

    match tokio::fs::read(&path).await {
        Ok(contents) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            build_response(Bytes::from(contents), mime)
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            rejected_response(StatusCode::NOT_FOUND, "Asset not found")
        }
        Err(err) => {
            warn!(
                target = "quaderno::infra::assets",
                path = %path.display(),
                error = %err,
                "Failed to read asset"
            );
            rejected_response(StatusCode::INTERNAL_SERVER_ERROR, "Asset could not be read")
        }
    }
}

fn rejected_response(status: StatusCode, message: &'static str) -> Response {
    let mut response = status.into_response();
    ErrorReport::from_message(SOURCE, status, message).attach(&mut response);
    response
}

fn build_response(bytes: Bytes, mime: Mime) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=86400"),
    );

    response
}
