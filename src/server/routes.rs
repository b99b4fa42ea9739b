use axum::{
    Json,
    extract::{Multipart, State, multipart::{MultipartError, MultipartRejection}},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::server::AppState;
use super::types::{ModelHealthResponse, PingResponse};
use crate::classifier::ClassificationResult;
use crate::error::EMPTY_INPUT_MESSAGE;
use crate::resources::CLASSIFICATION_FRONTEND;

/// Frontend page with its API base URL still pointing at the dev server.
const FRONTEND_HTML: &str =
    include_str!("../../resources/Frontend/StoolClassificationFrontend.html");
const FRONTEND_PLACEHOLDER: &str = "http://localhost:5001";

/// Multipart field names accepted for the uploaded image.
pub const IMAGE_FIELDS: [&str; 2] = ["imageFile", "image_file"];

/// Builds the externally visible base URL of this service.
///
/// Prefers `X-Forwarded-Host` over `Host` and appends `X-Forwarded-Prefix`.
/// The scheme is always https so the page never issues mixed-content
/// requests behind a TLS-terminating proxy.
pub fn public_base_url(headers: &HeaderMap) -> String {
    let host = header_str(headers, "x-forwarded-host")
        .or_else(|| header_str(headers, header::HOST.as_str()))
        .unwrap_or("localhost");
    let prefix = header_str(headers, "x-forwarded-prefix").unwrap_or("");

    format!("https://{}{}", host, prefix.trim_end_matches('/'))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Serves the upload page
pub async fn frontend(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let base = match &state.public_url {
        Some(url) => url.trim_end_matches('/').to_string(),
        None => public_base_url(&headers),
    };
    info!("Serving frontend for {}", base);
    (
        [(header::CONTENT_TYPE, CLASSIFICATION_FRONTEND.content_type())],
        FRONTEND_HTML.replace(FRONTEND_PLACEHOLDER, &base),
    )
}

pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse::now())
}

/// Reports whether the model has been loaded yet
pub async fn model_health(State(state): State<AppState>) -> Json<ModelHealthResponse> {
    let model = state.classifier.loader().current();
    Json(ModelHealthResponse {
        loaded: model.is_some(),
        loaded_at: model.map(|m| m.loaded_at()),
    })
}

/// Classifies the uploaded image.
///
/// Classification outcomes, including validation failures, are returned
/// with status 200 and the result body. Only a malformed or oversized
/// multipart stream is answered with a non-200 status.
pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let request_id = Uuid::new_v4();
    info!(%request_id, "Predict endpoint called");

    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            warn!(%request_id, "Predict request without multipart body: {}", rejection);
            return (StatusCode::OK, Json(ClassificationResult::error(EMPTY_INPUT_MESSAGE)));
        }
    };

    let image = match take_image_field(multipart).await {
        Ok(image) => image,
        Err(e) => {
            error!(%request_id, "Failed to read upload: {}", e);
            return (e.status(), Json(ClassificationResult::error(e.body_text())));
        }
    };

    let Some(image) = image else {
        warn!(%request_id, "No image field in upload");
        return (StatusCode::OK, Json(ClassificationResult::error(EMPTY_INPUT_MESSAGE)));
    };

    let classifier = state.classifier.clone();
    let result = tokio::task::spawn_blocking(move || classifier.classify(&image)).await;

    match result {
        Ok(result) => {
            info!(%request_id, error = result.is_error(), "Predict finished");
            (StatusCode::OK, Json(result))
        }
        Err(e) => {
            error!(%request_id, "Classification task failed: {}", e);
            (
                StatusCode::OK,
                Json(ClassificationResult::error("Classification failed: internal error")),
            )
        }
    }
}

/// Returns the bytes of the first image field, skipping unrelated fields.
async fn take_image_field(mut multipart: Multipart) -> Result<Option<Vec<u8>>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        let is_image = field
            .name()
            .map(|name| IMAGE_FIELDS.contains(&name))
            .unwrap_or(false);
        if is_image {
            return Ok(Some(field.bytes().await?.to_vec()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_public_url_from_forwarded_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("internal:5001"));
        headers.insert("x-forwarded-host", HeaderValue::from_static("stool.example.org"));
        headers.insert("x-forwarded-prefix", HeaderValue::from_static("/classify/"));

        assert_eq!(public_base_url(&headers), "https://stool.example.org/classify");
    }

    #[test]
    fn test_public_url_falls_back_to_host() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("127.0.0.1:8080"));
        assert_eq!(public_base_url(&headers), "https://127.0.0.1:8080");

        assert_eq!(public_base_url(&HeaderMap::new()), "https://localhost");
    }

    #[test]
    fn test_frontend_contains_placeholder() {
        assert!(FRONTEND_HTML.contains(FRONTEND_PLACEHOLDER));
        assert!(FRONTEND_HTML.contains("imageFile"));
    }
}
