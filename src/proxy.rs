use std::sync::Arc;

use axum::{
    extract::{Path, RawQuery, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::app::backend::{BackendClient, Credentials};

/// Backend routes the browser hits directly: archive artifacts and avatars.
pub fn routes<S>(backend: Arc<BackendClient>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/api/v1/archives/:id", get(archive))
        .route("/api/avatar/:id", get(avatar))
        .with_state(backend)
}

fn archive_upstream(id: i64, query: Option<&str>) -> String {
    match query {
        Some(query) if !query.is_empty() => format!("/api/v1/archives/{id}?{query}"),
        _ => format!("/api/v1/archives/{id}"),
    }
}

async fn archive(
    State(backend): State<Arc<BackendClient>>,
    Path(id): Path<i64>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    relay(&backend, &archive_upstream(id, query.as_deref()), &headers).await
}

async fn avatar(
    State(backend): State<Arc<BackendClient>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    relay(&backend, &format!("/api/avatar/{id}"), &headers).await
}

async fn relay(backend: &BackendClient, path: &str, headers: &HeaderMap) -> Response {
    let credentials = Credentials::from_headers(headers);

    match backend.download_file(path, &credentials).await {
        Ok(asset) => {
            if !asset.status.is_success() {
                tracing::debug!(path, status = %asset.status, "backend refused asset");
            }

            let mut response = (asset.status, asset.body).into_response();
            if let Some(content_type) = asset.content_type {
                response.headers_mut().insert(CONTENT_TYPE, content_type);
            }
            response
        }
        Err(err) => {
            tracing::error!(path, %err, "asset relay failed");
            (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_query_is_forwarded() {
        assert_eq!(archive_upstream(3, Some("format=2")), "/api/v1/archives/3?format=2");
        assert_eq!(archive_upstream(3, Some("")), "/api/v1/archives/3");
        assert_eq!(archive_upstream(3, None), "/api/v1/archives/3");
    }
}
