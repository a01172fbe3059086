//! Media routes.
//!
//! Every route is scoped by a storage tag; the tag's configured driver
//! decides where the bytes live. Operations a driver does not offer
//! answer `403 FORBIDDEN`.

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use bytes::Bytes;
use mediakit_core::{Location, MediaFile};
use mediakit_shared::AppError;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::{AppState, error::ApiError};

/// Creates the media routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/media/{tag}", post(upload))
        .route("/media/{tag}/default", get(default_name))
        .route("/media/{tag}/url/{*name}", get(media_url))
        .route("/media/{tag}/retrieve/{*name}", get(retrieve))
        .route("/media/{tag}/download/{*name}", get(download))
        .route("/media/{tag}/object/{*name}", delete(remove))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response for a saved upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Tag the file was saved under.
    pub tag: String,
    /// Name to use for later lookups.
    pub stored_name: String,
    /// Filename sent by the client.
    pub original_filename: String,
    /// Whether the backend received every byte.
    pub complete: bool,
}

/// Parts pulled from an upload form.
struct UploadForm {
    filename: String,
    content: Bytes,
    upload_to: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut file = None;
    let mut upload_to = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                file = Some((filename, content));
            }
            Some("upload_to") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                upload_to = Some(text).filter(|t| !t.is_empty());
            }
            _ => {}
        }
    }

    let (filename, content) =
        file.ok_or_else(|| AppError::Validation("missing 'file' part".to_string()))?;
    Ok(UploadForm {
        filename,
        content,
        upload_to,
    })
}

fn file_response(file: MediaFile) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, file.content_disposition()),
        ],
        file.content,
    )
        .into_response()
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/media/{tag}`
/// Save a multipart `file`, optionally under `upload_to`.
async fn upload(
    State(state): State<AppState>,
    Path(tag): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_form(multipart).await?;
    let destination = form.upload_to.map(Location::from);

    let saved = state
        .media
        .save(&tag, &form.filename, form.content, destination.as_ref())
        .await?;

    info!(
        tag = %tag,
        stored_name = %saved.reference.stored_name,
        complete = saved.is_complete(),
        "Upload handled"
    );

    let complete = saved.is_complete();
    let reference = saved.reference;
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            tag: reference.tag,
            stored_name: reference.stored_name,
            original_filename: reference.original_filename,
            complete,
        }),
    ))
}

/// GET `/media/{tag}/url/{*name}`
async fn media_url(
    State(state): State<AppState>,
    Path((tag, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let url = state.media.url(&tag, &name).await?;
    Ok(Json(json!({ "media_url": url })))
}

/// GET `/media/{tag}/retrieve/{*name}`
async fn retrieve(
    State(state): State<AppState>,
    Path((tag, name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    Ok(file_response(state.media.retrieve(&tag, &name).await?))
}

/// GET `/media/{tag}/download/{*name}`
async fn download(
    State(state): State<AppState>,
    Path((tag, name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    Ok(file_response(state.media.download(&tag, &name).await?))
}

/// DELETE `/media/{tag}/object/{*name}`
async fn remove(
    State(state): State<AppState>,
    Path((tag, name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.media.delete(&tag, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/media/{tag}/default`
async fn default_name(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> impl IntoResponse {
    Json(json!({ "default": state.media.default_name(&tag) }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_router;
    use axum::{
        body::Body,
        http::{Request, header::CONTENT_TYPE},
    };
    use http_body_util::BodyExt;
    use mediakit_core::{DriverRegistry, MediaFacade};
    use mediakit_shared::{
        LocalOptions, MediaConfig, ResumableOptions, StorageOption, StorageOptions,
    };
    use rstest::rstest;
    use serde_json::Value;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "mediakit-test-boundary";

    fn app(dir: &TempDir) -> Router {
        let mut options = StorageOptions::new();
        options.insert(
            "docs".to_string(),
            StorageOption::Local(LocalOptions {
                name_uuid_len: Some(4),
                default: Some("defaults/blank.pdf".to_string()),
                ..LocalOptions::default()
            }),
        );
        options.insert(
            "videos".to_string(),
            StorageOption::Resumable(ResumableOptions::new("http://127.0.0.1:9/files/")),
        );
        let media = MediaConfig {
            root: dir.path().to_path_buf(),
            base_url: "https://cdn.example.com/media/".to_string(),
        };
        let registry = Arc::new(DriverRegistry::new(options, media));
        create_router(AppState::new(MediaFacade::new(registry)))
    }

    fn multipart_body(upload_to: Option<&str>, file: Option<(&str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(upload_to) = upload_to {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"upload_to\"\r\n\r\n{upload_to}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((filename, content)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(tag: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/media/{tag}"))
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn save(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(upload_request(
                "docs",
                multipart_body(Some("uploads"), Some(("report.pdf", &b"%PDF-1.7"[..]))),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["tag"], "docs");
        assert_eq!(body["original_filename"], "report.pdf");
        assert_eq!(body["complete"], true);
        body["stored_name"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir).oneshot(get("/api/v1/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_upload_then_url() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        let stored_name = save(&app).await;

        assert!(stored_name.starts_with("uploads/"));
        assert!(stored_name.ends_with("report.pdf"));
        assert!(dir.path().join(&stored_name).exists());

        let response = app
            .oneshot(get(&format!("/api/v1/media/docs/url/{stored_name}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["media_url"],
            format!("https://cdn.example.com/media/{stored_name}")
        );
    }

    #[tokio::test]
    async fn test_retrieve_and_download_dispositions() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        let stored_name = save(&app).await;
        let leaf = stored_name.rsplit('/').next().unwrap().to_string();

        for (route, disposition) in [("retrieve", "inline"), ("download", "attachment")] {
            let response = app
                .clone()
                .oneshot(get(&format!("/api/v1/media/docs/{route}/{stored_name}")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                response.headers()[header::CONTENT_DISPOSITION],
                format!("{disposition}; filename=\"{leaf}\"").as_str()
            );
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(bytes.as_ref(), b"%PDF-1.7");
        }
    }

    #[tokio::test]
    async fn test_delete_then_retrieve_is_not_found() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        let stored_name = save(&app).await;

        let delete_request = || {
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/media/docs/object/{stored_name}"))
                .body(Body::empty())
                .unwrap()
        };
        let response = app.clone().oneshot(delete_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .clone()
            .oneshot(get(&format!("/api/v1/media/docs/retrieve/{stored_name}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "NOT_FOUND");

        let response = app.oneshot(delete_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[rstest]
    #[case("url")]
    #[case("retrieve")]
    #[case("download")]
    #[case("default")]
    #[case("object")]
    #[tokio::test]
    async fn test_delete_name_under_route_keyword(#[case] upload_to: &str) {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);

        let response = app
            .clone()
            .oneshot(upload_request(
                "docs",
                multipart_body(Some(upload_to), Some(("cat.png", &b"png"[..]))),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let stored_name = json_body(response).await["stored_name"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(stored_name.starts_with(&format!("{upload_to}/")));

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/v1/media/docs/object/{stored_name}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(!dir.path().join(&stored_name).exists());
    }

    #[tokio::test]
    async fn test_unsupported_operation_is_forbidden() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir)
            .oneshot(get("/api/v1/media/videos/url/clip.mp4"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["error"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_upload_without_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir)
            .oneshot(upload_request("docs", multipart_body(Some("uploads"), None)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_escaping_upload_to_is_rejected() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir)
            .oneshot(upload_request(
                "docs",
                multipart_body(Some("../../etc"), Some(("passwd", &b"x"[..]))),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_default_name() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);

        let response = app
            .clone()
            .oneshot(get("/api/v1/media/docs/default"))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["default"], "defaults/blank.pdf");

        let response = app
            .oneshot(get("/api/v1/media/other/default"))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["default"], Value::Null);
    }
}
