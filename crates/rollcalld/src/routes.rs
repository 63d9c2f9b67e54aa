use crate::error::{JsonError, ServiceError};
use crate::workflow::{AttendanceEntry, Service};
use axum::async_trait;
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Request, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use rollcall_core::MatchOutcome;
use serde::Serialize;
use std::collections::HashMap;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Registration posts several base64 photos in one form.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// HTTP surface of the attendance service.
pub fn router(service: Service) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/upload", post(upload))
        .route("/attendance", get(attendance))
        .route("/mark-absent", post(mark_absent))
        .route("/clearall", get(clear_all))
        .route("/healthcheck", get(healthcheck))
        .route("/:folder/*path", get(asset))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Text fields of either a urlencoded or a multipart form.
///
/// Browser clients post `FormData` (multipart); scripts tend to urlencode.
struct FormFields(HashMap<String, String>);

impl FormFields {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for FormFields {
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !multipart {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(FormFields(fields));
        }

        let mut parts = Multipart::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let mut fields = HashMap::new();
        while let Some(field) = parts.next_field().await.map_err(IntoResponse::into_response)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let value = field.text().await.map_err(IntoResponse::into_response)?;
            fields.insert(name, value);
        }
        Ok(FormFields(fields))
    }
}

async fn register(State(service): State<Service>, form: FormFields) -> Result<String, ServiceError> {
    service.register(&form.0).await
}

#[derive(Serialize)]
struct UploadResponse {
    recognized_names: Vec<MatchOutcome>,
}

async fn upload(
    State(service): State<Service>,
    form: FormFields,
) -> Result<Json<UploadResponse>, ServiceError> {
    let recognized_names = service.recognize(form.get("image_data")).await?;
    Ok(Json(UploadResponse { recognized_names }))
}

async fn attendance(State(service): State<Service>) -> Result<Json<Vec<AttendanceEntry>>, JsonError> {
    Ok(Json(service.attendance().await?))
}

async fn mark_absent(
    State(service): State<Service>,
    form: FormFields,
) -> Result<Json<serde_json::Value>, JsonError> {
    service.mark_absent(form.get("student_name")).await?;
    Ok(Json(serde_json::json!({ "message": "Attendance updated successfully" })))
}

async fn clear_all(State(service): State<Service>) -> Result<Json<serde_json::Value>, JsonError> {
    service.clear_all().await?;
    Ok(Json(serde_json::json!({
        "message": "Attendance data initialized or cleared successfully"
    })))
}

async fn healthcheck() -> &'static str {
    "OK"
}

/// Raw roster file, e.g. a student's registration photo.
async fn asset(
    State(service): State<Service>,
    Path((folder, path)): Path<(String, String)>,
) -> Result<Response, ServiceError> {
    let file = service.asset(&folder, &path)?;
    let bytes = tokio::fs::read(&file)
        .await
        .map_err(|e| ServiceError::Storage(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, content_type(&file))], bytes).into_response())
}

fn content_type(path: &std::path::Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
