use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use profile_service::field::encoded_image::guess_content_type;
use profile_service::field::InMemoryUpload;
use profile_service::resource::Page;
use profile_service::ServiceError;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::server::AppState;

/// Multipart field carrying the file on the image upload endpoint.
pub const UPLOAD_FIELD: &str = "upload";

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    limit: Option<usize>,
    #[serde(default)]
    offset: usize,
}


pub async fn list_profiles(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page>, ApiError> {
    let page = state.resource.list(query.limit, query.offset)?;
    Ok(Json(page))
}

pub async fn profile_schema(State(state): State<AppState>) -> Json<Value> {
    Json(state.resource.schema())
}

pub async fn create_profile(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let profile = state.resource.create(&payload)?;
    let body = state.resource.dehydrate(&profile, Some(&payload))?;
    let location = state.resource.detail_uri(profile.user);

    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(body)).into_response())
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    let profile = state.resource.get(id)?;
    Ok(Json(state.resource.dehydrate(&profile, None)?))
}

pub async fn put_profile(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let (profile, created) = state.resource.update(id, &payload, false)?;
    let body = state.resource.dehydrate(&profile, Some(&payload))?;

    if created {
        let location = state.resource.detail_uri(id);
        Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(body)).into_response())
    } else {
        Ok((StatusCode::OK, Json(body)).into_response())
    }
}

pub async fn patch_profile(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let (profile, _) = state.resource.update(id, &payload, true)?;
    let body = state.resource.dehydrate(&profile, Some(&payload))?;

    Ok((StatusCode::ACCEPTED, Json(body)).into_response())
}

pub async fn delete_profile(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state.resource.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /user_profiles/{id}/image/`: replaces the profile image with the
/// multipart `upload` file and points `Location` at the new image.
pub async fn upload_image(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    // the profile has to exist before the form is even looked at
    let profile = state.resource.lookup(id).map_err(gone)?;

    let multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let upload = read_upload(multipart).await?;

    let (_, url) = state.resource.replace_image(profile.user, upload).map_err(gone)?;

    Ok((StatusCode::CREATED, [(header::LOCATION, url)]).into_response())
}

fn gone(error: ServiceError) -> ApiError {
    match error {
        ServiceError::NotFound(id) => ApiError::Gone(id),
        other => other.into(),
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<InMemoryUpload, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::BadRequest(e.body_text()))? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let Some(file_name) = field.file_name().map(str::to_string) else {
            return Err(ApiError::BadRequest(format!("{UPLOAD_FIELD}: no file was submitted")));
        };
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| guess_content_type(&file_name));

        let data = field.bytes().await.map_err(|e| ApiError::BadRequest(e.body_text()))?;
        if data.is_empty() {
            return Err(ApiError::BadRequest(format!("{UPLOAD_FIELD}: the submitted file is empty")));
        }

        let upload = InMemoryUpload { name: file_name, content_type, data: data.to_vec() };
        if !upload.is_image() {
            return Err(ApiError::BadRequest(format!(
                "{UPLOAD_FIELD}: upload a valid image, the file was either not an image or corrupted"
            )));
        }

        tracing::debug!(name = %upload.name, content_type = %upload.content_type, bytes = upload.data.len(), "received image upload");
        return Ok(upload);
    }

    Err(ApiError::BadRequest(format!("{UPLOAD_FIELD}: this field is required")))
}
