//! Custom Extractors
//!
//! Axum extractors for the authenticated caller, validated bodies and query
//! strings, snowflake path ids and multipart uploads. Every rejection is an
//! [`AppError`] so it renders as the standard envelope.

use std::collections::HashMap;

use axum::{
    extract::{FromRequest, FromRequestParts, Multipart, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::application::dto::request::UploadedFile;
use crate::shared::error::AppError;
use crate::shared::sanitize::Sanitize;
use crate::shared::validation::validation_error;

pub use crate::presentation::middleware::auth::AuthUser;

// ============================================================================
// Authentication
// ============================================================================

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(AppError::not_authenticated)
    }
}

/// The caller on routes behind optional authentication.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.id)
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(parts.extensions.get::<AuthUser>().cloned()))
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Run validation, then sanitise the accepted value.
///
/// The sanitised value is validated once more: escaping can lengthen text
/// past a limit and stripping can empty a required field.
pub fn validated<T: Validate + Sanitize>(mut value: T) -> Result<T, AppError> {
    value.validate().map_err(validation_error)?;
    value.sanitize();
    value.validate().map_err(validation_error)?;
    Ok(value)
}

/// JSON body that passed validation and sanitising.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Sanitize,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::invalid_field("body", &rejection.body_text()))?;
        Ok(ValidatedJson(validated(value)?))
    }
}

/// Query string that passed validation and sanitising.
#[derive(Debug)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate + Sanitize,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::invalid_field("query", &rejection.body_text()))?;
        Ok(ValidatedQuery(validated(value)?))
    }
}

// ============================================================================
// Path ids
// ============================================================================

/// Parse one snowflake path segment.
pub fn parse_path_id(raw: &str, field: &str) -> Result<i64, AppError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::invalid_field(field, "Invalid id")),
    }
}

/// The single snowflake id of routes like `/posts/{id}`.
#[derive(Debug, Clone, Copy)]
pub struct PathId(pub i64);

impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::invalid_field("id", &rejection.body_text()))?;
        parse_path_id(&raw, "id").map(PathId)
    }
}

// ============================================================================
// Multipart
// ============================================================================

/// A fully read multipart form: text fields by name, file parts in order.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: Vec<(String, UploadedFile)>,
}

impl MultipartForm {
    /// Non-empty text field
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).filter(|v| !v.trim().is_empty()).cloned()
    }

    /// Boolean text field (`true`/`false`/`1`/`0`)
    pub fn flag(&self, name: &str) -> Result<Option<bool>, AppError> {
        match self.text(name).as_deref().map(str::trim) {
            None => Ok(None),
            Some("true") | Some("1") => Ok(Some(true)),
            Some("false") | Some("0") => Ok(Some(false)),
            Some(_) => Err(AppError::invalid_field(name, "Must be a boolean")),
        }
    }

    /// Remove and return every file sent under `name`.
    pub fn take_files(&mut self, name: &str) -> Vec<UploadedFile> {
        let (matching, rest) = std::mem::take(&mut self.files)
            .into_iter()
            .partition::<Vec<_>, _>(|(field, _)| field == name);
        self.files = rest;
        matching.into_iter().map(|(_, file)| file).collect()
    }

    /// Exactly one file under `name`.
    pub fn take_file(&mut self, name: &str) -> Result<UploadedFile, AppError> {
        let mut files = self.take_files(name);
        match files.len() {
            0 => Err(AppError::invalid_field(name, "A file is required")),
            1 => Ok(files.remove(0)),
            _ => Err(AppError::invalid_field(name, "Only one file is allowed")),
        }
    }
}

impl<S> FromRequest<S> for MultipartForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| AppError::invalid_field("body", &rejection.body_text()))?;

        let mut form = MultipartForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::invalid_field("body", &e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if field.file_name().is_some() {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::invalid_field(&name, &e.body_text()))?;
                form.files.push((
                    name,
                    UploadedFile {
                        data,
                        content_type,
                        file_name,
                    },
                ));
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::invalid_field(&name, &e.body_text()))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }
}
