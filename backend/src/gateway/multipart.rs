use actix_multipart::{Field, Multipart};
use actix_web::http::header::{self, HeaderMap};
use actix_web::web;
use futures::{StreamExt, TryStreamExt};
use std::io::Write;

use crate::gateway::models::{CONFIDENCE_FIELD, FILE_FIELD, MODEL_FIELD, UploadRequest, UploadedFile};
use crate::gateway::upload_service::{UploadError, UploadGateway};

/// Running total of body bytes read so far, shared across every field.
struct ByteBudget {
    used: u64,
    limit: u64,
}

impl ByteBudget {
    fn take(&mut self, n: usize) -> bool {
        self.used = self.used.saturating_add(n as u64);
        self.used <= self.limit
    }
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

async fn read_field(
    field: &mut Field,
    budget: &mut ByteBudget,
    too_large: impl Fn() -> UploadError,
) -> Result<Vec<u8>, UploadError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| UploadError::Multipart(e.to_string()))?;
        if !budget.take(chunk.len()) {
            return Err(too_large());
        }
        data.write_all(&chunk)
            .map_err(|e| UploadError::Multipart(e.to_string()))?;
    }
    Ok(data)
}

/// Parses the upload form, refusing bodies larger than the gateway limit before they are
/// fully read. The file's name is checked before its bytes are pulled off the wire.
pub async fn read_upload_request(
    headers: &HeaderMap,
    payload: web::Payload,
    gateway: &UploadGateway,
) -> Result<UploadRequest, UploadError> {
    if declared_length(headers).is_some_and(|len| len > gateway.max_bytes()) {
        return Err(gateway.too_large());
    }
    if !is_multipart(headers) {
        return Err(UploadError::NoFile);
    }

    let mut multipart = Multipart::new(headers, payload);
    let mut budget = ByteBudget {
        used: 0,
        limit: gateway.max_bytes(),
    };
    let mut request = UploadRequest::default();

    while let Some(mut field) = multipart
        .try_next()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        match name.as_str() {
            FILE_FIELD if request.file.is_none() => {
                let filename = filename.unwrap_or_default();
                gateway.checked_extension(&filename)?;
                let data = read_field(&mut field, &mut budget, || gateway.too_large()).await?;
                request.file = Some(UploadedFile { filename, data });
            }
            CONFIDENCE_FIELD | MODEL_FIELD => {
                let data = read_field(&mut field, &mut budget, || gateway.too_large()).await?;
                let value = String::from_utf8_lossy(&data).into_owned();
                if name == CONFIDENCE_FIELD {
                    request.confidence.get_or_insert(value);
                } else {
                    request.model.get_or_insert(value);
                }
            }
            _ => {
                read_field(&mut field, &mut budget, || gateway.too_large()).await?;
            }
        }
    }

    Ok(request)
}
