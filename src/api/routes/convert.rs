//! Conversion handler: multipart staging and artifact download.

use crate::api::AppState;
use crate::api::body::file_body;
use crate::batch::{BatchOutput, CleanupManager, Workspace};
use crate::error::{Error, Result, ValidationError};
use crate::naming::content_disposition;
use crate::options::{EncodeOptions, RawEncodeOptions};
use crate::types::{BatchRequest, StagedUpload};
use axum::{
    extract::{
        Multipart, State,
        multipart::{Field, MultipartError, MultipartRejection},
    },
    http::{StatusCode, header},
    response::Response,
};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Form field carrying the uploaded images (repeatable)
pub const UPLOAD_FIELD: &str = "image";

/// Response header with the number of files left out of a partial archive
pub const FAILED_COUNT_HEADER: &str = "x-conversion-failures";

/// Everything read from the multipart form
#[derive(Debug, Default)]
struct ConvertForm {
    uploads: Vec<StagedUpload>,
    raw_options: RawEncodeOptions,
    desired_name: Option<String>,
}

/// POST /convert - Convert uploaded images to WebP
///
/// One `image` part yields an `image/webp` download; several yield a zip
/// archive with one entry per upload, in upload order.
#[utoipa::path(
    post,
    path = "/convert",
    tag = "convert",
    request_body(
        content = Vec<u8>,
        description = "multipart/form-data with up to `batch.max_files` `image` parts and optional text fields `quality` (0-100), `lossless` (\"true\"), `effort` (0-3), `maxWidth`, `maxHeight` and `filename` (single-file downloads only)",
        content_type = "multipart/form-data"
    ),
    responses(
        (status = 200, description = "Converted image (image/webp) or archive of converted images (application/zip)", content_type = "application/octet-stream"),
        (status = 400, description = "No files, too many files or malformed form data", content_type = "text/plain"),
        (status = 413, description = "Request body too large", content_type = "text/plain"),
        (status = 500, description = "Conversion failed", content_type = "text/plain"),
        (status = 503, description = "No encoder available", content_type = "text/plain"),
        (status = 504, description = "Conversion timed out", content_type = "text/plain")
    )
)]
pub async fn convert(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let multipart = multipart.map_err(|e| ValidationError::Multipart(e.body_text()))?;

    let workspace = state.orchestrator.create_workspace()?;
    let max_files = state.orchestrator.config().max_files;
    let body_limit = state.config.server.max_upload_bytes;

    let form = match read_form(&workspace, multipart, max_files, body_limit).await {
        Ok(form) => form,
        Err(e) => {
            CleanupManager::new(workspace).run().await;
            return Err(e);
        }
    };

    debug!(
        batch_id = %workspace.id(),
        files = form.uploads.len(),
        "staged uploads"
    );

    let request = BatchRequest {
        uploads: form.uploads,
        options: EncodeOptions::normalize(&form.raw_options),
        desired_name: form.desired_name,
    };

    let output = state.orchestrator.run(workspace, request).await?;
    respond(output).await
}

async fn read_form(
    workspace: &Workspace,
    mut multipart: Multipart,
    max_files: usize,
    body_limit: usize,
) -> Result<ConvertForm> {
    let mut form = ConvertForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, body_limit))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == UPLOAD_FIELD {
            if form.uploads.len() >= max_files {
                return Err(ValidationError::TooManyFiles { max: max_files }.into());
            }
            let upload = stage_upload(workspace, form.uploads.len(), &mut field, body_limit).await?;
            form.uploads.push(upload);
            continue;
        }

        if field.file_name().is_some() {
            return Err(ValidationError::UnexpectedFile(name).into());
        }

        let slot = match name.as_str() {
            "quality" => &mut form.raw_options.quality,
            "lossless" => &mut form.raw_options.lossless,
            "effort" => &mut form.raw_options.effort,
            "maxWidth" => &mut form.raw_options.max_width,
            "maxHeight" => &mut form.raw_options.max_height,
            "filename" => &mut form.desired_name,
            _ => {
                debug!(field = %name, "ignoring unknown form field");
                continue;
            }
        };

        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, body_limit))?;
        let value = String::from_utf8(bytes.to_vec())
            .map_err(|_| ValidationError::InvalidField(name.clone()))?;
        *slot = Some(value);
    }

    Ok(form)
}

/// Stream one file part to its staging path, chunk by chunk
async fn stage_upload(
    workspace: &Workspace,
    index: usize,
    field: &mut Field<'_>,
    body_limit: usize,
) -> Result<StagedUpload> {
    let original_name = field
        .file_name()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("upload-{}", index + 1));

    let path = workspace.input_path(index);
    let mut file = tokio::fs::File::create(&path).await?;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, body_limit))?
    {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok(StagedUpload {
        original_name,
        path,
    })
}

fn multipart_error(error: MultipartError, body_limit: usize) -> Error {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationError::TooLarge { limit: body_limit }.into()
    } else {
        ValidationError::Multipart(error.body_text()).into()
    }
}

async fn respond(output: BatchOutput) -> Result<Response> {
    let content_type = output.content_type();
    let BatchOutput {
        path,
        file_name,
        failures,
        cleanup,
        ..
    } = output;

    let file = tokio::fs::File::open(&path).await?;
    let length = file.metadata().await?.len();

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, content_disposition(&file_name))
        .header(header::CONTENT_LENGTH, length);
    if !failures.is_empty() {
        response = response.header(FAILED_COUNT_HEADER, failures.len());
    }

    response
        .body(file_body(file, cleanup))
        .map_err(|e| Error::Other(format!("failed to build response: {e}")))
}
