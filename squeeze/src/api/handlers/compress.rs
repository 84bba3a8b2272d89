use crate::AppState;
use crate::api::models::compress::{CompressResponse, UploadRequest, savings_percent};
use crate::codec::{self, CodecError, Quality, SourceFormat};
use crate::errors::{Error, Result};
use crate::store::ArtifactStore;
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use image::DynamicImage;
use std::io::{BufWriter, Write};
use tracing::{info, instrument};

/// Outcome of the blocking decode/encode/store step
#[derive(Debug)]
struct Compressed {
    filename: String,
    compressed_size: u64,
    format: SourceFormat,
}

fn upload_failed(e: impl std::fmt::Display) -> Error {
    Error::UploadFailed { reason: e.to_string() }
}

/// Pull the `image` file part and the optional `quality` field out of the form.
///
/// Only the first occurrence of each field is used. An `image` part without a filename is not a
/// file upload and is ignored.
async fn read_upload(mut multipart: Multipart, default_quality: u32) -> Result<UploadRequest> {
    let mut image = None;
    let mut quality = None;

    while let Some(field) = multipart.next_field().await.map_err(upload_failed)? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "image" if image.is_none() && field.file_name().is_some() => {
                image = Some(field.bytes().await.map_err(upload_failed)?);
            }
            "quality" if quality.is_none() => {
                quality = Some(field.text().await.map_err(upload_failed)?);
            }
            _ => {}
        }
    }

    let image = image.ok_or_else(|| upload_failed("missing `image` file part"))?;

    Ok(UploadRequest {
        image,
        quality: Quality::parse_or(quality.as_deref(), default_quality),
    })
}

/// Decode, create the artifact, encode into it and stat the result.
///
/// Runs on the blocking pool.
fn compress_to_store(store: &ArtifactStore, data: &[u8], quality: Quality) -> Result<Compressed> {
    let decoded = codec::decode(data).map_err(Error::UnsupportedImage)?;

    let artifact = store.create().map_err(Error::CreateOutput)?;
    let compressed_size = encode_into_artifact(
        store,
        &artifact.filename,
        &decoded.image,
        quality,
        BufWriter::new(artifact.file),
    )?;

    Ok(Compressed {
        filename: artifact.filename,
        compressed_size,
        format: decoded.format,
    })
}

/// Encode `image` through `writer` into the artifact `filename` and return its size on disk.
///
/// A failed encode or flush removes the partial artifact.
fn encode_into_artifact<W: Write>(
    store: &ArtifactStore,
    filename: &str,
    image: &DynamicImage,
    quality: Quality,
    mut writer: W,
) -> Result<u64> {
    let written = codec::encode_jpeg(image, quality, &mut writer).and_then(|()| writer.flush().map_err(CodecError::from));
    // Close the file before stat or removal
    drop(writer);

    if let Err(e) = written {
        store.discard(filename);
        return Err(Error::Compression(e));
    }

    store.size(filename).map_err(|e| Error::Internal {
        operation: format!("stat artifact {filename}: {e}"),
    })
}

#[utoipa::path(
    post,
    path = "/api/compress",
    tag = "compress",
    summary = "Compress image",
    description = "Re-encode an uploaded JPEG, PNG, GIF or WebP image as JPEG. The `quality` field (1-100, default 75) \
                   controls the encoder; missing, non-numeric or non-positive values use the default.",
    request_body(
        content_type = "multipart/form-data",
        description = "`image` file part (required) and `quality` text field (optional)"
    ),
    responses(
        (status = 200, description = "Image compressed and stored", body = CompressResponse),
        (status = 400, description = "Upload missing or not a decodable image", body = CompressResponse),
        (status = 405, description = "Method not allowed"),
        (status = 500, description = "Output could not be written", body = CompressResponse)
    )
)]
#[instrument(skip_all)]
pub async fn compress_image(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<CompressResponse>> {
    let multipart = multipart.map_err(upload_failed)?;
    let upload = read_upload(multipart, state.config.default_quality).await?;

    // Also keeps the savings division well-defined
    if upload.image.is_empty() {
        return Err(Error::EmptyUpload);
    }

    let original_size = upload.original_size();
    let quality = upload.quality;
    let store = state.store.clone();

    let compressed = tokio::task::spawn_blocking(move || compress_to_store(&store, &upload.image, quality))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("join compression task: {e}"),
        })??;

    let savings = savings_percent(original_size, compressed.compressed_size);

    info!(
        filename = %compressed.filename,
        format = %compressed.format,
        quality = quality.get(),
        original_size,
        compressed_size = compressed.compressed_size,
        savings,
        "Image compressed"
    );

    Ok(Json(CompressResponse {
        success: true,
        message: None,
        original_size: Some(original_size),
        compressed_size: Some(compressed.compressed_size),
        savings: Some(savings),
        download_url: Some(state.config.download_url(&compressed.filename)),
        format: Some(compressed.format.name().to_string()),
    }))
}
