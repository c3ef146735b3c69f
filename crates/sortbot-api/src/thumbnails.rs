use std::io::Cursor;
use std::sync::OnceLock;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use tracing::warn;
use uuid::Uuid;

use crate::{ApiError, AppState, internal};

/// Serve a stored thumbnail as PNG. A missing image gets the generated
/// placeholder rather than a 404, so the events table always has something
/// to render in its image cell.
pub async fn thumbnail(
    State(state): State<AppState>,
    Path(image_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let result = tokio::task::spawn_blocking(move || db.db.get_thumbnail(image_id))
        .await
        .map_err(|e| internal("thumbnail", e))?;

    let bytes = match result {
        Ok(bytes) => bytes,
        Err(e) if e.is_not_found() => placeholder_png().to_vec(),
        Err(e) => return Err(internal("thumbnail", e)),
    };

    Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
}

static PLACEHOLDER: OnceLock<Vec<u8>> = OnceLock::new();

/// Flat gray 100x100 PNG, encoded once per process.
fn placeholder_png() -> &'static [u8] {
    PLACEHOLDER.get_or_init(|| {
        let img = GrayImage::from_pixel(100, 100, Luma([204u8]));
        let mut out = Cursor::new(Vec::new());
        if let Err(e) = DynamicImage::ImageLuma8(img).write_to(&mut out, ImageFormat::Png) {
            warn!("Failed to encode placeholder thumbnail: {e}");
        }
        out.into_inner()
    })
}
