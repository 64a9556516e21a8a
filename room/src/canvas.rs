//! Layer compositing for the shared picture.
//!
//! Every drawer paints a transparent PNG the size of the whole board; the
//! server stacks it over what the previous drawers produced. Bytes stay
//! raw PNG inside the room and only become base64 at the wire boundary.

use std::io::Cursor;
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{imageops, DynamicImage, ImageError, ImageFormat};
use regex::Regex;

pub const DATA_URL_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, thiserror::Error)]
pub enum CompositeError {
    #[error("failed to decode base layer: {0}")]
    Base(#[source] ImageError),
    #[error("failed to decode overlay: {0}")]
    Overlay(#[source] ImageError),
    #[error("failed to encode composed image: {0}")]
    Encode(#[source] ImageError),
    #[error("compositing task aborted")]
    Aborted,
}

/// Draws `overlay` over `base` with source-over blending, clipped to the
/// base's bounds, and returns the result as PNG.
///
/// An empty base means nothing was drawn yet, so the overlay is returned
/// as-is without being decoded.
pub fn merge_layer(base: &[u8], overlay: &[u8]) -> Result<Vec<u8>, CompositeError> {
    if base.is_empty() {
        return Ok(overlay.to_vec());
    }
    let mut composed = image::load_from_memory(base)
        .map_err(CompositeError::Base)?
        .to_rgba8();
    let top = image::load_from_memory(overlay)
        .map_err(CompositeError::Overlay)?
        .to_rgba8();

    imageops::overlay(&mut composed, &top, 0, 0);

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(composed)
        .write_to(&mut out, ImageFormat::Png)
        .map_err(CompositeError::Encode)?;
    Ok(out.into_inner())
}

/// Fails with `Overlay` when `layer` is not an image we can read.
pub fn check_layer(layer: &[u8]) -> Result<(), CompositeError> {
    image::load_from_memory(layer)
        .map(|_| ())
        .map_err(CompositeError::Overlay)
}

fn data_url() -> &'static Regex {
    static DATA_URL: OnceLock<Regex> = OnceLock::new();
    DATA_URL.get_or_init(|| {
        Regex::new(r"^data:image/[A-Za-z0-9.+-]+;base64,").expect("data url pattern is valid")
    })
}

/// Accepts bare base64 as well as a `data:image/...;base64,` URL.
pub fn decode_img(wire: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let wire = wire.trim();
    let payload = data_url().replace(wire, "");
    STANDARD.decode(payload.as_bytes())
}

pub fn encode_img(png: &[u8]) -> String {
    if png.is_empty() {
        return String::new();
    }
    format!("{}{}", DATA_URL_PREFIX, STANDARD.encode(png))
}
