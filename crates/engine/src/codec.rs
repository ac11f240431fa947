use std::io::Read;

use image::imageops::FilterType;

use crate::types::Raster;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to read image stream: {0}")]
    Io(#[from] std::io::Error),
    #[error("stream is not a decodable image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Decoding and resampling capability. Assumed deterministic and
/// side-effect-free; the engine never caches beyond the two in-flight slots.
pub trait ImageCodec: Send {
    fn decode(&self, stream: &mut dyn Read) -> Result<Raster, CodecError>;
    fn scale(&self, raster: &Raster, width: u32, height: u32) -> Raster;
}

/// Default codec backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamCodec;

impl ImageCodec for StreamCodec {
    fn decode(&self, stream: &mut dyn Read) -> Result<Raster, CodecError> {
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes)?;
        Ok(image::load_from_memory(&bytes)?.to_rgba8())
    }

    fn scale(&self, raster: &Raster, width: u32, height: u32) -> Raster {
        image::imageops::resize(raster, width.max(1), height.max(1), FilterType::Triangle)
    }
}

/// Minimal uniform scale at which `image` fully covers `viewport`.
fn cover_scale(image: (u32, u32), viewport: (u32, u32)) -> f32 {
    let (iw, ih) = (image.0.max(1) as f32, image.1.max(1) as f32);
    let (vw, vh) = (viewport.0 as f32, viewport.1 as f32);
    f32::max(vw / iw, vh / ih)
}

/// Cover-fit target dimensions for `image` inside `viewport`.
///
/// One resulting dimension equals the viewport's (within rounding), the other
/// is at least as large, so a translation-only pan always fills the viewport.
pub fn cover_target(image: (u32, u32), viewport: (u32, u32)) -> (u32, u32) {
    let scale = cover_scale(image, viewport);
    let width = (image.0.max(1) as f32 * scale).round().max(1.0) as u32;
    let height = (image.1.max(1) as f32 * scale).round().max(1.0) as u32;
    (width, height)
}
