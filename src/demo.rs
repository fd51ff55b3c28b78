use async_trait::async_trait;
use base64::Engine;
use image::{imageops, DynamicImage, RgbaImage};
use std::io::Cursor;
use tracing::info;

use crate::gemini::{GeminiError, Synthesizer};
use crate::models::{AspectRatio, EncodedAsset, GenerationRequest, GenerationResult};

/// Offline stand-in used when no API key is configured: centre-crops the
/// model photo to the requested ratio and insets the product in the lower
/// right corner. No network access.
#[derive(Debug, Default, Clone, Copy)]
pub struct DemoSynthesizer;

#[async_trait]
impl Synthesizer for DemoSynthesizer {
    async fn synthesize(&self, request: &GenerationRequest) -> Result<GenerationResult, GeminiError> {
        info!("Using demo mode - composing a local preview instead of calling Gemini");
        let request = request.clone();
        let png = tokio::task::spawn_blocking(move || compose_preview(&request))
            .await
            .map_err(|e| no_image(e.to_string()))??;
        info!("📦 Demo preview composed ({} bytes)", png.len());
        Ok(GenerationResult::new(EncodedAsset {
            content_type: "image/png".to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(png),
        }))
    }
}

fn no_image(reason: String) -> GeminiError {
    GeminiError::NoImageReturned { reason: Some(format!("demo mode: {reason}")) }
}

fn decode(asset: &EncodedAsset) -> Result<DynamicImage, GeminiError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&asset.data)
        .map_err(|e| no_image(e.to_string()))?;
    image::load_from_memory(&bytes).map_err(|e| no_image(format!("unreadable {}: {e}", asset.content_type)))
}

fn compose_preview(request: &GenerationRequest) -> Result<Vec<u8>, GeminiError> {
    let model = decode(request.model())?.to_rgba8();
    let product = decode(request.product())?.to_rgba8();

    let mut canvas = crop_to_ratio(&model, request.aspect_ratio());
    let (w, h) = canvas.dimensions();
    let inset_w = (w / 3).max(1);
    let inset_h = ((product.height() as u64 * inset_w as u64) / product.width().max(1) as u64).clamp(1, h as u64) as u32;
    let inset = imageops::resize(&product, inset_w, inset_h, imageops::FilterType::Triangle);
    let margin = (w / 40) as i64;
    imageops::overlay(&mut canvas, &inset, w as i64 - inset_w as i64 - margin, h as i64 - inset_h as i64 - margin);

    let mut png = Vec::new();
    canvas
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| no_image(e.to_string()))?;
    Ok(png)
}

/// Largest centred region of `img` with the given ratio.
pub fn crop_to_ratio(img: &RgbaImage, ratio: AspectRatio) -> RgbaImage {
    let (w, h) = img.dimensions();
    let (rw, rh) = ratio.terms();
    let (cw, ch) = if w as u64 * rh as u64 > h as u64 * rw as u64 {
        ((h as u64 * rw as u64 / rh as u64) as u32, h)
    } else {
        (w, (w as u64 * rh as u64 / rw as u64) as u32)
    };
    let (cw, ch) = (cw.max(1), ch.max(1));
    imageops::crop_imm(img, (w - cw) / 2, (h - ch) / 2, cw, ch).to_image()
}
