use base64::Engine;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::filters::FilterState;
use crate::models::GenerationResult;

pub const EDITED_FILE_NAME: &str = "edited-image.png";
pub const GENERATED_FILE_NAME: &str = "generated-image.png";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("generated image is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("could not decode generated image: {0}")]
    Decode(String),
    #[error("could not encode export: {0}")]
    Encode(String),
    #[error("export task failed: {0}")]
    Task(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ExportedImage {
    pub file_name: &'static str,
    pub width: u32,
    pub height: u32,
    pub filters: FilterState,
    pub png: Vec<u8>,
}

impl ExportedImage {
    pub async fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ExportError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(self.file_name);
        tokio::fs::write(&path, &self.png).await?;
        info!("💾 Saved {}x{} export to {}", self.width, self.height, path.display());
        Ok(path)
    }
}

/// Name the download gets: edited when any filter moved off neutral.
pub fn export_file_name(filters: &FilterState) -> &'static str {
    if filters.is_neutral() { GENERATED_FILE_NAME } else { EDITED_FILE_NAME }
}

/// Decodes the generated image at its natural size, bakes the filter chain
/// into the pixels and re-encodes as PNG. Decoding runs on the blocking pool.
pub async fn render_export(result: &GenerationResult, filters: FilterState) -> Result<ExportedImage, ExportError> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(&result.image.data)?;
    tokio::task::spawn_blocking(move || render_blocking(&bytes, filters))
        .await
        .map_err(|e| ExportError::Task(e.to_string()))?
}

fn render_blocking(bytes: &[u8], filters: FilterState) -> Result<ExportedImage, ExportError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| ExportError::Decode(e.to_string()))?;
    let mut canvas = decoded.to_rgba8();
    let (width, height) = canvas.dimensions();
    filters.apply(&mut canvas);

    let mut png = Vec::new();
    canvas
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| ExportError::Encode(e.to_string()))?;

    Ok(ExportedImage { file_name: export_file_name(&filters), width, height, filters, png })
}
