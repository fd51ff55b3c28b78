use base64::Engine;
use reqwest::Client;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{Asset, EncodedAsset};

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("{0} is empty")]
    Empty(String),
    #[error("could not determine an image type for {0}")]
    UnknownType(String),
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Turns an asset into a base64 payload plus content-type. Remote assets are
/// fetched once; there is no retry.
pub async fn encode_asset(client: &Client, asset: &Asset) -> Result<EncodedAsset, EncodingError> {
    match asset {
        Asset::Local { bytes, content_type, name } => encode_bytes(name, bytes, content_type),
        Asset::Remote { url } => {
            info!("🌐 Fetching remote asset: {}", url);
            let response = client
                .get(url)
                .send()
                .await
                .map_err(|e| EncodingError::Fetch { url: url.clone(), reason: e.to_string() })?;

            let status = response.status();
            if !status.is_success() {
                warn!("❌ Remote asset {} answered {}", url, status);
                return Err(EncodingError::Status { url: url.clone(), status: status.as_u16() });
            }

            let header_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
                .unwrap_or_default();

            let bytes = response
                .bytes()
                .await
                .map_err(|e| EncodingError::Fetch { url: url.clone(), reason: e.to_string() })?;

            // Hosts that answer with octet-stream or nothing at all still get a chance via sniffing.
            let declared = if header_type.starts_with("image/") { header_type } else { String::new() };
            encode_bytes(url, &bytes, &declared)
        }
    }
}

/// Encodes both slots concurrently; the first failure wins.
pub async fn encode_pair(client: &Client, model: &Asset, product: &Asset) -> Result<(EncodedAsset, EncodedAsset), EncodingError> {
    tokio::try_join!(encode_asset(client, model), encode_asset(client, product))
}

fn encode_bytes(label: &str, bytes: &[u8], declared: &str) -> Result<EncodedAsset, EncodingError> {
    if bytes.is_empty() {
        return Err(EncodingError::Empty(label.to_string()));
    }
    let content_type = if declared.trim().is_empty() {
        sniff_content_type(bytes).ok_or_else(|| EncodingError::UnknownType(label.to_string()))?
    } else {
        declared.trim().to_string()
    };
    let data = base64::engine::general_purpose::STANDARD.encode(bytes);
    info!("📦 Encoded {} as {} ({} bytes -> {} chars)", label, content_type, bytes.len(), data.len());
    Ok(EncodedAsset { content_type, data })
}

pub fn sniff_content_type(bytes: &[u8]) -> Option<String> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[tokio::test]
    async fn local_asset_keeps_declared_type_and_bytes() {
        let original = b"\xFF\xD8\xFFfake jpeg body".to_vec();
        let asset = Asset::local(original.clone(), "image/jpeg", "model.jpg");

        let encoded = encode_asset(&Client::new(), &asset).await.unwrap();

        assert_eq!(encoded.content_type, "image/jpeg");
        let decoded = base64::engine::general_purpose::STANDARD.decode(&encoded.data).unwrap();
        assert_eq!(decoded, original);
    }

    #[tokio::test]
    async fn local_asset_without_type_is_sniffed() {
        let asset = Asset::local(PNG_MAGIC.to_vec(), "", "mystery");
        let encoded = encode_asset(&Client::new(), &asset).await.unwrap();
        assert_eq!(encoded.content_type, "image/png");
    }

    #[tokio::test]
    async fn empty_local_asset_fails() {
        let asset = Asset::local(Vec::new(), "image/png", "blank.png");
        let err = encode_asset(&Client::new(), &asset).await.unwrap_err();
        assert!(matches!(err, EncodingError::Empty(ref name) if name == "blank.png"));
    }

    #[tokio::test]
    async fn unrecognisable_bytes_without_type_fail() {
        let asset = Asset::local(b"plain text".to_vec(), "", "notes.txt");
        let err = encode_asset(&Client::new(), &asset).await.unwrap_err();
        assert!(matches!(err, EncodingError::UnknownType(_)));
    }

    #[tokio::test]
    async fn pair_reports_first_failure() {
        let good = Asset::local(PNG_MAGIC.to_vec(), "image/png", "a.png");
        let bad = Asset::local(Vec::new(), "image/png", "b.png");
        let err = encode_pair(&Client::new(), &good, &bad).await.unwrap_err();
        assert_eq!(err.to_string(), "b.png is empty");
    }
}
