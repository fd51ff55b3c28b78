use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, str::FromStr};

/// An image supplied for one of the two input slots.
#[derive(Debug, Clone, PartialEq)]
pub enum Asset {
    /// Bytes the user handed us directly (a file pick).
    Local { bytes: Bytes, content_type: String, name: String },
    /// An image hosted elsewhere, fetched at encode time.
    Remote { url: String },
}

impl Asset {
    pub fn local(bytes: impl Into<Bytes>, content_type: impl Into<String>, name: impl Into<String>) -> Self {
        Asset::Local { bytes: bytes.into(), content_type: content_type.into(), name: name.into() }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        Asset::Remote { url: url.into() }
    }

    /// Reads a file from disk. The content-type comes from the extension, or
    /// stays empty so the encoder sniffs it from the bytes.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let content_type = image::ImageFormat::from_path(path)
            .map(|f| f.to_mime_type().to_string())
            .unwrap_or_default();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Asset::Local { bytes: Bytes::from(bytes), content_type, name })
    }

    pub fn label(&self) -> &str {
        match self {
            Asset::Local { name, .. } => name,
            Asset::Remote { url } => url,
        }
    }
}

/// An asset converted into something that can be embedded in a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedAsset {
    pub content_type: String,
    /// Standard base64, no data-URI prefix.
    pub data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    Studio,
    Lifestyle,
    Editorial,
    Outdoor,
    Minimalist,
}

impl Style {
    pub const ALL: [Style; 5] = [Style::Studio, Style::Lifestyle, Style::Editorial, Style::Outdoor, Style::Minimalist];

    pub fn name(&self) -> &'static str {
        match self {
            Style::Studio => "Studio",
            Style::Lifestyle => "Lifestyle",
            Style::Editorial => "Editorial",
            Style::Outdoor => "Outdoor",
            Style::Minimalist => "Minimalist",
        }
    }

    /// Scene direction handed to the model alongside the style name.
    pub fn scene(&self) -> &'static str {
        match self {
            Style::Studio => "clean professional studio lighting on a seamless backdrop",
            Style::Lifestyle => "a natural everyday setting with candid, relaxed posing",
            Style::Editorial => "high-fashion magazine composition with dramatic lighting",
            Style::Outdoor => "natural daylight in an outdoor location",
            Style::Minimalist => "a sparse, uncluttered scene with soft neutral tones",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Style {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Style::ALL
            .into_iter()
            .find(|style| style.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown style '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "9:16")]
    Story,
    #[serde(rename = "16:9")]
    Widescreen,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Portrait,
        AspectRatio::Landscape,
        AspectRatio::Story,
        AspectRatio::Widescreen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Landscape => "4:3",
            AspectRatio::Story => "9:16",
            AspectRatio::Widescreen => "16:9",
        }
    }

    /// Width and height terms of the ratio.
    pub fn terms(&self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (1, 1),
            AspectRatio::Portrait => (3, 4),
            AspectRatio::Landscape => (4, 3),
            AspectRatio::Story => (9, 16),
            AspectRatio::Widescreen => (16, 9),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AspectRatio::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| format!("unknown aspect ratio '{s}'"))
    }
}

/// Everything one synthesis call needs. Built per attempt and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    model: EncodedAsset,
    product: EncodedAsset,
    brief: String,
    style: Style,
    aspect_ratio: AspectRatio,
}

impl GenerationRequest {
    pub fn new(model: EncodedAsset, product: EncodedAsset, brief: impl Into<String>, style: Style, aspect_ratio: AspectRatio) -> Self {
        Self { model, product, brief: brief.into(), style, aspect_ratio }
    }

    pub fn model(&self) -> &EncodedAsset { &self.model }
    pub fn product(&self) -> &EncodedAsset { &self.product }
    pub fn brief(&self) -> &str { &self.brief }
    pub fn style(&self) -> Style { self.style }
    pub fn aspect_ratio(&self) -> AspectRatio { self.aspect_ratio }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub image: EncodedAsset,
    pub generated_at: DateTime<Utc>,
}

impl GenerationResult {
    pub fn new(image: EncodedAsset) -> Self {
        Self { image, generated_at: Utc::now() }
    }

    /// `data:<content-type>;base64,<data>`, directly displayable.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.image.content_type, self.image.data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockModel {
    pub label: &'static str,
    pub url: &'static str,
}

pub const STOCK_MODELS: &[StockModel] = &[
    StockModel { label: "Woman, neutral studio", url: "https://picsum.photos/seed/modelshot-1/768/1024.jpg" },
    StockModel { label: "Man, street portrait", url: "https://picsum.photos/seed/modelshot-2/768/1024.jpg" },
    StockModel { label: "Woman, outdoor daylight", url: "https://picsum.photos/seed/modelshot-3/768/1024.jpg" },
    StockModel { label: "Man, editorial close-up", url: "https://picsum.photos/seed/modelshot-4/768/1024.jpg" },
    StockModel { label: "Hands, product hold", url: "https://picsum.photos/seed/modelshot-5/768/1024.jpg" },
    StockModel { label: "Full body, casual", url: "https://picsum.photos/seed/modelshot-6/768/1024.jpg" },
];
