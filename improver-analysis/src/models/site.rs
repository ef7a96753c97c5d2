//! Site snapshot types
//!
//! A snapshot is the normalized structural view of a fetched page: headings,
//! links, images, assets and metadata. It is produced once per job by the
//! content extractor, consumed by the scoring engine and the AI advisor, and
//! persisted only inside the completed job's result payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Normalized snapshot of a fetched page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteData {
    pub url: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub structure: PageStructure,
    pub assets: Vec<Asset>,
    pub metadata: SiteMetadata,
    pub screenshots: Vec<Screenshot>,
}

/// Structural breakdown of the page markup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStructure {
    pub headings: Vec<Heading>,
    pub links: Vec<Link>,
    pub images: Vec<ImageElement>,
    pub forms: Vec<FormElement>,
    pub navigation: Vec<NavigationElement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heading {
    /// Tag level, 1 through 6
    pub level: u8,
    /// Inner text with nested tags stripped
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Internal,
    External,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: LinkKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageElement {
    pub src: String,
    pub alt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormElement {
    pub action: String,
    pub method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationElement {
    pub text: String,
    pub href: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Css,
    Js,
    Font,
    Video,
}

/// A loadable page asset, tagged with its type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub optimized: bool,
}

/// Page metadata, mostly passed through from the scraping backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteMetadata {
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub og_tags: HashMap<String, String>,
    pub twitter_tags: HashMap<String, String>,
    pub structured_data: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotKind {
    Desktop,
    Mobile,
    Tablet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screenshot {
    #[serde(rename = "type")]
    pub kind: ScreenshotKind,
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub timestamp: DateTime<Utc>,
}

impl SiteData {
    /// Images that carry no usable alt text
    pub fn images_without_alt(&self) -> usize {
        self.structure
            .images
            .iter()
            .filter(|img| img.alt.trim().is_empty())
            .count()
    }

    /// Assets of the image type
    pub fn image_asset_count(&self) -> usize {
        self.assets
            .iter()
            .filter(|asset| asset.kind == AssetKind::Image)
            .count()
    }

    /// Whether any level-1 heading is present
    pub fn has_h1(&self) -> bool {
        self.structure.headings.iter().any(|h| h.level == 1)
    }
}
