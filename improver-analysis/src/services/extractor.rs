//! Content extraction from raw markup
//!
//! Pure, synchronous transformation of HTML-like text into the snapshot's
//! structural fields. The extraction is regex-based rather than a full DOM
//! parse; absence of matches yields empty collections, never an error, so
//! malformed or empty markup cannot abort a job.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Asset, AssetKind, Heading, ImageElement, Link, LinkKind, PageStructure};

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<h([1-6])[^>]*>(.*?)</h[1-6]>").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<a[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#).unwrap());
static IMG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<img[^>]*>").unwrap());
static SRC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)src="([^"]*)""#).unwrap());
static ALT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)alt="([^"]*)""#).unwrap());
static WIDTH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)width="([^"]*)""#).unwrap());
static HEIGHT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)height="([^"]*)""#).unwrap());
static STYLESHEET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<link[^>]*rel="stylesheet"[^>]*href="([^"]*)"[^>]*>"#).unwrap()
});

/// Extract the structural breakdown (headings, links, images) from markup
pub fn extract_page_structure(html: &str) -> PageStructure {
    let headings = HEADING_RE
        .captures_iter(html)
        .map(|cap| Heading {
            level: cap[1].parse().unwrap_or(1),
            text: strip_tags(&cap[2]),
        })
        .collect();

    let links = LINK_RE
        .captures_iter(html)
        .map(|cap| {
            let href = cap[1].to_string();
            let kind = if href.starts_with("http") {
                LinkKind::External
            } else {
                LinkKind::Internal
            };
            Link {
                text: strip_tags(&cap[2]),
                href,
                kind,
            }
        })
        .collect();

    let images = IMG_RE
        .find_iter(html)
        .map(|m| {
            let tag = m.as_str();
            ImageElement {
                src: attr(&SRC_RE, tag).unwrap_or_default(),
                alt: attr(&ALT_RE, tag).unwrap_or_default(),
                width: attr(&WIDTH_RE, tag).and_then(|v| v.parse().ok()),
                height: attr(&HEIGHT_RE, tag).and_then(|v| v.parse().ok()),
            }
        })
        .collect();

    PageStructure {
        headings,
        links,
        images,
        forms: Vec::new(),
        navigation: Vec::new(),
    }
}

/// Extract the asset list (images plus stylesheet links) from markup.
///
/// Every asset starts out `optimized: false`; optimization detection is a
/// later pipeline concern.
pub fn extract_assets(html: &str) -> Vec<Asset> {
    let mut assets: Vec<Asset> = IMG_RE
        .find_iter(html)
        .filter_map(|m| attr(&SRC_RE, m.as_str()))
        .filter(|src| !src.is_empty())
        .map(|src| Asset {
            kind: AssetKind::Image,
            url: src,
            size: None,
            optimized: false,
        })
        .collect();

    assets.extend(
        STYLESHEET_RE
            .captures_iter(html)
            .map(|cap| Asset {
                kind: AssetKind::Css,
                url: cap[1].to_string(),
                size: None,
                optimized: false,
            }),
    );

    assets
}

fn strip_tags(text: &str) -> String {
    TAG_RE.replace_all(text, "").trim().to_string()
}

fn attr(re: &Regex, tag: &str) -> Option<String> {
    re.captures(tag).map(|cap| cap[1].to_string())
}
