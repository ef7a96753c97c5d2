//! AI advisor
//!
//! Sends the normalized site snapshot to an OpenAI-compatible text
//! generation service and parses the JSON-shaped reply into typed results.
//! Every external call has a deterministic rule-based fallback: a network
//! failure, a non-2xx status or a reply that does not match the expected
//! schema degrades to the fallback and logs the cause. The advisor can
//! therefore never abort the pipeline.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::AiConfig;
use crate::models::{
    AnalysisOptions, AnalysisScores, EffortLevel, ImpactLevel, Improvement, ImprovementKind,
    SiteData,
};

const SYSTEM_PROMPT: &str = "You are an expert web developer and UX designer specializing in \
    website optimization. Provide specific, actionable recommendations for improving websites.";

/// Advisor call errors; always recovered via fallback, never propagated
#[derive(Debug, Error)]
pub enum AiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Response did not match expected schema: {0}")]
    Schema(String),

    #[error("Empty completion")]
    Empty,
}

/// Issue hints per dimension, consumed by the scoring engine
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteAnalysis {
    pub seo_recommendations: Vec<String>,
    pub performance_issues: Vec<String>,
    pub accessibility_issues: Vec<String>,
    pub ux_suggestions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ImprovementPayload {
    improvements: Vec<Improvement>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// AI advisor client
pub struct AiAdvisor {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl AiAdvisor {
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AiError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Analyze the snapshot into per-dimension issue hints.
    ///
    /// Degrades to [`fallback_analysis`] on any upstream failure.
    pub async fn analyze(&self, site: &SiteData) -> SiteAnalysis {
        let prompt = build_analysis_prompt(site);

        match self.complete(&prompt).await.and_then(|c| parse_analysis(&c)) {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!(url = %site.url, error = %e, "AI analysis failed, using rule-based fallback");
                fallback_analysis(site)
            }
        }
    }

    /// Generate candidate improvements for the snapshot and its scores.
    ///
    /// Degrades to [`fallback_improvements`] on any upstream failure or when
    /// the model returns an empty list.
    pub async fn generate_improvements(
        &self,
        site: &SiteData,
        scores: &AnalysisScores,
        options: &AnalysisOptions,
    ) -> Vec<Improvement> {
        let prompt = build_improvement_prompt(site, scores);

        match self
            .complete(&prompt)
            .await
            .and_then(|c| parse_improvements(&c))
        {
            Ok(improvements) if !improvements.is_empty() => improvements,
            Ok(_) => {
                tracing::debug!(url = %site.url, "AI returned no improvements, using fallback");
                fallback_improvements(site, scores, options)
            }
            Err(e) => {
                tracing::warn!(url = %site.url, error = %e, "AI improvement generation failed, using fallback");
                fallback_improvements(site, scores, options)
            }
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        let endpoint = format!("{}/v1/chat/completions", self.base_url);

        let response = self
            .http_client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": prompt },
                ],
                "max_tokens": self.max_tokens,
                "temperature": self.temperature,
            }))
            .send()
            .await
            .map_err(|e| AiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AiError::Api(status.as_u16(), detail));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AiError::Schema(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(AiError::Empty);
        }
        Ok(content)
    }
}

fn build_analysis_prompt(site: &SiteData) -> String {
    let headings = site
        .structure
        .headings
        .iter()
        .map(|h| format!("H{}: {}", h.level, truncate(&h.text, 50)))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Analyze this website and provide specific improvement recommendations:\n\
         \n\
         Website URL: {url}\n\
         Title: {title}\n\
         Description: {description}\n\
         Content Length: {content_len} characters\n\
         \n\
         Structure:\n\
         - Headings: {heading_count} ({headings})\n\
         - Links: {link_count}\n\
         - Images: {image_count}\n\
         \n\
         Assets: {asset_count} total assets\n\
         \n\
         Please analyze and provide:\n\
         1. SEO improvements (title, meta description, headings, content structure)\n\
         2. Performance optimizations (images, loading speed, asset optimization)\n\
         3. Accessibility enhancements (alt text, contrast, keyboard navigation)\n\
         4. UX improvements (layout, navigation, call-to-actions)\n\
         \n\
         Format your response as JSON with this structure:\n\
         {{\n\
           \"seoRecommendations\": [\"recommendation1\", \"recommendation2\"],\n\
           \"performanceIssues\": [\"issue1\", \"issue2\"],\n\
           \"accessibilityIssues\": [\"issue1\", \"issue2\"],\n\
           \"uxSuggestions\": [\"suggestion1\", \"suggestion2\"]\n\
         }}",
        url = site.url,
        title = site.title,
        description = site.description,
        content_len = site.content.len(),
        heading_count = site.structure.headings.len(),
        headings = headings,
        link_count = site.structure.links.len(),
        image_count = site.structure.images.len(),
        asset_count = site.assets.len(),
    )
}

fn build_improvement_prompt(site: &SiteData, scores: &AnalysisScores) -> String {
    format!(
        "Generate specific, actionable improvements for this website:\n\
         \n\
         Website: {url}\n\
         Title: {title}\n\
         Current Scores:\n\
         - SEO: {seo}/100\n\
         - Performance: {performance}/100\n\
         - Accessibility: {accessibility}/100\n\
         - UX: {ux}/100\n\
         \n\
         Content: {content}...\n\
         \n\
         Generate 3-5 high-impact improvements. For each improvement, provide:\n\
         - A unique ID\n\
         - Type (seo, performance, accessibility, layout, content)\n\
         - Title (concise description)\n\
         - Description (detailed explanation)\n\
         - Impact level (low, medium, high)\n\
         - Effort level (low, medium, high)\n\
         - Before/after examples\n\
         - Whether it can be auto-applied\n\
         \n\
         Format as JSON:\n\
         {{\n\
           \"improvements\": [\n\
             {{\n\
               \"id\": \"unique-id\",\n\
               \"type\": \"seo|performance|accessibility|layout|content\",\n\
               \"title\": \"Short title\",\n\
               \"description\": \"Detailed description\",\n\
               \"impact\": \"low|medium|high\",\n\
               \"effort\": \"low|medium|high\",\n\
               \"before\": \"Current state\",\n\
               \"after\": \"Improved state\",\n\
               \"autoApplicable\": true\n\
             }}\n\
           ]\n\
         }}",
        url = site.url,
        title = site.title,
        seo = scores.seo,
        performance = scores.performance,
        accessibility = scores.accessibility,
        ux = scores.ux,
        content = truncate(&site.content, 1000),
    )
}

/// Parse the analysis completion. All four lists must be present; anything
/// else is a schema mismatch that triggers the fallback.
pub fn parse_analysis(content: &str) -> Result<SiteAnalysis, AiError> {
    serde_json::from_str(content).map_err(|e| AiError::Schema(e.to_string()))
}

/// Parse the improvement completion into the typed Improvement shape
pub fn parse_improvements(content: &str) -> Result<Vec<Improvement>, AiError> {
    let payload: ImprovementPayload =
        serde_json::from_str(content).map_err(|e| AiError::Schema(e.to_string()))?;
    Ok(payload.improvements)
}

/// Deterministic rule-based analysis, used proactively as the safety net
pub fn fallback_analysis(site: &SiteData) -> SiteAnalysis {
    let mut analysis = SiteAnalysis::default();

    if site.title.is_empty() || site.title.len() < 30 {
        analysis
            .seo_recommendations
            .push("Improve page title length and descriptiveness".to_string());
    }
    if site.description.is_empty() || site.description.len() < 120 {
        analysis
            .seo_recommendations
            .push("Add or improve meta description".to_string());
    }

    if site.image_asset_count() > 10 {
        analysis
            .performance_issues
            .push("Consider optimizing or reducing the number of images".to_string());
    }

    if site.images_without_alt() > 0 {
        analysis
            .accessibility_issues
            .push("Add alt text to images for screen readers".to_string());
    }

    if site.structure.headings.is_empty() {
        analysis
            .ux_suggestions
            .push("Add proper heading structure for better content organization".to_string());
    }

    analysis
}

/// Deterministic rule-based improvements: at most one per dimension, gated
/// by the dimension's score threshold and a concrete structural deficiency.
pub fn fallback_improvements(
    site: &SiteData,
    scores: &AnalysisScores,
    options: &AnalysisOptions,
) -> Vec<Improvement> {
    let mut improvements = Vec::new();

    if options.seo_analysis && scores.seo < 80 {
        if site.title.is_empty() || site.title.len() < 30 {
            improvements.push(Improvement {
                id: "seo-title-optimization".to_string(),
                kind: ImprovementKind::Seo,
                title: "Optimize page title".to_string(),
                description: "The page title should be more descriptive, include target \
                              keywords, and be between 30-60 characters for optimal SEO \
                              performance."
                    .to_string(),
                impact: ImpactLevel::High,
                effort: EffortLevel::Low,
                before: if site.title.is_empty() {
                    "No title".to_string()
                } else {
                    site.title.clone()
                },
                after: format!(
                    "{} - Professional Services & Expert Solutions",
                    if site.title.is_empty() { "Your Business" } else { &site.title }
                ),
                auto_applicable: true,
            });
        } else if site.description.is_empty() || site.description.len() < 120 {
            improvements.push(Improvement {
                id: "seo-meta-description".to_string(),
                kind: ImprovementKind::Seo,
                title: "Add compelling meta description".to_string(),
                description: "A well-crafted meta description between 120-160 characters \
                              improves click-through rates from search results."
                    .to_string(),
                impact: ImpactLevel::High,
                effort: EffortLevel::Low,
                before: if site.description.is_empty() {
                    "No meta description".to_string()
                } else {
                    site.description.clone()
                },
                after: "Professional services and expert solutions tailored to your needs. \
                        Contact us today for outstanding results and personalized consultation."
                    .to_string(),
                auto_applicable: true,
            });
        }
    }

    if options.performance_analysis && scores.performance < 70 {
        let image_assets = site.image_asset_count();
        if image_assets > 5 {
            improvements.push(Improvement {
                id: "performance-image-optimization".to_string(),
                kind: ImprovementKind::Performance,
                title: "Optimize images for faster loading".to_string(),
                description: "Compress images, convert to modern formats like WebP, and \
                              implement lazy loading to significantly improve page speed."
                    .to_string(),
                impact: ImpactLevel::High,
                effort: EffortLevel::Medium,
                before: format!("{} unoptimized images affecting load time", image_assets),
                after: "Compressed WebP images with lazy loading and appropriate sizing"
                    .to_string(),
                auto_applicable: false,
            });
        }
    }

    if options.accessibility_analysis && scores.accessibility < 80 {
        let missing_alt = site.images_without_alt();
        if missing_alt > 0 {
            improvements.push(Improvement {
                id: "accessibility-alt-text".to_string(),
                kind: ImprovementKind::Accessibility,
                title: "Add descriptive alt text to images".to_string(),
                description: "Provide meaningful alt text for all images to ensure screen \
                              reader users can understand the visual content."
                    .to_string(),
                impact: ImpactLevel::High,
                effort: EffortLevel::Low,
                before: format!("{} images missing alt text", missing_alt),
                after: "All images have descriptive, contextual alt text".to_string(),
                auto_applicable: true,
            });
        }
    }

    if scores.ux < 75 {
        if site.structure.headings.len() < 2 {
            improvements.push(Improvement {
                id: "ux-content-structure".to_string(),
                kind: ImprovementKind::Content,
                title: "Improve content organization".to_string(),
                description: "Add clear headings and structure to make content more \
                              scannable and user-friendly."
                    .to_string(),
                impact: ImpactLevel::Medium,
                effort: EffortLevel::Low,
                before: "Unstructured content without clear hierarchy".to_string(),
                after: "Well-organized content with clear headings and logical flow"
                    .to_string(),
                auto_applicable: true,
            });
        } else if !has_call_to_action(&site.content) {
            improvements.push(Improvement {
                id: "ux-call-to-action".to_string(),
                kind: ImprovementKind::Layout,
                title: "Add clear call-to-action".to_string(),
                description: "Include prominent, action-oriented buttons that guide users \
                              toward desired actions."
                    .to_string(),
                impact: ImpactLevel::High,
                effort: EffortLevel::Low,
                before: "No clear call-to-action elements".to_string(),
                after: "Prominent \"Contact Us\" and \"Get Started\" buttons with compelling copy"
                    .to_string(),
                auto_applicable: true,
            });
        }
    }

    improvements
}

fn has_call_to_action(content: &str) -> bool {
    let lower = content.to_lowercase();
    lower.contains("contact") || lower.contains("call") || lower.contains("buy")
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
