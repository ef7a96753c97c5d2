//! Scoring engine
//!
//! Four independent pure functions, one per dimension. Each starts at 100,
//! applies its ordered deductions, is floor-clamped at 0 and rounded to the
//! nearest integer. The issue hints produced by the AI advisor (or its
//! fallback) only ever deduct, so adding hints can never raise a score.

use crate::models::{AnalysisScores, AnalysisOptions, SiteData};

/// SEO score: title/description quality, heading structure, content length,
/// alt-text coverage.
pub fn seo_score(site: &SiteData, issue_hints: &[String]) -> u32 {
    let mut score = 100.0_f64;

    if site.title.is_empty() || site.title.len() < 30 {
        score -= 20.0;
    }
    if site.title.len() > 60 {
        score -= 10.0;
    }

    if site.description.is_empty() || site.description.len() < 120 {
        score -= 20.0;
    }
    if site.description.len() > 160 {
        score -= 10.0;
    }

    if !site.has_h1() {
        score -= 15.0;
    }
    if site.structure.headings.len() < 3 {
        score -= 10.0;
    }

    if site.content.len() < 300 {
        score -= 15.0;
    }

    let image_count = site.structure.images.len();
    if image_count > 0 {
        score -= (site.images_without_alt() as f64 / image_count as f64) * 15.0;
    }

    score -= hint_penalty(issue_hints, 2.0, 10.0);

    clamp(score)
}

/// Performance score: asset volume, content weight, oversized images.
pub fn performance_score(site: &SiteData, issue_hints: &[String]) -> u32 {
    let mut score = 100.0_f64;

    let image_assets = site.image_asset_count();
    if image_assets > 10 {
        score -= 20.0;
    }
    if image_assets > 20 {
        score -= 30.0;
    }

    if site.content.len() > 50_000 {
        score -= 15.0;
    }

    let has_large_image = site.structure.images.iter().any(|img| {
        img.width.map(|w| w > 1200).unwrap_or(false)
            || img.height.map(|h| h > 800).unwrap_or(false)
    });
    if has_large_image {
        score -= 15.0;
    }

    score -= hint_penalty(issue_hints, 3.0, 15.0);

    clamp(score)
}

/// Accessibility score: alt-text coverage and heading hierarchy.
pub fn accessibility_score(site: &SiteData, issue_hints: &[String]) -> u32 {
    let mut score = 100.0_f64;

    let image_count = site.structure.images.len();
    if image_count > 0 {
        score -= (site.images_without_alt() as f64 / image_count as f64) * 25.0;
    }

    if !site.has_h1() {
        score -= 15.0;
    }
    if site.structure.headings.len() < 2 {
        score -= 10.0;
    }

    score -= hint_penalty(issue_hints, 4.0, 20.0);

    clamp(score)
}

/// UX score: content depth, navigation, structure, call-to-action presence.
pub fn ux_score(site: &SiteData, issue_hints: &[String]) -> u32 {
    let mut score = 100.0_f64;

    if site.content.len() < 500 {
        score -= 20.0;
    }
    if site.title.is_empty() || site.title.len() < 10 {
        score -= 15.0;
    }
    if site.description.is_empty() {
        score -= 15.0;
    }

    if site.structure.links.len() < 2 {
        score -= 10.0;
    }
    if site.structure.headings.is_empty() {
        score -= 15.0;
    }

    if !has_call_to_action(&site.content) {
        score -= 10.0;
    }

    score -= hint_penalty(issue_hints, 2.0, 15.0);

    clamp(score)
}

/// Compute all four scores, honoring the per-dimension option toggles.
///
/// Disabled dimensions score 0 (the original product semantics: a dimension
/// the user didn't pay to analyze reports no quality). UX is always scored.
pub fn score_site(
    site: &SiteData,
    options: &AnalysisOptions,
    seo_hints: &[String],
    performance_hints: &[String],
    accessibility_hints: &[String],
    ux_hints: &[String],
) -> AnalysisScores {
    AnalysisScores {
        seo: if options.seo_analysis {
            seo_score(site, seo_hints)
        } else {
            0
        },
        performance: if options.performance_analysis {
            performance_score(site, performance_hints)
        } else {
            0
        },
        accessibility: if options.accessibility_analysis {
            accessibility_score(site, accessibility_hints)
        } else {
            0
        },
        ux: ux_score(site, ux_hints),
    }
}

fn hint_penalty(hints: &[String], per_hint: f64, cap: f64) -> f64 {
    (hints.len() as f64 * per_hint).min(cap)
}

fn has_call_to_action(content: &str) -> bool {
    let lower = content.to_lowercase();
    lower.contains("contact") || lower.contains("call") || lower.contains("buy")
}

fn clamp(score: f64) -> u32 {
    score.round().max(0.0).min(100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Asset, AssetKind, Heading, ImageElement, Link, LinkKind};

    fn hints(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("issue {}", i)).collect()
    }

    fn healthy_site() -> SiteData {
        let mut site = SiteData::default();
        site.title = "Acme Corporation - Professional Consulting".to_string();
        site.description = "Acme Corporation provides professional consulting services \
                            with decades of combined experience across many different \
                            industries worldwide."
            .to_string();
        site.content = "Contact us today. ".repeat(40);
        site.structure.headings = vec![
            Heading { level: 1, text: "Welcome".into() },
            Heading { level: 2, text: "Services".into() },
            Heading { level: 2, text: "About".into() },
        ];
        site.structure.links = vec![
            Link { href: "/about".into(), text: "About".into(), kind: LinkKind::Internal },
            Link {
                href: "https://example.com".into(),
                text: "Partner".into(),
                kind: LinkKind::External,
            },
        ];
        site
    }

    #[test]
    fn empty_snapshot_scores_are_in_range_and_do_not_panic() {
        let site = SiteData::default();
        for score in [
            seo_score(&site, &[]),
            performance_score(&site, &[]),
            accessibility_score(&site, &[]),
            ux_score(&site, &[]),
        ] {
            assert!(score <= 100);
        }
    }

    #[test]
    fn empty_snapshot_seo_matches_documented_penalties() {
        // Missing title (-20), missing description (-20), no h1 (-15),
        // <3 headings (-10), short content (-15) => 20
        let site = SiteData::default();
        assert_eq!(seo_score(&site, &[]), 20);
        assert!(seo_score(&site, &[]) <= 30);
    }

    #[test]
    fn healthy_site_scores_high() {
        let site = healthy_site();
        assert_eq!(seo_score(&site, &[]), 100);
        assert_eq!(performance_score(&site, &[]), 100);
        assert_eq!(accessibility_score(&site, &[]), 100);
        assert_eq!(ux_score(&site, &[]), 100);
    }

    #[test]
    fn issue_hints_never_increase_any_score() {
        for site in [SiteData::default(), healthy_site()] {
            for n in 1..20 {
                let h = hints(n);
                assert!(seo_score(&site, &h) <= seo_score(&site, &[]));
                assert!(performance_score(&site, &h) <= performance_score(&site, &[]));
                assert!(accessibility_score(&site, &h) <= accessibility_score(&site, &[]));
                assert!(ux_score(&site, &h) <= ux_score(&site, &[]));
            }
        }
    }

    #[test]
    fn hint_penalties_are_capped() {
        let site = healthy_site();
        assert_eq!(seo_score(&site, &hints(50)), 90); // cap 10
        assert_eq!(performance_score(&site, &hints(50)), 85); // cap 15
        assert_eq!(accessibility_score(&site, &hints(50)), 80); // cap 20
        assert_eq!(ux_score(&site, &hints(50)), 85); // cap 15
    }

    #[test]
    fn seo_penalizes_overlong_title_and_description() {
        let mut site = healthy_site();
        site.title = "A".repeat(70);
        site.description = "B".repeat(200);
        // -10 (long title) -10 (long description)
        assert_eq!(seo_score(&site, &[]), 80);
    }

    #[test]
    fn alt_text_penalty_is_proportional() {
        let mut site = healthy_site();
        site.structure.images = vec![
            ImageElement { src: "a.png".into(), alt: "a".into(), width: None, height: None },
            ImageElement { src: "b.png".into(), alt: String::new(), width: None, height: None },
        ];
        // Half the images lack alt: SEO -7.5 -> rounds to 93, accessibility -12.5 -> 88
        assert_eq!(seo_score(&site, &[]), 93);
        assert_eq!(accessibility_score(&site, &[]), 88);
    }

    #[test]
    fn performance_penalizes_heavy_image_use_cumulatively() {
        let mut site = healthy_site();
        site.assets = (0..15)
            .map(|i| Asset {
                kind: AssetKind::Image,
                url: format!("img{}.png", i),
                size: None,
                optimized: false,
            })
            .collect();
        assert_eq!(performance_score(&site, &[]), 80);

        site.assets.extend((15..25).map(|i| Asset {
            kind: AssetKind::Image,
            url: format!("img{}.png", i),
            size: None,
            optimized: false,
        }));
        // >20 image assets: -20 and the further -30
        assert_eq!(performance_score(&site, &[]), 50);
    }

    #[test]
    fn performance_penalizes_oversized_images() {
        let mut site = healthy_site();
        site.structure.images = vec![ImageElement {
            src: "hero.png".into(),
            alt: "hero".into(),
            width: Some(1920),
            height: Some(600),
        }];
        assert_eq!(performance_score(&site, &[]), 85);
    }

    #[test]
    fn ux_detects_call_to_action_case_insensitively() {
        let mut site = healthy_site();
        site.content = "BUY NOW and save. ".repeat(40);
        assert_eq!(ux_score(&site, &[]), 100);

        site.content = "Just some plain descriptive text. ".repeat(20);
        assert_eq!(ux_score(&site, &[]), 90);
    }

    #[test]
    fn floor_clamps_at_zero() {
        let site = SiteData::default();
        // Every UX deduction plus the full hint cap pushes below zero
        assert_eq!(ux_score(&site, &hints(50)), 0);
    }

    #[test]
    fn disabled_dimensions_score_zero() {
        let site = healthy_site();
        let options = AnalysisOptions {
            seo_analysis: false,
            performance_analysis: false,
            accessibility_analysis: false,
            ..AnalysisOptions::default()
        };
        let scores = score_site(&site, &options, &[], &[], &[], &[]);
        assert_eq!(scores.seo, 0);
        assert_eq!(scores.performance, 0);
        assert_eq!(scores.accessibility, 0);
        assert_eq!(scores.ux, 100);
    }
}
