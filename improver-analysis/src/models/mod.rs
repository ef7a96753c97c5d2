//! Data models for the analysis service

pub mod improvement;
pub mod job;
pub mod site;

pub use improvement::{EffortLevel, ImpactLevel, Improvement, ImprovementKind};
pub use job::{
    AnalysisOptions, AnalysisScores, JobResults, JobStatus, JobStatusView, JobSummary,
};
pub use site::{
    Asset, AssetKind, FormElement, Heading, ImageElement, Link, LinkKind, NavigationElement,
    PageStructure, Screenshot, ScreenshotKind, SiteData, SiteMetadata,
};
