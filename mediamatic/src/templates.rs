//! Canned analysis prompts
//!
//! Each template carries a display name, a short description and a default
//! prompt. The prompt may be customized before it is sent; the history
//! ledger records template runs as `Template: <name>`.

use serde::Serialize;

/// Available analysis templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisTemplate {
    /// Engagement metrics across post types and time periods
    EngagementAnalysis,
    /// Reels vs images vs carousels
    ContentPerformance,
    /// Audience behavior and preferences
    AudienceInsights,
    /// Performance against industry benchmarks
    CompetitorAnalysis,
}

impl AnalysisTemplate {
    pub const ALL: [AnalysisTemplate; 4] = [
        Self::EngagementAnalysis,
        Self::ContentPerformance,
        Self::AudienceInsights,
        Self::CompetitorAnalysis,
    ];

    /// Parse a template from its id ("engagement_analysis") or display name
    /// ("Engagement Analysis"), ignoring case
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "engagement_analysis" => Some(Self::EngagementAnalysis),
            "content_performance" => Some(Self::ContentPerformance),
            "audience_insights" => Some(Self::AudienceInsights),
            "competitor_analysis" => Some(Self::CompetitorAnalysis),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::EngagementAnalysis => "engagement_analysis",
            Self::ContentPerformance => "content_performance",
            Self::AudienceInsights => "audience_insights",
            Self::CompetitorAnalysis => "competitor_analysis",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::EngagementAnalysis => "Engagement Analysis",
            Self::ContentPerformance => "Content Performance",
            Self::AudienceInsights => "Audience Insights",
            Self::CompetitorAnalysis => "Competitor Analysis",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::EngagementAnalysis => {
                "Analyze engagement metrics across different post types and time periods"
            }
            Self::ContentPerformance => "Evaluate how different content types perform across metrics",
            Self::AudienceInsights => "Understand audience behavior and preferences",
            Self::CompetitorAnalysis => "Compare performance against industry benchmarks",
        }
    }

    /// Default prompt sent when the template is run unmodified
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::EngagementAnalysis => {
                "Analyze the engagement metrics for our social media posts including engagement rates, best performing content, and trends over time."
            }
            Self::ContentPerformance => {
                "Evaluate the performance comparison between Reels, Images, and Carousels, including views, shares, and engagement metrics."
            }
            Self::AudienceInsights => {
                "Analyze our audience behavior including engagement patterns and content preferences."
            }
            Self::CompetitorAnalysis => {
                "Compare our social media performance with industry standards including engagement rates and content strategy."
            }
        }
    }

    /// Prompt text recorded in the history ledger
    pub fn history_label(&self) -> String {
        format!("Template: {}", self.name())
    }

    pub fn info(&self) -> TemplateInfo {
        TemplateInfo {
            id: self.id(),
            name: self.name(),
            description: self.description(),
            prompt: self.prompt(),
        }
    }
}

impl std::fmt::Display for AnalysisTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Serializable description of a template
#[derive(Debug, Clone, Serialize)]
pub struct TemplateInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub prompt: &'static str,
}
