//! The insights report handed to the renderers.
//!
//! Most analytics leaves have no producer yet and hold fixed defaults (zero,
//! empty, `"Neutral"`). `section_origins` records which sections carry
//! computed data so a default zero can be told apart from a measured one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const NEUTRAL: &str = "Neutral";
pub const DEFAULT_PRIMARY_LANGUAGE: &str = "English";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightsReport {
    pub user_name: String,
    pub suggestions: Vec<String>,
    pub user_analysis: UserAnalysis,
    pub visualizations: Visualizations,
    pub recommendations: Recommendations,
    pub section_origins: SectionOrigins,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionOrigin {
    #[default]
    Placeholder,
    /// Some leaves computed, the rest defaults.
    Partial,
    Computed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionOrigins {
    pub overview: SectionOrigin,
    pub topics_analysis: SectionOrigin,
    pub prompting_style: SectionOrigin,
    pub sentiment_analysis: SectionOrigin,
    pub response_quality: SectionOrigin,
    pub interaction_patterns: SectionOrigin,
    pub advanced_insights: SectionOrigin,
    pub communication_effectiveness: SectionOrigin,
    pub ai_utilization_patterns: SectionOrigin,
    pub personalization_metrics: SectionOrigin,
    pub diversity_metrics: SectionOrigin,
    pub errors_and_ambiguities: SectionOrigin,
    pub visualizations: SectionOrigin,
    pub recommendations: SectionOrigin,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserAnalysis {
    pub overview: Overview,
    pub topics_analysis: TopicsAnalysis,
    pub prompting_style: PromptingStyle,
    pub sentiment_analysis: SentimentAnalysis,
    pub response_quality: ResponseQuality,
    pub interaction_patterns: InteractionPatterns,
    pub advanced_insights: AdvancedInsights,
    pub communication_effectiveness: CommunicationEffectiveness,
    pub ai_utilization_patterns: AiUtilizationPatterns,
    pub personalization_metrics: PersonalizationMetrics,
    pub diversity_metrics: DiversityMetrics,
    pub errors_and_ambiguities: ErrorsAndAmbiguities,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub total_chats: u64,
    pub total_words_used: u64,
    pub total_prompts: u64,
    pub average_prompt_length: f64,
    pub average_response_length: f64,
    pub most_active_days: Vec<String>,
    pub most_active_hours: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicsAnalysis {
    pub most_frequent_topics: Vec<String>,
    pub topic_histogram: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptingStyle {
    pub common_phrases: Vec<String>,
    pub average_prompt_tone: String,
    pub most_used_keywords: Vec<String>,
    pub query_complexity_distribution: ComplexityDistribution,
    pub prompt_efficiency: PromptEfficiency,
}

impl Default for PromptingStyle {
    fn default() -> Self {
        Self {
            common_phrases: Vec::new(),
            average_prompt_tone: NEUTRAL.to_string(),
            most_used_keywords: Vec::new(),
            query_complexity_distribution: ComplexityDistribution::default(),
            prompt_efficiency: PromptEfficiency::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityDistribution {
    pub simple: u64,
    pub moderate: u64,
    pub complex: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptEfficiency {
    pub average_follow_up_prompts: f64,
    pub percentage_prompts_needing_rephrasing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    pub overall_sentiment: String,
    pub sentiment_distribution: SentimentDistribution,
    pub common_positive_topics: Vec<String>,
    pub common_negative_topics: Vec<String>,
}

impl Default for SentimentAnalysis {
    fn default() -> Self {
        Self {
            overall_sentiment: NEUTRAL.to_string(),
            sentiment_distribution: SentimentDistribution::default(),
            common_positive_topics: Vec::new(),
            common_negative_topics: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseQuality {
    pub average_response_relevance: f64,
    pub common_feedback_keywords: Vec<String>,
    pub most_helpful_topics: Vec<String>,
    pub least_helpful_topics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionPatterns {
    pub usage_frequency: UsageFrequency,
    pub time_of_day_preference: TimeOfDayPreference,
    pub conversation_length_distribution: LengthDistribution,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageFrequency {
    pub daily_average: f64,
    pub weekly_average: f64,
    pub monthly_average: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDayPreference {
    pub morning: u64,
    pub afternoon: u64,
    pub evening: u64,
    pub night: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthDistribution {
    pub short: u64,
    pub medium: u64,
    pub long: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvancedInsights {
    pub emerging_interest: EmergingInterest,
    pub redundant_queries: u64,
    pub most_improved_topic_knowledge: String,
    pub topic_diversity_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergingInterest {
    pub topic: String,
    pub increase_in_prompts: u64,
    pub time_period: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunicationEffectiveness {
    pub response_clarity_score: f64,
    pub length_matching: LengthMatching,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthMatching {
    pub short_prompts: u64,
    pub long_prompts: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiUtilizationPatterns {
    pub task_based_analysis: TaskBasedAnalysis,
    pub dependency_index: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBasedAnalysis {
    pub problem_solving: u64,
    pub creative_exploration: u64,
    pub knowledge_inquiry: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalizationMetrics {
    pub tone_alignment: ToneAlignment,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToneAlignment {
    pub preferred_tone: String,
    pub alignment_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiversityMetrics {
    pub language_usage: LanguageUsage,
    pub cross_disciplinary_interests: CrossDisciplinaryInterests,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageUsage {
    pub primary_language: String,
    pub other_languages: Vec<String>,
    pub percentage_non_primary_language: f64,
}

impl Default for LanguageUsage {
    fn default() -> Self {
        Self {
            primary_language: DEFAULT_PRIMARY_LANGUAGE.to_string(),
            other_languages: Vec::new(),
            percentage_non_primary_language: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossDisciplinaryInterests {
    pub science: u64,
    pub art: u64,
    pub business: u64,
    pub miscellaneous: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorsAndAmbiguities {
    pub misunderstood_queries: u64,
    pub percentage_prompts_with_errors: f64,
    pub common_error_causes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visualizations {
    pub topic_histogram_url: String,
    pub usage_timeline_url: String,
    pub dynamic_word_cloud_url: String,
    pub response_time_chart_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendations {
    pub tips_to_improve: Vec<String>,
    pub suggested_topics_to_explore: Vec<String>,
    pub recommended_interaction_changes: Vec<String>,
    pub experimentation_suggestions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_text_leaves() {
        let analysis = UserAnalysis::default();
        assert_eq!(analysis.prompting_style.average_prompt_tone, "Neutral");
        assert_eq!(analysis.sentiment_analysis.overall_sentiment, "Neutral");
        assert_eq!(analysis.diversity_metrics.language_usage.primary_language, "English");
        assert_eq!(analysis.personalization_metrics.tone_alignment.preferred_tone, "");
    }

    #[test]
    fn test_serialized_shape() {
        let report = InsightsReport::default();
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["user_analysis"]["overview"]["total_chats"], 0);
        assert_eq!(
            value["user_analysis"]["topics_analysis"]["topic_histogram"],
            serde_json::json!({})
        );
        assert_eq!(
            value["user_analysis"]["prompting_style"]["query_complexity_distribution"],
            serde_json::json!({"simple": 0, "moderate": 0, "complex": 0})
        );
        assert_eq!(value["section_origins"]["overview"], "placeholder");
        assert_eq!(value["visualizations"]["topic_histogram_url"], "");

        // fractional metrics keep their float type even when zero
        let overview = &value["user_analysis"]["overview"];
        assert!(overview["average_prompt_length"].is_f64());
        assert_eq!(overview["average_prompt_length"].as_f64(), Some(0.0));
        let frequency = &value["user_analysis"]["interaction_patterns"]["usage_frequency"];
        assert!(frequency["daily_average"].is_f64());

        let text = serde_json::to_string(&report).unwrap();
        assert!(text.contains(r#""average_prompt_length":0.0"#), "got {text}");
        assert!(text.contains(r#""total_chats":0,"#), "got {text}");
    }
}
