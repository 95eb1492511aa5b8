use insights_core::models::{InsightsReport, SectionOrigin};

/// Used when the consultant produced nothing.
pub const DEFAULT_SUGGESTIONS: [&str; 5] = [
    "Be specific about the outcome you want and the format of the answer.",
    "Give the assistant the context it needs: audience, constraints and prior attempts.",
    "Break large requests into smaller steps and build on each answer.",
    "Include examples of the input you have and the output you expect.",
    "Ask the assistant to explain its reasoning so you can check and refine it.",
];

/// Combine the inferred name and suggestions with the conversation count.
/// Every analytics leaf other than `overview.total_chats` keeps its default.
pub fn assemble_report(
    user_name: String,
    suggestions: Vec<String>,
    conversation_count: usize,
) -> InsightsReport {
    let suggestions = if suggestions.is_empty() {
        DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
    } else {
        suggestions
    };

    let mut report = InsightsReport {
        user_name,
        suggestions,
        ..InsightsReport::default()
    };
    report.user_analysis.overview.total_chats = conversation_count as u64;
    report.section_origins.overview = SectionOrigin::Partial;
    report
}
