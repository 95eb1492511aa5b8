pub mod pipeline;
pub mod render;
pub mod subsystems;

pub use pipeline::{InsightsPipeline, OutputMode, RunOutput};
pub use render::{HtmlRenderer, PdfRenderer, ReportArtifacts, ReportRenderer, WrittenArtifacts};
pub use subsystems::name_detector::{NameDetector, NameDetectorConfig, UNKNOWN_USER_NAME};
pub use subsystems::prompt_consultant::{
    select_suggestions, BatchedConsultant, PerPromptConsultant, PromptAnalyzer, PromptConsultant,
};
pub use subsystems::report::{assemble_report, DEFAULT_SUGGESTIONS};
