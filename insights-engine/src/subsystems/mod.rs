pub mod name_detector;
pub mod prompt_consultant;
pub mod report;
