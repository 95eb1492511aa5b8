//! End-to-end run: archive → conversations → name + suggestions → report → artifacts.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::time::Instant;
use uuid::Uuid;

use insights_core::{
    Conversation, Conversations, InsightsConfig, InsightsError, InsightsReport, ModelError, Result,
    StructuredModel, TimeoutModel,
};
use insights_ingest::ArchiveLoader;

use crate::render::{ReportArtifacts, WrittenArtifacts};
use crate::subsystems::name_detector::{NameDetector, NameDetectorConfig};
use crate::subsystems::prompt_consultant::PromptConsultant;
use crate::subsystems::report::assemble_report;

#[derive(Debug, Clone)]
pub enum OutputMode {
    /// Keep the rendered documents in memory only.
    InMemory,
    Directory(PathBuf),
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub run_id: Uuid,
    pub report: InsightsReport,
    pub artifacts: ReportArtifacts,
    pub written: Option<WrittenArtifacts>,
}

pub struct InsightsPipeline {
    model: Arc<dyn StructuredModel>,
    config: InsightsConfig,
    loader: ArchiveLoader,
}

impl InsightsPipeline {
    pub fn new(model: Arc<dyn StructuredModel>, config: InsightsConfig) -> Self {
        Self {
            model,
            config,
            loader: ArchiveLoader::new(),
        }
    }

    pub fn with_loader(mut self, loader: ArchiveLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Validate, extract and parse an export. Extraction is blocking file IO
    /// and runs off the async workers.
    pub async fn process_archive(&self, path: &Path) -> Result<Conversations> {
        let loader = self.loader.clone();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || loader.load(&path))
            .await
            .map_err(|e| InsightsError::Io(std::io::Error::other(e)))?
    }

    /// Name detection then prompt analysis, bounded by a fresh run deadline.
    pub async fn generate_report(&self, conversations: &[Conversation]) -> Result<InsightsReport> {
        let clock = RunClock::start(self.config.pipeline.run_timeout_secs);
        self.generate_report_within(conversations, &clock).await
    }

    async fn generate_report_within(
        &self,
        conversations: &[Conversation],
        clock: &RunClock,
    ) -> Result<InsightsReport> {
        let model: Arc<dyn StructuredModel> = Arc::new(
            TimeoutModel::new(
                self.model.clone(),
                Duration::from_secs(self.config.pipeline.call_timeout_secs),
            )
            .with_deadline(clock.deadline),
        );
        let detector = NameDetector::new(
            model.clone(),
            NameDetectorConfig::from(&self.config.analysis),
        );
        let consultant = PromptConsultant::from_config(model, &self.config.analysis);

        let user_name = clock
            .bound("name detection", detector.detect_name(conversations))
            .await?;
        let suggestions = clock
            .bound("prompt analysis", consultant.analyze_all_prompts(conversations))
            .await?;

        Ok(assemble_report(user_name, suggestions, conversations.len()))
    }

    /// The run deadline covers extraction, analysis and writing the output.
    pub async fn run(&self, archive: &Path, output: OutputMode) -> Result<RunOutput> {
        let run_id = Uuid::new_v4();
        let clock = RunClock::start(self.config.pipeline.run_timeout_secs);
        tracing::info!(%run_id, archive = %archive.display(), model = self.model.name(), "Starting insights run");

        let conversations = clock
            .bound("archive extraction", self.process_archive(archive))
            .await?;
        let report = self.generate_report_within(&conversations, &clock).await?;
        let artifacts = ReportArtifacts::render(&report, Local::now())?;

        let written = match output {
            OutputMode::InMemory => None,
            OutputMode::Directory(dir) => Some(
                clock
                    .bound(
                        "report output",
                        artifacts.write_to(&dir, &self.config.output.file_prefix),
                    )
                    .await?,
            ),
        };

        tracing::info!(%run_id, user_name = %report.user_name, "Insights run complete");
        Ok(RunOutput {
            run_id,
            report,
            artifacts,
            written,
        })
    }
}

struct RunClock {
    started: Instant,
    deadline: Instant,
}

impl RunClock {
    fn start(run_timeout_secs: u64) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: started + Duration::from_secs(run_timeout_secs),
        }
    }

    /// Await one stage under the run deadline. A model timeout that
    /// coincides with the deadline is reported as the run timing out.
    async fn bound<T, E, F>(&self, stage: &str, work: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: Into<InsightsError>,
    {
        let timed_out = || {
            tracing::warn!(stage, "Run deadline exceeded");
            InsightsError::Timeout {
                stage: stage.to_string(),
                elapsed: self.started.elapsed(),
            }
        };

        match tokio::time::timeout_at(self.deadline, work).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => match e.into() {
                InsightsError::Model(ModelError::Timeout(_)) if Instant::now() >= self.deadline => {
                    Err(timed_out())
                }
                other => Err(other),
            },
            Err(_) => Err(timed_out()),
        }
    }
}
