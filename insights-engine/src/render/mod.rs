//! Report renderers and artifact output.
//!
//! A run produces two documents from one [`InsightsReport`]: a standalone
//! HTML page and a PDF. Both are built in memory; [`ReportArtifacts::write_to`]
//! persists them side by side under a timestamped name.

pub mod html;
pub mod pdf;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use insights_core::{InsightsReport, Result};

pub use html::HtmlRenderer;
pub use pdf::PdfRenderer;

pub const REPORT_TITLE: &str = "ChatGPT Insights Report";
pub const FOOTER_TEXT: &str = "Generated by ChatGPT Insights - ShinCy Labs";

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

pub trait ReportRenderer: Send + Sync {
    fn render(&self, report: &InsightsReport) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct ReportArtifacts {
    pub html: Vec<u8>,
    pub pdf: Vec<u8>,
    pub generated_at: DateTime<Local>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WrittenArtifacts {
    pub html_path: PathBuf,
    pub pdf_path: PathBuf,
}

impl ReportArtifacts {
    pub fn render(report: &InsightsReport, generated_at: DateTime<Local>) -> Result<Self> {
        let html = HtmlRenderer::new(generated_at).render(report)?;
        let pdf = PdfRenderer::new(generated_at).render(report)?;
        tracing::debug!(html_bytes = html.len(), pdf_bytes = pdf.len(), "Report rendered");

        Ok(Self {
            html,
            pdf,
            generated_at,
        })
    }

    /// `<prefix>-<timestamp>.html` and `.pdf` in `directory`, created if
    /// missing. A failed PDF write removes the HTML file again so a run
    /// never leaves half its output behind.
    pub async fn write_to(&self, directory: &Path, prefix: &str) -> Result<WrittenArtifacts> {
        tokio::fs::create_dir_all(directory).await?;

        let stem = format!("{}-{}", prefix, self.generated_at.format(TIMESTAMP_FORMAT));
        let html_path = directory.join(format!("{}.html", stem));
        let pdf_path = directory.join(format!("{}.pdf", stem));

        tokio::fs::write(&html_path, &self.html).await?;
        if let Err(e) = tokio::fs::write(&pdf_path, &self.pdf).await {
            if let Err(cleanup) = tokio::fs::remove_file(&html_path).await {
                tracing::warn!(path = %html_path.display(), error = %cleanup, "Failed to remove partial report");
            }
            return Err(e.into());
        }

        tracing::info!(
            html = %html_path.display(),
            pdf = %pdf_path.display(),
            "Report written"
        );
        Ok(WrittenArtifacts {
            html_path,
            pdf_path,
        })
    }
}
