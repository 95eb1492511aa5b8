use std::fmt::Write;

use chrono::{DateTime, Local};

use insights_core::{InsightsError, InsightsReport, Result};

use super::{ReportRenderer, FOOTER_TEXT, REPORT_TITLE};

const STYLES: &str = r#"
    body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 0; background: #f6f7f9; color: #1f2328; }
    main { max-width: 760px; margin: 40px auto; padding: 32px 40px; background: #fff; border-radius: 12px; box-shadow: 0 1px 3px rgba(0,0,0,.08); }
    h1 { text-align: center; margin-bottom: 4px; }
    .greeting { text-align: center; font-size: 1.4em; margin: 8px 0; }
    .intro { text-align: center; color: #57606a; }
    h2 { border-bottom: 1px solid #d0d7de; padding-bottom: 4px; margin-top: 32px; }
    .stats { display: flex; gap: 16px; }
    .stat { flex: 1; background: #f6f8fa; border-radius: 8px; padding: 12px; text-align: center; }
    .stat .value { font-size: 1.6em; font-weight: 600; }
    li { margin-bottom: 8px; line-height: 1.45; }
    footer { text-align: center; color: #8c959f; font-size: .85em; margin-top: 40px; }
"#;

/// Self-contained HTML page with inline styles and no scripts.
pub struct HtmlRenderer {
    generated_at: DateTime<Local>,
}

impl HtmlRenderer {
    pub fn new(generated_at: DateTime<Local>) -> Self {
        Self { generated_at }
    }

    fn build(&self, report: &InsightsReport) -> std::result::Result<String, std::fmt::Error> {
        let overview = &report.user_analysis.overview;
        let mut body = String::new();

        writeln!(body, "<h1>{}</h1>", html_escape(REPORT_TITLE))?;
        writeln!(body, r#"<p class="greeting">Hi {}!</p>"#, html_escape(&report.user_name))?;
        writeln!(
            body,
            r#"<p class="intro">Here's your personalized analysis of ChatGPT interactions.</p>"#
        )?;

        writeln!(body, "<section><h2>Overview</h2>")?;
        writeln!(body, r#"<div class="stats">"#)?;
        for (label, value) in [
            ("Total Chats", overview.total_chats),
            ("Total Words", overview.total_words_used),
            ("Total Prompts", overview.total_prompts),
        ] {
            writeln!(
                body,
                r#"<div class="stat"><div class="value">{}</div><div>{}</div></div>"#,
                value, label
            )?;
        }
        writeln!(body, "</div></section>")?;

        if !report.suggestions.is_empty() {
            writeln!(body, "<section><h2>Prompt Improvement Suggestions</h2><ol>")?;
            for suggestion in &report.suggestions {
                writeln!(body, "<li>{}</li>", html_escape(suggestion))?;
            }
            writeln!(body, "</ol></section>")?;
        }

        writeln!(body, "<section><h2>Recommendations</h2>")?;
        render_list(&mut body, "Tips to Improve", &report.recommendations.tips_to_improve)?;
        render_list(
            &mut body,
            "Suggested Topics",
            &report.recommendations.suggested_topics_to_explore,
        )?;
        render_list(
            &mut body,
            "Interaction Changes",
            &report.recommendations.recommended_interaction_changes,
        )?;
        render_list(
            &mut body,
            "Things to Try",
            &report.recommendations.experimentation_suggestions,
        )?;
        writeln!(body, "</section>")?;

        let date = self.generated_at.format("%Y-%m-%d").to_string();
        writeln!(
            body,
            "<footer><p>{}</p><p>Generated on: <time datetime=\"{}\">{}</time></p></footer>",
            html_escape(FOOTER_TEXT),
            date,
            date
        )?;

        let mut page = String::with_capacity(body.len() + STYLES.len() + 256);
        write!(
            page,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
             <title>{title} - {name}</title>\n<style>{styles}</style>\n</head>\n\
             <body>\n<main>\n{body}</main>\n</body>\n</html>\n",
            title = html_escape(REPORT_TITLE),
            name = html_escape(&report.user_name),
            styles = STYLES,
            body = body,
        )?;
        Ok(page)
    }
}

fn render_list(out: &mut String, heading: &str, items: &[String]) -> std::fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(out, "<h3>{}</h3><ul>", heading)?;
    for item in items {
        writeln!(out, "<li>{}</li>", html_escape(item))?;
    }
    writeln!(out, "</ul>")
}

impl ReportRenderer for HtmlRenderer {
    fn render(&self, report: &InsightsReport) -> Result<Vec<u8>> {
        self.build(report)
            .map(String::into_bytes)
            .map_err(|e| InsightsError::Render(format!("html: {}", e)))
    }
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
