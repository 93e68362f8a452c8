//! End of test reports.
//!
//! [`handle_summary`] writes `summary.html` and `summary.json` into the configured directory and
//! prints the text summary to stdout.
mod html;
mod json;
mod text;

pub use html::render_html;
pub use json::render_json;
pub use text::{render_text, TextOptions};

use booker_core::Summary;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const HTML_REPORT: &str = "summary.html";
pub const JSON_REPORT: &str = "summary.json";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize summary: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to render HTML report: {0}")]
    Template(#[from] handlebars::RenderError),
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub dir: PathBuf,
    pub stdout: bool,
    pub text: TextOptions,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            stdout: true,
            text: TextOptions::default(),
        }
    }
}

/// Write every report for `summary`, returning the paths of the files written.
pub fn handle_summary(summary: &Summary, config: &ReportConfig) -> Result<Vec<PathBuf>, ReportError> {
    let html = config.dir.join(HTML_REPORT);
    write_file(&html, render_html(summary)?.as_bytes())?;

    let json = config.dir.join(JSON_REPORT);
    write_file(&json, render_json(summary)?.as_bytes())?;

    if config.stdout {
        let text = render_text(summary, &config.text);
        std::io::stdout()
            .lock()
            .write_all(text.as_bytes())
            .map_err(|source| ReportError::Io {
                path: PathBuf::from("<stdout>"),
                source,
            })?;
    }

    info!("Reports written to {}", config.dir.display());
    Ok(vec![html, json])
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), ReportError> {
    std::fs::write(path, contents).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}
