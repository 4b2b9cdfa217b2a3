//! HTML to downloadable-file conversion.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        source: std::io::Error,
    },

    #[error("renderer io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("renderer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("renderer produced no output")]
    Empty,
}

#[async_trait]
pub trait ReceiptRenderer: Send + Sync {
    fn content_type(&self) -> &'static str;

    /// File extension of the rendered output, without the dot.
    fn extension(&self) -> &'static str;

    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError>;
}

/// Converts HTML to PDF with an external `wkhtmltopdf` binary, reading
/// the page from stdin and the PDF from stdout.
#[derive(Debug, Clone)]
pub struct WkhtmltopdfRenderer {
    binary: PathBuf,
}

impl WkhtmltopdfRenderer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl ReceiptRenderer for WkhtmltopdfRenderer {
    fn content_type(&self) -> &'static str {
        "application/pdf"
    }

    fn extension(&self) -> &'static str {
        "pdf"
    }

    #[instrument(skip(self, html), fields(binary = %self.binary.display(), html_len = html.len()), err)]
    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        let mut child = Command::new(&self.binary)
            .args(["--quiet", "--encoding", "utf-8", "-", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RenderError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            })?;

        // Feed stdin concurrently so a full stdout pipe cannot stall us.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = html.as_bytes().to_vec();
            tokio::spawn(async move {
                stdin.write_all(&input).await?;
                stdin.shutdown().await
            })
        });

        let output = child.wait_with_output().await?;
        if let Some(writer) = writer {
            match writer.await {
                Ok(result) => result?,
                Err(join) => return Err(RenderError::Io(std::io::Error::other(join))),
            }
        }

        if !output.status.success() {
            return Err(RenderError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if output.stdout.is_empty() {
            return Err(RenderError::Empty);
        }

        debug!(bytes = output.stdout.len(), "rendered receipt pdf");
        Ok(output.stdout)
    }
}

/// Serves the receipt HTML as-is. For environments without a PDF
/// converter.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlReceiptRenderer;

#[async_trait]
impl ReceiptRenderer for HtmlReceiptRenderer {
    fn content_type(&self) -> &'static str {
        "text/html; charset=utf-8"
    }

    fn extension(&self) -> &'static str {
        "html"
    }

    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        Ok(html.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn html_renderer_passes_through() {
        let out = HtmlReceiptRenderer.render("<p>hi</p>").await.unwrap();
        assert_eq!(out, b"<p>hi</p>");
        assert_eq!(HtmlReceiptRenderer.extension(), "html");
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let renderer = WkhtmltopdfRenderer::new("/nonexistent/wkhtmltopdf-cardbank");
        let err = renderer.render("<p>hi</p>").await.unwrap_err();
        assert!(matches!(err, RenderError::Spawn { .. }));
    }
}
