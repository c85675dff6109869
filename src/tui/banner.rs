//! Decorative art for the list screen: an image rendered by `catimg` and a
//! QR code rendered by `qrencode`.
//!
//! Both tools are run once per process at startup. Their ANSI output is
//! left-padded and folded into styled text so the composer can measure it.

use std::fmt;
use std::path::PathBuf;

use ratatui::text::Text;
use tokio::process::Command;

use crate::tui::ansi;

#[derive(Debug, Clone, PartialEq)]
pub struct BannerSettings {
    /// Image for `catimg`. `None` skips the image block.
    pub image: Option<PathBuf>,
    pub image_height: u16,
    /// URL for `qrencode`. `None` skips the QR block.
    pub qr_url: Option<String>,
    /// Spaces prepended to every line of both blocks.
    pub padding: usize,
    /// Refuse sessions when generation fails instead of showing no art.
    pub required: bool,
}

impl Default for BannerSettings {
    fn default() -> Self {
        Self {
            image: None,
            image_height: 15,
            qr_url: None,
            padding: 2,
            required: false,
        }
    }
}

#[derive(Debug)]
pub enum BannerError {
    /// The tool could not be started (usually not installed).
    Spawn { tool: &'static str, source: std::io::Error },
    /// The tool ran and exited unsuccessfully.
    Failed { tool: &'static str, stderr: String },
}

impl fmt::Display for BannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BannerError::Spawn { tool, source } => write!(f, "could not run {tool}: {source}"),
            BannerError::Failed { tool, stderr } if stderr.is_empty() => {
                write!(f, "{tool} exited unsuccessfully")
            }
            BannerError::Failed { tool, stderr } => write!(f, "{tool} failed: {stderr}"),
        }
    }
}

impl std::error::Error for BannerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BannerError::Spawn { source, .. } => Some(source),
            BannerError::Failed { .. } => None,
        }
    }
}

/// Rendered art, shared read-only by every session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Banner {
    pub image: Text<'static>,
    pub qr: Text<'static>,
}

impl Banner {
    pub async fn generate(settings: &BannerSettings) -> Result<Self, BannerError> {
        let mut banner = Banner::default();

        if let Some(image) = &settings.image {
            let height = settings.image_height.to_string();
            let args = [image.to_string_lossy().into_owned(), "-H".to_string(), height];
            let out = run_tool("catimg", &args).await?;
            banner.image = ansi::to_text(&pad_lines(&out, settings.padding));
        }

        if let Some(url) = &settings.qr_url {
            let args = ["-m", "2", "-t", "utf8", url.as_str()].map(str::to_string);
            let out = run_tool("qrencode", &args).await?;
            banner.qr = ansi::to_text(&pad_lines(&out, settings.padding));
        }

        Ok(banner)
    }

    pub fn is_empty(&self) -> bool {
        self.image.lines.is_empty() && self.qr.lines.is_empty()
    }
}

async fn run_tool(tool: &'static str, args: &[String]) -> Result<String, BannerError> {
    let output = Command::new(tool)
        .args(args)
        .output()
        .await
        .map_err(|source| BannerError::Spawn { tool, source })?;

    if !output.status.success() {
        return Err(BannerError::Failed {
            tool,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Prefix every line with `padding` spaces. A trailing newline does not
/// produce a padded blank line.
pub fn pad_lines(output: &str, padding: usize) -> String {
    let pad = " ".repeat(padding);
    output
        .trim_end_matches('\n')
        .split('\n')
        .map(|line| format!("{pad}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_lines_prefixes_each_line() {
        assert_eq!(pad_lines("ab\ncd\n", 2), "  ab\n  cd");
        assert_eq!(pad_lines("x", 0), "x");
    }

    #[tokio::test]
    async fn nothing_configured_yields_empty_banner() {
        let banner = Banner::generate(&BannerSettings::default()).await.unwrap();
        assert!(banner.is_empty());
    }

    #[tokio::test]
    async fn missing_tool_is_a_spawn_error() {
        let err = run_tool("sshelf-no-such-tool", &[]).await.unwrap_err();
        assert!(matches!(err, BannerError::Spawn { tool: "sshelf-no-such-tool", .. }));
        assert!(err.to_string().starts_with("could not run sshelf-no-such-tool"));
    }

    #[test]
    fn failed_display_includes_stderr() {
        let err = BannerError::Failed {
            tool: "catimg",
            stderr: "no such file".to_string(),
        };
        assert_eq!(err.to_string(), "catimg failed: no such file");
    }
}
