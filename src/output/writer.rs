//! Report rendering and writing

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::model::ForensicReport;
use crate::error::{VidGuardError, VidGuardResult};
use crate::utils::format_megabytes;

/// Altered frame positions listed in text output
pub const TEXT_FRAME_LIMIT: usize = 100;

/// Output format of a rendered report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Canonical JSON export, 4-space indented
    #[default]
    Json,
    /// YAML rendering of the same fields
    Yaml,
    /// Human-readable summary
    Text,
}

impl ReportFormat {
    /// File extension for saved reports
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Yaml => "yaml",
            ReportFormat::Text => "txt",
        }
    }
}

/// Renders reports and writes them out
#[derive(Debug, Clone, Copy)]
pub struct ReportWriter {
    format: ReportFormat,
}

impl ReportWriter {
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    /// Render `report` in the configured format
    pub fn render(&self, report: &ForensicReport) -> VidGuardResult<String> {
        match self.format {
            ReportFormat::Json => render_json(report),
            ReportFormat::Yaml => serde_yaml::to_string(report).map_err(|e| {
                VidGuardError::ReportFormat {
                    message: format!("failed to serialize report as YAML: {}", e),
                }
            }),
            ReportFormat::Text => Ok(render_text(report)),
        }
    }

    /// Print the rendered report to stdout
    pub fn write_stdout(&self, report: &ForensicReport) -> VidGuardResult<()> {
        let rendered = self.render(report)?;
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(rendered.as_bytes())?;
        if !rendered.ends_with('\n') {
            handle.write_all(b"\n")?;
        }
        handle.flush()?;
        Ok(())
    }

    /// Write the rendered report to `path` through a temporary sibling file
    pub fn write_file(&self, report: &ForensicReport, path: &Path) -> VidGuardResult<()> {
        let rendered = self.render(report)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let temp_path = temp_path_for(path);
        debug!("Writing to temporary file: {}", temp_path.display());
        {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&temp_path)?;
            let mut writer = BufWriter::new(&file);
            writer.write_all(rendered.as_bytes())?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            drop(writer);
            file.sync_all()?;
        }
        std::fs::rename(&temp_path, path)?;

        info!("Report written: {}", path.display());
        Ok(())
    }
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self::new(ReportFormat::Json)
    }
}

/// Serialize as JSON with 4-space indentation
pub fn render_json<T: Serialize>(value: &T) -> VidGuardResult<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| VidGuardError::ReportFormat {
            message: format!("failed to serialize report as JSON: {}", e),
        })?;
    String::from_utf8(buf).map_err(|e| VidGuardError::ReportFormat {
        message: format!("serialized report is not UTF-8: {}", e),
    })
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Human-readable report with integrity verdict and recommendations
pub fn render_text(report: &ForensicReport) -> String {
    let metadata = report.metadata();
    let altered = report.altered_frames();
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "VidGuard Forensic Report");
    let _ = writeln!(out, "========================");
    let _ = writeln!(out, "Filename:        {}", report.filename());
    let _ = writeln!(out, "File size:       {}", format_megabytes(report.filesize()));
    let _ = writeln!(out, "Analysis date:   {}", report.analysis_timestamp());
    let _ = writeln!(out, "Hash:            {}", report.hash());
    let _ = writeln!(
        out,
        "Duration:        {:.2} seconds",
        metadata.duration_seconds()
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Video Metadata");
    let _ = writeln!(out, "--------------");
    let _ = writeln!(out, "Frame count:     {}", metadata.frame_count());
    let _ = writeln!(out, "Frame rate:      {:.2} fps", metadata.frame_rate());
    let _ = writeln!(
        out,
        "Resolution:      {}x{}",
        metadata.width(),
        metadata.height()
    );
    let _ = writeln!(out, "Codec:           {}", metadata.codec_id());
    if let Some(created) = metadata.creation_timestamp() {
        let _ = writeln!(out, "Created:         {}", created);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Frame Analysis");
    let _ = writeln!(out, "--------------");
    if altered.is_empty() {
        let _ = writeln!(
            out,
            "No signs of tampering detected. Frame analysis shows consistent frame transitions."
        );
    } else {
        let _ = writeln!(
            out,
            "Potential tampering detected! Found {} frames with significant changes.",
            altered.len()
        );
        let shown = altered.len().min(TEXT_FRAME_LIMIT);
        let _ = writeln!(
            out,
            "First {} altered frame positions (out of {} total):",
            shown,
            altered.len()
        );
        let positions: Vec<String> = altered
            .iter()
            .take(shown)
            .map(|index| index.to_string())
            .collect();
        let _ = writeln!(out, "{}", positions.join(", "));
    }
    if !report.corrupt_frames().is_empty() {
        let _ = writeln!(
            out,
            "Skipped {} undecodable frames.",
            report.corrupt_frames().len()
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Forensic Analysis Summary");
    let _ = writeln!(out, "-------------------------");
    if report.tampering_suspected() {
        let _ = writeln!(
            out,
            "Video Integrity Score: {:.1}%",
            report.integrity_score()
        );
        let _ = writeln!(
            out,
            "This video shows signs of potential tampering. The altered frames suggest possible manipulation."
        );
    } else {
        let _ = writeln!(out, "Video Integrity Score: 100%");
        let _ = writeln!(
            out,
            "This video appears to be unaltered. No signs of frame tampering were detected."
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Recommendations");
    let _ = writeln!(out, "---------------");
    let recommendations: &[&str] = if report.tampering_suspected() {
        &[
            "Conduct further analysis on the identified altered frames",
            "Consider advanced forensic techniques for deeper examination",
            "Document the chain of custody for the video file",
            "Compare with the original source if available",
        ]
    } else {
        &[
            "Maintain proper documentation of this forensic result",
            "Store the hash value for future verification",
        ]
    };
    for line in recommendations {
        let _ = writeln!(out, "- {}", line);
    }
    out
}
