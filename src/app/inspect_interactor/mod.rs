// Inspect interactor - Orchestrates metadata-only inspection

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::domain::model::{FileIdentity, VideoMetadata};
use crate::engine::progress::CancelToken;
use crate::error::{VidGuardError, VidGuardResult};
use crate::output::writer::{render_json, ReportFormat};
use crate::probe::MetadataReader;
use crate::utils::format_file_size;
use crate::utils::time::format_seconds;

/// Response from metadata inspection
#[derive(Debug, Clone, Serialize)]
pub struct InspectResponse {
    pub filename: String,
    pub filesize: u64,
    pub metadata: VideoMetadata,
}

impl InspectResponse {
    /// Render the response in `format`
    pub fn render(&self, format: ReportFormat) -> VidGuardResult<String> {
        match format {
            ReportFormat::Json => render_json(self),
            ReportFormat::Yaml => {
                serde_yaml::to_string(self).map_err(|e| VidGuardError::ReportFormat {
                    message: format!("YAML serialization failed: {}", e),
                })
            }
            ReportFormat::Text => Ok(self.format_as_text()),
        }
    }

    fn format_as_text(&self) -> String {
        let m = &self.metadata;
        let mut output = String::new();
        let _ = writeln!(output, "Video File Information:");
        let _ = writeln!(output, "  File: {}", self.filename);
        let _ = writeln!(output, "  File Size: {}", format_file_size(self.filesize));
        let _ = writeln!(output, "  Codec: {}", m.codec_id());
        let _ = writeln!(output, "  Resolution: {}x{}", m.width(), m.height());
        let _ = writeln!(output, "  Frame Rate: {:.3} fps", m.frame_rate());
        let _ = writeln!(output, "  Frames: {}", m.frame_count());
        let _ = writeln!(output, "  Duration: {}", format_seconds(m.duration_seconds()));
        if let Some(created) = m.creation_timestamp() {
            let _ = writeln!(output, "  Created: {}", created);
        }
        output
    }
}

/// Interactor for metadata inspection
#[derive(Debug, Default, Clone, Copy)]
pub struct InspectInteractor {
    reader: MetadataReader,
}

impl InspectInteractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read identity and metadata of `path` off the async runtime
    pub async fn execute(&self, path: &Path) -> VidGuardResult<InspectResponse> {
        info!("Starting inspection: {}", path.display());
        let path: PathBuf = path.to_path_buf();
        let reader = self.reader;

        tokio::task::spawn_blocking(move || {
            let identity = FileIdentity::from_path(&path)?;
            let metadata = reader.read(&path, &CancelToken::new())?;
            Ok(InspectResponse {
                filename: identity.filename,
                filesize: identity.filesize,
                metadata,
            })
        })
        .await
        .map_err(|e| VidGuardError::TaskFailed {
            message: e.to_string(),
        })?
    }
}
