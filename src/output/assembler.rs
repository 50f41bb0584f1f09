//! Forensic report assembly

use tracing::{error, info, warn};

use crate::domain::model::{
    ContentFingerprint, FileIdentity, ForensicReport, FrameAnalysis, VideoMetadata,
};
use crate::error::{VidGuardError, VidGuardResult};

/// Joins the three producer results into one report
#[derive(Debug, Default, Clone, Copy)]
pub struct ForensicReportAssembler;

impl ForensicReportAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Build a report once all producers have finished.
    ///
    /// The first failure in metadata, hash, frame-analysis order becomes the
    /// result; no partial report is ever produced. Altered indices outside
    /// `[1, frame_count - 1]` are dropped.
    pub fn assemble(
        &self,
        identity: FileIdentity,
        metadata: VidGuardResult<VideoMetadata>,
        hash: VidGuardResult<ContentFingerprint>,
        frames: VidGuardResult<FrameAnalysis>,
        analysis_timestamp: String,
    ) -> VidGuardResult<ForensicReport> {
        let (metadata, hash, frames) = match (metadata, hash, frames) {
            (Ok(metadata), Ok(hash), Ok(frames)) => (metadata, hash, frames),
            (metadata, hash, frames) => {
                let failure = first_failure(metadata.err(), hash.err(), frames.err());
                error!(error = %failure, "Analysis of {} failed", identity.filename);
                return Err(failure);
            }
        };

        let FrameAnalysis {
            altered,
            corrupt_frames,
            frames_seen,
            ..
        } = frames;

        let flagged = altered.len();
        let altered = altered.bounded_by(metadata.frame_count());
        if altered.len() != flagged {
            warn!(
                dropped = flagged - altered.len(),
                frame_count = metadata.frame_count(),
                "Altered frames beyond the declared frame count were dropped"
            );
        }
        if frames_seen != metadata.frame_count() {
            warn!(
                decoded = frames_seen,
                declared = metadata.frame_count(),
                "Decoded frame count differs from container metadata"
            );
        }

        let report = ForensicReport::new(
            identity,
            metadata,
            hash,
            altered,
            corrupt_frames,
            analysis_timestamp,
        );
        info!(
            file = report.filename(),
            altered = report.altered_frames().len(),
            "Forensic report assembled"
        );
        Ok(report)
    }
}

/// Earliest failure in producer order.
///
/// A producer stopped because a sibling failed reports `Cancelled`; that never
/// masks the failure that caused it.
fn first_failure(
    metadata: Option<VidGuardError>,
    hash: Option<VidGuardError>,
    frames: Option<VidGuardError>,
) -> VidGuardError {
    let (cancelled, mut failures): (Vec<_>, Vec<_>) = [metadata, hash, frames]
        .into_iter()
        .flatten()
        .partition(|e| matches!(e, VidGuardError::Cancelled));

    if failures.is_empty() {
        return cancelled
            .into_iter()
            .next()
            .unwrap_or_else(|| VidGuardError::TaskFailed {
                message: "analysis failed without an error".to_string(),
            });
    }
    let first = failures.remove(0);
    for other in failures {
        warn!(error = %other, "Additional failure during analysis");
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::AlteredFrameSet;
    use std::path::PathBuf;

    fn metadata(frame_count: u64) -> VideoMetadata {
        VideoMetadata::new(30.0, frame_count, 640, 480, "h264").unwrap()
    }

    fn fingerprint() -> ContentFingerprint {
        ContentFingerprint::from_digest(&[0xab; 32])
    }

    fn analysis(altered: &[u64]) -> FrameAnalysis {
        FrameAnalysis {
            altered: AlteredFrameSet::from_indices(altered.iter().copied()),
            ..FrameAnalysis::empty()
        }
    }

    #[test]
    fn test_assembles_complete_report() {
        let report = ForensicReportAssembler::new()
            .assemble(
                FileIdentity::new("clip.mp4", 2048),
                Ok(metadata(300)),
                Ok(fingerprint()),
                Ok(analysis(&[10, 200])),
                "2024-01-01 00:00:00".to_string(),
            )
            .unwrap();

        assert_eq!(report.filename(), "clip.mp4");
        assert_eq!(report.filesize(), 2048);
        assert_eq!(report.altered_frames().as_slice(), &[10, 200]);
        assert_eq!(report.hash(), &fingerprint());
    }

    #[test]
    fn test_out_of_range_indices_are_dropped() {
        let report = ForensicReportAssembler::new()
            .assemble(
                FileIdentity::new("clip.mp4", 1),
                Ok(metadata(10)),
                Ok(fingerprint()),
                Ok(analysis(&[5, 10, 42])),
                String::new(),
            )
            .unwrap();
        assert_eq!(report.altered_frames().as_slice(), &[5]);
    }

    #[test]
    fn test_metadata_failure_wins_over_later_failures() {
        let err = ForensicReportAssembler::new()
            .assemble(
                FileIdentity::new("clip.mp4", 1),
                Err(VidGuardError::InvalidFrameRate { frame_rate: 0.0 }),
                Err(VidGuardError::HashIo {
                    path: PathBuf::from("clip.mp4"),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk"),
                }),
                Err(VidGuardError::decode("broken")),
                String::new(),
            )
            .unwrap_err();
        assert!(matches!(err, VidGuardError::InvalidFrameRate { .. }));
    }

    #[test]
    fn test_cancelled_sibling_does_not_mask_cause() {
        let err = ForensicReportAssembler::new()
            .assemble(
                FileIdentity::new("clip.mp4", 1),
                Ok(metadata(10)),
                Err(VidGuardError::Cancelled),
                Err(VidGuardError::decode("demuxer lost sync")),
                String::new(),
            )
            .unwrap_err();
        assert!(matches!(err, VidGuardError::DecodeError { .. }));
    }

    #[test]
    fn test_frame_failure_alone_fails_assembly() {
        let err = ForensicReportAssembler::new()
            .assemble(
                FileIdentity::new("clip.mp4", 1),
                Ok(metadata(10)),
                Ok(fingerprint()),
                Err(VidGuardError::decode("demuxer lost sync")),
                String::new(),
            )
            .unwrap_err();
        assert!(matches!(err, VidGuardError::DecodeError { .. }));
    }

    #[test]
    fn test_corrupt_frames_are_carried_in_memory() {
        let frames = FrameAnalysis {
            corrupt_frames: vec![3],
            ..FrameAnalysis::empty()
        };
        let report = ForensicReportAssembler::new()
            .assemble(
                FileIdentity::new("clip.mp4", 1),
                Ok(metadata(10)),
                Ok(fingerprint()),
                Ok(frames),
                String::new(),
            )
            .unwrap();
        assert_eq!(report.corrupt_frames(), &[3]);
        assert!(!report.tampering_suspected());
    }
}
