// Domain models - Core types and data structures

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{VidGuardError, VidGuardResult};
use crate::utils::path::display_file_name;

/// Stream-level facts about the primary video stream.
///
/// `duration` is derived from `frame_count / frame_rate` and never stored, so a
/// value of this type always carries a strictly positive, finite frame rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MetadataRecord", into = "MetadataRecord")]
pub struct VideoMetadata {
    frame_rate: f64,
    frame_count: u64,
    width: u32,
    height: u32,
    codec_id: String,
    creation_timestamp: Option<String>,
}

impl VideoMetadata {
    /// Create validated metadata.
    ///
    /// Fails with [`VidGuardError::InvalidFrameRate`] when the frame rate is
    /// zero, negative or not finite; that is the only place a zero rate can
    /// surface, so [`duration_seconds`](Self::duration_seconds) never divides
    /// by zero.
    pub fn new(
        frame_rate: f64,
        frame_count: u64,
        width: u32,
        height: u32,
        codec_id: impl Into<String>,
    ) -> VidGuardResult<Self> {
        if !frame_rate.is_finite() || frame_rate <= 0.0 {
            return Err(VidGuardError::InvalidFrameRate { frame_rate });
        }

        Ok(Self {
            frame_rate,
            frame_count,
            width,
            height,
            codec_id: codec_id.into(),
            creation_timestamp: None,
        })
    }

    /// Attach the container-reported creation time, if any
    pub fn with_creation_timestamp(mut self, creation_timestamp: Option<String>) -> Self {
        self.creation_timestamp = creation_timestamp;
        self
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn codec_id(&self) -> &str {
        &self.codec_id
    }

    pub fn creation_timestamp(&self) -> Option<&str> {
        self.creation_timestamp.as_deref()
    }

    /// Duration in seconds derived from frame count and frame rate
    pub fn duration_seconds(&self) -> f64 {
        self.frame_count as f64 / self.frame_rate
    }
}

/// Wire shape of [`VideoMetadata`] inside a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MetadataRecord {
    frame_count: u64,
    fps: f64,
    width: u32,
    height: u32,
    codec: String,
    #[serde(default)]
    duration_seconds: f64,
    #[serde(default)]
    creation_timestamp: Option<String>,
}

impl From<VideoMetadata> for MetadataRecord {
    fn from(metadata: VideoMetadata) -> Self {
        let duration_seconds = metadata.duration_seconds();
        Self {
            frame_count: metadata.frame_count,
            fps: metadata.frame_rate,
            width: metadata.width,
            height: metadata.height,
            codec: metadata.codec_id,
            duration_seconds,
            creation_timestamp: metadata.creation_timestamp,
        }
    }
}

impl TryFrom<MetadataRecord> for VideoMetadata {
    type Error = VidGuardError;

    // duration_seconds is recomputed rather than trusted
    fn try_from(record: MetadataRecord) -> Result<Self, Self::Error> {
        Ok(VideoMetadata::new(
            record.fps,
            record.frame_count,
            record.width,
            record.height,
            record.codec,
        )?
        .with_creation_timestamp(record.creation_timestamp))
    }
}

/// Lowercase hexadecimal digest over the exact bytes of a file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    /// Hex-encode a finalized digest
    pub fn from_digest(digest: &[u8]) -> Self {
        let mut out = String::with_capacity(digest.len() * 2);
        for byte in digest {
            out.push_str(&format!("{:02x}", byte));
        }
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against another digest, ignoring hex letter case
    pub fn matches(&self, other: &ContentFingerprint) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strictly ascending, duplicate-free frame indices judged altered.
///
/// Index 0 never appears: the first frame has no predecessor to differ from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u64>", into = "Vec<u64>")]
pub struct AlteredFrameSet(Vec<u64>);

impl AlteredFrameSet {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Build from indices in any order; sorts, deduplicates and drops index 0
    pub fn from_indices(indices: impl IntoIterator<Item = u64>) -> Self {
        let mut indices: Vec<u64> = indices.into_iter().filter(|&i| i > 0).collect();
        indices.sort_unstable();
        indices.dedup();
        Self(indices)
    }

    /// Keep only indices that exist in a stream of `frame_count` frames
    pub fn bounded_by(self, frame_count: u64) -> Self {
        Self(self.0.into_iter().filter(|&i| i < frame_count).collect())
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, index: u64) -> bool {
        self.0.binary_search(&index).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.iter().copied()
    }
}

impl TryFrom<Vec<u64>> for AlteredFrameSet {
    type Error = VidGuardError;

    fn try_from(indices: Vec<u64>) -> Result<Self, Self::Error> {
        if indices.first() == Some(&0) {
            return Err(VidGuardError::ReportFormat {
                message: "altered_frames must not contain frame 0".to_string(),
            });
        }
        if indices.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(VidGuardError::ReportFormat {
                message: "altered_frames must be strictly ascending".to_string(),
            });
        }
        Ok(Self(indices))
    }
}

impl From<AlteredFrameSet> for Vec<u64> {
    fn from(set: AlteredFrameSet) -> Self {
        set.0
    }
}

/// Outcome of one pass of the frame difference engine
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAnalysis {
    /// Frames judged altered
    pub altered: AlteredFrameSet,
    /// Indices of frames that failed to decode and were skipped
    pub corrupt_frames: Vec<u64>,
    /// Frames consumed from the stream, corrupt ones included
    pub frames_seen: u64,
    /// Consecutive pairs that contributed a score
    pub pairs_scored: u64,
    /// Mean dissimilarity over scored pairs
    pub mean: f64,
    /// Population standard deviation over scored pairs
    pub stddev: f64,
    /// Decision threshold the scores were compared against
    pub threshold: f64,
}

impl FrameAnalysis {
    pub fn empty() -> Self {
        Self {
            altered: AlteredFrameSet::empty(),
            corrupt_frames: Vec::new(),
            frames_seen: 0,
            pairs_scored: 0,
            mean: 0.0,
            stddev: 0.0,
            threshold: 0.0,
        }
    }
}

/// Name and size of the analyzed file, supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    pub filename: String,
    pub filesize: u64,
}

impl FileIdentity {
    pub fn new(filename: impl Into<String>, filesize: u64) -> Self {
        Self {
            filename: filename.into(),
            filesize,
        }
    }

    /// Read the identity of a file on disk
    pub fn from_path(path: &Path) -> VidGuardResult<Self> {
        let filesize = std::fs::metadata(path)
            .map_err(|e| VidGuardError::unreadable(path, e))?
            .len();
        Ok(Self {
            filename: display_file_name(path),
            filesize,
        })
    }
}

/// Immutable result of one analysis run.
///
/// Serializes to exactly the six public report fields; the list of skipped
/// corrupt frames stays in memory for logging and text output only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForensicReport {
    filename: String,
    filesize: u64,
    metadata: VideoMetadata,
    hash: ContentFingerprint,
    altered_frames: AlteredFrameSet,
    analysis_timestamp: String,
    #[serde(skip)]
    corrupt_frames: Vec<u64>,
}

impl ForensicReport {
    pub(crate) fn new(
        identity: FileIdentity,
        metadata: VideoMetadata,
        hash: ContentFingerprint,
        altered_frames: AlteredFrameSet,
        corrupt_frames: Vec<u64>,
        analysis_timestamp: String,
    ) -> Self {
        Self {
            filename: identity.filename,
            filesize: identity.filesize,
            metadata,
            hash,
            altered_frames,
            analysis_timestamp,
            corrupt_frames,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn filesize(&self) -> u64 {
        self.filesize
    }

    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    pub fn hash(&self) -> &ContentFingerprint {
        &self.hash
    }

    pub fn altered_frames(&self) -> &AlteredFrameSet {
        &self.altered_frames
    }

    pub fn analysis_timestamp(&self) -> &str {
        &self.analysis_timestamp
    }

    /// Frames skipped as undecodable during this run (empty after reloading)
    pub fn corrupt_frames(&self) -> &[u64] {
        &self.corrupt_frames
    }

    /// Whether any frame was flagged
    pub fn tampering_suspected(&self) -> bool {
        !self.altered_frames.is_empty()
    }

    /// Share of unflagged frames as a percentage, 100 when nothing was flagged
    pub fn integrity_score(&self) -> f64 {
        let frame_count = self.metadata.frame_count();
        if self.altered_frames.is_empty() || frame_count == 0 {
            return 100.0;
        }
        let altered_share = self.altered_frames.len() as f64 / frame_count as f64 * 100.0;
        (100.0 - altered_share).max(0.0)
    }
}
