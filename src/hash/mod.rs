//! Streaming content fingerprinting
//!
//! Files are read in fixed-size chunks and fed to an incremental digest, so
//! memory stays bounded regardless of file size. The digest depends only on
//! the file bytes, never on the chunk size.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::domain::model::ContentFingerprint;
use crate::engine::progress::{AnalysisStage, CancelToken, NoProgress, ProgressCallback};
use crate::error::{VidGuardError, VidGuardResult};

/// Default read chunk size in bytes
pub const DEFAULT_CHUNK_SIZE: usize = 128 * 1024;

/// Chunks read between progress callbacks
const PROGRESS_EVERY_CHUNKS: u64 = 64;

/// Digest algorithm used for the content fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Blake3 => "blake3",
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = VidGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(VidGuardError::Config {
                message: format!("unknown hash algorithm '{}'", other),
            }),
        }
    }
}

enum Accumulator {
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Accumulator {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Accumulator::Sha256(Sha256::new()),
            HashAlgorithm::Blake3 => Accumulator::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            Accumulator::Sha256(hasher) => hasher.update(bytes),
            Accumulator::Blake3(hasher) => {
                hasher.update(bytes);
            }
        }
    }

    fn finish(self) -> ContentFingerprint {
        match self {
            Accumulator::Sha256(hasher) => ContentFingerprint::from_digest(&hasher.finalize()),
            Accumulator::Blake3(hasher) => {
                ContentFingerprint::from_digest(hasher.finalize().as_bytes())
            }
        }
    }
}

/// Chunked file hasher
#[derive(Debug, Clone, Copy)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
    chunk_size: usize,
}

impl ContentHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Use a different read chunk size; zero falls back to the default
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        self
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Fingerprint the file at `path`
    pub fn hash_path(
        &self,
        path: &Path,
        cancel: &CancelToken,
        progress: &dyn ProgressCallback,
    ) -> VidGuardResult<ContentFingerprint> {
        info!("Hashing content ({}): {}", self.algorithm, path.display());

        let io_error = |source| VidGuardError::HashIo {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_error)?;
        let total = file.metadata().ok().map(|m| m.len());

        let fingerprint = self
            .hash_reader(file, total, cancel, progress)
            .map_err(|e| match e {
                VidGuardError::Io(source) => io_error(source),
                other => other,
            })?;

        debug!(hash = %fingerprint, "Content hash complete");
        Ok(fingerprint)
    }

    /// Fingerprint everything `reader` yields.
    ///
    /// Read failures other than interruptions surface as [`VidGuardError::Io`].
    pub fn hash_reader<R: Read>(
        &self,
        mut reader: R,
        total_bytes: Option<u64>,
        cancel: &CancelToken,
        progress: &dyn ProgressCallback,
    ) -> VidGuardResult<ContentFingerprint> {
        let mut accumulator = Accumulator::new(self.algorithm);
        let mut buf = vec![0u8; self.chunk_size];
        let mut consumed = 0u64;
        let mut chunks = 0u64;

        loop {
            cancel.check()?;
            let read = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(VidGuardError::Io(e)),
            };
            accumulator.update(&buf[..read]);
            consumed += read as u64;
            chunks += 1;
            if chunks % PROGRESS_EVERY_CHUNKS == 0 {
                progress.on_progress(AnalysisStage::Hashing, consumed, total_bytes);
            }
        }

        Ok(accumulator.finish())
    }

    /// Fingerprint an in-memory buffer
    pub fn hash_bytes(&self, bytes: &[u8]) -> ContentFingerprint {
        let mut accumulator = Accumulator::new(self.algorithm);
        accumulator.update(bytes);
        accumulator.finish()
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

/// Fingerprint `path` with default settings
pub fn hash_file(path: &Path) -> VidGuardResult<ContentFingerprint> {
    ContentHasher::default().hash_path(path, &CancelToken::new(), &NoProgress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn temp_file_with(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    fn sample_bytes(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn test_known_sha256_digests() {
        let hasher = ContentHasher::default();
        assert_eq!(hasher.hash_bytes(b"").as_str(), EMPTY_SHA256);
        assert_eq!(
            hasher.hash_bytes(b"abc").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_empty_file_hashes_to_empty_digest() {
        let file = temp_file_with(b"");
        assert_eq!(hash_file(file.path()).unwrap().as_str(), EMPTY_SHA256);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let file = temp_file_with(&sample_bytes(300_000));
        let first = hash_file(file.path()).unwrap();
        let second = hash_file(file.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_str().len(), 64);
    }

    #[test]
    fn test_chunk_size_does_not_change_digest() {
        let bytes = sample_bytes(200_003);
        let file = temp_file_with(&bytes);
        let cancel = CancelToken::new();

        for algorithm in [HashAlgorithm::Sha256, HashAlgorithm::Blake3] {
            let whole = ContentHasher::new(algorithm).hash_bytes(&bytes);
            for chunk_size in [1, 7, 4096, DEFAULT_CHUNK_SIZE, 1 << 20] {
                let hashed = ContentHasher::new(algorithm)
                    .with_chunk_size(chunk_size)
                    .hash_path(file.path(), &cancel, &NoProgress)
                    .unwrap();
                assert_eq!(hashed, whole, "{} with chunk {}", algorithm, chunk_size);
            }
        }
    }

    #[test]
    fn test_single_byte_change_changes_digest() {
        let mut bytes = sample_bytes(10_000);
        let before = ContentHasher::default().hash_bytes(&bytes);
        bytes[5_000] ^= 0x01;
        let after = ContentHasher::default().hash_bytes(&bytes);
        assert_ne!(before, after);
    }

    #[test]
    fn test_algorithms_disagree() {
        let bytes = sample_bytes(1024);
        let sha = ContentHasher::new(HashAlgorithm::Sha256).hash_bytes(&bytes);
        let blake = ContentHasher::new(HashAlgorithm::Blake3).hash_bytes(&bytes);
        assert_ne!(sha, blake);
        assert_eq!(blake.as_str().len(), 64);
    }

    #[test]
    fn test_missing_file_is_hash_io_error() {
        let err = hash_file(Path::new("/no/such/file.mp4")).unwrap_err();
        match err {
            VidGuardError::HashIo { path, .. } => assert_eq!(path, Path::new("/no/such/file.mp4")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_cancelled_hash_stops() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = ContentHasher::default()
            .hash_reader(&b"data"[..], None, &cancel, &NoProgress)
            .unwrap_err();
        assert!(matches!(err, VidGuardError::Cancelled));
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("SHA256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("blake3".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Blake3);
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }
}
