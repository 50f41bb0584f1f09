//! Container and stream metadata extraction

use std::path::Path;

use ffmpeg_next::codec::packet::Packet;
use ffmpeg_next::format::context::Input;
use ffmpeg_next::{media, Rational};
use tracing::{debug, info};

use crate::domain::model::VideoMetadata;
use crate::engine::progress::CancelToken;
use crate::error::{VidGuardError, VidGuardResult};

/// Metadata keys checked for a creation time, container first
const CREATION_TIME_KEYS: &[&str] = &["creation_time", "com.apple.quicktime.creationdate", "date"];

/// Reads stream-level facts of the primary video stream
#[derive(Debug, Default, Clone, Copy)]
pub struct MetadataReader;

impl MetadataReader {
    /// Create a new metadata reader
    pub fn new() -> Self {
        Self
    }

    /// Read metadata of the best video stream in `path`
    pub fn read(&self, path: &Path, cancel: &CancelToken) -> VidGuardResult<VideoMetadata> {
        info!("Reading metadata: {}", path.display());
        cancel.check()?;

        let mut input =
            ffmpeg_next::format::input(path).map_err(|e| VidGuardError::unreadable(path, e))?;

        let (stream_index, frame_rate, declared_frames, codec_id, width, height, stream_created) = {
            let stream = input
                .streams()
                .best(media::Type::Video)
                .ok_or_else(|| VidGuardError::unreadable(path, "no video stream found"))?;

            let parameters = stream.parameters();
            let codec_id = parameters.id();
            let codec = ffmpeg_next::codec::decoder::find(codec_id).ok_or_else(|| {
                VidGuardError::UnsupportedCodec {
                    path: path.to_path_buf(),
                    codec: format!("{:?}", codec_id),
                }
            })?;

            let decoder = ffmpeg_next::codec::context::Context::from_parameters(parameters)
                .and_then(|context| context.decoder().video())
                .map_err(|e| VidGuardError::UnsupportedCodec {
                    path: path.to_path_buf(),
                    codec: format!("{}: {}", codec.name(), e),
                })?;

            let frame_rate = positive_rate(stream.avg_frame_rate())
                .or_else(|| positive_rate(stream.rate()))
                .unwrap_or(0.0);
            let stream_created = find_creation_time(stream.metadata().iter());

            (
                stream.index(),
                frame_rate,
                stream.frames(),
                codec.name().to_string(),
                decoder.width(),
                decoder.height(),
                stream_created,
            )
        };

        if width == 0 || height == 0 {
            return Err(VidGuardError::unreadable(
                path,
                format!("video stream reports {}x{} resolution", width, height),
            ));
        }

        let creation_timestamp =
            find_creation_time(input.metadata().iter()).or(stream_created);

        // Reject a zero rate before paying for a packet count
        if frame_rate <= 0.0 {
            return Err(VidGuardError::InvalidFrameRate { frame_rate });
        }

        let frame_count = if declared_frames > 0 {
            declared_frames as u64
        } else {
            debug!("Container does not declare a frame count; counting packets");
            count_stream_packets(path, &mut input, stream_index, cancel)?
        };

        let metadata = VideoMetadata::new(frame_rate, frame_count, width, height, codec_id)?
            .with_creation_timestamp(creation_timestamp);

        info!(
            frames = metadata.frame_count(),
            fps = metadata.frame_rate(),
            width = metadata.width(),
            height = metadata.height(),
            codec = metadata.codec_id(),
            "Metadata read"
        );
        Ok(metadata)
    }
}

/// Rational frame rate as `f64` when numerator and denominator are positive
fn positive_rate(rate: Rational) -> Option<f64> {
    if rate.numerator() > 0 && rate.denominator() > 0 {
        Some(f64::from(rate))
    } else {
        None
    }
}

fn find_creation_time<'a>(entries: impl Iterator<Item = (&'a str, &'a str)>) -> Option<String> {
    let entries: Vec<(&str, &str)> = entries.collect();
    CREATION_TIME_KEYS.iter().find_map(|wanted| {
        entries
            .iter()
            .find(|(key, value)| key.eq_ignore_ascii_case(wanted) && !value.is_empty())
            .map(|(_, value)| value.to_string())
    })
}

/// Count packets of one stream; each video packet carries one frame
fn count_stream_packets(
    path: &Path,
    input: &mut Input,
    stream_index: usize,
    cancel: &CancelToken,
) -> VidGuardResult<u64> {
    let mut count = 0u64;
    loop {
        cancel.check()?;
        let mut packet = Packet::empty();
        match packet.read(input) {
            Ok(()) => {
                if packet.stream() == stream_index {
                    count += 1;
                }
            }
            Err(ffmpeg_next::Error::Eof) => break,
            Err(e) => {
                return Err(VidGuardError::unreadable(
                    path,
                    format!("failed to count frames after {} packets: {}", count, e),
                ))
            }
        }
    }
    Ok(count)
}
