// Decode LibAV adapter - Sequential grayscale frame decoding using libav

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use ffmpeg_next::codec::packet::Packet;
use ffmpeg_next::format::context::Input;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::media;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;
use tracing::{debug, trace};

use crate::error::{VidGuardError, VidGuardResult};
use crate::ports::{FrameEvent, FrameSource, FrameSourceOpener, LumaFrame};

/// Default width frames are downscaled to before differencing
pub const DEFAULT_ANALYSIS_WIDTH: u32 = 320;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Reading,
    Draining,
    Finished,
}

/// Grayscale converter bound to one source geometry and pixel format
struct LumaScaler {
    context: scaling::Context,
    source: (Pixel, u32, u32),
}

/// Corrupt slots of packets the decoder rejected.
///
/// With reordering codecs the decoder still holds frames that precede a
/// rejected packet in presentation order, so each slot waits until a frame
/// presented after it is released.
#[derive(Debug, Default)]
struct RejectedPackets {
    held: VecDeque<(i64, String)>,
}

impl RejectedPackets {
    fn hold(&mut self, pts: i64, reason: String) {
        let at = self.held.partition_point(|(held, _)| *held <= pts);
        self.held.insert(at, (pts, reason));
    }

    /// Slots presented before a frame with `pts`; everything when unknown
    fn release_before(&mut self, pts: Option<i64>) -> Vec<FrameEvent> {
        let count = match pts {
            Some(pts) => self.held.partition_point(|(held, _)| *held < pts),
            None => self.held.len(),
        };
        self.held
            .drain(..count)
            .map(|(_, reason)| FrameEvent::Corrupt { reason })
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

/// Libav-backed frame source over the best video stream of a file.
///
/// Holds one packet and the frames the decoder has already released; decoded
/// frames are converted to 8-bit luma immediately and the originals dropped.
pub struct LibavFrameSource {
    path: PathBuf,
    input: Input,
    decoder: ffmpeg_next::decoder::Video,
    stream_index: usize,
    declared_frames: Option<u64>,
    analysis_width: u32,
    output_size: Option<(u32, u32)>,
    scaler: Option<LumaScaler>,
    pending: VecDeque<FrameEvent>,
    rejected: RejectedPackets,
    state: DecodeState,
}

impl LibavFrameSource {
    /// Open `path` for decoding, scaling frames to at most `analysis_width` pixels wide
    pub fn open(path: &Path, analysis_width: u32) -> VidGuardResult<Self> {
        let input =
            ffmpeg_next::format::input(path).map_err(|e| VidGuardError::unreadable(path, e))?;

        let (stream_index, declared_frames, decoder) = {
            let stream = input
                .streams()
                .best(media::Type::Video)
                .ok_or_else(|| VidGuardError::unreadable(path, "no video stream found"))?;

            let parameters = stream.parameters();
            let codec_id = parameters.id();
            let decoder = ffmpeg_next::codec::context::Context::from_parameters(parameters)
                .and_then(|context| context.decoder().video())
                .map_err(|e| VidGuardError::UnsupportedCodec {
                    path: path.to_path_buf(),
                    codec: format!("{:?}: {}", codec_id, e),
                })?;

            let declared = stream.frames();
            (
                stream.index(),
                if declared > 0 { Some(declared as u64) } else { None },
                decoder,
            )
        };

        debug!(
            stream = stream_index,
            declared_frames = ?declared_frames,
            "Opened video stream for frame analysis: {}",
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            input,
            decoder,
            stream_index,
            declared_frames,
            analysis_width: analysis_width.max(1),
            output_size: None,
            scaler: None,
            pending: VecDeque::new(),
            rejected: RejectedPackets::default(),
            state: DecodeState::Reading,
        })
    }

    /// Advance the demuxer/decoder until it yields events or finishes
    fn pump(&mut self) -> VidGuardResult<()> {
        match self.state {
            DecodeState::Finished => Ok(()),
            DecodeState::Draining => self.receive_frames(),
            DecodeState::Reading => {
                let mut packet = Packet::empty();
                match packet.read(&mut self.input) {
                    Ok(()) => {
                        if packet.stream() != self.stream_index {
                            return Ok(());
                        }
                        if let Err(e) = self.decoder.send_packet(&packet) {
                            trace!(error = %e, pts = ?packet.pts(), "Decoder rejected packet");
                            let reason = format!("decoder rejected packet: {}", e);
                            match packet.pts() {
                                Some(pts) => self.rejected.hold(pts, reason),
                                None => self.pending.push_back(FrameEvent::Corrupt { reason }),
                            }
                            return Ok(());
                        }
                    }
                    Err(ffmpeg_next::Error::Eof) => {
                        self.decoder.send_eof().map_err(|e| {
                            VidGuardError::decode(format!("failed to flush decoder: {}", e))
                        })?;
                        self.state = DecodeState::Draining;
                    }
                    Err(e) => {
                        return Err(VidGuardError::decode(format!(
                            "failed to read from {}: {}",
                            self.path.display(),
                            e
                        )))
                    }
                }
                self.receive_frames()
            }
        }
    }

    /// Collect every frame the decoder can release right now
    fn receive_frames(&mut self) -> VidGuardResult<()> {
        let mut frame = Video::empty();
        loop {
            match self.decoder.receive_frame(&mut frame) {
                Ok(()) => {
                    let earlier = self.rejected.release_before(frame.timestamp());
                    self.pending.extend(earlier);
                    let event = if frame.is_corrupt() {
                        FrameEvent::Corrupt {
                            reason: "decoder flagged frame as corrupt".to_string(),
                        }
                    } else {
                        match self.to_luma(&frame) {
                            Ok(luma) => FrameEvent::Frame(luma),
                            Err(e) => FrameEvent::Corrupt {
                                reason: e.to_string(),
                            },
                        }
                    };
                    self.pending.push_back(event);
                }
                Err(ffmpeg_next::Error::Other { errno }) if errno == ffmpeg_next::error::EAGAIN => {
                    return Ok(());
                }
                Err(ffmpeg_next::Error::Eof) => {
                    self.state = DecodeState::Finished;
                    return Ok(());
                }
                Err(e) => {
                    self.pending.push_back(FrameEvent::Corrupt {
                        reason: format!("failed to decode frame: {}", e),
                    });
                    // A draining decoder that errors has nothing more to give
                    if self.state == DecodeState::Draining {
                        self.state = DecodeState::Finished;
                    }
                    return Ok(());
                }
            }
        }
    }

    /// Convert a decoded frame to packed 8-bit luma at the analysis size
    fn to_luma(&mut self, frame: &Video) -> VidGuardResult<LumaFrame> {
        let source = (frame.format(), frame.width(), frame.height());
        if source.1 == 0 || source.2 == 0 {
            return Err(VidGuardError::decode("decoded frame has no pixels"));
        }

        let analysis_width = self.analysis_width;
        let (width, height) = *self
            .output_size
            .get_or_insert_with(|| fit_to_width(source.1, source.2, analysis_width));

        let rebuild = self
            .scaler
            .as_ref()
            .map_or(true, |scaler| scaler.source != source);
        if rebuild {
            let context = scaling::Context::get(
                source.0,
                source.1,
                source.2,
                Pixel::GRAY8,
                width,
                height,
                scaling::Flags::BILINEAR,
            )?;
            self.scaler = Some(LumaScaler { context, source });
        }

        let mut gray = Video::empty();
        match self.scaler.as_mut() {
            Some(scaler) => scaler.context.run(frame, &mut gray)?,
            None => return Err(VidGuardError::decode("no scaler available")),
        }

        let stride = gray.stride(0);
        let data = gray.data(0);
        let row = width as usize;
        let mut pixels = Vec::with_capacity(row * height as usize);
        for y in 0..height as usize {
            let start = y * stride;
            pixels.extend_from_slice(&data[start..start + row]);
        }

        LumaFrame::new(width, height, pixels)
            .ok_or_else(|| VidGuardError::decode("scaled frame has unexpected size"))
    }
}

impl FrameSource for LibavFrameSource {
    fn next_event(&mut self) -> VidGuardResult<Option<FrameEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            if self.state == DecodeState::Finished {
                if self.rejected.is_empty() {
                    return Ok(None);
                }
                let remaining = self.rejected.release_before(None);
                self.pending.extend(remaining);
                continue;
            }
            self.pump()?;
        }
    }

    fn expected_frames(&self) -> Option<u64> {
        self.declared_frames
    }
}

/// Opens [`LibavFrameSource`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct LibavFrameSourceOpener;

impl FrameSourceOpener for LibavFrameSourceOpener {
    fn open(&self, path: &Path, analysis_width: u32) -> VidGuardResult<Box<dyn FrameSource>> {
        Ok(Box::new(LibavFrameSource::open(path, analysis_width)?))
    }
}

/// Output size no wider than `max_width`, preserving aspect ratio
pub fn fit_to_width(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width {
        return (width, height);
    }
    let scaled = (height as u64 * max_width as u64 + width as u64 / 2) / width as u64;
    (max_width, scaled.max(1) as u32)
}
