// Ports - Interface definitions (contracts)

use std::path::Path;

use crate::error::VidGuardResult;

/// Single-plane 8-bit grayscale frame, rows packed without padding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LumaFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl LumaFrame {
    /// Create a frame; `pixels` must hold exactly `width * height` bytes
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Frame filled with one luma value
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; width as usize * height as usize],
        }
    }

    pub fn same_geometry(&self, other: &LumaFrame) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// One position in the decoded frame sequence
#[derive(Debug, Clone, PartialEq)]
pub enum FrameEvent {
    /// Frame decoded successfully
    Frame(LumaFrame),
    /// Frame could not be decoded; its slot in the sequence is kept
    Corrupt { reason: String },
}

/// Port for sequential frame decoding.
///
/// Implementations yield frames strictly in presentation order and hold at
/// most the state needed to produce the next one.
pub trait FrameSource {
    /// Next frame event, `Ok(None)` at end of stream.
    ///
    /// `Err` is a stream-level failure after which no further frames can be
    /// read; per-frame failures are reported as [`FrameEvent::Corrupt`].
    fn next_event(&mut self) -> VidGuardResult<Option<FrameEvent>>;

    /// Frame count declared by the container, if known
    fn expected_frames(&self) -> Option<u64> {
        None
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_event(&mut self) -> VidGuardResult<Option<FrameEvent>> {
        (**self).next_event()
    }

    fn expected_frames(&self) -> Option<u64> {
        (**self).expected_frames()
    }
}

/// Port for opening a [`FrameSource`] over a video file.
///
/// The returned source is used on the thread that opened it.
pub trait FrameSourceOpener: Send + Sync {
    fn open(&self, path: &Path, analysis_width: u32) -> VidGuardResult<Box<dyn FrameSource>>;
}
