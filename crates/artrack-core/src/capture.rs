use crate::RgbImage;

#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("capture device unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Pull-based frame source (camera, video file, recorded frames).
///
/// `Ok(None)` means "no frame this tick" and is not an error.
pub trait FrameSource {
    fn grab(&mut self) -> Result<Option<RgbImage>, CaptureError>;

    /// `false` once the source is exhausted or the device went away.
    fn is_open(&self) -> bool;
}

/// Replays a fixed list of frames; `None` entries are empty ticks.
#[derive(Clone, Debug, Default)]
pub struct ReplaySource {
    frames: std::collections::VecDeque<Option<RgbImage>>,
}

impl ReplaySource {
    pub fn new(frames: impl IntoIterator<Item = Option<RgbImage>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ReplaySource {
    fn grab(&mut self) -> Result<Option<RgbImage>, CaptureError> {
        Ok(self.frames.pop_front().flatten())
    }

    fn is_open(&self) -> bool {
        !self.frames.is_empty()
    }
}
