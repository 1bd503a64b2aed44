//! Frames from image files, via the `image` crate.

use crate::AppError;
use artrack_core::{CaptureError, FrameSource, RgbImage};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Copy an `image::RgbImage` into the workspace frame type.
pub fn rgb_from_image(img: &::image::RgbImage) -> RgbImage {
    RgbImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw().clone(),
    }
}

/// Decode any supported image file into an RGB frame.
pub fn load_rgb(path: impl AsRef<Path>) -> Result<RgbImage, AppError> {
    let img = ::image::open(path)?.to_rgb8();
    Ok(rgb_from_image(&img))
}

/// Replays image files as a frame source. Files that fail to decode are
/// reported and yield an empty tick.
#[derive(Clone, Debug, Default)]
pub struct ImageSequenceSource {
    paths: VecDeque<PathBuf>,
}

impl ImageSequenceSource {
    pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ImageSequenceSource {
    fn grab(&mut self) -> Result<Option<RgbImage>, CaptureError> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };
        match load_rgb(&path) {
            Ok(frame) => Ok(Some(frame)),
            Err(e) => {
                log::warn!("skipping {}: {e}", path.display());
                Ok(None)
            }
        }
    }

    fn is_open(&self) -> bool {
        !self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_decodes_files_and_skips_broken_ones() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.png");
        let mut img = ::image::RgbImage::new(4, 3);
        img.put_pixel(1, 2, ::image::Rgb([10, 20, 30]));
        img.save(&good).unwrap();
        let broken = dir.path().join("b.png");
        std::fs::write(&broken, b"not a png").unwrap();

        let mut src = ImageSequenceSource::new([good, broken]);
        let frame = src.grab().unwrap().expect("decoded");
        assert_eq!((frame.width, frame.height), (4, 3));
        assert_eq!(frame.view().pixel(1, 2), [10, 20, 30]);
        assert!(src.is_open());
        assert!(src.grab().unwrap().is_none());
        assert!(!src.is_open());
    }
}
