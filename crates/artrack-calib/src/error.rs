use artrack_core::CaptureError;

/// Errors returned by camera calibration.
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error("calibration aborted with {collected} of {required} views")]
    InsufficientViews { collected: usize, required: usize },
    #[error("view has {got} corners, board has {expected}")]
    IncompleteBoard { expected: usize, got: usize },
    #[error("view size {got:?} differs from session size {expected:?}")]
    ImageSizeMismatch {
        expected: (u32, u32),
        got: (u32, u32),
    },
    #[error("degenerate calibration geometry: {0}")]
    Degenerate(&'static str),
    #[error("calibration session already solved")]
    AlreadySolved,
    #[error(transparent)]
    Capture(#[from] CaptureError),
}
