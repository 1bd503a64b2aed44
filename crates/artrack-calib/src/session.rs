use crate::{solve_calibration, CalibrationConfig, CalibrationError, CalibrationResult, CalibrationSample};
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationState {
    Collecting { accepted: usize },
    /// Enough views were accepted; waiting for [`CalibrationSession::solve`].
    Solving,
    Done,
}

/// Accumulates accepted board views until the configured count is reached,
/// then solves once.
#[derive(Clone, Debug)]
pub struct CalibrationSession {
    config: CalibrationConfig,
    object_points: Vec<Point3<f64>>,
    samples: Vec<CalibrationSample>,
    image_size: Option<(u32, u32)>,
    state: CalibrationState,
}

impl CalibrationSession {
    pub fn new(config: CalibrationConfig) -> Self {
        let state = if config.required_views == 0 {
            CalibrationState::Solving
        } else {
            CalibrationState::Collecting { accepted: 0 }
        };
        Self {
            object_points: config.board.object_points(),
            config,
            samples: Vec::with_capacity(config.required_views),
            image_size: None,
            state,
        }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn accepted(&self) -> usize {
        self.samples.len()
    }

    pub fn required(&self) -> usize {
        self.config.required_views
    }

    pub fn is_ready(&self) -> bool {
        self.state == CalibrationState::Solving
    }

    pub fn samples(&self) -> &[CalibrationSample] {
        &self.samples
    }

    /// Accept one full-board view (corners row-major, matching the board's
    /// object points). Returns the number of accepted views.
    ///
    /// Views arriving after the required count are ignored.
    pub fn add_view(
        &mut self,
        corners: Vec<Point2<f64>>,
        image_size: (u32, u32),
    ) -> Result<usize, CalibrationError> {
        match self.state {
            CalibrationState::Collecting { .. } => {}
            CalibrationState::Solving => return Ok(self.accepted()),
            CalibrationState::Done => return Err(CalibrationError::AlreadySolved),
        }
        let expected = self.config.board.corner_count();
        if corners.len() != expected {
            return Err(CalibrationError::IncompleteBoard {
                expected,
                got: corners.len(),
            });
        }
        match self.image_size {
            Some(size) if size != image_size => {
                return Err(CalibrationError::ImageSizeMismatch {
                    expected: size,
                    got: image_size,
                })
            }
            _ => self.image_size = Some(image_size),
        }

        self.samples.push(CalibrationSample {
            image_points: corners,
            object_points: self.object_points.clone(),
        });
        let accepted = self.samples.len();
        self.state = if accepted >= self.config.required_views {
            CalibrationState::Solving
        } else {
            CalibrationState::Collecting { accepted }
        };
        Ok(accepted)
    }

    /// The error reported when the operator stops before enough views.
    pub fn insufficient_views(&self) -> CalibrationError {
        CalibrationError::InsufficientViews {
            collected: self.accepted(),
            required: self.required(),
        }
    }

    pub fn solve(&mut self) -> Result<CalibrationResult, CalibrationError> {
        match self.state {
            CalibrationState::Collecting { .. } => return Err(self.insufficient_views()),
            CalibrationState::Done => return Err(CalibrationError::AlreadySolved),
            CalibrationState::Solving => {}
        }
        let size = self
            .image_size
            .ok_or(CalibrationError::Degenerate("no views were accepted"))?;
        let result = solve_calibration(&self.samples, size, &self.config.solver)?;
        self.state = CalibrationState::Done;
        Ok(result)
    }
}
