use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use artrack::{
    calib::{CalibrationConfig, CalibrationSession},
    core::{IntrinsicsStore, MarkerObservation, Pose},
    gesture::{GestureDetector, GestureKind},
    io::ImageSequenceSource,
    load_json_file,
    pose::{reprojection_rms, FrameConverter},
    AppConfig, AppError, Clock, ConfigError, FixedRateClock, FrameSource,
};
use clap::{Parser, Subcommand};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Marker-tracked AR tools over recorded data.
#[derive(Debug, Parser)]
#[command(author, version, about = "Marker pose, calibration and gesture tools")]
struct Args {
    /// Optional JSON AppConfig. Defaults are used if omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Solve intrinsics from recorded board corners and save the record.
    Calibrate {
        /// JSON file with `image_size` and per-view `views` corner lists.
        #[arg(long)]
        views: PathBuf,
        #[arg(long, default_value = artrack::core::DEFAULT_CALIBRATION_PATH)]
        output: PathBuf,
    },
    /// Print pose and renderer matrices for recorded marker observations.
    Pose {
        #[arg(long, default_value = artrack::core::DEFAULT_CALIBRATION_PATH)]
        calibration: PathBuf,
        /// JSON array of `{ "id", "corners" }` observations.
        #[arg(long)]
        observations: PathBuf,
        #[arg(long, default_value_t = 640)]
        width: u32,
        #[arg(long, default_value_t = 480)]
        height: u32,
        #[arg(long)]
        near: Option<f64>,
        #[arg(long)]
        far: Option<f64>,
    },
    /// Run gesture recognition over image files, one JSON line per event.
    Gestures {
        #[arg(required = true)]
        frames: Vec<PathBuf>,
        #[arg(long, default_value_t = 30.0)]
        fps: f64,
    },
}

/// Recorded calibration views.
#[derive(Debug, Deserialize)]
struct ViewsFile {
    image_size: (u32, u32),
    views: Vec<Vec<Point2<f64>>>,
}

#[derive(Debug, Serialize)]
struct PoseReport {
    id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pose: Option<Pose>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reprojection_rms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    view: Option<[f32; 16]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    projection: Option<[f32; 16]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct GestureLine {
    frame: usize,
    kind: GestureKind,
    x: f64,
    y: f64,
    time_ms: u128,
    confidence: f32,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);
    match try_main(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    let _ = artrack::core::init_with_level(level);
}

#[cfg(feature = "tracing")]
fn init_logging(_verbose: bool) {
    artrack::core::init_tracing(false);
}

fn try_main(args: Args) -> Result<(), AppError> {
    let config = match &args.config {
        Some(path) => AppConfig::load_json(path)?,
        None => AppConfig::default(),
    };
    match args.command {
        Command::Calibrate { views, output } => calibrate(&config, &views, output),
        Command::Pose {
            calibration,
            observations,
            width,
            height,
            near,
            far,
        } => {
            let converter = FrameConverter {
                near: near.unwrap_or(config.frames.near),
                far: far.unwrap_or(config.frames.far),
            };
            pose(&config, calibration, &observations, (width, height), converter)
        }
        Command::Gestures { frames, fps } => gestures(&config, frames, fps),
    }
}

fn calibrate(config: &AppConfig, views: &Path, output: PathBuf) -> Result<(), AppError> {
    let input: ViewsFile = load_json_file(views)?;
    let mut session = CalibrationSession::new(CalibrationConfig {
        required_views: input.views.len(),
        ..config.calibration
    });
    for corners in input.views {
        session.add_view(corners, input.image_size)?;
    }
    let result = session.solve()?;
    IntrinsicsStore::new(output).save(&result.intrinsics)?;

    let json = serde_json::to_string_pretty(&result).map_err(ConfigError::from)?;
    println!("{json}");
    Ok(())
}

fn pose(
    config: &AppConfig,
    calibration: PathBuf,
    observations: &Path,
    size: (u32, u32),
    converter: FrameConverter,
) -> Result<(), AppError> {
    let intrinsics = IntrinsicsStore::new(&calibration)
        .load()?
        .ok_or_else(|| AppError::NotCalibrated(calibration.clone()))?;
    let observations: Vec<MarkerObservation> = load_json_file(observations)?;

    let reports: Vec<PoseReport> = config
        .pose
        .estimate_all(&observations, config.marker_side, &intrinsics)
        .into_iter()
        .zip(&observations)
        .map(|((id, result), obs)| match result {
            Ok(pose) => {
                let (view, projection) = converter
                    .matrices(&intrinsics, &pose, size.0, size.1)
                    .to_gl_arrays();
                PoseReport {
                    id,
                    pose: Some(pose),
                    reprojection_rms: Some(reprojection_rms(
                        &pose,
                        obs,
                        config.marker_side,
                        &intrinsics,
                    )),
                    view: Some(view),
                    projection: Some(projection),
                    error: None,
                }
            }
            Err(e) => PoseReport {
                id,
                pose: None,
                reprojection_rms: None,
                view: None,
                projection: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    let json = serde_json::to_string_pretty(&reports).map_err(ConfigError::from)?;
    println!("{json}");
    Ok(())
}

fn gestures(config: &AppConfig, frames: Vec<PathBuf>, fps: f64) -> Result<(), AppError> {
    if !(fps > 0.0 && fps.is_finite()) {
        return Err(AppError::InvalidInput(format!("fps must be positive, got {fps}")));
    }
    let mut source = ImageSequenceSource::new(frames);
    let clock = FixedRateClock::new(fps);
    let mut detector = GestureDetector::new(config.gestures);

    let mut frame_index = 0;
    while source.is_open() {
        let grabbed = source.grab()?;
        let now = clock.now();
        frame_index += 1;
        let Some(frame) = grabbed else {
            continue;
        };
        artrack::core::set_log_frame(Some(frame_index as u64 - 1));
        for event in detector.detect(&frame.view(), now) {
            let line = GestureLine {
                frame: frame_index - 1,
                kind: event.kind,
                x: event.position.x,
                y: event.position.y,
                time_ms: event.timestamp.as_millis(),
                confidence: event.confidence,
            };
            let json = serde_json::to_string(&line).map_err(ConfigError::from)?;
            println!("{json}");
        }
    }
    artrack::core::set_log_frame(None);
    Ok(())
}
