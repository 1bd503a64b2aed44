use artrack::calib::{
    BoardSpec, CalibrationConfig, CalibrationError, CalibrationProgress, OperatorCommand,
};
use artrack::core::{
    CameraIntrinsics, GrayImageView, IntrinsicsStore, MarkerObservation, Pose, ReplaySource,
    RgbImage, RgbImageView,
};
use artrack::pose::marker_object_points;
use artrack::{
    bootstrap_intrinsics, AppConfig, AppError, ArSession, BoardDetector, CameraCalibrator,
    FixedRateClock, FramePipeline, MarkerDetector, OperatorInput, RenderState, Renderer,
};
use nalgebra::{Point2, Point3, Rotation3, Vector3};

const BACKGROUND: [u8; 3] = [30, 60, 200];
const SKIN: [u8; 3] = [220, 170, 140];

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn camera() -> CameraIntrinsics {
    CameraIntrinsics::new(300.0, 300.0, 160.0, 120.0)
}

fn marker_pose() -> Pose {
    Pose::from_rotation(
        &Rotation3::from_euler_angles(0.2, -0.1, 0.05),
        Vector3::new(0.01, -0.02, 0.5),
    )
}

fn observation(id: i32, pose: &Pose, cam: &CameraIntrinsics) -> MarkerObservation {
    let corners = marker_object_points(0.05).map(|p| {
        cam.project(&pose.transform_point(&p))
            .expect("marker in front")
    });
    MarkerObservation { id, corners }
}

fn plain(w: usize, h: usize) -> RgbImage {
    RgbImage::filled(w, h, BACKGROUND)
}

fn with_fist(w: usize, h: usize) -> RgbImage {
    let mut img = plain(w, h);
    for y in 60..160 {
        for x in 40..140 {
            img.put_pixel(x, y, SKIN);
        }
    }
    img
}

/// Reports the marker on the frames listed in `visible`.
struct ScriptedMarkers {
    frame: usize,
    visible: Vec<bool>,
    observation: MarkerObservation,
}

impl MarkerDetector for ScriptedMarkers {
    fn detect(&mut self, _frame: &RgbImageView<'_>) -> Vec<MarkerObservation> {
        let i = self.frame;
        self.frame += 1;
        if self.visible.get(i).copied().unwrap_or(false) {
            vec![self.observation]
        } else {
            Vec::new()
        }
    }
}

#[derive(Default)]
struct RecordingRenderer {
    states: Vec<RenderState>,
    resizes: Vec<(u32, u32)>,
    close_after: Option<usize>,
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, _frame: &RgbImageView<'_>, state: &RenderState) {
        self.states.push(*state);
    }

    fn on_resize(&mut self, width: u32, height: u32) {
        self.resizes.push((width, height));
    }

    fn should_close(&self) -> bool {
        self.close_after.is_some_and(|n| self.states.len() >= n)
    }
}

#[test]
fn every_frame_is_rendered_with_the_tracked_or_absent_pose() {
    init_logs();
    let cam = camera();
    let truth = marker_pose();
    let source = ReplaySource::new([
        Some(plain(320, 240)),
        None,
        Some(plain(320, 240)),
        Some(RgbImage::filled(0, 0, BACKGROUND)),
        Some(plain(160, 120)),
    ]);
    let markers = ScriptedMarkers {
        frame: 0,
        visible: vec![true, false, true],
        observation: observation(7, &truth, &cam),
    };
    let pipeline = FramePipeline::new(cam, &AppConfig::default());
    let mut session = ArSession::new(
        pipeline,
        source,
        markers,
        RecordingRenderer::default(),
        FixedRateClock::new(30.0),
    );

    let summary = session.run().expect("session");
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.frames_with_marker, 2);

    let renderer = session.into_renderer();
    assert_eq!(renderer.resizes, vec![(320, 240), (160, 120)]);
    assert_eq!(renderer.states.len(), 3);

    let first = renderer.states[0];
    assert!(first.marker_visible);
    assert!((first.pose.translation - truth.translation).norm() < 1e-6);
    assert!((first.pose.rotation - truth.rotation).norm() < 1e-6);
    assert_eq!(first.intrinsics, cam);

    let second = renderer.states[1];
    assert!(!second.marker_visible);
    assert!(second.pose.is_absent());
    assert_eq!(second.animation_offset, Vector3::zeros());

    assert!(renderer.states[2].marker_visible);
}

#[test]
fn renderer_close_request_ends_the_loop() {
    let source = ReplaySource::new((0..10).map(|_| Some(plain(64, 48))));
    let markers = ScriptedMarkers {
        frame: 0,
        visible: Vec::new(),
        observation: observation(1, &marker_pose(), &camera()),
    };
    let renderer = RecordingRenderer {
        close_after: Some(4),
        ..RecordingRenderer::default()
    };
    let mut session = ArSession::new(
        FramePipeline::new(camera(), &AppConfig::default()),
        source,
        markers,
        renderer,
        FixedRateClock::new(30.0),
    );
    assert_eq!(session.run().unwrap().frames, 4);
    assert_eq!(session.renderer().states.len(), 4);
}

#[test]
fn fist_starts_the_animation_only_with_a_marker_in_view() {
    init_logs();
    let cam = camera();
    let source = ReplaySource::new([
        Some(with_fist(320, 240)),
        Some(with_fist(320, 240)),
        Some(plain(320, 240)),
        Some(plain(320, 240)),
    ]);
    let markers = ScriptedMarkers {
        frame: 0,
        visible: vec![false, true, true, true],
        observation: observation(3, &marker_pose(), &cam),
    };
    let mut session = ArSession::new(
        FramePipeline::new(cam, &AppConfig::default()),
        source,
        markers,
        RecordingRenderer::default(),
        FixedRateClock::new(10.0),
    );
    let summary = session.run().unwrap();
    assert_eq!(summary.triggers, 1);
    // The fist is also a closed hand shape.
    assert!(summary.gestures >= 2);

    let states = session.into_renderer().states;
    assert_eq!(states[0].animation_offset, Vector3::zeros());
    // Triggered at 100 ms: no lift yet, then 0.005 per 100 ms.
    assert_eq!(states[1].animation_offset, Vector3::zeros());
    assert!((states[2].animation_offset.y - 0.005).abs() < 1e-9);
    assert!((states[3].animation_offset.y - 0.010).abs() < 1e-9);
    assert_ne!(states[3].model, states[1].model);
}

fn board_pose(i: usize, board: &BoardSpec) -> Pose {
    let f = i as f64;
    let rot = Rotation3::from_euler_angles(
        0.35 * (0.9 * f).sin(),
        0.35 * (1.3 * f).cos(),
        0.1 * (0.7 * f).sin(),
    );
    let centre = Point3::new(
        (board.inner_cols - 1) as f64 * board.square_size / 2.0,
        (board.inner_rows - 1) as f64 * board.square_size / 2.0,
        0.0,
    );
    let t = Vector3::new(0.02 * f.cos(), 0.015 * f.sin(), 0.45) - rot * centre.coords;
    Pose::from_rotation(&rot, t)
}

struct SyntheticBoards {
    cam: CameraIntrinsics,
    frame: usize,
}

impl BoardDetector for SyntheticBoards {
    fn detect(&mut self, _gray: &GrayImageView<'_>, board: &BoardSpec) -> Option<Vec<Point2<f64>>> {
        let pose = board_pose(self.frame, board);
        self.frame += 1;
        board
            .object_points()
            .iter()
            .map(|p| self.cam.project(&pose.transform_point(p)))
            .collect()
    }
}

struct AlwaysAccept;

impl OperatorInput for AlwaysAccept {
    fn poll(&mut self, _progress: &CalibrationProgress<'_>) -> Option<OperatorCommand> {
        Some(OperatorCommand::Accept)
    }
}

struct AbortImmediately;

impl OperatorInput for AbortImmediately {
    fn poll(&mut self, _progress: &CalibrationProgress<'_>) -> Option<OperatorCommand> {
        Some(OperatorCommand::Abort)
    }
}

fn gray_frames(n: usize) -> ReplaySource {
    ReplaySource::new((0..n).map(|_| Some(RgbImage::filled(640, 480, [120, 120, 120]))))
}

#[test]
fn missing_record_is_calibrated_and_saved() {
    init_logs();
    let dir = tempfile::tempdir().unwrap();
    let store = IntrinsicsStore::new(dir.path().join("calibration_data.json"));
    let truth = CameraIntrinsics::new(820.0, 815.0, 322.0, 238.0);
    let calibrator = CameraCalibrator::new(CalibrationConfig {
        required_views: 8,
        ..CalibrationConfig::default()
    });

    let intr = bootstrap_intrinsics(
        &store,
        &calibrator,
        &mut gray_frames(20),
        &mut SyntheticBoards {
            cam: truth,
            frame: 0,
        },
        &mut AlwaysAccept,
    )
    .expect("calibrated");
    assert!(((intr.fx - truth.fx) / truth.fx).abs() < 1e-3);
    assert!(((intr.cy - truth.cy) / truth.cy).abs() < 1e-3);

    // A second start loads the record instead of calibrating.
    let again = bootstrap_intrinsics(
        &store,
        &calibrator,
        &mut gray_frames(0),
        &mut SyntheticBoards {
            cam: truth,
            frame: 0,
        },
        &mut AbortImmediately,
    )
    .expect("loaded");
    assert!((again.fx - intr.fx).abs() < 1e-9);
}

#[test]
fn aborted_calibration_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = IntrinsicsStore::new(dir.path().join("none.json"));
    let err = bootstrap_intrinsics(
        &store,
        &CameraCalibrator::default(),
        &mut gray_frames(5),
        &mut SyntheticBoards {
            cam: camera(),
            frame: 0,
        },
        &mut AbortImmediately,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::Calibration(CalibrationError::InsufficientViews {
            collected: 0,
            required: 20
        })
    ));
    assert!(!store.path().exists());
}
