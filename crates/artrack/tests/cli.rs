use artrack::calib::BoardSpec;
use artrack::core::{CameraIntrinsics, IntrinsicsStore, Pose};
use artrack::pose::marker_object_points;
use assert_cmd::Command;
use nalgebra::{Point3, Rotation3, Vector3};
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

fn artrack() -> Command {
    Command::cargo_bin("artrack").expect("binary")
}

fn truth() -> CameraIntrinsics {
    CameraIntrinsics::new(790.0, 785.0, 318.0, 244.0)
}

fn board_views(cam: &CameraIntrinsics, n: usize) -> Value {
    let board = BoardSpec::default();
    let centre = Point3::new(
        (board.inner_cols - 1) as f64 * board.square_size / 2.0,
        (board.inner_rows - 1) as f64 * board.square_size / 2.0,
        0.0,
    );
    let views: Vec<Vec<[f64; 2]>> = (0..n)
        .map(|i| {
            let f = i as f64;
            let rot = Rotation3::from_euler_angles(
                0.3 * (1.1 * f).sin(),
                0.3 * (0.8 * f).cos(),
                0.05 * f.sin(),
            );
            let t = Vector3::new(0.01 * f.cos(), 0.01 * f.sin(), 0.5) - rot * centre.coords;
            let pose = Pose::from_rotation(&rot, t);
            board
                .object_points()
                .iter()
                .map(|p| {
                    let px = cam.project(&pose.transform_point(p)).expect("in front");
                    [px.x, px.y]
                })
                .collect()
        })
        .collect();
    json!({ "image_size": [640, 480], "views": views })
}

fn write(path: &Path, value: &Value) {
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

#[test]
fn calibrate_writes_a_loadable_record() {
    let dir = tempfile::tempdir().unwrap();
    let views = dir.path().join("views.json");
    let output = dir.path().join("calibration_data.json");
    write(&views, &board_views(&truth(), 10));

    artrack()
        .args(["calibrate", "--views"])
        .arg(&views)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("rms_error"));

    let intr = IntrinsicsStore::new(&output)
        .load()
        .unwrap()
        .expect("calibrated");
    assert!(((intr.fx - truth().fx) / truth().fx).abs() < 1e-3);
    assert!(((intr.cx - truth().cx) / truth().cx).abs() < 1e-3);

    let raw = fs::read_to_string(&output).unwrap();
    assert!(raw.contains("cameraMatrix"));
    assert!(raw.contains("distCoeffs"));
}

#[test]
fn calibrate_rejects_too_few_views() {
    let dir = tempfile::tempdir().unwrap();
    let views = dir.path().join("views.json");
    write(&views, &board_views(&truth(), 2));

    artrack()
        .args(["calibrate", "--views"])
        .arg(&views)
        .arg("--output")
        .arg(dir.path().join("out.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
    assert!(!dir.path().join("out.json").exists());
}

#[test]
fn pose_reports_each_observation() {
    let dir = tempfile::tempdir().unwrap();
    let calibration = dir.path().join("calibration_data.json");
    let cam = CameraIntrinsics::new(600.0, 600.0, 320.0, 240.0);
    IntrinsicsStore::new(&calibration).save(&cam).unwrap();

    let pose = Pose::from_rotation(
        &Rotation3::from_euler_angles(0.1, 0.2, -0.3),
        Vector3::new(0.02, 0.01, 0.4),
    );
    let corners: Vec<[f64; 2]> = marker_object_points(0.05)
        .iter()
        .map(|p| {
            let px = cam.project(&pose.transform_point(p)).unwrap();
            [px.x, px.y]
        })
        .collect();
    let observations = dir.path().join("obs.json");
    write(
        &observations,
        &json!([
            { "id": 12, "corners": corners },
            { "id": 13, "corners": [[10.0, 10.0], [10.0, 10.0], [10.0, 10.0], [10.0, 10.0]] },
        ]),
    );

    let out = artrack()
        .args(["pose", "--calibration"])
        .arg(&calibration)
        .arg("--observations")
        .arg(&observations)
        .args(["--near", "0.05", "--far", "50"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let reports: Value = serde_json::from_slice(&out).unwrap();
    let reports = reports.as_array().unwrap();
    assert_eq!(reports.len(), 2);

    assert_eq!(reports[0]["id"], 12);
    let t = &reports[0]["pose"]["translation"];
    assert!((t[2].as_f64().unwrap() - 0.4).abs() < 1e-6);
    assert!(reports[0]["reprojection_rms"].as_f64().unwrap() < 1e-6);
    // Column-major projection: element 10 is -(far + near) / (far - near).
    let p10 = reports[0]["projection"][10].as_f64().unwrap();
    assert!((p10 + 50.05 / 49.95).abs() < 1e-5);

    assert_eq!(reports[1]["id"], 13);
    assert!(reports[1]["error"].is_string());
    assert!(reports[1].get("pose").is_none());
}

#[test]
fn pose_without_calibration_fails() {
    let dir = tempfile::tempdir().unwrap();
    let observations = dir.path().join("obs.json");
    write(&observations, &json!([]));

    artrack()
        .args(["pose", "--calibration"])
        .arg(dir.path().join("missing.json"))
        .arg("--observations")
        .arg(&observations)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no usable calibration"));
}

#[test]
fn gestures_prints_one_line_per_event() {
    let dir = tempfile::tempdir().unwrap();
    let mut paths = Vec::new();
    for (i, x0) in [40u32, 80, 120].into_iter().enumerate() {
        let mut img = image::RgbImage::from_pixel(320, 240, image::Rgb([30, 60, 200]));
        for y in 90..150 {
            for x in x0..x0 + 60 {
                img.put_pixel(x, y, image::Rgb([220, 170, 140]));
            }
        }
        let path = dir.path().join(format!("frame{i}.png"));
        img.save(&path).unwrap();
        paths.push(path);
    }

    let out = artrack()
        .arg("gestures")
        .args(&paths)
        .args(["--fps", "20"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let lines: Vec<Value> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let closed = lines.iter().filter(|l| l["kind"] == "closed").count();
    assert_eq!(closed, 3);
    let swipe = lines
        .iter()
        .find(|l| l["kind"] == "swipe_right")
        .expect("swipe");
    assert_eq!(swipe["frame"], 2);
    assert_eq!(swipe["time_ms"], 100);
}

#[test]
fn bad_config_file_fails_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("artrack.json");
    fs::write(&config, "not json").unwrap();
    artrack()
        .arg("--config")
        .arg(&config)
        .args(["gestures", "nothing.png"])
        .assert()
        .failure();
}
