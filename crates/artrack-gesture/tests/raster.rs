use artrack_core::RgbImage;
use artrack_gesture::{
    GestureDetector, GestureKind, HandRegion, HandShapeClassifier, ShapePolicy,
};
use nalgebra::Point2;
use std::time::Duration;

const BACKGROUND: [u8; 3] = [30, 60, 200];
const SKIN: [u8; 3] = [220, 170, 140];

fn fill(img: &mut RgbImage, x0: usize, y0: usize, w: usize, h: usize) {
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            img.put_pixel(x, y, SKIN);
        }
    }
}

/// Palm with five raised fingers, top-left corner of the bounding box at
/// `(ox, oy)`.
fn open_hand(ox: usize, oy: usize) -> RgbImage {
    let mut img = RgbImage::filled(320, 240, BACKGROUND);
    let lengths = [60, 80, 90, 80, 60];
    let tallest = 90;
    fill(&mut img, ox, oy + tallest, 144, 80);
    for (i, len) in lengths.into_iter().enumerate() {
        fill(&mut img, ox + 32 * i, oy + tallest - len, 16, len);
    }
    img
}

fn block_at(x: usize, y: usize, side: usize) -> RgbImage {
    let mut img = RgbImage::filled(320, 240, BACKGROUND);
    fill(&mut img, x, y, side, side);
    img
}

fn polygon(v: &[(i32, i32)]) -> HandRegion {
    HandRegion::from_contour(v.iter().map(|&(x, y)| Point2::new(x, y)).collect())
}

#[test]
fn synthetic_open_hand_is_recognised() {
    let img = open_hand(80, 40);
    let classifier = HandShapeClassifier::default();

    let regions = classifier.find_hand_regions(&img.view());
    assert_eq!(regions.len(), 1);
    assert!(regions[0].area > 15000.0 && regions[0].area < 18000.0);

    let event = classifier
        .classify(&img.view(), Duration::from_millis(40))
        .expect("hand shape");
    assert_eq!(event.kind, GestureKind::Open);
    assert_eq!(event.timestamp, Duration::from_millis(40));
    assert_eq!(event.confidence, 0.8);
    assert!((event.position.x - 152.0).abs() < 3.0, "{:?}", event.position);
    assert!((event.position.y - 125.0).abs() < 3.0, "{:?}", event.position);
}

#[test]
fn small_blobs_and_empty_frames_emit_nothing() {
    let mut detector = GestureDetector::default();
    let small = block_at(100, 100, 20);
    assert!(detector.detect(&small.view(), Duration::ZERO).is_empty());
    let empty = RgbImage::filled(320, 240, BACKGROUND);
    assert!(detector.detect(&empty.view(), Duration::from_millis(33)).is_empty());
    assert_eq!(detector.tracker().trajectory().count(), 0);
}

#[test]
fn outline_shapes_follow_the_defect_policy() {
    let classifier = HandShapeClassifier::default();
    let now = Duration::from_millis(5);

    let open = polygon(&[
        (0, 170),
        (0, 30),
        (16, 30),
        (16, 90),
        (32, 90),
        (32, 10),
        (48, 10),
        (48, 90),
        (64, 90),
        (64, 0),
        (80, 0),
        (80, 90),
        (96, 90),
        (96, 10),
        (112, 10),
        (112, 90),
        (128, 90),
        (128, 30),
        (144, 30),
        (144, 170),
    ]);
    assert_eq!(open.significant_defects(20.0), Some(4));
    let e = classifier.classify_region(&open, now).expect("open");
    assert_eq!(e.kind, GestureKind::Open);

    let pointing = polygon(&[
        (0, 100),
        (0, 200),
        (100, 200),
        (100, 100),
        (60, 100),
        (60, 0),
        (40, 0),
        (40, 100),
    ]);
    assert_eq!(pointing.significant_defects(20.0), Some(2));
    let e = classifier.classify_region(&pointing, now).expect("pointing");
    assert_eq!(e.kind, GestureKind::Pointing);
    assert_eq!(e.position, Point2::new(50.5, 100.5));

    // A fist: shallow knuckle notches only.
    let fist = polygon(&[
        (0, 10),
        (0, 100),
        (90, 100),
        (90, 10),
        (70, 10),
        (60, 5),
        (50, 10),
        (40, 5),
        (30, 10),
        (20, 5),
        (10, 10),
    ]);
    let e = classifier.classify_region(&fist, now).expect("closed");
    assert_eq!(e.kind, GestureKind::Closed);

    // Three defects sit between the pointing and open counts.
    let policy = ShapePolicy::default();
    assert_eq!(policy.classify(3), GestureKind::None);
}

#[test]
fn moving_hand_produces_a_swipe() {
    let mut detector = GestureDetector::default();
    let mut swipes = Vec::new();
    for (i, x) in [60, 90, 120].into_iter().enumerate() {
        let frame = block_at(x, 90, 60);
        let events = detector.detect(&frame.view(), Duration::from_millis(33 * i as u64));
        assert_eq!(events[0].kind, GestureKind::Closed);
        swipes.extend(events.into_iter().filter(|e| e.kind.is_swipe()));
    }
    assert_eq!(swipes.len(), 1);
    assert_eq!(swipes[0].kind, GestureKind::SwipeRight);
    assert_eq!(swipes[0].timestamp, Duration::from_millis(66));
    assert!(swipes[0].confidence > 0.55 && swipes[0].confidence < 0.65);
    assert_eq!(detector.tracker().trajectory().count(), 0);
}
