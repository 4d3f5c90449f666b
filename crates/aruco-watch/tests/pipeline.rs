use aruco_watch::markers::{builtins, render_marker, ArucoDetector, DetectorParams};
use aruco_watch::run::{run_stream, StopReason, StreamOptions};
use aruco_watch::{NoPreview, SightingLog, VecSource};
use image::{Rgb, RgbImage};

const CELL: usize = 10;

/// 340x160 white frame with the given markers in slots left to right.
fn frame_with(ids: &[u32]) -> RgbImage {
    let mut frame = RgbImage::from_pixel(340, 160, Rgb([255, 255, 255]));
    for (slot, &id) in ids.iter().enumerate() {
        let marker =
            render_marker(builtins::DICT_ARUCO_ORIGINAL, id, CELL, 0).expect("render marker");
        let x0 = 20 + slot as u32 * 105;
        for y in 0..marker.height {
            for x in 0..marker.width {
                let v = marker.get(x, y);
                frame.put_pixel(x0 + x as u32, 45 + y as u32, Rgb([v, v, v]));
            }
        }
    }
    frame
}

fn streaming_detector() -> ArucoDetector {
    ArucoDetector::new(builtins::DICT_ARUCO_ORIGINAL, DetectorParams::streaming())
}

#[test]
fn first_sightings_are_logged_once_with_their_frame() {
    let frames = vec![
        frame_with(&[]),
        frame_with(&[3, 500]),
        frame_with(&[500]),
        frame_with(&[3, 1000]),
        frame_with(&[]),
    ];
    let mut source = VecSource::new(frames);
    let mut log = SightingLog::in_memory();

    let summary = run_stream(
        &mut source,
        &streaming_detector(),
        &mut log,
        &mut NoPreview,
        StreamOptions::default(),
        &mut std::io::sink(),
    )
    .expect("run");

    assert_eq!(summary.frames, 5);
    assert_eq!(summary.stopped, StopReason::EndOfStream);

    let mut sightings = summary.first_sightings.clone();
    sightings.sort_unstable();
    assert_eq!(sightings, vec![(2, 3), (2, 500), (4, 1000)]);

    let contents = log.contents();
    let mut lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2], "Frame 4: Detected ID: 1000");
    lines.truncate(2);
    lines.sort_unstable();
    assert_eq!(
        lines,
        vec!["Frame 2: Detected ID: 3", "Frame 2: Detected ID: 500"]
    );
}

#[test]
fn empty_stream_processes_nothing() {
    let mut log = SightingLog::in_memory();
    let summary = run_stream(
        &mut VecSource::default(),
        &streaming_detector(),
        &mut log,
        &mut NoPreview,
        StreamOptions::default(),
        &mut std::io::sink(),
    )
    .expect("run");
    assert_eq!(summary.frames, 0);
    assert!(summary.first_sightings.is_empty());
    assert!(log.contents().is_empty());
}

#[test]
fn sighting_log_file_matches_summary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("output").join("detected_markers.txt");
    let mut source = VecSource::new(vec![frame_with(&[77]), frame_with(&[77])]);

    let summary = {
        let mut log = SightingLog::create(&path).expect("create log");
        run_stream(
            &mut source,
            &streaming_detector(),
            &mut log,
            &mut NoPreview,
            StreamOptions::default(),
            &mut std::io::sink(),
        )
        .expect("run")
    };

    assert_eq!(summary.first_sightings, vec![(1, 77)]);
    assert_eq!(
        std::fs::read_to_string(&path).expect("read log"),
        "Frame 1: Detected ID: 77\n"
    );
}
