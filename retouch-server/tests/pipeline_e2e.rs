//! End-to-end pipeline scenarios against a local fixture server.
//!
//! Exercises the full edit and variation flows with a mock generation
//! service: mask geometry on the submitted image, validation ordering,
//! error propagation, and artifact cleanup on every exit path.

mod helpers;

use std::path::Path;
use std::sync::Arc;

use helpers::{rgb_png, spawn_image_server, MockGeneration};
use retouch_common::types::Point;
use retouch_common::Error;
use retouch_server::pipeline::artifacts::ArtifactStore;
use retouch_server::pipeline::Pipeline;
use retouch_server::services::fetch::ImageFetcher;

fn build_pipeline(dir: &Path, service: Arc<MockGeneration>) -> Pipeline {
    Pipeline::new(
        ImageFetcher::new().unwrap(),
        service,
        Arc::new(ArtifactStore::new(dir.to_path_buf())),
    )
}

fn square_points() -> Vec<Point> {
    vec![
        Point::new(10.0, 10.0),
        Point::new(50.0, 10.0),
        Point::new(50.0, 50.0),
        Point::new(10.0, 50.0),
    ]
}

fn artifact_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[tokio::test]
async fn edit_clears_square_region_to_transparency() {
    let tmp = tempfile::tempdir().unwrap();
    let service = Arc::new(MockGeneration::ok());
    let pipeline = build_pipeline(tmp.path(), Arc::clone(&service));
    let url = spawn_image_server(rgb_png(100, 100, [100, 150, 200])).await;

    let results = pipeline
        .edit(url, square_points(), "add a cat".to_string())
        .await
        .unwrap();
    assert_eq!(results.len(), 1);

    let edits = service.edits.lock().unwrap();
    assert_eq!(edits.len(), 1);
    let (png, prompt) = &edits[0];
    assert_eq!(prompt, "add a cat");

    let img = image::load_from_memory(png).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (100, 100));
    for y in 0..100 {
        for x in 0..100 {
            let px = img.get_pixel(x, y);
            let inside = (10..50).contains(&x) && (10..50).contains(&y);
            assert_eq!(
                px.0[3],
                if inside { 0 } else { 255 },
                "alpha wrong at ({x}, {y})"
            );
            assert_eq!(px.0[..3], [100, 150, 200], "RGB changed at ({x}, {y})");
        }
    }

    assert_eq!(
        artifact_count(tmp.path()),
        0,
        "artifacts must not outlive the job"
    );
}

#[tokio::test]
async fn two_point_mask_is_rejected_before_any_io() {
    let tmp = tempfile::tempdir().unwrap();
    let pipeline = build_pipeline(tmp.path(), Arc::new(MockGeneration::ok()));

    // Nothing listens on port 9, so a fetch attempt would surface a
    // Fetch error; getting InvalidMask proves validation came first.
    let err = pipeline
        .edit(
            "http://127.0.0.1:9/none.png".to_string(),
            vec![Point::new(1.0, 1.0), Point::new(2.0, 2.0)],
            "anything".to_string(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidMask(_)));
    assert_eq!(artifact_count(tmp.path()), 0, "no artifact may be allocated");
}

#[tokio::test]
async fn remote_failure_surfaces_payload_and_cleans_up() {
    let payload = r#"{"error":{"message":"billing hard limit reached"}}"#;
    let tmp = tempfile::tempdir().unwrap();
    let service = Arc::new(MockGeneration::failing(400, payload));
    let pipeline = build_pipeline(tmp.path(), service);
    let url = spawn_image_server(rgb_png(64, 64, [1, 2, 3])).await;

    let err = pipeline
        .edit(url, square_points(), "anything".to_string())
        .await
        .unwrap_err();

    match err {
        Error::RemoteService { status, payload: p } => {
            assert_eq!(status, Some(400));
            assert_eq!(p, payload, "service payload must be forwarded verbatim");
        }
        other => panic!("expected RemoteService error, got {other}"),
    }
    assert_eq!(artifact_count(tmp.path()), 0);
}

#[tokio::test]
async fn fetch_404_fails_with_upstream_status() {
    let tmp = tempfile::tempdir().unwrap();
    let pipeline = build_pipeline(tmp.path(), Arc::new(MockGeneration::ok()));
    let url = spawn_image_server(rgb_png(8, 8, [0, 0, 0]))
        .await
        .replace("/source.png", "/missing.png");

    let err = pipeline
        .edit(url, square_points(), "anything".to_string())
        .await
        .unwrap_err();

    match err {
        Error::Fetch { status, .. } => assert_eq!(status, Some(404)),
        other => panic!("expected Fetch error, got {other}"),
    }
    assert_eq!(artifact_count(tmp.path()), 0);
}

#[tokio::test]
async fn undecodable_source_is_unsupported_and_cleaned_up() {
    let tmp = tempfile::tempdir().unwrap();
    let pipeline = build_pipeline(tmp.path(), Arc::new(MockGeneration::ok()));
    let url = spawn_image_server(b"definitely not an image".to_vec()).await;

    let err = pipeline
        .edit(url, square_points(), "anything".to_string())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnsupportedFormat(_)));
    // The original download was already on disk when decoding failed;
    // release must have removed it.
    assert_eq!(artifact_count(tmp.path()), 0);
}

#[tokio::test]
async fn collinear_mask_submits_fully_opaque_image() {
    let tmp = tempfile::tempdir().unwrap();
    let service = Arc::new(MockGeneration::ok());
    let pipeline = build_pipeline(tmp.path(), Arc::clone(&service));
    let url = spawn_image_server(rgb_png(20, 20, [50, 60, 70])).await;

    // Degenerate polygon: an explicit empty-mask outcome, not an error.
    let collinear = vec![
        Point::new(0.0, 5.0),
        Point::new(10.0, 5.0),
        Point::new(19.0, 5.0),
    ];
    pipeline
        .edit(url, collinear, "anything".to_string())
        .await
        .unwrap();

    let edits = service.edits.lock().unwrap();
    let img = image::load_from_memory(&edits[0].0).unwrap().to_rgba8();
    assert!(img.pixels().all(|px| px.0[3] == 255));
    assert_eq!(artifact_count(tmp.path()), 0);
}

#[tokio::test]
async fn variations_submit_normalized_source_unchanged() {
    let tmp = tempfile::tempdir().unwrap();
    let service = Arc::new(MockGeneration::ok());
    let pipeline = build_pipeline(tmp.path(), Arc::clone(&service));
    let url = spawn_image_server(rgb_png(32, 24, [9, 9, 9])).await;

    let results = pipeline.variations(url).await.unwrap();
    assert_eq!(results.len(), 1);

    let varies = service.varies.lock().unwrap();
    let img = image::load_from_memory(&varies[0]).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (32, 24));
    assert!(img.pixels().all(|px| px.0 == [9, 9, 9, 255]));
    assert_eq!(artifact_count(tmp.path()), 0);
}

#[tokio::test]
async fn concurrent_edits_do_not_interfere() {
    let tmp = tempfile::tempdir().unwrap();
    let service = Arc::new(MockGeneration::ok());
    let pipeline = Arc::new(build_pipeline(tmp.path(), Arc::clone(&service)));
    let url = spawn_image_server(rgb_png(40, 40, [10, 20, 30])).await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let pipeline = Arc::clone(&pipeline);
        let url = url.clone();
        handles.push(tokio::spawn(async move {
            pipeline
                .edit(url, square_points(), format!("job {i}"))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(service.edits.lock().unwrap().len(), 8);
    assert_eq!(artifact_count(tmp.path()), 0);
}
