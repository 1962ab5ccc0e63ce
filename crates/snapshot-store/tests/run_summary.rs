use softlight_snapshot_store::{generate_summary, CaptureStatus, CaptureStore, SUMMARY_HEADER};
use surface_driver::{MemorySurface, SurfaceDriver};
use std::time::Duration;

fn read_rows(path: &std::path::Path) -> Vec<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(headers, SUMMARY_HEADER);
    reader
        .records()
        .map(|row| row.unwrap().iter().map(str::to_string).collect())
        .collect()
}

#[tokio::test]
async fn summary_rows_follow_step_order() {
    let dir = tempfile::tempdir().unwrap();
    let surface = MemorySurface::new();
    surface.set_title("Swag Labs");
    surface
        .navigate("https://www.saucedemo.com/", Duration::from_secs(1))
        .await
        .unwrap();

    let mut store = CaptureStore::create(dir.path(), "saucedemo").unwrap();
    store.capture(&surface, 2, "find_and_click_login", CaptureStatus::Ok).await.unwrap();
    store.capture(&surface, 1, "open_https://www.saucedemo.com/", CaptureStatus::Ok).await.unwrap();
    store.capture(&surface, 3, "error_fill", CaptureStatus::Failed).await.unwrap();

    let path = store.write_summary().unwrap();
    assert_eq!(path.file_name().unwrap(), "dataset_summary.csv");

    let rows = read_rows(&path);
    let steps: Vec<&str> = rows.iter().map(|row| row[0].as_str()).collect();
    assert_eq!(steps, ["1", "2", "3"]);
    assert_eq!(rows[2][1], "error_fill");
    assert_eq!(rows[2][2], "failed");
    assert_eq!(rows[0][4], "https://www.saucedemo.com/");
    assert_eq!(rows[0][5], "Swag Labs");
    // no screenshot configured on the surface
    assert_eq!(rows[0][3], "");
}

#[tokio::test]
async fn regenerated_summary_matches_disk() {
    let dir = tempfile::tempdir().unwrap();
    let surface = MemorySurface::new();
    let mut store = CaptureStore::create(dir.path(), "generic").unwrap();
    store.capture(&surface, 1, "wait_for", CaptureStatus::Ok).await.unwrap();
    store.capture(&surface, 2, "expect_done", CaptureStatus::Ok).await.unwrap();

    std::fs::write(store.run_dir().join("zz_broken.json"), b"{not json").unwrap();
    let path = generate_summary(store.run_dir()).unwrap();
    let rows = read_rows(&path);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][1], "expect_done");
}

#[tokio::test]
async fn empty_run_has_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let store = CaptureStore::create(dir.path(), "generic").unwrap();
    let path = store.write_summary().unwrap();
    assert!(read_rows(&path).is_empty());
}
