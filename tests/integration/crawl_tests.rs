//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for both the car marketplace and the
//! recognition API, and drive full runs through the static HTML engine.

use image::GenericImageView;
use plate_scout::browser::StaticHtmlLauncher;
use plate_scout::config::{load_config, RunConfig};
use plate_scout::crawler::{build_http_client, Coordinator, CoordinatorOptions};
use plate_scout::images::RetryPolicy;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DETECTION_BODY: &str = r#"{"results": [
    {"plate": "1234AB56", "score": 0.93, "box": {"xmin": 10, "ymin": 10, "xmax": 60, "ymax": 30}}
]}"#;

/// Writes a settings file pointing at the mock server and loads it
fn write_config(
    dir: &TempDir,
    server: &MockServer,
    api_key: &str,
    pages: (u32, u32),
    workers: usize,
    first_car: u32,
) -> RunConfig {
    let contents = format!(
        r#"
[API]
PLATE_RECOGNIZER_API_URL = "{uri}/v1/plate-reader/"
PLATE_RECOGNIZER_API_KEY = "{api_key}"

[URL]
BASE_URL = "{uri}/"
MAIN_URL = "{uri}/list"

[SETTINGS]
START_PAGE = {start}
END_PAGE = {end}
MAX_WORKERS = {workers}
START_CAR_NUMBER = {first_car}

[OUTPUT]
WEB_IMAGES_FOLDER = '{web}'
CROPPED_IMAGES_FOLDER = '{crops}'

[SITE]
WAIT_TIMEOUT_SECS = 1
"#,
        uri = server.uri(),
        api_key = api_key,
        start = pages.0,
        end = pages.1,
        workers = workers,
        first_car = first_car,
        web = dir.path().join("web_images").display(),
        crops = dir.path().join("cropped_images").display(),
    );

    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, contents).unwrap();
    load_config(&config_path).unwrap()
}

/// Short timings so a run takes milliseconds
fn fast_options() -> CoordinatorOptions {
    CoordinatorOptions {
        retry: RetryPolicy {
            attempts: 3,
            pause: Duration::from_millis(10),
            timeout: Duration::from_secs(5),
        },
        api_min_interval: Duration::from_millis(10),
    }
}

fn coordinator(config: RunConfig) -> Coordinator {
    let launcher = Arc::new(StaticHtmlLauncher::new(build_http_client().unwrap()));
    Coordinator::with_options(config, launcher, fast_options()).unwrap()
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::RgbImage::from_pixel(width, height, image::Rgb([240, 240, 240]))
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageOutputFormat::Png,
        )
        .unwrap();
    bytes
}

fn listing_html(cars: &[&str]) -> String {
    let links: String = cars
        .iter()
        .map(|car| format!(r#"<a href="/car/{}">Car {}</a>"#, car, car))
        .collect();
    format!(
        r#"<html><body><div id="dync">{}</div><a href="/about">About</a></body></html>"#,
        links
    )
}

fn car_html(car: &str, photos: u32) -> String {
    let images: String = (1..=photos)
        .map(|n| format!(r#"<img src="/photos/{}_{}.png">"#, car, n))
        .collect();
    format!(
        r#"<html><body><div id="photodiv">{}<img src="/static/nophotop1.jpg"></div></body></html>"#,
        images
    )
}

async fn mount_listing(server: &MockServer, page: u32, cars: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/list"))
        .and(query_param("PN", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(cars)))
        .mount(server)
        .await;
}

async fn mount_car(server: &MockServer, car: &str, photos: u32) {
    Mock::given(method("GET"))
        .and(path(format!("/car/{}", car)))
        .respond_with(ResponseTemplate::new(200).set_body_string(car_html(car, photos)))
        .mount(server)
        .await;
}

fn assert_files(folder: &Path, names: &[&str]) {
    for name in names {
        assert!(
            folder.join(name).exists(),
            "expected {} in {}",
            name,
            folder.display()
        );
    }
}

#[tokio::test]
async fn test_end_to_end_single_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, 1, &["a", "b", "c"]).await;
    for car in ["a", "b", "c"] {
        mount_car(&server, car, 2).await;
    }

    Mock::given(method("GET"))
        .and(path_regex(r"^/photos/[abc]_[12]\.png$"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(160, 90)))
        .expect(6)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/plate-reader/"))
        .and(header("Authorization", "Token test-key"))
        .respond_with(ResponseTemplate::new(201).set_body_string(DETECTION_BODY))
        .expect(6)
        .mount(&server)
        .await;

    let config = write_config(&dir, &server, "test-key", (1, 1), 2, 1);
    let mut coordinator = coordinator(config);
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.pages_visited, 1);
    assert_eq!(summary.cars_processed, 3);
    assert_eq!(summary.cars_failed, 0);
    assert_eq!(summary.images_found, 6);
    assert_eq!(summary.downloads_succeeded, 6);
    assert_eq!(summary.recognition_calls, 6);
    assert_eq!(summary.plates_detected, 6);
    assert_eq!(summary.crops_saved, 6);
    assert!(!summary.recognition_disabled);
    assert_eq!(coordinator.next_car_index(), 4);

    let mut photos: Vec<String> = std::fs::read_dir(dir.path().join("web_images"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    photos.sort();
    assert_eq!(
        photos,
        vec![
            "web1_1_1_1.png",
            "web1_1_1_2.png",
            "web1_1_2_1.png",
            "web1_1_2_2.png",
            "web1_1_3_1.png",
            "web1_1_3_2.png",
        ]
    );

    assert_files(
        &dir.path().join("cropped_images"),
        &[
            "web1_1_1_1_cropped.png",
            "web1_1_2_2_cropped.png",
            "web1_1_3_1_cropped.png",
        ],
    );

    let crop = image::open(dir.path().join("cropped_images/web1_1_1_1_cropped.png")).unwrap();
    assert_eq!(crop.dimensions(), (70, 40));
}

#[tokio::test]
async fn test_car_numbering_continues_across_pages() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, 1, &["a1", "a2", "a3"]).await;
    mount_listing(&server, 2, &["b1", "b2"]).await;
    for car in ["a1", "a2", "a3", "b1", "b2"] {
        mount_car(&server, car, 1).await;
    }

    Mock::given(method("GET"))
        .and(path_regex(r"^/photos/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(32, 32)))
        .mount(&server)
        .await;

    // placeholder key: recognition is off from the start
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_string(DETECTION_BODY))
        .expect(0)
        .mount(&server)
        .await;

    let config = write_config(&dir, &server, "your_api_key_here", (1, 2), 3, 2);
    let mut coordinator = coordinator(config);
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.cars_processed, 4);
    assert_eq!(summary.recognition_calls, 0);
    assert!(summary.recognition_disabled);
    assert_eq!(coordinator.next_car_index(), 6);

    let web_images = dir.path().join("web_images");
    assert_files(
        &web_images,
        &[
            "web1_1_2_1.png",
            "web1_1_3_1.png",
            "web1_2_4_1.png",
            "web1_2_5_1.png",
        ],
    );
    assert!(!web_images.join("web1_1_1_1.png").exists());
    assert!(!dir.path().join("cropped_images").exists());
}

#[tokio::test]
async fn test_forbidden_disables_recognition_for_the_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, 1, &["a", "b"]).await;
    mount_car(&server, "a", 2).await;
    mount_car(&server, "b", 2).await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/photos/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(64, 48)))
        .expect(4)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/plate-reader/"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let config = write_config(&dir, &server, "revoked-key", (1, 1), 1, 1);
    let mut coordinator = coordinator(config);
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.downloads_succeeded, 4);
    assert_eq!(summary.recognition_calls, 1);
    assert!(summary.recognition_disabled);
    assert_eq!(summary.crops_saved, 0);
    assert_eq!(summary.cars_processed, 2);
}

#[tokio::test]
async fn test_missing_listing_page_is_skipped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, 1, &["a"]).await;
    mount_listing(&server, 3, &["c"]).await;
    mount_car(&server, "a", 0).await;
    mount_car(&server, "c", 0).await;

    let config = write_config(&dir, &server, "your_api_key_here", (1, 3), 2, 1);
    let mut coordinator = coordinator(config);
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.pages_failed, 1);
    assert_eq!(summary.cars_processed, 2);
    assert_eq!(coordinator.next_car_index(), 3);
}

#[tokio::test]
async fn test_failed_photo_download_does_not_stop_the_car() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, 1, &["a"]).await;
    mount_car(&server, "a", 2).await;

    Mock::given(method("GET"))
        .and(path("/photos/a_1.png"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/photos/a_2.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(16, 16)))
        .mount(&server)
        .await;

    let config = write_config(&dir, &server, "your_api_key_here", (1, 1), 1, 1);
    let mut coordinator = coordinator(config);
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.downloads_failed, 1);
    assert_eq!(summary.downloads_succeeded, 1);
    assert_eq!(summary.cars_processed, 1);

    let web_images = dir.path().join("web_images");
    assert!(!web_images.join("web1_1_1_1.png").exists());
    assert!(web_images.join("web1_1_1_2.png").exists());
}
