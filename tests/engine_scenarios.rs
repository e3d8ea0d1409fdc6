//! End-to-end crawl scenarios against a mock Moodle server
//!
//! Each test stands up a wiremock server shaped like a small course site and
//! drives `CrawlEngine::run` against it, checking the resolved items, the
//! archive contents, and the run-level error behavior.

use std::io::Cursor;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use coursepack::app::{CrawlEngine, MoodleClient, RunOutcome};
use coursepack::errors::CrawlError;

fn engine_with(cancel: CancellationToken) -> (CrawlEngine, mpsc::UnboundedReceiver<String>) {
    let client = MoodleClient::new().expect("client should build");
    let (tx, rx) = mpsc::unbounded_channel();
    (CrawlEngine::new(client, cancel, tx), rx)
}

fn course_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}/moodle/course/view.php?id=1", server.uri())).unwrap()
}

async fn mount_html(server: &MockServer, at: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html.to_string(), "text/html"))
        .mount(server)
        .await;
}

fn entry_names(bytes: Vec<u8>) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

#[tokio::test]
async fn two_folders_one_resolvable_one_falling_back() {
    let server = MockServer::start().await;

    mount_html(
        &server,
        "/moodle/course/view.php",
        r#"<html><body><h1>Algorithms and Data Structures</h1>
        <a class="aalink" href="/mod/folder/view.php?id=5">Lecture slides</a>
        <a class="aalink" href="/mod/folder/view.php?id=6">Worksheets</a>
        </body></html>"#,
    )
    .await;

    // Folder 5 carries a complete download form
    Mock::given(method("GET"))
        .and(path("/mod/folder/view.php"))
        .and(query_param("id", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<html><body>
            <form action="/mod/folder/download_folder.php" method="post">
                <input type="hidden" name="id" value="5">
                <input type="hidden" name="sesskey" value="abc">
                <button type="submit">Download folder</button>
            </form></body></html>"#,
            "text/html",
        ))
        .mount(&server)
        .await;

    // Folder 6 has no form and falls back to its child links
    Mock::given(method("GET"))
        .and(path("/mod/folder/view.php"))
        .and(query_param("id", "6"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<html><body>
            <a class="aalink" href="/mod/resource/view.php?id=7">Worksheet 1</a>
            </body></html>"#,
            "text/html",
        ))
        .mount(&server)
        .await;

    // Constructed archive URL for folder 5
    Mock::given(method("GET"))
        .and(path("/mod/folder/download_folder.php"))
        .and(query_param("id", "5"))
        .and(query_param("sesskey", "abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"PK\x03\x04folder-bytes".to_vec(), "application/zip")
                .insert_header(
                    "content-disposition",
                    r#"attachment; filename="Lecture Slides.zip""#,
                ),
        )
        .mount(&server)
        .await;

    // Resource 7 wraps a pluginfile link
    mount_html(
        &server,
        "/mod/resource/view.php",
        r#"<html><body><div role="main">
        <a href="/pluginfile.php/9/mod_resource/content/1/worksheet1.pdf">Worksheet 1</a>
        </div></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path(
            "/pluginfile.php/9/mod_resource/content/1/worksheet1.pdf",
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let (engine, _progress) = engine_with(CancellationToken::new());
    let outcome = engine.run(&course_url(&server)).await.unwrap();

    match outcome {
        RunOutcome::Completed(archive) => {
            assert_eq!(archive.file_name, "Algorithms_and_Data_Structures.zip");
            assert_eq!(archive.files_added, 2);
            assert_eq!(
                entry_names(archive.bytes),
                vec!["Lecture_Slides.zip", "worksheet1.pdf"]
            );
        }
        RunOutcome::Cancelled => panic!("run should complete"),
    }
}

#[tokio::test]
async fn resource_redirecting_to_pdf_resolves_without_second_parse() {
    let server = MockServer::start().await;

    mount_html(
        &server,
        "/moodle/course/view.php",
        r#"<html><body>
        <a class="aalink" href="/mod/resource/view.php?id=12">Slides</a>
        </body></html>"#,
    )
    .await;

    let target = format!("{}/files/slides.pdf", server.uri());
    Mock::given(method("GET"))
        .and(path("/mod/resource/view.php"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", target.as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/slides.pdf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let (engine, _progress) = engine_with(CancellationToken::new());
    let outcome = engine.run(&course_url(&server)).await.unwrap();

    match outcome {
        RunOutcome::Completed(archive) => {
            // No title on the course page; the default stem applies
            assert_eq!(archive.file_name, "course_materials.zip");
            assert_eq!(entry_names(archive.bytes), vec!["slides.pdf"]);
        }
        RunOutcome::Cancelled => panic!("run should complete"),
    }
}

#[tokio::test]
async fn non_course_url_is_rejected_before_any_fetch() {
    let server = MockServer::start().await;
    let url = Url::parse(&format!("{}/somewhere/else", server.uri())).unwrap();

    let (engine, _progress) = engine_with(CancellationToken::new());
    let err = engine.run(&url).await.unwrap_err();
    assert!(matches!(err, CrawlError::NotACoursePage));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn course_page_without_links_fails() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/moodle/course/view.php",
        "<html><body><p>Empty course</p></body></html>",
    )
    .await;

    let (engine, _progress) = engine_with(CancellationToken::new());
    let err = engine.run(&course_url(&server)).await.unwrap_err();
    assert!(matches!(err, CrawlError::NoInitialLinks));
}

#[tokio::test]
async fn scan_resolving_no_items_fails() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/moodle/course/view.php",
        r#"<html><body>
        <a class="aalink stretched-link" href="/course/section.php?id=2">Section</a>
        </body></html>"#,
    )
    .await;
    mount_html(
        &server,
        "/course/section.php",
        "<html><body><p>Nothing downloadable</p></body></html>",
    )
    .await;

    let (engine, _progress) = engine_with(CancellationToken::new());
    let err = engine.run(&course_url(&server)).await.unwrap_err();
    assert!(matches!(err, CrawlError::NoItemsAfterScan));
}

#[tokio::test]
async fn all_items_failing_to_download_fails_the_run() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/moodle/course/view.php",
        r#"<html><body>
        <a class="aalink" href="/mod/resource/view.php?id=7">Worksheet</a>
        </body></html>"#,
    )
    .await;
    mount_html(
        &server,
        "/mod/resource/view.php",
        r#"<html><body><div role="main">
        <a href="/pluginfile.php/9/content/gone.pdf">gone</a>
        </div></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/pluginfile.php/9/content/gone.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (engine, _progress) = engine_with(CancellationToken::new());
    let err = engine.run(&course_url(&server)).await.unwrap_err();
    assert!(matches!(err, CrawlError::NoFilesArchived));
}

#[tokio::test]
async fn missing_wrapper_link_falls_back_to_page_body() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/moodle/course/view.php",
        r#"<html><body>
        <a class="aalink" href="/mod/resource/view.php?id=7">Worksheet</a>
        </body></html>"#,
    )
    .await;
    // Wrapper with no pluginfile link anywhere; its own body becomes the
    // archived content under a synthesized name
    mount_html(
        &server,
        "/mod/resource/view.php",
        "<html><body><p>Sorry, nothing here</p></body></html>",
    )
    .await;

    let (engine, _progress) = engine_with(CancellationToken::new());
    let outcome = engine.run(&course_url(&server)).await.unwrap();

    match outcome {
        RunOutcome::Completed(archive) => {
            assert_eq!(archive.files_added, 1);
            assert_eq!(entry_names(archive.bytes), vec!["file_7.html"]);
        }
        RunOutcome::Cancelled => panic!("run should complete"),
    }
}

#[tokio::test]
async fn cancellation_mid_crawl_produces_no_archive() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/moodle/course/view.php",
        r#"<html><body>
        <a class="aalink stretched-link" href="/pluginfile.php/1/content/slides.pdf">Slides</a>
        </body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/pluginfile.php/1/content/slides.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf")
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let (engine, _progress) = engine_with(cancel);
    let outcome = engine.run(&course_url(&server)).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Cancelled));
}

#[tokio::test]
async fn duplicate_links_are_fetched_once() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/moodle/course/view.php",
        r#"<html><body>
        <a class="aalink" href="/mod/resource/view.php?id=7">Worksheet</a>
        <a class="aalink" href="/mod/resource/view.php?id=7">Worksheet again</a>
        </body></html>"#,
    )
    .await;
    mount_html(
        &server,
        "/mod/resource/view.php",
        r#"<html><body><div role="main">
        <a href="/pluginfile.php/9/content/ws.pdf">ws</a>
        </div></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/pluginfile.php/9/content/ws.pdf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let (engine, _progress) = engine_with(CancellationToken::new());
    let outcome = engine.run(&course_url(&server)).await.unwrap();

    match outcome {
        RunOutcome::Completed(archive) => assert_eq!(archive.files_added, 1),
        RunOutcome::Cancelled => panic!("run should complete"),
    }

    // One discovery fetch plus one wrapper fetch for the deduplicated URL
    let wrapper_hits = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/mod/resource/view.php")
        .count();
    assert_eq!(wrapper_hits, 2);
}

#[tokio::test]
async fn progress_events_are_emitted() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/moodle/course/view.php",
        r#"<html><body>
        <a class="aalink" href="/mod/resource/view.php?id=7">Worksheet</a>
        </body></html>"#,
    )
    .await;
    mount_html(
        &server,
        "/mod/resource/view.php",
        r#"<html><body><div role="main">
        <a href="/pluginfile.php/9/content/ws.pdf">ws</a>
        </div></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/pluginfile.php/9/content/ws.pdf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let (engine, mut progress) = engine_with(CancellationToken::new());
    engine.run(&course_url(&server)).await.unwrap();

    let mut messages = Vec::new();
    while let Ok(message) = progress.try_recv() {
        messages.push(message);
    }
    assert!(messages.iter().any(|m| m.contains("Scanning")));
    assert!(messages.iter().any(|m| m.contains("Downloading file 1 of 1")));
    assert!(messages.iter().any(|m| m.contains("Zipping")));
}
