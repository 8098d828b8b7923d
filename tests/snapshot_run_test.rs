//! Full snapshot runs: document loading, output files and fatal errors

mod common;

use common::{
    assert_file_exists_with_content, create_error_mock, create_resource_mock, create_test_dir,
    create_test_html, test_url,
};
use mockito::Server;
use oneshot_snapshot::snapshot::take_snapshot_with;
use oneshot_snapshot::utils::FAILED_LOAD_ATTR;
use oneshot_snapshot::{LocalFetcher, SnapshotConfig, SnapshotError};
use std::sync::Arc;

#[tokio::test]
async fn test_local_snapshot_inlines_everything() -> anyhow::Result<()> {
    let dir = create_test_dir()?;
    let root = dir.path();
    std::fs::create_dir(root.join("img"))?;
    std::fs::write(root.join("img/pic.jpg"), [0xFFu8, 0xD8])?;
    std::fs::write(root.join("img/bg.png"), [0x89u8, 0x50, 0x4E])?;
    std::fs::write(root.join("style.css"), "body{background:url('img/bg.png')}")?;
    std::fs::write(root.join("app.js"), "document.title = 'x';")?;

    let page = root.join("page.html");
    std::fs::write(
        &page,
        create_test_html(
            r#"<link rel="stylesheet" href="style.css"><script src="app.js"></script>"#,
            r#"<img src="img/pic.jpg"><img src="img/absent.gif">"#,
        ),
    )?;

    let output = root.join("out").join("snapshot.html");
    let config = SnapshotConfig::builder()
        .document_url(page.to_string_lossy())
        .output_file(&output)
        .remove_scripts(true)
        .build()?;
    assert!(config.local());

    let report = oneshot_snapshot::snapshot(&config).await?;
    let written = assert_file_exists_with_content(&output).await?;

    assert_eq!(written, report.html);
    assert!(written.contains("data:image/jpeg;base64,/9g="));
    assert!(written.contains("url(data:image/png;base64,iVBO)"));
    assert!(!written.contains("<link"));
    assert!(!written.contains("<script"));
    assert!(written.contains(FAILED_LOAD_ATTR));

    assert_eq!(report.scripts_disabled, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].url.ends_with("/img/absent.gif"));
    Ok(())
}

#[tokio::test]
async fn test_remote_snapshot() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let html = create_test_html(
        r#"<link rel="stylesheet" href="/css/site.css">"#,
        r#"<img src="pic.png"><img src="/pic.png">"#,
    );
    let _page = create_resource_mock(&mut server, "/docs/page.html", "text/html", html).await;
    let _css = create_resource_mock(
        &mut server,
        "/css/site.css",
        "text/css",
        ".a{background:url(../missing.png)}",
    )
    .await;
    let pic = server
        .mock("GET", "/docs/pic.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body([0x89u8, 0x50, 0x4E])
        .expect(1)
        .create_async()
        .await;
    let _root_pic = create_resource_mock(&mut server, "/pic.png", "image/gif", "GIF").await;
    let _missing = create_error_mock(&mut server, "/missing.png", 404).await;

    let dir = create_test_dir()?;
    let output = dir.path().join("snap.html");
    let config = SnapshotConfig::builder()
        .document_url(test_url(&server, "/docs/page.html"))
        .output_file(&output)
        .max_concurrent_fetches(2)
        .build()?;
    assert!(!config.local());

    let report = oneshot_snapshot::snapshot(&config).await?;
    let written = assert_file_exists_with_content(&output).await?;

    assert!(written.contains("data:image/png;base64,iVBO"));
    assert!(written.contains("data:image/gif;base64,R0lG"));
    assert!(written.contains(&format!("url({})", test_url(&server, "/missing.png"))));
    assert_eq!(report.fetched, 3);
    assert_eq!(report.failures.len(), 1);
    pic.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_local_page_inlines_network_scripts_and_stylesheets() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let css = create_resource_mock(&mut server, "/lib/site.css", "text/css", "p{color:red}").await;
    let js =
        create_resource_mock(&mut server, "/lib/app.js", "application/javascript", "var cdn = 1;")
            .await;

    let dir = create_test_dir()?;
    std::fs::write(dir.path().join("pic.jpg"), [0xFFu8, 0xD8])?;
    let page = dir.path().join("page.html");
    let head = format!(
        r#"<link rel="stylesheet" href="{}"><script src="{}"></script>"#,
        test_url(&server, "/lib/site.css"),
        test_url(&server, "/lib/app.js"),
    );
    std::fs::write(&page, create_test_html(&head, r#"<img src="pic.jpg">"#))?;

    let output = dir.path().join("snap.html");
    let config = SnapshotConfig::builder()
        .document_url(page.to_string_lossy())
        .output_file(&output)
        .build()?;
    assert!(config.local());

    let report = oneshot_snapshot::snapshot(&config).await?;

    assert!(report.html.contains("p{color:red}"));
    assert!(report.html.contains("var cdn = 1;"));
    assert!(report.html.contains("data:image/jpeg;base64,/9g="));
    assert!(!report.html.contains(FAILED_LOAD_ATTR));
    assert_eq!(report.successes, 3);
    css.assert_async().await;
    js.assert_async().await;
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_remote_snapshot_through_renderer() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let _pic = create_resource_mock(&mut server, "/pic.jpg", "image/jpeg", [0xFFu8, 0xD8]).await;

    let dir = create_test_dir()?;
    let dump = dir.path().join("dump.html");
    let output = dir.path().join("snap.html");
    let config = SnapshotConfig::builder()
        .document_url(test_url(&server, "/page"))
        .output_file(&output)
        .renderer(oneshot_snapshot::RenderConfig {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                r#"printf '<html><body><img src="pic.jpg"></body></html>' > "$2""#.to_string(),
                "render".to_string(),
            ],
            dump_file: dump.clone(),
        })
        .build()?;

    let report = oneshot_snapshot::snapshot(&config).await?;

    assert!(dump.exists());
    assert!(report.html.contains("data:image/jpeg;base64,/9g="));
    assert_eq!(report.successes, 1);
    Ok(())
}

#[tokio::test]
async fn test_missing_local_document_is_fatal() {
    let dir = create_test_dir().unwrap();
    let output = dir.path().join("snap.html");
    let config = SnapshotConfig::builder()
        .document_url(dir.path().join("nope.html").to_string_lossy())
        .output_file(&output)
        .build()
        .unwrap();

    let result = take_snapshot_with(&config, Arc::new(LocalFetcher::new())).await;
    assert!(matches!(result, Err(SnapshotError::DocumentLoad { .. })));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_remote_document_error_is_fatal() {
    let mut server = Server::new_async().await;
    let _mock = create_error_mock(&mut server, "/page.html", 500).await;

    let dir = create_test_dir().unwrap();
    let config = SnapshotConfig::builder()
        .document_url(test_url(&server, "/page.html"))
        .output_file(dir.path().join("snap.html"))
        .build()
        .unwrap();

    let result = oneshot_snapshot::snapshot(&config).await;
    match result {
        Err(SnapshotError::DocumentLoad { source, .. }) => {
            assert!(source.to_string().contains("500"));
        }
        other => panic!("expected DocumentLoad, got {other:?}"),
    }
}

#[tokio::test]
async fn test_pre_image_is_written_before_processing() -> anyhow::Result<()> {
    let dir = create_test_dir()?;
    let page = dir.path().join("page.html");
    std::fs::write(&page, "<html><body><p>plain</p></body></html>")?;
    let output = dir.path().join("snap.html");

    let config = SnapshotConfig::builder()
        .document_url(page.to_string_lossy())
        .output_file(&output)
        .build()?;
    let report = oneshot_snapshot::snapshot(&config).await?;

    // Nothing to inline: the final document equals the serialized pre-image
    let written = assert_file_exists_with_content(&output).await?;
    let pre_image = oneshot_snapshot::Document::parse(&std::fs::read_to_string(&page)?).serialize()?;
    assert_eq!(written, pre_image);
    assert_eq!(report.total(), 0);
    Ok(())
}
