//! Integration tests against a real headless Chrome

#![cfg(feature = "cdp")]

use pdfrender::render::render_document;
use pdfrender::{Margin, RenderConfig, RenderRequest};
use std::sync::Once;
use tiny_http::{Response, Server};

static INIT: Once = Once::new();

/// Start a simple test HTTP server for page resources
fn start_test_server() -> String {
    INIT.call_once(|| {
        std::thread::spawn(|| {
            let server = Server::http("127.0.0.1:18090").unwrap();
            for request in server.incoming_requests() {
                let response = match request.url() {
                    "/style.css" => {
                        // Slow stylesheet so the network-idle wait has something to wait for
                        std::thread::sleep(std::time::Duration::from_millis(300));
                        Response::from_string("body { background: #eef; font-family: serif; }")
                            .with_header(
                                "Content-Type: text/css"
                                    .parse::<tiny_http::Header>()
                                    .unwrap(),
                            )
                    }
                    _ => Response::from_string("Not Found").with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });
        // Give the server time to start
        std::thread::sleep(std::time::Duration::from_millis(100));
    });

    "http://127.0.0.1:18090".to_string()
}

fn assert_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF data seems too small");
    assert_eq!(&bytes[0..5], b"%PDF-");
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_render_simple_document() {
    let automation = pdfrender::new_automation(RenderConfig::default()).expect("Failed to create automation");
    let request = RenderRequest::new("<p>hi</p>", Margin::from_px(10.0).unwrap());

    let pdf = render_document(&automation, &request).expect("Failed to render PDF");
    assert_pdf(&pdf);
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_render_with_external_stylesheet() {
    let base_url = start_test_server();
    let automation = pdfrender::new_automation(RenderConfig::default()).expect("Failed to create automation");
    let html = format!(
        r#"<!DOCTYPE html><html><head><link rel="stylesheet" href="{}/style.css"></head>
<body><h1>Styled</h1></body></html>"#,
        base_url
    );

    let pdf = render_document(&automation, &RenderRequest::new(html, Margin::ZERO)).expect("Failed to render PDF");
    assert_pdf(&pdf);
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_sequential_renders() {
    let automation = pdfrender::new_automation(RenderConfig::default()).expect("Failed to create automation");

    let first = RenderRequest::new("<script>document.cookie='token=1'</script><p>one</p>", Margin::ZERO);
    let second = RenderRequest::new("<p>two</p>", Margin::from_px(24.0).unwrap());

    assert_pdf(&render_document(&automation, &first).unwrap());
    assert_pdf(&render_document(&automation, &second).unwrap());
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_unicode_content() {
    let automation = pdfrender::new_automation(RenderConfig::default()).expect("Failed to create automation");
    let request = RenderRequest::new("<p>Grüße, 你好, \u{2028} \"quoted\" </script></p>", Margin::ZERO);

    let pdf = render_document(&automation, &request).expect("Failed to render PDF");
    assert_pdf(&pdf);
}
