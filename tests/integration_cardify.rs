//! End-to-end tests for the card pipeline against a local test server

use cardify::extract::extract_page_signals;
use cardify::simple::SimpleSession;
use cardify::{Backend, BrowserConfig, CardRequest, Cardify, CardifyConfig, Error};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use tiny_http::{Header, Response, Server};

const EXAMPLE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<title>Example</title>
<meta name="description" content="A sample">
<link rel="icon" type="image/png" href="/f.png">
</head>
<body>
<nav style="background:rgb(10,20,30)">
  <h1 style="color:rgb(255,255,255)">Example</h1>
  <a style="color:rgb(0,0,0)" href="/">Home</a>
</nav>
</body>
</html>"#;

const NO_ICON_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Bare</title></head><body><p>Nothing here</p></body></html>"#;

const ICO_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Icons</title><link rel="shortcut icon" href="/favicon.ico?v=3"></head>
<body style="background-color: #336699; color: #eeeeee"><p>Body only</p></body></html>"#;

fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// ICO container with PNG payloads
fn ico(entries: &[(u8, u8, Vec<u8>)]) -> Vec<u8> {
    let mut out = vec![0, 0, 1, 0];
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    let mut offset = 6 + 16 * entries.len() as u32;
    for (w, h, data) in entries {
        out.extend_from_slice(&[*w, *h, 0, 0]);
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&32u16.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&offset.to_le_bytes());
        offset += data.len() as u32;
    }
    for (_, _, data) in entries {
        out.extend_from_slice(data);
    }
    out
}

/// Start a server for this test and return its base URL.
fn start_test_server() -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    std::thread::spawn(move || {
        let html: Header = "Content-Type: text/html; charset=utf-8".parse().unwrap();
        for request in server.incoming_requests() {
            let path = request.url().to_string();
            let response = match path.as_str() {
                "/" => Response::from_string(EXAMPLE_PAGE).with_header(html.clone()),
                "/bare" => Response::from_string(NO_ICON_PAGE).with_header(html.clone()),
                "/icons" => Response::from_string(ICO_PAGE).with_header(html.clone()),
                "/f.png" => Response::from_data(png(32, 32, [255, 0, 0, 255])),
                "/favicon.ico?v=3" => Response::from_data(ico(&[
                    (16, 16, png(16, 16, [0, 0, 255, 255])),
                    (48, 48, png(48, 48, [0, 255, 0, 255])),
                    (32, 32, png(32, 32, [255, 0, 255, 255])),
                ])),
                _ => Response::from_string("Not Found").with_status_code(404),
            };
            let _ = request.respond(response);
        }
    });
    format!("http://{}", addr)
}

fn simple_cardify() -> Option<Cardify> {
    let config = CardifyConfig {
        backend: Backend::Simple,
        ..CardifyConfig::default()
    };
    match Cardify::new(config) {
        Ok(c) => Some(c),
        Err(e) => {
            eprintln!("Skipping card test because no fonts are available: {}", e);
            None
        }
    }
}

fn band_has(image: &RgbaImage, rows: std::ops::Range<u32>, color: [u8; 4]) -> bool {
    rows.flat_map(|y| (0..image.width()).map(move |x| (x, y)))
        .any(|(x, y)| image.get_pixel(x, y).0 == color)
}

#[test]
fn test_extract_signals_from_page() {
    let base_url = start_test_server();
    let signals =
        extract_page_signals::<SimpleSession>(&format!("{}/", base_url), &BrowserConfig::default())
            .expect("extraction failed");

    assert_eq!(signals.title, "Example");
    assert_eq!(signals.description, "A sample");
    assert_eq!(signals.favicon_url, format!("{}/f.png", base_url));
    assert_eq!(signals.colors.navbar_background.as_deref(), Some("rgb(10, 20, 30)"));
    assert_eq!(signals.colors.header_text.as_deref(), Some("rgb(255, 255, 255)"));
    assert_eq!(signals.colors.anchor_text.as_deref(), Some("rgb(0, 0, 0)"));
}

#[tokio::test]
async fn test_generates_example_card() {
    let Some(cardify) = simple_cardify() else {
        return;
    };
    let base_url = start_test_server();

    let card = cardify
        .generate(&format!("{}/", base_url))
        .await
        .expect("card generation failed");
    let image = card.image();

    assert_eq!(image.dimensions(), (500, 500));
    assert_eq!(image.get_pixel(5, 5).0, [10, 20, 30, 255]);
    assert_eq!(image.get_pixel(200, 200).0, [255, 0, 0, 255]);
    assert_eq!(image.get_pixel(299, 299).0, [255, 0, 0, 255]);
    assert_eq!(image.get_pixel(300, 300).0, [10, 20, 30, 255]);
    assert!(band_has(image, 115..155, [255, 255, 255, 255]), "title not drawn in white");
    assert!(band_has(image, 330..355, [0, 0, 0, 255]), "description not drawn in black");

    let url = card.to_data_url().unwrap();
    assert!(url.starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_ico_favicon_and_body_fallbacks() {
    let Some(cardify) = simple_cardify() else {
        return;
    };
    let base_url = start_test_server();

    let card = cardify
        .generate(&format!("{}/icons", base_url))
        .await
        .expect("card generation failed");
    let image = card.image();

    // no navbar: body background becomes the main color
    assert_eq!(image.get_pixel(5, 5).0, [0x33, 0x66, 0x99, 255]);
    // largest ICO entry wins
    assert_eq!(image.get_pixel(250, 250).0, [0, 255, 0, 255]);
    assert!(band_has(image, 115..155, [0xee, 0xee, 0xee, 255]));
}

#[test]
fn test_missing_favicon_is_an_extraction_error() {
    let base_url = start_test_server();
    let err = extract_page_signals::<SimpleSession>(
        &format!("{}/bare", base_url),
        &BrowserConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::NoFavicon));
}

#[tokio::test]
async fn test_missing_favicon_fails_whole_request() {
    let Some(cardify) = simple_cardify() else {
        return;
    };
    let base_url = start_test_server();
    let response = cardify
        .handle(CardRequest {
            url: Some(format!("{}/bare", base_url)),
        })
        .await;
    assert_eq!(response.status_code(), 500);
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        serde_json::json!({ "error": "Failed to generate card" })
    );
}

#[tokio::test]
async fn test_missing_url_is_rejected_before_navigation() {
    let Some(cardify) = simple_cardify() else {
        return;
    };
    let response = cardify.handle(CardRequest { url: None }).await;
    assert_eq!(response.status_code(), 400);
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_unreachable_page_is_a_generic_failure() {
    let Some(cardify) = simple_cardify() else {
        return;
    };
    let base_url = start_test_server();
    let response = cardify
        .handle(CardRequest {
            url: Some(format!("{}/missing", base_url)),
        })
        .await;
    assert_eq!(response.status_code(), 500);
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn test_generates_example_card_with_chrome() {
    let base_url = start_test_server();
    let mut config = CardifyConfig {
        backend: Backend::Chrome,
        ..CardifyConfig::default()
    };
    config.browser.sandbox = false;
    let cardify = Cardify::new(config).expect("Failed to create pipeline");

    let card = cardify
        .generate(&format!("{}/", base_url))
        .await
        .expect("card generation failed");
    assert_eq!(card.image().get_pixel(5, 5).0, [10, 20, 30, 255]);
    assert_eq!(card.image().get_pixel(250, 250).0, [255, 0, 0, 255]);
}
