//! HTTP camera against a canned single-shot server.

#![cfg(feature = "http-camera")]

use image::{DynamicImage, ImageFormat};
use parkgate::camera::{HttpCamera, ImageSource};
use parkgate::config::CameraConfig;
use parkgate::error::ParkgateError;
use std::io::Cursor;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Answer one request with `status` and `body`, return the shot URL
async fn serve_once(status: &'static str, content_type: &'static str, body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let head = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            content_type,
            body.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(&body).await.unwrap();
        socket.shutdown().await.ok();
    });
    format!("http://{}/shot.jpg", addr)
}

fn camera(url: String) -> HttpCamera {
    HttpCamera::new(&CameraConfig {
        url,
        timeout_ms: Some(2_000),
    })
    .unwrap()
}

#[tokio::test]
async fn ok_response_with_png_body_is_decoded() {
    let mut png = Vec::new();
    DynamicImage::new_rgb8(8, 5)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();
    let url = serve_once("200 OK", "image/png", png).await;

    let frame = camera(url).capture().await.unwrap();
    assert_eq!((frame.width(), frame.height()), (8, 5));
}

#[tokio::test]
async fn non_ok_status_is_a_capture_error() {
    let url = serve_once("503 Service Unavailable", "text/plain", b"busy".to_vec()).await;

    let err = camera(url).capture().await.unwrap_err();
    assert!(matches!(err, ParkgateError::ImageCapture { .. }));
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn ok_status_with_garbage_body_is_a_capture_error() {
    let url = serve_once("200 OK", "image/jpeg", b"definitely not a jpeg".to_vec()).await;

    let err = camera(url).capture().await.unwrap_err();
    assert!(matches!(err, ParkgateError::ImageCapture { .. }));
}

#[tokio::test]
async fn unreachable_camera_is_a_capture_error() {
    // Grab a free port, then release it so nothing is listening there
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = camera(format!("http://{}/shot.jpg", addr))
        .capture()
        .await
        .unwrap_err();
    assert!(matches!(err, ParkgateError::ImageCapture { .. }));
}
