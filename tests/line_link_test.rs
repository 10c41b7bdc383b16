//! Drives the dispatcher through a real `LineLink` with a simulated
//! controller on the other end of an in-memory stream.

use async_trait::async_trait;
use image::DynamicImage;
use parkgate::camera::ImageSource;
use parkgate::config::Config;
use parkgate::dispatcher::Dispatcher;
use parkgate::error::Result;
use parkgate::link::LineLink;
use parkgate::recognizer::{PlateRecognizer, TextEngine};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

struct StillCamera;

#[async_trait]
impl ImageSource for StillCamera {
    async fn capture(&self) -> Result<DynamicImage> {
        Ok(DynamicImage::new_luma8(16, 8))
    }
}

struct FixedPlate(&'static str);

#[async_trait]
impl TextEngine for FixedPlate {
    async fn read_text(&self, _image: &DynamicImage) -> Result<Vec<String>> {
        Ok(vec![self.0.to_string()])
    }
}

#[tokio::test]
async fn controller_sees_slots_gate_cycle_and_final_close() {
    let (ours, theirs) = tokio::io::duplex(1024);
    let (r, w) = tokio::io::split(ours);

    let mut config = Config::default();
    config.gate.dwell_ms = 20;
    config.gate.payment_delay_ms = 10;

    let mut dispatcher = Dispatcher::new(
        &config,
        Box::new(LineLink::new(r, w)),
        Box::new(StillCamera),
        PlateRecognizer::new(Box::new(FixedPlate(" ka 01 ab 1234\n"))),
    )
    .unwrap();

    let (peer_r, mut peer_w) = tokio::io::split(theirs);
    let mut peer_lines = BufReader::new(peer_r).lines();

    dispatcher.start().await.unwrap();
    peer_w.write_all(b"ENTRY:0\r\nENTRY:1\r\n").await.unwrap();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let controller = async move {
        let mut received = Vec::new();
        while received.len() < 4 {
            match peer_lines.next_line().await.unwrap() {
                Some(line) => received.push(line),
                None => break,
            }
        }
        stop_tx.send(()).unwrap();
        // Final close sent during shutdown
        if let Some(line) = peer_lines.next_line().await.unwrap() {
            received.push(line);
        }
        received
    };

    let run = dispatcher.run_until(async {
        let _ = stop_rx.await;
    });
    let (run_result, received) = tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(run, controller)
    })
    .await
    .unwrap();

    run_result.unwrap();
    assert_eq!(received, vec!["SLOTS:4", "O", "SLOTS:3", "C", "C"]);
    assert!(dispatcher.ledger().session("KA 01 AB 1234").is_some());
    drop(peer_w);
}
