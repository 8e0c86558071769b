mod common;

use std::time::Duration;

use common::*;

use image::ImageFormat;
use image_storage::UploadMessage;
use pretty_assertions::assert_eq;
use resize_worker::worker::event_processor::MessageDisposition;
use tokio_util::sync::CancellationToken;

const TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::test]
async fn test_successful_message_is_acked() {
    let ctx = TestContext::new();
    ctx.upload(
        "img/before/alice_beach.jpg",
        encoded_image(200, 100, ImageFormat::Jpeg),
        "image/jpeg",
    );
    ctx.upload(
        "img/before/bob_sunset.png",
        encoded_image(100, 200, ImageFormat::Png),
        "image/png",
    );

    let disposition = ctx
        .processor(TIMEOUT)
        .process_message(
            &ctx.message(&["img/before/alice_beach.jpg", "img/before/bob_sunset.png"]),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(disposition, MessageDisposition::Ack);
    assert!(ctx.store.object("img/after/alice_beach.jpg").is_some());
    assert!(ctx.store.object("img/after/bob_sunset.png").is_some());
}

#[tokio::test]
async fn test_message_without_events_is_acked() {
    let ctx = TestContext::new();
    let message = UploadMessage {
        body: Vec::new(),
        receipt_handle: "receipt-handle".to_string(),
        message_id: "test-event".to_string(),
    };

    let disposition = ctx
        .processor(TIMEOUT)
        .process_message(&message, &CancellationToken::new())
        .await;

    assert_eq!(disposition, MessageDisposition::Ack);
}

#[tokio::test]
async fn test_skipped_and_permanent_failures_are_acked() {
    let ctx = TestContext::new();
    ctx.upload("img/before/carl_corrupt.png", b"garbage".to_vec(), "image/png");

    let disposition = ctx
        .processor(TIMEOUT)
        .process_message(
            &ctx.message(&[
                "img/after/carl_done.png",
                "img/before/readme.md",
                "img/before/carl_corrupt.png",
                "img/before/carl_missing.png",
            ]),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(disposition, MessageDisposition::Ack);
    assert_eq!(ctx.store.put_calls(), 0);
}

#[tokio::test]
async fn test_transient_failure_leaves_message_for_retry() {
    let ctx = TestContext::new();
    ctx.upload(
        "img/before/dana_ok.png",
        encoded_image(30, 30, ImageFormat::Png),
        "image/png",
    );
    ctx.upload(
        "img/before/dana_flaky.png",
        encoded_image(30, 30, ImageFormat::Png),
        "image/png",
    );
    ctx.store.fail_put("img/after/dana_flaky.png");

    let disposition = ctx
        .processor(TIMEOUT)
        .process_message(
            &ctx.message(&["img/before/dana_flaky.png", "img/before/dana_ok.png"]),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(disposition, MessageDisposition::Retry);
    // Later events still run
    assert!(ctx.store.object("img/after/dana_ok.png").is_some());
}

#[tokio::test]
async fn test_deadline_leaves_message_for_retry() {
    let ctx = TestContext::new();
    ctx.upload(
        "img/before/eve_big.png",
        encoded_image(1200, 900, ImageFormat::Png),
        "image/png",
    );

    let disposition = ctx
        .processor(Duration::ZERO)
        .process_message(
            &ctx.message(&["img/before/eve_big.png"]),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(disposition, MessageDisposition::Retry);
    assert_eq!(ctx.store.put_calls(), 0);
}

#[tokio::test]
async fn test_shutdown_leaves_message_for_retry() {
    let ctx = TestContext::new();
    ctx.upload(
        "img/before/fay_view.png",
        encoded_image(50, 50, ImageFormat::Png),
        "image/png",
    );
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let disposition = ctx
        .processor(TIMEOUT)
        .process_message(&ctx.message(&["img/before/fay_view.png"]), &shutdown)
        .await;

    assert_eq!(disposition, MessageDisposition::Retry);
}
