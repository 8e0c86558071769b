mod common;

use common::*;

use backend::gallery::GalleryError;
use chrono::Utc;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_lists_entries_oldest_first() {
    let ctx = TestContext::new();
    ctx.add_processed("zoe_late.jpg", minutes_after_epoch(30));
    ctx.add_processed("alice_early.jpg", minutes_after_epoch(10));
    ctx.add_processed("bob_middle.png", minutes_after_epoch(20));

    let entries = ctx.gallery.list().await.unwrap();

    let filenames: Vec<_> = entries.iter().map(|e| e.filename.as_str()).collect();
    assert_eq!(filenames, vec!["alice_early.jpg", "bob_middle.png", "zoe_late.jpg"]);

    let uploaders: Vec<_> = entries.iter().map(|e| e.uploader.as_str()).collect();
    assert_eq!(uploaders, vec!["alice", "bob", "zoe"]);

    assert!(entries
        .iter()
        .all(|e| e.url.contains(&format!("/img/after/{}", e.filename))));
}

#[tokio::test]
async fn test_signing_failure_omits_entry() {
    let ctx = TestContext::new();
    ctx.add_processed("alice_one.jpg", minutes_after_epoch(1));
    ctx.add_processed("bob_two.jpg", minutes_after_epoch(2));
    ctx.add_processed("carol_three.jpg", minutes_after_epoch(3));
    ctx.store.fail_signing("img/after/bob_two.jpg");

    let entries = ctx.gallery.list().await.unwrap();

    let filenames: Vec<_> = entries.iter().map(|e| e.filename.as_str()).collect();
    assert_eq!(filenames, vec!["alice_one.jpg", "carol_three.jpg"]);
}

#[tokio::test]
async fn test_filename_without_separator_has_unknown_uploader() {
    let ctx = TestContext::new();
    ctx.add_processed("sunset.jpg", Utc::now());

    let entries = ctx.gallery.list().await.unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].uploader, "Unknown");
}

#[tokio::test]
async fn test_ignores_objects_outside_output_prefix() {
    let ctx = TestContext::new();
    ctx.store.insert(
        "img/before/alice_raw.png",
        b"png".to_vec(),
        "image/png",
        minutes_after_epoch(1),
    );
    ctx.store.insert(
        "img/after/",
        Vec::new(),
        "application/x-directory",
        minutes_after_epoch(2),
    );
    ctx.add_processed("alice_raw.png", minutes_after_epoch(3));

    let entries = ctx.gallery.list().await.unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].filename, "alice_raw.png");
}

#[tokio::test]
async fn test_empty_gallery() {
    let ctx = TestContext::new();

    assert!(ctx.gallery.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_enumeration_failure_aborts_listing() {
    let ctx = TestContext::new();
    ctx.add_processed("alice_one.jpg", minutes_after_epoch(1));
    ctx.add_processed("bob_two.jpg", minutes_after_epoch(2));
    ctx.store.fail_list_after(1);

    let err = ctx.gallery.list().await.unwrap_err();

    let GalleryError::Enumeration { listed, .. } = err;
    assert_eq!(listed, 1);
}

#[tokio::test]
async fn test_repeated_listing_reuses_signed_urls() {
    let ctx = TestContext::new();
    ctx.add_processed("alice_one.jpg", minutes_after_epoch(1));
    ctx.add_processed("bob_two.jpg", minutes_after_epoch(2));

    let first = ctx.gallery.list().await.unwrap();
    let second = ctx.gallery.list().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(ctx.store.sign_calls(), 2);
}
