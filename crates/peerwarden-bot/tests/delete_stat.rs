// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! /delete confirmation and /stat reporting.

use peerwarden_bot::texts;
use peerwarden_core::{CallbackAction, ClientInventory, PeerStats, UserLevel};
use peerwarden_test_utils::TestHarness;

#[tokio::test]
async fn delete_without_client_says_so() {
    let h = TestHarness::new().await;
    let bob = h.user(2, Some("bob"), UserLevel::Basic).await;

    h.send_text(&bob, "/delete").await;

    assert_eq!(h.last_reply(&bob).await.as_deref(), Some(texts::DELETE_NO_CONFIG));
    assert_eq!(h.log.count("delete_no_config"), 1);
    assert!(h.handler.conversations().current(bob.id).await.is_none());
}

#[tokio::test]
async fn confirmed_delete_removes_client() {
    let h = TestHarness::builder().with_clients(&["alice"]).build().await;
    let alice = h.user(1, Some("alice"), UserLevel::Basic).await;
    h.stats
        .set("alice", PeerStats::from_handshake(Some(30), 2048, 512))
        .await;

    h.send_text(&alice, "/delete").await;
    let prompt = h.gateway.sent_to(alice.id).await.pop().unwrap();
    assert!(prompt.text.contains("Delete your configuration?"));
    assert!(prompt.text.contains("30 sec ago"));
    assert_eq!(prompt.keyboard[0][0].action, CallbackAction::DeleteConfirm);

    h.press(&alice, CallbackAction::DeleteConfirm).await;

    assert_eq!(h.last_reply(&alice).await.as_deref(), Some(texts::DELETE_SUCCESS));
    assert!(!h.inventory.exists("alice").await.unwrap());
    let event = h.log.last("delete_confirmed").unwrap();
    assert!(event.error.is_none());
    assert_eq!(event.client_name.as_deref(), Some("alice"));
}

#[tokio::test]
async fn prompt_without_stats_shows_placeholders() {
    let h = TestHarness::builder().with_clients(&["alice"]).build().await;
    let alice = h.user(1, Some("alice"), UserLevel::Basic).await;

    h.send_text(&alice, "/delete").await;

    assert!(h.last_reply(&alice).await.unwrap().contains("Status: —"));
}

#[tokio::test]
async fn cancelled_delete_keeps_client() {
    let h = TestHarness::builder().with_clients(&["alice"]).build().await;
    let alice = h.user(1, Some("alice"), UserLevel::Basic).await;

    h.send_text(&alice, "/delete").await;
    h.press(&alice, CallbackAction::DeleteCancel).await;

    assert_eq!(h.last_reply(&alice).await.as_deref(), Some(texts::DELETE_CANCELLED));
    assert_eq!(h.scripts.remove_calls(), 0);
    assert!(h.inventory.exists("alice").await.unwrap());
    assert_eq!(h.log.count("delete_cancelled"), 1);
}

#[tokio::test]
async fn failed_remove_reports_error() {
    let h = TestHarness::builder().with_clients(&["alice"]).build().await;
    let alice = h.user(1, Some("alice"), UserLevel::Basic).await;
    h.scripts.set_remove("permission denied", 1).await;

    h.send_text(&alice, "/delete").await;
    h.press(&alice, CallbackAction::DeleteConfirm).await;

    assert_eq!(h.last_reply(&alice).await.as_deref(), Some(texts::DELETE_ERROR));
    assert!(h.inventory.exists("alice").await.unwrap());
    let event = h.log.last("delete_confirmed").unwrap();
    assert_eq!(event.error.as_deref(), Some("Script exited with code 1"));
}

#[tokio::test]
async fn second_confirm_is_ignored() {
    let h = TestHarness::builder().with_clients(&["alice"]).build().await;
    let alice = h.user(1, Some("alice"), UserLevel::Basic).await;

    h.send_text(&alice, "/delete").await;
    h.press(&alice, CallbackAction::DeleteConfirm).await;
    h.press(&alice, CallbackAction::DeleteConfirm).await;

    assert_eq!(h.scripts.remove_calls(), 1);
    assert_eq!(h.log.count("delete_confirmed"), 1);
}

#[tokio::test]
async fn stat_without_client_suggests_create() {
    let h = TestHarness::new().await;
    let bob = h.user(2, Some("bob"), UserLevel::Basic).await;

    h.send_text(&bob, "/stat").await;

    assert_eq!(h.last_reply(&bob).await.as_deref(), Some(texts::STAT_NO_CONFIG));
    assert_eq!(h.log.count("stat_error"), 1);
}

#[tokio::test]
async fn stat_shows_remaining_test_time_for_basic_users() {
    let h = TestHarness::builder().with_clients(&["alice"]).build().await;
    let alice = h.user(1, Some("alice"), UserLevel::Basic).await;
    h.stats
        .set("alice", PeerStats::from_handshake(Some(600), 4096, 1024))
        .await;

    h.send_text(&alice, "/stat").await;

    let reply = h.last_reply(&alice).await.unwrap();
    assert!(reply.contains("<b>alice</b>"));
    assert!(reply.contains("Test time remaining: 23 h"));
}

#[tokio::test]
async fn stat_for_premium_has_no_remaining_time_or_limit() {
    let h = TestHarness::builder().with_clients(&["vip"]).build().await;
    let vip = h.user(3, Some("vip"), UserLevel::Premium).await;
    h.stats.set("vip", PeerStats::never_connected()).await;

    h.send_text(&vip, "/stat").await;
    h.send_text(&vip, "/stat").await;

    let replies = h.gateway.sent_to(vip.id).await;
    assert_eq!(replies.len(), 2);
    assert!(replies.iter().all(|m| !m.text.contains("remaining")));
}

#[tokio::test]
async fn stat_is_rate_limited_for_basic_users() {
    let h = TestHarness::builder().with_clients(&["alice"]).build().await;
    let alice = h.user(1, Some("alice"), UserLevel::Basic).await;
    h.stats.set("alice", PeerStats::never_connected()).await;

    h.send_text(&alice, "/stat").await;
    h.send_text(&alice, "/stat").await;

    assert_eq!(h.last_reply(&alice).await.as_deref(), Some(texts::STAT_RATE_LIMITED));
}

#[tokio::test]
async fn unlimited_commands_skip_the_limiter() {
    let h = TestHarness::builder()
        .with_settings(|s| s.rate_limited_commands = vec!["create".to_string()])
        .with_clients(&["alice"])
        .build()
        .await;
    let alice = h.user(1, Some("alice"), UserLevel::Basic).await;
    h.stats.set("alice", PeerStats::never_connected()).await;

    h.send_text(&alice, "/stat").await;
    h.send_text(&alice, "/stat").await;

    assert!(
        h.gateway
            .sent_to(alice.id)
            .await
            .iter()
            .all(|m| m.text != texts::STAT_RATE_LIMITED)
    );
}
