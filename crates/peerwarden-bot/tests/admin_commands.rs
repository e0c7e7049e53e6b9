// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Staff commands and their permission checks.

use chrono::{TimeDelta, Utc};
use peerwarden_bot::texts;
use peerwarden_config::keys;
use peerwarden_core::{
    AccountRepository, ChatUser, ConfigSource, EventLogRepository, LogEvent, UserLevel,
};
use peerwarden_test_utils::TestHarness;

const ADMIN_ID: i64 = 10;

async fn with_admin() -> (TestHarness, ChatUser) {
    let h = TestHarness::new().await;
    let admin = h.user(ADMIN_ID, Some("boss"), UserLevel::Admin).await;
    (h, admin)
}

#[tokio::test]
async fn basic_users_are_refused() {
    let h = TestHarness::new().await;
    let bob = h.user(2, Some("bob"), UserLevel::Basic).await;

    for cmd in ["/admin", "/users", "/logs", "/setlevel 2 admin", "/config"] {
        h.send_text(&bob, cmd).await;
        assert_eq!(
            h.last_reply(&bob).await.as_deref(),
            Some(texts::INSUFFICIENT_PERMISSIONS),
            "{cmd}"
        );
    }
    let acc = h.accounts.get_by_user_id(2).await.unwrap().unwrap();
    assert_eq!(acc.level, UserLevel::Basic);
}

#[tokio::test]
async fn moderators_see_only_their_commands() {
    let h = TestHarness::new().await;
    let moderator = h.user(900, Some("mod"), UserLevel::Moderator).await;

    h.send_text(&moderator, "/admin").await;
    let text = h.last_reply(&moderator).await.unwrap();
    assert!(text.contains("Moderator commands"));
    assert!(!text.contains("Admin commands"));

    h.send_text(&moderator, "/block 2 spam").await;
    assert_eq!(
        h.last_reply(&moderator).await.as_deref(),
        Some(texts::INSUFFICIENT_PERMISSIONS)
    );
}

#[tokio::test]
async fn admins_see_everything() {
    let (h, admin) = with_admin().await;

    h.send_text(&admin, "/admin").await;

    let text = h.last_reply(&admin).await.unwrap();
    assert!(text.contains("Moderator commands"));
    assert!(text.contains("Admin commands"));
}

#[tokio::test]
async fn users_can_be_filtered_by_level() {
    let (h, admin) = with_admin().await;
    h.user(2, Some("bob"), UserLevel::Basic).await;
    h.user(3, Some("vip"), UserLevel::Premium).await;

    h.send_text(&admin, "/users premium").await;
    let text = h.last_reply(&admin).await.unwrap();
    assert!(text.contains("@vip"));
    assert!(!text.contains("@bob"));

    h.send_text(&admin, "/users moderator").await;
    assert_eq!(h.last_reply(&admin).await.as_deref(), Some("No users found."));

    h.send_text(&admin, "/users lots").await;
    assert_eq!(h.last_reply(&admin).await.as_deref(), Some(texts::INVALID_FORMAT));
}

#[tokio::test]
async fn empty_lists_say_so() {
    let (h, admin) = with_admin().await;

    h.send_text(&admin, "/feedbacklist").await;
    assert_eq!(h.last_reply(&admin).await.as_deref(), Some("No feedback yet."));
    h.send_text(&admin, "/logs").await;
    assert_eq!(h.last_reply(&admin).await.as_deref(), Some("No events found."));
}

#[tokio::test]
async fn feedback_list_shows_entries() {
    let (h, admin) = with_admin().await;
    h.feedback.insert(2, Some("bob"), "VPN is slow <sometimes>").await;

    h.send_text(&admin, "/feedbacklist 5").await;

    let text = h.last_reply(&admin).await.unwrap();
    assert!(text.contains("@bob"));
    assert!(text.contains("&lt;sometimes&gt;"));
}

#[tokio::test]
async fn logs_filter_by_user() {
    let (h, admin) = with_admin().await;
    let bob = ChatUser {
        id: 2,
        username: Some("bob".into()),
    };
    let carol = ChatUser {
        id: 3,
        username: Some("carol".into()),
    };
    h.events.append(&LogEvent::new("create").user(&bob)).await.unwrap();
    h.events.append(&LogEvent::new("stat").user(&carol)).await.unwrap();

    h.send_text(&admin, "/logs @bob").await;

    let text = h.last_reply(&admin).await.unwrap();
    assert!(text.contains("@bob <b>create</b>"));
    assert!(!text.contains("@carol"));
}

#[tokio::test]
async fn setlevel_changes_level() {
    let (h, admin) = with_admin().await;
    h.user(2, Some("bob"), UserLevel::Basic).await;

    h.send_text(&admin, "/setlevel 2 Moderator").await;

    let acc = h.accounts.get_by_user_id(2).await.unwrap().unwrap();
    assert_eq!(acc.level, UserLevel::Moderator);
    assert!(h.last_reply(&admin).await.unwrap().contains("is now moderator"));
}

#[tokio::test]
async fn setlevel_rejects_ban_and_unknown_users() {
    let (h, admin) = with_admin().await;
    h.user(2, Some("bob"), UserLevel::Basic).await;

    h.send_text(&admin, "/setlevel 2 ban").await;
    assert!(h.last_reply(&admin).await.unwrap().starts_with("❌ Usage: /setlevel"));
    h.send_text(&admin, "/setlevel 999 admin").await;
    assert_eq!(h.last_reply(&admin).await.as_deref(), Some(texts::USER_NOT_FOUND));
}

#[tokio::test]
async fn setpremium_with_days_and_reason() {
    let (h, admin) = with_admin().await;
    h.user(2, Some("bob"), UserLevel::Basic).await;

    h.send_text(&admin, "/setpremium 2 30 paid by card").await;

    let acc = h.accounts.get_by_user_id(2).await.unwrap().unwrap();
    assert_eq!(acc.level, UserLevel::Premium);
    assert_eq!(acc.premium_reason.as_deref(), Some("paid by card"));
    let expires = acc.premium_expires_at.unwrap();
    assert!(expires > Utc::now() + TimeDelta::days(29));
    assert!(expires <= Utc::now() + TimeDelta::days(30));
}

#[tokio::test]
async fn permanent_premium_has_default_reason() {
    let (h, admin) = with_admin().await;
    h.user(2, Some("bob"), UserLevel::Basic).await;

    h.send_text(&admin, "/setpremium 2 permanent").await;

    let acc = h.accounts.get_by_user_id(2).await.unwrap().unwrap();
    assert!(acc.premium_expires_at.is_none());
    assert_eq!(acc.premium_reason.as_deref(), Some("Set by admin @boss"));
    assert!(h.last_reply(&admin).await.unwrap().contains("until forever"));
}

#[tokio::test]
async fn setpremium_rejects_bad_spans() {
    let (h, admin) = with_admin().await;
    h.user(2, Some("bob"), UserLevel::Basic).await;

    for cmd in ["/setpremium 2 0", "/setpremium 2 soon", "/setpremium 2"] {
        h.send_text(&admin, cmd).await;
        assert_eq!(h.last_reply(&admin).await.as_deref(), Some(texts::INVALID_FORMAT), "{cmd}");
    }
}

#[tokio::test]
async fn block_then_unblock() {
    let (h, admin) = with_admin().await;
    let bob = h.user(2, Some("bob"), UserLevel::Basic).await;

    h.send_text(&admin, "/block 2 abusing the service").await;
    assert_eq!(
        h.blocklist.reason(2).await.as_deref(),
        Some("abusing the service")
    );
    h.send_text(&bob, "/help").await;
    assert_eq!(h.last_reply(&bob).await.as_deref(), Some(texts::BLOCKED));

    h.send_text(&admin, "/unblock 2").await;
    assert!(h.last_reply(&admin).await.unwrap().ends_with("unblocked."));
    h.send_text(&admin, "/unblock 2").await;
    assert!(h.last_reply(&admin).await.unwrap().ends_with("is not blocked."));

    h.send_text(&bob, "/help").await;
    assert_eq!(h.last_reply(&bob).await.as_deref(), Some(texts::HELP));
}

#[tokio::test]
async fn block_requires_a_reason() {
    let (h, admin) = with_admin().await;

    h.send_text(&admin, "/block 2").await;

    assert_eq!(h.last_reply(&admin).await.as_deref(), Some(texts::INVALID_FORMAT));
    assert!(h.blocklist.reason(2).await.is_none());
}

#[tokio::test]
async fn config_set_is_stored_not_applied() {
    let (h, admin) = with_admin().await;

    h.send_text(&admin, "/config max_clients 7").await;

    assert_eq!(
        h.config.get(keys::MAX_CLIENTS).await.unwrap().as_deref(),
        Some("7")
    );
    assert!(
        h.last_reply(&admin)
            .await
            .unwrap()
            .contains("Applies at the next reload.")
    );
    assert_eq!(h.settings.load().max_clients, 100);
}

#[tokio::test]
async fn config_values_are_normalized() {
    let (h, admin) = with_admin().await;

    h.send_text(&admin, "/config restrict_new_users YES").await;
    h.send_text(&admin, "/config rate_limited_commands /Create, stat").await;

    assert_eq!(
        h.config.get(keys::RESTRICT_NEW_USERS).await.unwrap().as_deref(),
        Some("true")
    );
    assert_eq!(
        h.config.get(keys::RATE_LIMITED_COMMANDS).await.unwrap().as_deref(),
        Some("create,stat")
    );
}

#[tokio::test]
async fn config_rejects_bad_input() {
    let (h, admin) = with_admin().await;

    h.send_text(&admin, "/config max_clients many").await;
    assert!(
        h.last_reply(&admin)
            .await
            .unwrap()
            .contains("expects a non-negative integer")
    );
    h.send_text(&admin, "/config colour blue").await;
    assert!(h.last_reply(&admin).await.unwrap().contains("Unknown setting"));
    assert!(h.config.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn config_get_and_list() {
    let (h, admin) = with_admin().await;
    h.config.set(keys::MAX_CLIENTS, "12").await.unwrap();

    h.send_text(&admin, "/config max_clients").await;
    assert_eq!(
        h.last_reply(&admin).await.as_deref(),
        Some("<code>max_clients</code> = 12")
    );
    h.send_text(&admin, "/config watchdog_enabled").await;
    assert!(h.last_reply(&admin).await.unwrap().ends_with("is not set."));

    h.send_text(&admin, "/config").await;
    let list = h.last_reply(&admin).await.unwrap();
    assert!(list.contains("<code>max_clients</code> = 12"));
    assert!(list.contains("<code>watchdog_enabled</code> = (default)"));
}

#[tokio::test]
async fn stats_counts_users_and_feedback() {
    let (h, admin) = with_admin().await;
    h.user(2, Some("bob"), UserLevel::Basic).await;
    h.feedback.insert(2, Some("bob"), "hi").await;

    h.send_text(&admin, "/stats").await;

    let text = h.last_reply(&admin).await.unwrap();
    assert!(text.contains("Users: 2"));
    assert!(text.contains("Feedback: 1 (1 pending)"));
    assert!(text.contains("Clients: 0"));
}

#[tokio::test]
async fn cleanuplogs_deletes_old_events() {
    let (h, admin) = with_admin().await;
    let mut old = LogEvent::new("create");
    old.timestamp = Utc::now() - TimeDelta::days(40);
    h.events.append(&old).await.unwrap();
    h.events.append(&LogEvent::new("stat")).await.unwrap();

    h.send_text(&admin, "/cleanuplogs 30").await;

    assert_eq!(
        h.last_reply(&admin).await.as_deref(),
        Some("🧹 Deleted 1 events older than 30 days.")
    );
    assert_eq!(h.events.stored().await.len(), 1);

    h.send_text(&admin, "/cleanuplogs 0").await;
    assert_eq!(h.last_reply(&admin).await.as_deref(), Some(texts::INVALID_FORMAT));
}
