// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn payload_carries_title_description_and_color() {
    let notifier = DiscordNotifier::new("https://discord.example/webhook");
    let payload = notifier.build_payload(&Notification::error("Batch Event Failed", "stop script failed"));

    assert_eq!(payload.embeds.len(), 1);
    let embed = &payload.embeds[0];
    assert_eq!(embed.title, "Batch Event Failed");
    assert_eq!(embed.description, "stop script failed");
    assert_eq!(embed.color, COLOR_ERROR);
    assert_eq!(embed.fields.len(), 1);
    assert_eq!(embed.fields[0].name, "Hostname");
    assert!(!embed.fields[0].value.is_empty());
}

#[test]
fn level_maps_to_color() {
    let notifier = DiscordNotifier::new("url");
    let color = |n: Notification| notifier.build_payload(&n).embeds[0].color;

    assert_eq!(color(Notification::info("t", "d")), COLOR_INFO);
    assert_eq!(color(Notification::success("t", "d")), COLOR_SUCCESS);
    assert_eq!(color(Notification::warning("t", "d")), COLOR_WARNING);
    assert_eq!(color(Notification::error("t", "d")), COLOR_ERROR);
}

#[test]
fn mentions_prefix_the_description() {
    let notifier = DiscordNotifier::new("url")
        .with_mentions(vec!["111".into()], vec!["222".into()]);
    let payload = notifier.build_payload(&Notification::info("Wipe", "soon"));

    assert_eq!(payload.embeds[0].description, "cc <@&222> <@111>\n\nsoon");
}

#[test]
fn no_mentions_leaves_description_untouched() {
    let notifier = DiscordNotifier::new("url");
    let payload = notifier.build_payload(&Notification::info("Wipe", "soon"));
    assert_eq!(payload.embeds[0].description, "soon");
}

#[tokio::test]
async fn empty_webhook_url_skips_delivery() {
    let notifier = DiscordNotifier::new("");
    notifier
        .notify(Notification::info("t", "d"))
        .await
        .expect("empty url should be a silent no-op");
}

#[test]
fn payload_serializes_to_webhook_shape() {
    let notifier = DiscordNotifier::new("url");
    let payload = notifier.build_payload(&Notification::success("Done", "all good"));
    let json = serde_json::to_value(&payload).unwrap();

    assert_eq!(json["embeds"][0]["title"], "Done");
    assert_eq!(json["embeds"][0]["color"], COLOR_SUCCESS as i64);
    assert!(json["embeds"][0]["timestamp"].is_string());
    assert_eq!(json["embeds"][0]["fields"][0]["inline"], true);
}
