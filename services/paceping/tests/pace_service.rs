mod common;

use common::{PING_CHANNEL, harness, member, moderator};
use paceping::model::{Caller, PaceLabel};
use paceping::model::MAX_LABEL_CHARS;
use paceping::service::{DEFAULT_PING_MESSAGE, MAX_MESSAGE_CHARS, Outcome};
use paceping::store::PaceStore;

fn label(raw: &str) -> PaceLabel {
    PaceLabel::parse(raw).expect("label")
}

#[tokio::test]
async fn moderator_creates_pace_with_announcement_and_index_entry() {
    let h = harness();
    let reply = h
        .service
        .create_pace(&moderator(), "Sprint_1")
        .await
        .expect("create");
    assert_eq!(reply.outcome, Outcome::Done);
    assert_eq!(
        reply.content,
        "The pace **Sprint_1** has been created. Everybody can now subscribe to it."
    );

    let paces = h.store.list_paces().await.expect("list");
    assert_eq!(paces.len(), 1);
    assert_eq!(paces[0].label, "Sprint_1");
    assert_eq!(paces[0].follower_count, 0);

    let posts = h.platform.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].0, PING_CHANNEL);
    assert_eq!(
        posts[0].1.content,
        "The Modder just created the pace **Sprint_1**. Everybody can now subscribe to it :)"
    );
    assert!(posts[0].1.mention_users.is_empty());
    assert!(h.service.index().contains("Sprint_1").await);

    let log = h.store.recent_log(10).await.expect("log");
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, "pace_add Sprint_1");
    assert_eq!(log[0].subscriber_id, "1000");
}

#[tokio::test]
async fn duplicate_create_is_a_conflict_without_mutation() {
    let h = harness();
    h.service
        .create_pace(&moderator(), "Any")
        .await
        .expect("create");
    let reply = h
        .service
        .create_pace(&moderator(), "Any")
        .await
        .expect("create");
    assert_eq!(reply.outcome, Outcome::Conflict);
    assert_eq!(reply.content, "The pace Any already exists !");
    assert_eq!(h.store.list_paces().await.expect("list").len(), 1);
    assert_eq!(h.platform.posts().len(), 1);
    // Logged for both attempts.
    assert_eq!(h.store.recent_log(10).await.expect("log").len(), 2);
}

#[tokio::test]
async fn gated_operations_deny_callers_without_allowed_roles() {
    let h = harness();
    h.service
        .create_pace(&moderator(), "Any")
        .await
        .expect("create");
    h.service
        .subscribe(&member("7"), "Any")
        .await
        .expect("sub");
    let outsider = member("9");

    let reply = h
        .service
        .create_pace(&outsider, "Other")
        .await
        .expect("create");
    assert_eq!(reply.outcome, Outcome::Denied);
    assert_eq!(reply.content, "user9 is not permitted to add paces");

    let reply = h
        .service
        .broadcast_ping(&outsider, "Any", "go", "https://live")
        .await
        .expect("ping");
    assert_eq!(reply.outcome, Outcome::Denied);
    assert_eq!(reply.content, "You are not permitted to ping paces");

    let reply = h.service.remove_pace(&outsider, "Any").await.expect("remove");
    assert_eq!(reply.outcome, Outcome::Denied);
    assert_eq!(reply.content, "You are not permitted to remove paces");

    let paces = h.store.list_paces().await.expect("list");
    assert_eq!(paces.len(), 1);
    assert_eq!(paces[0].follower_count, 1);
    assert_eq!(h.platform.posts().len(), 1);
    // Only the moderator's creation was logged.
    assert_eq!(h.store.recent_log(10).await.expect("log").len(), 1);
}

#[tokio::test]
async fn elevated_role_is_configurable_and_case_insensitive() {
    let h = harness();
    let boss = Caller::new("5", "boss").with_roles(["pacepingBOSS"]);
    let reply = h.service.create_pace(&boss, "Any").await.expect("create");
    assert_eq!(reply.outcome, Outcome::Done);
}

#[tokio::test]
async fn invalid_labels_are_rejected_by_every_operation() {
    let h = harness();
    let caller = moderator();
    let expected = "Your pace name does not meet the requirements. Only numbers, lowercases, uppercases and underscores(_) are authorized.";
    for raw in ["", "with space", "semi;colon", "drop'table", "é"] {
        let replies = [
            h.service.create_pace(&caller, raw).await.expect("create"),
            h.service.subscribe(&caller, raw).await.expect("sub"),
            h.service.unsubscribe(&caller, raw).await.expect("unsub"),
            h.service
                .broadcast_ping(&caller, raw, "msg", "link")
                .await
                .expect("ping"),
            h.service.remove_pace(&caller, raw).await.expect("remove"),
        ];
        for reply in replies {
            assert_eq!(reply.outcome, Outcome::InvalidLabel, "label {raw:?}");
            assert_eq!(reply.content, expected);
        }
    }
    assert!(h.store.list_paces().await.expect("list").is_empty());
    assert!(h.platform.posts().is_empty());
}

#[tokio::test]
async fn subscribe_then_unsubscribe_restores_follower_count() {
    let h = harness();
    h.service
        .create_pace(&moderator(), "Any")
        .await
        .expect("create");
    let runner = member("42");

    let reply = h.service.subscribe(&runner, "Any").await.expect("sub");
    assert_eq!(reply.outcome, Outcome::Done);
    assert_eq!(
        reply.content,
        "You have been successfully subscribed to the pace **Any**"
    );
    assert_eq!(h.store.list_paces().await.expect("list")[0].follower_count, 1);
    assert!(h.store.is_subscribed(&label("Any"), "42").await.expect("sub"));

    let reply = h.service.unsubscribe(&runner, "Any").await.expect("unsub");
    assert_eq!(reply.outcome, Outcome::Done);
    assert_eq!(
        reply.content,
        "You have been successfully unsubscribed from the pace **Any**"
    );
    assert_eq!(h.store.list_paces().await.expect("list")[0].follower_count, 0);
    assert!(!h.store.is_subscribed(&label("Any"), "42").await.expect("sub"));

    let reply = h.service.unsubscribe(&runner, "Any").await.expect("unsub");
    assert_eq!(reply.outcome, Outcome::Conflict);
    assert_eq!(reply.content, "You are not subscribed to **Any**");
}

#[tokio::test]
async fn double_subscribe_changes_nothing() {
    let h = harness();
    h.service
        .create_pace(&moderator(), "Any")
        .await
        .expect("create");
    let runner = member("42");
    h.service.subscribe(&runner, "Any").await.expect("sub");
    let reply = h.service.subscribe(&runner, "Any").await.expect("sub");
    assert_eq!(reply.outcome, Outcome::Conflict);
    assert_eq!(reply.content, "You are already subscribed to **Any** !");
    assert_eq!(h.store.list_paces().await.expect("list")[0].follower_count, 1);
    assert_eq!(
        h.store.subscribers(&label("Any")).await.expect("subs"),
        vec!["42"]
    );
}

#[tokio::test]
async fn unknown_paces_get_per_command_replies() {
    let h = harness();
    let caller = moderator();
    let sub = h.service.subscribe(&caller, "Ghost").await.expect("sub");
    assert_eq!(sub.outcome, Outcome::Missing);
    assert_eq!(
        sub.content,
        "The pace **Ghost** doesn't exist. Please create it first with the command **/pace_add [pace_name]**"
    );
    let unsub = h.service.unsubscribe(&caller, "Ghost").await.expect("unsub");
    assert_eq!(
        unsub.content,
        "The pace **Ghost** doesn't exist. You can check your subscriptions with the command **/pace_my**"
    );
    let ping = h
        .service
        .broadcast_ping(&caller, "Ghost", "go", "link")
        .await
        .expect("ping");
    assert_eq!(
        ping.content,
        "The pace **Ghost** doesn't exist. Check the names first with the command **/pace_my**."
    );
    let remove = h.service.remove_pace(&caller, "Ghost").await.expect("remove");
    assert_eq!(
        remove.content,
        "The pace **Ghost** doesn't exist. You can check the paces with the command **/pace_list**"
    );
    assert!(h.platform.posts().is_empty());
}

#[tokio::test]
async fn listings_render_counts_or_empty_messages() {
    let h = harness();
    let empty = h.service.list_paces().await.expect("list");
    assert_eq!(empty.outcome, Outcome::Empty);
    assert_eq!(
        empty.content,
        "There is no active pace. Please create it first with the command \"/pace_add [pace_label]\""
    );
    let mine = h.service.list_mine(&member("1")).await.expect("mine");
    assert_eq!(mine.content, "You are not subscribed to any pace.");

    for raw in ["b_pace", "a_pace"] {
        h.service.create_pace(&moderator(), raw).await.expect("create");
    }
    h.service.subscribe(&member("1"), "b_pace").await.expect("sub");
    h.service.subscribe(&member("2"), "b_pace").await.expect("sub");

    let all = h.service.list_paces().await.expect("list");
    assert_eq!(
        all.content,
        "List of paces you can subscribe to :\n\t=> a_pace\t subscribers : 0\n\t=> b_pace\t subscribers : 2"
    );
    let mine = h.service.list_mine(&member("1")).await.expect("mine");
    assert_eq!(
        mine.content,
        "List of paces you are subscribed to :\n\t=> b_pace\t subscribers : 2"
    );
}

#[tokio::test]
async fn large_listings_fit_in_one_reply() {
    let h = harness();
    for idx in 0..80 {
        let raw = format!("pace_label_{idx:03}");
        h.service.create_pace(&moderator(), &raw).await.expect("create");
        h.service.subscribe(&member("7"), &raw).await.expect("sub");
    }
    let all = h.service.list_paces().await.expect("list");
    assert_eq!(all.outcome, Outcome::Done);
    assert!(all.content.chars().count() <= MAX_MESSAGE_CHARS);
    assert!(all.content.contains("more"));

    let mine = h.service.list_mine(&member("7")).await.expect("mine");
    assert!(mine.content.chars().count() <= MAX_MESSAGE_CHARS);
    assert!(mine.content.starts_with("List of paces you are subscribed to :"));
}

#[tokio::test]
async fn remove_deletes_subscriptions_and_refreshes_index() {
    let h = harness();
    h.service
        .create_pace(&moderator(), "Any")
        .await
        .expect("create");
    h.service.subscribe(&member("1"), "Any").await.expect("sub");
    h.service.subscribe(&member("2"), "Any").await.expect("sub");

    let reply = h.service.remove_pace(&moderator(), "Any").await.expect("remove");
    assert_eq!(reply.outcome, Outcome::Done);
    assert_eq!(
        reply.content,
        "The pace **Any** has been removed as well as all its subscriptions."
    );
    assert!(h.store.list_paces().await.expect("list").is_empty());
    for id in ["1", "2"] {
        let mine = h.service.list_mine(&member(id)).await.expect("mine");
        assert_eq!(mine.outcome, Outcome::Empty);
    }
    assert!(!h.service.index().contains("Any").await);
    assert!(h.service.suggest("an").await.is_empty());

    let posts = h.platform.posts();
    assert_eq!(
        posts.last().expect("post").1.content,
        "The Modder just removed the pace **Any** as well as all its subscriptions."
    );
    let log = h.store.recent_log(1).await.expect("log");
    assert_eq!(log[0].action, "pace_remove Any");
}

#[tokio::test]
async fn ping_mentions_every_subscriber_in_order() {
    let h = harness();
    h.service
        .create_pace(&moderator(), "Any")
        .await
        .expect("create");
    for id in ["30", "10", "20"] {
        h.service.subscribe(&member(id), "Any").await.expect("sub");
    }

    let reply = h
        .service
        .broadcast_ping(&moderator(), "Any", "sub 30 at 6A", "https://twitch.tv/runner")
        .await
        .expect("ping");
    assert_eq!(reply.outcome, Outcome::Done);
    assert_eq!(
        reply.content,
        "Subscribers to the pace **Any** have been pinged !"
    );

    let posts = h.platform.posts();
    let (channel, ping) = posts.last().expect("ping post");
    assert_eq!(channel, PING_CHANNEL);
    assert_eq!(
        ping.content,
        "Pinging all the users subscribed to the pace **Any** : sub 30 at 6A => https://twitch.tv/runner\n<@30> <@10> <@20> "
    );
    assert_eq!(ping.mention_users, vec!["30", "10", "20"]);
    assert_eq!(h.store.recent_log(1).await.expect("log")[0].action, "pace_ping Any");
}

#[tokio::test]
async fn blank_ping_message_uses_default() {
    let h = harness();
    h.service
        .create_pace(&moderator(), "Any")
        .await
        .expect("create");
    h.service
        .broadcast_ping(&moderator(), "Any", "  ", "https://live")
        .await
        .expect("ping");
    let posts = h.platform.posts();
    assert!(
        posts
            .last()
            .expect("post")
            .1
            .content
            .contains(&format!(": {DEFAULT_PING_MESSAGE} => https://live"))
    );
}

#[tokio::test]
async fn announcement_failure_does_not_fail_creation() {
    let h = harness();
    h.platform.set_failing(true);
    let reply = h
        .service
        .create_pace(&moderator(), "Any")
        .await
        .expect("create");
    assert_eq!(reply.outcome, Outcome::Done);
    assert!(h.service.index().contains("Any").await);
}

#[tokio::test]
async fn ping_failure_is_an_error_and_still_logged() {
    let h = harness();
    h.service
        .create_pace(&moderator(), "Any")
        .await
        .expect("create");
    h.platform.set_failing(true);
    let result = h
        .service
        .broadcast_ping(&moderator(), "Any", "go", "link")
        .await;
    assert!(result.is_err());
    assert_eq!(h.store.recent_log(1).await.expect("log")[0].action, "pace_ping Any");
}

#[tokio::test]
async fn long_ping_header_never_exceeds_the_message_limit() {
    let h = harness();
    h.service.create_pace(&moderator(), "Any").await.expect("create");
    h.service.subscribe(&member("2"), "Any").await.expect("sub");
    let message = "m".repeat(1925);
    let reply = h
        .service
        .broadcast_ping(&moderator(), "Any", &message, "https://live")
        .await
        .expect("ping");
    assert_eq!(reply.outcome, Outcome::Done);
    let pings: Vec<_> = h.platform.posts().into_iter().skip(1).collect();
    assert_eq!(pings.len(), 2);
    for (_, post) in &pings {
        assert!(post.content.chars().count() <= MAX_MESSAGE_CHARS);
    }
    assert_eq!(pings[1].1.mention_users, vec!["2"]);
}

#[tokio::test]
async fn overlong_labels_are_rejected_and_never_suggested() {
    let h = harness();
    let too_long = "a".repeat(MAX_LABEL_CHARS + 50);
    let reply = h
        .service
        .create_pace(&moderator(), &too_long)
        .await
        .expect("create");
    assert_eq!(reply.outcome, Outcome::InvalidLabel);
    assert!(h.store.list_paces().await.expect("list").is_empty());

    let longest = "b".repeat(MAX_LABEL_CHARS);
    let reply = h
        .service
        .create_pace(&moderator(), &longest)
        .await
        .expect("create");
    assert_eq!(reply.outcome, Outcome::Done);
    assert_eq!(h.service.suggest("").await, vec![longest]);
}

#[tokio::test]
async fn suggestions_follow_the_index() {
    let h = harness();
    for raw in ["Any_pct", "golden", "ANY_berry"] {
        h.service.create_pace(&moderator(), raw).await.expect("create");
    }
    assert_eq!(h.service.suggest("any").await, vec!["ANY_berry", "Any_pct"]);
    assert_eq!(h.service.suggest("").await.len(), 3);
}
