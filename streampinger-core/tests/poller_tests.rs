// tests/poller_tests.rs

mod test_utils;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use parking_lot::Mutex;

use streampinger_common::models::{ActivityStatus, Platform};
use streampinger_core::poller::{ExhaustionPolicy, PlatformPoller, PollerExit, PollerSettings};
use streampinger_core::{Error, TransitionBus};

use test_utils::*;

fn setup(client: Arc<ScriptedClient>, isolate: bool) -> (Arc<TransitionBus>, PlatformPoller) {
    let bus = Arc::new(TransitionBus::new());
    let poller = PlatformPoller::new(client, bus.clone(), fast_settings(isolate));
    (bus, poller)
}

#[tokio::test]
async fn test_baseline_cycle_is_silent_even_when_live() -> Result<(), Error> {
    let client = Arc::new(ScriptedClient::new(Platform::Twitch));
    client.add_account("foo");
    client.set_live("foo", "Art", "Drawing");
    let (bus, poller) = setup(client.clone(), true);

    let activity = poller.register("foo").await?;
    let handler = Arc::new(RecordingHandler::new("recorder"));
    bus.subscribe(activity.id(), handler.clone());

    let summary = poller.poll_once().await?;
    assert_eq!(summary.baselines, 1);
    assert_eq!(summary.transitions, 0);
    assert!(handler.seen().is_empty());
    assert_eq!(activity.status(), ActivityStatus::Online);
    Ok(())
}

#[tokio::test]
async fn test_same_status_twice_is_silent() -> Result<(), Error> {
    let client = Arc::new(ScriptedClient::new(Platform::Picarto));
    client.add_account("foo");
    let (bus, poller) = setup(client.clone(), true);

    let activity = poller.register("foo").await?;
    let handler = Arc::new(RecordingHandler::new("recorder"));
    bus.subscribe(activity.id(), handler.clone());

    poller.poll_once().await?;
    poller.poll_once().await?;
    poller.poll_once().await?;
    assert!(handler.seen().is_empty());
    assert_eq!(activity.status(), ActivityStatus::Offline);
    Ok(())
}

#[tokio::test]
async fn test_transitions_carry_metadata_only_when_online() -> Result<(), Error> {
    let client = Arc::new(ScriptedClient::new(Platform::Twitch));
    client.add_account("foo");
    let (bus, poller) = setup(client.clone(), true);

    let activity = poller.register("foo").await?;
    let handler = Arc::new(RecordingHandler::new("recorder"));
    bus.subscribe(activity.id(), handler.clone());

    poller.poll_once().await?; // Offline baseline
    client.set_live("foo", "Art", "Drawing");
    poller.poll_once().await?;
    client.set_offline("foo");
    poller.poll_once().await?;

    let seen = handler.seen();
    assert_eq!(seen.len(), 2);

    assert_eq!(seen[0].status, ActivityStatus::Online);
    assert_eq!(seen[0].category.as_deref(), Some("Art"));
    assert_eq!(seen[0].title.as_deref(), Some("Drawing"));

    assert_eq!(seen[1].status, ActivityStatus::Offline);
    assert!(seen[1].category.is_none());
    assert!(seen[1].title.is_none());
    Ok(())
}

#[tokio::test]
async fn test_state_is_recorded_before_subscribers_run() -> Result<(), Error> {
    let client = Arc::new(ScriptedClient::new(Platform::Twitch));
    client.add_account("foo");
    let (bus, poller) = setup(client.clone(), true);

    let activity = poller.register("foo").await?;
    let handler = Arc::new(RecordingHandler::new("recorder"));
    bus.subscribe(activity.id(), handler.clone());

    poller.poll_once().await?;
    client.set_live("foo", "Art", "Drawing");
    client.rename("foo", "Foo The Artist");
    poller.poll_once().await?;

    let seen = handler.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].recorded_status, ActivityStatus::Online);
    // Profile is refreshed on transitions, never on the baseline.
    assert_eq!(seen[0].display_name, "Foo The Artist");
    assert_eq!(client.profile_refreshes.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_subscribers_run_in_registration_order() -> Result<(), Error> {
    let client = Arc::new(ScriptedClient::new(Platform::Twitch));
    client.add_account("foo");
    let (bus, poller) = setup(client.clone(), true);

    let activity = poller.register("foo").await?;
    let order = Arc::new(Mutex::new(Vec::new()));
    for name in ["first", "second", "third"] {
        bus.subscribe(activity.id(), Arc::new(RecordingHandler::with_order_log(name, order.clone())));
    }

    poller.poll_once().await?;
    client.set_live("foo", "Art", "Drawing");
    poller.poll_once().await?;

    assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    Ok(())
}

#[tokio::test]
async fn test_failing_subscriber_is_isolated() -> Result<(), Error> {
    let client = Arc::new(ScriptedClient::new(Platform::Twitch));
    client.add_account("foo");
    let (bus, poller) = setup(client.clone(), true);

    let activity = poller.register("foo").await?;
    let failing = Arc::new(FailingHandler::new());
    let recorder = Arc::new(RecordingHandler::new("recorder"));
    bus.subscribe(activity.id(), failing.clone());
    bus.subscribe(activity.id(), recorder.clone());

    poller.poll_once().await?;
    client.set_live("foo", "Art", "Drawing");
    let summary = poller.poll_once().await?;

    assert_eq!(summary.transitions, 1);
    assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.seen().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_failing_subscriber_fails_cycle_when_not_isolated() -> Result<(), Error> {
    let client = Arc::new(ScriptedClient::new(Platform::Twitch));
    client.add_account("foo");
    let (bus, poller) = setup(client.clone(), false);

    let activity = poller.register("foo").await?;
    let failing = Arc::new(FailingHandler::new());
    let recorder = Arc::new(RecordingHandler::new("recorder"));
    bus.subscribe(activity.id(), failing.clone());
    bus.subscribe(activity.id(), recorder.clone());

    poller.poll_once().await?;
    client.set_live("foo", "Art", "Drawing");
    assert!(poller.poll_once().await.is_err());
    assert!(recorder.seen().is_empty());

    // The transition was recorded, so it is not replayed next cycle.
    assert_eq!(activity.status(), ActivityStatus::Online);
    poller.poll_once().await?;
    assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_accounts_are_polled_in_batches() -> Result<(), Error> {
    let client = Arc::new(ScriptedClient::new(Platform::Twitch).with_max_batch(2));
    for login in ["a", "b", "c", "d", "e"] {
        client.add_account(login);
    }
    let (_bus, poller) = setup(client.clone(), true);
    for login in ["a", "b", "c", "d", "e"] {
        poller.register(login).await?;
    }

    let summary = poller.poll_once().await?;
    assert_eq!(summary.polled, 5);
    assert_eq!(*client.batch_sizes.lock(), vec![2, 2, 1]);
    Ok(())
}

#[tokio::test]
async fn test_unknown_account_is_not_registered() {
    let client = Arc::new(ScriptedClient::new(Platform::YouTube));
    let (_bus, poller) = setup(client, true);

    let err = poller.register("@nobody").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(poller.activities().is_empty());
}

#[tokio::test]
async fn test_outage_freezes_state_and_exhausts() -> Result<(), Error> {
    let client = Arc::new(ScriptedClient::new(Platform::Picarto));
    client.add_account("foo");
    client.set_live("foo", "Art", "Drawing");
    let (bus, poller) = setup(client.clone(), true);

    let activity = poller.register("foo").await?;
    let handler = Arc::new(RecordingHandler::new("recorder"));
    bus.subscribe(activity.id(), handler.clone());
    poller.poll_once().await?;

    client.set_failing(true);
    assert_eq!(poller.run().await, PollerExit::Exhausted { failures: 3 });
    assert_eq!(activity.status(), ActivityStatus::Online);
    assert!(handler.seen().is_empty());
    // One baseline cycle plus three failed ones.
    assert_eq!(client.poll_calls.load(Ordering::SeqCst), 4);
    Ok(())
}

#[tokio::test]
async fn test_successful_cycle_resets_failure_count() -> Result<(), Error> {
    let client = Arc::new(ScriptedClient::new(Platform::Twitch));
    client.add_account("foo");
    let (_bus, poller) = setup(client.clone(), true);
    poller.register("foo").await?;

    // Two failures, one good cycle, then three failures in a row.
    client.script_outcomes(&[true, true, false, true, true, true]);
    assert_eq!(poller.run().await, PollerExit::Exhausted { failures: 3 });
    assert_eq!(client.poll_calls.load(Ordering::SeqCst), 6);
    Ok(())
}

#[tokio::test]
async fn test_restart_policy_keeps_polling_past_the_ceiling() -> Result<(), Error> {
    let client = Arc::new(ScriptedClient::new(Platform::Picarto));
    client.add_account("foo");
    let bus = Arc::new(TransitionBus::new());
    let settings = PollerSettings {
        max_consecutive_failures: 2,
        exhaustion: ExhaustionPolicy::Restart { cooldown: Duration::from_millis(1) },
        ..fast_settings(true)
    };
    let poller = Arc::new(PlatformPoller::new(client.clone(), bus.clone(), settings));

    let activity = poller.register("foo").await?;
    let handler = Arc::new(RecordingHandler::new("recorder"));
    bus.subscribe(activity.id(), handler.clone());

    // Hits the ceiling twice before the platform comes back.
    client.script_outcomes(&[true, true, true, true]);
    let task = poller.clone().spawn();

    assert!(wait_until(|| activity.status() == ActivityStatus::Offline).await);
    assert!(client.poll_calls.load(Ordering::SeqCst) >= 5);

    client.set_live("foo", "Art", "Drawing");
    assert!(wait_until(|| handler.seen().len() == 1).await);
    assert_eq!(handler.seen()[0].status, ActivityStatus::Online);
    assert!(!task.is_finished());
    task.abort();
    Ok(())
}

#[tokio::test]
async fn test_account_registered_while_running_starts_with_silent_baseline() -> Result<(), Error> {
    let client = Arc::new(ScriptedClient::new(Platform::Twitch));
    client.add_account("foo");
    let bus = Arc::new(TransitionBus::new());
    let poller = Arc::new(PlatformPoller::new(client.clone(), bus.clone(), fast_settings(true)));
    poller.register("foo").await?;

    let task = poller.clone().spawn();
    assert!(wait_until(|| client.poll_calls.load(Ordering::SeqCst) >= 2).await);

    client.add_account("bar");
    client.set_live("bar", "Art", "Drawing");
    let bar = poller.register("bar").await?;
    let handler = Arc::new(RecordingHandler::new("recorder"));
    bus.subscribe(bar.id(), handler.clone());

    assert!(wait_until(|| bar.status() == ActivityStatus::Online).await);
    let calls = client.poll_calls.load(Ordering::SeqCst);
    assert!(wait_until(|| client.poll_calls.load(Ordering::SeqCst) >= calls + 2).await);
    assert!(handler.seen().is_empty());

    client.set_offline("bar");
    assert!(wait_until(|| handler.seen().len() == 1).await);
    assert_eq!(handler.seen()[0].status, ActivityStatus::Offline);
    task.abort();
    Ok(())
}
