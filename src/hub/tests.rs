use super::history::History;
use super::registry::Registry;
use super::{Event, EventKind, Hub, HubHandle, Subscription};
use crate::config::HubSettings;
use crate::utils::error::HubError;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn spawn_hub() -> HubHandle {
    Hub::spawn(&HubSettings::default())
}

async fn recv(sub: &mut Subscription) -> Event {
    timeout(WAIT, sub.recv())
        .await
        .expect("timed out waiting for event")
        .expect("feed closed")
}

fn texts(events: &[Event]) -> Vec<&str> {
    events.iter().map(|e| e.text.as_str()).collect()
}

#[test]
fn test_event_new() {
    let before = chrono::Utc::now().timestamp();
    let event = Event::message("alice", "hi");
    let after = chrono::Utc::now().timestamp();

    assert_eq!(event.kind, EventKind::Message);
    assert_eq!(event.actor, "alice");
    assert_eq!(event.text, "hi");
    assert!(event.timestamp >= before && event.timestamp <= after);

    assert_eq!(Event::join("bob").text, "");
    assert_eq!(Event::leave("bob").kind, EventKind::Leave);
    assert_eq!(Event::new(EventKind::Message, "", "").actor, "");
}

#[test]
fn test_event_kind_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&EventKind::Join).unwrap(), r#""join""#);
    assert_eq!(
        serde_json::to_string(&EventKind::Message).unwrap(),
        r#""message""#
    );
    assert_eq!(serde_json::to_string(&EventKind::Leave).unwrap(), r#""leave""#);
}

#[test]
fn test_history_evicts_one_per_push_at_capacity() {
    let mut history = History::new(3);
    for i in 1..=3 {
        assert!(history.push(Event::message("a", format!("msg-{i}"))).is_none());
    }
    assert_eq!(history.len(), 3);

    let evicted = history.push(Event::message("a", "msg-4")).unwrap();
    assert_eq!(evicted.text, "msg-1");
    assert_eq!(history.len(), 3);
    assert_eq!(texts(&history.snapshot()), vec!["msg-2", "msg-3", "msg-4"]);
}

#[test]
fn test_history_zero_capacity_keeps_nothing() {
    let mut history = History::new(0);
    let rejected = history.push(Event::join("a")).unwrap();
    assert_eq!(rejected.actor, "a");
    assert!(history.is_empty());
}

#[test]
fn test_history_default_capacity() {
    assert_eq!(History::default().capacity(), 20);
}

#[test]
fn test_registry_insert_and_remove() {
    let mut registry = Registry::new();
    let (tx1, _rx1) = mpsc::channel(1);
    let (tx2, _rx2) = mpsc::channel(1);

    let first = registry.insert(tx1);
    let second = registry.insert(tx2);
    assert_ne!(first, second);

    let order: Vec<_> = registry.iter().map(|(id, _)| id).collect();
    assert_eq!(order, vec![first, second]);

    assert!(registry.remove(first));
    assert!(!registry.remove(first));
    assert!(!registry.contains(first));
    assert!(registry.contains(second));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_registry_remove_closes_feed() {
    let mut registry = Registry::new();
    let (tx, mut rx) = mpsc::channel::<Event>(1);
    let id = registry.insert(tx);

    registry.remove(id);
    assert!(registry.is_empty());
    assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
}

#[tokio::test]
async fn test_history_is_bounded_to_last_twenty() {
    let hub = spawn_hub();
    for i in 1..=25 {
        hub.record_message("alice", format!("msg-{i}")).await.unwrap();
    }

    let sub = hub.subscribe().await.unwrap();
    let expected: Vec<String> = (6..=25).map(|i| format!("msg-{i}")).collect();
    assert_eq!(sub.archive.len(), 20);
    assert_eq!(
        texts(&sub.archive),
        expected.iter().map(String::as_str).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_snapshot_contains_prior_events_in_order() {
    let hub = spawn_hub();
    hub.record_join("alice").await.unwrap();
    hub.record_message("alice", "hi").await.unwrap();

    let bob = hub.subscribe().await.unwrap();
    let archive: Vec<_> = bob
        .archive
        .iter()
        .map(|e| (e.kind, e.actor.as_str(), e.text.as_str()))
        .collect();
    assert_eq!(
        archive,
        vec![
            (EventKind::Join, "alice", ""),
            (EventKind::Message, "alice", "hi"),
        ]
    );
}

#[tokio::test]
async fn test_event_after_subscribe_is_delivered_live_once() {
    let hub = spawn_hub();
    let mut sub = hub.subscribe().await.unwrap();

    let event = Event::message("alice", "live");
    hub.publish(event.clone()).await.unwrap();

    assert_eq!(recv(&mut sub).await, event);
    assert!(!sub.archive.contains(&event));
    assert_eq!(sub.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn test_all_subscribers_see_same_order() {
    let hub = spawn_hub();
    let mut first = hub.subscribe().await.unwrap();
    let mut second = hub.subscribe().await.unwrap();

    let producers: Vec<_> = (0..3)
        .map(|p| {
            let hub = hub.clone();
            tokio::spawn(async move {
                for i in 0..3 {
                    hub.record_message(format!("producer-{p}"), format!("{p}-{i}"))
                        .await
                        .unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.await.unwrap();
    }

    let mut seen_first = Vec::new();
    let mut seen_second = Vec::new();
    for _ in 0..9 {
        seen_first.push(recv(&mut first).await);
        seen_second.push(recv(&mut second).await);
    }
    assert_eq!(seen_first, seen_second);

    // each producer's own events keep their relative order
    for p in 0..3 {
        let own: Vec<_> = seen_first
            .iter()
            .filter(|e| e.actor == format!("producer-{p}"))
            .map(|e| e.text.clone())
            .collect();
        assert_eq!(own, vec![format!("{p}-0"), format!("{p}-1"), format!("{p}-2")]);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_snapshot_and_live_feed_form_gapless_run() {
    const LAST: u32 = 60;

    let hub = spawn_hub();
    let producer = {
        let hub = hub.clone();
        tokio::spawn(async move {
            for i in 1..=LAST {
                hub.record_message("alice", i.to_string()).await.unwrap();
            }
        })
    };

    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    let mut sub = hub.subscribe().await.unwrap();

    let mut seen: Vec<u32> = sub
        .archive
        .iter()
        .map(|e| e.text.parse().unwrap())
        .collect();
    // drain before joining: the producer blocks once the feed is full
    while seen.last().copied().unwrap_or(0) < LAST {
        seen.push(recv(&mut sub).await.text.parse().unwrap());
    }
    timeout(WAIT, producer).await.unwrap().unwrap();

    assert_eq!(seen.last(), Some(&LAST));
    for pair in seen.windows(2) {
        assert_eq!(pair[1], pair[0] + 1, "gap or duplicate in {seen:?}");
    }
}

#[tokio::test]
async fn test_fan_out_delivers_one_copy_each() {
    let hub = spawn_hub();
    let mut first = hub.subscribe().await.unwrap();
    let mut second = hub.subscribe().await.unwrap();

    hub.record_join("carol").await.unwrap();

    let a = recv(&mut first).await;
    let b = recv(&mut second).await;
    assert_eq!(a, b);
    assert_eq!(a.kind, EventKind::Join);
    assert_eq!(first.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(second.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn test_immediate_cancel_returns() {
    let hub = spawn_hub();
    let mut sub = hub.subscribe().await.unwrap();
    timeout(WAIT, sub.cancel())
        .await
        .expect("cancel blocked");
}

#[tokio::test]
async fn test_cancel_twice_and_no_further_delivery() {
    let hub = spawn_hub();
    let mut sub = hub.subscribe().await.unwrap();

    timeout(WAIT, sub.cancel()).await.expect("first cancel blocked");
    timeout(WAIT, sub.cancel()).await.expect("second cancel blocked");

    // queued after the unsubscribes, so handled after them
    let mut watcher = hub.subscribe().await.unwrap();
    hub.record_message("alice", "after cancel").await.unwrap();
    assert_eq!(recv(&mut watcher).await.text, "after cancel");

    // the hub dropped the feed instead of delivering to it
    assert_eq!(sub.try_recv(), Err(TryRecvError::Disconnected));
}

#[tokio::test]
async fn test_cancel_drains_pending_events() {
    let hub = spawn_hub();
    let mut sub = hub.subscribe().await.unwrap();
    let mut watcher = hub.subscribe().await.unwrap();

    for i in 0..3 {
        hub.record_message("alice", format!("pending-{i}")).await.unwrap();
    }
    for _ in 0..3 {
        recv(&mut watcher).await;
    }

    sub.cancel().await;

    // round trip through the hub so the unsubscribe has been handled
    let _sync = hub.subscribe().await.unwrap();
    assert_eq!(sub.try_recv(), Err(TryRecvError::Disconnected));
}

#[tokio::test]
async fn test_unsubscribe_unknown_feed_is_noop() {
    let hub = spawn_hub();
    let mut sub = hub.subscribe().await.unwrap();
    let id = sub.id();

    hub.unsubscribe(id).await.unwrap();
    hub.unsubscribe(id).await.unwrap();

    let mut watcher = hub.subscribe().await.unwrap();
    hub.record_join("dave").await.unwrap();
    assert_eq!(recv(&mut watcher).await.actor, "dave");
    assert_eq!(sub.try_recv(), Err(TryRecvError::Disconnected));
}

#[tokio::test]
async fn test_full_feed_stalls_hub_until_drained() {
    let settings = HubSettings {
        feed_capacity: 2,
        ..HubSettings::default()
    };
    let hub = Hub::spawn(&settings);
    let mut slow = hub.subscribe().await.unwrap();

    for i in 0..3 {
        hub.record_message("alice", format!("m{i}")).await.unwrap();
    }

    // the third delivery is stuck behind the undrained feed
    let stalled = timeout(Duration::from_millis(200), hub.subscribe()).await;
    assert!(stalled.is_err());

    assert_eq!(recv(&mut slow).await.text, "m0");

    let late = timeout(WAIT, hub.subscribe())
        .await
        .expect("hub still stalled")
        .unwrap();
    assert_eq!(texts(&late.archive), vec!["m0", "m1", "m2"]);
    assert_eq!(recv(&mut slow).await.text, "m1");
    assert_eq!(recv(&mut slow).await.text, "m2");
}

#[tokio::test]
async fn test_cancel_unblocks_stalled_hub() {
    let settings = HubSettings {
        feed_capacity: 2,
        ..HubSettings::default()
    };
    let hub = Hub::spawn(&settings);
    let mut slow = hub.subscribe().await.unwrap();

    for i in 0..5 {
        hub.record_message("alice", format!("m{i}")).await.unwrap();
    }

    let stalled = timeout(Duration::from_millis(200), hub.subscribe()).await;
    assert!(stalled.is_err());

    timeout(WAIT, slow.cancel())
        .await
        .expect("cancel blocked on a stalled hub");

    let late = timeout(WAIT, hub.subscribe())
        .await
        .expect("hub still stalled after cancel")
        .unwrap();
    assert_eq!(texts(&late.archive), vec!["m0", "m1", "m2", "m3", "m4"]);
}

#[tokio::test]
async fn test_dropped_subscription_does_not_stall_hub() {
    let settings = HubSettings {
        feed_capacity: 1,
        ..HubSettings::default()
    };
    let hub = Hub::spawn(&settings);
    drop(hub.subscribe().await.unwrap());

    for i in 0..5 {
        hub.record_message("alice", format!("m{i}")).await.unwrap();
    }

    let late = timeout(WAIT, hub.subscribe())
        .await
        .expect("hub stalled on a dropped feed")
        .unwrap();
    assert_eq!(late.archive.len(), 5);
}

#[tokio::test]
async fn test_zero_capacities_are_clamped() {
    let settings = HubSettings {
        history_capacity: 0,
        feed_capacity: 0,
        request_capacity: 0,
    };
    let hub = Hub::spawn(&settings);
    let mut sub = hub.subscribe().await.unwrap();

    hub.record_join("erin").await.unwrap();
    assert_eq!(recv(&mut sub).await.actor, "erin");

    let late = hub.subscribe().await.unwrap();
    assert!(late.archive.is_empty());
}

#[tokio::test]
async fn test_stopped_hub_reports_closed() {
    let (hub, handle) = Hub::new(&HubSettings::default());
    drop(hub);

    assert_eq!(handle.subscribe().await.unwrap_err(), HubError::Closed);
    assert_eq!(handle.record_join("frank").await, Err(HubError::Closed));
    assert_eq!(handle.record_leave("frank").await, Err(HubError::Closed));
}

#[tokio::test]
async fn test_hub_stops_after_last_handle_and_subscription() {
    let (hub, handle) = Hub::new(&HubSettings::default());
    let task = tokio::spawn(hub.run());

    let mut sub = handle.subscribe().await.unwrap();
    drop(handle);

    // subscriptions still hold the unsubscribe side open
    assert!(timeout(Duration::from_millis(100), sub.recv()).await.is_err());
    assert!(!task.is_finished());

    sub.cancel().await;
    drop(sub);
    timeout(WAIT, task)
        .await
        .expect("hub did not stop")
        .unwrap();
}
