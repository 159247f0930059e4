//! Integration tests for keyed groups
//!
//! These tests validate:
//! - Memoized lookup and configuration inheritance
//! - Event bubbling to the parent (and grandparent)
//! - Idle self-destruction and re-creation

use async_trait::async_trait;
use prism_queue::config::{GroupConfig, QueueConfig};
use prism_queue::core::{AppResult, EventKind, Queue, QueueEvent, TaskExecutor};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

// ============================================================================
// HELPERS
// ============================================================================

/// Executes `(recipient, sleep_ms)` and records the recipient.
#[derive(Clone, Default)]
struct MailExecutor {
    sent: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl TaskExecutor<(String, u64)> for MailExecutor {
    async fn execute(&self, (recipient, sleep_ms): (String, u64)) -> AppResult<()> {
        tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
        self.sent.lock().await.push(recipient);
        Ok(())
    }
}

fn mail_queue(expiration_ms: u64) -> (Queue<(String, u64)>, MailExecutor) {
    prism_queue::util::init_tracing();
    let executor = MailExecutor::default();
    let queue = Queue::new(
        QueueConfig::new()
            .with_delay(0_u64)
            .with_timeout("5s")
            .with_concurrency(4)
            .with_groups(GroupConfig {
                expiration: Some(expiration_ms.into()),
                ..GroupConfig::default()
            }),
    )
    .unwrap()
    .with_executor(executor.clone());
    (queue, executor)
}

fn mail(recipient: &str, sleep_ms: u64) -> (String, u64) {
    (recipient.to_string(), sleep_ms)
}

async fn next_of_kind<P>(
    rx: &mut mpsc::UnboundedReceiver<QueueEvent<P>>,
    kind: EventKind,
    within: Duration,
) -> Option<QueueEvent<P>> {
    tokio::time::timeout(within, async {
        loop {
            match rx.recv().await {
                Some(event) if event.kind() == kind => return Some(event),
                Some(_) => {}
                None => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}

// ============================================================================
// LOOKUP AND INHERITANCE
// ============================================================================

#[tokio::test]
async fn test_group_is_memoized() {
    let (queue, _) = mail_queue(10_000);

    let first = queue.group("alice");
    let second = queue.group("alice");
    let other = queue.group("bob");

    assert!(first.ptr_eq(&second));
    assert!(!first.ptr_eq(&other));
    assert_eq!(queue.group_names(), vec!["alice", "bob"]);
    assert_eq!(queue.stats().groups, 2);
}

#[tokio::test]
async fn test_group_inherits_settings_except_concurrency() {
    let (queue, _) = mail_queue(10_000);
    let group = queue.group("alice");

    assert!(group.is_group());
    assert!(!queue.is_group());
    assert_eq!(group.name(), Some("alice"));
    assert_eq!(group.settings().concurrency, 1);
    assert_eq!(group.settings().timeout, queue.settings().timeout);
    assert_eq!(group.settings().delay, Duration::ZERO);
}

#[tokio::test]
async fn test_group_concurrency_override() {
    let queue: Queue<u8> = Queue::new(QueueConfig::new().with_groups(GroupConfig {
        concurrency: Some(3),
        timeout: Some("2s".into()),
        ..GroupConfig::default()
    }))
    .unwrap();

    let group = queue.group("batch");
    assert_eq!(group.settings().concurrency, 3);
    assert_eq!(group.settings().timeout, Duration::from_secs(2));
}

#[tokio::test]
async fn test_group_runs_serially_with_parent_executor() {
    let (queue, executor) = mail_queue(10_000);
    let mut events = queue.subscribe();
    let alice = queue.group("alice");

    alice.push(mail("alice-1", 30));
    alice.push(mail("alice-2", 0));
    assert_eq!(alice.inflight(), 1);
    assert_eq!(alice.queued(), 1);

    for _ in 0..2 {
        next_of_kind(&mut events, EventKind::Complete, Duration::from_secs(1))
            .await
            .expect("complete bubbled to parent");
    }
    assert_eq!(*executor.sent.lock().await, vec!["alice-1", "alice-2"]);
    // Group work does not occupy the parent's slots.
    assert_eq!(queue.inflight(), 0);
}

#[tokio::test]
async fn test_groups_run_independently() {
    let (queue, executor) = mail_queue(10_000);
    let groups: Vec<_> = ["alice", "bob", "carol"]
        .into_iter()
        .map(|name| queue.group(name))
        .collect();
    let mut receivers: Vec<_> = groups.iter().map(Queue::subscribe).collect();

    let started = std::time::Instant::now();
    for (group, name) in groups.iter().zip(["alice", "bob", "carol"]) {
        group.push(mail(name, 100));
    }
    let done = futures::future::join_all(
        receivers
            .iter_mut()
            .map(|rx| next_of_kind(rx, EventKind::Complete, Duration::from_secs(1))),
    )
    .await;

    assert!(done.iter().all(Option::is_some));
    // Each group holds one slot of its own, so the three sleeps overlap.
    assert!(started.elapsed() < Duration::from_millis(250));
    assert_eq!(executor.sent.lock().await.len(), 3);
}

// ============================================================================
// EVENT BUBBLING
// ============================================================================

#[tokio::test]
async fn test_events_bubble_to_parent() {
    let (queue, _) = mail_queue(10_000);
    let mut events = queue.subscribe();

    let alice = queue.group("alice");
    let created = next_of_kind(&mut events, EventKind::NewGroup, Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(created.group_name(), Some("alice"));

    let mut group_events = alice.subscribe();
    let id = alice.push(mail("alice", 0));

    let new = next_of_kind(&mut events, EventKind::New, Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(new.task().unwrap().id, id);
    let done = next_of_kind(&mut events, EventKind::Complete, Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(done.task().unwrap().id, id);

    // The group's own subscribers see the same events.
    let local = next_of_kind(&mut group_events, EventKind::Complete, Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(local.task().unwrap().id, id);
}

#[tokio::test]
async fn test_nested_group_events_reach_root() {
    let (root, _) = mail_queue(10_000);
    let mut events = root.subscribe();

    let team = root.group("team");
    let member = team.group("member");
    let id = member.push(mail("member", 0));

    let mut created = Vec::new();
    while created.len() < 2 {
        let event = next_of_kind(&mut events, EventKind::NewGroup, Duration::from_secs(1))
            .await
            .unwrap();
        created.push(event.group_name().unwrap().to_string());
    }
    assert_eq!(created, vec!["team", "member"]);

    let done = next_of_kind(&mut events, EventKind::Complete, Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(done.task().unwrap().id, id);
    assert_eq!(team.group_names(), vec!["member"]);
    assert_eq!(root.group_names(), vec!["team"]);
}

// ============================================================================
// EXPIRATION
// ============================================================================

#[tokio::test]
async fn test_idle_group_self_destructs() {
    let (queue, _) = mail_queue(50);
    let mut events = queue.subscribe();

    let first = queue.group("alice");
    let destroyed = next_of_kind(&mut events, EventKind::GroupDestroy, Duration::from_millis(500))
        .await
        .expect("group destroyed after two idle ticks");
    assert_eq!(destroyed.group_name(), Some("alice"));
    assert!(queue.group_names().is_empty());

    let second = queue.group("alice");
    assert!(!first.ptr_eq(&second));
}

#[tokio::test]
async fn test_group_survives_one_idle_tick() {
    let (queue, _) = mail_queue(80);
    let first = queue.group("alice");

    // Past the first tick, before the second.
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(queue.group("alice").ptr_eq(&first));
}

#[tokio::test]
async fn test_busy_group_is_not_destroyed() {
    let (queue, _) = mail_queue(30);
    let mut events = queue.subscribe();

    let alice = queue.group("alice");
    alice.push(mail("alice", 200));

    // Several ticks elapse while the task is in flight.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(queue.group_names(), vec!["alice"]);
    assert!(queue.group("alice").ptr_eq(&alice));

    next_of_kind(&mut events, EventKind::Complete, Duration::from_secs(1))
        .await
        .expect("task completes");
    let destroyed = next_of_kind(&mut events, EventKind::GroupDestroy, Duration::from_millis(500))
        .await
        .expect("destroyed once idle");
    assert_eq!(destroyed.group_name(), Some("alice"));
}

#[tokio::test]
async fn test_zero_expiration_keeps_group_forever() {
    let (queue, _) = mail_queue(0);
    let first = queue.group("alice");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(queue.group("alice").ptr_eq(&first));
}
