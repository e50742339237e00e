//! Invocation handler flow with an in-memory table and a recording notifier.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rstest::rstest;
use serde_json::json;
use slotpool::{
    Allocator, AssignmentOutcome, Endpoint, EndpointError, InvocationResult, MemorySlotTable,
    Notification, PutOutcome, Reporter, Severity, SlotNumber, SlotRecord, SlotState, SlotTable,
    TableError, BAD_EVENT_MARKER, DEFAULT_HOST_TEMPLATE, NO_ASSIGNMENT_MARKER,
};
use slotpool_finder::invoke::Finder;
use slotpool_finder::notify::{Notifier, NotifyError};

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

struct BrokenNotifier;

#[async_trait]
impl Notifier for BrokenNotifier {
    async fn notify(&self, _: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Rejected("channel_not_found".to_string()))
    }
}

struct UnreachableTable;

#[async_trait]
impl SlotTable for UnreachableTable {
    async fn get(&self, _: SlotNumber) -> Result<Option<SlotRecord>, TableError> {
        Err(TableError::backend(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }

    async fn conditional_put(
        &self,
        _: SlotNumber,
        _: &Endpoint,
        _: &SlotState,
    ) -> Result<PutOutcome, TableError> {
        unreachable!("no write after a failed read")
    }
}

struct Fixture {
    table: Arc<MemorySlotTable>,
    notifier: Arc<RecordingNotifier>,
    finder: Finder,
}

fn fixture(pool_size: u32) -> Fixture {
    let table = Arc::new(MemorySlotTable::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let dyn_table: Arc<dyn SlotTable> = table.clone();
    let finder = Finder::new(
        Allocator::new(dyn_table, pool_size).unwrap(),
        Reporter::new(DEFAULT_HOST_TEMPLATE, 9000),
        notifier.clone(),
    );
    Fixture {
        table,
        notifier,
        finder,
    }
}

fn slot(n: u32) -> SlotNumber {
    SlotNumber::new(n).unwrap()
}

#[tokio::test]
async fn walkthrough_reports_each_outcome() {
    let f = fixture(3);

    let first = f.finder.handle_event(&json!({ "public_ip": "10.0.0.5" })).await.unwrap();
    assert_eq!(first.result(), InvocationResult::Slot(slot(1)));

    let second = f.finder.handle_event(&json!({ "public_ip": "10.0.0.9" })).await.unwrap();
    assert_eq!(second.result(), InvocationResult::Slot(slot(2)));

    f.table.occupy(slot(3), &Endpoint::parse("10.0.0.1").unwrap());

    let third = f.finder.handle_event(&json!({ "public_ip": "10.0.0.7" })).await.unwrap();
    assert_eq!(third.result(), InvocationResult::Failed(NO_ASSIGNMENT_MARKER));

    let sent = f.notifier.sent();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0].severity, Severity::Ok);
    assert_eq!(
        sent[0].message,
        "Assignment finder: 10.0.0.5 was assigned to su1.ao-testnet.xyz:9000"
    );
    assert_eq!(sent[1].severity, Severity::Ok);
    assert_eq!(
        sent[1].message,
        "Assignment finder: 10.0.0.9 was assigned to su2.ao-testnet.xyz:9000"
    );
    assert_eq!(sent[2].severity, Severity::Error);
    assert_eq!(
        sent[2].message,
        "Assignment finder: 10.0.0.7 was unable to find available assignment"
    );
}

#[rstest]
#[case::missing_field(json!({ "source": "ec2" }), EndpointError::Missing)]
#[case::null_field(json!({ "public_ip": null }), EndpointError::Missing)]
#[case::empty(json!({ "public_ip": "" }), EndpointError::Empty)]
#[case::not_a_string(json!({ "public_ip": 10 }), EndpointError::NotAString("10".to_string()))]
#[case::not_an_object(json!([1, 2]), EndpointError::Missing)]
#[tokio::test]
async fn malformed_events_warn_and_write_nothing(
    #[case] event: serde_json::Value,
    #[case] reason: EndpointError,
) {
    let f = fixture(3);

    let outcome = f.finder.handle_event(&event).await.unwrap();

    assert_eq!(outcome, AssignmentOutcome::BadRequest { reason });
    assert_eq!(outcome.result(), InvocationResult::Failed(BAD_EVENT_MARKER));
    assert_eq!(f.table.write_count(), 0);

    let sent = f.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].severity, Severity::Warn);
    assert!(sent[0].message.starts_with("Assignment finder event error: "));
}

#[tokio::test]
async fn bad_event_notification_quotes_event() {
    let f = fixture(1);
    f.finder
        .handle_event(&json!({ "detail-type": "EC2 Instance State-change" }))
        .await
        .unwrap();

    let sent = f.notifier.sent();
    assert!(sent[0].message.contains("\"detail-type\": \"EC2 Instance State-change\""));
}

#[tokio::test]
async fn notification_failure_does_not_fail_invocation() {
    let table: Arc<dyn SlotTable> = Arc::new(MemorySlotTable::new());
    let finder = Finder::new(
        Allocator::new(table, 2).unwrap(),
        Reporter::new(DEFAULT_HOST_TEMPLATE, 9000),
        Arc::new(BrokenNotifier),
    );

    let outcome = finder.handle_event(&json!({ "public_ip": "10.0.0.5" })).await.unwrap();
    assert_eq!(outcome.slot(), Some(slot(1)));
}

#[tokio::test]
async fn table_failure_propagates_without_notification() {
    let notifier = Arc::new(RecordingNotifier::default());
    let table: Arc<dyn SlotTable> = Arc::new(UnreachableTable);
    let finder = Finder::new(
        Allocator::new(table, 2).unwrap(),
        Reporter::new(DEFAULT_HOST_TEMPLATE, 9000),
        notifier.clone(),
    );

    let result = finder.handle_event(&json!({ "public_ip": "10.0.0.5" })).await;

    assert!(matches!(result, Err(TableError::Backend(_))));
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn concurrent_invocations_share_one_table() {
    let f = Arc::new(fixture(4));

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let f = f.clone();
            tokio::spawn(async move {
                f.finder
                    .handle_event(&json!({ "public_ip": format!("10.9.0.{i}") }))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut claimed = Vec::new();
    let mut exhausted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            AssignmentOutcome::Assigned { slot, .. } => claimed.push(slot.get()),
            AssignmentOutcome::PoolExhausted { .. } => exhausted += 1,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    claimed.sort_unstable();
    assert_eq!(claimed, vec![1, 2, 3, 4]);
    assert_eq!(exhausted, 2);
    assert_eq!(f.notifier.sent().len(), 6);
}
