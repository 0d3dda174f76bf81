// Unit tests for request/reply correlation
// Exactly-once settlement across reply, timeout and connection loss

use crate::error::ClientError;
use crate::ipc::CorrelationTable;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Map, Value};

fn ack(success: bool) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("success".to_string(), Value::Bool(success));
    data
}

/// **VALUE**: Verifies a reply reaches the waiter registered for its id.
#[tokio::test]
async fn given_registered_id_when_resolved_then_waiter_receives_reply() {
    // GIVEN
    let table = Arc::new(Mutex::new(CorrelationTable::default()));
    let waiter = table
        .lock()
        .unwrap()
        .register("req-1", "pause", Duration::from_secs(1))
        .expect("register");

    // WHEN
    let resolved = table.lock().unwrap().resolve("req-1", Ok(ack(true)));

    // THEN
    assert!(resolved);
    let reply = waiter
        .wait(Duration::from_secs(1), "pause", |id| {
            table.lock().unwrap().retire(id)
        })
        .await
        .expect("reply");
    assert_eq!(reply.get("success"), Some(&Value::Bool(true)));
    assert_eq!(table.lock().unwrap().len(), 0);
}

/// **VALUE**: Verifies replies are matched by id, not by arrival order.
///
/// **WHY THIS MATTERS**: The daemon may finish commands out of order. FIFO matching would
/// hand a `get_status` result to a `pause` caller.
#[tokio::test]
async fn given_two_pending_ids_when_resolved_in_reverse_then_each_gets_its_own_reply() {
    let mut table = CorrelationTable::default();
    let first = table
        .register("a", "first", Duration::from_secs(1))
        .expect("register a");
    let second = table
        .register("b", "second", Duration::from_secs(1))
        .expect("register b");

    let mut reply_b = ack(true);
    reply_b.insert("tag".to_string(), Value::from("b"));
    let mut reply_a = ack(true);
    reply_a.insert("tag".to_string(), Value::from("a"));

    assert!(table.resolve("b", Ok(reply_b)));
    assert!(table.resolve("a", Ok(reply_a)));

    let a = first
        .wait(Duration::from_secs(1), "first", |_| false)
        .await
        .expect("a");
    let b = second
        .wait(Duration::from_secs(1), "second", |_| false)
        .await
        .expect("b");
    assert_eq!(a["tag"], Value::from("a"));
    assert_eq!(b["tag"], Value::from("b"));
}

/// **VALUE**: Verifies a timed-out id is retired and a later reply is discarded.
///
/// **BUG THIS CATCHES**: A late acknowledgment being delivered to nobody but still
/// counted as resolved, or the table leaking the entry forever.
#[tokio::test]
async fn given_no_reply_when_wait_times_out_then_command_timeout_and_late_reply_ignored() {
    let table = Arc::new(Mutex::new(CorrelationTable::default()));
    let waiter = table
        .lock()
        .unwrap()
        .register("slow", "get_status", Duration::from_millis(20))
        .expect("register");

    // WHEN: Nothing answers within the timeout
    let result = waiter
        .wait(Duration::from_millis(20), "get_status", |id| {
            table.lock().unwrap().retire(id)
        })
        .await;

    // THEN: Timeout, entry gone, late reply is a no-op
    assert!(matches!(result, Err(ClientError::CommandTimeout { .. })));
    assert_eq!(table.lock().unwrap().len(), 0);
    assert!(!table.lock().unwrap().resolve("slow", Ok(ack(true))));
}

/// **VALUE**: Verifies a reply that lands just as the timeout fires still wins.
///
/// **WHY THIS MATTERS**: If the dispatcher resolved the id first, the caller must see that
/// reply, never both a reply and a timeout.
#[tokio::test]
async fn given_reply_already_delivered_when_timeout_fires_then_reply_returned() {
    let table = Arc::new(Mutex::new(CorrelationTable::default()));
    let waiter = table
        .lock()
        .unwrap()
        .register("race", "pause", Duration::from_millis(10))
        .expect("register");

    // GIVEN: Resolved, but the waiter is only polled after its deadline
    assert!(table.lock().unwrap().resolve("race", Ok(ack(true))));
    tokio::time::sleep(Duration::from_millis(30)).await;

    // WHEN: The retire attempt reports the entry already gone
    let result = waiter
        .wait(Duration::ZERO, "pause", |id| table.lock().unwrap().retire(id))
        .await;

    // THEN
    assert!(result.expect("reply should win").contains_key("success"));
}

#[test]
fn given_id_in_flight_when_registered_again_then_duplicate_error() {
    let mut table = CorrelationTable::default();
    let _waiter = table
        .register("dup", "pause", Duration::from_secs(1))
        .expect("register");

    let result = table.register("dup", "resume", Duration::from_secs(1));

    assert!(matches!(result, Err(ClientError::DuplicateRequestId { .. })));
    assert_eq!(table.len(), 1);
}

/// **VALUE**: Verifies a connection loss releases every waiter with `ConnectionLost`.
///
/// **BUG THIS CATCHES**: Callers hanging until their own timeout after the daemon died.
#[tokio::test]
async fn given_three_pending_when_fail_all_then_each_waiter_gets_connection_lost() {
    let mut table = CorrelationTable::default();
    let waiters: Vec<_> = ["x", "y", "z"]
        .into_iter()
        .map(|id| {
            table
                .register(id, "pause", Duration::from_secs(5))
                .expect("register")
        })
        .collect();

    let released = table.fail_all("Connection to daemon lost");

    assert_eq!(released, 3);
    assert_eq!(table.len(), 0);
    for waiter in waiters {
        let result = waiter.wait(Duration::from_secs(5), "pause", |_| false).await;
        assert!(result.expect_err("should fail").is_connection_lost());
    }
}
