// Unit tests for the callback registry

use crate::ipc::CallbackRegistry;
use crate::protocol::events::{StatusSnapshot, TranscriptionResult};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Map;

#[test]
fn given_no_callbacks_when_emitting_then_reports_not_delivered() {
    let registry = CallbackRegistry::default();

    assert!(!registry.has_transcription());
    assert!(!registry.emit_transcription(TranscriptionResult::from_data(&Map::new())));
    assert!(!registry.emit_status(StatusSnapshot::from_data(&Map::new())));
    assert!(!registry.emit_error("boom".to_string()));
    assert!(!registry.emit_connection(true));
}

#[test]
fn given_callback_replaced_when_emitting_then_only_latest_runs() {
    let registry = CallbackRegistry::default();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let first = Arc::clone(&seen);
    registry.set_error(Arc::new(move |m: String| first.lock().unwrap().push(format!("first:{m}"))));
    let second = Arc::clone(&seen);
    registry.set_error(Arc::new(move |m: String| second.lock().unwrap().push(format!("second:{m}"))));

    assert!(registry.emit_error("oops".to_string()));
    assert_eq!(*seen.lock().unwrap(), vec!["second:oops".to_string()]);
}

/// **VALUE**: Verifies a panicking callback does not take the receive loop down with it.
///
/// **WHY THIS MATTERS**: Callbacks are user code running on the receive-loop task. A
/// panic there would otherwise end the loop and strand every pending command.
///
/// **BUG THIS CATCHES**: Missing `catch_unwind`, or a lock held while the callback runs
/// and left poisoned.
#[test]
fn given_panicking_callback_when_emitted_twice_then_both_calls_return() {
    let registry = CallbackRegistry::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    registry.set_connection(Arc::new(move |_: bool| {
        counter.fetch_add(1, Ordering::SeqCst);
        panic!("callback failure");
    }));

    assert!(registry.emit_connection(true));
    assert!(registry.emit_connection(false));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
