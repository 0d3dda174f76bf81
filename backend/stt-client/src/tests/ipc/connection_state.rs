use crate::ipc::ConnectionState;

#[test]
fn given_default_state_when_created_then_disconnected() {
    assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    assert!(!ConnectionState::default().is_connected());
}

#[test]
fn given_each_state_when_displayed_then_lowercase_name() {
    assert_eq!(ConnectionState::Disconnected.to_string(), "disconnected");
    assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
    assert_eq!(ConnectionState::Connected.to_string(), "connected");
    assert_eq!(ConnectionState::Reconnecting.to_string(), "reconnecting");
    assert!(ConnectionState::Connected.is_connected());
    assert!(!ConnectionState::Reconnecting.is_connected());
}
