pub mod outbox_events;
pub mod wifi_sessions;
