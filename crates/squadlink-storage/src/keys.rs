//! Storage key constants.

/// Storage keys used by the services
pub struct StorageKeys;

impl StorageKeys {
    /// Offline outbound message queue (JSON array of queued messages)
    pub const MESSAGE_QUEUE: &'static str = "offline_message_queue";

    /// Session safety check-ins (scheduled, active and past collections)
    pub const SESSION_CHECK_INS: &'static str = "session_check_ins";
}
