//! Destination naming and classification.
//!
//! Destinations are case-sensitive routing strings, never negotiated with
//! the broker. The per-ticket chat room uses `/topic/chamado/{id}` — legacy
//! broker naming kept for wire compatibility.

/// Broadcast notification topic.
pub const BROADCAST_NOTIFICATIONS: &str = "/topic/notifications";

const USER_PREFIX: &str = "/user/";
const NOTIFICATION_QUEUE_SUFFIX: &str = "/queue/notifications";

/// Per-user notification queue: `/user/{user}/queue/notifications`.
pub fn user_notifications(user: &str) -> String {
    format!("{USER_PREFIX}{user}{NOTIFICATION_QUEUE_SUFFIX}")
}

/// Ticket-status broadcast channel: `/topic/ticket/{id}`.
pub fn ticket_status(ticket_id: i64) -> String {
    format!("/topic/ticket/{ticket_id}")
}

/// Per-ticket chat room: `/topic/chamado/{id}`.
pub fn ticket_chat(ticket_id: i64) -> String {
    format!("/topic/chamado/{ticket_id}")
}

/// Outbound app destination for sending a chat message.
pub fn chat_send(ticket_id: i64) -> String {
    format!("/app/chat.sendMessage/{ticket_id}")
}

/// Outbound app destination for announcing a user joined a chat.
pub fn chat_add_user(ticket_id: i64) -> String {
    format!("/app/chat.addUser/{ticket_id}")
}

/// Returns `true` if messages on `destination` are notification-class and
/// must fan out to the registered observers.
pub fn is_notification(destination: &str) -> bool {
    destination == BROADCAST_NOTIFICATIONS
        || (destination.starts_with(USER_PREFIX)
            && destination.ends_with(NOTIFICATION_QUEUE_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_queue_format() {
        assert_eq!(
            user_notifications("maria.s"),
            "/user/maria.s/queue/notifications"
        );
    }

    #[test]
    fn ticket_destinations() {
        assert_eq!(ticket_status(42), "/topic/ticket/42");
        assert_eq!(ticket_chat(42), "/topic/chamado/42");
        assert_eq!(chat_send(42), "/app/chat.sendMessage/42");
        assert_eq!(chat_add_user(42), "/app/chat.addUser/42");
    }

    #[test]
    fn notification_classification() {
        assert!(is_notification(BROADCAST_NOTIFICATIONS));
        assert!(is_notification("/user/7/queue/notifications"));
        assert!(!is_notification("/topic/ticket/7"));
        assert!(!is_notification("/topic/chamado/7"));
        assert!(!is_notification("/user/7/queue/other"));
    }

    #[test]
    fn classification_is_case_sensitive() {
        assert!(!is_notification("/Topic/Notifications"));
    }
}
