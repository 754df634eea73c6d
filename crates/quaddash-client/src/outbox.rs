//! Optimistic sends as an explicit state machine.
//!
//! A message appended locally is Pending until the write is acknowledged,
//! then Confirmed until the polled server list contains it, at which point
//! the local copy is dropped. A failed write becomes Failed with explicit
//! retry/discard actions instead of leaving a dangling optimistic entry.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use quaddash_types::models::Message;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundState {
    Pending,
    Confirmed { server_id: Uuid },
    Failed,
}

#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub local_id: Uuid,
    pub chat_id: Uuid,
    pub content: String,
    pub state: OutboundState,
    pub queued_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct Outbox {
    entries: Vec<OutboundMessage>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an optimistic entry; returns its temporary local id.
    pub fn push(&mut self, chat_id: Uuid, content: &str) -> Uuid {
        let local_id = Uuid::new_v4();
        self.entries.push(OutboundMessage {
            local_id,
            chat_id,
            content: content.to_string(),
            state: OutboundState::Pending,
            queued_at: Utc::now(),
        });
        local_id
    }

    pub fn confirm(&mut self, local_id: Uuid, server_id: Uuid) {
        if let Some(entry) = self.find_mut(local_id) {
            entry.state = OutboundState::Confirmed { server_id };
        }
    }

    pub fn fail(&mut self, local_id: Uuid) {
        if let Some(entry) = self.find_mut(local_id) {
            entry.state = OutboundState::Failed;
        }
    }

    /// Re-arm a failed entry for another send attempt. Returns a snapshot of
    /// the entry to resend, or None if it was not in the Failed state.
    pub fn retry(&mut self, local_id: Uuid) -> Option<OutboundMessage> {
        let entry = self.find_mut(local_id)?;
        if entry.state != OutboundState::Failed {
            return None;
        }
        entry.state = OutboundState::Pending;
        Some(entry.clone())
    }

    /// Drop a failed entry. Pending and confirmed entries cannot be
    /// discarded; they resolve through ack or reconcile.
    pub fn discard(&mut self, local_id: Uuid) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.local_id == local_id && e.state == OutboundState::Failed));
        self.entries.len() != before
    }

    /// Drop confirmed entries that the polled server list now contains.
    pub fn reconcile(&mut self, chat_id: Uuid, server_messages: &[Message]) {
        self.entries.retain(|e| {
            if e.chat_id != chat_id {
                return true;
            }
            match e.state {
                OutboundState::Confirmed { server_id } => {
                    !server_messages.iter().any(|m| m.id == server_id)
                }
                _ => true,
            }
        });
    }

    /// Entries still displayed alongside the server list for a chat.
    pub fn for_chat(&self, chat_id: Uuid) -> impl Iterator<Item = &OutboundMessage> {
        self.entries.iter().filter(move |e| e.chat_id == chat_id)
    }

    pub fn get(&self, local_id: Uuid) -> Option<&OutboundMessage> {
        self.entries.iter().find(|e| e.local_id == local_id)
    }

    fn find_mut(&mut self, local_id: Uuid) -> Option<&mut OutboundMessage> {
        self.entries.iter_mut().find(|e| e.local_id == local_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_message(chat_id: Uuid, id: Uuid) -> Message {
        Message {
            id,
            chat_id,
            sender_email: "alice@upenn.edu".to_string(),
            content: "on my way".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn ack_then_poll_drops_the_local_copy() {
        let chat_id = Uuid::new_v4();
        let mut outbox = Outbox::new();

        let local = outbox.push(chat_id, "on my way");
        assert_eq!(outbox.get(local).unwrap().state, OutboundState::Pending);

        let server_id = Uuid::new_v4();
        outbox.confirm(local, server_id);

        // Not yet observed in a poll: still displayed locally
        outbox.reconcile(chat_id, &[]);
        assert!(outbox.get(local).is_some());

        outbox.reconcile(chat_id, &[server_message(chat_id, server_id)]);
        assert!(outbox.get(local).is_none());
    }

    #[test]
    fn failed_write_supports_retry() {
        let chat_id = Uuid::new_v4();
        let mut outbox = Outbox::new();

        let local = outbox.push(chat_id, "hello");
        outbox.fail(local);
        assert_eq!(outbox.get(local).unwrap().state, OutboundState::Failed);

        let snapshot = outbox.retry(local).unwrap();
        assert_eq!(snapshot.content, "hello");
        assert_eq!(outbox.get(local).unwrap().state, OutboundState::Pending);

        // Retrying a pending entry is a no-op
        assert!(outbox.retry(local).is_none());
    }

    #[test]
    fn failed_write_supports_discard() {
        let chat_id = Uuid::new_v4();
        let mut outbox = Outbox::new();

        let local = outbox.push(chat_id, "hello");
        assert!(!outbox.discard(local)); // pending entries stay

        outbox.fail(local);
        assert!(outbox.discard(local));
        assert!(outbox.get(local).is_none());
    }

    #[test]
    fn reconcile_only_touches_its_chat() {
        let chat_a = Uuid::new_v4();
        let chat_b = Uuid::new_v4();
        let mut outbox = Outbox::new();

        let local_a = outbox.push(chat_a, "a");
        let server_id = Uuid::new_v4();
        outbox.confirm(local_a, server_id);
        let local_b = outbox.push(chat_b, "b");
        outbox.confirm(local_b, server_id);

        outbox.reconcile(chat_a, &[server_message(chat_a, server_id)]);
        assert!(outbox.get(local_a).is_none());
        assert!(outbox.get(local_b).is_some());
    }
}
