//! Polling sync loop: the only mechanism propagating a remote claim or a
//! remote participant's message to this client. End-to-end notification
//! latency is therefore bounded by the poll period, not network RTT.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use quaddash_types::models::{ChatChannel, ChatStatus, Message, Order};

use crate::api::{BoardClient, ClientError};
use crate::outbox::Outbox;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Default)]
pub struct SyncState {
    pub orders: Vec<Order>,
    /// Active channels for the current user, newest first.
    pub chats: Vec<ChatChannel>,
    /// Full message list per chat currently open in the UI.
    pub messages: HashMap<Uuid, Vec<Message>>,
    pub outbox: Outbox,
}

/// Shared handle between the UI and the background loop.
#[derive(Clone, Default)]
pub struct SyncHandle {
    state: Arc<RwLock<SyncState>>,
    open_chats: Arc<RwLock<HashSet<Uuid>>>,
}

impl SyncHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn open_chat(&self, chat_id: Uuid) {
        self.open_chats.write().await.insert(chat_id);
    }

    pub async fn close_chat(&self, chat_id: Uuid) {
        self.open_chats.write().await.remove(&chat_id);
        self.state.write().await.messages.remove(&chat_id);
    }

    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, SyncState> {
        self.state.read().await
    }

    /// One full refresh: chat list, then the message list of every open
    /// chat, then outbox reconciliation.
    pub async fn refresh(&self, client: &BoardClient) -> Result<(), ClientError> {
        let orders = client.list_orders().await?;
        let chats: Vec<ChatChannel> = client
            .list_chats()
            .await?
            .into_iter()
            .filter(|c| c.status == ChatStatus::Active)
            .collect();

        let open: Vec<Uuid> = self.open_chats.read().await.iter().copied().collect();
        let mut fetched: HashMap<Uuid, Vec<Message>> = HashMap::new();
        for chat_id in open {
            fetched.insert(chat_id, client.list_messages(chat_id).await?);
        }

        let mut state = self.state.write().await;
        state.orders = orders;
        state.chats = chats;
        for (chat_id, messages) in fetched {
            state.outbox.reconcile(chat_id, &messages);
            state.messages.insert(chat_id, messages);
        }
        Ok(())
    }

    /// Optimistic send: the entry is visible locally before the write is
    /// acknowledged. On success the channel is re-fetched immediately rather
    /// than waiting out the poll period; on failure the entry is left in the
    /// Failed state for an explicit retry or discard.
    pub async fn send_message(
        &self,
        client: &BoardClient,
        chat_id: Uuid,
        content: &str,
    ) -> Result<Uuid, ClientError> {
        let local_id = self.state.write().await.outbox.push(chat_id, content);

        match client.send_message(chat_id, content).await {
            Ok(message) => {
                self.state.write().await.outbox.confirm(local_id, message.id);
                if let Ok(messages) = client.list_messages(chat_id).await {
                    let mut state = self.state.write().await;
                    state.outbox.reconcile(chat_id, &messages);
                    state.messages.insert(chat_id, messages);
                }
                Ok(local_id)
            }
            Err(e) => {
                self.state.write().await.outbox.fail(local_id);
                Err(e)
            }
        }
    }

    /// Re-send a previously failed message.
    pub async fn retry_message(
        &self,
        client: &BoardClient,
        local_id: Uuid,
    ) -> Result<(), ClientError> {
        let Some(entry) = self.state.write().await.outbox.retry(local_id) else {
            return Ok(());
        };

        match client.send_message(entry.chat_id, &entry.content).await {
            Ok(message) => {
                self.state.write().await.outbox.confirm(local_id, message.id);
                Ok(())
            }
            Err(e) => {
                self.state.write().await.outbox.fail(local_id);
                Err(e)
            }
        }
    }

    pub async fn discard_message(&self, local_id: Uuid) -> bool {
        self.state.write().await.outbox.discard(local_id)
    }
}

/// Fixed-period refresh driving the handle until the task is dropped.
/// Errors are logged and the next tick tries again; there is no retry or
/// backoff beyond the poll period itself.
pub async fn run_sync_loop(client: Arc<BoardClient>, handle: SyncHandle, period: Duration) {
    let mut interval = tokio::time::interval(period);

    loop {
        interval.tick().await;

        if let Err(e) = handle.refresh(&client).await {
            warn!("sync refresh failed: {}", e);
        }
    }
}
