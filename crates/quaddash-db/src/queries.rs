use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use quaddash_types::models::{ChatChannel, ChatStatus, Message, Order, OrderStatus};

use crate::models::{ChatRow, MessageRow, OrderRow};
use crate::{Database, StoreError};

impl Database {
    // -- Orders --

    pub fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO orders (id, requester_email, amount, dining_hall, dorm, details,
                                     delivery_window, status, deliverer_email, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    order.id.to_string(),
                    order.requester_email,
                    order.amount,
                    order.dining_hall.as_str(),
                    order.dorm.as_str(),
                    order.details,
                    order.delivery_window.as_str(),
                    order.status.as_str(),
                    order.deliverer_email,
                    order.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    /// All non-deleted orders regardless of status; callers filter.
    pub fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt
                .query_map([], order_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(Order::try_from).collect()
        })
    }

    pub fn get_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        self.with_conn(|conn| query_order(conn, id)?.map(Order::try_from).transpose())
    }

    /// Hard-delete an order. Only the requester may cancel; cancelling a
    /// claimed order is permitted and pulls it out from under the deliverer.
    pub fn cancel_order(&self, id: Uuid, caller: &str) -> Result<(), StoreError> {
        self.with_conn_mut(|conn| {
            let requester: Option<String> = conn
                .query_row(
                    "SELECT requester_email FROM orders WHERE id = ?1",
                    [id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;

            match requester {
                None => Err(StoreError::OrderNotFound),
                Some(owner) if owner != caller => Err(StoreError::NotOwner),
                Some(_) => {
                    conn.execute("DELETE FROM orders WHERE id = ?1", [id.to_string()])?;
                    Ok(())
                }
            }
        })
    }

    /// Claim an open order and open its chat channel in one transaction.
    ///
    /// A second claim on an already-claimed order is rejected deterministically
    /// rather than overwriting the first deliverer.
    pub fn claim_order(
        &self,
        id: Uuid,
        caller: &str,
        now: DateTime<Utc>,
    ) -> Result<(Order, ChatChannel), StoreError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let row = query_order(&tx, id)?.ok_or(StoreError::OrderNotFound)?;
            if row.requester_email == caller {
                return Err(StoreError::SelfClaim);
            }
            if row.status != OrderStatus::Open.as_str() {
                return Err(StoreError::AlreadyClaimed);
            }

            let changed = tx.execute(
                "UPDATE orders SET status = 'claimed', deliverer_email = ?1
                 WHERE id = ?2 AND status = 'open'",
                rusqlite::params![caller, id.to_string()],
            )?;
            if changed == 0 {
                return Err(StoreError::AlreadyClaimed);
            }

            let order = Order::try_from(OrderRow {
                status: OrderStatus::Claimed.as_str().to_string(),
                deliverer_email: Some(caller.to_string()),
                ..row
            })?;

            // Chat snapshot of the order at claim time
            let chat = ChatChannel {
                id: Uuid::new_v4(),
                order_id: order.id,
                requester_email: order.requester_email.clone(),
                deliverer_email: caller.to_string(),
                order_amount: order.amount,
                dining_hall: order.dining_hall,
                dorm: order.dorm,
                status: ChatStatus::Active,
                created_at: now,
            };
            tx.execute(
                "INSERT INTO chats (id, order_id, requester_email, deliverer_email,
                                    order_amount, dining_hall, dorm, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    chat.id.to_string(),
                    chat.order_id.to_string(),
                    chat.requester_email,
                    chat.deliverer_email,
                    chat.order_amount,
                    chat.dining_hall.as_str(),
                    chat.dorm.as_str(),
                    chat.status.as_str(),
                    chat.created_at.to_rfc3339(),
                ],
            )?;

            tx.commit()?;
            Ok((order, chat))
        })
    }

    // -- Chats --

    pub fn get_chat(&self, id: Uuid) -> Result<Option<ChatChannel>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = ?1"))?;
            let row = stmt.query_row([id.to_string()], chat_row).optional()?;
            row.map(ChatChannel::try_from).transpose()
        })
    }

    /// Channels where `email` is either participant, newest first.
    pub fn chats_for_user(&self, email: &str) -> Result<Vec<ChatChannel>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CHAT_COLUMNS} FROM chats
                 WHERE requester_email = ?1 OR deliverer_email = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt
                .query_map([email], chat_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(ChatChannel::try_from).collect()
        })
    }

    // -- Messages --

    /// Append a message. The sender must be one of the chat's two
    /// participants; non-participants are rejected here, not at the edge.
    pub fn insert_message(
        &self,
        chat_id: Uuid,
        sender_email: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Message, StoreError> {
        self.with_conn_mut(|conn| {
            let participants: Option<(String, String)> = conn
                .query_row(
                    "SELECT requester_email, deliverer_email FROM chats WHERE id = ?1",
                    [chat_id.to_string()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let (requester, deliverer) = participants.ok_or(StoreError::ChatNotFound)?;
            if sender_email != requester && sender_email != deliverer {
                return Err(StoreError::NotParticipant);
            }

            let message = Message {
                id: Uuid::new_v4(),
                chat_id,
                sender_email: sender_email.to_string(),
                content: content.to_string(),
                created_at: now,
            };
            conn.execute(
                "INSERT INTO messages (id, chat_id, sender_email, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    message.id.to_string(),
                    message.chat_id.to_string(),
                    message.sender_email,
                    message.content,
                    message.created_at.to_rfc3339(),
                ],
            )?;
            Ok(message)
        })
    }

    /// Ascending by created_at; insertion order breaks ties.
    pub fn messages_for_chat(&self, chat_id: Uuid) -> Result<Vec<Message>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, chat_id, sender_email, content, created_at FROM messages
                 WHERE chat_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt
                .query_map([chat_id.to_string()], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        chat_id: row.get(1)?,
                        sender_email: row.get(2)?,
                        content: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(Message::try_from).collect()
        })
    }
}

const ORDER_COLUMNS: &str = "id, requester_email, amount, dining_hall, dorm, details, \
                             delivery_window, status, deliverer_email, created_at";

const CHAT_COLUMNS: &str = "id, order_id, requester_email, deliverer_email, order_amount, \
                            dining_hall, dorm, status, created_at";

fn order_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<OrderRow> {
    Ok(OrderRow {
        id: row.get(0)?,
        requester_email: row.get(1)?,
        amount: row.get(2)?,
        dining_hall: row.get(3)?,
        dorm: row.get(4)?,
        details: row.get(5)?,
        delivery_window: row.get(6)?,
        status: row.get(7)?,
        deliverer_email: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn chat_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatRow> {
    Ok(ChatRow {
        id: row.get(0)?,
        order_id: row.get(1)?,
        requester_email: row.get(2)?,
        deliverer_email: row.get(3)?,
        order_amount: row.get(4)?,
        dining_hall: row.get(5)?,
        dorm: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn query_order(conn: &Connection, id: Uuid) -> Result<Option<OrderRow>, StoreError> {
    let mut stmt = conn.prepare(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"))?;
    let row = stmt.query_row([id.to_string()], order_row).optional()?;
    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, StoreError>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, StoreError> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
