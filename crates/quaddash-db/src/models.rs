//! Database row types — these map directly to SQLite rows.
//! Distinct from the quaddash-types models to keep the DB layer's
//! string-typed columns in one place.

use chrono::{DateTime, Utc};

use quaddash_types::models::{ChatChannel, ChatStatus, Message, Order, OrderStatus};

use crate::StoreError;

pub struct OrderRow {
    pub id: String,
    pub requester_email: String,
    pub amount: f64,
    pub dining_hall: String,
    pub dorm: String,
    pub details: Option<String>,
    pub delivery_window: String,
    pub status: String,
    pub deliverer_email: Option<String>,
    pub created_at: String,
}

pub struct ChatRow {
    pub id: String,
    pub order_id: String,
    pub requester_email: String,
    pub deliverer_email: String,
    pub order_amount: f64,
    pub dining_hall: String,
    pub dorm: String,
    pub status: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub chat_id: String,
    pub sender_email: String,
    pub content: String,
    pub created_at: String,
}

/// Timestamps are written as RFC 3339; older rows created through SQLite's
/// datetime('now') default come back as "YYYY-MM-DD HH:MM:SS".
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp '{}': {}", raw, e)))
}

fn corrupt<E: std::fmt::Display>(field: &str, value: &str) -> impl FnOnce(E) -> StoreError {
    let field = field.to_string();
    let value = value.to_string();
    move |e| StoreError::Corrupt(format!("bad {} '{}': {}", field, value, e))
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, StoreError> {
        Ok(Order {
            id: row.id.parse().map_err(corrupt("order id", &row.id))?,
            requester_email: row.requester_email,
            amount: row.amount,
            dining_hall: row
                .dining_hall
                .parse()
                .map_err(corrupt("dining_hall", &row.dining_hall))?,
            dorm: row.dorm.parse().map_err(corrupt("dorm", &row.dorm))?,
            details: row.details,
            delivery_window: row
                .delivery_window
                .parse()
                .map_err(corrupt("delivery_window", &row.delivery_window))?,
            status: row.status.parse::<OrderStatus>().map_err(corrupt("status", &row.status))?,
            deliverer_email: row.deliverer_email,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

impl TryFrom<ChatRow> for ChatChannel {
    type Error = StoreError;

    fn try_from(row: ChatRow) -> Result<Self, StoreError> {
        Ok(ChatChannel {
            id: row.id.parse().map_err(corrupt("chat id", &row.id))?,
            order_id: row.order_id.parse().map_err(corrupt("order_id", &row.order_id))?,
            requester_email: row.requester_email,
            deliverer_email: row.deliverer_email,
            order_amount: row.order_amount,
            dining_hall: row
                .dining_hall
                .parse()
                .map_err(corrupt("dining_hall", &row.dining_hall))?,
            dorm: row.dorm.parse().map_err(corrupt("dorm", &row.dorm))?,
            status: row.status.parse::<ChatStatus>().map_err(corrupt("status", &row.status))?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, StoreError> {
        Ok(Message {
            id: row.id.parse().map_err(corrupt("message id", &row.id))?,
            chat_id: row.chat_id.parse().map_err(corrupt("chat_id", &row.chat_id))?,
            sender_email: row.sender_email,
            content: row.content,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}
