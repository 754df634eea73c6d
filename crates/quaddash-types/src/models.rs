use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use thiserror::Error;

use crate::locations::{DeliveryWindow, DiningHall, Dorm};

#[derive(Debug, Clone, Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Claimed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::Claimed => "claimed",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(OrderStatus::Open),
            "claimed" => Ok(OrderStatus::Claimed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A delivery request posted to the board. `deliverer_email` is set exactly
/// when the order has been claimed; open -> claimed is one-directional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub requester_email: String,
    pub amount: f64,
    pub dining_hall: DiningHall,
    pub dorm: Dorm,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub delivery_window: DeliveryWindow,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deliverer_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    Active,
    Closed,
}

impl ChatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatStatus::Active => "active",
            ChatStatus::Closed => "closed",
        }
    }
}

impl FromStr for ChatStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ChatStatus::Active),
            "closed" => Ok(ChatStatus::Closed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Chat opened between requester and deliverer when an order is claimed.
/// The order fields are a snapshot taken at claim time, not a live link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChannel {
    pub id: Uuid,
    pub order_id: Uuid,
    pub requester_email: String,
    pub deliverer_email: String,
    pub order_amount: f64,
    pub dining_hall: DiningHall,
    pub dorm: Dorm,
    pub status: ChatStatus,
    pub created_at: DateTime<Utc>,
}

impl ChatChannel {
    pub fn includes(&self, email: &str) -> bool {
        self.requester_email == email || self.deliverer_email == email
    }

    /// The participant that is not `email`, for display purposes.
    pub fn counterparty(&self, email: &str) -> &str {
        if self.requester_email == email {
            &self.deliverer_email
        } else {
            &self.requester_email
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_email: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
