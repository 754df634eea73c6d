pub mod api;
pub mod locations;
pub mod models;

pub use locations::{DeliveryWindow, DiningHall, Dorm};
pub use models::{ChatChannel, ChatStatus, Message, Order, OrderStatus};
