pub mod auth;
pub mod chats;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod orders;
pub mod payments;
pub mod state;

pub use error::ApiError;
pub use state::{AppState, AppStateInner};
