pub mod api;
pub mod outbox;
pub mod sort;
pub mod sync;

pub use api::{BoardClient, ClientError};
pub use outbox::{Outbox, OutboundMessage, OutboundState};
pub use sort::{SortDirection, SortKey, SortSpec, sort_orders};
pub use sync::{SyncHandle, run_sync_loop};
