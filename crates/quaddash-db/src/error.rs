use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("order not found")]
    OrderNotFound,

    #[error("order already claimed")]
    AlreadyClaimed,

    #[error("you cannot claim your own order")]
    SelfClaim,

    #[error("only the requester may cancel an order")]
    NotOwner,

    #[error("chat not found")]
    ChatNotFound,

    #[error("sender is not a participant of this chat")]
    NotParticipant,

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database lock poisoned")]
    LockPoisoned,
}
