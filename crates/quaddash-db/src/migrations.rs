use rusqlite::Connection;
use tracing::info;

use crate::StoreError;

pub fn run(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS orders (
            id              TEXT PRIMARY KEY,
            requester_email TEXT NOT NULL,
            amount          REAL NOT NULL,
            dining_hall     TEXT NOT NULL,
            dorm            TEXT NOT NULL,
            details         TEXT,
            delivery_window TEXT NOT NULL DEFAULT 'ASAP',
            status          TEXT NOT NULL DEFAULT 'open',
            deliverer_email TEXT,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_orders_status
            ON orders(status);

        -- order_id is deliberately not a foreign key: cancelling hard-deletes
        -- the order row while the chat keeps its snapshot.
        CREATE TABLE IF NOT EXISTS chats (
            id              TEXT PRIMARY KEY,
            order_id        TEXT NOT NULL,
            requester_email TEXT NOT NULL,
            deliverer_email TEXT NOT NULL,
            order_amount    REAL NOT NULL,
            dining_hall     TEXT NOT NULL,
            dorm            TEXT NOT NULL,
            status          TEXT NOT NULL DEFAULT 'active',
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chats_requester
            ON chats(requester_email);
        CREATE INDEX IF NOT EXISTS idx_chats_deliverer
            ON chats(deliverer_email);

        CREATE TABLE IF NOT EXISTS messages (
            id           TEXT PRIMARY KEY,
            chat_id      TEXT NOT NULL REFERENCES chats(id),
            sender_email TEXT NOT NULL,
            content      TEXT NOT NULL,
            created_at   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_chat
            ON messages(chat_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
