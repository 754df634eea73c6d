pub mod gate;
pub mod kv;
pub mod mailer;
pub mod session;

pub use gate::{GateConfig, GateError, VerificationGate};
pub use kv::{KeyValue, MemoryKv};
pub use mailer::{DevMailer, Mailer, SmtpMailer};
pub use session::{SessionError, SessionKeys};
