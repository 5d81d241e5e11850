pub mod conversation;
pub mod manager;
pub mod types;

pub use conversation::{DECIDED_BY_CLOSE, DECIDED_BY_TIMEOUT, Session};
pub use manager::SessionManager;
pub use types::{ApprovalHandling, SessionInfo, SessionSettings};
