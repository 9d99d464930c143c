pub mod storage;
pub mod types;

pub use storage::SessionLog;
pub use types::{Message, Role, GREETING_MESSAGE_ID};
