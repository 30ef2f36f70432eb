//! Session WebSocket

pub mod handler;
pub mod protocol;
