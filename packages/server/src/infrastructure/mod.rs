//! Infrastructure layer: wire DTOs, the in-memory room registry and the
//! channel-backed message pusher.

pub mod dto;
pub mod message_pusher;
pub mod repository;
