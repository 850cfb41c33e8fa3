//! Data Transfer Objects (DTOs) for the room protocol.
//!
//! DTOs are organized by protocol:
//! - `websocket`: WebSocket frame DTOs (client → server and server → client)
//! - `conversion`: conversions between DTOs and domain entities

pub mod conversion;
pub mod websocket;
