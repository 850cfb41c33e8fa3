//! Utilities shared by the Yoriai server and replica packages.

pub mod logger;
pub mod time;
