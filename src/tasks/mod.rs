//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the proxy serves.
//!
//! # Tasks
//! - Expiry Purge: Physically removes expired ranges at configured intervals

mod purge;

pub use purge::spawn_purge_task;
