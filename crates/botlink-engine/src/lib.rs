//! Protocol engine for botlink devices.
//!
//! An [`Engine`] owns one device session over a [`Link`]:
//! - inbound deliveries are unwrapped, reassembled into frames and decoded
//!   into a [`DeviceState`] snapshot
//! - a tick task sends one frame per tick (rate limited), probing for the
//!   device until its first valid header and polling its sensors afterwards
//! - a watchdog publishes [`LinkEvent::Stale`] when no valid header arrives
//!   within the configured window
//!
//! Application commands are queued as content records and ride along with the
//! next outgoing frame.
//!
//! [`Link`]: botlink_transport::Link
//! [`DeviceState`]: botlink_content::DeviceState

pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod rate;
pub mod scheduler;

pub use commands::{DcSelect, ServoSelect};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use event::LinkEvent;
pub use rate::RateLimiter;
