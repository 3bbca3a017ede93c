//! Device protocol engine for serial-bridged toy robots.
//!
//! botlink reassembles and validates checksummed frames from a streaming
//! transport, decodes their multiplexed content records into a device-state
//! snapshot, and sends command and polling frames on a fixed, rate-limited
//! schedule with stale-link detection.
//!
//! # Crate Structure
//!
//! - [`transport`]: link trait, delivery envelopes, serial bridge sockets
//! - [`frame`]: frame codec, byte ring and resynchronizing parser
//! - [`content`]: content records, commands, device state
//! - [`engine`]: scheduler, rate limiter, watchdog, command API

/// Re-export transport types.
pub mod transport {
    pub use botlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use botlink_frame::*;
}

/// Re-export content types.
pub mod content {
    pub use botlink_content::*;
}

/// Re-export engine types.
pub mod engine {
    pub use botlink_engine::*;
}
