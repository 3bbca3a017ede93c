use std::time::Duration;

use botlink_content::DEFAULT_MAX_CONTENT;
use botlink_frame::{ParserConfig, DEFAULT_CAPACITY, PRODUCT_TYPE, PROTOCOL_VERSION};

/// Engine tuning.
///
/// Build with struct update syntax over [`EngineConfig::default`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub product_type: u8,
    pub protocol_version: u8,
    /// Period of the outgoing tick.
    pub tick_interval: Duration,
    /// Window without a valid header before the link is reported stale.
    pub watchdog_timeout: Duration,
    /// Frames per second the rate limiter lets through.
    pub send_rate_max: u32,
    /// Pause after each command call.
    pub command_delay: Duration,
    /// Receive accumulator capacity in bytes.
    pub capacity: usize,
    /// Cap on queued outgoing content in bytes.
    pub max_outgoing: usize,
    /// Drop frames whose payload checksum does not match.
    pub verify_payload: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            product_type: PRODUCT_TYPE,
            protocol_version: PROTOCOL_VERSION,
            tick_interval: Duration::from_millis(40),
            watchdog_timeout: Duration::from_secs(3000),
            send_rate_max: 10,
            command_delay: Duration::from_millis(10),
            capacity: DEFAULT_CAPACITY,
            max_outgoing: DEFAULT_MAX_CONTENT,
            verify_payload: false,
        }
    }
}

impl EngineConfig {
    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            capacity: self.capacity,
            verify_payload: self.verify_payload,
        }
    }
}
