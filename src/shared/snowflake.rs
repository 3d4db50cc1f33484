//! Snowflake ID Generator
//!
//! Twitter-style unique 64-bit IDs: 41 bits of milliseconds since a custom
//! epoch, 5 bits machine, 5 bits node, 12 bits sequence.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Default epoch (2020-01-01T00:00:00.000Z)
pub const DEFAULT_EPOCH: u64 = 1_577_836_800_000;

/// Snowflake ID generator
pub struct SnowflakeGenerator {
    epoch: u64,
    machine_id: u64,
    node_id: u64,
    state: Mutex<(u64, u64)>, // (last_timestamp, sequence)
}

impl SnowflakeGenerator {
    /// Create a new snowflake generator using the default epoch
    pub fn new(machine_id: u64, node_id: u64) -> Self {
        Self::with_epoch(DEFAULT_EPOCH, machine_id, node_id)
    }

    /// Create a generator with a custom epoch
    pub fn with_epoch(epoch: u64, machine_id: u64, node_id: u64) -> Self {
        Self {
            epoch,
            machine_id: machine_id & 0x1F, // 5 bits
            node_id: node_id & 0x1F,       // 5 bits
            state: Mutex::new((0, 0)),
        }
    }

    /// Generate a new snowflake ID
    pub fn generate(&self) -> i64 {
        let mut state = self.state.lock();
        let mut timestamp = current_timestamp().max(state.0);

        if timestamp == state.0 {
            state.1 = (state.1 + 1) & 0xFFF;
            if state.1 == 0 {
                // Sequence exhausted for this millisecond; borrow the next one.
                timestamp += 1;
            }
        } else {
            state.1 = 0;
        }
        state.0 = timestamp;

        let id = ((timestamp.saturating_sub(self.epoch)) << 22)
            | (self.machine_id << 17)
            | (self.node_id << 12)
            | state.1;

        id as i64
    }

    /// Extract the creation timestamp (ms since Unix epoch) from an ID
    pub fn extract_timestamp(&self, snowflake: i64) -> u64 {
        ((snowflake as u64) >> 22) + self.epoch
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Parse snowflake from string
pub fn from_string(s: &str) -> Result<i64, std::num::ParseIntError> {
    s.parse()
}
