//! Snowflake ID Generator
//!
//! Twitter-style distributed unique ID generation for chat messages.
//!
//! Layout (63 bits): 41 bits of milliseconds since the configured epoch,
//! 10 bits of machine id, 12 bits of per-millisecond sequence. Two relay
//! instances never collide as long as they run with distinct machine ids.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Default epoch (2015-01-01T00:00:00.000Z)
pub const DEFAULT_EPOCH: u64 = 1420070400000;

const MACHINE_ID_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const MAX_MACHINE_ID: u64 = (1 << MACHINE_ID_BITS) - 1;
const MAX_SEQUENCE: u64 = (1 << SEQUENCE_BITS) - 1;

/// Source of message identifiers.
///
/// Called synchronously once per inbound message. Implementations must
/// return values unique across the whole deployment.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

#[derive(Debug)]
struct State {
    last_timestamp: u64,
    sequence: u64,
}

/// Snowflake ID generator
#[derive(Debug)]
pub struct SnowflakeGenerator {
    machine_id: u64,
    epoch: u64,
    state: Mutex<State>,
}

impl SnowflakeGenerator {
    /// Create a new snowflake generator
    pub fn new(machine_id: u64, epoch: u64) -> Self {
        Self {
            machine_id: machine_id & MAX_MACHINE_ID,
            epoch,
            state: Mutex::new(State {
                last_timestamp: 0,
                sequence: 0,
            }),
        }
    }

    /// Generate a new snowflake ID
    pub fn generate(&self) -> i64 {
        let mut state = self.state.lock();

        // A clock stepping backwards keeps issuing from the last seen millisecond.
        let mut timestamp = current_timestamp().max(state.last_timestamp);

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & MAX_SEQUENCE;
            if state.sequence == 0 {
                // Sequence exhausted for this millisecond.
                while timestamp <= state.last_timestamp {
                    std::hint::spin_loop();
                    timestamp = current_timestamp();
                }
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = timestamp;

        let id = (timestamp.saturating_sub(self.epoch) << (MACHINE_ID_BITS + SEQUENCE_BITS))
            | (self.machine_id << SEQUENCE_BITS)
            | state.sequence;

        id as i64
    }

    /// Epoch this generator counts from
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl IdGenerator for SnowflakeGenerator {
    fn next_id(&self) -> String {
        self.generate().to_string()
    }
}

/// Get current timestamp in milliseconds
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Extract timestamp from snowflake ID
pub fn extract_timestamp(snowflake: i64, epoch: u64) -> u64 {
    ((snowflake as u64) >> (MACHINE_ID_BITS + SEQUENCE_BITS)) + epoch
}

/// Extract the machine id a snowflake was issued by
pub fn extract_machine_id(snowflake: i64) -> u64 {
    ((snowflake as u64) >> SEQUENCE_BITS) & MAX_MACHINE_ID
}
