//! Gameplay Plausibility Rules
//!
//! Checks that do not depend on hashes at all: a chain can be perfectly
//! hash-valid and still describe gameplay that cannot happen.
//!
//! - Timestamps never go backwards.
//! - A player never moves faster than the configured maximum speed.

use std::collections::BTreeMap;

use crate::core::event::{GameEvent, Position};
use crate::proof::verify::{VerificationError, VerificationResult};

/// Anti-cheat rule set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GameRules {
    /// Maximum speed in units per millisecond.
    pub max_player_speed: f64,
}

impl GameRules {
    /// Rules with the given speed limit.
    pub fn new(max_player_speed: f64) -> Self {
        Self { max_player_speed }
    }

    /// Walk `events` in order and report the first violation.
    pub fn validate(&self, events: &[GameEvent]) -> VerificationResult {
        let mut last_timestamp = 0u64;
        // Last movement sample per player.
        let mut last_moves: BTreeMap<&str, (Position, u64)> = BTreeMap::new();

        for (i, event) in events.iter().enumerate() {
            let timestamp = event.timestamp();

            if timestamp < last_timestamp {
                return VerificationResult::failed(VerificationError::TimestampRegression {
                    event: i,
                    previous: last_timestamp,
                    found: timestamp,
                })
                .at(i);
            }
            last_timestamp = timestamp;

            let Some(position) = event.move_position() else {
                continue;
            };

            if let Some((last_position, last_time)) = last_moves.get(event.player_id()) {
                let speed = movement_speed(last_position, position, timestamp.saturating_sub(*last_time));

                if speed.is_nan() || speed > self.max_player_speed {
                    return VerificationResult::failed(VerificationError::SpeedViolation {
                        event: i,
                        speed,
                        max: self.max_player_speed,
                    })
                    .at(i);
                }
            }

            last_moves.insert(event.player_id(), (position, timestamp));
        }

        VerificationResult::passed("All game rules validated successfully.", 0, events.len())
    }
}

/// Units per millisecond between two samples.
///
/// Any displacement in zero time is infinitely fast; standing still is not.
fn movement_speed(from: &Position, to: Position, elapsed_ms: u64) -> f64 {
    let distance = from.distance(&to);
    if elapsed_ms == 0 {
        return if distance == 0.0 { 0.0 } else { f64::INFINITY };
    }
    distance / elapsed_ms as f64
}
