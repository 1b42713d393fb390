//! March arithmetic: travel time on the wrapping world map.
//!
//! A battle's `occurred_at` is departure plus march duration; the
//! slowest unit in the force sets the pace.

use crate::battle::Timestamp;
use crate::catalog::UnitCatalog;
use crate::error::EngineError;
use crate::fixed::Fixed;
use crate::force::Force;
use serde::{Deserialize, Serialize};

const SECONDS_PER_HOUR: i64 = 3_600;

/// Map coordinates. Both axes wrap at the world size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }
}

/// Euclidean distance with wraparound on both axes, in map fields.
pub fn distance(a: Position, b: Position, map_size: u32) -> Fixed {
    let dx = wrapped_delta(a.x, b.x, map_size);
    let dy = wrapped_delta(a.y, b.y, map_size);
    Fixed::from_int(dx * dx + dy * dy).sqrt()
}

fn wrapped_delta(a: i32, b: i32, map_size: u32) -> i64 {
    let direct = (a as i64 - b as i64).abs();
    if map_size == 0 {
        return direct;
    }
    let size = map_size as i64;
    let direct = direct % size;
    direct.min(size - direct)
}

/// March duration in whole seconds, rounded down.
///
/// The force moves at its slowest unit's speed (fields per hour),
/// scaled by the server speed multiplier.
pub fn march_duration(
    force: &Force,
    catalog: &UnitCatalog,
    from: Position,
    to: Position,
    map_size: u32,
    server_speed: Fixed,
) -> Result<u64, EngineError> {
    if force.is_empty() {
        return Err(EngineError::EmptyMarch);
    }
    if server_speed <= Fixed::ZERO {
        return Err(EngineError::InvalidConfig(
            "server_speed must be positive".to_string(),
        ));
    }

    let mut slowest: Option<u32> = None;
    for (unit, count) in force.units() {
        if count == 0 {
            continue;
        }
        let stats = catalog
            .stats(unit)
            .ok_or_else(|| EngineError::UnknownUnit(unit.to_string()))?;
        slowest = Some(match slowest {
            Some(speed) => speed.min(stats.speed),
            None => stats.speed,
        });
    }
    // is_empty() returned false, so at least one unit had a count
    let slowest = slowest.ok_or(EngineError::EmptyMarch)?;

    let fields = distance(from, to, map_size);
    let pace = Fixed::from_int(slowest as i64) * server_speed;
    let seconds = fields * Fixed::from_int(SECONDS_PER_HOUR) / pace;
    Ok(seconds.to_int() as u64)
}

/// When a force departing at `departure` reaches its target.
pub fn arrival(departure: Timestamp, duration_secs: u64) -> Timestamp {
    departure.plus_seconds(duration_secs)
}
