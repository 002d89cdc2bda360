//! Collision events from the simulator log.
//!
//! The simulator detects collisions itself and reports each one on a line
//! such as
//!
//! ```text
//! Collision detected: Vehicles 3 and 7 near corridor @ t = 12.5s
//! ```
//!
//! This module only structures those lines; it never infers a collision
//! that was not logged.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::EvalError;

/// Lines starting with this token are collision records.
pub const COLLISION_PREFIX: &str = "Collision";

static COLLISION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Vehicles (\d+) and (\d+)\b.*@ t = ([\d.]+)s").expect("Invalid regex pattern")
});

/// A logged collision between two vehicles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    /// First vehicle index
    pub agent_a: usize,
    /// Second vehicle index
    pub agent_b: usize,
    /// Simulated time in seconds
    pub time: f64,
}

impl CollisionEvent {
    /// Whether `agent` took part in this collision.
    #[must_use]
    pub fn involves(&self, agent: usize) -> bool {
        self.agent_a == agent || self.agent_b == agent
    }
}

/// Parse one collision line (already known to start with [`COLLISION_PREFIX`]).
fn parse_record(line: &str) -> Result<CollisionEvent, String> {
    let caps = COLLISION_PATTERN
        .captures(line)
        .ok_or_else(|| "expected `Vehicles <a> and <b> ... @ t = <time>s`".to_string())?;
    let index = |i: usize| {
        caps[i]
            .parse::<usize>()
            .map_err(|e| format!("vehicle index `{}`: {e}", &caps[i]))
    };
    let time = caps[3]
        .parse::<f64>()
        .map_err(|e| format!("time `{}`: {e}", &caps[3]))?;
    Ok(CollisionEvent {
        agent_a: index(1)?,
        agent_b: index(2)?,
        time,
    })
}

/// Extract collision events in log order.
///
/// Duplicated lines yield duplicated events.
///
/// # Errors
///
/// Returns [`EvalError::LogParse`] for the first `Collision` line that does
/// not match the expected pattern.
pub fn parse_collision_log(text: &str) -> Result<Vec<CollisionEvent>, EvalError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| line.starts_with(COLLISION_PREFIX))
        .map(|(line_no, line)| {
            parse_record(line).map_err(|message| EvalError::LogParse {
                line: line_no + 1,
                text: line.to_string(),
                message,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_detected_line() {
        let events =
            parse_collision_log("Collision detected: Vehicles 3 and 7 near corridor @ t = 12.5s").unwrap();
        assert_eq!(
            events,
            vec![CollisionEvent {
                agent_a: 3,
                agent_b: 7,
                time: 12.5
            }]
        );
    }

    #[test]
    fn test_ignores_other_lines_and_keeps_order() {
        let log = "\
Solving multi-robot motion planning problem...
Collision detected: Vehicles 0 and 1 at distance 0.12 @ t = 3.21s
  Collision in indented text is not a record
Collision detected: Vehicles 4 and 2 @ t = 7s
Collision detected: Vehicles 0 and 1 at distance 0.12 @ t = 3.21s
Done.";
        let events = parse_collision_log(log).unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!((events[0].agent_a, events[0].agent_b), (0, 1));
        assert_eq!((events[1].agent_a, events[1].agent_b, events[1].time), (4, 2, 7.0));
        assert_eq!(events[2], events[0]);
    }

    #[test]
    fn test_malformed_collision_line_is_an_error() {
        let err = parse_collision_log("ok\nCollision nonsense").unwrap_err();
        match err {
            EvalError::LogParse { line, text, .. } => {
                assert_eq!(line, 2);
                assert_eq!(text, "Collision nonsense");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_time_is_an_error() {
        assert!(parse_collision_log("Collision: Vehicles 1 and 2 x @ t = 1.2.3s").is_err());
    }

    #[test]
    fn test_involves() {
        let event = CollisionEvent {
            agent_a: 1,
            agent_b: 4,
            time: 0.0,
        };
        assert!(event.involves(4));
        assert!(!event.involves(2));
    }
}
