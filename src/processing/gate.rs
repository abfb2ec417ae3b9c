// src/processing/gate.rs
//! Threshold gate that turns metric excursions into directional events

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Direction of a metric excursion relative to baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event handed to the actuation collaborator
///
/// Serializes as `{"direction": "UP", "durationMillis": 5000}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Event {
    pub direction: Direction,
    #[serde(rename = "durationMillis")]
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    /// An event was emitted and is waiting out the cooldown before dispatch
    CoolingDown(Event),
}

/// `IDLE -> COOLING_DOWN -> IDLE` event gate
///
/// [`EventGate::evaluate`] only fires from `Idle`. The caller owns the
/// cooldown delay and the dispatch, then calls [`EventGate::complete`]
/// whatever the dispatch outcome was.
#[derive(Debug, Clone)]
pub struct EventGate {
    state: GateState,
    bounds_width: f32,
    cooldown: Duration,
    duration_ms: u64,
    emitted: u64,
}

impl EventGate {
    pub fn new(bounds_width: f32, cooldown: Duration, duration_ms: u64) -> Self {
        Self {
            state: GateState::Idle,
            bounds_width,
            cooldown,
            duration_ms,
            emitted: 0,
        }
    }

    pub fn from_config(config: &crate::config::EventConfig) -> Self {
        Self::new(
            config.bounds_width,
            Duration::from_secs_f32(config.cooldown_s.max(0.0)),
            config.duration_ms,
        )
    }

    /// `(lower, upper)` around `baseline`
    pub fn bounds(&self, baseline: f32) -> (f32, f32) {
        (baseline - self.bounds_width, baseline + self.bounds_width)
    }

    /// Compare `metric` with the band around `baseline`
    ///
    /// Returns the emitted event on a crossing. Always `None` while cooling down.
    pub fn evaluate(&mut self, metric: f32, baseline: f32) -> Option<Event> {
        if let GateState::CoolingDown(_) = self.state {
            return None;
        }

        let (lower, upper) = self.bounds(baseline);
        let direction = if metric > upper {
            Direction::Up
        } else if metric < lower {
            Direction::Down
        } else {
            return None;
        };

        let event = Event { direction, duration_ms: self.duration_ms };
        self.state = GateState::CoolingDown(event);
        self.emitted += 1;
        Some(event)
    }

    /// Return to `Idle` after the pending event was dispatched or dropped
    pub fn complete(&mut self) -> Option<Event> {
        match std::mem::replace(&mut self.state, GateState::Idle) {
            GateState::CoolingDown(event) => Some(event),
            GateState::Idle => None,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_cooling_down(&self) -> bool {
        matches!(self.state, GateState::CoolingDown(_))
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}
