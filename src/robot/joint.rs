//! Channel roles and display helpers.
//!
//! Defines the [`Joint`] enum naming each actuator slot of the robot and the
//! [`Side`] sign convention the gait sequencer uses to steer.
use core::fmt::Display;

/// The three actuators: two legs sweeping horizontally and the body tilt that
/// lifts one side at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joint {
    LeftLeg = 0,
    RightLeg = 1,
    Tilt = 2,
}

impl Display for Joint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Joint::LeftLeg => f.write_str("left leg"),
            Joint::RightLeg => f.write_str("right leg"),
            Joint::Tilt => f.write_str("tilt"),
        }
    }
}

impl From<usize> for Joint {
    fn from(value: usize) -> Self {
        match value {
            0 => Joint::LeftLeg,
            1 => Joint::RightLeg,
            _ => Joint::Tilt,
        }
    }
}

/// Which way a channel is scaled when the robot steers.
///
/// A negative direction (left turn) scales `Left` channels by `-|direction|`,
/// a positive one scales `Right` channels; `Center` channels never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Center,
}

impl Side {
    /// Factor applied to a target angle for the given steering direction.
    pub fn steer(self, direction: f32) -> f32 {
        match self {
            Side::Left if direction < 0.0 => direction,
            Side::Right if direction > 0.0 => -direction,
            _ => 1.0,
        }
    }

    /// Legs run backwards when reversing; the tilt keeps its rhythm.
    pub fn reverse(self, reverse: bool) -> f32 {
        match self {
            Side::Left | Side::Right if reverse => -1.0,
            _ => 1.0,
        }
    }
}
