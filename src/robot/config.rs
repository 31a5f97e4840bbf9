use crate::motion::gait::{GaitStep, Next};
use crate::motion::trajectory::{ChannelTarget, Profile};
use crate::robot::joint::{Joint, Side};
use crate::robot::servo::Calibration;
use crate::robot::state::GaitState;

// SERVOS
pub const SERVO_COUNT: usize = 3;
pub const SERVO_FREQUENCY_HZ: u32 = 50;
pub const SERVO_LIMITS_US: (u16, u16) = (500, 2500);

/// [left leg, right leg, tilt]
pub const CHANNEL_CALIBRATION: [Calibration; SERVO_COUNT] = [
    Calibration::new((1110, 1810), (-40.0, 40.0), SERVO_LIMITS_US),
    Calibration::new((1100, 1800), (-40.0, 40.0), SERVO_LIMITS_US),
    Calibration::new((1291, 1565), (-20.0, 20.0), SERVO_LIMITS_US),
];
pub static CHANNEL_SIDES: [Side; SERVO_COUNT] = [Side::Left, Side::Right, Side::Center];

// TIMING
pub const TICK_PERIOD_MS: u32 = 20;
/// Longest trajectory that may use a shaped profile; longer ones go linear.
pub const MAX_TRAJECTORY_STEPS: u32 = 500;
pub const PARK_DURATION_MS: u32 = 500;
pub const WAIT_POLL_MS: u32 = 25;
pub const SHUTDOWN_MAX_POLLS: u32 = 400;
pub const SCHEDULING: SchedulingMode = SchedulingMode::Cooperative;

// BEHAVIOR
pub const CONTROL_PERIOD_MS: u32 = 25;
pub const DIST_OBJECT_MM: u16 = 35;
pub const DIST_CLIFF_MM: u16 = 150;
pub const CLIFF_HOLD_MS: u32 = 2000;
pub const OBJECT_HOLD_MS: u32 = 1000;
pub const IDLE_WAIT_MAX_POLLS: u32 = 400;

const LEFT: usize = Joint::LeftLeg as usize;
const RIGHT: usize = Joint::RightLeg as usize;
const TILT: usize = Joint::Tilt as usize;

/// Tilt right, swing both legs, tilt left, swing back. Rows 4 and 5 are the
/// stop branch: legs to neutral, then the tilt.
pub static GAIT_SEQUENCE: [GaitStep<'static>; 6] = [
    GaitStep::new(&[ChannelTarget::new(TILT, 20.0)], 250, GaitState::Walking, Next::Step(1), Some(4)),
    GaitStep::new(
        &[ChannelTarget::new(LEFT, 40.0), ChannelTarget::new(RIGHT, 40.0)],
        400,
        GaitState::Walking,
        Next::Step(2),
        None,
    ),
    GaitStep::new(&[ChannelTarget::new(TILT, -20.0)], 250, GaitState::Walking, Next::Step(3), Some(4)),
    GaitStep::new(
        &[ChannelTarget::new(LEFT, -40.0), ChannelTarget::new(RIGHT, -40.0)],
        400,
        GaitState::Walking,
        Next::Step(0),
        None,
    ),
    GaitStep::new(
        &[ChannelTarget::new(LEFT, 0.0), ChannelTarget::new(RIGHT, 0.0)],
        400,
        GaitState::Stopping,
        Next::Step(5),
        None,
    ),
    GaitStep::new(&[ChannelTarget::new(TILT, 0.0)], 400, GaitState::Stopping, Next::Idle, None),
];

/// How the coordinator gets its ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingMode {
    /// A task of its own ticks at a fixed period.
    Dedicated,
    /// The control loop ticks it from its sleeps.
    Cooperative,
}

/// Runtime knobs of the motion core
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotConfig {
    pub tick_period_ms: u32,
    pub max_trajectory_steps: u32,
    pub gait_profile: Profile,
    pub park_duration_ms: u32,
    pub wait_poll_ms: u32,
    pub shutdown_max_polls: u32,
}

impl RobotConfig {
    pub const fn new() -> Self {
        Self {
            tick_period_ms: TICK_PERIOD_MS,
            max_trajectory_steps: MAX_TRAJECTORY_STEPS,
            gait_profile: Profile::Linear,
            park_duration_ms: PARK_DURATION_MS,
            wait_poll_ms: WAIT_POLL_MS,
            shutdown_max_polls: SHUTDOWN_MAX_POLLS,
        }
    }
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self::new()
    }
}
