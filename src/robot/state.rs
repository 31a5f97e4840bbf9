//! Robot state and the view of it shared across timing domains.
//!
//! The tick handler is the only writer of [`SharedState`]; the control loop
//! polls it. Every field is an atomic so the two sides never need to hold a
//! lock to agree on "is the robot idle yet".
use core::fmt::{self, Display, Formatter};
use core::sync::atomic::{AtomicU16, AtomicU32, AtomicU8, Ordering};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotState {
    None = 0,
    Idle = 1,
    Stopping = 2,
    Walking = 3,
    Reversing = 4,
    Turning = 5,
    PoweringDown = 6,
    Off = 7,
}

impl Display for RobotState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RobotState::None => f.write_str("None"),
            RobotState::Idle => f.write_str("Idle"),
            RobotState::Stopping => f.write_str("Stopping"),
            RobotState::Walking => f.write_str("Walking"),
            RobotState::Reversing => f.write_str("Backing up"),
            RobotState::Turning => f.write_str("Turning"),
            RobotState::PoweringDown => f.write_str("Powering down"),
            RobotState::Off => f.write_str("Off"),
        }
    }
}

impl From<u8> for RobotState {
    fn from(value: u8) -> Self {
        match value {
            1 => RobotState::Idle,
            2 => RobotState::Stopping,
            3 => RobotState::Walking,
            4 => RobotState::Reversing,
            5 => RobotState::Turning,
            6 => RobotState::PoweringDown,
            7 => RobotState::Off,
            _ => RobotState::None,
        }
    }
}

/// Phase of the gait sequencer, mirrored into [`SharedState`] after every spin.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaitState {
    Idle = 0,
    Walking = 1,
    Turning = 2,
    Stopping = 3,
}

impl GaitState {
    /// Walking and turning rows belong to the locomotion cycle.
    pub fn is_locomotion(self) -> bool {
        matches!(self, GaitState::Walking | GaitState::Turning)
    }
}

impl Display for GaitState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            GaitState::Idle => f.write_str("idle"),
            GaitState::Walking => f.write_str("walking"),
            GaitState::Turning => f.write_str("turning"),
            GaitState::Stopping => f.write_str("stopping"),
        }
    }
}

impl From<u8> for GaitState {
    fn from(value: u8) -> Self {
        match value {
            1 => GaitState::Walking,
            2 => GaitState::Turning,
            3 => GaitState::Stopping,
            _ => GaitState::Idle,
        }
    }
}

/// Lock-free snapshot of the coordinator, readable from any context.
#[derive(Debug)]
pub struct SharedState {
    state: AtomicU8,
    gait_state: AtomicU8,
    gait_step: AtomicU16,
    direction: AtomicU32, // f32 bits
    velocity: AtomicU32,  // f32 bits
    ticks: AtomicU32,
}

impl SharedState {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(RobotState::None as u8),
            gait_state: AtomicU8::new(GaitState::Idle as u8),
            gait_step: AtomicU16::new(0),
            direction: AtomicU32::new(0),          // 0.0
            velocity: AtomicU32::new(0x3f80_0000), // 1.0
            ticks: AtomicU32::new(0),
        }
    }

    pub fn state(&self) -> RobotState {
        self.state.load(Ordering::Acquire).into()
    }

    pub fn set_state(&self, state: RobotState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn gait_state(&self) -> GaitState {
        self.gait_state.load(Ordering::Acquire).into()
    }

    pub fn gait_step(&self) -> usize {
        self.gait_step.load(Ordering::Acquire) as usize
    }

    pub fn set_gait_phase(&self, state: GaitState, step: usize) {
        self.gait_step.store(step as u16, Ordering::Release);
        self.gait_state.store(state as u8, Ordering::Release);
    }

    pub fn direction(&self) -> f32 {
        f32::from_bits(self.direction.load(Ordering::Acquire))
    }

    pub fn set_direction(&self, direction: f32) {
        self.direction.store(direction.to_bits(), Ordering::Release);
    }

    pub fn velocity(&self) -> f32 {
        f32::from_bits(self.velocity.load(Ordering::Acquire))
    }

    pub fn set_velocity(&self, velocity: f32) {
        self.velocity.store(velocity.to_bits(), Ordering::Release);
    }

    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::Acquire)
    }

    pub fn count_tick(&self) {
        self.ticks.fetch_add(1, Ordering::AcqRel);
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn robot_state_roundtrips_through_u8() {
        for raw in 0..8u8 {
            assert_eq!(RobotState::from(raw) as u8, raw);
        }
        assert_eq!(RobotState::from(42), RobotState::None);
    }

    #[test]
    fn reversing_displays_like_the_status_screen() {
        let mut s: heapless::String<16> = heapless::String::new();
        core::fmt::write(&mut s, format_args!("{}", RobotState::Reversing)).unwrap();
        assert_eq!(s.as_str(), "Backing up");
    }

    #[test]
    fn shared_state_starts_unstarted_at_unit_velocity() {
        let shared = SharedState::new();
        assert_eq!(shared.state(), RobotState::None);
        assert_eq!(shared.gait_state(), GaitState::Idle);
        assert_eq!(shared.direction(), 0.0);
        assert_eq!(shared.velocity(), 1.0);
    }

    #[test]
    fn direction_bits_survive_the_atomic() {
        let shared = SharedState::new();
        shared.set_direction(-0.35);
        assert_eq!(shared.direction(), -0.35);
    }
}
