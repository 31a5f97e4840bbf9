//! Commands passed from the control loop to the tick handler.
//!
//! A command is posted into a one-slot mailbox and consumed by the next tick.
//! A newer command overwrites an older one that has not been consumed yet;
//! this is also the only way to cancel an ongoing move.
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

/// Directions with a magnitude below this walk straight.
pub const STRAIGHT_THRESHOLD: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Wind down through the gait's stop branch.
    Stop,
    /// Walk straight (`direction` ~ 0) or turn; `direction < 0` turns left,
    /// `direction > 0` turns right, `|direction| == 1` turns in place.
    Move { direction: f32, reverse: bool },
    /// Stop, park and release all actuators.
    PowerDown,
}

impl Command {
    /// Builds a move command, clamping `direction` into `[-1, 1]`.
    pub fn new_move(direction: f32, reverse: bool) -> Self {
        Command::Move {
            direction: clamp_direction(direction),
            reverse,
        }
    }
}

pub fn clamp_direction(direction: f32) -> f32 {
    if direction.is_nan() {
        0.0
    } else {
        direction.clamp(-1.0, 1.0)
    }
}

/// Single-writer / single-reader command slot.
pub type CommandMailbox = Signal<CriticalSectionRawMutex, Command>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_direction_is_clamped() {
        assert_eq!(
            Command::new_move(3.5, false),
            Command::Move { direction: 1.0, reverse: false }
        );
        assert_eq!(
            Command::new_move(-7.0, true),
            Command::Move { direction: -1.0, reverse: true }
        );
        assert_eq!(
            Command::new_move(f32::NAN, false),
            Command::Move { direction: 0.0, reverse: false }
        );
    }

    #[test]
    fn mailbox_keeps_only_the_latest_command() {
        let mailbox = CommandMailbox::new();
        mailbox.signal(Command::new_move(0.5, false));
        mailbox.signal(Command::Stop);
        assert_eq!(mailbox.try_take(), Some(Command::Stop));
        assert_eq!(mailbox.try_take(), None);
    }
}
