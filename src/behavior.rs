//! Obstacle and cliff avoidance on top of the motion core.
//!
//! Every iteration reads the distance sensors, decides on a [`Reaction`] and
//! turns it into commands for the coordinator. Any reaction other than walking
//! on first brings the robot to a stop.
use core::fmt::Write;

use embassy_time::Duration;
use heapless::String;
use log::{debug, warn};

use crate::error::MotionError;
use crate::motion::{MotionCoordinator, TickScheduler};
use crate::robot::config::{
    CLIFF_HOLD_MS, CONTROL_PERIOD_MS, DIST_CLIFF_MM, DIST_OBJECT_MM, IDLE_WAIT_MAX_POLLS, OBJECT_HOLD_MS,
};
use crate::robot::display::StatusDisplay;
use crate::robot::sensors::{Distances, Sensors};
use crate::robot::servo::Actuator;
use crate::robot::state::RobotState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Closer than this (and above 0) is an object.
    pub object_mm: u16,
    /// Farther than this is a cliff.
    pub cliff_mm: u16,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            object_mm: DIST_OBJECT_MM,
            cliff_mm: DIST_CLIFF_MM,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Surroundings {
    pub object_left: bool,
    pub object_center: bool,
    pub object_right: bool,
    pub cliff_left: bool,
    pub cliff_right: bool,
}

impl Surroundings {
    /// Sensors without a reading see neither object nor cliff.
    pub fn assess(distances: &Distances, thresholds: &Thresholds) -> Self {
        let object = |d: Option<u16>| d.is_some_and(|d| d > 0 && d < thresholds.object_mm);
        let cliff = |d: Option<u16>| d.is_some_and(|d| d > thresholds.cliff_mm);
        Self {
            object_left: object(distances.left),
            object_center: object(distances.center),
            object_right: object(distances.right),
            cliff_left: cliff(distances.left),
            cliff_right: cliff(distances.right),
        }
    }

    pub fn is_free(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reaction {
    /// Keep walking, or start to.
    Advance,
    /// Turn away and keep turning for `hold_ms`.
    Turn {
        direction: f32,
        hold_ms: u32,
        message: &'static str,
    },
    /// Back up for `backup_ms`, then turn a random way for `hold_ms`.
    BackUp {
        backup_ms: u32,
        hold_ms: u32,
        message: &'static str,
    },
    /// Boxed in on both sides: stand still for `hold_ms`.
    Hold { hold_ms: u32 },
}

/// Cliffs win over objects.
pub fn react(surroundings: &Surroundings) -> Reaction {
    let s = surroundings;
    if s.is_free() {
        return Reaction::Advance;
    }
    if s.cliff_left || s.cliff_right {
        return match (s.cliff_left, s.cliff_right) {
            (true, false) => Reaction::Turn {
                direction: 1.0,
                hold_ms: CLIFF_HOLD_MS,
                message: "Cliff_L__",
            },
            (false, true) => Reaction::Turn {
                direction: -1.0,
                hold_ms: CLIFF_HOLD_MS,
                message: "Cliff___R",
            },
            _ => Reaction::BackUp {
                backup_ms: CLIFF_HOLD_MS,
                hold_ms: CLIFF_HOLD_MS,
                message: "Cliff_L_R",
            },
        };
    }
    match (s.object_left, s.object_center, s.object_right) {
        (true, _, false) => Reaction::Turn {
            direction: 1.0,
            hold_ms: OBJECT_HOLD_MS,
            message: "Objct_L__",
        },
        (false, _, true) => Reaction::Turn {
            direction: -1.0,
            hold_ms: OBJECT_HOLD_MS,
            message: "Objct___R",
        },
        (_, true, _) => Reaction::BackUp {
            backup_ms: OBJECT_HOLD_MS,
            hold_ms: OBJECT_HOLD_MS,
            message: "Objct__C_",
        },
        _ => Reaction::Hold {
            hold_ms: OBJECT_HOLD_MS,
        },
    }
}

/// Runs the avoidance loop until the robot is off or the display asks to exit.
///
/// `coin` picks the turn direction after backing up. All sleeps go through
/// `scheduler`, which keeps a cooperatively scheduled robot ticking.
pub async fn control_loop<A, const N: usize, S, Z, D>(
    coordinator: &MotionCoordinator<'_, A, N>,
    scheduler: &mut S,
    sensors: &mut Z,
    display: &mut D,
    coin: &mut impl FnMut() -> bool,
) -> Result<(), MotionError>
where
    A: Actuator,
    S: TickScheduler,
    Z: Sensors,
    D: StatusDisplay,
{
    let thresholds = Thresholds::default();
    let period = Duration::from_millis(CONTROL_PERIOD_MS as u64);
    let mut shown = RobotState::None;

    loop {
        let state = coordinator.current_state();
        if state == RobotState::Off || display.exit_requested() {
            return Ok(());
        }
        if state != shown {
            show_state(display, state, coordinator.current_direction(), sensors);
            shown = state;
        }

        let surroundings = Surroundings::assess(&sensors.distances(), &thresholds);
        let reaction = react(&surroundings);
        if reaction == Reaction::Advance {
            if state != RobotState::Walking {
                coordinator.submit_move(0.0, false);
                display.show_message("-");
            }
        } else {
            debug!("{:?}", surroundings);
            coordinator.submit_stop();
            coordinator
                .wait_until(RobotState::Idle, scheduler, IDLE_WAIT_MAX_POLLS)
                .await?;
            perform(coordinator, scheduler, display, coin, reaction).await;
        }
        scheduler.sleep(period).await;
    }
}

async fn perform<A: Actuator, const N: usize, S: TickScheduler, D: StatusDisplay>(
    coordinator: &MotionCoordinator<'_, A, N>,
    scheduler: &mut S,
    display: &mut D,
    coin: &mut impl FnMut() -> bool,
    reaction: Reaction,
) {
    match reaction {
        Reaction::Advance => {}
        Reaction::Turn {
            direction,
            hold_ms,
            message,
        } => {
            coordinator.submit_move(direction, false);
            display.show_message(message);
            scheduler.sleep(Duration::from_millis(hold_ms as u64)).await;
        }
        Reaction::BackUp {
            backup_ms,
            hold_ms,
            message,
        } => {
            coordinator.submit_move(0.0, true);
            scheduler.sleep(Duration::from_millis(backup_ms as u64)).await;
            let direction = if coin() { 1.0 } else { -1.0 };
            coordinator.submit_move(direction, false);
            display.show_message(message);
            scheduler.sleep(Duration::from_millis(hold_ms as u64)).await;
        }
        Reaction::Hold { hold_ms } => {
            scheduler.sleep(Duration::from_millis(hold_ms as u64)).await;
        }
    }
}

fn show_state<D: StatusDisplay, Z: Sensors>(display: &mut D, state: RobotState, direction: f32, sensors: &mut Z) {
    let mut name: String<16> = String::new();
    let mut extra: String<16> = String::new();
    let power = sensors.power();
    let written = write!(name, "{}", state).and_then(|_| {
        if state == RobotState::Turning {
            write!(extra, "dir {:.1}", direction)
        } else if power.usb {
            write!(extra, "USB")
        } else {
            write!(extra, "{:.1}V", power.volts)
        }
    });
    if written.is_err() {
        warn!("status line truncated");
    }
    display.show_state(&name, &extra);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::gait::GaitTable;
    use crate::robot::config::{RobotConfig, CHANNEL_SIDES, GAIT_SEQUENCE, SERVO_COUNT};
    use crate::robot::sensors::PowerStatus;
    use crate::testing::{robot_servos, MockServo};
    use embassy_futures::block_on;

    type Coordinator = MotionCoordinator<'static, MockServo, SERVO_COUNT>;

    fn coordinator() -> Coordinator {
        let table = GaitTable::new(&GAIT_SEQUENCE, &CHANNEL_SIDES).unwrap();
        let coordinator = MotionCoordinator::new(robot_servos(), table, RobotConfig::new());
        coordinator.start();
        coordinator
    }

    fn seen(left: Option<u16>, center: Option<u16>, right: Option<u16>) -> Surroundings {
        Surroundings::assess(&Distances::new(left, center, right), &Thresholds::default())
    }

    struct StepTicker<'c>(&'c Coordinator);

    impl TickScheduler for StepTicker<'_> {
        async fn sleep(&mut self, _duration: Duration) {
            self.0.tick();
        }
    }

    struct FixedSensors(Distances);

    impl Sensors for FixedSensors {
        fn distances(&mut self) -> Distances {
            self.0
        }

        fn power(&mut self) -> PowerStatus {
            PowerStatus { usb: false, volts: 4.2 }
        }
    }

    /// Records what is shown and asks to exit after `polls` iterations.
    #[derive(Default)]
    struct Recorder {
        states: std::vec::Vec<std::string::String>,
        messages: std::vec::Vec<std::string::String>,
        polls: usize,
    }

    impl StatusDisplay for Recorder {
        fn show_state(&mut self, name: &str, extra: &str) {
            self.states.push(std::format!("{name} {extra}"));
        }

        fn show_message(&mut self, text: &str) {
            self.messages.push(text.into());
        }

        fn exit_requested(&mut self) -> bool {
            self.polls = self.polls.saturating_sub(1);
            self.polls == 0
        }
    }

    #[test]
    fn readings_classify_by_threshold() {
        assert!(seen(None, None, None).is_free());
        assert!(seen(Some(80), Some(100), Some(150)).is_free());
        assert!(seen(Some(0), None, None).is_free());

        let s = seen(Some(34), Some(20), Some(151));
        assert!(s.object_left && s.object_center && !s.object_right);
        assert!(s.cliff_right && !s.cliff_left);
        assert!(seen(Some(35), None, None).is_free());
    }

    #[test]
    fn cliffs_beat_objects() {
        assert_eq!(
            react(&seen(Some(200), Some(10), None)),
            Reaction::Turn {
                direction: 1.0,
                hold_ms: 2000,
                message: "Cliff_L__"
            }
        );
        assert_eq!(
            react(&seen(None, None, Some(200))),
            Reaction::Turn {
                direction: -1.0,
                hold_ms: 2000,
                message: "Cliff___R"
            }
        );
        assert_eq!(
            react(&seen(Some(200), None, Some(200))),
            Reaction::BackUp {
                backup_ms: 2000,
                hold_ms: 2000,
                message: "Cliff_L_R"
            }
        );
    }

    #[test]
    fn objects_steer_away() {
        assert!(matches!(
            react(&seen(Some(10), Some(10), None)),
            Reaction::Turn { direction, message: "Objct_L__", .. } if direction == 1.0
        ));
        assert!(matches!(
            react(&seen(None, None, Some(10))),
            Reaction::Turn { direction, message: "Objct___R", .. } if direction == -1.0
        ));
        assert!(matches!(
            react(&seen(None, Some(10), None)),
            Reaction::BackUp {
                backup_ms: 1000,
                message: "Objct__C_",
                ..
            }
        ));
        assert_eq!(react(&seen(Some(10), None, Some(10))), Reaction::Hold { hold_ms: 1000 });
        assert_eq!(react(&seen(None, None, None)), Reaction::Advance);
    }

    #[test]
    fn free_way_starts_walking() {
        let coordinator = coordinator();
        let mut scheduler = StepTicker(&coordinator);
        let mut display = Recorder {
            polls: 3,
            ..Default::default()
        };
        let mut sensors = FixedSensors(Distances::default());

        let result = block_on(control_loop(
            &coordinator,
            &mut scheduler,
            &mut sensors,
            &mut display,
            &mut || true,
        ));
        assert_eq!(result, Ok(()));
        assert_eq!(coordinator.current_state(), RobotState::Walking);
        assert_eq!(display.messages, ["-"]);
        assert_eq!(display.states, ["Idle 4.2V", "Walking 4.2V"]);
    }

    #[test]
    fn object_on_the_left_turns_right() {
        let coordinator = coordinator();
        coordinator.submit_move(0.0, false);
        coordinator.tick();

        let mut scheduler = StepTicker(&coordinator);
        let mut display = Recorder {
            polls: 2,
            ..Default::default()
        };
        let mut sensors = FixedSensors(Distances::new(Some(20), None, None));

        let result = block_on(control_loop(
            &coordinator,
            &mut scheduler,
            &mut sensors,
            &mut display,
            &mut || true,
        ));
        assert_eq!(result, Ok(()));
        assert_eq!(coordinator.current_state(), RobotState::Turning);
        assert_eq!(coordinator.current_direction(), 1.0);
        assert_eq!(display.messages, ["Objct_L__"]);
    }

    #[test]
    fn boxed_in_backs_up_then_turns_by_coin() {
        let coordinator = coordinator();
        let mut scheduler = StepTicker(&coordinator);
        let mut display = Recorder {
            polls: 2,
            ..Default::default()
        };
        let mut sensors = FixedSensors(Distances::new(Some(200), None, Some(200)));
        let mut flips = 0;

        let result = block_on(control_loop(
            &coordinator,
            &mut scheduler,
            &mut sensors,
            &mut display,
            &mut || {
                flips += 1;
                false
            },
        ));
        assert_eq!(result, Ok(()));
        assert_eq!(flips, 1);
        assert_eq!(coordinator.current_state(), RobotState::Turning);
        assert_eq!(coordinator.current_direction(), -1.0);
        assert_eq!(display.messages, ["Cliff_L_R"]);
    }

    #[test]
    fn loop_ends_once_the_robot_is_off() {
        let coordinator = coordinator();
        let mut scheduler = StepTicker(&coordinator);
        block_on(coordinator.shutdown(&mut scheduler)).unwrap();

        let mut display = Recorder {
            polls: 1000,
            ..Default::default()
        };
        let result = block_on(control_loop(
            &coordinator,
            &mut scheduler,
            &mut FixedSensors(Distances::default()),
            &mut display,
            &mut || true,
        ));
        assert_eq!(result, Ok(()));
        assert!(display.messages.is_empty());
    }
}
