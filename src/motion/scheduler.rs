//! Where the coordinator's ticks come from.
//!
//! With a [`DedicatedTicker`] a separate task runs
//! [`MotionCoordinator::run`](crate::motion::MotionCoordinator::run) and every
//! sleep of the control loop is a plain timer. With a [`CooperativeTicker`]
//! there is no such task: the control loop's sleeps deliver the ticks instead,
//! so it must sleep through the ticker to keep the robot moving.
use embassy_time::{Duration, Instant, Timer};

use crate::motion::coordinator::MotionCoordinator;
use crate::robot::servo::Actuator;

#[allow(async_fn_in_trait)]
pub trait TickScheduler {
    async fn sleep(&mut self, duration: Duration);
}

/// Sleeps only; ticks come from a task of their own.
#[derive(Debug, Default, Clone, Copy)]
pub struct DedicatedTicker;

impl TickScheduler for DedicatedTicker {
    async fn sleep(&mut self, duration: Duration) {
        Timer::after(duration).await;
    }
}

/// Ticks the coordinator from inside the caller's sleeps.
pub struct CooperativeTicker<'c, 'a, A, const N: usize> {
    coordinator: &'c MotionCoordinator<'a, A, N>,
    period: Duration,
    last_tick: Instant,
}

impl<'c, 'a, A: Actuator, const N: usize> CooperativeTicker<'c, 'a, A, N> {
    pub fn new(coordinator: &'c MotionCoordinator<'a, A, N>, start: Instant) -> Self {
        Self {
            coordinator,
            period: Duration::from_millis(coordinator.config().tick_period_ms as u64),
            last_tick: start,
        }
    }

    /// Ticks once if a period has passed since the last tick.
    ///
    /// A late call ticks once, not once per missed period.
    pub fn tick_if_due(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_tick) < self.period {
            return false;
        }
        self.coordinator.tick();
        self.last_tick = now;
        true
    }

    pub fn next_tick(&self) -> Instant {
        self.last_tick + self.period
    }
}

impl<A: Actuator, const N: usize> TickScheduler for CooperativeTicker<'_, '_, A, N> {
    async fn sleep(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        loop {
            let now = Instant::now();
            self.tick_if_due(now);
            if now >= deadline {
                break;
            }
            Timer::at(deadline.min(self.next_tick())).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::gait::GaitTable;
    use crate::robot::config::{RobotConfig, CHANNEL_SIDES, GAIT_SEQUENCE, SERVO_COUNT};
    use crate::robot::state::RobotState;
    use crate::testing::{robot_servos, MockServo};
    use embassy_futures::block_on;

    fn coordinator() -> MotionCoordinator<'static, MockServo, SERVO_COUNT> {
        let table = GaitTable::new(&GAIT_SEQUENCE, &CHANNEL_SIDES).unwrap();
        let coordinator = MotionCoordinator::new(robot_servos(), table, RobotConfig::new());
        coordinator.start();
        coordinator
    }

    #[test]
    fn ticks_once_per_elapsed_period() {
        let coordinator = coordinator();
        let mut ticker = CooperativeTicker::new(&coordinator, Instant::from_millis(0));

        assert!(!ticker.tick_if_due(Instant::from_millis(10)));
        assert!(ticker.tick_if_due(Instant::from_millis(20)));
        assert!(!ticker.tick_if_due(Instant::from_millis(39)));
        assert!(ticker.tick_if_due(Instant::from_millis(40)));
        assert_eq!(coordinator.ticks(), 2);
    }

    #[test]
    fn late_call_ticks_once_then_resyncs() {
        let coordinator = coordinator();
        let mut ticker = CooperativeTicker::new(&coordinator, Instant::from_millis(0));

        assert!(ticker.tick_if_due(Instant::from_millis(95)));
        assert_eq!(coordinator.ticks(), 1);
        assert_eq!(ticker.next_tick(), Instant::from_millis(115));
        assert!(!ticker.tick_if_due(Instant::from_millis(100)));
    }

    #[test]
    fn commands_take_effect_on_a_cooperative_tick() {
        let coordinator = coordinator();
        let mut ticker = CooperativeTicker::new(&coordinator, Instant::from_millis(0));

        coordinator.submit_move(0.0, false);
        ticker.tick_if_due(Instant::from_millis(5));
        assert_eq!(coordinator.current_state(), RobotState::Idle);
        ticker.tick_if_due(Instant::from_millis(25));
        assert_eq!(coordinator.current_state(), RobotState::Walking);
    }

    #[test]
    fn sleeping_keeps_the_robot_ticking() {
        let coordinator = coordinator();
        let mut ticker = CooperativeTicker::new(&coordinator, Instant::now());

        block_on(ticker.sleep(Duration::from_millis(100)));
        // timer slack only ever delays ticks
        let ticks = coordinator.ticks();
        assert!((4..=5).contains(&ticks), "{ticks} ticks");
    }

    #[test]
    fn short_sleeps_still_tick_on_time() {
        let coordinator = coordinator();
        let start = Instant::now();
        let mut ticker = CooperativeTicker::new(&coordinator, start);

        for _ in 0..50 {
            block_on(ticker.sleep(Duration::from_millis(1)));
        }
        let periods = (start.elapsed().as_millis() / 20) as u32;
        let ticks = coordinator.ticks();
        assert!(ticks + 1 >= periods, "{ticks} ticks in {periods} periods");
        assert!(ticks <= periods, "{ticks} ticks in {periods} periods");
    }

    #[test]
    fn dedicated_ticker_only_sleeps() {
        let coordinator = coordinator();
        let start = Instant::now();
        block_on(DedicatedTicker.sleep(Duration::from_millis(10)));
        assert!(start.elapsed() >= Duration::from_millis(10));
        assert_eq!(coordinator.ticks(), 0);
    }
}
