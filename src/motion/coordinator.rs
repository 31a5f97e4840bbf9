use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Duration, Ticker};
use log::{debug, info};
use micromath::F32Ext;

use crate::error::MotionError;
use crate::motion::gait::{GaitSequencer, GaitTable};
use crate::motion::scheduler::TickScheduler;
use crate::motion::trajectory::{Profile, TrajectoryEngine};
use crate::robot::commands::{Command, CommandMailbox, STRAIGHT_THRESHOLD};
use crate::robot::config::RobotConfig;
use crate::robot::servo::Actuator;
use crate::robot::state::{GaitState, RobotState, SharedState};

struct Motion<'a, A, const N: usize> {
    engine: TrajectoryEngine<A, N>,
    gait: GaitSequencer<'a>,
    exit_requested: bool,
    parked: bool,
}

/// Owns the motion state and advances it one tick at a time.
///
/// The control loop posts commands and polls [`SharedState`]; the tick
/// handler is the only one touching the engine and the gait. Both sides only
/// need `&self`, so a single `'static` coordinator can be shared between tasks.
pub struct MotionCoordinator<'a, A, const N: usize> {
    motion: Mutex<CriticalSectionRawMutex, RefCell<Motion<'a, A, N>>>,
    mailbox: CommandMailbox,
    shared: SharedState,
    config: RobotConfig,
}

impl<'a, A: Actuator, const N: usize> MotionCoordinator<'a, A, N> {
    pub fn new(channels: [Option<A>; N], table: GaitTable<'a>, config: RobotConfig) -> Self {
        let engine = TrajectoryEngine::new(channels, config.tick_period_ms, config.max_trajectory_steps);
        let gait = GaitSequencer::new(table, config.gait_profile);
        Self {
            motion: Mutex::new(RefCell::new(Motion {
                engine,
                gait,
                exit_requested: false,
                parked: false,
            })),
            mailbox: CommandMailbox::new(),
            shared: SharedState::new(),
            config,
        }
    }

    /// Puts every channel in neutral and makes the robot ready for commands.
    pub fn start(&self) {
        self.motion.lock(|motion| {
            motion.borrow_mut().engine.neutral(0, Profile::Linear);
        });
        self.shared.set_state(RobotState::Idle);
        info!("Gait control ready");
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    pub fn current_state(&self) -> RobotState {
        self.shared.state()
    }

    pub fn current_direction(&self) -> f32 {
        self.shared.direction()
    }

    pub fn gait_state(&self) -> GaitState {
        self.shared.gait_state()
    }

    pub fn gait_step(&self) -> usize {
        self.shared.gait_step()
    }

    pub fn ticks(&self) -> u32 {
        self.shared.ticks()
    }

    /// Last timing written on a channel.
    pub fn timing(&self, channel: usize) -> Option<u16> {
        self.motion.lock(|motion| motion.borrow().engine.timing(channel))
    }

    /// Posts a command for the next tick, replacing one not yet taken.
    pub fn submit(&self, command: Command) {
        let command = match command {
            Command::Move { direction, reverse } => Command::new_move(direction, reverse),
            other => other,
        };
        match command {
            Command::Move { direction, .. } => self.shared.set_direction(direction),
            Command::PowerDown => self.shared.set_direction(0.0),
            Command::Stop => {}
        }
        self.mailbox.signal(command);
    }

    pub fn submit_move(&self, direction: f32, reverse: bool) {
        self.submit(Command::new_move(direction, reverse));
    }

    pub fn submit_stop(&self) {
        self.submit(Command::Stop);
    }

    pub fn submit_power_down(&self) {
        self.submit(Command::PowerDown);
    }

    /// Takes effect with the next move command.
    pub fn set_velocity(&self, velocity: f32) {
        self.shared.set_velocity(velocity);
    }

    /// Advances the robot by one tick.
    pub fn tick(&self) {
        let state = self.shared.state();
        if matches!(state, RobotState::None | RobotState::Off) {
            return;
        }
        self.motion.lock(|motion| {
            let mut motion = motion.borrow_mut();
            let next = if state == RobotState::PoweringDown {
                self.power_down(&mut motion)
            } else {
                self.advance(&mut motion, state)
            };
            self.shared.set_state(next);
        });
        self.shared.count_tick();
    }

    fn advance(&self, motion: &mut Motion<'a, A, N>, mut state: RobotState) -> RobotState {
        let Motion {
            engine,
            gait,
            exit_requested,
            ..
        } = motion;

        if let Some(command) = self.mailbox.try_take() {
            state = match command {
                Command::Move { direction, reverse } => {
                    gait.set_velocity(self.shared.velocity());
                    gait.set_reverse(reverse);
                    if direction.abs() < STRAIGHT_THRESHOLD {
                        gait.set_direction(0.0);
                        gait.walk(engine);
                        if reverse {
                            RobotState::Reversing
                        } else {
                            RobotState::Walking
                        }
                    } else {
                        gait.turn(direction, engine);
                        RobotState::Turning
                    }
                }
                Command::Stop | Command::PowerDown => {
                    gait.stop();
                    *exit_requested |= command == Command::PowerDown;
                    RobotState::Stopping
                }
            };
            info!("{:?} -> {}", command, state);
        }

        if state == RobotState::Stopping && gait.is_idle(engine) {
            state = RobotState::Idle;
            debug!("gait stopped");
        }
        if state == RobotState::Idle && *exit_requested {
            state = RobotState::PoweringDown;
            info!("Powering down ...");
        }

        engine.tick();
        gait.spin(engine);
        self.shared.set_gait_phase(gait.phase(engine), gait.step());
        state
    }

    fn power_down(&self, motion: &mut Motion<'a, A, N>) -> RobotState {
        if !motion.parked {
            motion.parked = true;
            motion.engine.neutral(self.config.park_duration_ms, Profile::Linear);
        }
        motion.engine.tick();
        if motion.engine.is_moving() {
            return RobotState::PoweringDown;
        }
        motion.engine.release_all();
        info!("Gait control off");
        RobotState::Off
    }

    /// Ticks at the configured period until the robot is off.
    pub async fn run(&self) {
        let mut ticker = Ticker::every(Duration::from_millis(self.config.tick_period_ms as u64));
        while self.current_state() != RobotState::Off {
            self.tick();
            ticker.next().await;
        }
    }

    /// Polls until the robot reaches `state`, sleeping through `scheduler`.
    pub async fn wait_until<S: TickScheduler>(
        &self,
        state: RobotState,
        scheduler: &mut S,
        max_polls: u32,
    ) -> Result<(), MotionError> {
        let poll = Duration::from_millis(self.config.wait_poll_ms as u64);
        for _ in 0..max_polls {
            if self.current_state() == state {
                return Ok(());
            }
            scheduler.sleep(poll).await;
        }
        if self.current_state() == state {
            Ok(())
        } else {
            Err(MotionError::StateTimeout {
                state,
                polls: max_polls,
            })
        }
    }

    /// Stops the gait, parks in neutral and releases every actuator.
    ///
    /// The scheduler must keep the coordinator ticking; in cooperative mode
    /// that is what its sleeps do.
    pub async fn shutdown<S: TickScheduler>(&self, scheduler: &mut S) -> Result<(), MotionError> {
        match self.current_state() {
            RobotState::Off => return Ok(()),
            RobotState::None => {
                // never started: nothing to wind down
                self.motion.lock(|motion| motion.borrow_mut().engine.release_all());
                self.shared.set_state(RobotState::Off);
                return Ok(());
            }
            _ => {}
        }
        self.submit_power_down();
        let polls = self.config.shutdown_max_polls;
        self.wait_until(RobotState::Off, scheduler, polls)
            .await
            .map_err(|_| MotionError::ShutdownTimeout { polls })
    }
}
