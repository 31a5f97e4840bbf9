//! Gait table and the sequencer that walks it.
//!
//! A gait is a cyclic table of steps. Each step moves a group of channels and
//! names the step that follows it (`next`). Locomotion steps may also name a
//! `jump` into the stop branch, taken instead of `next` once a stop has been
//! requested. The stop branch ends in [`Next::Idle`].
use heapless::Vec;
use log::{debug, warn};
use micromath::F32Ext;

use crate::error::MotionError;
use crate::motion::trajectory::{mask_of, ChannelMask, ChannelTarget, Profile, TrajectoryEngine};
use crate::robot::commands::{clamp_direction, STRAIGHT_THRESHOLD};
use crate::robot::joint::Side;
use crate::robot::servo::Actuator;
use crate::robot::state::GaitState;

/// Slowest velocity factor accepted.
pub const MIN_VELOCITY: f32 = 0.1;

/// Walking and turning always enter the table here.
pub const ENTRY_STEP: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Step(usize),
    /// End of the stop branch.
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaitStep<'a> {
    pub targets: &'a [ChannelTarget],
    pub duration_ms: u32,
    pub state: GaitState,
    pub next: Next,
    pub jump: Option<usize>,
}

impl<'a> GaitStep<'a> {
    pub const fn new(
        targets: &'a [ChannelTarget],
        duration_ms: u32,
        state: GaitState,
        next: Next,
        jump: Option<usize>,
    ) -> Self {
        Self {
            targets,
            duration_ms,
            state,
            next,
            jump,
        }
    }
}

/// A gait table checked to be safe to walk.
///
/// Every link points inside the table, every channel has a side, every stop
/// branch ends in idle without re-entering locomotion, and a stop requested on
/// any locomotion step is honored within a bounded number of steps.
#[derive(Debug, Clone, Copy)]
pub struct GaitTable<'a> {
    steps: &'a [GaitStep<'a>],
    sides: &'a [Side],
}

impl<'a> GaitTable<'a> {
    pub fn new(steps: &'a [GaitStep<'a>], sides: &'a [Side]) -> Result<Self, MotionError> {
        if steps.is_empty() {
            return Err(MotionError::EmptyGait);
        }
        for (index, step) in steps.iter().enumerate() {
            if let Some(target) = step.targets.iter().find(|t| t.channel >= sides.len()) {
                return Err(MotionError::UnknownChannel {
                    step: index,
                    channel: target.channel,
                });
            }
            let links = [
                match step.next {
                    Next::Step(n) => Some(n),
                    Next::Idle => None,
                },
                step.jump,
            ];
            if let Some(target) = links.into_iter().flatten().find(|&n| n >= steps.len()) {
                return Err(MotionError::DanglingStep { step: index, target });
            }
        }

        let table = Self { steps, sides };
        for (index, step) in steps.iter().enumerate() {
            if !step.state.is_locomotion() {
                continue;
            }
            if let Some(jump) = step.jump {
                table.stop_branch_len(jump)?;
            }
            table.check_stop_exit(index)?;
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, index: usize) -> &GaitStep<'a> {
        &self.steps[index]
    }

    /// Steering side of a channel; channels without one are not steered.
    pub fn side(&self, channel: usize) -> Side {
        self.sides.get(channel).copied().unwrap_or(Side::Center)
    }

    /// Number of steps from `entry` to idle along a stop branch.
    pub fn stop_branch_len(&self, entry: usize) -> Result<usize, MotionError> {
        let mut index = entry;
        for len in 1..=self.steps.len() {
            let step = &self.steps[index];
            if step.state.is_locomotion() {
                break;
            }
            match step.next {
                Next::Idle => return Ok(len),
                Next::Step(n) => index = n,
            }
        }
        Err(MotionError::UnterminatedStopBranch { step: entry })
    }

    // Follows `next` from a locomotion step until something lets it stop.
    fn check_stop_exit(&self, start: usize) -> Result<(), MotionError> {
        let mut index = start;
        for _ in 0..self.steps.len() {
            let step = &self.steps[index];
            if !step.state.is_locomotion() {
                return self.stop_branch_len(index).map(|_| ());
            }
            if step.jump.is_some() {
                return Ok(());
            }
            match step.next {
                Next::Idle => return Ok(()),
                Next::Step(n) => index = n,
            }
        }
        Err(MotionError::NoStopExit { step: start })
    }
}

/// Issues one gait step at a time, once the previous one has finished.
#[derive(Debug)]
pub struct GaitSequencer<'a> {
    table: GaitTable<'a>,
    state: GaitState,
    step: usize,
    direction: f32,
    velocity: f32,
    reverse: bool,
    profile: Profile,
    in_flight: ChannelMask,
}

impl<'a> GaitSequencer<'a> {
    pub fn new(table: GaitTable<'a>, profile: Profile) -> Self {
        Self {
            table,
            state: GaitState::Idle,
            step: ENTRY_STEP,
            direction: 0.0,
            velocity: 1.0,
            reverse: false,
            profile,
            in_flight: 0,
        }
    }

    pub fn state(&self) -> GaitState {
        self.state
    }

    /// Index of the step the next spin issues.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn direction(&self) -> f32 {
        self.direction
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn set_direction(&mut self, direction: f32) {
        self.direction = clamp_direction(direction);
    }

    /// Scales every step duration by `1 / velocity`.
    pub fn set_velocity(&mut self, velocity: f32) {
        self.velocity = if velocity.is_nan() {
            1.0
        } else {
            velocity.max(MIN_VELOCITY)
        };
    }

    pub fn set_reverse(&mut self, reverse: bool) {
        self.reverse = reverse;
    }

    /// Starts the cycle from the entry step in the current direction.
    pub fn walk<A: Actuator, const N: usize>(&mut self, engine: &mut TrajectoryEngine<A, N>) {
        if self.direction.abs() < STRAIGHT_THRESHOLD {
            self.direction = 0.0;
            self.state = GaitState::Walking;
        } else {
            self.state = GaitState::Turning;
        }
        self.step = ENTRY_STEP;
        self.spin(engine);
    }

    pub fn turn<A: Actuator, const N: usize>(&mut self, direction: f32, engine: &mut TrajectoryEngine<A, N>) {
        self.set_direction(direction);
        self.walk(engine);
    }

    /// Requests the stop branch. Nothing to do when already idle.
    pub fn stop(&mut self) {
        if self.state != GaitState::Idle {
            self.state = GaitState::Stopping;
        }
    }

    /// Idle with the last issued step finished.
    pub fn is_idle<A: Actuator, const N: usize>(&self, engine: &TrajectoryEngine<A, N>) -> bool {
        self.state == GaitState::Idle && !engine.is_group_moving(self.in_flight)
    }

    /// Gait state as seen from outside: still stopping while the last stop
    /// step runs.
    pub fn phase<A: Actuator, const N: usize>(&self, engine: &TrajectoryEngine<A, N>) -> GaitState {
        if self.state == GaitState::Idle && !self.is_idle(engine) {
            GaitState::Stopping
        } else {
            self.state
        }
    }

    /// Issues the current step if the previous one has finished, then advances.
    pub fn spin<A: Actuator, const N: usize>(&mut self, engine: &mut TrajectoryEngine<A, N>) {
        if self.state == GaitState::Idle || engine.is_group_moving(self.in_flight) {
            return;
        }
        let step = *self.table.step(self.step);

        let mut targets: Vec<ChannelTarget, N> = Vec::new();
        for target in step.targets {
            let side = self.table.side(target.channel);
            let angle = target.angle * side.steer(self.direction) * side.reverse(self.reverse);
            if targets.push(ChannelTarget::new(target.channel, angle)).is_err() {
                warn!("gait step {} moves more than {} channels", self.step, N);
                break;
            }
        }
        let duration_ms = (step.duration_ms as f32 / self.velocity).round() as u32;
        engine.move_to(&targets, duration_ms, self.profile);
        self.in_flight = mask_of(&targets);
        debug!("gait step {} ({}) over {}ms", self.step, self.state, duration_ms);

        let following = match self.state {
            GaitState::Stopping if step.state.is_locomotion() => step.jump.map_or(step.next, Next::Step),
            _ => step.next,
        };
        match following {
            Next::Step(index) => self.step = index,
            Next::Idle => {
                self.step = ENTRY_STEP;
                self.state = GaitState::Idle;
            }
        }
    }
}
