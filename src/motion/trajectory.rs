//! Per-channel trajectories advanced one step per tick.
//!
//! A move is planned as a whole number of ticks. Every tick each live
//! trajectory writes its next timing; the last tick writes the target exactly,
//! whatever rounding the profile accumulated on the way.
use core::f32::consts::PI;

use heapless::Vec;
use log::{debug, warn};
use micromath::F32Ext;

use crate::robot::servo::Actuator;

/// Shape of the timing curve between start and target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Equal steps.
    Linear,
    /// Slow start and end, fastest in the middle.
    Sine,
}

/// Target angle for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelTarget {
    pub channel: usize,
    pub angle: f32,
}

impl ChannelTarget {
    pub const fn new(channel: usize, angle: f32) -> Self {
        Self { channel, angle }
    }
}

/// Bit set of channel indices.
pub type ChannelMask = u32;

pub fn mask_of(targets: &[ChannelTarget]) -> ChannelMask {
    targets
        .iter()
        .filter(|t| t.channel < ChannelMask::BITS as usize)
        .fold(0, |mask, t| mask | 1 << t.channel)
}

#[derive(Debug, Clone, Copy)]
struct Trajectory {
    target: u16,
    current: f32,
    displacement: f32,
    // Linear: the step size. Sine: sin(pi / 2n), so the offsets sum to the displacement.
    scale: f32,
    total_steps: u32,
    steps_remaining: u32,
    profile: Profile,
}

impl Trajectory {
    fn new(from: u16, target: u16, total_steps: u32, profile: Profile) -> Self {
        let displacement = target as f32 - from as f32;
        let n = total_steps as f32;
        let scale = match profile {
            Profile::Linear => displacement / n,
            Profile::Sine => (PI / (2.0 * n)).sin(),
        };
        Self {
            target,
            current: from as f32,
            displacement,
            scale,
            total_steps,
            steps_remaining: total_steps,
            profile,
        }
    }

    /// Advances one step and returns the timing to write.
    fn step(&mut self) -> u16 {
        self.steps_remaining = self.steps_remaining.saturating_sub(1);
        if self.steps_remaining == 0 {
            self.current = self.target as f32;
            return self.target;
        }
        match self.profile {
            Profile::Linear => self.current += self.scale,
            Profile::Sine => {
                let k = (self.total_steps - self.steps_remaining - 1) as f32;
                let phase = PI * (k + 0.5) / self.total_steps as f32;
                self.current += self.displacement * self.scale * phase.sin();
            }
        }
        self.current.round().max(0.0) as u16
    }

    fn is_done(&self) -> bool {
        self.steps_remaining == 0
    }
}

/// Owns the actuators and moves them along planned trajectories.
pub struct TrajectoryEngine<A, const N: usize> {
    channels: [Option<A>; N],
    trajectories: [Option<Trajectory>; N],
    tick_period_ms: u32,
    max_steps: u32,
}

impl<A: Actuator, const N: usize> TrajectoryEngine<A, N> {
    pub fn new(channels: [Option<A>; N], tick_period_ms: u32, max_steps: u32) -> Self {
        Self {
            channels,
            trajectories: [None; N],
            tick_period_ms: tick_period_ms.max(1),
            max_steps,
        }
    }

    /// Number of ticks a move of `duration_ms` takes, rounded to the nearest tick.
    pub fn steps_for(&self, duration_ms: u32) -> u32 {
        let period = self.tick_period_ms;
        (duration_ms.saturating_add(period / 2) / period).max(1)
    }

    /// Plans a move of every listed channel to its target angle.
    ///
    /// A duration of 0 writes the targets at once and cancels whatever those
    /// channels were doing. A new move replaces a channel's live trajectory and
    /// starts from the timing last written. Channels without an actuator are
    /// skipped. Returns the profile actually used, which is `Linear` when the
    /// move needs more than the configured maximum of steps.
    pub fn move_to(&mut self, targets: &[ChannelTarget], duration_ms: u32, profile: Profile) -> Profile {
        let mut profile = profile;
        let total_steps = if duration_ms == 0 { 0 } else { self.steps_for(duration_ms) };
        if total_steps > self.max_steps && profile != Profile::Linear {
            warn!(
                "{}ms move needs {} steps (max {}), going linear",
                duration_ms, total_steps, self.max_steps
            );
            profile = Profile::Linear;
        }

        for target in targets {
            let Some(Some(actuator)) = self.channels.get_mut(target.channel) else {
                debug!("no actuator on channel {}, skipped", target.channel);
                continue;
            };
            let timing = actuator.angle_to_timing(target.angle);
            if total_steps == 0 {
                self.trajectories[target.channel] = None;
                actuator.set_timing(timing);
            } else {
                self.trajectories[target.channel] =
                    Some(Trajectory::new(actuator.timing(), timing, total_steps, profile));
            }
        }
        profile
    }

    /// Moves every channel to 0°.
    pub fn neutral(&mut self, duration_ms: u32, profile: Profile) -> Profile {
        let mut targets: Vec<ChannelTarget, N> = Vec::new();
        for (channel, _) in self.channels.iter().enumerate().filter(|(_, a)| a.is_some()) {
            // at most N channels
            let _ = targets.push(ChannelTarget::new(channel, 0.0));
        }
        self.move_to(&targets, duration_ms, profile)
    }

    /// Advances every live trajectory by one step.
    pub fn tick(&mut self) {
        for (slot, actuator) in self.trajectories.iter_mut().zip(self.channels.iter_mut()) {
            let Some(trajectory) = slot else {
                continue;
            };
            let timing = trajectory.step();
            let done = trajectory.is_done();
            if let Some(actuator) = actuator {
                actuator.set_timing(timing);
            }
            if done {
                *slot = None;
            }
        }
    }

    pub fn is_moving(&self) -> bool {
        self.trajectories.iter().any(Option::is_some)
    }

    /// Whether any channel of `mask` still has a live trajectory.
    pub fn is_group_moving(&self, mask: ChannelMask) -> bool {
        self.trajectories
            .iter()
            .enumerate()
            .any(|(channel, t)| t.is_some() && channel < ChannelMask::BITS as usize && mask & (1 << channel) != 0)
    }

    /// Last timing written on a channel.
    pub fn timing(&self, channel: usize) -> Option<u16> {
        self.channels.get(channel)?.as_ref().map(Actuator::timing)
    }

    /// Where a channel's live trajectory ends.
    pub fn target(&self, channel: usize) -> Option<u16> {
        self.trajectories.get(channel)?.as_ref().map(|t| t.target)
    }

    pub fn actuator(&self, channel: usize) -> Option<&A> {
        self.channels.get(channel)?.as_ref()
    }

    /// Drops all trajectories and releases every actuator for good.
    pub fn release_all(&mut self) {
        self.trajectories = [None; N];
        for actuator in self.channels.iter_mut().flatten() {
            actuator.release();
        }
    }
}
