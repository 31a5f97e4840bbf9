//! Error type shared by the motion core.
//!
//! Only two kinds of failure ever reach the caller: a gait table that cannot be
//! walked safely (rejected once, at startup) and a bounded wait that ran out of
//! polls. Everything else (over-long trajectories, out-of-range directions,
//! missing actuators) is recovered where it happens.
use thiserror::Error;

use crate::robot::state::RobotState;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionError {
    #[error("gait table has no steps")]
    EmptyGait,

    #[error("gait step {step} links to step {target}, which does not exist")]
    DanglingStep { step: usize, target: usize },

    #[error("gait step {step} moves channel {channel}, which is not configured")]
    UnknownChannel { step: usize, channel: usize },

    #[error("stop branch entered at step {step} never returns to idle")]
    UnterminatedStopBranch { step: usize },

    #[error("locomotion step {step} can never leave the cycle to stop")]
    NoStopExit { step: usize },

    /// The robot did not reach `Off` within the shutdown budget. Fatal: the
    /// tick source is dead or the gait never winds down.
    #[error("robot did not power down after {polls} polls")]
    ShutdownTimeout { polls: u32 },

    #[error("robot did not reach {state} after {polls} polls")]
    StateTimeout { state: RobotState, polls: u32 },
}
