//! Motion core: trajectories, the gait and the tick-driven coordinator.
//!
//! - [`trajectory`]: Per-channel interpolation towards target timings.
//! - [`gait`]: The gait table and the sequencer walking it.
//! - [`coordinator`]: Command handling and the robot state machine.
//! - [`scheduler`]: Dedicated and cooperative tick sources.
pub mod coordinator;
pub mod gait;
pub mod scheduler;
pub mod trajectory;

pub use coordinator::MotionCoordinator;
pub use scheduler::{CooperativeTicker, DedicatedTicker, TickScheduler};
