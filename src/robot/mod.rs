//! Core robot types and configuration.
//!
//! This module defines the hardware-facing side of the robot:
//! - [`commands`]: Commands posted from the control loop to the tick handler.
//! - [`config`]: Calibration, timing constants and the authored gait.
//! - [`display`]: Status output consumed by the control loop.
//! - [`joint`]: Actuator slots and their steering sides.
//! - [`sensors`]: Distance and power readings consumed by the control loop.
//! - [`servo`]: The [`servo::Actuator`] contract and its PWM servo.
//! - [`state`]: Robot state and its lock-free shared view.
pub mod commands;
pub mod config;
pub mod display;
pub mod joint;
pub mod sensors;
pub mod servo;
pub mod state;
