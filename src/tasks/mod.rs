//! ESP32 side of the robot.
//!
//! This module contains what only builds for the target:
//! - [`motion_task`]: Ticks the coordinator when it runs in a task of its own.
//! - [`servos`]: Brings up the LEDC timer and the servo channels.
//!
//! Tasks are spawned from `main.rs`.
use esp_hal::ledc::channel::Channel;
use esp_hal::ledc::LowSpeed;

use crate::motion::MotionCoordinator;
use crate::robot::config::SERVO_COUNT;
use crate::robot::servo::Servo;

pub mod motion_task;
pub mod servos;

pub type FirmwareServo = Servo<Channel<'static, LowSpeed>>;
pub type FirmwareCoordinator = MotionCoordinator<'static, FirmwareServo, SERVO_COUNT>;
