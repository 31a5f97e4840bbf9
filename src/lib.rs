//! Library root for the robotling motion firmware.
//!
//! Re-exports all main modules: [`motion`], [`robot`] and [`behavior`], plus
//! the ESP32 [`tasks`] when built with the `firmware` feature. Everything but
//! the tasks builds on the host, which is where the tests run.
#![cfg_attr(not(test), no_std)]

pub mod behavior;
pub mod error;
pub mod motion;
pub mod robot;
#[cfg(feature = "firmware")]
pub mod tasks;

#[cfg(test)]
pub(crate) mod testing;
