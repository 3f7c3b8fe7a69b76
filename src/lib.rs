//! Core of the CRSF-to-PWM flight peripheral.
//!
//! Everything in here is hardware independent. The firmware binary supplies the STM32
//! implementations of [`platform::traits`]; host tests use [`platform::mock`].
//!
//! ```text
//!  UART ISR ──► IrqPort ──► Engine rings ◄── Port ◄── Controller tasks ◄── Scheduler ◄── idle
//! ```
#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
pub mod log;

pub mod actuator;
pub mod config;
pub mod controller;
pub mod datamodel;
pub mod fifo;
pub mod link;
pub mod platform;
pub mod scheduler;
pub mod sensors;
pub mod serial;
pub mod telemetry;
pub mod ubx;

pub use datamodel::error::Error;
