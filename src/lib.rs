//! This crate provides an interface for communicating with and controlling
//! the TE Technology TC-48-20 thermoelectric temperature controller.
//!
//! Documentation for the hardware: <https://tetech.com/product/tc-48-20/>
//!
//! The controller speaks a fixed-length, checksummed ASCII-hex protocol
//! over a half-duplex serial link. This crate layers three things on top:
//! * the wire codec ([`codec`]),
//! * typed, unit-scaled access to the controller's parameters
//!   ([`controller::Tc4820`], [`parameter::Parameter`]),
//! * a closed-loop thermal cycling driver that alternates between two
//!   setpoints with stability detection and dwell timing ([`cycle`]).
//!
//! Any transport implementing [`embedded_io::Read`] and
//! [`embedded_io::Write`] works; see `demos/serial.rs` for wiring up a real
//! serial port.
//!
//! The serial link should be configured like so:
//! * Baud rate: 115200
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None
//!
//! From the vendor's example script: a small (one to four) millisecond
//! inter-character delay can improve communication with some units; apply
//! it at the transport level if exchanges prove flaky.

pub mod codec;
pub mod controller;
pub mod cycle;
pub mod error;
pub mod parameter;
pub mod status;

#[cfg(test)]
mod mock_port;
