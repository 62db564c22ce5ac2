#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::module_name_repetitions
)]
//! Boot-time network configuration for firmware environments.
//!
//! This crate acquires an IP address and boot parameters over DHCP/BOOTP
//! without an operating system underneath: no background threads, no
//! blocking calls, no randomness requirements. A [`dhcp::DhcpSession`] is
//! driven entirely by two externally invoked events (a timer poll and a
//! received datagram) and publishes the acquired configuration into a
//! [`settings::SettingsTree`] shared with the rest of the firmware.

pub mod device;
pub mod dhcp;
pub mod settings;
pub mod timer;
pub mod transport;

pub use netboot_types as types;
