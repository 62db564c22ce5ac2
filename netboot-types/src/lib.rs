#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::module_name_repetitions
)]
//! Wire-format types shared by the netboot configuration client.

pub mod dhcp;
pub mod iface;
