// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BCM2835 peripheral drivers.
//!
//! Register layouts are declared with `tock-registers` and overlaid on the
//! fixed physical addresses of the original Raspberry Pi's peripheral
//! window. The interesting export is [`device::Soc`], which bundles the
//! individual drivers into the kernel's hardware capability.
//!
//! Nothing here is clever: each driver is the minimal poking sequence the
//! datasheet prescribes.

#![cfg_attr(target_os = "none", no_std)]

pub mod common;
pub mod device;
pub mod gpio;
pub mod pwm;
pub mod timer;
pub mod uart;

/// Base of the peripheral window on the BCM2835 (Raspberry Pi 1 / Zero).
pub const PERIPHERAL_BASE: usize = 0x2000_0000;

pub const SYSTEM_TIMER_BASE: usize = PERIPHERAL_BASE + 0x0000_3000;
pub const IRQ_BASE: usize = PERIPHERAL_BASE + 0x0000_b200;
pub const ARM_TIMER_BASE: usize = PERIPHERAL_BASE + 0x0000_b400;
pub const CLOCK_MANAGER_BASE: usize = PERIPHERAL_BASE + 0x0010_1000;
pub const GPIO_BASE: usize = PERIPHERAL_BASE + 0x0020_0000;
pub const PWM_BASE: usize = PERIPHERAL_BASE + 0x0020_c000;
pub const AUX_BASE: usize = PERIPHERAL_BASE + 0x0021_5000;
