// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! TOAST kernel.
//!
//! This is the process and synchronization kernel of the system: a
//! fixed-capacity process table, priority-ordered ready and sleep queues, a
//! pool of Hoare-style monitors, a timer-driven dispatcher, and the syscall
//! router that performs privileged operations on behalf of user code.
//!
//! The machine-level trap entry/exit sequence is *not* here; it is an
//! external collaborator that saves and restores execution contexts and
//! calls the two entry points [`sched::Kernel::schedule`] and
//! [`sched::Kernel::route_syscall`]. All hardware access goes through the
//! [`device::Device`] capability, so the whole kernel can be exercised on a
//! host with a mock device standing in for the SoC.
//!
//! # Design principles
//!
//! 1. Simple, naive algorithms over clever ones. Tables are small (8
//!    processes, 4 monitors) and linear scans are fine.
//! 2. No implicit global state: all kernel state lives in one
//!    [`sched::Kernel`] value constructed at startup.
//! 3. No recoverable-error channel. Trust-boundary checks return
//!    `Result<_, PanicCode>` internally, and the entry points discharge any
//!    failure through the single fatal path in [`fail`]. Continuing after
//!    corruption is considered unsafe.

#![cfg_attr(target_os = "none", no_std)]

pub mod context;
pub mod device;
pub mod fail;
pub mod monitor;
pub mod proc;
pub mod queue;
pub mod sched;
pub mod syscalls;
pub mod time;
