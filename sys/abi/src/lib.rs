// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kernel ABI definitions, shared between the kernel and user programs.
//!
//! Everything here is part of the stable surface between the supervisor and
//! unprivileged code: syscall numbers, the priority encoding, identifier
//! types, monitor status codes, and the compile-time sizing constants that
//! the trap layer and user code both need to agree on.

#![no_std]

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Number of slots in the process table.
pub const MAX_PROCESS: usize = 8;

/// Number of slots in the monitor pool.
pub const MAX_MONITOR: usize = 4;

/// Saved general registers per process: r0-r12, sp, lr. The program counter
/// and status word are stored separately in the execution context.
pub const MAX_REGISTERS: usize = 15;

/// Words of private stack owned by each process-table slot.
pub const STACK_WORDS: usize = 16;

/// Register bank index used to pass a new process's entry point (and to
/// return values such as a forked child's pid).
pub const REG_R0: usize = 0;
/// Register bank index used to pass a new process's init parameter.
pub const REG_R1: usize = 1;
/// Register bank index of the stack pointer.
pub const REG_SP: usize = 13;

/// Saved-status-word bit pattern for unprivileged (user mode) execution.
pub const PSR_MODE_USER: u32 = 0x10;
/// Saved-status-word bit masking the FIQ exception class.
pub const PSR_FIQ_DISABLE: u32 = 0x40;

/// System LED pin assignments on the reference board.
pub const SYS_LED_BLUE: u32 = 22;
pub const SYS_LED_RED: u32 = 23;
pub const SYS_LED_YELLOW: u32 = 24;
pub const SYS_LED_GREEN: u32 = 25;

/// Names a process-table slot.
///
/// A pid is simply the process's index in the table; slots are never
/// recycled in this design, so no generation number is carried.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Default,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
)]
#[repr(transparent)]
pub struct Pid(pub u32);

impl Pid {
    /// Fabricates a `Pid` for a known table index.
    pub const fn from_index(index: usize) -> Self {
        Pid(index as u32)
    }

    /// Extracts the table index.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Indicates scheduling priority of a process.
///
/// Priorities are small numbers starting from zero. Numerically lower
/// priorities are more important, so priority 0 is the most likely to be
/// scheduled, followed by 1, and so forth.
///
/// Note that this type *deliberately* does not implement `PartialOrd`/`Ord`,
/// to keep us from confusing ourselves on whether `>` means numerically
/// greater / less important, or more important / numerically smaller.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Default,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
)]
#[repr(transparent)]
pub struct Priority(pub u32);

impl Priority {
    /// Priority of the idle process, the floor that keeps the ready queue
    /// non-empty.
    pub const IDLE: Self = Priority(255);

    /// Checks if `self` is strictly more important than `other`.
    ///
    /// This is easier to read than comparing the numeric values of the
    /// priorities, since lower numbers are more important.
    pub fn is_more_important_than(self, other: Self) -> bool {
        self.0 < other.0
    }
}

/// Syscall numbers whose high bit is set belong to the blocking class and
/// may cause the caller to be switched out.
pub const SWI_BLOCKING: u32 = 0x8000;

/// Enumeration of syscall numbers.
///
/// The numbering is a stable ABI surface: low numbers are the immediate
/// class, numbers with [`SWI_BLOCKING`] set are the (potentially) blocking
/// class. The partition is semantically meaningful and must be preserved.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Sysnum {
    SetLed = 0x0001,
    ClockMillis = 0x0002,
    Fork = 0x0003,
    MonCreate = 0x0004,
    MonExit = 0x0005,
    MonNotify = 0x0006,
    GetPid = 0x0007,

    Exit = 0x8000,
    Yield = 0x8001,
    SleepMillis = 0x8002,
    MonEnter = 0x8003,
    MonWait = 0x8004,
    Log = 0x8005,
}

impl Sysnum {
    /// Checks whether this syscall belongs to the blocking class.
    pub fn is_blocking(self) -> bool {
        self as u32 & SWI_BLOCKING != 0
    }
}

/// We're using an explicit `TryFrom` impl for `Sysnum` instead of
/// `FromPrimitive` because the kernel doesn't currently depend on
/// `num-traits` and this seems okay.
impl core::convert::TryFrom<u32> for Sysnum {
    type Error = ();

    fn try_from(x: u32) -> Result<Self, Self::Error> {
        match x {
            0x0001 => Ok(Self::SetLed),
            0x0002 => Ok(Self::ClockMillis),
            0x0003 => Ok(Self::Fork),
            0x0004 => Ok(Self::MonCreate),
            0x0005 => Ok(Self::MonExit),
            0x0006 => Ok(Self::MonNotify),
            0x0007 => Ok(Self::GetPid),
            0x8000 => Ok(Self::Exit),
            0x8001 => Ok(Self::Yield),
            0x8002 => Ok(Self::SleepMillis),
            0x8003 => Ok(Self::MonEnter),
            0x8004 => Ok(Self::MonWait),
            0x8005 => Ok(Self::Log),
            _ => Err(()),
        }
    }
}

/// Monitor status code: the operation completed and the caller may proceed.
pub const MON_OK: u32 = 0;
/// Monitor status code: the caller has been enqueued and must be switched
/// out until ownership is handed to it.
pub const MON_BLOCKED: u32 = 1;
