// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kernel fatal-error handling.
//!
//! The kernel has exactly one response to a violated invariant: report a
//! numeric code and stop. There is no unwinding and no recovery, because a
//! corrupt process table or queue cannot be trusted to keep scheduling.

use crate::device::Device;
use toast_abi::SYS_LED_RED;

/// Numeric causes of a kernel stop.
///
/// The discriminants are a diagnostic ABI: they are reported on the console
/// and are what a person at the serial port or a test harness matches on, so
/// they must stay stable.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum PanicCode {
    /// Deliberate stop (end of a demo program, or the trap layer's
    /// last-resort handler).
    Hang = 1,
    /// A syscall argument was out of range.
    IllegalArg = 2,
    /// An operation was issued in a state that forbids it, such as a
    /// monitor call by a process that does not hold the monitor.
    IllegalState = 3,
    /// The syscall number decoded from the trap is not assigned. The router
    /// logs and ignores unknown numbers; this code is reserved for the trap
    /// layer's own decode failures.
    InvalidSyscall = 4,
    /// A queue that must not be empty was popped.
    EmptyQueue = 5,
    /// A pid named a slot that holds no process.
    NoProcess = 6,
    /// A queue link named a different slot than the one stored there.
    WrongProcess = 7,
    /// The process table is full.
    OutOfProcesses = 8,
    /// A process-table slot's bookkeeping flags are inconsistent.
    InvalidProcState = 9,
    /// A process-table slot's identity sentinel was overwritten.
    InvalidProcMagic = 10,
    /// A process's stack sentinel was overwritten.
    StackOverflow = 11,
    /// The monitor pool is full.
    OutOfMonitors = 12,
    /// A monitor's bookkeeping is inconsistent.
    InvalidMonitorState = 13,
    /// The kernel was started twice.
    AlreadyInitialized = 14,
}

/// Stops the kernel, reporting `code`.
///
/// On hardware this parks the CPU with the red system LED lit, leaving the
/// console report as the last output. On the host it panics, which is what
/// lets tests assert on the fatal path.
pub fn die<D: Device>(device: &mut D, code: PanicCode) -> ! {
    crate::klog!(device, "\r\nkernel panic: code={}\r\n", code as u32);
    cfg_if::cfg_if! {
        if #[cfg(target_os = "none")] {
            device.gpio_write(SYS_LED_RED, true);
            loop {
                core::hint::spin_loop();
            }
        } else {
            let _ = SYS_LED_RED;
            panic!("kernel panic: code={}", code as u32);
        }
    }
}
