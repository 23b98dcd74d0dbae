// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Architecture-independent syscall implementation.
//!
//! The trap layer decodes a software interrupt into an opcode and the
//! caller's argument registers, then calls [`Kernel::route_syscall`]. The
//! argument vector is read/write: return values are deposited in `args[0]`
//! and written back to the caller's registers by the trap layer.
//!
//! The return value tells the trap layer who runs next: `None` means the
//! caller continues, `Some(index)` means the caller has been parked (or has
//! exited) and `index` must be resumed instead.

use crate::device::Device;
use crate::fail::{self, PanicCode};
use crate::monitor::MonStatus;
use crate::sched::Kernel;
use toast_abi::{Priority, Sysnum, MON_OK};

/// Longest message the log syscall will copy out of user memory.
const LOG_LIMIT: u32 = 256;

impl<D: Device> Kernel<D> {
    /// Syscall entry point.
    ///
    /// Fatal conditions (corrupt caller record, exhausted tables, monitor
    /// misuse) do not return. An unassigned opcode is reported on the
    /// console and ignored, which keeps an experimenting user program alive
    /// at the cost of a silent no-op.
    pub fn route_syscall(
        &mut self,
        running: usize,
        opcode: u32,
        args: &mut [u32; 4],
    ) -> Option<usize> {
        match self.route_inner(running, opcode, args) {
            Ok(next) => next,
            Err(code) => fail::die(self.device_mut(), code),
        }
    }

    fn route_inner(
        &mut self,
        running: usize,
        opcode: u32,
        args: &mut [u32; 4],
    ) -> Result<Option<usize>, PanicCode> {
        // Never act on a corrupted caller.
        self.procs().get(running)?;

        let Ok(sysnum) = Sysnum::try_from(opcode) else {
            // Unknown numbers are logged and ignored rather than killing
            // the system; a typo in a user program should not take the
            // whole machine down.
            crate::klog!(
                self.device_mut(),
                "WARNING: unknown syscall {:#x} from process {}\r\n",
                opcode,
                running
            );
            return Ok(None);
        };

        match sysnum {
            Sysnum::SetLed => {
                let (pin, level) = (args[0], args[1] != 0);
                self.device_mut().gpio_write(pin, level);
                Ok(None)
            }

            Sysnum::ClockMillis => {
                args[0] = self.device().now().millis() as u32;
                Ok(None)
            }

            Sysnum::Fork => {
                let child = self.spawn(
                    args[0],
                    args[1],
                    Priority(args[2]),
                    Some(running),
                )?;
                self.ready_insert(child)?;
                args[0] = child as u32;
                Ok(None)
            }

            Sysnum::MonCreate => {
                let (_, monitors, _) = self.parts_mut();
                args[0] = monitors.create()? as u32;
                Ok(None)
            }

            Sysnum::MonExit => {
                let mid = args[0] as usize;
                let (procs, monitors, _) = self.parts_mut();
                let successor = monitors.exit(procs, mid, running)?;
                if let Some(s) = successor {
                    self.grant_monitor(s)?;
                }
                args[0] = MON_OK;
                Ok(None)
            }

            Sysnum::MonNotify => {
                let mid = args[0] as usize;
                let (procs, monitors, _) = self.parts_mut();
                monitors.notify(procs, mid, running)?;
                args[0] = MON_OK;
                Ok(None)
            }

            Sysnum::GetPid => {
                args[0] = running as u32;
                Ok(None)
            }

            Sysnum::Exit => {
                crate::klog!(
                    self.device_mut(),
                    "process {} exited, code {}\r\n",
                    running,
                    args[0]
                );
                self.procs_mut().terminate(running, args[0])?;
                self.pop_ready().map(Some)
            }

            Sysnum::Yield => {
                self.ready_insert(running)?;
                self.pop_ready().map(Some)
            }

            Sysnum::SleepMillis => {
                let deadline =
                    self.device().now().plus_millis(args[0]).micros();
                self.sleep_insert(running, deadline)?;
                self.pop_ready().map(Some)
            }

            Sysnum::MonEnter => {
                let mid = args[0] as usize;
                let (procs, monitors, _) = self.parts_mut();
                let status = monitors.enter(procs, mid, running)?;
                args[0] = status.code();
                match status {
                    MonStatus::Ok => Ok(None),
                    MonStatus::Blocked => self.pop_ready().map(Some),
                }
            }

            Sysnum::MonWait => {
                let mid = args[0] as usize;
                let (procs, monitors, _) = self.parts_mut();
                let successor = monitors.wait(procs, mid, running)?;
                if let Some(s) = successor {
                    self.grant_monitor(s)?;
                }
                args[0] = MonStatus::Blocked.code();
                self.pop_ready().map(Some)
            }

            Sysnum::Log => {
                self.log_user_message(running, args[0]);
                Ok(None)
            }
        }
    }

    /// Completes a monitor handoff: the process popped from an entry queue
    /// owns the monitor already, so it resumes with an OK status and goes
    /// straight onto the ready queue. It never re-issues the enter.
    fn grant_monitor(&mut self, index: usize) -> Result<(), PanicCode> {
        self.procs_mut().get_mut(index)?.save_mut().set_return(MON_OK);
        self.ready_insert(index)
    }

    /// Copies a NUL-terminated message out of user memory onto the console,
    /// tagged with the sender's pid. Length-capped; there is no MMU to stop
    /// a runaway pointer.
    fn log_user_message(&mut self, running: usize, addr: u32) {
        crate::klog!(self.device_mut(), "P{}: ", running);
        for offset in 0..LOG_LIMIT {
            let byte = self.device().user_byte(addr.wrapping_add(offset));
            if byte == 0 {
                break;
            }
            self.device_mut().putc(byte);
        }
        self.device_mut().puts("\r\n");
    }
}
