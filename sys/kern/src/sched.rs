// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kernel state and the dispatcher.
//!
//! All kernel state lives in one [`Kernel`] value: the process and monitor
//! tables, the ready and sleep queues, and the injected hardware capability.
//! The trap layer constructs it once at boot, calls [`Kernel::start`], and
//! from then on funnels every timer interrupt into [`Kernel::schedule`] and
//! every software trap into
//! [`Kernel::route_syscall`](crate::syscalls).
//!
//! The dispatcher's rules are deliberately small:
//!
//! - exactly one process is running; everyone else is queued or inert,
//! - preemption happens only when the quantum timer is pending,
//! - the ready queue is never empty, because the idle process sits at the
//!   bottom priority and never blocks or exits.

use crate::device::Device;
use crate::fail::{self, PanicCode};
use crate::monitor::MonitorTable;
use crate::proc::ProcTable;
use crate::queue::ProcQueue;
use toast_abi::{Priority, SYS_LED_BLUE};

/// Startup parameters, fixed at boot.
#[derive(Copy, Clone, Debug)]
pub struct KernelConfig {
    /// Reload value for the periodic quantum timer.
    pub quantum: u32,
    /// Address of the user-mode trampoline that every new process starts
    /// at. The trampoline calls through r0 (the real entry point) with r1
    /// as argument, and issues the exit syscall if that call returns.
    pub trampoline: u32,
    /// Entry point and argument of the root process.
    pub root_entry: u32,
    pub root_param: u32,
    /// Entry point of the idle process, the priority floor.
    pub idle_entry: u32,
}

/// The kernel.
pub struct Kernel<D> {
    procs: ProcTable,
    monitors: MonitorTable,
    ready: ProcQueue,
    asleep: ProcQueue,
    device: D,
    config: KernelConfig,
    started: bool,
    /// Heartbeat LED level, toggled on every quantum tick.
    pulse: bool,
}

impl<D: Device> Kernel<D> {
    pub fn new(config: KernelConfig, device: D) -> Self {
        Self {
            procs: ProcTable::new(),
            monitors: MonitorTable::new(),
            ready: ProcQueue::new(),
            asleep: ProcQueue::new(),
            device,
            config,
            started: false,
            pulse: false,
        }
    }

    /// Brings the kernel up: creates the root and idle processes, arms the
    /// quantum timer, and returns the index of the first process to resume
    /// (the root, being the only non-idle process).
    ///
    /// Calling this twice is fatal.
    pub fn start(&mut self) -> usize {
        match self.start_inner() {
            Ok(first) => first,
            Err(code) => fail::die(&mut self.device, code),
        }
    }

    fn start_inner(&mut self) -> Result<usize, PanicCode> {
        if self.started {
            return Err(PanicCode::AlreadyInitialized);
        }
        self.started = true;

        crate::klog!(&mut self.device, "TOAST kernel starting\r\n");

        let root = self.spawn(
            self.config.root_entry,
            self.config.root_param,
            Priority(0),
            None,
        )?;
        self.ready_insert(root)?;
        let idle = self.spawn(self.config.idle_entry, 0, Priority::IDLE, None)?;
        self.ready_insert(idle)?;

        self.device.timer_start(self.config.quantum);

        // Everyone queues; the ordinary pop picks the first process to run
        // (the root, being the only non-idle process).
        crate::klog!(&mut self.device, "dispatching root process\r\n");
        self.pop_ready()
    }

    /// Creates a process and logs it. The caller is responsible for putting
    /// it on the ready queue.
    pub(crate) fn spawn(
        &mut self,
        entry_point: u32,
        init_param: u32,
        priority: Priority,
        parent: Option<usize>,
    ) -> Result<usize, PanicCode> {
        let parent = parent.map(|i| self.procs.get(i)).transpose()?.map(|p| p.pid());
        let index = self.procs.create(
            self.config.trampoline,
            entry_point,
            init_param,
            priority,
            parent,
        )?;
        crate::klog!(
            &mut self.device,
            "created process {} priority {}\r\n",
            index,
            priority.0
        );
        Ok(index)
    }

    /// Timer entry point. Called by the trap layer on every hardware
    /// interrupt with the index of the interrupted process; returns the
    /// index of the process to resume.
    pub fn schedule(&mut self, running: usize) -> usize {
        match self.schedule_inner(running) {
            Ok(next) => next,
            Err(code) => fail::die(&mut self.device, code),
        }
    }

    fn schedule_inner(&mut self, running: usize) -> Result<usize, PanicCode> {
        // Never act on a corrupted record.
        self.procs.get(running)?;

        self.rouse()?;

        if !self.device.timer_pending() {
            return Ok(running);
        }
        self.device.timer_ack();

        self.pulse = !self.pulse;
        self.device.gpio_write(SYS_LED_BLUE, self.pulse);

        self.ready_insert(running)?;
        self.pop_ready()
    }

    /// Moves every sleeper whose deadline has passed back onto the ready
    /// queue, in deadline order.
    pub(crate) fn rouse(&mut self) -> Result<(), PanicCode> {
        let now = self.device.now().micros();
        while let Some(head) = self.asleep.peek() {
            if self.procs.get(head)?.key() > now {
                break;
            }
            match self.asleep.pop(&mut self.procs)? {
                Some(index) => self.ready_insert(index)?,
                None => break,
            }
        }
        Ok(())
    }

    /// Enqueues a live process on the ready queue at its own priority.
    pub(crate) fn ready_insert(
        &mut self,
        index: usize,
    ) -> Result<(), PanicCode> {
        let priority = self.procs.get(index)?.priority();
        self.ready
            .insert(&mut self.procs, index, u64::from(priority.0))
    }

    /// Parks a process on the sleep queue until `deadline` (absolute
    /// microseconds).
    pub(crate) fn sleep_insert(
        &mut self,
        index: usize,
        deadline: u64,
    ) -> Result<(), PanicCode> {
        self.asleep.insert(&mut self.procs, index, deadline)
    }

    /// Pops the next process to run. The idle process guarantees the ready
    /// queue is never empty while the kernel is healthy, so an empty pop
    /// here is fatal.
    pub(crate) fn pop_ready(&mut self) -> Result<usize, PanicCode> {
        self.ready
            .pop(&mut self.procs)?
            .ok_or(PanicCode::EmptyQueue)
    }

    pub fn procs(&self) -> &ProcTable {
        &self.procs
    }

    pub(crate) fn procs_mut(&mut self) -> &mut ProcTable {
        &mut self.procs
    }

    pub fn monitors(&self) -> &MonitorTable {
        &self.monitors
    }

    pub(crate) fn parts_mut(
        &mut self,
    ) -> (&mut ProcTable, &mut MonitorTable, &mut D) {
        (&mut self.procs, &mut self.monitors, &mut self.device)
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// True if `index` is queued on the ready queue (test support; linear
    /// scan through the links).
    pub fn is_ready(&self, index: usize) -> bool {
        let mut cursor = self.ready.peek();
        while let Some(c) = cursor {
            if c == index {
                return true;
            }
            cursor = self.procs.get(c).ok().and_then(|p| p.next());
        }
        false
    }
}
