// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The process table.
//!
//! Processes live in a fixed array of [`MAX_PROCESS`] slots. A slot is
//! reserved for life: termination marks it `TERMINATED` but never returns it
//! to the allocator, so a pid stays valid (and dead) forever and can never
//! silently start naming a different process. Each slot carries two
//! sentinels, one guarding the record itself and one at the low end of the
//! slot's stack, and every kernel entry re-checks them before trusting the
//! record.

use crate::context::SavedState;
use crate::fail::PanicCode;
use toast_abi::{Pid, Priority, MAX_PROCESS, STACK_WORDS};

/// Identity sentinel stamped into every live process record.
pub const PROC_SENTINEL: u32 = 2112;

/// Sentinel planted at the low end of each stack; an overwrite means the
/// process ran off the end of its stack.
pub const STACK_SENTINEL: u32 = 0x4242_4242;

bitflags::bitflags! {
    /// Bookkeeping state of a process-table slot.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    pub struct ProcFlags: u32 {
        /// Slot holds a process. Never cleared once set.
        const ALLOCATED = 1 << 0;
        /// Process has exited and must not be scheduled again.
        const TERMINATED = 1 << 1;
    }
}

/// A process-table slot.
#[derive(Clone, Debug)]
pub struct Process {
    sentinel: u32,
    pid: Pid,
    parent: Option<Pid>,
    flags: ProcFlags,
    priority: Priority,
    exit_code: u32,
    save: SavedState,
    stack: [u32; STACK_WORDS],
    /// Index of the process after this one in whichever queue this process
    /// is on, or `None` at the tail (and while off-queue).
    next: Option<usize>,
    /// Sort key in the queue currently holding this process. The field is
    /// shared: the ready queue stores the 32-bit priority number here, the
    /// sleep queue the 64-bit wake deadline. Only one use is active at a
    /// time because a process sits on at most one queue.
    key: u64,
}

impl Default for Process {
    fn default() -> Self {
        Self {
            sentinel: 0,
            pid: Pid::default(),
            parent: None,
            flags: ProcFlags::empty(),
            priority: Priority::default(),
            exit_code: 0,
            save: SavedState::default(),
            stack: [0; STACK_WORDS],
            next: None,
            key: 0,
        }
    }
}

impl Process {
    /// Address just past this slot's stack, where the stack pointer starts.
    pub fn stack_top(&self) -> u32 {
        (self.stack.as_ptr() as usize + STACK_WORDS * 4) as u32
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Pid of the process that forked this one, or `None` for the processes
    /// the kernel creates at startup.
    pub fn parent(&self) -> Option<Pid> {
        self.parent
    }

    /// Code passed to the exit syscall. Meaningful only once terminated.
    pub fn exit_code(&self) -> u32 {
        self.exit_code
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn flags(&self) -> ProcFlags {
        self.flags
    }

    /// Checks whether this process may still be scheduled.
    pub fn is_live(&self) -> bool {
        self.flags.contains(ProcFlags::ALLOCATED)
            && !self.flags.contains(ProcFlags::TERMINATED)
    }

    /// Read access to the saved context.
    pub fn save(&self) -> &SavedState {
        &self.save
    }

    /// Write access to the saved context, for depositing syscall return
    /// values.
    pub fn save_mut(&mut self) -> &mut SavedState {
        &mut self.save
    }

    pub fn next(&self) -> Option<usize> {
        self.next
    }

    pub fn set_next(&mut self, next: Option<usize>) {
        self.next = next;
    }

    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn set_key(&mut self, key: u64) {
        self.key = key;
    }

    /// Verifies the slot's sentinels and its recorded identity against the
    /// index it was found at.
    pub fn check(&self, index: usize) -> Result<(), PanicCode> {
        if self.sentinel != PROC_SENTINEL {
            return Err(PanicCode::InvalidProcMagic);
        }
        if self.pid.index() != index {
            return Err(PanicCode::WrongProcess);
        }
        if self.stack[0] != STACK_SENTINEL {
            return Err(PanicCode::StackOverflow);
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn corrupt_sentinel(&mut self) {
        self.sentinel = 0xdead;
    }

    #[cfg(test)]
    pub(crate) fn corrupt_stack(&mut self) {
        self.stack[0] = 0;
    }
}

/// The fixed process table.
#[derive(Default)]
pub struct ProcTable {
    slots: [Process; MAX_PROCESS],
}

impl ProcTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a slot and builds the initial context for a new process.
    ///
    /// Only never-used slots are candidates; terminated slots stay out of
    /// the pool so stale pids can never be reissued. Returns the new
    /// process's table index.
    pub fn create(
        &mut self,
        trampoline: u32,
        entry_point: u32,
        init_param: u32,
        priority: Priority,
        parent: Option<Pid>,
    ) -> Result<usize, PanicCode> {
        let index = self
            .slots
            .iter()
            .position(|p| p.flags.is_empty())
            .ok_or(PanicCode::OutOfProcesses)?;

        let stack_top = self.slots[index].stack_top();
        let slot = &mut self.slots[index];
        slot.sentinel = PROC_SENTINEL;
        slot.pid = Pid::from_index(index);
        slot.parent = parent;
        slot.flags = ProcFlags::ALLOCATED;
        slot.priority = priority;
        slot.exit_code = 0;
        slot.save =
            SavedState::initial(trampoline, entry_point, init_param, stack_top);
        slot.stack[0] = STACK_SENTINEL;
        slot.next = None;
        slot.key = 0;
        Ok(index)
    }

    /// Looks up a live-or-dead process by index, checking its sentinels.
    pub fn get(&self, index: usize) -> Result<&Process, PanicCode> {
        let slot = self.slots.get(index).ok_or(PanicCode::NoProcess)?;
        if !slot.flags.contains(ProcFlags::ALLOCATED) {
            return Err(PanicCode::NoProcess);
        }
        slot.check(index)?;
        Ok(slot)
    }

    /// Mutable variant of [`Self::get`].
    pub fn get_mut(
        &mut self,
        index: usize,
    ) -> Result<&mut Process, PanicCode> {
        let slot = self.slots.get_mut(index).ok_or(PanicCode::NoProcess)?;
        if !slot.flags.contains(ProcFlags::ALLOCATED) {
            return Err(PanicCode::NoProcess);
        }
        slot.check(index)?;
        Ok(slot)
    }

    /// Marks a process as exited and records its exit code. The slot is not
    /// reused; a stale pid keeps naming this dead process forever, a known
    /// limitation of the fixed-table design.
    pub fn terminate(
        &mut self,
        index: usize,
        exit_code: u32,
    ) -> Result<(), PanicCode> {
        let slot = self.get_mut(index)?;
        if slot.flags.contains(ProcFlags::TERMINATED) {
            return Err(PanicCode::InvalidProcState);
        }
        // A queued process must not die: the queue would later pop and
        // schedule the corpse.
        if slot.next.is_some() {
            return Err(PanicCode::InvalidProcState);
        }
        slot.flags |= ProcFlags::TERMINATED;
        slot.exit_code = exit_code;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toast_abi::{REG_R0, REG_R1, REG_SP};

    fn table_with(n: usize) -> ProcTable {
        let mut t = ProcTable::new();
        for i in 0..n {
            t.create(0x8000, 0x1000 + i as u32, 0, Priority(i as u32), None)
                .unwrap();
        }
        t
    }

    #[test]
    fn create_fills_slots_in_order() {
        let mut t = ProcTable::new();
        for i in 0..MAX_PROCESS {
            let index = t.create(0x8000, 0x1000, 0, Priority(1), None).unwrap();
            assert_eq!(index, i);
            assert_eq!(t.get(index).unwrap().pid(), Pid::from_index(i));
        }
    }

    #[test]
    fn create_builds_context() {
        let mut t = table_with(1);
        let p = t.get_mut(0).unwrap();
        assert_eq!(p.save().pc, 0x8000);
        assert_eq!(p.save().regs[REG_R0], 0x1000);
        assert_eq!(p.save().regs[REG_R1], 0);
        assert_eq!(p.save().regs[REG_SP], p.stack_top());
    }

    #[test]
    fn table_exhaustion() {
        let mut t = table_with(MAX_PROCESS);
        assert_eq!(
            t.create(0x8000, 0x1000, 0, Priority(1), None),
            Err(PanicCode::OutOfProcesses)
        );
    }

    #[test]
    fn terminated_slots_are_not_reused() {
        let mut t = table_with(MAX_PROCESS);
        t.terminate(3, 0).unwrap();
        // The slot is still allocated, just dead.
        assert!(!t.get(3).unwrap().is_live());
        assert_eq!(
            t.create(0x8000, 0x1000, 0, Priority(1), None),
            Err(PanicCode::OutOfProcesses)
        );
    }

    #[test]
    fn double_terminate_is_detected() {
        let mut t = table_with(1);
        t.terminate(0, 0).unwrap();
        assert_eq!(t.terminate(0, 1), Err(PanicCode::InvalidProcState));
    }

    #[test]
    fn terminate_of_enqueued_process_is_detected() {
        let mut t = table_with(2);
        let mut q = crate::queue::ProcQueue::new();
        q.insert(&mut t, 0, 1).unwrap();
        q.insert(&mut t, 1, 2).unwrap();
        // Process 0 is threaded through a queue (live next link); killing
        // it there is a bookkeeping fault.
        assert_eq!(t.terminate(0, 0), Err(PanicCode::InvalidProcState));
        // Once popped off the queue it may die normally.
        q.pop(&mut t).unwrap();
        t.terminate(0, 0).unwrap();
    }

    #[test]
    fn lookup_of_empty_slot_fails() {
        let t = table_with(2);
        assert!(matches!(t.get(5), Err(PanicCode::NoProcess)));
        assert!(matches!(t.get(99), Err(PanicCode::NoProcess)));
    }

    #[test]
    fn sentinel_corruption_is_detected() {
        let mut t = table_with(1);
        t.get_mut(0).unwrap().corrupt_sentinel();
        assert_eq!(t.get(0).err(), Some(PanicCode::InvalidProcMagic));
    }

    #[test]
    fn stack_overwrite_is_detected() {
        let mut t = table_with(1);
        t.get_mut(0).unwrap().corrupt_stack();
        assert_eq!(t.get(0).err(), Some(PanicCode::StackOverflow));
    }
}
