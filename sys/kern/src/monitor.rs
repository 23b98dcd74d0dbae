// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hoare-style monitors.
//!
//! A monitor is a mutual-exclusion region with one condition variable. At
//! most one process owns a monitor at a time; ownership is handed off
//! directly, never re-contended. A process blocked in `enter` waits on the
//! entry queue; `exit` pops that queue and the popped process *is* the new
//! owner when it next runs. `wait` parks the caller on the condition queue
//! and releases the monitor in the same step; `notify` moves one waiter
//! from the condition queue back onto the entry queue, where it reacquires
//! ownership through the normal handoff.
//!
//! Both queues order by caller priority, so the most important blocked
//! process always acquires first.
//!
//! Monitor ids are handed out to user code, so a bad id is an illegal
//! *argument*; calling exit/wait/notify without holding the monitor is an
//! illegal *state*. Both are fatal, this kernel does not hand errors back
//! to user code.

use crate::fail::PanicCode;
use crate::proc::ProcTable;
use crate::queue::ProcQueue;
use toast_abi::{MAX_MONITOR, MON_BLOCKED, MON_OK};

/// Outcome of a monitor operation, as reported to the calling process.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MonStatus {
    /// The caller holds the monitor and may proceed.
    Ok,
    /// The caller has been queued and must be switched out.
    Blocked,
}

impl MonStatus {
    /// The ABI encoding of this status.
    pub fn code(self) -> u32 {
        match self {
            MonStatus::Ok => MON_OK,
            MonStatus::Blocked => MON_BLOCKED,
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
struct Monitor {
    allocated: bool,
    owner: Option<usize>,
    /// Processes blocked trying to acquire the monitor.
    entry: ProcQueue,
    /// Processes parked in `wait`, pending a notify.
    cond: ProcQueue,
}

/// The fixed pool of monitors.
#[derive(Default)]
pub struct MonitorTable {
    slots: [Monitor; MAX_MONITOR],
}

impl MonitorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a monitor and returns its id.
    pub fn create(&mut self) -> Result<usize, PanicCode> {
        let mid = self
            .slots
            .iter()
            .position(|m| !m.allocated)
            .ok_or(PanicCode::OutOfMonitors)?;
        self.slots[mid] = Monitor {
            allocated: true,
            ..Monitor::default()
        };
        Ok(mid)
    }

    fn lookup_mut(&mut self, mid: usize) -> Result<&mut Monitor, PanicCode> {
        match self.slots.get_mut(mid) {
            Some(m) if m.allocated => Ok(m),
            _ => Err(PanicCode::IllegalArg),
        }
    }

    /// Attempts to acquire monitor `mid` for process `caller`.
    ///
    /// Returns [`MonStatus::Blocked`] if the monitor is held, in which case
    /// the caller has been placed on the entry queue and must be switched
    /// out. Re-entering a monitor the caller already holds is fatal; these
    /// monitors are not reentrant.
    pub fn enter(
        &mut self,
        procs: &mut ProcTable,
        mid: usize,
        caller: usize,
    ) -> Result<MonStatus, PanicCode> {
        let priority = u64::from(procs.get(caller)?.priority().0);
        let m = self.lookup_mut(mid)?;
        match m.owner {
            None => {
                m.owner = Some(caller);
                Ok(MonStatus::Ok)
            }
            Some(owner) if owner == caller => Err(PanicCode::IllegalState),
            Some(_) => {
                m.entry.insert(procs, caller, priority)?;
                Ok(MonStatus::Blocked)
            }
        }
    }

    /// Releases monitor `mid`, which `caller` must hold.
    ///
    /// If a process is blocked on the entry queue, ownership passes to it
    /// and its index is returned so the scheduler can make it ready.
    pub fn exit(
        &mut self,
        procs: &mut ProcTable,
        mid: usize,
        caller: usize,
    ) -> Result<Option<usize>, PanicCode> {
        let m = self.lookup_mut(mid)?;
        if m.owner != Some(caller) {
            return Err(PanicCode::IllegalState);
        }
        let successor = m.entry.pop(procs)?;
        m.owner = successor;
        Ok(successor)
    }

    /// Parks `caller` on the condition queue and releases the monitor.
    ///
    /// The caller always blocks. As with [`Self::exit`], a successor pulled
    /// from the entry queue is returned for the scheduler to make ready.
    pub fn wait(
        &mut self,
        procs: &mut ProcTable,
        mid: usize,
        caller: usize,
    ) -> Result<Option<usize>, PanicCode> {
        let priority = u64::from(procs.get(caller)?.priority().0);
        let m = self.lookup_mut(mid)?;
        if m.owner != Some(caller) {
            return Err(PanicCode::IllegalState);
        }
        m.cond.insert(procs, caller, priority)?;
        let successor = m.entry.pop(procs)?;
        m.owner = successor;
        Ok(successor)
    }

    /// Moves one waiter from the condition queue to the entry queue.
    ///
    /// The caller keeps the monitor; the notified process reacquires it
    /// through the ordinary entry-queue handoff once the caller lets go.
    /// Notifying with no waiters is a no-op.
    pub fn notify(
        &mut self,
        procs: &mut ProcTable,
        mid: usize,
        caller: usize,
    ) -> Result<(), PanicCode> {
        let m = self.lookup_mut(mid)?;
        if m.owner != Some(caller) {
            return Err(PanicCode::IllegalState);
        }
        if let Some(waiter) = m.cond.pop(procs)? {
            let priority = u64::from(procs.get(waiter)?.priority().0);
            let m = self.lookup_mut(mid)?;
            m.entry.insert(procs, waiter, priority)?;
        }
        Ok(())
    }

    /// Current owner of monitor `mid`, if the id is valid.
    pub fn owner_of(&self, mid: usize) -> Option<usize> {
        self.slots.get(mid).filter(|m| m.allocated)?.owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toast_abi::{Priority, MAX_MONITOR};

    fn table_with(n: usize) -> ProcTable {
        let mut t = ProcTable::new();
        for i in 0..n {
            t.create(0x8000, 0x1000, 0, Priority(i as u32), None)
                .unwrap();
        }
        t
    }

    #[test]
    fn pool_exhaustion() {
        let mut mons = MonitorTable::new();
        for i in 0..MAX_MONITOR {
            assert_eq!(mons.create().unwrap(), i);
        }
        assert_eq!(mons.create(), Err(PanicCode::OutOfMonitors));
    }

    #[test]
    fn bad_id_is_illegal_arg() {
        let mut t = table_with(1);
        let mut mons = MonitorTable::new();
        assert_eq!(
            mons.enter(&mut t, 0, 0),
            Err(PanicCode::IllegalArg)
        );
        mons.create().unwrap();
        assert_eq!(
            mons.enter(&mut t, 9, 0),
            Err(PanicCode::IllegalArg)
        );
    }

    #[test]
    fn uncontended_enter_and_exit() {
        let mut t = table_with(1);
        let mut mons = MonitorTable::new();
        let mid = mons.create().unwrap();
        assert_eq!(mons.enter(&mut t, mid, 0).unwrap(), MonStatus::Ok);
        assert_eq!(mons.owner_of(mid), Some(0));
        assert_eq!(mons.exit(&mut t, mid, 0).unwrap(), None);
        assert_eq!(mons.owner_of(mid), None);
    }

    #[test]
    fn contended_enter_blocks_and_exit_hands_off() {
        let mut t = table_with(2);
        let mut mons = MonitorTable::new();
        let mid = mons.create().unwrap();
        assert_eq!(mons.enter(&mut t, mid, 0).unwrap(), MonStatus::Ok);
        assert_eq!(mons.enter(&mut t, mid, 1).unwrap(), MonStatus::Blocked);
        // Exit hands the monitor directly to the blocked process.
        assert_eq!(mons.exit(&mut t, mid, 0).unwrap(), Some(1));
        assert_eq!(mons.owner_of(mid), Some(1));
    }

    #[test]
    fn handoff_prefers_higher_priority() {
        let mut t = table_with(4);
        let mut mons = MonitorTable::new();
        let mid = mons.create().unwrap();
        mons.enter(&mut t, mid, 0).unwrap();
        // 3 (prio 3) queues first, then 1 (prio 1); 1 must win the handoff.
        mons.enter(&mut t, mid, 3).unwrap();
        mons.enter(&mut t, mid, 1).unwrap();
        assert_eq!(mons.exit(&mut t, mid, 0).unwrap(), Some(1));
        assert_eq!(mons.exit(&mut t, mid, 1).unwrap(), Some(3));
    }

    #[test]
    fn reenter_is_fatal() {
        let mut t = table_with(1);
        let mut mons = MonitorTable::new();
        let mid = mons.create().unwrap();
        mons.enter(&mut t, mid, 0).unwrap();
        assert_eq!(
            mons.enter(&mut t, mid, 0),
            Err(PanicCode::IllegalState)
        );
    }

    #[test]
    fn exit_by_non_owner_is_fatal() {
        let mut t = table_with(2);
        let mut mons = MonitorTable::new();
        let mid = mons.create().unwrap();
        mons.enter(&mut t, mid, 0).unwrap();
        assert_eq!(
            mons.exit(&mut t, mid, 1),
            Err(PanicCode::IllegalState)
        );
        assert_eq!(
            mons.notify(&mut t, mid, 1),
            Err(PanicCode::IllegalState)
        );
        assert_eq!(
            mons.wait(&mut t, mid, 1),
            Err(PanicCode::IllegalState)
        );
    }

    #[test]
    fn wait_releases_and_notify_requeues() {
        let mut t = table_with(3);
        let mut mons = MonitorTable::new();
        let mid = mons.create().unwrap();
        mons.enter(&mut t, mid, 0).unwrap();
        mons.enter(&mut t, mid, 1).unwrap();
        // 0 waits; the monitor passes to 1 off the entry queue.
        assert_eq!(mons.wait(&mut t, mid, 0).unwrap(), Some(1));
        assert_eq!(mons.owner_of(mid), Some(1));
        // 1 notifies: 0 moves to the entry queue but 1 keeps ownership.
        mons.notify(&mut t, mid, 1).unwrap();
        assert_eq!(mons.owner_of(mid), Some(1));
        // When 1 exits, 0 reacquires.
        assert_eq!(mons.exit(&mut t, mid, 1).unwrap(), Some(0));
        assert_eq!(mons.owner_of(mid), Some(0));
    }

    #[test]
    fn wait_with_no_entry_queue_frees_the_monitor() {
        let mut t = table_with(1);
        let mut mons = MonitorTable::new();
        let mid = mons.create().unwrap();
        mons.enter(&mut t, mid, 0).unwrap();
        assert_eq!(mons.wait(&mut t, mid, 0).unwrap(), None);
        assert_eq!(mons.owner_of(mid), None);
    }

    #[test]
    fn notify_with_no_waiters_is_a_no_op() {
        let mut t = table_with(1);
        let mut mons = MonitorTable::new();
        let mid = mons.create().unwrap();
        mons.enter(&mut t, mid, 0).unwrap();
        mons.notify(&mut t, mid, 0).unwrap();
        assert_eq!(mons.owner_of(mid), Some(0));
    }
}
