// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sorted process queues.
//!
//! A queue is just a head index; the links and sort keys live inside the
//! process records themselves, so a process occupies no storage beyond its
//! table slot and can sit on at most one queue at a time. Insertion is a
//! linear scan, which is fine at eight processes.
//!
//! Ordering is by ascending key with FIFO tie-breaking: a new process goes
//! *after* every queued process whose key is less than or equal to its own.
//! With priority numbers as keys this yields priority order with
//! round-robin among equals; with wake deadlines as keys it yields
//! earliest-deadline order.

use crate::fail::PanicCode;
use crate::proc::ProcTable;

/// A priority queue of processes, threaded through the process table.
#[derive(Copy, Clone, Debug, Default)]
pub struct ProcQueue {
    head: Option<usize>,
}

impl ProcQueue {
    pub const fn new() -> Self {
        Self { head: None }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Index at the front of the queue, if any.
    pub fn peek(&self) -> Option<usize> {
        self.head
    }

    /// Inserts process `index` with sort key `key`, maintaining ascending
    /// key order and FIFO order among equal keys.
    pub fn insert(
        &mut self,
        procs: &mut ProcTable,
        index: usize,
        key: u64,
    ) -> Result<(), PanicCode> {
        // A process with a live link is already on some queue; inserting it
        // again would cross-link two queues.
        if procs.get(index)?.next().is_some() {
            return Err(PanicCode::InvalidProcState);
        }
        procs.get_mut(index)?.set_key(key);

        let mut prev = None;
        let mut cursor = self.head;
        while let Some(c) = cursor {
            let entry = procs.get(c)?;
            if key < entry.key() {
                break;
            }
            prev = Some(c);
            cursor = entry.next();
        }

        procs.get_mut(index)?.set_next(cursor);
        match prev {
            None => self.head = Some(index),
            Some(p) => procs.get_mut(p)?.set_next(Some(index)),
        }
        Ok(())
    }

    /// Removes and returns the front of the queue, or `None` if empty.
    pub fn pop(
        &mut self,
        procs: &mut ProcTable,
    ) -> Result<Option<usize>, PanicCode> {
        let Some(index) = self.head else {
            return Ok(None);
        };
        let entry = procs.get_mut(index)?;
        self.head = entry.next();
        entry.set_next(None);
        Ok(Some(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toast_abi::Priority;

    fn table_with(n: usize) -> ProcTable {
        let mut t = ProcTable::new();
        for i in 0..n {
            t.create(0x8000, 0x1000, 0, Priority(i as u32), None)
                .unwrap();
        }
        t
    }

    fn drain(q: &mut ProcQueue, procs: &mut ProcTable) -> Vec<usize> {
        let mut out = Vec::new();
        while let Some(i) = q.pop(procs).unwrap() {
            out.push(i);
        }
        out
    }

    #[test]
    fn pop_of_empty_queue_is_none() {
        let mut t = table_with(1);
        let mut q = ProcQueue::new();
        assert_eq!(q.pop(&mut t).unwrap(), None);
    }

    #[test]
    fn ascending_key_order() {
        let mut t = table_with(4);
        let mut q = ProcQueue::new();
        q.insert(&mut t, 0, 9).unwrap();
        q.insert(&mut t, 1, 2).unwrap();
        q.insert(&mut t, 2, 5).unwrap();
        q.insert(&mut t, 3, 1).unwrap();
        assert_eq!(drain(&mut q, &mut t), vec![3, 1, 2, 0]);
    }

    #[test]
    fn equal_keys_are_fifo() {
        // Keys 5, 2, 2, 9: the two 2s must come out in insertion order.
        let mut t = table_with(4);
        let mut q = ProcQueue::new();
        q.insert(&mut t, 0, 5).unwrap();
        q.insert(&mut t, 1, 2).unwrap();
        q.insert(&mut t, 2, 2).unwrap();
        q.insert(&mut t, 3, 9).unwrap();
        assert_eq!(drain(&mut q, &mut t), vec![1, 2, 0, 3]);
    }

    #[test]
    fn insert_at_head_of_nonempty_queue() {
        let mut t = table_with(2);
        let mut q = ProcQueue::new();
        q.insert(&mut t, 0, 7).unwrap();
        q.insert(&mut t, 1, 3).unwrap();
        assert_eq!(q.peek(), Some(1));
    }

    #[test]
    fn double_insert_is_detected() {
        let mut t = table_with(3);
        let mut q = ProcQueue::new();
        q.insert(&mut t, 0, 1).unwrap();
        q.insert(&mut t, 1, 2).unwrap();
        // Process 0 is queued with a live link; queueing it again is a
        // bookkeeping fault.
        assert_eq!(
            q.insert(&mut t, 0, 3),
            Err(PanicCode::InvalidProcState)
        );
    }

    #[test]
    fn popped_process_can_be_reinserted() {
        let mut t = table_with(2);
        let mut q = ProcQueue::new();
        q.insert(&mut t, 0, 1).unwrap();
        q.insert(&mut t, 1, 2).unwrap();
        let first = q.pop(&mut t).unwrap().unwrap();
        assert_eq!(first, 0);
        q.insert(&mut t, first, 5).unwrap();
        assert_eq!(drain(&mut q, &mut t), vec![1, 0]);
    }
}
