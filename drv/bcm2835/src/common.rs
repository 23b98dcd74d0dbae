// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Support code shared by the individual drivers.

use core::marker::PhantomData;
use core::ops;

/// Overlays a `tock-registers` register block on a fixed MMIO address.
pub struct MMIODerefWrapper<T> {
    start_addr: usize,
    phantom: PhantomData<fn() -> T>,
}

impl<T> MMIODerefWrapper<T> {
    /// Creates an instance.
    ///
    /// # Safety
    ///
    /// - The user must ensure to provide a correct MMIO start address.
    pub const unsafe fn new(start_addr: usize) -> Self {
        Self {
            start_addr,
            phantom: PhantomData,
        }
    }
}

impl<T> ops::Deref for MMIODerefWrapper<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*(self.start_addr as *const _) }
    }
}

/// Burns roughly `cycles` CPU cycles. Several peripheral setup sequences
/// require fixed settle delays with no status bit to poll.
pub fn spin_for_cycles(cycles: usize) {
    for _ in 0..cycles {
        core::hint::spin_loop();
    }
}
