// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Implementation of kernel time.

/// In-kernel timestamp representation.
///
/// This is measured in microseconds since an arbitrary epoch, matching the
/// platform's free-running system timer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Default)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Raw microsecond count.
    pub fn micros(self) -> u64 {
        self.0
    }

    /// Timestamp truncated to whole milliseconds.
    pub fn millis(self) -> u64 {
        self.0 / 1000
    }

    /// Produces the timestamp `millis` milliseconds after `self`. Used to
    /// compute sleep deadlines.
    pub fn plus_millis(self, millis: u32) -> Timestamp {
        Timestamp(self.0 + 1000 * u64::from(millis))
    }
}

impl From<u64> for Timestamp {
    fn from(v: u64) -> Self {
        Timestamp(v)
    }
}

impl From<Timestamp> for u64 {
    fn from(v: Timestamp) -> Self {
        v.0
    }
}
