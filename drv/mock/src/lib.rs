// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host-side stand-in for the SoC.
//!
//! Implements the kernel's hardware capability against plain data
//! structures: a scriptable virtual clock instead of the system timer, a
//! captured byte buffer instead of the UART, a write log instead of GPIO
//! pads, and registered buffers instead of physical user memory. Tests
//! drive time with [`MockDevice::advance`] and deliver quantum interrupts
//! with [`MockDevice::fire_timer`], so every scheduling decision is
//! deterministic and observable.

use std::collections::VecDeque;

use toast_kern::device::Device;
use toast_kern::time::Timestamp;

/// Scriptable [`Device`] implementation.
#[derive(Default)]
pub struct MockDevice {
    clock: u64,
    timer_pending: bool,
    timer_quantum: Option<u32>,
    console: Vec<u8>,
    gpio: Vec<(u32, bool)>,
    input: VecDeque<u8>,
    user_mem: Vec<(u32, Vec<u8>)>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the virtual clock forward.
    pub fn advance(&mut self, micros: u64) {
        self.clock += micros;
    }

    /// Sets the virtual clock to an absolute value.
    pub fn set_clock(&mut self, micros: u64) {
        self.clock = micros;
    }

    /// Raises the quantum-timer interrupt line, as the hardware would at
    /// the end of a quantum.
    pub fn fire_timer(&mut self) {
        self.timer_pending = true;
    }

    /// Reload value passed to `timer_start`, if the kernel armed the timer.
    pub fn timer_quantum(&self) -> Option<u32> {
        self.timer_quantum
    }

    /// Everything written to the console so far, lossily decoded.
    pub fn console_text(&self) -> String {
        String::from_utf8_lossy(&self.console).into_owned()
    }

    /// The sequence of GPIO writes observed, in order.
    pub fn gpio_writes(&self) -> &[(u32, bool)] {
        &self.gpio
    }

    /// Queues a byte for `getc`.
    pub fn push_input(&mut self, byte: u8) {
        self.input.push_back(byte);
    }

    /// Backs a range of the flat user address space with `bytes`, so the
    /// kernel's `user_byte` reads see them.
    pub fn map_user(&mut self, base: u32, bytes: &[u8]) {
        self.user_mem.push((base, bytes.to_vec()));
    }
}

impl Device for MockDevice {
    fn now(&self) -> Timestamp {
        Timestamp::from(self.clock)
    }

    fn timer_start(&mut self, quantum: u32) {
        self.timer_quantum = Some(quantum);
    }

    fn timer_pending(&self) -> bool {
        self.timer_pending
    }

    fn timer_ack(&mut self) {
        self.timer_pending = false;
    }

    fn gpio_write(&mut self, pin: u32, level: bool) {
        self.gpio.push((pin, level));
    }

    fn putc(&mut self, byte: u8) {
        self.console.push(byte);
    }

    fn getc(&mut self) -> u8 {
        self.input.pop_front().unwrap_or(0)
    }

    fn user_byte(&self, addr: u32) -> u8 {
        for (base, bytes) in &self.user_mem {
            if addr >= *base {
                let offset = (addr - base) as usize;
                if offset < bytes.len() {
                    return bytes[offset];
                }
            }
        }
        0
    }
}
