// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The hardware capability consumed by the kernel.
//!
//! The kernel itself never touches a register; everything it needs from the
//! platform is collected in the [`Device`] trait and injected at
//! construction. The `drv-bcm2835` crate implements this against the real
//! SoC; `drv-mock` implements it against standard I/O and a scriptable
//! clock, which is how the kernel logic gets exercised off-target.

use crate::time::Timestamp;
use core::fmt;

/// Platform operations required by the kernel.
pub trait Device {
    /// Reads the monotonic microsecond time source.
    fn now(&self) -> Timestamp;

    /// Arms the quantum timer for periodic interrupts with the given reload
    /// value. Called once during kernel startup.
    fn timer_start(&mut self, quantum: u32);

    /// Checks the quantum timer's masked-interrupt line.
    fn timer_pending(&self) -> bool;

    /// Acknowledges a pending quantum-timer interrupt.
    fn timer_ack(&mut self);

    /// Drives a GPIO line high or low.
    fn gpio_write(&mut self, pin: u32, level: bool);

    /// Writes one byte to the console UART.
    fn putc(&mut self, byte: u8);

    /// Reads one byte from the console UART.
    fn getc(&mut self) -> u8;

    /// Reads one byte of user memory on behalf of the kernel. There is no
    /// MMU; user pointers name the single flat address space. The SoC
    /// implementation is a raw read, mocks back this with a registered
    /// buffer. Used by the log syscall to walk its NUL-terminated message.
    fn user_byte(&self, addr: u32) -> u8;

    /// Writes a string to the console.
    fn puts(&mut self, s: &str) {
        for byte in s.bytes() {
            self.putc(byte);
        }
    }

    /// Writes formatted text to the console. This is the sink behind
    /// [`klog!`](crate::klog).
    fn console_write(&mut self, args: fmt::Arguments<'_>) {
        struct Sink<'a, D: ?Sized>(&'a mut D);

        impl<D: Device + ?Sized> fmt::Write for Sink<'_, D> {
            fn write_str(&mut self, s: &str) -> fmt::Result {
                self.0.puts(s);
                Ok(())
            }
        }

        fmt::Write::write_fmt(&mut Sink(self), args).ok();
    }
}

/// Formatted kernel logging through the console driver.
///
/// The first argument is a `&mut impl Device`; the rest is a standard format
/// string. No line ending is appended; the kernel uses `\r\n` explicitly,
/// like the rest of the console traffic.
#[macro_export]
macro_rules! klog {
    ($dev:expr, $($arg:tt)*) => {
        $crate::device::Device::console_write($dev, format_args!($($arg)*))
    };
}
