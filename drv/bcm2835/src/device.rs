// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The SoC as the kernel sees it.

use crate::gpio::{Function, Gpio};
use crate::timer::{ArmTimer, SystemTimer};
use crate::uart::MiniUart;
use crate::{
    ARM_TIMER_BASE, AUX_BASE, GPIO_BASE, IRQ_BASE, SYSTEM_TIMER_BASE,
};
use toast_abi::{SYS_LED_BLUE, SYS_LED_GREEN, SYS_LED_RED, SYS_LED_YELLOW};
use toast_kern::device::Device;
use toast_kern::time::Timestamp;

/// The assembled hardware capability handed to the kernel at boot.
pub struct Soc {
    gpio: Gpio,
    uart: MiniUart,
    clock: SystemTimer,
    timer: ArmTimer,
}

impl Soc {
    /// Claims the peripheral blocks and configures the console UART and the
    /// system LED pins.
    ///
    /// # Safety
    ///
    /// - Must be called at most once, before interrupts are enabled; the
    ///   register blocks are aliased otherwise.
    pub unsafe fn new() -> Self {
        let mut gpio = Gpio::new(GPIO_BASE);
        let mut uart = MiniUart::new(AUX_BASE);
        uart.init(&mut gpio);
        for pin in [SYS_LED_BLUE, SYS_LED_RED, SYS_LED_YELLOW, SYS_LED_GREEN]
        {
            gpio.set_function(pin, Function::Output);
        }
        Self {
            gpio,
            uart,
            clock: SystemTimer::new(SYSTEM_TIMER_BASE),
            timer: ArmTimer::new(ARM_TIMER_BASE, IRQ_BASE),
        }
    }

    pub fn gpio_mut(&mut self) -> &mut Gpio {
        &mut self.gpio
    }
}

impl Device for Soc {
    fn now(&self) -> Timestamp {
        Timestamp::from(self.clock.now_micros())
    }

    fn timer_start(&mut self, quantum: u32) {
        self.timer.start_periodic(quantum);
    }

    fn timer_pending(&self) -> bool {
        self.timer.is_pending()
    }

    fn timer_ack(&mut self) {
        self.timer.acknowledge();
    }

    fn gpio_write(&mut self, pin: u32, level: bool) {
        self.gpio.write(pin, level);
    }

    fn putc(&mut self, byte: u8) {
        self.uart.putc(byte);
    }

    fn getc(&mut self) -> u8 {
        self.uart.getc()
    }

    fn user_byte(&self, addr: u32) -> u8 {
        // No MMU: user pointers name physical memory directly.
        unsafe { core::ptr::read_volatile(addr as usize as *const u8) }
    }
}
