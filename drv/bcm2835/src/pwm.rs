// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! PWM channel 1 driver, with the clock-manager programming it needs.
//!
//! Used by the demo programs for LED brightness ramps. The clock manager
//! guards its registers with a password byte and requires the generator to
//! be stopped (and reported idle) before the divisor may change.

use crate::common::{spin_for_cycles, MMIODerefWrapper};
use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::{ReadOnly, ReadWrite};
use tock_registers::{register_bitfields, register_structs};

register_bitfields! {
    u32,

    /// PWM control.
    PWM_CTL [
        /// Use M/S (mark/space) transmission for channel 1.
        MSEN1 OFFSET(7) NUMBITS(1) [],
        PWEN1 OFFSET(0) NUMBITS(1) []
    ]
}

register_structs! {
    #[allow(non_snake_case)]
    pub PwmBlock {
        (0x00 => CTL: ReadWrite<u32, PWM_CTL::Register>),
        (0x04 => STA: ReadOnly<u32>),
        (0x08 => DMAC: ReadWrite<u32>),
        (0x0c => _reserved1),
        (0x10 => RNG1: ReadWrite<u32>),
        (0x14 => DAT1: ReadWrite<u32>),
        (0x18 => FIF1: ReadWrite<u32>),
        (0x1c => _reserved2),
        (0x20 => RNG2: ReadWrite<u32>),
        (0x24 => DAT2: ReadWrite<u32>),
        (0x28 => @END),
    }
}

register_structs! {
    #[allow(non_snake_case)]
    pub ClockManagerBlock {
        (0x00 => _reserved1),
        (0xa0 => PWMCTL: ReadWrite<u32>),
        (0xa4 => PWMDIV: ReadWrite<u32>),
        (0xa8 => @END),
    }
}

/// All clock-manager writes must carry this password in the top byte.
const CM_PASSWORD: u32 = 0x5a << 24;
const CM_ENABLE: u32 = 1 << 4;
const CM_BUSY: u32 = 1 << 7;
const CM_SRC_OSCILLATOR: u32 = 1;

type PwmRegisters = MMIODerefWrapper<PwmBlock>;
type ClockRegisters = MMIODerefWrapper<ClockManagerBlock>;

pub struct Pwm {
    registers: PwmRegisters,
    clock: ClockRegisters,
}

impl Pwm {
    /// # Safety
    ///
    /// - The user must ensure to provide correct MMIO start addresses for
    ///   the PWM and clock-manager blocks.
    pub const unsafe fn new(pwm_addr: usize, cm_addr: usize) -> Self {
        Self {
            registers: PwmRegisters::new(pwm_addr),
            clock: ClockRegisters::new(cm_addr),
        }
    }

    /// Routes the 19.2 MHz oscillator to the PWM block through `divisor`
    /// and enables channel 1 in mark/space mode with the given range.
    pub fn init(&mut self, divisor: u32, range: u32) {
        // Stop the generator before touching the divisor.
        self.clock.PWMCTL.set(CM_PASSWORD);
        while self.clock.PWMCTL.get() & CM_BUSY != 0 {
            core::hint::spin_loop();
        }
        self.clock.PWMDIV.set(CM_PASSWORD | (divisor << 12));
        self.clock
            .PWMCTL
            .set(CM_PASSWORD | CM_ENABLE | CM_SRC_OSCILLATOR);
        spin_for_cycles(150);

        self.registers.RNG1.set(range);
        self.registers
            .CTL
            .write(PWM_CTL::MSEN1::SET + PWM_CTL::PWEN1::SET);
    }

    /// Sets channel 1's duty value (clamped to the configured range by the
    /// hardware).
    pub fn set_duty(&mut self, value: u32) {
        self.registers.DAT1.set(value);
    }

    /// Stops the channel.
    pub fn disable(&mut self) {
        self.registers.CTL.set(0);
    }
}
