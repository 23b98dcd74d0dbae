// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Timers and the interrupt controller.
//!
//! Two distinct time sources: the free-running 1 MHz system timer, which the
//! kernel reads as its monotonic clock, and the ARM-side countdown timer,
//! which delivers the periodic quantum interrupt.

use crate::common::MMIODerefWrapper;
use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::{ReadOnly, ReadWrite, WriteOnly};
use tock_registers::{register_bitfields, register_structs};

register_structs! {
    #[allow(non_snake_case)]
    pub SystemTimerBlock {
        (0x00 => CS: ReadWrite<u32>),
        /// Free-running counter, low then high word, 1 MHz.
        (0x04 => CLO: ReadOnly<u32>),
        (0x08 => CHI: ReadOnly<u32>),
        (0x0c => COMPARE: [ReadWrite<u32>; 4]),
        (0x1c => @END),
    }
}

register_bitfields! {
    u32,

    /// ARM timer control.
    TIMER_CONTROL [
        /// 0 = 16-bit counter, 1 = 23-bit.
        WIDE OFFSET(1) NUMBITS(1) [],
        PRESCALE OFFSET(2) NUMBITS(2) [
            Div1 = 0b00,
            Div16 = 0b01,
            Div256 = 0b10
        ],
        IRQ_ENABLE OFFSET(5) NUMBITS(1) [],
        ENABLE OFFSET(7) NUMBITS(1) []
    ]
}

register_structs! {
    #[allow(non_snake_case)]
    pub ArmTimerBlock {
        (0x00 => LOAD: ReadWrite<u32>),
        (0x04 => VALUE: ReadOnly<u32>),
        (0x08 => CONTROL: ReadWrite<u32, TIMER_CONTROL::Register>),
        (0x0c => IRQ_ACK: WriteOnly<u32>),
        (0x10 => RAW_IRQ: ReadOnly<u32>),
        (0x14 => MASKED_IRQ: ReadOnly<u32>),
        (0x18 => RELOAD: ReadWrite<u32>),
        (0x1c => PREDIVIDER: ReadWrite<u32>),
        (0x20 => COUNTER: ReadOnly<u32>),
        (0x24 => @END),
    }
}

register_structs! {
    #[allow(non_snake_case)]
    pub IrqBlock {
        (0x00 => PENDING_BASIC: ReadOnly<u32>),
        (0x04 => PENDING: [ReadOnly<u32>; 2]),
        (0x0c => FIQ_CONTROL: ReadWrite<u32>),
        (0x10 => ENABLE: [ReadWrite<u32>; 2]),
        (0x18 => ENABLE_BASIC: ReadWrite<u32>),
        (0x1c => DISABLE: [ReadWrite<u32>; 2]),
        (0x24 => DISABLE_BASIC: ReadWrite<u32>),
        (0x28 => @END),
    }
}

/// Bit in the basic-interrupt registers for the ARM timer.
const BASIC_IRQ_ARM_TIMER: u32 = 1 << 0;

type SystemTimerRegisters = MMIODerefWrapper<SystemTimerBlock>;
type ArmTimerRegisters = MMIODerefWrapper<ArmTimerBlock>;
type IrqRegisters = MMIODerefWrapper<IrqBlock>;

/// The 1 MHz free-running clock.
pub struct SystemTimer {
    registers: SystemTimerRegisters,
}

impl SystemTimer {
    /// # Safety
    ///
    /// - The user must ensure to provide a correct MMIO start address.
    pub const unsafe fn new(mmio_start_addr: usize) -> Self {
        Self {
            registers: SystemTimerRegisters::new(mmio_start_addr),
        }
    }

    /// Reads the 64-bit microsecond counter. The high word is re-read if
    /// the low word wrapped between the two accesses.
    pub fn now_micros(&self) -> u64 {
        loop {
            let hi = self.registers.CHI.get();
            let lo = self.registers.CLO.get();
            if self.registers.CHI.get() == hi {
                return (u64::from(hi) << 32) | u64::from(lo);
            }
        }
    }
}

/// The ARM-side countdown timer, source of the quantum interrupt.
pub struct ArmTimer {
    registers: ArmTimerRegisters,
    irq: IrqRegisters,
}

impl ArmTimer {
    /// # Safety
    ///
    /// - The user must ensure to provide correct MMIO start addresses for
    ///   the timer and interrupt-controller blocks.
    pub const unsafe fn new(timer_addr: usize, irq_addr: usize) -> Self {
        Self {
            registers: ArmTimerRegisters::new(timer_addr),
            irq: IrqRegisters::new(irq_addr),
        }
    }

    /// Starts periodic interrupts with the given reload value and unmasks
    /// the timer line at the interrupt controller.
    pub fn start_periodic(&mut self, reload: u32) {
        self.registers.LOAD.set(reload);
        self.registers.RELOAD.set(reload);
        self.registers.CONTROL.write(
            TIMER_CONTROL::WIDE::SET
                + TIMER_CONTROL::PRESCALE::Div256
                + TIMER_CONTROL::IRQ_ENABLE::SET
                + TIMER_CONTROL::ENABLE::SET,
        );
        self.irq.ENABLE_BASIC.set(BASIC_IRQ_ARM_TIMER);
    }

    /// Checks whether the timer interrupt is pending and unmasked.
    pub fn is_pending(&self) -> bool {
        self.registers.MASKED_IRQ.get() != 0
    }

    /// Acknowledges a pending interrupt.
    pub fn acknowledge(&mut self) {
        self.registers.IRQ_ACK.set(1);
    }
}
