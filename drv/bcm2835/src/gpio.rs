// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GPIO driver.

use crate::common::{spin_for_cycles, MMIODerefWrapper};
use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::{ReadOnly, ReadWrite, WriteOnly};
use tock_registers::register_structs;

register_structs! {
    #[allow(non_snake_case)]
    pub RegisterBlock {
        /// Function select, 3 bits per pin, 10 pins per register.
        (0x00 => GPFSEL: [ReadWrite<u32>; 6]),
        (0x18 => _reserved1),
        (0x1c => GPSET: [WriteOnly<u32>; 2]),
        (0x24 => _reserved2),
        (0x28 => GPCLR: [WriteOnly<u32>; 2]),
        (0x30 => _reserved3),
        (0x34 => GPLEV: [ReadOnly<u32>; 2]),
        (0x3c => _reserved4),
        (0x94 => GPPUD: ReadWrite<u32>),
        (0x98 => GPPUDCLK: [ReadWrite<u32>; 2]),
        (0xa0 => @END),
    }
}

type Registers = MMIODerefWrapper<RegisterBlock>;

/// Pin functions, per the function-select encoding.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Function {
    Input = 0b000,
    Output = 0b001,
    Alt0 = 0b100,
    Alt1 = 0b101,
    Alt2 = 0b110,
    Alt3 = 0b111,
    Alt4 = 0b011,
    Alt5 = 0b010,
}

/// Pull-up/down configuration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Pull {
    Off = 0b00,
    Down = 0b01,
    Up = 0b10,
}

pub struct Gpio {
    registers: Registers,
}

impl Gpio {
    /// # Safety
    ///
    /// - The user must ensure to provide a correct MMIO start address.
    pub const unsafe fn new(mmio_start_addr: usize) -> Self {
        Self {
            registers: Registers::new(mmio_start_addr),
        }
    }

    /// Selects a pin's function.
    pub fn set_function(&mut self, pin: u32, function: Function) {
        let bank = (pin / 10) as usize;
        let shift = (pin % 10) * 3;
        let fsel = &self.registers.GPFSEL[bank];
        let mut value = fsel.get();
        value &= !(0b111 << shift);
        value |= (function as u32) << shift;
        fsel.set(value);
    }

    /// Drives an output pin.
    pub fn write(&mut self, pin: u32, level: bool) {
        let bank = (pin / 32) as usize;
        let bit = 1 << (pin % 32);
        if level {
            self.registers.GPSET[bank].set(bit);
        } else {
            self.registers.GPCLR[bank].set(bit);
        }
    }

    /// Reads a pin's level.
    pub fn read(&self, pin: u32) -> bool {
        let bank = (pin / 32) as usize;
        self.registers.GPLEV[bank].get() & (1 << (pin % 32)) != 0
    }

    /// Configures a pin's pull resistor.
    ///
    /// The datasheet sequence: write the control value, wait 150 cycles,
    /// clock it into the pin, wait again, then clear both registers.
    pub fn set_pull(&mut self, pin: u32, pull: Pull) {
        let bank = (pin / 32) as usize;
        let bit = 1 << (pin % 32);
        self.registers.GPPUD.set(pull as u32);
        spin_for_cycles(150);
        self.registers.GPPUDCLK[bank].set(bit);
        spin_for_cycles(150);
        self.registers.GPPUD.set(0);
        self.registers.GPPUDCLK[bank].set(0);
    }
}
