// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mini UART driver (the AUX peripheral's UART1), used as the console.

use crate::common::MMIODerefWrapper;
use crate::gpio::{Function, Gpio, Pull};
use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::{ReadOnly, ReadWrite};
use tock_registers::{register_bitfields, register_structs};

// Mini UART registers, offset from the AUX block base.
register_bitfields! {
    u32,

    /// Auxiliary enables.
    AUX_ENABLES [
        MINI_UART_ENABLE OFFSET(0) NUMBITS(1) []
    ],

    /// Interrupt enable.
    AUX_MU_IER [
        ENABLE OFFSET(0) NUMBITS(2) []
    ],

    /// Interrupt identify / FIFO clear.
    AUX_MU_IIR [
        FIFO_CLEAR OFFSET(1) NUMBITS(2) [
            Rx = 0b01,
            Tx = 0b10,
            All = 0b11
        ]
    ],

    /// Line control.
    AUX_MU_LCR [
        DATA_SIZE OFFSET(0) NUMBITS(2) [
            SevenBit = 0b00,
            EightBit = 0b11
        ]
    ],

    /// Line status.
    AUX_MU_LSR [
        TX_EMPTY OFFSET(5) NUMBITS(1) [],
        DATA_READY OFFSET(0) NUMBITS(1) []
    ],

    /// Extra control.
    AUX_MU_CNTL [
        TX_EN OFFSET(1) NUMBITS(1) [],
        RX_EN OFFSET(0) NUMBITS(1) []
    ],

    /// Baud rate counter.
    AUX_MU_BAUD [
        RATE OFFSET(0) NUMBITS(16) []
    ]
}

register_structs! {
    #[allow(non_snake_case)]
    pub RegisterBlock {
        (0x00 => _reserved1),
        (0x04 => AUX_ENABLES: ReadWrite<u32, AUX_ENABLES::Register>),
        (0x08 => _reserved2),
        (0x40 => AUX_MU_IO: ReadWrite<u32>),
        (0x44 => AUX_MU_IER: ReadWrite<u32, AUX_MU_IER::Register>),
        (0x48 => AUX_MU_IIR: ReadWrite<u32, AUX_MU_IIR::Register>),
        (0x4c => AUX_MU_LCR: ReadWrite<u32, AUX_MU_LCR::Register>),
        (0x50 => AUX_MU_MCR: ReadWrite<u32>),
        (0x54 => AUX_MU_LSR: ReadOnly<u32, AUX_MU_LSR::Register>),
        (0x58 => _reserved3),
        (0x60 => AUX_MU_CNTL: ReadWrite<u32, AUX_MU_CNTL::Register>),
        (0x64 => AUX_MU_STAT: ReadOnly<u32>),
        (0x68 => AUX_MU_BAUD: ReadWrite<u32, AUX_MU_BAUD::Register>),
        (0x6c => @END),
    }
}

type Registers = MMIODerefWrapper<RegisterBlock>;

/// Baud counter for 115200 at the 250 MHz core clock:
/// 250_000_000 / (8 * 115200) - 1.
const BAUD_115200: u32 = 270;

pub struct MiniUart {
    registers: Registers,
}

impl MiniUart {
    /// # Safety
    ///
    /// - The user must ensure to provide a correct MMIO start address.
    pub const unsafe fn new(mmio_start_addr: usize) -> Self {
        Self {
            registers: Registers::new(mmio_start_addr),
        }
    }

    /// Brings the UART up at 115200 8N1 on pins 14/15 (TXD1/RXD1, alt 5).
    pub fn init(&mut self, gpio: &mut Gpio) {
        gpio.set_function(14, Function::Alt5);
        gpio.set_function(15, Function::Alt5);
        gpio.set_pull(14, Pull::Off);
        gpio.set_pull(15, Pull::Off);

        let r = &self.registers;
        r.AUX_ENABLES.write(AUX_ENABLES::MINI_UART_ENABLE::SET);
        r.AUX_MU_IER.set(0);
        r.AUX_MU_CNTL.set(0);
        r.AUX_MU_LCR.write(AUX_MU_LCR::DATA_SIZE::EightBit);
        r.AUX_MU_MCR.set(0);
        r.AUX_MU_BAUD.write(AUX_MU_BAUD::RATE.val(BAUD_115200));
        r.AUX_MU_IIR.write(AUX_MU_IIR::FIFO_CLEAR::All);
        r.AUX_MU_CNTL
            .write(AUX_MU_CNTL::TX_EN::SET + AUX_MU_CNTL::RX_EN::SET);
    }

    /// Blocking single-byte write.
    pub fn putc(&mut self, byte: u8) {
        while !self.registers.AUX_MU_LSR.is_set(AUX_MU_LSR::TX_EMPTY) {
            core::hint::spin_loop();
        }
        self.registers.AUX_MU_IO.set(u32::from(byte));
    }

    /// Blocking single-byte read.
    pub fn getc(&mut self) -> u8 {
        while !self.registers.AUX_MU_LSR.is_set(AUX_MU_LSR::DATA_READY) {
            core::hint::spin_loop();
        }
        self.registers.AUX_MU_IO.get() as u8
    }

    pub fn puts(&mut self, s: &str) {
        for byte in s.bytes() {
            self.putc(byte);
        }
    }
}
