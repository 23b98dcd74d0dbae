// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Saved execution context of a process.
//!
//! The trap layer dumps the user register bank into this structure on every
//! kernel entry and reloads it on exit, so the layout is part of the contract
//! with the assembly stubs and must stay `repr(C)`.

use toast_abi::{
    MAX_REGISTERS, PSR_FIQ_DISABLE, PSR_MODE_USER, REG_R0, REG_R1, REG_SP,
};

/// A process's saved register state while it is not running.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[repr(C)]
pub struct SavedState {
    /// Saved status word.
    pub psr: u32,
    /// Address at which execution resumes.
    pub pc: u32,
    /// General registers r0-r12, sp, lr.
    pub regs: [u32; MAX_REGISTERS],
}

impl SavedState {
    /// Builds the context of a process that has never run.
    ///
    /// The process starts at `trampoline` in user mode, with the real entry
    /// point in r0 and its init parameter in r1; the trampoline calls
    /// through r0 and issues the exit syscall if the entry point ever
    /// returns. FIQ stays masked, the kernel only uses the IRQ line.
    pub fn initial(
        trampoline: u32,
        entry_point: u32,
        init_param: u32,
        stack_top: u32,
    ) -> Self {
        let mut regs = [0; MAX_REGISTERS];
        regs[REG_R0] = entry_point;
        regs[REG_R1] = init_param;
        regs[REG_SP] = stack_top;
        Self {
            psr: PSR_MODE_USER | PSR_FIQ_DISABLE,
            pc: trampoline,
            regs,
        }
    }

    /// Stores a syscall return value where the caller will see it when it
    /// next runs (r0 by convention).
    pub fn set_return(&mut self, value: u32) {
        self.regs[REG_R0] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_context_shape() {
        let ctx = SavedState::initial(0x8000, 0x1_0000, 42, 0x2_0000);
        assert_eq!(ctx.pc, 0x8000);
        assert_eq!(ctx.psr, PSR_MODE_USER | PSR_FIQ_DISABLE);
        assert_eq!(ctx.regs[REG_R0], 0x1_0000);
        assert_eq!(ctx.regs[REG_R1], 42);
        assert_eq!(ctx.regs[REG_SP], 0x2_0000);
        // Everything else starts zeroed.
        for (i, &r) in ctx.regs.iter().enumerate() {
            if i != REG_R0 && i != REG_R1 && i != REG_SP {
                assert_eq!(r, 0, "r{i} not zeroed");
            }
        }
    }

    #[test]
    fn set_return_targets_r0() {
        let mut ctx = SavedState::initial(0x8000, 0x1_0000, 0, 0x2_0000);
        ctx.set_return(7);
        assert_eq!(ctx.regs[REG_R0], 7);
    }
}
