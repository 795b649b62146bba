use std::path::Path;

use crate::device::{Console, DDR, DSR, KBDR, KBSR, MCR, STATUS_BIT};
use crate::error::{LoadError, RunError};
use crate::loader;
use crate::state::VmState;

/// A complete LC3 machine: memory and registers plus an attached console.
///
/// Instances are independent of each other; any number can run in the same
/// process.
pub struct Vm<C> {
    state: VmState,
    console: C,
}

impl<C: Console> Vm<C> {
    pub fn new(console: C) -> Self {
        Vm {
            state: VmState::new(),
            console,
        }
    }

    pub fn state(&self) -> &VmState {
        &self.state
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    /// Load an object image from a byte buffer. See [`loader::load`].
    pub fn load(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        loader::load(&mut self.state, bytes)
    }

    /// Load an object image from disk. See [`loader::load_file`].
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        loader::load_file(&mut self.state, path)
    }

    /// Memory read, giving the device registers their special meaning.
    ///
    /// The keyboard registers poll the console without blocking; everything
    /// outside the device range is plain storage.
    pub fn read_mem(&mut self, addr: u16) -> u16 {
        match addr {
            KBSR => {
                if self.console.poll() {
                    STATUS_BIT
                } else {
                    0
                }
            }
            KBDR => {
                if self.console.poll() {
                    self.console.read() as u16
                } else {
                    0
                }
            }
            // Display is always ready
            DSR => STATUS_BIT,
            // Write-only
            DDR => 0,
            _ => self.state.raw_read(addr),
        }
    }

    /// Memory write, giving the device registers their special meaning.
    ///
    /// A write to DDR reaches the console immediately; the status registers
    /// ignore writes; everything outside the device range is plain storage.
    pub fn write_mem(&mut self, addr: u16, val: u16) {
        match addr {
            // Not writable by programs
            KBSR | KBDR | DSR => (),
            DDR => self.console.write(val as u8),
            _ => self.state.raw_write(addr, val),
        }
    }

    const OP_TABLE: [fn(&mut Self, u16) -> Result<(), RunError>; 16] = [
        Self::br,       // 0x0
        Self::add,      // 0x1
        Self::ld,       // 0x2
        Self::st,       // 0x3
        Self::jsr,      // 0x4
        Self::and,      // 0x5
        Self::ldr,      // 0x6
        Self::str,      // 0x7
        Self::rti,      // 0x8
        Self::not,      // 0x9
        Self::ldi,      // 0xA
        Self::sti,      // 0xB
        Self::jmp,      // 0xC
        Self::reserved, // 0xD
        Self::lea,      // 0xE
        Self::trap,     // 0xF
    ];

    /// Fetch and execute a single instruction.
    pub fn step(&mut self) -> Result<(), RunError> {
        let instr = self.read_mem(self.state.pc());
        let opcode = (instr >> 12) as usize;
        // PC incremented before instruction is performed
        self.state.set_pc(self.state.pc().wrapping_add(1));
        Self::OP_TABLE[opcode](self, instr)
    }

    /// Run until the clock-enable bit of MCR clears or an instruction
    /// faults.
    ///
    /// The MCR check happens before every fetch, so an instruction that
    /// clears the bit is the last one executed.
    pub fn run(&mut self) -> Result<(), RunError> {
        while self.read_mem(MCR) & STATUS_BIT != 0 {
            self.step()?;
        }
        Ok(())
    }

    fn add(&mut self, instr: u16) -> Result<(), RunError> {
        let dr = (instr >> 9) & 0b111;
        let sr1 = (instr >> 6) & 0b111;

        let val1 = *self.state.reg(sr1);
        // Bit 5 selects the immediate form
        let val2 = if instr & (1 << 5) != 0 {
            sext(instr, 5)
        } else {
            *self.state.reg(instr & 0b111)
        };
        let res = val1.wrapping_add(val2);
        *self.state.reg(dr) = res;
        self.state.set_flags(res);
        Ok(())
    }

    fn and(&mut self, instr: u16) -> Result<(), RunError> {
        let dr = (instr >> 9) & 0b111;
        let sr1 = (instr >> 6) & 0b111;

        let val1 = *self.state.reg(sr1);
        // Bit 5 selects the immediate form
        let val2 = if instr & (1 << 5) != 0 {
            sext(instr, 5)
        } else {
            *self.state.reg(instr & 0b111)
        };
        let res = val1 & val2;
        *self.state.reg(dr) = res;
        self.state.set_flags(res);
        Ok(())
    }

    fn br(&mut self, instr: u16) -> Result<(), RunError> {
        let nzp = (instr >> 9) & 0b111;
        if self.state.psr() & nzp != 0 {
            self.state.set_pc(self.state.pc().wrapping_add(sext(instr, 9)));
        }
        Ok(())
    }

    fn jmp(&mut self, instr: u16) -> Result<(), RunError> {
        let base = (instr >> 6) & 0b111;
        let target = *self.state.reg(base);
        self.state.set_pc(target);
        Ok(())
    }

    fn jsr(&mut self, instr: u16) -> Result<(), RunError> {
        // The return address is saved only after the target is read, so a
        // JSRR through R7 jumps to R7's pre-jump value.
        let original_pc = self.state.pc();
        if instr & (1 << 11) != 0 {
            self.state.set_pc(original_pc.wrapping_add(sext(instr, 11)));
        } else {
            let base = (instr >> 6) & 0b111;
            let target = *self.state.reg(base);
            self.state.set_pc(target);
        }
        *self.state.reg(7) = original_pc;
        Ok(())
    }

    fn ld(&mut self, instr: u16) -> Result<(), RunError> {
        let dr = (instr >> 9) & 0b111;
        let val = self.read_mem(self.state.pc().wrapping_add(sext(instr, 9)));
        *self.state.reg(dr) = val;
        self.state.set_flags(val);
        Ok(())
    }

    fn ldi(&mut self, instr: u16) -> Result<(), RunError> {
        let dr = (instr >> 9) & 0b111;
        let ptr = self.read_mem(self.state.pc().wrapping_add(sext(instr, 9)));
        let val = self.read_mem(ptr);
        *self.state.reg(dr) = val;
        self.state.set_flags(val);
        Ok(())
    }

    fn ldr(&mut self, instr: u16) -> Result<(), RunError> {
        let dr = (instr >> 9) & 0b111;
        let base = (instr >> 6) & 0b111;
        let ptr = *self.state.reg(base);
        let val = self.read_mem(ptr.wrapping_add(sext(instr, 6)));
        *self.state.reg(dr) = val;
        self.state.set_flags(val);
        Ok(())
    }

    fn lea(&mut self, instr: u16) -> Result<(), RunError> {
        let dr = (instr >> 9) & 0b111;
        let val = self.state.pc().wrapping_add(sext(instr, 9));
        *self.state.reg(dr) = val;
        self.state.set_flags(val);
        Ok(())
    }

    fn not(&mut self, instr: u16) -> Result<(), RunError> {
        let dr = (instr >> 9) & 0b111;
        let sr = (instr >> 6) & 0b111;
        let val = !*self.state.reg(sr);
        *self.state.reg(dr) = val;
        self.state.set_flags(val);
        Ok(())
    }

    fn rti(&mut self, instr: u16) -> Result<(), RunError> {
        Err(self.unimplemented(instr))
    }

    fn st(&mut self, instr: u16) -> Result<(), RunError> {
        let sr = (instr >> 9) & 0b111;
        let val = *self.state.reg(sr);
        self.write_mem(self.state.pc().wrapping_add(sext(instr, 9)), val);
        Ok(())
    }

    fn sti(&mut self, instr: u16) -> Result<(), RunError> {
        let sr = (instr >> 9) & 0b111;
        let val = *self.state.reg(sr);
        let ptr = self.read_mem(self.state.pc().wrapping_add(sext(instr, 9)));
        self.write_mem(ptr, val);
        Ok(())
    }

    fn str(&mut self, instr: u16) -> Result<(), RunError> {
        let sr = (instr >> 9) & 0b111;
        let base = (instr >> 6) & 0b111;
        let ptr = *self.state.reg(base);
        let val = *self.state.reg(sr);
        self.write_mem(ptr.wrapping_add(sext(instr, 6)), val);
        Ok(())
    }

    fn trap(&mut self, instr: u16) -> Result<(), RunError> {
        let vector = instr & 0xFF;
        if vector == 0x20 {
            // GETC: one blocking read straight into R0, skipping the vector
            // table. The OS routine for this vector spins on KBSR, which
            // burns a host core while the machine sits at a prompt.
            *self.state.reg(0) = self.console.read() as u16;
        } else {
            *self.state.reg(7) = self.state.pc();
            let target = self.read_mem(vector);
            self.state.set_pc(target);
        }
        Ok(())
    }

    fn reserved(&mut self, instr: u16) -> Result<(), RunError> {
        Err(self.unimplemented(instr))
    }

    fn unimplemented(&self, instr: u16) -> RunError {
        RunError::UnimplementedOpcode {
            opcode: instr >> 12,
            // PC was already bumped past the faulting instruction
            pc: self.state.pc().wrapping_sub(1),
        }
    }
}

/// Sign-extend the low `bits` bits of `val` into a full word.
#[inline]
pub(crate) fn sext(val: u16, bits: u32) -> u16 {
    debug_assert!(bits >= 1 && bits < 16);
    let sign = 1u16 << (bits - 1);
    let val = val & ((1u16 << bits) - 1);
    (val ^ sign).wrapping_sub(sign)
}
