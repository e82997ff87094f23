//! Integer arithmetic, logic, shifts, and the SPECIAL/SPECIAL3 spaces.
//!
//! SPECIAL (opcode 0) dispatches on the 6-bit FUNCTION field; the SOP3x
//! slots sub-dispatch the release 6 mul/div families on shamt.
//! ADD/SUB detect overflow with 33-bit unsigned arithmetic (carry out of
//! bit 31), which traps on cases like `ADD(0xF000_0000, 0xF000_0000)`.

use crate::cpu::Cpu;
use crate::decode::{function, immediate, rd, rs, rt, shamt, sign_extend_half};
use crate::exceptions::ExCause;
use crate::ram::Ram;

impl Cpu {
    pub(crate) fn special(&mut self, ram: &mut Ram, word: u32) {
        match function(word) {
            0x00 => self.sll(word),
            // 0x01 MOVCI: removed in r6.
            0x02 => self.srl(word),
            0x03 => self.sra(word),
            0x04 => self.sllv(word),
            0x05 => self.lsa(word),
            0x06 => self.srlv(word),
            0x07 => self.srav(word),
            // 0x08 JR: folded into JALR in r6.
            0x09 => self.jalr(word),
            // 0x0A MOVZ / 0x0B MOVN: removed in r6.
            0x0C => self.syscall(ram, word),
            0x0D => self.break_(word),
            // 0x0E SDBBP / 0x0F SYNC: not implemented.
            0x10 => self.clz(word),
            0x11 => self.clo(word),
            // 0x12 MFLO / 0x13 MTLO: HI/LO removed in r6.
            0x18 => self.sop30(word),
            0x19 => self.sop31(word),
            0x1A => self.sop32(word),
            0x1B => self.sop33(word),
            0x20 => self.add(word),
            0x21 => self.addu(word),
            0x22 => self.sub(word),
            0x23 => self.subu(word),
            0x24 => self.and(word),
            0x25 => self.or(word),
            0x26 => self.xor(word),
            0x27 => self.nor(word),
            0x2A => self.slt(word),
            0x2B => self.sltu(word),
            0x30 => self.tge(word),
            0x31 => self.tgeu(word),
            0x32 => self.tlt(word),
            0x33 => self.tltu(word),
            0x34 => self.teq(word),
            0x35 => self.seleqz(word),
            0x36 => self.tne(word),
            0x37 => self.selnez(word),
            _ => self.reserved(word),
        }
    }

    pub(crate) fn special3(&mut self, word: u32) {
        match function(word) {
            0b000_000 => self.ext(word),
            0b000_100 => self.ins(word),
            _ => self.reserved(word),
        }
    }

    // === Shifts ===

    fn sll(&mut self, word: u32) {
        self.gpr[rd(word)] = self.gpr[rt(word)] << shamt(word);
    }

    /// SRL, or ROTR when bit 21 is set.
    fn srl(&mut self, word: u32) {
        let value = self.gpr[rt(word)];
        self.gpr[rd(word)] = if word & (1 << 21) != 0 {
            value.rotate_right(shamt(word))
        } else {
            value >> shamt(word)
        };
    }

    fn sra(&mut self, word: u32) {
        self.gpr[rd(word)] = ((self.gpr[rt(word)] as i32) >> shamt(word)) as u32;
    }

    fn sllv(&mut self, word: u32) {
        let amount = self.gpr[rs(word)] & 0x1F;
        self.gpr[rd(word)] = self.gpr[rt(word)] << amount;
    }

    /// Left shift add: rd = (rs << (shamt + 1)) + rt.
    fn lsa(&mut self, word: u32) {
        let amount = shamt(word) + 1;
        self.gpr[rd(word)] = self.gpr[rs(word)]
            .wrapping_shl(amount)
            .wrapping_add(self.gpr[rt(word)]);
    }

    /// SRLV, or ROTRV when bit 6 is set.
    fn srlv(&mut self, word: u32) {
        let amount = self.gpr[rs(word)] & 0x1F;
        let value = self.gpr[rt(word)];
        self.gpr[rd(word)] = if word & (1 << 6) != 0 {
            value.rotate_right(amount)
        } else {
            value >> amount
        };
    }

    fn srav(&mut self, word: u32) {
        let amount = self.gpr[rs(word)] & 0x1F;
        self.gpr[rd(word)] = ((self.gpr[rt(word)] as i32) >> amount) as u32;
    }

    // === Bit counting ===

    fn clz(&mut self, word: u32) {
        if rd(word) == 0 {
            return;
        }
        self.gpr[rd(word)] = self.gpr[rs(word)].leading_zeros();
    }

    fn clo(&mut self, word: u32) {
        if rd(word) == 0 {
            return;
        }
        self.gpr[rd(word)] = self.gpr[rs(word)].leading_ones();
    }

    // === Multiply / divide families ===

    /// MUL / MUH.
    fn sop30(&mut self, word: u32) {
        let (d, s, t) = (rd(word), rs(word), rt(word));
        match shamt(word) {
            0b00010 => {
                self.gpr[d] = (self.gpr[s] as i32).wrapping_mul(self.gpr[t] as i32) as u32;
            }
            0b00011 => {
                let product = i64::from(self.gpr[s] as i32) * i64::from(self.gpr[t] as i32);
                self.gpr[d] = (product >> 32) as u32;
            }
            _ => self.reserved(word),
        }
    }

    /// MULU / MUHU.
    fn sop31(&mut self, word: u32) {
        let (d, s, t) = (rd(word), rs(word), rt(word));
        match shamt(word) {
            0b00010 => {
                self.gpr[d] = self.gpr[s].wrapping_mul(self.gpr[t]);
            }
            0b00011 => {
                let product = u64::from(self.gpr[s]) * u64::from(self.gpr[t]);
                self.gpr[d] = (product >> 32) as u32;
            }
            _ => self.reserved(word),
        }
    }

    /// DIV / MOD. Division by zero is unpredictable per the
    /// architecture; the destination is left unchanged and nothing is
    /// signaled.
    fn sop32(&mut self, word: u32) {
        let (d, s, t) = (rd(word), rs(word), rt(word));
        match shamt(word) {
            0b00010 => {
                if self.gpr[t] != 0 {
                    self.gpr[d] =
                        (self.gpr[s] as i32).wrapping_div(self.gpr[t] as i32) as u32;
                }
            }
            0b00011 => {
                if self.gpr[t] != 0 {
                    self.gpr[d] =
                        (self.gpr[s] as i32).wrapping_rem(self.gpr[t] as i32) as u32;
                }
            }
            _ => self.reserved(word),
        }
    }

    /// DIVU / MODU.
    fn sop33(&mut self, word: u32) {
        let (d, s, t) = (rd(word), rs(word), rt(word));
        match shamt(word) {
            0b00010 => {
                if self.gpr[t] != 0 {
                    self.gpr[d] = self.gpr[s] / self.gpr[t];
                }
            }
            0b00011 => {
                if self.gpr[t] != 0 {
                    self.gpr[d] = self.gpr[s] % self.gpr[t];
                }
            }
            _ => self.reserved(word),
        }
    }

    // === Add / subtract ===

    /// Overflow = carry out of bit 31; the destination is not written
    /// on a trap.
    fn add(&mut self, word: u32) {
        let result = u64::from(self.gpr[rs(word)]) + u64::from(self.gpr[rt(word)]);

        if result & (1 << 32) != 0 {
            self.signal_exception(ExCause::Ov, word, self.pc.wrapping_sub(4));
        } else {
            self.gpr[rd(word)] = result as u32;
        }
    }

    fn addu(&mut self, word: u32) {
        self.gpr[rd(word)] = self.gpr[rs(word)].wrapping_add(self.gpr[rt(word)]);
    }

    /// Overflow = borrow into bit 32.
    fn sub(&mut self, word: u32) {
        let result = u64::from(self.gpr[rs(word)]).wrapping_sub(u64::from(self.gpr[rt(word)]));

        if result & (1 << 32) != 0 {
            self.signal_exception(ExCause::Ov, word, self.pc.wrapping_sub(4));
        } else {
            self.gpr[rd(word)] = result as u32;
        }
    }

    fn subu(&mut self, word: u32) {
        self.gpr[rd(word)] = self.gpr[rs(word)].wrapping_sub(self.gpr[rt(word)]);
    }

    // === Logic ===

    fn and(&mut self, word: u32) {
        self.gpr[rd(word)] = self.gpr[rs(word)] & self.gpr[rt(word)];
    }

    fn or(&mut self, word: u32) {
        self.gpr[rd(word)] = self.gpr[rs(word)] | self.gpr[rt(word)];
    }

    fn xor(&mut self, word: u32) {
        self.gpr[rd(word)] = self.gpr[rs(word)] ^ self.gpr[rt(word)];
    }

    fn nor(&mut self, word: u32) {
        self.gpr[rd(word)] = !(self.gpr[rs(word)] | self.gpr[rt(word)]);
    }

    // === Set-on-less-than ===

    fn slt(&mut self, word: u32) {
        self.gpr[rd(word)] =
            u32::from((self.gpr[rs(word)] as i32) < (self.gpr[rt(word)] as i32));
    }

    fn sltu(&mut self, word: u32) {
        self.gpr[rd(word)] = u32::from(self.gpr[rs(word)] < self.gpr[rt(word)]);
    }

    // === Trap-on-condition ===

    fn tge(&mut self, word: u32) {
        if (self.gpr[rs(word)] as i32) >= (self.gpr[rt(word)] as i32) {
            self.signal_exception(ExCause::Tr, word, self.pc.wrapping_sub(4));
        }
    }

    fn tgeu(&mut self, word: u32) {
        if self.gpr[rs(word)] >= self.gpr[rt(word)] {
            self.signal_exception(ExCause::Tr, word, self.pc.wrapping_sub(4));
        }
    }

    fn tlt(&mut self, word: u32) {
        if (self.gpr[rs(word)] as i32) < (self.gpr[rt(word)] as i32) {
            self.signal_exception(ExCause::Tr, word, self.pc.wrapping_sub(4));
        }
    }

    fn tltu(&mut self, word: u32) {
        if self.gpr[rs(word)] < self.gpr[rt(word)] {
            self.signal_exception(ExCause::Tr, word, self.pc.wrapping_sub(4));
        }
    }

    fn teq(&mut self, word: u32) {
        if self.gpr[rs(word)] == self.gpr[rt(word)] {
            self.signal_exception(ExCause::Tr, word, self.pc.wrapping_sub(4));
        }
    }

    fn tne(&mut self, word: u32) {
        if self.gpr[rs(word)] != self.gpr[rt(word)] {
            self.signal_exception(ExCause::Tr, word, self.pc.wrapping_sub(4));
        }
    }

    // === Conditional select ===

    fn seleqz(&mut self, word: u32) {
        self.gpr[rd(word)] = if self.gpr[rt(word)] != 0 {
            0
        } else {
            self.gpr[rs(word)]
        };
    }

    fn selnez(&mut self, word: u32) {
        self.gpr[rd(word)] = if self.gpr[rt(word)] != 0 {
            self.gpr[rs(word)]
        } else {
            0
        };
    }

    // === Immediate forms ===

    pub(crate) fn addiu(&mut self, word: u32) {
        self.gpr[rt(word)] = self.gpr[rs(word)].wrapping_add(sign_extend_half(immediate(word)));
    }

    pub(crate) fn slti(&mut self, word: u32) {
        self.gpr[rt(word)] = u32::from(
            (self.gpr[rs(word)] as i32) < (sign_extend_half(immediate(word)) as i32),
        );
    }

    pub(crate) fn sltiu(&mut self, word: u32) {
        self.gpr[rt(word)] = u32::from(self.gpr[rs(word)] < sign_extend_half(immediate(word)));
    }

    pub(crate) fn andi(&mut self, word: u32) {
        self.gpr[rt(word)] = self.gpr[rs(word)] & immediate(word);
    }

    pub(crate) fn ori(&mut self, word: u32) {
        self.gpr[rt(word)] = self.gpr[rs(word)] | immediate(word);
    }

    pub(crate) fn xori(&mut self, word: u32) {
        self.gpr[rt(word)] = self.gpr[rs(word)] ^ immediate(word);
    }

    /// Add upper immediate (LUI when rs is 0).
    pub(crate) fn aui(&mut self, word: u32) {
        self.gpr[rt(word)] = self.gpr[rs(word)].wrapping_add(immediate(word) << 16);
    }

    // === SPECIAL3 bitfields ===

    /// Extract `size` bits at `pos` from rs, zero-extended into rt.
    fn ext(&mut self, word: u32) {
        let size = rd(word) as u32 + 1;
        let pos = shamt(word);

        // pos + size > 32 is architecturally unpredictable; leave rt
        // unchanged.
        if pos + size > 32 {
            return;
        }

        let left = 32 - (pos + size);
        self.gpr[rt(word)] = if size == 32 {
            self.gpr[rs(word)]
        } else {
            (self.gpr[rs(word)] << left) >> (left + pos)
        };
    }

    /// Insert the low `msb + 1 - pos` bits of rs into rt at `pos`.
    fn ins(&mut self, word: u32) {
        let pos = shamt(word);
        let msb = rd(word) as u32;

        // msb < pos is architecturally unpredictable; leave rt unchanged.
        if msb + 1 <= pos {
            return;
        }

        let size = msb + 1 - pos;
        let mask = if size == 32 {
            u32::MAX
        } else {
            (1u32 << size) - 1
        };

        self.gpr[rt(word)] =
            (self.gpr[rt(word)] & !(mask << pos)) | ((self.gpr[rs(word)] & mask) << pos);
    }
}
