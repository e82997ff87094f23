//! Coprocessor 1: the floating-point unit.
//!
//! 32 registers of 64-bit width, each addressable as single precision
//! (low 32 bits), double precision, or raw integers. Arithmetic leans on
//! the host FPU, so every operation is IEEE-754 compliant to the extent
//! the host is; the FCSR rounding mode and flush-subnormals bit are
//! pushed into the host FP environment before each operation.
//!
//! Exception routing: each operation rewrites the FCSR cause field from
//! the host exception flags. A cause bit whose enable bit is set
//! produces a trap (the CPU turns it into an FPE exception); otherwise
//! the sticky flag bits accumulate and the result is committed.

use crate::fenv;

/// FCSR cause/enable/flag bit values.
pub const INEXACT: u32 = 0x01;
pub const UNDERFLOW: u32 = 0x02;
pub const OVERFLOW: u32 = 0x04;
pub const DIVBYZERO: u32 = 0x08;
pub const INVALID: u32 = 0x10;
/// Cause-only: no matching enable or flag bit; always traps.
pub const UNIMPLEMENTED: u32 = 0x20;

/// Arithmetic formats selected by the instruction `fmt` field.
pub const FMT_S: u32 = 0x10;
pub const FMT_D: u32 = 0x11;
/// MIPS32r6 compare formats.
pub const CMP_FMT_S: u32 = 0x14;
pub const CMP_FMT_D: u32 = 0x15;

const FCSR_WRITE_MASK: u32 = 0x0163_FFFF;
const FEXR_MASK: u32 = 0x0003_F07C;
const FENR_MASK: u32 = 0x0000_0F87;
const FCSR_FS: u32 = 1 << 24;

const CAUSE_SHIFT: u32 = 12;
const ENABLE_SHIFT: u32 = 7;
const FLAG_SHIFT: u32 = 2;

/// One FPU register: an 8-byte cell viewed as f32/f64/u32/u64.
///
/// MTC1/MFC1 touch the low half, MTHC1/MFHC1 the high half; double
/// operations use the full width directly (this simulator stores a
/// double per register instead of an even/odd pair).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fpr {
    bits: u64,
}

impl Fpr {
    #[must_use]
    pub fn bits(self) -> u64 {
        self.bits
    }

    pub fn set_bits(&mut self, bits: u64) {
        self.bits = bits;
    }

    fn lo(self) -> u32 {
        self.bits as u32
    }

    fn hi(self) -> u32 {
        (self.bits >> 32) as u32
    }

    fn set_lo(&mut self, value: u32) {
        self.bits = (self.bits & 0xFFFF_FFFF_0000_0000) | u64::from(value);
    }

    fn set_hi(&mut self, value: u32) {
        self.bits = (self.bits & 0x0000_0000_FFFF_FFFF) | (u64::from(value) << 32);
    }

    fn f32(self) -> f32 {
        f32::from_bits(self.lo())
    }

    fn set_f32(&mut self, value: f32) {
        self.set_lo(value.to_bits());
    }

    fn f64(self) -> f64 {
        f64::from_bits(self.bits)
    }

    fn set_f64(&mut self, value: f64) {
        self.bits = value.to_bits();
    }
}

/// What a CP1 instruction did, as seen by the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpResult {
    /// Committed normally.
    Ok,
    /// Trapped; the payload is the FCSR cause field. The CPU raises FPE.
    Trap(u32),
    /// The FUNCTION slot is reserved. The CPU raises RI.
    Reserved,
}

enum OpStatus {
    Ok,
    Trap,
    Reserved,
}

/// 2008-style comparison predicates (quiet and signaling share these).
#[derive(Clone, Copy)]
enum Pred {
    Af,
    Un,
    Eq,
    Ueq,
    Lt,
    Ult,
    Le,
    Ule,
}

fn eval_pred<T: PartialOrd>(pred: Pred, a: T, b: T, unordered: bool) -> bool {
    match pred {
        Pred::Af => false,
        Pred::Un => unordered,
        Pred::Eq => a == b,
        Pred::Ueq => unordered || a == b,
        Pred::Lt => a < b,
        Pred::Ult => unordered || a < b,
        Pred::Le => a <= b,
        Pred::Ule => unordered || a <= b,
    }
}

fn is_snan_f32(value: f32) -> bool {
    value.is_nan() && value.to_bits() & 0x0040_0000 == 0
}

fn is_snan_f64(value: f64) -> bool {
    value.is_nan() && value.to_bits() & 0x0008_0000_0000_0000 == 0
}

fn fmt(word: u32) -> u32 {
    (word >> 21) & 0x1F
}

fn ft(word: u32) -> usize {
    ((word >> 16) & 0x1F) as usize
}

fn fs(word: u32) -> usize {
    ((word >> 11) & 0x1F) as usize
}

fn fd(word: u32) -> usize {
    ((word >> 6) & 0x1F) as usize
}

/// The FPU state: register file plus FIR/FCSR.
#[derive(Debug)]
pub struct Cp1 {
    fpr: [Fpr; 32],
    fir: u32,
    fcsr: u32,
}

impl Default for Cp1 {
    fn default() -> Self {
        Self::new()
    }
}

impl Cp1 {
    #[must_use]
    pub fn new() -> Self {
        let mut cp1 = Self {
            fpr: [Fpr::default(); 32],
            fir: 0,
            fcsr: 0,
        };
        cp1.reset();
        cp1
    }

    /// Reset to the architectural defaults and push them into the host
    /// FP environment.
    pub fn reset(&mut self) {
        self.fpr = [Fpr::default(); 32];

        // FIR: 2008 NaN handling, F64/D/S implemented.
        self.fir = 0x00C3_0000;

        // FCSR: flush subnormals, ABS2008, NAN2008.
        self.fcsr = 0x010C_0000;

        self.apply_fp_env();
        fenv::clear_exceptions();
    }

    /// Re-apply round mode and flush-subnormals to the host environment.
    pub fn apply_fp_env(&self) {
        fenv::set_round_mode(self.fcsr & 0b11);
        fenv::set_flush_denormals(self.fcsr & FCSR_FS != 0);
    }

    /// CFC1-style register read: FIR, FCSR, or its FEXR/FENR views.
    #[must_use]
    pub fn read(&self, reg: u32) -> u32 {
        match reg {
            0 => self.fir,
            26 => self.fcsr & FEXR_MASK,
            28 => self.fcsr & FENR_MASK,
            31 => self.fcsr,
            _ => 0,
        }
    }

    /// CTC1-style register write; read-only fields are preserved and the
    /// host FP environment is reconfigured.
    pub fn write(&mut self, reg: u32, data: u32) {
        match reg {
            26 => self.fcsr = (self.fcsr & !FEXR_MASK) | (data & FEXR_MASK),
            28 => self.fcsr = (self.fcsr & !FENR_MASK) | (data & FENR_MASK),
            31 => self.fcsr = (self.fcsr & !FCSR_WRITE_MASK) | (data & FCSR_WRITE_MASK),
            // FIR is read-only.
            _ => {}
        }

        self.apply_fp_env();
    }

    #[must_use]
    pub fn mfc1(&self, reg: u32) -> u32 {
        self.fpr[reg as usize].lo()
    }

    #[must_use]
    pub fn mfhc1(&self, reg: u32) -> u32 {
        self.fpr[reg as usize].hi()
    }

    pub fn mtc1(&mut self, reg: u32, word: u32) {
        self.fpr[reg as usize].set_lo(word);
    }

    pub fn mthc1(&mut self, reg: u32, word: u32) {
        self.fpr[reg as usize].set_hi(word);
    }

    #[must_use]
    pub fn fir(&self) -> u32 {
        self.fir
    }

    #[must_use]
    pub fn fcsr(&self) -> u32 {
        self.fcsr
    }

    #[must_use]
    pub fn fpr_bits(&self, reg: usize) -> u64 {
        self.fpr[reg].bits()
    }

    pub fn set_fpr_bits(&mut self, reg: usize, bits: u64) {
        self.fpr[reg].set_bits(bits);
    }

    /// Overwrite the whole FPU state (snapshot restore) and re-derive
    /// the host FP environment from the restored FCSR.
    pub fn restore_state(&mut self, fpr: &[u64; 32], fir: u32, fcsr: u32) {
        for (dst, &bits) in self.fpr.iter_mut().zip(fpr.iter()) {
            dst.set_bits(bits);
        }
        self.fir = fir;
        self.fcsr = fcsr;
        self.apply_fp_env();
    }

    fn enables(&self) -> u32 {
        (self.fcsr >> ENABLE_SHIFT) & 0x1F
    }

    fn cause_field(&self) -> u32 {
        (self.fcsr >> CAUSE_SHIFT) & 0x3F
    }

    fn set_cause(&mut self, bits: u32) {
        self.fcsr |= (bits & 0x3F) << CAUSE_SHIFT;
    }

    fn set_flags(&mut self, bits: u32) {
        self.fcsr |= (bits & 0x1F) << FLAG_SHIFT;
    }

    /// Consult the host exception flags after an operation.
    ///
    /// Raised exceptions become cause bits. Returns true when an enabled
    /// exception was raised (trap; the result must not be committed);
    /// otherwise the sticky flags accumulate.
    fn handle_fpu_ex(&mut self) -> bool {
        let raised = fenv::raised_causes();
        if raised == 0 {
            return false;
        }
        fenv::clear_exceptions();

        self.set_cause(raised);

        if self.enables() & raised != 0 {
            true
        } else {
            self.set_flags(raised);
            false
        }
    }

    /// Execute a CP1 arithmetic/compare word (the CPU has already peeled
    /// off the MFC1/MTC1 move forms).
    pub fn execute(&mut self, word: u32) -> FpResult {
        self.apply_fp_env();

        // The cause field is rewritten by every operation.
        self.fcsr &= !(0x3F << CAUSE_SHIFT);

        let status = match word & 0x3F {
            0x00 => self.add(word),
            0x01 => self.sub(word),
            0x02 => self.mul(word),
            0x03 => self.div(word),
            0x04 => self.sqrt(word),
            0x05 => self.abs(word),
            0x06 => self.mov(word),
            0x07 => self.neg(word),
            // ROUND.L / TRUNC.L / CEIL.L / FLOOR.L / ROUND.W / TRUNC.W /
            // CEIL.W / FLOOR.W
            0x08..=0x0F => self.unimplemented(),
            0x10 => self.sel(word),
            // MOVCF / MOVZ / MOVN were removed in release 6.
            0x11..=0x13 => OpStatus::Reserved,
            0x14 => self.seleqz(word),
            0x15 => self.recip(word),
            0x16 => self.rsqrt(word),
            0x17 => self.selnez(word),
            0x18 => self.maddf(word),
            0x19 => self.msubf(word),
            0x1A => self.rint(word),
            0x1B => self.class(word),
            0x1C => self.min(word),
            0x1D => self.max(word),
            0x1E => self.mina(word),
            0x1F => self.maxa(word),
            0x20 => self.cvt_s(word),
            0x21 => self.cvt_d(word),
            // CVT.L / CVT.W / CVT.PS
            0x24 | 0x25 | 0x26 => self.unimplemented(),
            0x28 => self.cmp(word, Pred::Af, false),
            0x29 => self.cmp(word, Pred::Un, false),
            0x2A => self.cmp(word, Pred::Eq, false),
            0x2B => self.cmp(word, Pred::Ueq, false),
            0x2C => self.cmp(word, Pred::Lt, false),
            0x2D => self.cmp(word, Pred::Ult, false),
            0x2E => self.cmp(word, Pred::Le, false),
            0x2F => self.cmp(word, Pred::Ule, false),
            0x30 => self.cmp(word, Pred::Af, true),
            0x31 => self.cmp(word, Pred::Un, true),
            0x32 => self.cmp(word, Pred::Eq, true),
            0x33 => self.cmp(word, Pred::Ueq, true),
            0x34 => self.cmp(word, Pred::Lt, true),
            0x35 => self.cmp(word, Pred::Ult, true),
            0x36 => self.cmp(word, Pred::Le, true),
            0x37 => self.cmp(word, Pred::Ule, true),
            _ => OpStatus::Reserved,
        };

        match status {
            OpStatus::Ok => FpResult::Ok,
            OpStatus::Trap => FpResult::Trap(self.cause_field()),
            OpStatus::Reserved => FpResult::Reserved,
        }
    }

    fn unimplemented(&mut self) -> OpStatus {
        self.set_cause(UNIMPLEMENTED);
        OpStatus::Trap
    }

    fn commit_f32(&mut self, fd: usize, value: f32) -> OpStatus {
        if self.handle_fpu_ex() {
            OpStatus::Trap
        } else {
            self.fpr[fd].set_f32(value);
            OpStatus::Ok
        }
    }

    fn commit_f64(&mut self, fd: usize, value: f64) -> OpStatus {
        if self.handle_fpu_ex() {
            OpStatus::Trap
        } else {
            self.fpr[fd].set_f64(value);
            OpStatus::Ok
        }
    }

    fn add(&mut self, word: u32) -> OpStatus {
        let (d, s, t) = (fd(word), fs(word), ft(word));
        if fmt(word) == FMT_S {
            let res = self.fpr[s].f32() + self.fpr[t].f32();
            self.commit_f32(d, res)
        } else {
            let res = self.fpr[s].f64() + self.fpr[t].f64();
            self.commit_f64(d, res)
        }
    }

    fn sub(&mut self, word: u32) -> OpStatus {
        let (d, s, t) = (fd(word), fs(word), ft(word));
        if fmt(word) == FMT_S {
            let res = self.fpr[s].f32() - self.fpr[t].f32();
            self.commit_f32(d, res)
        } else {
            let res = self.fpr[s].f64() - self.fpr[t].f64();
            self.commit_f64(d, res)
        }
    }

    fn mul(&mut self, word: u32) -> OpStatus {
        let (d, s, t) = (fd(word), fs(word), ft(word));
        if fmt(word) == FMT_S {
            let res = self.fpr[s].f32() * self.fpr[t].f32();
            self.commit_f32(d, res)
        } else {
            let res = self.fpr[s].f64() * self.fpr[t].f64();
            self.commit_f64(d, res)
        }
    }

    fn div(&mut self, word: u32) -> OpStatus {
        let (d, s, t) = (fd(word), fs(word), ft(word));
        if fmt(word) == FMT_S {
            let res = self.fpr[s].f32() / self.fpr[t].f32();
            self.commit_f32(d, res)
        } else {
            let res = self.fpr[s].f64() / self.fpr[t].f64();
            self.commit_f64(d, res)
        }
    }

    fn sqrt(&mut self, word: u32) -> OpStatus {
        let (d, s) = (fd(word), fs(word));
        if fmt(word) == FMT_S {
            let res = self.fpr[s].f32().sqrt();
            self.commit_f32(d, res)
        } else {
            let res = self.fpr[s].f64().sqrt();
            self.commit_f64(d, res)
        }
    }

    fn abs(&mut self, word: u32) -> OpStatus {
        let (d, s) = (fd(word), fs(word));
        if fmt(word) == FMT_S {
            let res = self.fpr[s].f32().abs();
            self.commit_f32(d, res)
        } else {
            let res = self.fpr[s].f64().abs();
            self.commit_f64(d, res)
        }
    }

    /// Bit copy; never raises.
    fn mov(&mut self, word: u32) -> OpStatus {
        let (d, s) = (fd(word), fs(word));
        if fmt(word) == FMT_S {
            let bits = self.fpr[s].lo();
            self.fpr[d].set_lo(bits);
        } else {
            let bits = self.fpr[s].bits();
            self.fpr[d].set_bits(bits);
        }
        OpStatus::Ok
    }

    fn neg(&mut self, word: u32) -> OpStatus {
        let (d, s) = (fd(word), fs(word));
        if fmt(word) == FMT_S {
            let res = -self.fpr[s].f32();
            self.commit_f32(d, res)
        } else {
            let res = -self.fpr[s].f64();
            self.commit_f64(d, res)
        }
    }

    /// fd's low integer bit picks ft (set) or fs (clear).
    fn sel(&mut self, word: u32) -> OpStatus {
        let (d, s, t) = (fd(word), fs(word), ft(word));
        if fmt(word) == FMT_S {
            let res = if self.fpr[d].lo() & 1 != 0 {
                self.fpr[t].f32()
            } else {
                self.fpr[s].f32()
            };
            self.commit_f32(d, res)
        } else {
            let res = if self.fpr[d].bits() & 1 != 0 {
                self.fpr[t].f64()
            } else {
                self.fpr[s].f64()
            };
            self.commit_f64(d, res)
        }
    }

    fn seleqz(&mut self, word: u32) -> OpStatus {
        let (d, s) = (fd(word), fs(word));
        if fmt(word) == FMT_S {
            let res = if self.fpr[d].lo() & 1 != 0 {
                0.0
            } else {
                self.fpr[s].f32()
            };
            self.commit_f32(d, res)
        } else {
            let res = if self.fpr[d].bits() & 1 != 0 {
                0.0
            } else {
                self.fpr[s].f64()
            };
            self.commit_f64(d, res)
        }
    }

    fn selnez(&mut self, word: u32) -> OpStatus {
        let (d, t) = (fd(word), ft(word));
        if fmt(word) == FMT_S {
            let res = if self.fpr[d].lo() & 1 != 0 {
                self.fpr[t].f32()
            } else {
                0.0
            };
            self.commit_f32(d, res)
        } else {
            let res = if self.fpr[d].bits() & 1 != 0 {
                self.fpr[t].f64()
            } else {
                0.0
            };
            self.commit_f64(d, res)
        }
    }

    fn recip(&mut self, word: u32) -> OpStatus {
        let (d, s) = (fd(word), fs(word));
        if fmt(word) == FMT_S {
            let res = 1.0 / self.fpr[s].f32();
            self.commit_f32(d, res)
        } else {
            let res = 1.0 / self.fpr[s].f64();
            self.commit_f64(d, res)
        }
    }

    fn rsqrt(&mut self, word: u32) -> OpStatus {
        let (d, s) = (fd(word), fs(word));
        if fmt(word) == FMT_S {
            let res = 1.0 / self.fpr[s].f32().sqrt();
            self.commit_f32(d, res)
        } else {
            let res = 1.0 / self.fpr[s].f64().sqrt();
            self.commit_f64(d, res)
        }
    }

    /// Fused multiply-add: fd = fs * ft + fd.
    fn maddf(&mut self, word: u32) -> OpStatus {
        let (d, s, t) = (fd(word), fs(word), ft(word));
        if fmt(word) == FMT_S {
            let res = self.fpr[s].f32().mul_add(self.fpr[t].f32(), self.fpr[d].f32());
            self.commit_f32(d, res)
        } else {
            let res = self.fpr[s].f64().mul_add(self.fpr[t].f64(), self.fpr[d].f64());
            self.commit_f64(d, res)
        }
    }

    /// fd = fd - fs * ft.
    fn msubf(&mut self, word: u32) -> OpStatus {
        let (d, s, t) = (fd(word), fs(word), ft(word));
        if fmt(word) == FMT_S {
            let res = self.fpr[d].f32() - self.fpr[s].f32() * self.fpr[t].f32();
            self.commit_f32(d, res)
        } else {
            let res = self.fpr[d].f64() - self.fpr[s].f64() * self.fpr[t].f64();
            self.commit_f64(d, res)
        }
    }

    /// Round to integer in the current rounding mode; the result is an
    /// integer bit pattern, not a float.
    fn rint(&mut self, word: u32) -> OpStatus {
        let (d, s) = (fd(word), fs(word));
        if fmt(word) == FMT_S {
            let res = fenv::round_to_i64_f32(self.fpr[s].f32()) as u32;
            if self.handle_fpu_ex() {
                OpStatus::Trap
            } else {
                self.fpr[d].set_lo(res);
                OpStatus::Ok
            }
        } else {
            let res = fenv::round_to_i64_f64(self.fpr[s].f64()) as u64;
            if self.handle_fpu_ex() {
                OpStatus::Trap
            } else {
                self.fpr[d].set_bits(res);
                OpStatus::Ok
            }
        }
    }

    fn class(&mut self, word: u32) -> OpStatus {
        let (d, s) = (fd(word), fs(word));
        if fmt(word) == FMT_S {
            let mask = classify(
                self.fpr[s].f32().classify(),
                self.fpr[s].f32().is_sign_negative(),
                is_snan_f32(self.fpr[s].f32()),
            );
            self.fpr[d].set_lo(mask);
        } else {
            let mask = classify(
                self.fpr[s].f64().classify(),
                self.fpr[s].f64().is_sign_negative(),
                is_snan_f64(self.fpr[s].f64()),
            );
            self.fpr[d].set_bits(u64::from(mask));
        }
        OpStatus::Ok
    }

    fn min(&mut self, word: u32) -> OpStatus {
        let (d, s, t) = (fd(word), fs(word), ft(word));
        if fmt(word) == FMT_S {
            let res = self.fpr[s].f32().min(self.fpr[t].f32());
            self.commit_f32(d, res)
        } else {
            let res = self.fpr[s].f64().min(self.fpr[t].f64());
            self.commit_f64(d, res)
        }
    }

    fn max(&mut self, word: u32) -> OpStatus {
        let (d, s, t) = (fd(word), fs(word), ft(word));
        if fmt(word) == FMT_S {
            let res = self.fpr[s].f32().max(self.fpr[t].f32());
            self.commit_f32(d, res)
        } else {
            let res = self.fpr[s].f64().max(self.fpr[t].f64());
            self.commit_f64(d, res)
        }
    }

    /// Minimum by magnitude.
    fn mina(&mut self, word: u32) -> OpStatus {
        let (d, s, t) = (fd(word), fs(word), ft(word));
        if fmt(word) == FMT_S {
            let res = self.fpr[s].f32().abs().min(self.fpr[t].f32().abs());
            self.commit_f32(d, res)
        } else {
            let res = self.fpr[s].f64().abs().min(self.fpr[t].f64().abs());
            self.commit_f64(d, res)
        }
    }

    /// Maximum by magnitude.
    fn maxa(&mut self, word: u32) -> OpStatus {
        let (d, s, t) = (fd(word), fs(word), ft(word));
        if fmt(word) == FMT_S {
            let res = self.fpr[s].f32().abs().max(self.fpr[t].f32().abs());
            self.commit_f32(d, res)
        } else {
            let res = self.fpr[s].f64().abs().max(self.fpr[t].f64().abs());
            self.commit_f64(d, res)
        }
    }

    /// Double to single conversion.
    fn cvt_s(&mut self, word: u32) -> OpStatus {
        let (d, s) = (fd(word), fs(word));
        let res = self.fpr[s].f64() as f32;
        self.commit_f32(d, res)
    }

    /// Single to double conversion.
    fn cvt_d(&mut self, word: u32) -> OpStatus {
        let (d, s) = (fd(word), fs(word));
        let res = f64::from(self.fpr[s].f32());
        self.commit_f64(d, res)
    }

    /// 2008 comparison: writes an all-ones or all-zeros mask into fd.
    ///
    /// Quiet predicates trap on signaling NaN operands; signaling
    /// predicates trap on any NaN. fd, fs, and ft are all checked.
    fn cmp(&mut self, word: u32, pred: Pred, signaling: bool) -> OpStatus {
        let (d, s, t) = (fd(word), fs(word), ft(word));
        if fmt(word) == CMP_FMT_S {
            let (a, b, old) = (self.fpr[s].f32(), self.fpr[t].f32(), self.fpr[d].f32());
            let trap = if signaling {
                old.is_nan() || a.is_nan() || b.is_nan()
            } else {
                is_snan_f32(old) || is_snan_f32(a) || is_snan_f32(b)
            };
            if trap {
                self.set_cause(INVALID);
                return OpStatus::Trap;
            }

            let unordered = a.is_nan() || b.is_nan();
            let mask = if eval_pred(pred, a, b, unordered) {
                u32::MAX
            } else {
                0
            };
            self.fpr[d].set_lo(mask);
        } else {
            let (a, b, old) = (self.fpr[s].f64(), self.fpr[t].f64(), self.fpr[d].f64());
            let trap = if signaling {
                old.is_nan() || a.is_nan() || b.is_nan()
            } else {
                is_snan_f64(old) || is_snan_f64(a) || is_snan_f64(b)
            };
            if trap {
                self.set_cause(INVALID);
                return OpStatus::Trap;
            }

            let unordered = a.is_nan() || b.is_nan();
            let mask = if eval_pred(pred, a, b, unordered) {
                u64::MAX
            } else {
                0
            };
            self.fpr[d].set_bits(mask);
        }
        OpStatus::Ok
    }
}

/// Build the 10-bit CLASS mask: sNaN(0), qNaN(1), then negative
/// infinity/normal/subnormal/zero in bits 2..5 and their positive
/// counterparts in bits 6..9.
fn classify(category: std::num::FpCategory, negative: bool, signaling: bool) -> u32 {
    use std::num::FpCategory;

    let base = match category {
        FpCategory::Nan => return if signaling { 0x001 } else { 0x002 },
        FpCategory::Infinite => 0x004,
        FpCategory::Normal => 0x008,
        FpCategory::Subnormal => 0x010,
        FpCategory::Zero => 0x020,
    };

    if negative { base } else { base << 4 }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Encode a CP1 arithmetic word: COP1 | fmt | ft | fs | fd | function.
    fn enc(fmt: u32, ft: u32, fs: u32, fd: u32, function: u32) -> u32 {
        (0b01_0001 << 26) | (fmt << 21) | (ft << 16) | (fs << 11) | (fd << 6) | function
    }

    fn cp1_with_f32(values: &[(u32, f32)]) -> Cp1 {
        let mut cp1 = Cp1::new();
        for &(reg, v) in values {
            cp1.mtc1(reg, v.to_bits());
        }
        cp1
    }

    fn cp1_with_f64(values: &[(usize, f64)]) -> Cp1 {
        let mut cp1 = Cp1::new();
        for &(reg, v) in values {
            cp1.set_fpr_bits(reg, v.to_bits());
        }
        cp1
    }

    #[test]
    fn add_single() {
        let mut cp1 = cp1_with_f32(&[(1, 1.5), (2, 2.25)]);
        assert_eq!(cp1.execute(enc(FMT_S, 2, 1, 0, 0x00)), FpResult::Ok);
        assert_eq!(f32::from_bits(cp1.mfc1(0)), 3.75);
    }

    #[test]
    fn add_double() {
        let mut cp1 = cp1_with_f64(&[(1, 1.5), (2, 2.25)]);
        assert_eq!(cp1.execute(enc(FMT_D, 2, 1, 0, 0x00)), FpResult::Ok);
        assert_eq!(f64::from_bits(cp1.fpr_bits(0)), 3.75);
    }

    #[test]
    fn sub_double_uses_double_operands() {
        let mut cp1 = cp1_with_f64(&[(1, 10.5), (2, 0.25)]);
        assert_eq!(cp1.execute(enc(FMT_D, 2, 1, 0, 0x01)), FpResult::Ok);
        assert_eq!(f64::from_bits(cp1.fpr_bits(0)), 10.25);
    }

    #[test]
    fn div_by_zero_sets_sticky_flag_when_disabled() {
        let mut cp1 = cp1_with_f32(&[(1, 1.0), (2, 0.0)]);
        assert_eq!(cp1.execute(enc(FMT_S, 2, 1, 3, 0x03)), FpResult::Ok);

        assert!(f32::from_bits(cp1.mfc1(3)).is_infinite());
        assert_eq!((cp1.fcsr() >> 2) & 0x1F, DIVBYZERO);
        assert_eq!((cp1.fcsr() >> 12) & 0x3F, DIVBYZERO);
    }

    #[test]
    fn div_by_zero_traps_when_enabled() {
        let mut cp1 = cp1_with_f32(&[(1, 1.0), (2, 0.0), (3, 7.0)]);
        cp1.write(31, cp1.fcsr() | (DIVBYZERO << 7));

        assert_eq!(
            cp1.execute(enc(FMT_S, 2, 1, 3, 0x03)),
            FpResult::Trap(DIVBYZERO)
        );
        // The destination is untouched on a trap.
        assert_eq!(f32::from_bits(cp1.mfc1(3)), 7.0);
    }

    #[test]
    fn invalid_on_zero_over_zero() {
        let mut cp1 = cp1_with_f32(&[(1, 0.0), (2, 0.0)]);
        assert_eq!(cp1.execute(enc(FMT_S, 2, 1, 0, 0x03)), FpResult::Ok);

        assert!(f32::from_bits(cp1.mfc1(0)).is_nan());
        assert_eq!((cp1.fcsr() >> 2) & 0x1F, INVALID);
    }

    #[test]
    fn overflow_raises_overflow_and_inexact() {
        let mut cp1 = cp1_with_f32(&[(1, f32::MAX), (2, f32::MAX)]);
        assert_eq!(cp1.execute(enc(FMT_S, 2, 1, 0, 0x02)), FpResult::Ok);

        let flags = (cp1.fcsr() >> 2) & 0x1F;
        assert_eq!(flags & OVERFLOW, OVERFLOW);
        assert_eq!(flags & INEXACT, INEXACT);
    }

    #[test]
    fn cause_is_rewritten_each_op() {
        let mut cp1 = cp1_with_f32(&[(1, 1.0), (2, 0.0), (4, 2.0), (5, 3.0)]);

        cp1.execute(enc(FMT_S, 2, 1, 3, 0x03));
        assert_eq!((cp1.fcsr() >> 12) & 0x3F, DIVBYZERO);

        cp1.execute(enc(FMT_S, 5, 4, 6, 0x00));
        assert_eq!((cp1.fcsr() >> 12) & 0x3F, 0);
        // The sticky flag survives.
        assert_eq!((cp1.fcsr() >> 2) & 0x1F, DIVBYZERO);
    }

    #[test]
    fn unimplemented_slots_trap_with_cause_u() {
        let mut cp1 = Cp1::new();
        assert_eq!(
            cp1.execute(enc(FMT_S, 0, 1, 2, 0x08)), // ROUND.L
            FpResult::Trap(UNIMPLEMENTED)
        );
    }

    #[test]
    fn reserved_slots_are_signaled() {
        let mut cp1 = Cp1::new();
        assert_eq!(cp1.execute(enc(FMT_S, 0, 1, 2, 0x11)), FpResult::Reserved);
        assert_eq!(cp1.execute(enc(FMT_S, 0, 1, 2, 0x3F)), FpResult::Reserved);
    }

    #[test]
    fn mov_is_a_bit_copy() {
        let mut cp1 = Cp1::new();
        cp1.set_fpr_bits(1, 0x7FF4_0000_0000_0001); // signaling NaN pattern
        assert_eq!(cp1.execute(enc(FMT_D, 0, 1, 2, 0x06)), FpResult::Ok);
        assert_eq!(cp1.fpr_bits(2), 0x7FF4_0000_0000_0001);
    }

    #[test]
    fn maddf_fuses() {
        let mut cp1 = cp1_with_f32(&[(1, 2.0), (2, 3.0), (3, 4.0)]);
        assert_eq!(cp1.execute(enc(FMT_S, 2, 1, 3, 0x18)), FpResult::Ok);
        assert_eq!(f32::from_bits(cp1.mfc1(3)), 10.0);
    }

    #[test]
    fn msubf() {
        let mut cp1 = cp1_with_f32(&[(1, 2.0), (2, 3.0), (3, 10.0)]);
        assert_eq!(cp1.execute(enc(FMT_S, 2, 1, 3, 0x19)), FpResult::Ok);
        assert_eq!(f32::from_bits(cp1.mfc1(3)), 4.0);
    }

    #[test]
    fn rint_honors_the_rounding_mode() {
        let mut cp1 = cp1_with_f32(&[(1, 1.5)]);

        assert_eq!(cp1.execute(enc(FMT_S, 0, 1, 2, 0x1A)), FpResult::Ok);
        assert_eq!(cp1.mfc1(2), 2); // round-to-nearest-even

        cp1.write(31, (cp1.fcsr() & !0b11) | 0b01); // RZ
        assert_eq!(cp1.execute(enc(FMT_S, 0, 1, 2, 0x1A)), FpResult::Ok);
        assert_eq!(cp1.mfc1(2), 1);

        cp1.write(31, cp1.fcsr() & !0b11); // back to RN
    }

    #[test]
    fn min_max_ignore_one_nan() {
        let mut cp1 = cp1_with_f32(&[(1, f32::NAN), (2, 4.0)]);
        assert_eq!(cp1.execute(enc(FMT_S, 2, 1, 3, 0x1C)), FpResult::Ok);
        assert_eq!(f32::from_bits(cp1.mfc1(3)), 4.0);

        assert_eq!(cp1.execute(enc(FMT_S, 2, 1, 4, 0x1D)), FpResult::Ok);
        assert_eq!(f32::from_bits(cp1.mfc1(4)), 4.0);
    }

    #[test]
    fn mina_maxa_compare_magnitudes() {
        let mut cp1 = cp1_with_f32(&[(1, -8.0), (2, 4.0)]);
        assert_eq!(cp1.execute(enc(FMT_S, 2, 1, 3, 0x1E)), FpResult::Ok);
        assert_eq!(f32::from_bits(cp1.mfc1(3)), 4.0);

        assert_eq!(cp1.execute(enc(FMT_S, 2, 1, 4, 0x1F)), FpResult::Ok);
        assert_eq!(f32::from_bits(cp1.mfc1(4)), 8.0);
    }

    #[test]
    fn sel_picks_by_fd_low_bit() {
        let mut cp1 = cp1_with_f32(&[(1, 5.0), (2, 9.0)]);

        cp1.mtc1(3, 0);
        assert_eq!(cp1.execute(enc(FMT_S, 2, 1, 3, 0x10)), FpResult::Ok);
        assert_eq!(f32::from_bits(cp1.mfc1(3)), 5.0);

        cp1.mtc1(3, 1);
        assert_eq!(cp1.execute(enc(FMT_S, 2, 1, 3, 0x10)), FpResult::Ok);
        assert_eq!(f32::from_bits(cp1.mfc1(3)), 9.0);
    }

    #[test]
    fn class_masks() {
        let mut cp1 = cp1_with_f32(&[
            (1, 1.0),
            (2, -1.0),
            (3, 0.0),
            (4, -0.0),
            (5, f32::INFINITY),
            (6, f32::NEG_INFINITY),
            (7, f32::NAN),
        ]);

        let class = |cp1: &mut Cp1, fs: u32, fd: u32| {
            cp1.execute(enc(FMT_S, 0, fs, fd, 0x1B));
            cp1.mfc1(fd)
        };

        assert_eq!(class(&mut cp1, 1, 8), 0x080); // +normal
        assert_eq!(class(&mut cp1, 2, 8), 0x008); // -normal
        assert_eq!(class(&mut cp1, 3, 8), 0x200); // +zero
        assert_eq!(class(&mut cp1, 4, 8), 0x020); // -zero
        assert_eq!(class(&mut cp1, 5, 8), 0x040); // +inf
        assert_eq!(class(&mut cp1, 6, 8), 0x004); // -inf
        assert_eq!(class(&mut cp1, 7, 8), 0x002); // quiet NaN
    }

    #[test]
    fn cvt_between_formats() {
        let mut cp1 = cp1_with_f64(&[(1, 2.5)]);
        assert_eq!(cp1.execute(enc(FMT_D, 0, 1, 2, 0x20)), FpResult::Ok); // CVT.S
        assert_eq!(f32::from_bits(cp1.mfc1(2)), 2.5);

        assert_eq!(cp1.execute(enc(FMT_S, 0, 2, 3, 0x21)), FpResult::Ok); // CVT.D
        assert_eq!(f64::from_bits(cp1.fpr_bits(3)), 2.5);
    }

    #[test]
    fn cmp_eq_lt_le_single() {
        let mut cp1 = cp1_with_f32(&[(1, 1.0), (2, 2.0)]);

        cp1.execute(enc(CMP_FMT_S, 2, 1, 3, 0x2C)); // LT
        assert_eq!(cp1.mfc1(3), u32::MAX);

        cp1.mtc1(3, 0);
        cp1.execute(enc(CMP_FMT_S, 1, 2, 3, 0x2C));
        assert_eq!(cp1.mfc1(3), 0);

        cp1.execute(enc(CMP_FMT_S, 1, 1, 3, 0x2A)); // EQ
        assert_eq!(cp1.mfc1(3), u32::MAX);

        cp1.execute(enc(CMP_FMT_S, 2, 1, 3, 0x2E)); // LE
        assert_eq!(cp1.mfc1(3), u32::MAX);
    }

    #[test]
    fn cmp_double_writes_a_doubleword_mask() {
        let mut cp1 = cp1_with_f64(&[(1, 1.0), (2, 2.0)]);
        cp1.execute(enc(CMP_FMT_D, 2, 1, 3, 0x2C));
        assert_eq!(cp1.fpr_bits(3), u64::MAX);
    }

    #[test]
    fn unordered_predicates_see_quiet_nans() {
        let mut cp1 = cp1_with_f32(&[(1, f32::NAN), (2, 2.0)]);

        cp1.execute(enc(CMP_FMT_S, 2, 1, 3, 0x29)); // UN
        assert_eq!(cp1.mfc1(3), u32::MAX);

        cp1.mtc1(3, 0);
        cp1.execute(enc(CMP_FMT_S, 2, 1, 3, 0x2D)); // ULT
        assert_eq!(cp1.mfc1(3), u32::MAX);

        cp1.mtc1(3, 0);
        cp1.execute(enc(CMP_FMT_S, 2, 1, 3, 0x2A)); // EQ: ordered, false
        assert_eq!(cp1.mfc1(3), 0);
    }

    #[test]
    fn signaling_compare_traps_on_quiet_nan() {
        let mut cp1 = cp1_with_f32(&[(1, f32::NAN), (2, 2.0)]);
        assert_eq!(
            cp1.execute(enc(CMP_FMT_S, 2, 1, 3, 0x34)), // SLT
            FpResult::Trap(INVALID)
        );
    }

    #[test]
    fn quiet_compare_traps_on_signaling_nan_only() {
        let mut cp1 = Cp1::new();
        cp1.mtc1(1, 0x7FA0_0000); // signaling NaN
        cp1.mtc1(2, 2.0f32.to_bits());

        assert_eq!(
            cp1.execute(enc(CMP_FMT_S, 2, 1, 3, 0x2C)),
            FpResult::Trap(INVALID)
        );
    }

    #[test]
    fn register_views() {
        let mut cp1 = Cp1::new();
        assert_eq!(cp1.read(0), 0x00C3_0000);

        cp1.write(31, 0xFFFF_FFFF);
        assert_eq!(cp1.fcsr(), (0x010C_0000 & !0x0163_FFFF) | 0x0163_FFFF);

        // FEXR exposes flags + cause; FENR enables + round mode.
        assert_eq!(cp1.read(26), cp1.fcsr() & 0x0003_F07C);
        assert_eq!(cp1.read(28), cp1.fcsr() & 0x0000_0F87);

        let fir = cp1.read(0);
        cp1.write(0, 0xDEAD_BEEF);
        assert_eq!(cp1.read(0), fir);

        cp1.write(31, 0x010C_0000);
    }

    #[test]
    fn move_halves_are_independent() {
        let mut cp1 = Cp1::new();
        cp1.mtc1(5, 0xDDDD_EEEE);
        cp1.mthc1(5, 0xAAAA_BBBB);

        assert_eq!(cp1.mfc1(5), 0xDDDD_EEEE);
        assert_eq!(cp1.mfhc1(5), 0xAAAA_BBBB);
        assert_eq!(cp1.fpr_bits(5), 0xAAAA_BBBB_DDDD_EEEE);
    }
}
