//! The CPU core: architectural state and the fetch/decode/execute loop.
//!
//! Each step fetches through the MMU, advances the PC by 4 *before*
//! dispatching (so handlers observe the PC of the next instruction),
//! executes one instruction, and re-zeroes register 0. The loop runs
//! until the atomic exit-code cell leaves `NONE`; a [`StopHandle`] lets
//! another thread request a cooperative stop at the next instruction
//! boundary.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::cp0::Cp0;
use crate::cp1::{Cp1, FpResult};
use crate::decode::{opcode, rd, rt};
use crate::exceptions::ExCause;
use crate::io::{FileHandler, IoDevice};
use crate::mmu::Mmu;
use crate::ram::Ram;

/// Why the run loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ExitCode {
    /// Still running (or never started).
    None = 0,
    /// `stop()` was called.
    ManualStop = 1,
    /// An interrupt ended the run.
    Interrupt = 2,
    /// An exception ended the run (BREAK).
    Exception = 3,
    /// The guest invoked the exit service.
    Exit = 4,
}

impl ExitCode {
    #[must_use]
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => Self::ManualStop,
            2 => Self::Interrupt,
            3 => Self::Exception,
            4 => Self::Exit,
            _ => Self::None,
        }
    }
}

/// Cross-thread handle to the CPU's exit-code cell.
///
/// The only state shared with a running CPU; `stop` uses a release
/// store, the run loop reads with acquire once per instruction.
#[derive(Debug, Clone)]
pub struct StopHandle {
    exit_code: Arc<AtomicU32>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.exit_code
            .store(ExitCode::ManualStop as u32, Ordering::Release);
    }
}

/// The MIPS32r6 CPU with its coprocessors and MMU.
///
/// Memory is passed in by the caller on every step, mirroring how the
/// other cores in this workspace take their bus.
pub struct Cpu {
    pub gpr: [u32; 32],
    pub pc: u32,
    pub cp0: Cp0,
    pub cp1: Cp1,
    pub mmu: Mmu,
    exit_code: Arc<AtomicU32>,
    pub(crate) io_device: Option<Box<dyn IoDevice>>,
    pub(crate) file_handler: Option<Box<dyn FileHandler>>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// Create a CPU in the hard-reset state.
    #[must_use]
    pub fn new() -> Self {
        let mut cpu = Self {
            gpr: [0; 32],
            pc: 0,
            cp0: Cp0::default(),
            cp1: Cp1::new(),
            mmu: Mmu::fixed_mapping(),
            exit_code: Arc::new(AtomicU32::new(ExitCode::None as u32)),
            io_device: None,
            file_handler: None,
        };
        cpu.hard_reset();
        cpu
    }

    /// Attach the console device, returning the previous one.
    pub fn attach_io_device(&mut self, device: Box<dyn IoDevice>) -> Option<Box<dyn IoDevice>> {
        self.io_device.replace(device)
    }

    /// Attach the file handler, returning the previous one.
    pub fn attach_file_handler(
        &mut self,
        handler: Box<dyn FileHandler>,
    ) -> Option<Box<dyn FileHandler>> {
        self.file_handler.replace(handler)
    }

    /// Reset to the architectural power-on state: kernel mode, CP0/CP1
    /// defaults, PC at the boot vector.
    pub fn hard_reset(&mut self) {
        self.gpr = [0; 32];
        self.cp0.reset();
        self.cp1.reset();
        self.enter_kernel_mode();
        self.pc = 0xBFC0_0000;
        self.set_exit_code(ExitCode::None);
    }

    /// Run until something sets the exit code.
    pub fn start(&mut self, ram: &mut Ram) -> ExitCode {
        self.set_exit_code(ExitCode::None);

        while self.exit_code.load(Ordering::Acquire) == ExitCode::None as u32 {
            self.step(ram);
        }

        self.exit_code()
    }

    /// Request a cooperative stop at the next instruction boundary.
    pub fn stop(&self) {
        self.exit_code
            .store(ExitCode::ManualStop as u32, Ordering::Release);
    }

    /// A handle other threads can use to stop a running CPU.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            exit_code: Arc::clone(&self.exit_code),
        }
    }

    /// Execute exactly one instruction, reporting its outcome.
    pub fn single_step(&mut self, ram: &mut Ram) -> ExitCode {
        self.set_exit_code(ExitCode::None);
        self.step(ram);
        self.exit_code()
    }

    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from_u32(self.exit_code.load(Ordering::Acquire))
    }

    pub fn set_exit_code(&mut self, code: ExitCode) {
        self.exit_code.store(code as u32, Ordering::Release);
    }

    fn step(&mut self, ram: &mut Ram) {
        let mode = self.running_mode();
        let word = self.mmu.access(ram, self.pc, mode).map(|w| *w);

        match word {
            Some(word) if self.pc & 0b11 == 0 => {
                self.pc = self.pc.wrapping_add(4);
                self.dispatch(ram, word);
                self.gpr[0] = 0;
            }
            _ => self.signal_exception(ExCause::AdEL, 0, self.pc),
        }
    }

    /// Top-level opcode dispatch. Slots not named here are reserved in
    /// release 6 and raise RI.
    fn dispatch(&mut self, ram: &mut Ram, word: u32) {
        match opcode(word) {
            0x00 => self.special(ram, word),
            0x01 => self.regimm(word),
            0x02 => self.j(word),
            0x03 => self.jal(word),
            0x04 => self.beq(word),
            0x05 => self.bne(word),
            0x06 => self.pop06(word),
            0x07 => self.pop07(word),
            0x08 => self.pop10(word),
            0x09 => self.addiu(word),
            0x0A => self.slti(word),
            0x0B => self.sltiu(word),
            0x0C => self.andi(word),
            0x0D => self.ori(word),
            0x0E => self.xori(word),
            0x0F => self.aui(word),
            0x10 => self.cop0(word),
            0x11 => self.cop1(word),
            // 0x12 COP2 / 0x13 COP1X: no coprocessor 2.
            // 0x14 BEQL / 0x15 BNEL: likely branches, removed in r6.
            0x16 => self.pop26(word),
            0x17 => self.pop27(word),
            0x18 => self.pop30(word),
            // 0x1C SPECIAL2 / 0x1D JALX / 0x1E MSA: removed or absent.
            0x1F => self.special3(word),
            0x20 => self.lb(ram, word),
            0x21 => self.lh(ram, word),
            // 0x22 LWL: removed in r6.
            0x23 => self.lw(ram, word),
            0x24 => self.lbu(ram, word),
            0x25 => self.lhu(ram, word),
            // 0x26 LWR: removed in r6.
            0x28 => self.sb(ram, word),
            0x29 => self.sh(ram, word),
            // 0x2A SWL: removed in r6.
            0x2B => self.sw(ram, word),
            // 0x2E SWR / 0x2F CACHE / 0x30 LL: removed or relocated in r6.
            0x31 => self.lwc1(ram, word),
            0x32 => self.bc(word),
            // 0x33 PREF: relocated in r6.
            0x35 => self.ldc1(ram, word),
            0x36 => self.pop66(word),
            0x39 => self.swc1(ram, word),
            0x3A => self.balc(word),
            0x3B => self.pcrel(ram, word),
            0x3D => self.sdc1(ram, word),
            0x3E => self.pop76(word),
            _ => self.reserved(word),
        }
    }

    /// COP1: transfer instructions are handled here; everything else is
    /// the FPU's 64-slot function space.
    fn cop1(&mut self, word: u32) {
        const MFC1: u32 = 0b00_000;
        const MFHC1: u32 = 0b00_011;
        const MTC1: u32 = 0b00_100;
        const MTHC1: u32 = 0b00_111;

        // The FPR for the transfer forms sits in the rd position.
        let fpr = rd(word) as u32;
        let rt = rt(word);

        match (word >> 21) & 0x1F {
            MFC1 => self.gpr[rt] = self.cp1.mfc1(fpr),
            MFHC1 => self.gpr[rt] = self.cp1.mfhc1(fpr),
            MTC1 => self.cp1.mtc1(fpr, self.gpr[rt]),
            MTHC1 => self.cp1.mthc1(fpr, self.gpr[rt]),
            _ => match self.cp1.execute(word) {
                FpResult::Ok => {}
                FpResult::Trap(_) => {
                    self.signal_exception(ExCause::FPE, word, self.pc.wrapping_sub(4));
                }
                FpResult::Reserved => self.reserved(word),
            },
        }
    }
}
