//! Structured access to the machine's architectural state.
//!
//! Tests and the snapshot layer read and write registers, PC, CP0/CP1
//! state, and RAM bytes through this view instead of reaching into the
//! core types. Borrow the inspector from
//! [`Machine::inspector`](crate::Machine::inspector).

use cpu_mips32::{BLOCK_SIZE, Cp0, Cpu, ExitCode, Ram, RamIo, Segment};

/// RAM topology summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamInfo {
    /// In-memory budget in bytes.
    pub alloc_limit: u32,
    /// Block size in bytes.
    pub block_size: u32,
    pub resident_blocks_no: u32,
    pub swapped_blocks_no: u32,
    pub resident_addresses: Vec<u32>,
    pub swapped_addresses: Vec<u32>,
}

/// A borrowed window over a [`Machine`](crate::Machine)'s state.
pub struct MachineInspector<'m> {
    ram: &'m mut Ram,
    cpu: &'m mut Cpu,
}

impl<'m> MachineInspector<'m> {
    pub(crate) fn new(ram: &'m mut Ram, cpu: &'m mut Cpu) -> Self {
        Self { ram, cpu }
    }

    // === CPU ===

    #[must_use]
    pub fn gpr(&self, index: usize) -> u32 {
        self.cpu.gpr[index]
    }

    pub fn set_gpr(&mut self, index: usize, value: u32) {
        self.cpu.gpr[index] = value;
    }

    #[must_use]
    pub fn pc(&self) -> u32 {
        self.cpu.pc
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.cpu.pc = pc;
    }

    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        self.cpu.exit_code()
    }

    pub fn set_exit_code(&mut self, code: ExitCode) {
        self.cpu.set_exit_code(code);
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        self.cpu.mmu.segments()
    }

    pub fn set_segments(&mut self, segments: Vec<Segment>) {
        self.cpu.mmu.set_segments(segments);
    }

    // === CP0 ===

    #[must_use]
    pub fn cp0(&self) -> &Cp0 {
        &self.cpu.cp0
    }

    pub fn cp0_mut(&mut self) -> &mut Cp0 {
        &mut self.cpu.cp0
    }

    /// Cause.ExcCode, the 5-bit exception code of the last exception.
    #[must_use]
    pub fn ex_cause(&self) -> u32 {
        (self.cpu.cp0.cause >> 2) & 0x1F
    }

    // === CP1 ===

    #[must_use]
    pub fn fpr(&self, index: usize) -> u64 {
        self.cpu.cp1.fpr_bits(index)
    }

    pub fn set_fpr(&mut self, index: usize, bits: u64) {
        self.cpu.cp1.set_fpr_bits(index, bits);
    }

    #[must_use]
    pub fn fir(&self) -> u32 {
        self.cpu.cp1.fir()
    }

    #[must_use]
    pub fn fcsr(&self) -> u32 {
        self.cpu.cp1.fcsr()
    }

    pub fn restore_cp1(&mut self, fpr: &[u64; 32], fir: u32, fcsr: u32) {
        self.cpu.cp1.restore_state(fpr, fir, fcsr);
    }

    // === RAM ===

    #[must_use]
    pub fn ram_info(&self) -> RamInfo {
        RamInfo {
            alloc_limit: self.ram.alloc_limit(),
            block_size: BLOCK_SIZE,
            resident_blocks_no: self.ram.resident_count(),
            swapped_blocks_no: self.ram.swapped_count(),
            resident_addresses: self.ram.resident_addresses(),
            swapped_addresses: self.ram.swapped_addresses(),
        }
    }

    /// The word containing `address` (allocates like a CPU access).
    #[must_use]
    pub fn ram_word(&mut self, address: u32) -> u32 {
        *self.ram.word(address)
    }

    pub fn set_ram_word(&mut self, address: u32, value: u32) {
        *self.ram.word(address) = value;
    }

    pub fn ram_read(&mut self, address: u32, count: u32) -> Vec<u8> {
        RamIo::new(self.ram).read(address, count)
    }

    pub fn ram_read_string(&mut self, address: u32, count: u32) -> Vec<u8> {
        RamIo::new(self.ram).read_string(address, count)
    }

    pub fn ram_write(&mut self, address: u32, bytes: &[u8]) {
        RamIo::new(self.ram).write(address, bytes);
    }
}
