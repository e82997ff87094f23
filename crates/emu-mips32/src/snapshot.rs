//! Machine state snapshots.
//!
//! Four files per snapshot name, each opening with the 8-byte header
//! `{magic: "fama", version: 1}`:
//!
//! - `<name>.ram`: block budget, then every resident and swapped block
//!   as `{base, access_count, data}` (swapped data pulled from the
//!   spill files).
//! - `<name>.cp0`: the CP0 register bank in declaration order.
//! - `<name>.cp1`: 32 FPRs, FIR, FCSR. Restore re-derives the host FP
//!   environment from the restored FCSR.
//! - `<name>.cpu`: MMU segments, PC, GPRs. Saving or restoring the CPU
//!   also covers CP0 and CP1, and the exit code always restores to
//!   `NONE`.
//!
//! A bad header or short file fails the restore before any state is
//!   touched; staged values are applied only after a full parse.

use cpu_mips32::{BLOCK_WORDS, ExitCode, Segment};
use std::fs;
use std::path::Path;

use crate::Machine;

const MAGIC: u32 = 0x6661_6D61; // "fama"
const VERSION: u32 = 1;

/// Which component a snapshot call covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Ram,
    Cp0,
    Cp1,
    Cpu,
    All,
}

/// Snapshot save/restore failure. Restores leave the machine untouched.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad snapshot header in {0}")]
    BadHeader(String),
    #[error("truncated snapshot file {0}")]
    Truncated(String),
}

struct Reader {
    bytes: Vec<u8>,
    pos: usize,
    name: String,
}

impl Reader {
    fn open(path: &str) -> Result<Self, SnapshotError> {
        let bytes = fs::read(Path::new(path))?;
        let mut reader = Self {
            bytes,
            pos: 0,
            name: path.to_owned(),
        };

        if reader.u32()? != MAGIC || reader.u32()? != VERSION {
            return Err(SnapshotError::BadHeader(reader.name));
        }
        Ok(reader)
    }

    fn u32(&mut self) -> Result<u32, SnapshotError> {
        let end = self.pos + 4;
        let chunk = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| SnapshotError::Truncated(self.name.clone()))?;
        self.pos = end;
        Ok(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
    }

    fn u64(&mut self) -> Result<u64, SnapshotError> {
        let low = self.u32()?;
        let high = self.u32()?;
        Ok(u64::from(low) | (u64::from(high) << 32))
    }

    fn words(&mut self, count: usize) -> Result<Vec<u32>, SnapshotError> {
        let mut words = Vec::with_capacity(count);
        for _ in 0..count {
            words.push(self.u32()?);
        }
        Ok(words)
    }
}

struct Writer {
    bytes: Vec<u8>,
}

impl Writer {
    fn new() -> Self {
        let mut writer = Self { bytes: Vec::new() };
        writer.u32(MAGIC);
        writer.u32(VERSION);
        writer
    }

    fn u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn u64(&mut self, value: u64) {
        self.u32(value as u32);
        self.u32((value >> 32) as u32);
    }

    fn finish(self, path: &str) -> Result<(), SnapshotError> {
        fs::write(Path::new(path), self.bytes)?;
        Ok(())
    }
}

impl Machine {
    /// Write the selected component's state under the `name` prefix.
    pub fn save_state(&mut self, component: Component, name: &str) -> Result<(), SnapshotError> {
        match component {
            Component::Ram => self.save_ram(name),
            Component::Cp0 => self.save_cp0(name),
            Component::Cp1 => self.save_cp1(name),
            Component::Cpu => self.save_cpu(name),
            Component::All => {
                self.save_cpu(name)?;
                self.save_ram(name)
            }
        }
    }

    /// Restore the selected component's state from the `name` prefix.
    pub fn restore_state(
        &mut self,
        component: Component,
        name: &str,
    ) -> Result<(), SnapshotError> {
        match component {
            Component::Ram => self.restore_ram(name),
            Component::Cp0 => self.restore_cp0(name),
            Component::Cp1 => self.restore_cp1(name),
            Component::Cpu => self.restore_cpu(name),
            Component::All => {
                self.restore_cpu(name)?;
                self.restore_ram(name)
            }
        }
    }

    fn save_ram(&mut self, name: &str) -> Result<(), SnapshotError> {
        let mut out = Writer::new();

        out.u32(self.ram.limit_blocks());
        out.u32(self.ram.resident_count());
        out.u32(self.ram.swapped_count());

        for block in self.ram.resident_blocks() {
            out.u32(block.base_address);
            out.u32(block.access_count);
            for &word in block.data {
                out.u32(word);
            }
        }

        for base in self.ram.swapped_addresses() {
            out.u32(base);
            out.u32(0);
            for word in self.ram.spilled_block_data(base)? {
                out.u32(word);
            }
        }

        out.finish(&format!("{name}.ram"))
    }

    fn restore_ram(&mut self, name: &str) -> Result<(), SnapshotError> {
        let mut input = Reader::open(&format!("{name}.ram"))?;

        let limit_blocks = input.u32()?;
        let resident_no = input.u32()?;
        let swapped_no = input.u32()?;

        let mut resident = Vec::with_capacity(resident_no as usize);
        for _ in 0..resident_no {
            let base = input.u32()?;
            let access_count = input.u32()?;
            resident.push((base, access_count, input.words(BLOCK_WORDS)?));
        }

        let mut swapped = Vec::with_capacity(swapped_no as usize);
        for _ in 0..swapped_no {
            let base = input.u32()?;
            let _access_count = input.u32()?;
            swapped.push((base, input.words(BLOCK_WORDS)?));
        }

        self.ram.restore(limit_blocks, resident, swapped)?;
        Ok(())
    }

    fn save_cp0(&mut self, name: &str) -> Result<(), SnapshotError> {
        let cp0 = &self.cpu.cp0;
        let mut out = Writer::new();

        out.u32(cp0.user_local);
        out.u32(cp0.hwr_ena);
        out.u32(cp0.bad_vaddr);
        out.u32(cp0.bad_instr);
        out.u32(cp0.status);
        out.u32(cp0.int_ctl);
        out.u32(cp0.srs_ctl);
        out.u32(cp0.cause);
        out.u32(cp0.epc);
        out.u32(cp0.pr_id);
        out.u32(cp0.e_base);
        for config in cp0.config {
            out.u32(config);
        }
        out.u32(cp0.error_epc);
        for scratch in cp0.k_scratch {
            out.u32(scratch);
        }

        out.finish(&format!("{name}.cp0"))
    }

    fn restore_cp0(&mut self, name: &str) -> Result<(), SnapshotError> {
        let mut input = Reader::open(&format!("{name}.cp0"))?;

        let user_local = input.u32()?;
        let hwr_ena = input.u32()?;
        let bad_vaddr = input.u32()?;
        let bad_instr = input.u32()?;
        let status = input.u32()?;
        let int_ctl = input.u32()?;
        let srs_ctl = input.u32()?;
        let cause = input.u32()?;
        let epc = input.u32()?;
        let pr_id = input.u32()?;
        let e_base = input.u32()?;
        let mut config = [0u32; 5];
        for register in &mut config {
            *register = input.u32()?;
        }
        let error_epc = input.u32()?;
        let mut k_scratch = [0u32; 8];
        for register in &mut k_scratch {
            *register = input.u32()?;
        }

        self.cpu.cp0 = cpu_mips32::Cp0 {
            user_local,
            hwr_ena,
            bad_vaddr,
            bad_instr,
            status,
            int_ctl,
            srs_ctl,
            cause,
            epc,
            pr_id,
            e_base,
            config,
            error_epc,
            k_scratch,
        };
        Ok(())
    }

    fn save_cp1(&mut self, name: &str) -> Result<(), SnapshotError> {
        let mut out = Writer::new();

        for reg in 0..32 {
            out.u64(self.cpu.cp1.fpr_bits(reg));
        }
        out.u32(self.cpu.cp1.fir());
        out.u32(self.cpu.cp1.fcsr());

        out.finish(&format!("{name}.cp1"))
    }

    fn restore_cp1(&mut self, name: &str) -> Result<(), SnapshotError> {
        let mut input = Reader::open(&format!("{name}.cp1"))?;

        let mut fpr = [0u64; 32];
        for reg in &mut fpr {
            *reg = input.u64()?;
        }
        let fir = input.u32()?;
        let fcsr = input.u32()?;

        self.cpu.cp1.restore_state(&fpr, fir, fcsr);
        Ok(())
    }

    fn save_cpu(&mut self, name: &str) -> Result<(), SnapshotError> {
        self.save_cp0(name)?;
        self.save_cp1(name)?;

        let mut out = Writer::new();

        let segments = self.cpu.mmu.segments();
        out.u32(segments.len() as u32);
        for segment in segments {
            out.u32(segment.base_address);
            out.u32(segment.limit);
            out.u32(segment.access_flags);
        }

        out.u32(self.cpu.pc);
        for &gpr in &self.cpu.gpr {
            out.u32(gpr);
        }

        out.finish(&format!("{name}.cpu"))
    }

    fn restore_cpu(&mut self, name: &str) -> Result<(), SnapshotError> {
        // Parse the .cpu file fully before touching anything, then let
        // the (already validated) CP0/CP1 restores run first as in the
        // save order.
        let mut input = Reader::open(&format!("{name}.cpu"))?;

        let segment_no = input.u32()?;
        let mut segments = Vec::with_capacity(segment_no as usize);
        for _ in 0..segment_no {
            let base_address = input.u32()?;
            let limit = input.u32()?;
            let access_flags = input.u32()?;
            segments.push(Segment::new(base_address, limit, access_flags));
        }

        let pc = input.u32()?;
        let mut gpr = [0u32; 32];
        for reg in &mut gpr {
            *reg = input.u32()?;
        }

        self.restore_cp0(name)?;
        self.restore_cp1(name)?;

        self.cpu.mmu.set_segments(segments);
        self.cpu.pc = pc;
        self.cpu.gpr = gpr;
        self.cpu.set_exit_code(ExitCode::None);
        Ok(())
    }
}
