//! SYSCALL service dispatch.
//!
//! The service number travels in v0 (r2); arguments in a0..a2
//! (r4..r6); results come back in v0 or f0. Console services delegate
//! to the attached [`IoDevice`](crate::io::IoDevice), file services to
//! the attached [`FileHandler`](crate::io::FileHandler). An invalid
//! service number raises a Sys exception.

use crate::cpu::{Cpu, ExitCode};
use crate::exceptions::ExCause;
use crate::ram::Ram;
use crate::ram_io::RamIo;

const V0: usize = 2;
const A0: usize = 4;
const A1: usize = 5;
const A2: usize = 6;

impl Cpu {
    pub(crate) fn syscall(&mut self, ram: &mut Ram, word: u32) {
        match self.gpr[V0] {
            // print_int
            1 => {
                let value = self.gpr[A0];
                if let Some(io) = self.io_device.as_deref_mut() {
                    io.write_integer(value);
                }
            }
            // print_float: $f12, single view
            2 => {
                let value = f32::from_bits(self.cp1.mfc1(12));
                if let Some(io) = self.io_device.as_deref_mut() {
                    io.write_float(value);
                }
            }
            // print_double: $f12, full width
            3 => {
                let bits = u64::from(self.cp1.mfc1(12)) | (u64::from(self.cp1.mfhc1(12)) << 32);
                if let Some(io) = self.io_device.as_deref_mut() {
                    io.write_double(f64::from_bits(bits));
                }
            }
            // print_string: NUL-terminated at a0
            4 => {
                let string = RamIo::new(ram).read_string(self.gpr[A0], u32::MAX);
                if let Some(io) = self.io_device.as_deref_mut() {
                    io.write_string(&string);
                }
            }
            // read_int
            5 => {
                if let Some(io) = self.io_device.as_deref_mut() {
                    self.gpr[V0] = io.read_integer();
                }
            }
            // read_float into $f0
            6 => {
                if let Some(io) = self.io_device.as_deref_mut() {
                    let value = io.read_float();
                    self.cp1.mtc1(0, value.to_bits());
                }
            }
            // read_double into the full $f0
            7 => {
                if let Some(io) = self.io_device.as_deref_mut() {
                    let bits = io.read_double().to_bits();
                    self.cp1.mtc1(0, bits as u32);
                    self.cp1.mthc1(0, (bits >> 32) as u32);
                }
            }
            // read_string: at most a1 bytes into RAM at a0
            8 => {
                let (address, length) = (self.gpr[A0], self.gpr[A1]);
                let mut buffer = vec![0u8; length as usize];
                if let Some(io) = self.io_device.as_deref_mut() {
                    io.read_string(&mut buffer);
                }
                RamIo::new(ram).write(address, &buffer);
            }
            // sbrk: no allocator behind it; surfaces as an interrupt
            9 => self.signal_exception(ExCause::Int, word, self.pc.wrapping_sub(4)),
            // exit
            10 | 17 => self.set_exit_code(ExitCode::Exit),
            // print_char
            11 => {
                let byte = (self.gpr[A0] & 0xFF) as u8;
                if let Some(io) = self.io_device.as_deref_mut() {
                    io.write_string(&[byte]);
                }
            }
            // read_char (sign-extended like a C char)
            12 => {
                let mut byte = [0u8; 1];
                if let Some(io) = self.io_device.as_deref_mut() {
                    io.read_string(&mut byte);
                    self.gpr[V0] = byte[0] as i8 as i32 as u32;
                }
            }
            // file open: name at a0, raw flag bytes from a1
            13 => {
                let name = RamIo::new(ram).read_string(self.gpr[A0], u32::MAX);
                let flags = self.gpr[A1].to_le_bytes();
                if let Some(fh) = self.file_handler.as_deref_mut() {
                    self.gpr[V0] = fh.open(&name, &flags);
                }
            }
            // file read: fd in a0, buffer at a1, count in a2
            14 => {
                let (fd, address, count) = (self.gpr[A0], self.gpr[A1], self.gpr[A2]);
                let mut buffer = vec![0u8; count as usize];
                if let Some(fh) = self.file_handler.as_deref_mut() {
                    self.gpr[V0] = fh.read(fd, &mut buffer);
                }
                RamIo::new(ram).write(address, &buffer);
            }
            // file write: fd in a0, buffer at a1, count in a2
            15 => {
                let (fd, address, count) = (self.gpr[A0], self.gpr[A1], self.gpr[A2]);
                let data = RamIo::new(ram).read(address, count);
                if let Some(fh) = self.file_handler.as_deref_mut() {
                    self.gpr[V0] = fh.write(fd, &data);
                }
            }
            // file close
            16 => {
                let fd = self.gpr[A0];
                if let Some(fh) = self.file_handler.as_deref_mut() {
                    fh.close(fd);
                }
                self.gpr[V0] = 0;
            }
            _ => self.signal_exception(ExCause::Sys, word, self.pc.wrapping_sub(4)),
        }
    }
}
