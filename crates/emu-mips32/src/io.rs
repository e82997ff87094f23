//! Host-side adapter implementations.
//!
//! [`StdioDevice`] maps the console services onto stdin/stdout;
//! [`FsFileHandler`] maps the file services onto `std::fs`. Both are
//! what the CLI binary injects; tests use their own mocks.

use cpu_mips32::{FileHandler, IoDevice};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, Read, Write};

/// Terminal adapter over the process stdin/stdout.
#[derive(Debug, Default)]
pub struct StdioDevice;

impl StdioDevice {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn read_line() -> String {
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
        line
    }
}

impl IoDevice for StdioDevice {
    fn write_integer(&mut self, value: u32) {
        print!("{}", value as i32);
        let _ = std::io::stdout().flush();
    }

    fn write_float(&mut self, value: f32) {
        print!("{value}");
        let _ = std::io::stdout().flush();
    }

    fn write_double(&mut self, value: f64) {
        print!("{value}");
        let _ = std::io::stdout().flush();
    }

    fn write_string(&mut self, string: &[u8]) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(string);
        let _ = stdout.flush();
    }

    fn read_integer(&mut self) -> u32 {
        Self::read_line().trim().parse::<i64>().unwrap_or(0) as u32
    }

    fn read_float(&mut self) -> f32 {
        Self::read_line().trim().parse().unwrap_or(0.0)
    }

    fn read_double(&mut self) -> f64 {
        Self::read_line().trim().parse().unwrap_or(0.0)
    }

    fn read_string(&mut self, buffer: &mut [u8]) {
        let line = Self::read_line();
        let bytes = line.as_bytes();
        let count = bytes.len().min(buffer.len());
        buffer[..count].copy_from_slice(&bytes[..count]);
    }
}

/// Guest file-descriptor error value (-1).
const BAD_FD: u32 = u32::MAX;

/// File adapter backed by the host filesystem.
///
/// Guest descriptors start at 3 and map to open [`File`]s. The flag
/// bytes follow the classic assembler-simulator convention: 0 read,
/// 1 write (create/truncate), 9 append; the ASCII letters `r`/`w`/`a`
/// are accepted too.
#[derive(Debug, Default)]
pub struct FsFileHandler {
    files: HashMap<u32, File>,
    next_fd: u32,
}

impl FsFileHandler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
            next_fd: 3,
        }
    }
}

impl FileHandler for FsFileHandler {
    fn open(&mut self, name: &[u8], flags: &[u8]) -> u32 {
        let Ok(name) = std::str::from_utf8(name) else {
            return BAD_FD;
        };

        let mut options = OpenOptions::new();
        match flags.first() {
            Some(0 | b'r') => options.read(true),
            Some(1 | b'w') => options.write(true).create(true).truncate(true),
            Some(9 | b'a') => options.append(true).create(true),
            _ => return BAD_FD,
        };

        match options.open(name) {
            Ok(file) => {
                let fd = self.next_fd;
                self.next_fd += 1;
                self.files.insert(fd, file);
                fd
            }
            Err(e) => {
                log::warn!("open {name:?} failed: {e}");
                BAD_FD
            }
        }
    }

    fn read(&mut self, fd: u32, dst: &mut [u8]) -> u32 {
        let Some(file) = self.files.get_mut(&fd) else {
            return 0;
        };
        file.read(dst).unwrap_or(0) as u32
    }

    fn write(&mut self, fd: u32, src: &[u8]) -> u32 {
        let Some(file) = self.files.get_mut(&fd) else {
            return 0;
        };
        file.write(src).unwrap_or(0) as u32
    }

    fn close(&mut self, fd: u32) {
        if let Some(mut file) = self.files.remove(&fd) {
            let _ = file.flush();
        }
    }
}
