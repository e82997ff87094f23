//! Top-level MIPS32 machine.
//!
//! Owns the RAM and the CPU and wires in the host adapters. The CPU
//! borrows memory per step, so the machine is the only place both live
//! together; everything outside talks to this type (or to the
//! [`MachineInspector`](crate::MachineInspector) it hands out).

use cpu_mips32::{Cpu, ExitCode, FileHandler, IoDevice, Ram, RamIo, StopHandle};
use std::path::Path;

/// A complete simulator instance: RAM + CPU + attached host devices.
pub struct Machine {
    pub(crate) ram: Ram,
    pub(crate) cpu: Cpu,
}

impl Machine {
    /// Build a machine with `ram_alloc_limit` bytes of resident memory
    /// (a non-zero multiple of the block size) and the two host
    /// adapters attached. The CPU comes up hard-reset.
    #[must_use]
    pub fn new(
        ram_alloc_limit: u32,
        io_device: Box<dyn IoDevice>,
        file_handler: Box<dyn FileHandler>,
    ) -> Self {
        let ram = Ram::new(ram_alloc_limit);
        let mut cpu = Cpu::new();
        cpu.attach_io_device(io_device);
        cpu.attach_file_handler(file_handler);

        log::debug!("machine up: {ram_alloc_limit} bytes of resident RAM");

        Self { ram, cpu }
    }

    /// Keep spill files inside `dir` instead of the working directory.
    #[must_use]
    pub fn with_spill_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.ram.set_spill_dir(dir);
        self
    }

    /// Copy a flat program image into RAM at `address`.
    pub fn load(&mut self, image: &[u8], address: u32) {
        log::debug!("loading {} bytes at 0x{address:08X}", image.len());
        RamIo::new(&mut self.ram).write(address, image);
    }

    /// Run until exit, stop, or a run-ending exception.
    pub fn run(&mut self) -> ExitCode {
        self.cpu.start(&mut self.ram)
    }

    /// Stop a run from this thread.
    pub fn stop(&mut self) {
        self.cpu.stop();
    }

    /// Handle for stopping a run from another thread.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.cpu.stop_handle()
    }

    /// Execute exactly one instruction.
    pub fn single_step(&mut self) -> ExitCode {
        self.cpu.single_step(&mut self.ram)
    }

    /// Hard-reset the CPU and coprocessors. RAM contents survive.
    pub fn reset(&mut self) {
        self.cpu.hard_reset();
    }

    /// Exchange the console device, returning the previous one.
    pub fn swap_io_device(&mut self, device: Box<dyn IoDevice>) -> Option<Box<dyn IoDevice>> {
        self.cpu.attach_io_device(device)
    }

    /// Exchange the file handler, returning the previous one.
    pub fn swap_file_handler(
        &mut self,
        handler: Box<dyn FileHandler>,
    ) -> Option<Box<dyn FileHandler>> {
        self.cpu.attach_file_handler(handler)
    }

    /// Structured access to the architectural state, for tests and the
    /// snapshot layer.
    pub fn inspector(&mut self) -> crate::MachineInspector<'_> {
        crate::MachineInspector::new(&mut self.ram, &mut self.cpu)
    }
}
