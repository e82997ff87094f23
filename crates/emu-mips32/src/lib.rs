//! MIPS32r6 machine.
//!
//! Wires the [`cpu_mips32`] core to host devices and adds the outer
//! conveniences: a [`Machine`] façade, a [`MachineInspector`] for tests
//! and tooling, state snapshots, and stdio/filesystem adapters for the
//! CLI binary.

pub mod io;
mod inspector;
mod machine;
mod snapshot;

pub use inspector::{MachineInspector, RamInfo};
pub use machine::Machine;
pub use snapshot::{Component, SnapshotError};

pub use cpu_mips32::{ExitCode, FileHandler, IoDevice, StopHandle};
