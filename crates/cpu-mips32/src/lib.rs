//! MIPS32 Release 6 functional simulator core.
//!
//! Executes unmodified MIPS32r6 machine code at the architectural level:
//! no pipeline, no caches, no cycle accounting. One [`Cpu::single_step`]
//! is one retired instruction.
//!
//! The pieces compose the way the hardware does:
//!
//! - [`Ram`]: a 4 GiB word space backed by a bounded set of in-memory
//!   blocks, spilling the least-accessed block to disk when over budget.
//! - [`RamIo`]: byte-granular access over the same blocks, for strings
//!   and buffered I/O.
//! - [`Mmu`]: fixed segment mapping (useg/kseg0+1/ksseg/kseg3) gating
//!   every access by privilege mode.
//! - [`Cp0`]: privilege and exception state with field-level write masks.
//! - [`Cp1`]: the IEEE-754 FPU, leaning on the host FP environment for
//!   rounding and exception flags.
//! - [`Cpu`]: fetch, decode, dispatch, exceptions, syscalls.
//!
//! Memory is passed to the CPU on each step, like the bus parameter of
//! the other CPU cores in this workspace. Console and file syscalls go
//! through the injected [`IoDevice`] and [`FileHandler`] adapters.

mod arith;
mod branches;
mod cp0;
mod cp1;
mod cpu;
mod decode;
mod exceptions;
mod fenv;
mod io;
mod memory;
mod mmu;
mod ram;
mod ram_io;
mod syscall;

pub use cp0::Cp0;
pub use cp1::{Cp1, FpResult, Fpr};
pub use cpu::{Cpu, ExitCode, StopHandle};
pub use exceptions::ExCause;
pub use io::{FileHandler, IoDevice};
pub use mmu::{Mmu, Segment};
pub use ram::{BLOCK_SIZE, BLOCK_WORDS, BlockView, Ram, block_base, block_file_name};
pub use ram_io::RamIo;
