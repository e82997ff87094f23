//! Host floating-point environment control.
//!
//! The FPU maps guest IEEE-754 semantics onto the host FPU: rounding
//! mode through `fesetround`, exception detection through
//! `fetestexcept`, and flush-to-zero for subnormals through the x86
//! MXCSR. The FP environment is thread-global state; the engine
//! reapplies its configuration on every CP1 entry and after every FCSR
//! write.

#![allow(unsafe_code)]

use crate::cp1::{DIVBYZERO, INEXACT, INVALID, OVERFLOW, UNDERFLOW};

unsafe extern "C" {
    fn llrintf(value: f32) -> i64;
    fn llrint(value: f64) -> i64;
    fn fesetround(mode: i32) -> i32;
    fn fetestexcept(excepts: i32) -> i32;
    fn feclearexcept(excepts: i32) -> i32;
}

// glibc/x86_64 <fenv.h> values; not exposed by the `libc` crate.
const FE_TONEAREST: i32 = 0x0000;
const FE_DOWNWARD: i32 = 0x0400;
const FE_UPWARD: i32 = 0x0800;
const FE_TOWARDZERO: i32 = 0x0c00;

const FE_INVALID: i32 = 0x01;
const FE_DIVBYZERO: i32 = 0x04;
const FE_OVERFLOW: i32 = 0x08;
const FE_UNDERFLOW: i32 = 0x10;
const FE_INEXACT: i32 = 0x20;
const FE_ALL_EXCEPT: i32 = FE_INVALID | FE_DIVBYZERO | FE_OVERFLOW | FE_UNDERFLOW | FE_INEXACT;

/// Apply an FCSR rounding-mode field (RN/RZ/RP/RM) to the host.
pub(crate) fn set_round_mode(mode: u32) {
    let host = match mode & 0b11 {
        0 => FE_TONEAREST,
        1 => FE_TOWARDZERO,
        2 => FE_UPWARD,
        _ => FE_DOWNWARD,
    };
    // SAFETY: fesetround only alters this thread's FP control state.
    unsafe {
        fesetround(host);
    }
}

/// Raised host exceptions, mapped to FCSR cause bits.
pub(crate) fn raised_causes() -> u32 {
    // SAFETY: fetestexcept reads the FP status flags without side effects.
    let raised = unsafe { fetestexcept(FE_ALL_EXCEPT) };

    let mut causes = 0;
    if raised & FE_INVALID != 0 {
        causes |= INVALID;
    }
    if raised & FE_DIVBYZERO != 0 {
        causes |= DIVBYZERO;
    }
    if raised & FE_OVERFLOW != 0 {
        causes |= OVERFLOW;
    }
    if raised & FE_UNDERFLOW != 0 {
        causes |= UNDERFLOW;
    }
    if raised & FE_INEXACT != 0 {
        causes |= INEXACT;
    }
    causes
}

/// Clear the host exception flags after they have been consulted.
pub(crate) fn clear_exceptions() {
    // SAFETY: feclearexcept only clears the FP status flags.
    unsafe {
        feclearexcept(FE_ALL_EXCEPT);
    }
}

/// Toggle flush-to-zero handling of subnormal results (FCSR.FS).
#[allow(deprecated)]
pub(crate) fn set_flush_denormals(enabled: bool) {
    #[cfg(target_arch = "x86_64")]
    {
        use core::arch::x86_64::{
            _MM_FLUSH_ZERO_OFF, _MM_FLUSH_ZERO_ON, _MM_SET_FLUSH_ZERO_MODE,
        };
        // SAFETY: flips the MXCSR flush-to-zero bit only.
        unsafe {
            _MM_SET_FLUSH_ZERO_MODE(if enabled {
                _MM_FLUSH_ZERO_ON
            } else {
                _MM_FLUSH_ZERO_OFF
            });
        }
    }
    #[cfg(not(target_arch = "x86_64"))]
    let _ = enabled;
}

/// Round to integer honoring the current host rounding mode.
pub(crate) fn round_to_i64_f32(value: f32) -> i64 {
    // SAFETY: llrintf is a pure libm call (plus FP flag side effects).
    unsafe { llrintf(value) }
}

/// Round to integer honoring the current host rounding mode.
pub(crate) fn round_to_i64_f64(value: f64) -> i64 {
    // SAFETY: llrint is a pure libm call (plus FP flag side effects).
    unsafe { llrint(value) }
}
