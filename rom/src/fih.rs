/*++

Licensed under the Apache-2.0 license.

File Name:

    fih.rs

Abstract:

    Fault injection hardened result type and comparison helpers.

--*/

use core::hint::black_box;

/// XOR mask relating the two halves of a result.
const FIH_MASK_VALUE: u32 = 0xa5c3_5a3c;

const FIH_POSITIVE_VALUE: u32 = 0x1aaa_aaaa;
const FIH_NEGATIVE_VALUE: u32 = 0x1555_5555;

/// Result of a security decision.
///
/// The value is stored twice, once plain and once XORed with
/// `FIH_MASK_VALUE`. A pair whose halves disagree is never equal to anything,
/// so a single corrupted word or skipped store cannot produce SUCCESS.
///
/// There is no conversion from `bool` or from a raw word, and no
/// `PartialEq`; use [`fih_eq`] and [`fih_not_eq`].
///
/// ```compile_fail
/// let _ = mcu_single_loader::FihResult::from_raw(0x1aaa_aaaa);
/// ```
#[derive(Clone, Copy, Debug)]
#[must_use]
pub struct FihResult {
    val: u32,
    msk: u32,
}

impl FihResult {
    pub const SUCCESS: FihResult = FihResult::encode(FIH_POSITIVE_VALUE);
    pub const FAILURE: FihResult = FihResult::encode(FIH_NEGATIVE_VALUE);

    const fn encode(val: u32) -> Self {
        Self {
            val,
            msk: val ^ FIH_MASK_VALUE,
        }
    }

    /// A well-formed result carrying an arbitrary value.
    #[cfg(test)]
    pub(crate) const fn from_raw(val: u32) -> Self {
        Self::encode(val)
    }

    #[cfg(test)]
    pub(crate) const fn from_parts(val: u32, msk: u32) -> Self {
        Self { val, msk }
    }

    pub fn raw(&self) -> u32 {
        self.val
    }

    fn is_consistent(&self) -> bool {
        (black_box(self.val) ^ black_box(self.msk)) == FIH_MASK_VALUE
    }

    /// Both redundant checks against SUCCESS must agree.
    pub fn is_success(&self) -> bool {
        fih_eq(*self, Self::SUCCESS) & !fih_not_eq(*self, Self::SUCCESS)
    }
}

/// True only if both halves match and both operands are well formed. Every
/// sub-comparison is evaluated.
#[inline(never)]
pub fn fih_eq(a: FihResult, b: FihResult) -> bool {
    let a = black_box(a);
    let b = black_box(b);
    let val_eq = black_box(a.val == b.val);
    let msk_eq = black_box(a.msk == b.msk);
    val_eq & msk_eq & a.is_consistent() & b.is_consistent()
}

/// True if the halves differ or either operand is malformed. Not computed as
/// `!fih_eq` so that one skipped branch cannot flip both.
#[inline(never)]
pub fn fih_not_eq(a: FihResult, b: FihResult) -> bool {
    let a = black_box(a);
    let b = black_box(b);
    let val_ne = black_box(a.val != b.val);
    let msk_ne = black_box(a.msk != b.msk);
    val_ne | msk_ne | !a.is_consistent() | !b.is_consistent()
}

/// Collapses anything that is not unambiguously SUCCESS to FAILURE.
pub fn fih_normalize(rc: FihResult) -> FihResult {
    if fih_not_eq(rc, FihResult::SUCCESS) {
        return FihResult::FAILURE;
    }
    if !fih_eq(rc, FihResult::SUCCESS) {
        romtime::error!("[mcu-boot] FIH check mismatch, treating as failure");
        return FihResult::FAILURE;
    }
    rc
}

/// Runs a protected operation. The result starts as FAILURE and is only
/// replaced by the value the operation itself returns.
#[inline(never)]
pub fn fih_call<F>(op: F) -> FihResult
where
    F: FnOnce() -> FihResult,
{
    let mut rc = FihResult::FAILURE;
    black_box(&mut rc);
    rc = op();
    fih_normalize(rc)
}
