//! Elementwise kernels for the render hot path
//!
//! Scalar implementations of the contracts the render path needs. Slices
//! must be equal length; that is the caller's responsibility and is only
//! checked in debug builds.

/// dst += src
#[inline]
pub fn add_assign(dst: &mut [f32], src: &[f32]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src) {
        *d += s;
    }
}

/// dst = src * gain
#[inline]
pub fn scale(dst: &mut [f32], src: &[f32], gain: f32) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src) {
        *d = s * gain;
    }
}

/// dst *= gain
#[inline]
pub fn scale_assign(dst: &mut [f32], gain: f32) {
    for d in dst.iter_mut() {
        *d *= gain;
    }
}

/// dst += a * b, elementwise
#[inline]
pub fn add_product(dst: &mut [f32], a: &[f32], b: &[f32]) {
    debug_assert_eq!(dst.len(), a.len());
    debug_assert_eq!(dst.len(), b.len());
    for (d, (x, y)) in dst.iter_mut().zip(a.iter().zip(b)) {
        *d += x * y;
    }
}

/// dst += src * gain
#[inline]
pub fn add_scaled(dst: &mut [f32], src: &[f32], gain: f32) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src) {
        *d += s * gain;
    }
}
