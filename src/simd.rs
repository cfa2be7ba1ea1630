//! SIMD kernels for vector arithmetic using the `wide` crate.
//!
//! Each kernel processes 8 lanes at a time with `f32x8` and falls back to
//! scalar code for short inputs and chunk remainders.

use wide::f32x8;

/// Dot product of two equal-length vectors.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    if a.len() < 8 {
        return a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    }

    let mut acc = f32x8::splat(0.0);

    let chunks_a = a.chunks_exact(8);
    let chunks_b = b.chunks_exact(8);
    let remainder_a = chunks_a.remainder();
    let remainder_b = chunks_b.remainder();

    for (chunk_a, chunk_b) in chunks_a.zip(chunks_b) {
        let va = f32x8::new(chunk_a.try_into().unwrap());
        let vb = f32x8::new(chunk_b.try_into().unwrap());
        acc += va * vb;
    }

    let mut total = acc.to_array().iter().sum::<f32>();
    total += remainder_a
        .iter()
        .zip(remainder_b.iter())
        .map(|(x, y)| x * y)
        .sum::<f32>();

    total
}

/// Squared Euclidean distance between two equal-length vectors.
pub fn squared_l2_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    if a.len() < 8 {
        return a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
    }

    let mut acc = f32x8::splat(0.0);

    let chunks_a = a.chunks_exact(8);
    let chunks_b = b.chunks_exact(8);
    let remainder_a = chunks_a.remainder();
    let remainder_b = chunks_b.remainder();

    for (chunk_a, chunk_b) in chunks_a.zip(chunks_b) {
        let va = f32x8::new(chunk_a.try_into().unwrap());
        let vb = f32x8::new(chunk_b.try_into().unwrap());
        let diff = va - vb;
        acc += diff * diff;
    }

    let mut total = acc.to_array().iter().sum::<f32>();
    total += remainder_a
        .iter()
        .zip(remainder_b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>();

    total
}

/// Sum of squared components, i.e. the squared L2 norm.
pub fn sum_of_squares(a: &[f32]) -> f32 {
    if a.len() < 8 {
        return a.iter().map(|x| x * x).sum();
    }

    let mut acc = f32x8::splat(0.0);

    let chunks = a.chunks_exact(8);
    let remainder = chunks.remainder();

    for chunk in chunks {
        let v = f32x8::new(chunk.try_into().unwrap());
        acc += v * v;
    }

    let mut total = acc.to_array().iter().sum::<f32>();
    total += remainder.iter().map(|x| x * x).sum::<f32>();

    total
}
