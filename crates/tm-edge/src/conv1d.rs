use tm_core::BorderMode;

/// Correlates `signal` with a symmetric odd-length `kernel` centred at
/// `radius`, writing one output per input sample.
pub fn convolve_f32(
    signal: &[f32],
    kernel: &[f32],
    radius: usize,
    border: BorderMode,
    out: &mut [f32],
) {
    assert_eq!(out.len(), signal.len(), "out must match signal length");
    assert_eq!(
        kernel.len(),
        2 * radius + 1,
        "kernel len must be 2*radius+1"
    );

    let n = signal.len();
    if n == 0 {
        return;
    }

    let interior = radius..n.saturating_sub(radius);
    for (i, out_i) in out.iter_mut().enumerate() {
        let base = i as isize - radius as isize;
        *out_i = if interior.contains(&i) {
            // Full kernel footprint is inside the signal.
            let window = &signal[i - radius..=i + radius];
            window.iter().zip(kernel).map(|(s, k)| s * k).sum()
        } else {
            kernel
                .iter()
                .enumerate()
                .map(|(k, &kv)| border.fetch(signal, base + k as isize) * kv)
                .sum()
        };
    }
}

/// Discrete first derivative: central differences inside, one-sided
/// differences at both ends. Signals shorter than 2 give all zeros.
pub fn central_difference(signal: &[f32], out: &mut [f32]) {
    assert_eq!(out.len(), signal.len(), "out must match signal length");

    let n = signal.len();
    if n < 2 {
        out.fill(0.0);
        return;
    }

    out[0] = signal[1] - signal[0];
    out[n - 1] = signal[n - 1] - signal[n - 2];
    for i in 1..n - 1 {
        out[i] = 0.5 * (signal[i + 1] - signal[i - 1]);
    }
}
