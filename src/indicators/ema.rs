use rust_decimal::Decimal;

/// Decimal places kept in indicator output, matching the exchange's
/// displayed price precision
const OUTPUT_SCALE: u32 = 8;

/// Exponential moving average over `values`, aligned 1:1 with the input.
///
/// Smoothing factor is `2 / (window + 1)`. The series is seeded with the
/// first value rather than a simple-average warmup, so the first `window`
/// outputs lean toward the earliest sample; every output is rounded to
/// 8 decimal places.
pub fn ema_series(values: &[Decimal], window: usize) -> Vec<Decimal> {
    if values.is_empty() || window == 0 {
        return Vec::new();
    }

    let alpha = Decimal::from(2) / Decimal::from(window as u64 + 1);

    let mut out = Vec::with_capacity(values.len());
    let mut ema = values[0];
    out.push(ema.round_dp(OUTPUT_SCALE));

    for value in &values[1..] {
        ema = (value - ema) * alpha + ema;
        out.push(ema.round_dp(OUTPUT_SCALE));
    }

    out
}
