//! Concave and convex source curves as defined by the SoundFont 2.01 specification.

use std::sync::LazyLock;

// -------------------------------------------------------------------------------------------------

/// Number of entries in the curve tables: one per 7-bit controller value.
pub const CURVE_TABLE_SIZE: usize = 128;

/// Peak attenuation in centibels the curves are modeled on.
const PEAK_ATTENUATION_CB: f64 = 960.0;

// -------------------------------------------------------------------------------------------------

/// Precomputed concave and convex curves.
struct CurveTables {
    concave: [f64; CURVE_TABLE_SIZE],
    convex: [f64; CURVE_TABLE_SIZE],
}

impl CurveTables {
    fn new() -> Self {
        let mut concave = [0.0; CURVE_TABLE_SIZE];
        let mut convex = [0.0; CURVE_TABLE_SIZE];

        let last = CURVE_TABLE_SIZE - 1;
        concave[last] = 1.0;
        convex[last] = 1.0;

        // 96 dB of attenuation mapped onto the controller range, mirrored for concave
        for i in 1..last {
            let x = (-200.0 * 2.0 / PEAK_ATTENUATION_CB) * (i as f64 / last as f64).log10();
            convex[i] = 1.0 - x;
            concave[last - i] = x;
        }

        Self { concave, convex }
    }
}

static CURVE_TABLES: LazyLock<CurveTables> = LazyLock::new(CurveTables::new);

// -------------------------------------------------------------------------------------------------

/// Force initialization of the curve tables, so the first evaluation on the audio thread
/// does not need to compute them.
pub fn init_curve_tables() {
    LazyLock::force(&CURVE_TABLES);
}

/// Concave curve for a value in range `0.0..=127.0`, linearly interpolated between table steps.
pub fn concave(value: f64) -> f64 {
    interpolate(&CURVE_TABLES.concave, value)
}

/// Convex curve for a value in range `0.0..=127.0`, linearly interpolated between table steps.
pub fn convex(value: f64) -> f64 {
    interpolate(&CURVE_TABLES.convex, value)
}

#[inline]
fn interpolate(table: &[f64; CURVE_TABLE_SIZE], value: f64) -> f64 {
    if value < 0.0 {
        return 0.0;
    }
    let index = value as usize;
    if index >= CURVE_TABLE_SIZE - 1 {
        return table[CURVE_TABLE_SIZE - 1];
    }
    table[index] + (table[index + 1] - table[index]) * (value - index as f64)
}

// -------------------------------------------------------------------------------------------------
