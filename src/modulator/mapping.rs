use crate::{
    modulator::{SourceCurve, SourceDirection, SourceMapping, SourcePolarity},
    utils::curve,
};

// -------------------------------------------------------------------------------------------------

/// Map a raw controller value in range `0..=range` through the given source mapping.
///
/// Unipolar mappings produce values in `0..=1`, bipolar ones in `-1..=1`. Custom and undefined
/// curves can't be mapped here: they log an error and produce 0.
pub fn map_source(value: f64, range: f64, mapping: SourceMapping) -> f64 {
    let normalized = if range > 0.0 {
        (value / range).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let SourceMapping {
        curve,
        polarity,
        direction,
    } = mapping;

    match curve {
        SourceCurve::Linear => match (polarity, direction) {
            (SourcePolarity::Unipolar, SourceDirection::Positive) => normalized,
            (SourcePolarity::Unipolar, SourceDirection::Negative) => 1.0 - normalized,
            (SourcePolarity::Bipolar, SourceDirection::Positive) => -1.0 + 2.0 * normalized,
            (SourcePolarity::Bipolar, SourceDirection::Negative) => 1.0 - 2.0 * normalized,
        },
        SourceCurve::Concave => map_curved(normalized, polarity, direction, curve::concave),
        SourceCurve::Convex => map_curved(normalized, polarity, direction, curve::convex),
        SourceCurve::Switch => {
            let on = normalized >= 0.5;
            match (polarity, direction) {
                (SourcePolarity::Unipolar, SourceDirection::Positive) => bool_value(on, 0.0),
                (SourcePolarity::Unipolar, SourceDirection::Negative) => bool_value(!on, 0.0),
                (SourcePolarity::Bipolar, SourceDirection::Positive) => bool_value(on, -1.0),
                (SourcePolarity::Bipolar, SourceDirection::Negative) => bool_value(!on, -1.0),
            }
        }
        SourceCurve::Custom => {
            log::error!("Custom source curves need a mapping function");
            0.0
        }
        SourceCurve::Undefined(curve) => {
            log::error!("Unknown modulator source curve {curve}");
            0.0
        }
    }
}

#[inline]
fn bool_value(on: bool, off_value: f64) -> f64 {
    if on {
        1.0
    } else {
        off_value
    }
}

/// Concave and convex mappings. Bipolar variants split the range in halves, mirroring the
/// curve around the center.
#[inline]
fn map_curved(
    normalized: f64,
    polarity: SourcePolarity,
    direction: SourceDirection,
    curve: fn(f64) -> f64,
) -> f64 {
    const MAX: f64 = (curve::CURVE_TABLE_SIZE - 1) as f64;
    match (polarity, direction) {
        (SourcePolarity::Unipolar, SourceDirection::Positive) => curve(MAX * normalized),
        (SourcePolarity::Unipolar, SourceDirection::Negative) => curve(MAX * (1.0 - normalized)),
        (SourcePolarity::Bipolar, direction) => {
            let value = if normalized > 0.5 {
                curve(MAX * 2.0 * (normalized - 0.5))
            } else {
                -curve(MAX * 2.0 * (0.5 - normalized))
            };
            match direction {
                SourceDirection::Positive => value,
                SourceDirection::Negative => -value,
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------
