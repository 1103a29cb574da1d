//! 16-bit fixed-point angle quantisation.
//!
//! Yaw in `[-180, 180)` and pitch in `[-90, 90]` are mapped linearly onto
//! the full `u16` range. Inputs are clamped before encoding and rounded to
//! the nearest step, so a decoded angle is within half a step of the
//! original.

const U16_SPAN: f64 = u16::MAX as f64;

/// Width of one yaw quantisation step, in degrees.
pub const YAW_STEP: f64 = 360.0 / U16_SPAN;

/// Width of one pitch quantisation step, in degrees.
pub const PITCH_STEP: f64 = 180.0 / U16_SPAN;

fn encode(angle: f64, min: f64, max: f64) -> u16 {
    // NaN clamps to the bottom of the range rather than poisoning the cast.
    let clamped = if angle.is_nan() {
        min
    } else {
        angle.clamp(min, max)
    };
    (((clamped - min) / (max - min)) * U16_SPAN).round() as u16
}

fn decode(encoded: u16, min: f64, max: f64) -> f64 {
    (encoded as f64 / U16_SPAN) * (max - min) + min
}

/// Quantise a yaw angle.
pub fn encode_yaw(yaw: f64) -> u16 {
    encode(yaw, -180.0, 180.0)
}

/// Recover a yaw angle from its quantised form.
pub fn decode_yaw(encoded: u16) -> f64 {
    decode(encoded, -180.0, 180.0)
}

/// Quantise a pitch angle.
pub fn encode_pitch(pitch: f64) -> u16 {
    encode(pitch, -90.0, 90.0)
}

/// Recover a pitch angle from its quantised form.
pub fn decode_pitch(encoded: u16) -> f64 {
    decode(encoded, -90.0, 90.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn range_endpoints_map_to_u16_extremes() {
        assert_eq!(encode_yaw(-180.0), 0);
        assert_eq!(encode_yaw(180.0), u16::MAX);
        assert_eq!(encode_pitch(-90.0), 0);
        assert_eq!(encode_pitch(90.0), u16::MAX);
    }

    #[test]
    fn out_of_range_input_is_clamped() {
        assert_eq!(encode_yaw(720.0), u16::MAX);
        assert_eq!(encode_pitch(-135.0), 0);
        assert_eq!(encode_yaw(f64::NAN), 0);
    }

    #[test]
    fn pitch_uses_its_own_range() {
        // 45 degrees is three quarters of the pitch range but only
        // five eighths of the yaw range.
        assert_eq!(encode_pitch(45.0), (0.75 * U16_SPAN).round() as u16);
        assert_eq!(encode_yaw(45.0), (0.625 * U16_SPAN).round() as u16);
    }

    #[test]
    fn zero_decodes_close_to_zero() {
        assert!(decode_yaw(encode_yaw(0.0)).abs() <= YAW_STEP);
        assert!(decode_pitch(encode_pitch(0.0)).abs() <= PITCH_STEP);
    }

    proptest! {
        #[test]
        fn yaw_round_trip_within_one_step(yaw in -180.0f64..180.0) {
            let back = decode_yaw(encode_yaw(yaw));
            prop_assert!((back - yaw).abs() <= 360.0 / 65536.0);
        }

        #[test]
        fn pitch_round_trip_within_one_step(pitch in -90.0f64..=90.0) {
            let back = decode_pitch(encode_pitch(pitch));
            prop_assert!((back - pitch).abs() <= 180.0 / 65536.0);
        }
    }
}
