//! Gamma lookup table access
//!
//! The table is generated at compile time by build.rs with one exact entry
//! per 8-bit channel value.

include!(concat!(env!("OUT_DIR"), "/gamma_table.rs"));

/// Convert an 8-bit sRGB channel value to linear light.
#[inline]
pub fn srgb8_to_linear(value: u8) -> f32 {
    SRGB8_TO_LINEAR[value as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact(value: u8) -> f32 {
        let c = value as f64 / 255.0;
        let linear = if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        };
        linear as f32
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(srgb8_to_linear(0), 0.0);
        assert_eq!(srgb8_to_linear(255), 1.0);
    }

    #[test]
    fn test_table_matches_formula_bit_for_bit() {
        for v in 0..=255u8 {
            assert_eq!(
                srgb8_to_linear(v).to_bits(),
                exact(v).to_bits(),
                "table entry {v} differs from the IEC 61966-2-1 formula"
            );
        }
    }

    #[test]
    fn test_linear_segment_below_knee() {
        // 10/255 = 0.0392 is below the 0.04045 knee
        let expected = (10.0f64 / 255.0 / 12.92) as f32;
        assert_eq!(srgb8_to_linear(10), expected);
    }

    #[test]
    fn test_monotonicity() {
        let mut prev = srgb8_to_linear(0);
        for v in 1..=255u8 {
            let curr = srgb8_to_linear(v);
            assert!(curr > prev, "srgb8_to_linear not strictly increasing at {v}");
            prev = curr;
        }
    }
}
