//! Display-time masking of numeric values.
//!
//! Every table cell and chart label that shows a market number goes through
//! [`format_value_with`]. A masked value is replaced by a fixed run of block
//! glyphs that is built without looking at the value at all, so no digit,
//! sign or width of the real number can leak into the placeholder.

use serde::{Deserialize, Serialize};

pub const MASK_GLYPH: char = '█';
/// Number of glyphs in a masked cell.
pub const MASK_WIDTH: usize = 8;
/// Fractional digits used when the caller does not ask for a precision.
pub const DEFAULT_PRECISION: usize = 2;

const SCRAMBLE_LEN: usize = 2;
const SCRAMBLE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Format with the default precision of two fractional digits.
pub fn format_value(value: f64, encrypted: bool) -> String {
    format_value_with(value, encrypted, DEFAULT_PRECISION)
}

pub fn format_value_with(value: f64, encrypted: bool, precision: usize) -> String {
    if encrypted {
        return placeholder();
    }
    format!("{value:.precision$}")
}

/// Like [`format_value_with`], but a masked value gets a short random letter
/// suffix so repeated renders flicker. `draw` yields uniform samples in `[0, 1)`.
pub fn format_value_scrambled(
    value: f64,
    encrypted: bool,
    precision: usize,
    mut draw: impl FnMut() -> f64,
) -> String {
    if !encrypted {
        return format_value_with(value, false, precision);
    }
    let mut out = placeholder();
    for _ in 0..SCRAMBLE_LEN {
        let idx = (draw().clamp(0.0, 0.999_999) * SCRAMBLE_ALPHABET.len() as f64) as usize;
        out.push(SCRAMBLE_ALPHABET[idx.min(SCRAMBLE_ALPHABET.len() - 1)] as char);
    }
    out
}

fn placeholder() -> String {
    std::iter::repeat(MASK_GLYPH).take(MASK_WIDTH).collect()
}

/// How a view decides which rows are masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskPolicy {
    /// Respect each row's own flag.
    #[default]
    PerRow,
    /// A view-wide toggle overrides every row.
    Force(bool),
}

impl MaskPolicy {
    pub fn resolve(&self, row_encrypted: bool) -> bool {
        match *self {
            MaskPolicy::PerRow => row_encrypted,
            MaskPolicy::Force(masked) => masked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_values_round_to_precision() {
        assert_eq!(format_value(3.14159, false), "3.14");
        assert_eq!(format_value_with(3.14159, false, 2), "3.14");
        assert_eq!(format_value_with(2450.0, false, 0), "2450");
        assert_eq!(format_value_with(0.5, false, 3), "0.500");
    }

    #[test]
    fn masked_values_have_one_shape_and_no_digits() {
        let samples = [0.0, 3.14159, -42.5, 45_000.0, 1.0e12, f64::NAN];
        let expected = format_value(1.0, true);
        for v in samples {
            let masked = format_value_with(v, true, 4);
            assert_eq!(masked, expected);
            assert_eq!(masked.chars().count(), MASK_WIDTH);
            assert!(!masked.chars().any(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn scrambled_suffix_is_letters_only() {
        let mut draws = [0.0, 0.999_999_9, 0.5].into_iter().cycle();
        let masked = format_value_scrambled(987.65, true, 2, || draws.next().unwrap_or(0.0));
        assert_eq!(masked.chars().count(), MASK_WIDTH + SCRAMBLE_LEN);
        assert!(masked.starts_with(&format_value(0.0, true)));
        assert!(masked.ends_with("az"));
        assert!(!masked.chars().any(|c| c.is_ascii_digit()));

        assert_eq!(format_value_scrambled(987.654, false, 2, || 0.3), "987.65");
    }

    #[test]
    fn policy_force_overrides_row_flag() {
        assert!(MaskPolicy::PerRow.resolve(true));
        assert!(!MaskPolicy::PerRow.resolve(false));
        assert!(MaskPolicy::Force(true).resolve(false));
        assert!(!MaskPolicy::Force(false).resolve(true));
    }
}
