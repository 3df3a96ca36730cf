use std::fmt;

/// A signed 16.16 fixed-point number.
///
/// The file format stores these as a little-endian `i32` with 16 integer
/// bits and 16 fractional bits. They appear in cel-extra bounds, color
/// profile gamma values and user-data properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed(i32);

impl Fixed {
    pub(crate) fn from_raw(raw: i32) -> Self {
        Fixed(raw)
    }

    /// The raw `i32` bit pattern as stored in the file.
    pub fn raw(self) -> i32 {
        self.0
    }

    /// Convert to a float. Exact, since every 16.16 value fits an `f64`.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 65536.0
    }

    /// Convert from a float, truncating toward zero to the nearest
    /// representable 16.16 value.
    pub fn from_f64(value: f64) -> Self {
        Fixed((value * 65536.0) as i32)
    }
}

impl From<Fixed> for f64 {
    fn from(value: Fixed) -> f64 {
        value.to_f64()
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_exact() {
        for raw in [0, 1, -1, 98304, -98304, i32::MAX, i32::MIN] {
            let f = Fixed::from_raw(raw);
            assert_eq!(Fixed::from_f64(f.to_f64()), f);
        }
    }

    #[test]
    fn round_trip_floats() {
        // from_f64 truncates, so the error stays under one fractional step.
        for x in [0.0, 1.5, 2.25, -7.125, 1234.5678, -32767.9999, 0.000015] {
            let back = Fixed::from_f64(x).to_f64();
            assert!((back - x).abs() < 1.0 / 65536.0, "{} -> {}", x, back);
        }
    }

    #[test]
    fn known_values() {
        assert_eq!(Fixed::from_f64(1.5).raw(), 98304);
        assert_eq!(Fixed::from_raw(65536).to_f64(), 1.0);
        assert_eq!(Fixed::from_raw(-32768).to_f64(), -0.5);
    }
}
