//! Rational frame rates.
//!
//! Container rates are commonly declared as ratios ("30000/1001"). Keeping
//! the rational form end to end avoids the rounding drift a float
//! representation accumulates over thousands of frames, so the float
//! equivalent is derived for display only.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::probe::ProbeError;

/// A frame rate as a positive rational, stored in lowest terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    num: u64,
    den: u64,
}

impl FrameRate {
    /// Build a rate from numerator and denominator.
    ///
    /// Both must be non-zero; the stored form is reduced.
    pub fn new(num: u64, den: u64) -> Result<Self, ProbeError> {
        if num == 0 || den == 0 {
            return Err(ProbeError::MalformedRate {
                raw: format!("{}/{}", num, den),
            });
        }
        let g = gcd(num, den);
        Ok(Self {
            num: num / g,
            den: den / g,
        })
    }

    /// Parse a probed rate string: either "num/den" or a bare integer.
    pub fn parse(raw: &str) -> Result<Self, ProbeError> {
        let trimmed = raw.trim();
        let malformed = || ProbeError::MalformedRate {
            raw: raw.to_string(),
        };

        if let Some((num, den)) = trimmed.split_once('/') {
            let num: u64 = num.trim().parse().map_err(|_| malformed())?;
            let den: u64 = den.trim().parse().map_err(|_| malformed())?;
            Self::new(num, den).map_err(|_| malformed())
        } else {
            let num: u64 = trimmed.parse().map_err(|_| malformed())?;
            Self::new(num, 1).map_err(|_| malformed())
        }
    }

    /// Validate an explicit rate override expressed in Hz.
    pub fn from_hz(hz: f64) -> Result<Self, ProbeError> {
        if !hz.is_finite() || hz <= 0.0 {
            return Err(ProbeError::MalformedRate {
                raw: hz.to_string(),
            });
        }
        if hz.fract() == 0.0 {
            Self::new(hz as u64, 1)
        } else {
            // Millihertz resolution covers any rate a container declares.
            Self::new((hz * 1000.0).round() as u64, 1000)
        }
    }

    pub fn num(&self) -> u64 {
        self.num
    }

    pub fn den(&self) -> u64 {
        self.den
    }

    /// Floating equivalent, for display and comparisons against durations.
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Exact command-argument form.
    ///
    /// ffmpeg accepts rationals wherever it accepts a rate, so the value
    /// round-trips into a command line without precision loss.
    pub fn to_arg(&self) -> String {
        if self.den == 1 {
            self.num.to_string()
        } else {
            format!("{}/{}", self.num, self.den)
        }
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_arg())
    }
}

impl PartialOrd for FrameRate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrameRate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Cross-multiply in u128 so large numerators cannot overflow.
        let lhs = self.num as u128 * other.den as u128;
        let rhs = other.num as u128 * self.den as u128;
        lhs.cmp(&rhs)
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ntsc_ratio() {
        let rate = FrameRate::parse("30000/1001").unwrap();
        assert_eq!(rate.num(), 30000);
        assert_eq!(rate.den(), 1001);
        assert!((rate.as_f64() - 29.97).abs() < 0.005);
    }

    #[test]
    fn parses_integral_forms() {
        let ratio = FrameRate::parse("25/1").unwrap();
        let bare = FrameRate::parse("25").unwrap();
        assert_eq!(ratio, bare);
        assert_eq!(ratio.as_f64(), 25.0);
    }

    #[test]
    fn rejects_malformed_strings() {
        for raw in ["abc", "", "10/0", "0/1", "1/2/3", "-24/1", "24.5/1"] {
            assert!(
                matches!(FrameRate::parse(raw), Err(ProbeError::MalformedRate { .. })),
                "expected malformed-rate error for {:?}",
                raw
            );
        }
    }

    #[test]
    fn reduces_to_lowest_terms() {
        let rate = FrameRate::new(50, 2).unwrap();
        assert_eq!(rate, FrameRate::new(25, 1).unwrap());
        assert_eq!(rate.to_arg(), "25");
    }

    #[test]
    fn override_validation() {
        assert!(FrameRate::from_hz(0.0).is_err());
        assert!(FrameRate::from_hz(-24.0).is_err());
        assert!(FrameRate::from_hz(f64::NAN).is_err());
        assert!(FrameRate::from_hz(f64::INFINITY).is_err());

        let exact = FrameRate::from_hz(60.0).unwrap();
        assert_eq!(exact.to_arg(), "60");

        let fractional = FrameRate::from_hz(23.976).unwrap();
        assert!((fractional.as_f64() - 23.976).abs() < 1e-9);
    }

    #[test]
    fn arg_round_trips_losslessly() {
        let rate = FrameRate::parse("30000/1001").unwrap();
        assert_eq!(rate.to_arg(), "30000/1001");
        assert_eq!(FrameRate::parse(&rate.to_arg()).unwrap(), rate);
    }

    #[test]
    fn ordering_by_cross_multiplication() {
        let ntsc = FrameRate::parse("30000/1001").unwrap();
        let thirty = FrameRate::parse("30").unwrap();
        let sixty = FrameRate::parse("60").unwrap();
        assert!(ntsc < thirty);
        assert!(thirty < sixty);
        assert!(sixty > ntsc);
    }
}
