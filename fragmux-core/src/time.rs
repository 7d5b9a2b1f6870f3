//! Timestamp and time-base handling.
//!
//! Samples arrive stamped in the ingest pipeline's time base; boxes are
//! written in a per-track timescale. These types keep the two apart and
//! make every conversion an explicit, exactly-rounded operation.

use crate::rational::Rational;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

/// A time base for interpreting timestamp values.
///
/// Common time bases:
/// - 1/90000 for video track ticks
/// - 1/48000 for 48 kHz audio
/// - 1/1000000000 for nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeBase(pub Rational);

impl TimeBase {
    /// Standard MPEG video time base (1/90000).
    pub const MPEG: Self = Self(Rational { num: 1, den: 90000 });

    /// Millisecond time base (1/1000).
    pub const MILLISECONDS: Self = Self(Rational { num: 1, den: 1000 });

    /// Nanosecond time base (1/1000000000).
    pub const NANOSECONDS: Self = Self(Rational {
        num: 1,
        den: 1_000_000_000,
    });

    /// Second time base (1/1).
    pub const SECONDS: Self = Self(Rational { num: 1, den: 1 });

    /// Create a new time base from numerator and denominator.
    pub fn new(num: i64, den: i64) -> Self {
        Self(Rational::new(num, den))
    }

    /// Time base of a clock running at `rate` Hz (1/rate).
    pub fn hz(rate: u32) -> Self {
        Self(Rational::new(1, i64::from(rate)))
    }

    /// Convert a value from this time base to another, rounding half
    /// away from zero.
    pub fn convert_round(&self, value: i64, target: TimeBase) -> i64 {
        self.0.rescale_round(value, target.0)
    }

    /// Convert a value in this time base to seconds.
    pub fn to_seconds(&self, value: i64) -> f64 {
        value as f64 * self.0.to_f64()
    }

    /// Get the time base as a rational.
    pub fn as_rational(&self) -> Rational {
        self.0
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::MPEG
    }
}

impl From<Rational> for TimeBase {
    fn from(r: Rational) -> Self {
        Self(r)
    }
}

/// Exact comparison of two (value, time base) pairs without rescaling
/// either side: v1*n1/d1 <=> v2*n2/d2 cross-multiplied in i128.
fn cmp_scaled(v1: i64, b1: TimeBase, v2: i64, b2: TimeBase) -> Ordering {
    let lhs = v1 as i128 * b1.0.num as i128 * b2.0.den as i128;
    let rhs = v2 as i128 * b2.0.num as i128 * b1.0.den as i128;
    lhs.cmp(&rhs)
}

/// A point in time with an associated time base.
///
/// Every sample carries one of these for its presentation time (and,
/// for video, its decode time).
#[derive(Debug, Clone, Copy)]
pub struct Timestamp {
    /// The raw timestamp value.
    pub value: i64,
    /// The time base for interpreting the value.
    pub time_base: TimeBase,
}

impl Timestamp {
    /// Create a new timestamp.
    pub fn new(value: i64, time_base: TimeBase) -> Self {
        Self { value, time_base }
    }

    /// Zero in the given time base.
    pub fn zero(time_base: TimeBase) -> Self {
        Self {
            value: 0,
            time_base,
        }
    }

    /// Convert to another time base with half-away-from-zero rounding.
    pub fn rescale(&self, target: TimeBase) -> Self {
        Self {
            value: self.time_base.convert_round(self.value, target),
            time_base: target,
        }
    }

    /// The timestamp as integer ticks of a clock running at
    /// `timescale` Hz, rounded half away from zero.
    pub fn to_ticks(&self, timescale: u32) -> i64 {
        self.time_base.convert_round(self.value, TimeBase::hz(timescale))
    }

    /// Convert to seconds.
    pub fn to_seconds(&self) -> f64 {
        self.time_base.to_seconds(self.value)
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        cmp_scaled(self.value, self.time_base, other.value, other.time_base) == Ordering::Equal
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_scaled(self.value, self.time_base, other.value, other.time_base)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.to_seconds();
        let hours = (secs / 3600.0) as u32;
        let mins = ((secs % 3600.0) / 60.0) as u32;
        let secs = secs % 60.0;
        write!(f, "{:02}:{:02}:{:06.3}", hours, mins, secs)
    }
}

/// A span of time with an associated time base.
#[derive(Debug, Clone, Copy)]
pub struct Duration {
    /// The raw duration value.
    pub value: i64,
    /// The time base for interpreting the value.
    pub time_base: TimeBase,
}

impl Duration {
    /// Create a new duration.
    pub fn new(value: i64, time_base: TimeBase) -> Self {
        Self { value, time_base }
    }

    /// Create a zero duration.
    pub fn zero() -> Self {
        Self {
            value: 0,
            time_base: TimeBase::default(),
        }
    }

    /// Check if this duration is zero.
    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Convert to another time base with half-away-from-zero rounding.
    pub fn rescale(&self, target: TimeBase) -> Self {
        Self {
            value: self.time_base.convert_round(self.value, target),
            time_base: target,
        }
    }

    /// The duration as integer ticks of a clock running at
    /// `timescale` Hz, rounded half away from zero.
    pub fn to_ticks(&self, timescale: u32) -> i64 {
        self.time_base.convert_round(self.value, TimeBase::hz(timescale))
    }

    /// Convert to seconds.
    pub fn to_seconds(&self) -> f64 {
        self.time_base.to_seconds(self.value)
    }

    /// Multiply by an integer, staying in the same time base.
    pub fn mul_int(&self, n: i64) -> Self {
        Self {
            value: self.value * n,
            time_base: self.time_base,
        }
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::zero()
    }
}

impl PartialEq for Duration {
    fn eq(&self, other: &Self) -> bool {
        cmp_scaled(self.value, self.time_base, other.value, other.time_base) == Ordering::Equal
    }
}

impl Eq for Duration {}

impl PartialOrd for Duration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Duration {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_scaled(self.value, self.time_base, other.value, other.time_base)
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        let rhs = rhs.rescale(self.time_base);
        Self {
            value: self.value + rhs.value,
            time_base: self.time_base,
        }
    }
}

impl Sub for Duration {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        let rhs = rhs.rescale(self.time_base);
        Self {
            value: self.value - rhs.value,
            time_base: self.time_base,
        }
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Self::Output {
        let rhs = rhs.rescale(self.time_base);
        Timestamp {
            value: self.value + rhs.value,
            time_base: self.time_base,
        }
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        let rhs = rhs.rescale(self.time_base);
        Duration {
            value: self.value - rhs.value,
            time_base: self.time_base,
        }
    }
}
