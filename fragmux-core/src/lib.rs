//! Core time primitives for the fragmux muxer.
//!
//! Fragmented-MP4 boxes carry integer tick counts in a per-track
//! timescale, while samples arrive stamped in whatever time base the
//! ingest pipeline uses. This crate provides the exact-arithmetic types
//! used to move between the two: [`Rational`], [`TimeBase`],
//! [`Timestamp`] and [`Duration`].
//!
//! Conversions round each value half away from zero instead of
//! truncating, so tick values match what a player reconstructs and no
//! drift accumulates across a fragment.

mod rational;
mod time;

pub use rational::Rational;
pub use time::{Duration, TimeBase, Timestamp};
