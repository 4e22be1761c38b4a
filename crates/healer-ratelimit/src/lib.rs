//! Healer Rate Limiter - gates every outbound action.
//!
//! Combines a progressive weekly ramp, a weekend blackout window, rolling
//! hourly windows and durable per-day counters. Denials are values
//! ([`RateDecision`]), never errors.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod clock;
pub mod delay;
pub mod limiter;
pub mod policy;

pub use clock::{Clock, FixedClock, SystemClock};
pub use delay::{pause, DelaySource, SeededDelays};
pub use limiter::{LimiterStatus, PlatformUsage, RateDecision, RateLimiter};
pub use policy::{is_weekend_blackout, progressive_limit_for};
