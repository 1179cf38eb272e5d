//! The interval policy: pure arithmetic deciding when tasks are due and how
//! the elapsed-time counter wraps.
//!
//! A task with period `P` is due at every elapsed value `P` divides. The
//! counter itself must not grow without bound, so the policy also derives a
//! wraparound window from the registered periods: once elapsed time reaches
//! `2 * LCM(periods)` it restarts at `LCM(periods)`, the next value every
//! period divides evenly. Both boundary values are congruent to zero modulo
//! every period, so the due pattern across the wrap is identical to the
//! pattern an unbounded counter would produce. Resetting to zero instead
//! would replay the "nothing has fired yet" startup phase and misalign any
//! task whose period equals the window floor.

use crate::error::ConfigError;

/// Returns `true` when a task with the given period is due at `elapsed`.
///
/// Callers guarantee `period > 0`; registration rejects zero periods long
/// before any tick runs.
#[inline]
pub fn is_due(elapsed: u64, period: u64) -> bool {
    elapsed % period == 0
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

fn checked_lcm(a: u64, b: u64) -> Option<u64> {
    (a / gcd(a, b)).checked_mul(b)
}

/// The wraparound window for the elapsed-time counter, computed once at
/// startup from the actual task set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapPolicy {
    /// Restart target: the LCM of all periods.
    pub floor: u64,
    /// Wrap trigger: `2 * floor`. The tick that reaches the ceiling still
    /// fires every task before the counter drops back to the floor.
    pub ceiling: u64,
}

impl WrapPolicy {
    /// Derives the window from the configured periods.
    ///
    /// Fails when a period is zero (named after the task by the caller) or
    /// when the combined LCM overflows `u64`.
    pub fn for_periods<I>(periods: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = u64>,
    {
        let mut floor: u64 = 1;
        let mut any = false;
        for period in periods {
            if period == 0 {
                return Err(ConfigError::ZeroPeriod {
                    name: String::new(),
                });
            }
            floor = checked_lcm(floor, period).ok_or(ConfigError::PeriodOverflow)?;
            any = true;
        }
        if !any {
            return Err(ConfigError::NoTasks);
        }
        let ceiling = floor.checked_mul(2).ok_or(ConfigError::PeriodOverflow)?;
        Ok(Self { floor, ceiling })
    }
}
