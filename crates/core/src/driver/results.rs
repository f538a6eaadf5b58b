//! Output of one simulated interval

use serde::{Deserialize, Serialize};

/// Solver effort over an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntervalStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub iterations: usize,
}

/// Daily soil-temperature profiles of an interval and their means.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IntervalResults {
    /// One profile per day at the native soil nodes (°C, surface first)
    pub daily_profiles: Vec<Vec<f64>>,
    /// One profile per day at the configured output depths; empty when no
    /// output depths are set
    pub daily_profiles_at_depths: Vec<Vec<f64>>,
    pub average_profile: Vec<f64>,
    pub average_profile_at_depths: Vec<f64>,
    /// Freezing-front depth at the end of each day (m)
    pub daily_front_depth: Vec<Option<f64>>,
    pub stats: IntervalStats,
}

impl IntervalResults {
    pub(crate) fn finish(&mut self) {
        self.average_profile = average_over_days(&self.daily_profiles);
        self.average_profile_at_depths = average_over_days(&self.daily_profiles_at_depths);
    }

    pub fn days(&self) -> usize {
        self.daily_profiles.len()
    }
}

/// Arithmetic mean per depth across days.
fn average_over_days(profiles: &[Vec<f64>]) -> Vec<f64> {
    let Some(first) = profiles.first() else {
        return Vec::new();
    };
    let mut mean = vec![0.0; first.len()];
    for profile in profiles {
        for (m, v) in mean.iter_mut().zip(profile) {
            *m += v;
        }
    }
    let days = profiles.len() as f64;
    for m in &mut mean {
        *m /= days;
    }
    mean
}
