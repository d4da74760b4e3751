//! Reduces raw forecast samples to daily Celsius means.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use common::{DailyAverage, ForecastSample};

pub const MAX_DAYS: usize = 5;
const KELVIN_OFFSET: f64 = 273.15;

/// Daily averages for the days strictly after `today`, oldest first, at
/// most [`MAX_DAYS`] entries. Samples are grouped by the date part of
/// their own timestamp.
pub fn daily_averages(samples: &[ForecastSample], today: NaiveDate) -> Vec<DailyAverage> {
    let mut by_date: BTreeMap<NaiveDate, (f64, u32)> = BTreeMap::new();
    for sample in samples {
        let date = sample.timestamp.date();
        if date <= today {
            continue;
        }
        let slot = by_date.entry(date).or_insert((0.0, 0));
        slot.0 += sample.temperature_kelvin;
        slot.1 += 1;
    }

    by_date
        .into_iter()
        .take(MAX_DAYS)
        .map(|(date, (sum, n))| DailyAverage {
            date,
            average_temperature_celsius: round2(sum / f64::from(n) - KELVIN_OFFSET),
        })
        .collect()
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
