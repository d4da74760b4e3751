//! Fixed-format Portuguese weather report.

use chrono::NaiveDate;

use common::{CurrentConditions, DailyAverage, WeatherReport};

const DATE_FORMAT: &str = "%d/%m";

/// Render the report. Pure: the same inputs always give the same text.
///
/// ```text
/// 25°C e céu limpo em São Paulo em 01/01. Média para os próximos dias: 19°C em 02/01, 21°C em 03/01.
/// ```
pub fn render(current: &CurrentConditions, days: &[DailyAverage], today: NaiveDate) -> WeatherReport {
    let forecast = days
        .iter()
        .map(|d| {
            format!(
                "{}°C em {}",
                display_temp(d.average_temperature_celsius),
                d.date.format(DATE_FORMAT)
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    WeatherReport {
        text: format!(
            "{}°C e {} em {} em {}. Média para os próximos dias: {}.",
            display_temp(current.temperature_celsius),
            current.condition,
            current.resolved_city_name,
            today.format(DATE_FORMAT),
            forecast
        ),
    }
}

fn display_temp(celsius: f64) -> i64 {
    // `as` saturates; -0.0 renders as 0.
    celsius.round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current(temp: f64) -> CurrentConditions {
        CurrentConditions {
            temperature_celsius: temp,
            condition: "nuvens dispersas".into(),
            humidity_pct: 70,
            resolved_city_name: "São Paulo".into(),
            country_code: "BR".into(),
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn avg(date: &str, c: f64) -> DailyAverage {
        DailyAverage {
            date: day(date),
            average_temperature_celsius: c,
        }
    }

    #[test]
    fn test_render_template() {
        let report = render(
            &current(24.6),
            &[avg("2024-01-02", 19.35), avg("2024-01-03", 21.5)],
            day("2024-01-01"),
        );
        assert_eq!(
            report.text,
            "25°C e nuvens dispersas em São Paulo em 01/01. \
             Média para os próximos dias: 19°C em 02/01, 22°C em 03/01."
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let days = [avg("2024-01-02", 19.35)];
        let a = render(&current(20.0), &days, day("2024-01-01"));
        let b = render(&current(20.0), &days, day("2024-01-01"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_render_without_forecast_days() {
        let report = render(&current(-0.4), &[], day("2024-12-31"));
        assert_eq!(
            report.text,
            "0°C e nuvens dispersas em São Paulo em 31/12. Média para os próximos dias: ."
        );
    }

    #[test]
    fn test_negative_rounding() {
        let report = render(&current(-2.5), &[avg("2025-01-01", -10.49)], day("2024-12-31"));
        assert!(report.text.starts_with("-3°C e"));
        assert!(report.text.contains("-10°C em 01/01"));
    }
}
