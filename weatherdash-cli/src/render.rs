//! Plain-text rendering of views, honoring display preferences.

use std::fmt::Write;

use chrono::Local;
use weatherdash_core::{SavedCity, Settings, WeatherView};

pub fn weather_view(view: &WeatherView, settings: &Settings) -> String {
    let temp = settings.temperature_unit;
    let clock = settings.clock;
    let c = &view.current;
    let mut out = String::new();

    let _ = writeln!(out, "{}  ({})", c.city, c.timezone_label());
    let _ = writeln!(
        out,
        "  Now       {}   feels like {}   (low {} / high {})",
        temp.format(c.temp_c),
        temp.format(c.feels_like_c),
        temp.format(c.temp_min_c),
        temp.format(c.temp_max_c),
    );
    let _ = writeln!(out, "  Wind      {}", settings.wind_speed_unit.format(c.wind_kmh));
    let _ = writeln!(
        out,
        "  Sunrise   {}   Sunset {}",
        c.sunrise_label(clock),
        c.sunset_label(clock)
    );

    if !view.hourly.is_empty() {
        let _ = writeln!(out, "\nNext hours");
        for point in &view.hourly {
            let _ = writeln!(
                out,
                "  {:<9} {:>6}   {}",
                clock.format(&point.time),
                temp.format(point.temp_c),
                point.icon.url()
            );
        }
    }

    if !view.daily.is_empty() {
        let _ = writeln!(out, "\nComing days");
        for day in &view.daily {
            let _ = writeln!(
                out,
                "  {:<4} {:<14} {}{}",
                day.day,
                day.condition,
                day.high_low(temp),
                temp.symbol()
            );
        }
    }

    out
}

pub fn saved_cities(cities: &[SavedCity], settings: &Settings) -> String {
    if cities.is_empty() {
        return "No saved cities. Add one with `weatherdash cities add <place>`.\n".to_string();
    }

    let temp = settings.temperature_unit;
    let mut out = String::new();
    for (i, city) in cities.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {:<20} {:>8}   {}   saved {}",
            i + 1,
            city.name,
            temp.format_precise(city.temp_c),
            city.timezone,
            city.captured_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        );
        let hours: Vec<String> = city
            .hourly_forecast
            .iter()
            .map(|p| format!("{} {}", settings.clock.format(&p.time), temp.format(p.temp_c)))
            .collect();
        if !hours.is_empty() {
            let _ = writeln!(out, "     {}", hours.join(" | "));
        }
    }
    out
}

pub fn settings(settings: &Settings) -> String {
    format!(
        "Temperature  {}\nWind speed   {}\nClock        {}\n",
        settings.temperature_unit, settings.wind_speed_unit, settings.clock
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone, Utc};
    use weatherdash_core::{
        ClockFormat, Coordinates, CurrentConditions, ForecastDay, ForecastPoint, Icon,
        TemperatureUnit, WindSpeedUnit,
    };

    fn paris() -> WeatherView {
        let offset = FixedOffset::east_opt(7200).unwrap();
        let t0 = offset.with_ymd_and_hms(2024, 6, 1, 14, 0, 0).unwrap();
        WeatherView {
            current: CurrentConditions {
                city: "Paris".into(),
                temp_c: 20.0,
                temp_min_c: 18.0,
                temp_max_c: 23.0,
                feels_like_c: 19.0,
                wind_kmh: 10.0,
                sunrise: offset.with_ymd_and_hms(2024, 6, 1, 5, 48, 0).unwrap(),
                sunset: offset.with_ymd_and_hms(2024, 6, 1, 21, 50, 0).unwrap(),
                coordinates: Coordinates { lat: 48.85, lon: 2.35 },
                utc_offset_secs: 7200,
            },
            hourly: vec![ForecastPoint {
                time: t0,
                temp_c: 20.0,
                icon: Icon("01d".into()),
            }],
            daily: vec![ForecastDay {
                day: "Sat".into(),
                condition: "Clear".into(),
                high_c: 25.0,
                low_c: 15.0,
                icon: Icon("01d".into()),
            }],
        }
    }

    #[test]
    fn fahrenheit_view_converts_temperatures_only() {
        let settings = Settings {
            temperature_unit: TemperatureUnit::Fahrenheit,
            wind_speed_unit: WindSpeedUnit::KmPerHour,
            clock: ClockFormat::TwentyFourHour,
        };
        let out = weather_view(&paris(), &settings);

        assert!(out.contains("Paris  (UTC+02:00)"));
        assert!(out.contains("68°F"));
        assert!(out.contains("10 km/h"));
        assert!(out.contains("Sunrise   05:48   Sunset 21:50"));
        assert!(out.contains("77/59°F"));
    }

    #[test]
    fn twelve_hour_clock_and_knots() {
        let settings = Settings {
            wind_speed_unit: WindSpeedUnit::Knots,
            ..Settings::default()
        };
        let out = weather_view(&paris(), &settings);

        assert!(out.contains("05:48 AM"));
        assert!(out.contains("02:00 PM"));
        assert!(out.contains("5.4 Knots"));
    }

    #[test]
    fn empty_city_list_has_a_hint() {
        assert!(saved_cities(&[], &Settings::default()).contains("weatherdash cities add"));
    }

    #[test]
    fn saved_cities_are_numbered_in_order() {
        let view = paris();
        let mut tokyo = SavedCity::from_view(&view, Utc::now());
        tokyo.name = "Tokyo".into();
        let cities = vec![SavedCity::from_view(&view, Utc::now()), tokyo];

        let out = saved_cities(&cities, &Settings::default());
        let paris_at = out.find("1. Paris").unwrap();
        let tokyo_at = out.find("2. Tokyo").unwrap();
        assert!(paris_at < tokyo_at);
        assert!(out.contains("20.0°C"));
    }
}
