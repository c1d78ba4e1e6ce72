use std::fmt::Write;

use cityweather_core::WeatherReport;

/// Multi-line summary of a report, laid out like the weather card.
pub fn report(report: &WeatherReport, icon_base_url: &str) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "{}, {}", report.location_name, report.country_code);
    let _ = writeln!(out, "{}°C  {}", report.temperature_c, report.condition);
    let _ = writeln!(out);
    let _ = writeln!(out, "{:<12}{}%", "Humidity", report.humidity_pct);
    let _ = writeln!(out, "{:<12}{} m/s", "Wind Speed", report.wind_speed_mps);
    let _ = writeln!(out, "{:<12}{}°C", "Feels Like", report.feels_like_c);
    let _ = writeln!(out, "{:<12}{} hPa", "Pressure", report.pressure_hpa);
    let _ = write!(out, "{:<12}{}", "Icon", report.icon_url_with_base(icon_base_url));

    out
}
