use chrono::{DateTime, FixedOffset};

use weather_core::{Observation, ZipCode};

const COMPASS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Human-readable report; the provider reports imperial units.
pub fn render(zip: ZipCode, obs: &Observation) -> String {
    let observed = obs
        .observed_at()
        .map(|at| format!("  observed     {}\n", local_time(at)))
        .unwrap_or_default();

    format!(
        "{name} ({zip})\n\
         {observed}\
         \x20 conditions   {summary} ({detail})\n\
         \x20 temperature  {t:.1}°F (feels like {f:.1}°F, low {lo:.1}°F, high {hi:.1}°F)\n\
         \x20 humidity     {humidity:.0}%\n\
         \x20 pressure     {pressure:.0} hPa\n\
         \x20 wind         {speed:.1} mph from {compass} ({deg:.0}°), gusts {gust:.1} mph\n",
        name = obs.location_name,
        summary = obs.condition_summary,
        detail = obs.condition_detail,
        t = obs.temperature,
        f = obs.feels_like,
        lo = obs.temperature_min,
        hi = obs.temperature_max,
        humidity = obs.humidity,
        pressure = obs.pressure,
        speed = obs.wind_speed,
        compass = compass(obs.wind_direction_degrees),
        deg = obs.wind_direction_degrees,
        gust = obs.wind_gust,
    )
}

/// Wall-clock time at the observed location, with its offset.
fn local_time(at: DateTime<FixedOffset>) -> String {
    at.format("%Y-%m-%d %H:%M %:z").to_string()
}

fn compass(degrees: f64) -> &'static str {
    let sector = (degrees.rem_euclid(360.0) / 22.5).round() as usize % COMPASS.len();
    COMPASS[sector]
}
