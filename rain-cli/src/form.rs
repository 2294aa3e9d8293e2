//! Interactive prompts. Bounds mirror what the sensors can physically report;
//! the service itself accepts any number.

use anyhow::Result;
use inquire::{CustomType, CustomUserError, Select, Text, validator::Validation};
use rain_core::{
    ClientConfig, WeatherRecord,
    encoder::{COMPASS_POINTS, LOCATIONS},
};

/// Walk the operator through every attribute, pre-filled with the defaults.
pub fn collect() -> Result<WeatherRecord> {
    let d = WeatherRecord::with_defaults();
    let mut r = WeatherRecord::default();

    println!("1. Temperature & Rain");
    r.min_temp = Some(number("Minimum temperature (°C)", d.min_temp, None, None)?);
    r.max_temp = Some(number("Maximum temperature (°C)", d.max_temp, None, None)?);
    r.rainfall = Some(number("Rainfall today (mm)", d.rainfall, Some(0.0), None)?);
    r.evaporation = Some(number("Evaporation (mm)", d.evaporation, Some(0.0), None)?);
    r.sunshine = Some(number("Sunshine (hours)", d.sunshine, Some(0.0), Some(24.0))?);
    r.temp_9am = Some(number("Temperature at 9 AM (°C)", d.temp_9am, None, None)?);
    r.temp_3pm = Some(number("Temperature at 3 PM (°C)", d.temp_3pm, None, None)?);

    println!("2. Wind");
    r.wind_gust_dir = Some(compass("Wind gust direction")?);
    r.wind_gust_speed = Some(number("Wind gust speed (km/h)", d.wind_gust_speed, Some(0.0), None)?);
    r.wind_dir_9am = Some(compass("Wind direction at 9 AM")?);
    r.wind_speed_9am = Some(number("Wind speed at 9 AM (km/h)", d.wind_speed_9am, Some(0.0), None)?);
    r.wind_dir_3pm = Some(compass("Wind direction at 3 PM")?);
    r.wind_speed_3pm = Some(number("Wind speed at 3 PM (km/h)", d.wind_speed_3pm, Some(0.0), None)?);

    println!("3. Atmospheric");
    r.humidity_9am = Some(number("Humidity at 9 AM (%)", d.humidity_9am, Some(0.0), Some(100.0))?);
    r.humidity_3pm = Some(number("Humidity at 3 PM (%)", d.humidity_3pm, Some(0.0), Some(100.0))?);
    r.pressure_9am = Some(number("Pressure at 9 AM (hPa)", d.pressure_9am, None, None)?);
    r.pressure_3pm = Some(number("Pressure at 3 PM (hPa)", d.pressure_3pm, None, None)?);
    r.cloud_9am = Some(number("Cloud cover at 9 AM (oktas)", d.cloud_9am, Some(0.0), Some(8.0))?);
    r.cloud_3pm = Some(number("Cloud cover at 3 PM (oktas)", d.cloud_3pm, Some(0.0), Some(8.0))?);

    println!("4. Location & Rain Today");
    let start = LOCATIONS.iter().position(|l| *l == "Sydney").unwrap_or(0);
    let location = Select::new("Weather station location", LOCATIONS.to_vec())
        .with_starting_cursor(start)
        .prompt()?;
    r.location = Some(location.to_string());

    let rained = Select::new("Was there rain today?", vec!["No", "Yes"]).prompt()?;
    r.rain_today = Some(yes_no_flag(rained));

    Ok(r)
}

/// Edit the client section of the config in place.
pub fn configure(client: &mut ClientConfig) -> Result<()> {
    client.api_url = Text::new("Prediction service URL")
        .with_default(&client.api_url)
        .prompt()?;

    client.health_timeout_secs = CustomType::<u64>::new("Health check timeout (seconds)")
        .with_default(client.health_timeout_secs)
        .prompt()?;

    client.predict_timeout_secs = CustomType::<u64>::new("Prediction timeout (seconds)")
        .with_default(client.predict_timeout_secs)
        .prompt()?;

    Ok(())
}

fn number(prompt: &str, default: Option<f64>, min: Option<f64>, max: Option<f64>) -> Result<f64> {
    let mut input = CustomType::<f64>::new(prompt)
        .with_error_message("Please type a number")
        .with_validator(move |value: &f64| -> Result<Validation, CustomUserError> {
            Ok(match bounds_check(*value, min, max) {
                Some(msg) => Validation::Invalid(msg.into()),
                None => Validation::Valid,
            })
        });

    if let Some(default) = default {
        input = input.with_default(default);
    }

    Ok(input.prompt()?)
}

fn compass(prompt: &str) -> Result<String> {
    Ok(Select::new(prompt, COMPASS_POINTS.to_vec()).prompt()?.to_string())
}

fn bounds_check(value: f64, min: Option<f64>, max: Option<f64>) -> Option<String> {
    match (min, max) {
        (Some(lo), _) if value < lo => Some(format!("Must be at least {lo}")),
        (_, Some(hi)) if value > hi => Some(format!("Must be at most {hi}")),
        _ => None,
    }
}

/// The yes/no toggle is sent as a 0/1 number.
fn yes_no_flag(answer: &str) -> f64 {
    if answer.eq_ignore_ascii_case("yes") { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_no_maps_to_flag() {
        assert_eq!(yes_no_flag("Yes"), 1.0);
        assert_eq!(yes_no_flag("No"), 0.0);
    }

    #[test]
    fn bounds() {
        assert_eq!(bounds_check(50.0, Some(0.0), Some(100.0)), None);
        assert_eq!(bounds_check(-1.0, Some(0.0), None).as_deref(), Some("Must be at least 0"));
        assert_eq!(bounds_check(9.0, Some(0.0), Some(8.0)).as_deref(), Some("Must be at most 8"));
        assert_eq!(bounds_check(-40.0, None, None), None);
    }
}
