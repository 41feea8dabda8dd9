/// Placeholder rendered for any field the weather source omits.
pub const NOT_AVAILABLE: &str = "N/A";

/// Current conditions for a city, already rendered as display strings.
///
/// Every field is `"N/A"` when the weather source left it out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherReport {
    pub description: String,
    pub temperature_c: String,
    pub temperature_f: String,
    pub humidity_pct: String,
    pub wind_speed_kmh: String,
    pub pressure_mb: String,
}

impl Default for WeatherReport {
    fn default() -> Self {
        Self {
            description: NOT_AVAILABLE.to_string(),
            temperature_c: NOT_AVAILABLE.to_string(),
            temperature_f: NOT_AVAILABLE.to_string(),
            humidity_pct: NOT_AVAILABLE.to_string(),
            wind_speed_kmh: NOT_AVAILABLE.to_string(),
            pressure_mb: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Outcome of a single weather lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherResult {
    Success(WeatherReport),
    NotFound { message: String },
    FetchError { message: String },
}

impl WeatherResult {
    pub fn not_found(message: impl Into<String>) -> Self {
        WeatherResult::NotFound { message: message.into() }
    }

    pub fn fetch_error(message: impl Into<String>) -> Self {
        WeatherResult::FetchError { message: message.into() }
    }
}
