use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `FUNNEL_ANALYZER__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub anomaly: AnomalyConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnomalyConfig {
    /// Relative day-over-day conversion change that counts as an
    /// anomaly, as a fraction (0.5 = 50%). Typical range 0.10–1.00.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_title")]
    pub title: String,
    #[serde(default = "default_report_author")]
    pub author: String,
}

fn default_threshold() -> f64 {
    0.5
}
fn default_report_title() -> String {
    "Funnel Conversion Analysis".to_string()
}
fn default_report_author() -> String {
    "Analyst".to_string()
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_report_title(),
            author: default_report_author(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            anomaly: AnomalyConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("FUNNEL_ANALYZER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
