use serde::{Deserialize, Serialize};

/// Kinds of vitals the dashboard tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthMetricType {
    Steps,
    HeartRate,
    Sleep,
    Calories,
}

impl HealthMetricType {
    /// Label used in the insight prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Steps => "Steps",
            Self::HeartRate => "Avg Heart Rate",
            Self::Sleep => "Sleep",
            Self::Calories => "Calories",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        [Self::Steps, Self::HeartRate, Self::Sleep, Self::Calories]
            .into_iter()
            .find(|kind| kind.label() == label)
    }
}

/// A reading value is either numeric (`8240`, `36.6`) or preformatted (`"7h 20m"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Decimal(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// `{type, value}` pair sent to the insight collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReading {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: MetricValue,
}

impl MetricReading {
    pub fn count(kind: HealthMetricType, value: i64) -> Self {
        Self {
            kind: kind.label().to_string(),
            value: MetricValue::Integer(value),
        }
    }

    pub fn text(kind: HealthMetricType, value: impl Into<String>) -> Self {
        Self {
            kind: kind.label().to_string(),
            value: MetricValue::Text(value.into()),
        }
    }
}

/// Readings summarised in the dashboard's daily insight banner.
pub fn daily_summary() -> Vec<MetricReading> {
    vec![
        MetricReading::count(HealthMetricType::Steps, 8240),
        MetricReading::text(HealthMetricType::Sleep, "7h 20m"),
        MetricReading::count(HealthMetricType::HeartRate, 72),
    ]
}

/// Cards on the dashboard: the daily summary plus active energy, which the
/// insight prompt does not include.
pub fn dashboard_readings() -> Vec<MetricReading> {
    let mut readings = daily_summary();
    readings.push(MetricReading::count(HealthMetricType::Calories, 480));
    readings
}
