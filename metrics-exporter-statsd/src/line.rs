use crate::{
    key::{flatten_key, sanitize_name},
    label::Label,
};

/// Number of fractional digits every value is rendered with.
const VALUE_PRECISION: usize = 6;

/// Statsd metric type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricType {
    /// Point-in-time value.
    Gauge,

    /// Incrementing measurement.
    Counter,

    /// Observed duration or magnitude.
    Timing,

    /// Raw key/value emission.
    KeyValue,
}

impl MetricType {
    /// Returns the type code used on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            MetricType::Gauge => "g",
            MetricType::Counter => "c",
            MetricType::Timing => "ms",
            MetricType::KeyValue => "kv",
        }
    }
}

/// Renders a single newline-terminated statsd line.
///
/// The metric name is the key segments followed by the value of each label, in order, flattened with `.` and then
/// sanitized. Labels annotate the measurement rather than replace it, so a labeled line carries the same value and type
/// as its unlabeled counterpart would.
///
/// Infinite values are rendered as `+Inf` and `-Inf`, and NaN as `NaN`.
pub fn format_line<S>(key: &[S], labels: &[Label], value: f64, metric_type: MetricType) -> String
where
    S: AsRef<str>,
{
    let name = if labels.is_empty() {
        flatten_key(key)
    } else {
        let segments = key
            .iter()
            .map(|segment| segment.as_ref())
            .chain(labels.iter().map(Label::value))
            .collect::<Vec<&str>>();
        flatten_key(&segments)
    };

    let name = sanitize_name(&name);
    let code = metric_type.as_str();
    if value.is_infinite() {
        let sign = if value.is_sign_positive() { '+' } else { '-' };
        format!("{name}:{sign}Inf|{code}\n")
    } else {
        format!("{name}:{value:.prec$}|{code}\n", prec = VALUE_PRECISION)
    }
}
