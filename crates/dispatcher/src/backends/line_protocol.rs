//! InfluxDB line protocol encoding

use std::fmt::Write as _;

use contracts::MetricValue;

/// One line-protocol point
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    measurement: String,
    tags: Vec<(String, String)>,
    fields: Vec<(String, MetricValue)>,
}

impl Point {
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Encode as a single line without trailing newline
    ///
    /// Fails on a point with no fields, a non-finite float, or text containing a line break.
    pub fn to_line(&self) -> Result<String, String> {
        if self.fields.is_empty() {
            return Err(format!("point '{}' has no fields", self.measurement));
        }

        single_line("measurement", &self.measurement)?;
        for (key, value) in &self.tags {
            single_line("tag key", key)?;
            single_line("tag value", value)?;
        }
        for (key, value) in &self.fields {
            single_line("field key", key)?;
            if let MetricValue::Text(text) = value {
                single_line("field value", text)?;
            }
        }

        let mut line = escape_measurement(&self.measurement);
        for (key, value) in &self.tags {
            let _ = write!(line, ",{}={}", escape_key(key), escape_key(value));
        }

        line.push(' ');
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            let _ = write!(line, "{}={}", escape_key(key), encode_field(key, value)?);
        }

        Ok(line)
    }
}

fn single_line(what: &str, s: &str) -> Result<(), String> {
    if s.contains(['\n', '\r']) {
        Err(format!("{what} {s:?} contains a line break"))
    } else {
        Ok(())
    }
}

fn encode_field(key: &str, value: &MetricValue) -> Result<String, String> {
    match value {
        MetricValue::Float(v) if !v.is_finite() => {
            Err(format!("field '{key}' is not a finite number: {v}"))
        }
        MetricValue::Float(v) => Ok(format!("{v}")),
        MetricValue::Int(v) => Ok(format!("{v}i")),
        MetricValue::Bool(v) => Ok(v.to_string()),
        MetricValue::Text(v) => Ok(format!("\"{}\"", escape_string(v))),
    }
}

fn escape_measurement(s: &str) -> String {
    escape_chars(s, &[',', ' '])
}

/// Tag keys, tag values and field keys
fn escape_key(s: &str) -> String {
    escape_chars(s, &[',', '=', ' '])
}

fn escape_string(s: &str) -> String {
    escape_chars(s, &['"', '\\'])
}

fn escape_chars(s: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
