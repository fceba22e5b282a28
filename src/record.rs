//! The canonical record of one fault occurrence.

use core::{fmt, str::FromStr};
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    entity::{Entity, EntityField},
    frame::StackFrame,
    scope::ScopeVariables,
    severity::Severity,
};

/// A normalized fault.
///
/// Built and enriched by the [`FaultDispatcher`](crate::FaultDispatcher) for
/// the duration of a single fault's handling. The timestamp is taken at
/// construction with microsecond precision and never goes backwards within a
/// process, even if the wall clock does.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorRecord {
    message: String,
    file: String,
    line: String,
    severity: Severity,
    raw_level: String,
    caller_address: Option<String>,
    timestamp: DateTime<Utc>,
    scope_variables: ScopeVariables,
    backtrace: Vec<StackFrame>,
}

impl ErrorRecord {
    /// Creates an unclassified record stamped with the current time.
    pub fn new(
        message: impl Into<String>,
        file: impl Into<String>,
        line: impl fmt::Display,
    ) -> Self {
        Self {
            message: message.into(),
            file: file.into(),
            line: line.to_string(),
            severity: Severity::Unclassified,
            raw_level: String::new(),
            caller_address: None,
            timestamp: capture_time(),
            scope_variables: ScopeVariables::new(),
            backtrace: Vec::new(),
        }
    }

    /// Human-readable description of the fault.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Sets the message.
    pub fn set_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.message = message.into();
        self
    }

    /// Source file the fault was raised in.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Sets the source file.
    pub fn set_file(&mut self, file: impl Into<String>) -> &mut Self {
        self.file = file.into();
        self
    }

    /// Source line the fault was raised at.
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Sets the source line.
    pub fn set_line(&mut self, line: impl fmt::Display) -> &mut Self {
        self.line = line.to_string();
        self
    }

    /// Severity bucket.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Sets the severity.
    pub fn set_severity(&mut self, severity: Severity) -> &mut Self {
        self.severity = severity;
        self
    }

    /// Level or exception code as originally reported.
    pub fn raw_level(&self) -> &str {
        &self.raw_level
    }

    /// Sets the raw level.
    pub fn set_raw_level(&mut self, raw_level: impl fmt::Display) -> &mut Self {
        self.raw_level = raw_level.to_string();
        self
    }

    /// Resolved caller address, if any.
    pub fn caller_address(&self) -> Option<&str> {
        self.caller_address.as_deref()
    }

    /// Sets the caller address.
    pub fn set_caller_address(&mut self, caller_address: Option<String>) -> &mut Self {
        self.caller_address = caller_address;
        self
    }

    /// Capture time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Bindings captured at the fault site.
    pub fn scope_variables(&self) -> &ScopeVariables {
        &self.scope_variables
    }

    /// Sets the captured bindings.
    pub fn set_scope_variables(&mut self, scope_variables: ScopeVariables) -> &mut Self {
        self.scope_variables = scope_variables;
        self
    }

    /// Call stack at the fault site, most recent call first.
    pub fn backtrace(&self) -> &[StackFrame] {
        &self.backtrace
    }

    /// Sets the call stack.
    pub fn set_backtrace(&mut self, backtrace: Vec<StackFrame>) -> &mut Self {
        self.backtrace = backtrace;
        self
    }

    /// Drops the fields that may hold values without a serialized form.
    pub fn clear_unserializable(&mut self) -> &mut Self {
        self.scope_variables.clear();
        self.backtrace.clear();
        self
    }

    /// Serializes the fields that are always representable.
    ///
    /// Used as the last resort when a record cannot be serialized even after
    /// [`clear_unserializable`](Self::clear_unserializable).
    pub fn minimal_json(&self) -> String {
        serde_json::json!({
            "severity": self.severity.as_str(),
            "message": self.message,
            "file": self.file,
            "line": self.line,
            "timestamp": self.timestamp.to_rfc3339(),
        })
        .to_string()
    }
}

impl Entity for ErrorRecord {
    type Field = RecordField;
}

/// The serializable fields of an [`ErrorRecord`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    /// `message`
    Message,
    /// `file`
    File,
    /// `line`
    Line,
    /// `severity`
    Severity,
    /// `raw_level`
    RawLevel,
    /// `caller_address`
    CallerAddress,
    /// `timestamp`
    Timestamp,
    /// `scope_variables`
    ScopeVariables,
    /// `backtrace`
    Backtrace,
}

impl RecordField {
    /// All fields in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Message,
        Self::File,
        Self::Line,
        Self::Severity,
        Self::RawLevel,
        Self::CallerAddress,
        Self::Timestamp,
        Self::ScopeVariables,
        Self::Backtrace,
    ];

    /// The key the field serializes under.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::File => "file",
            Self::Line => "line",
            Self::Severity => "severity",
            Self::RawLevel => "raw_level",
            Self::CallerAddress => "caller_address",
            Self::Timestamp => "timestamp",
            Self::ScopeVariables => "scope_variables",
            Self::Backtrace => "backtrace",
        }
    }
}

impl EntityField for RecordField {
    fn key(self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`RecordField`] name.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown record field `{0}`")]
pub struct UnknownFieldError(pub String);

impl FromStr for RecordField {
    type Err = UnknownFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownFieldError(s.to_owned()))
    }
}

static LAST_CAPTURE_MICROS: AtomicI64 = AtomicI64::new(i64::MIN);

fn capture_time() -> DateTime<Utc> {
    clamp_to_latest(Utc::now(), &LAST_CAPTURE_MICROS)
}

/// Truncates `now` to microseconds and raises it to the latest time issued
/// through `latest`.
fn clamp_to_latest(now: DateTime<Utc>, latest: &AtomicI64) -> DateTime<Utc> {
    let micros = now.timestamp_micros();
    let issued = latest.fetch_max(micros, Ordering::AcqRel).max(micros);
    DateTime::from_timestamp_micros(issued).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use indexmap::IndexSet;

    use super::*;
    use crate::{entity::EntityError, frame::StackFrame, scope::ScopeValue};

    fn all_fields() -> IndexSet<RecordField> {
        RecordField::ALL.into_iter().collect()
    }

    fn sample() -> ErrorRecord {
        let mut record = ErrorRecord::new("division by zero", "src/math.rs", 17);
        record
            .set_severity(Severity::Warning)
            .set_raw_level(2)
            .set_caller_address(Some("10.0.0.1".into()))
            .set_backtrace(vec![StackFrame::new("divide").at("src/math.rs", 17)]);
        record.set_scope_variables(
            [("divisor".to_string(), ScopeValue::Integer(0))]
                .into_iter()
                .collect(),
        );
        record
    }

    #[test]
    fn test_default_serialization_has_every_field_in_order() {
        let json = sample().to_json(&all_fields()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, RecordField::ALL.map(RecordField::as_str).to_vec());
        assert_eq!(value["severity"], "WARNING");
        assert_eq!(value["line"], "17");
        assert_eq!(value["raw_level"], "2");
        assert_eq!(value["scope_variables"]["divisor"], 0);
    }

    #[test]
    fn test_whitelist_restricts_fields() {
        let fields: IndexSet<_> = [RecordField::Severity, RecordField::Message]
            .into_iter()
            .collect();
        assert_eq!(
            sample().to_json(&fields).unwrap(),
            r#"{"message":"division by zero","severity":"WARNING"}"#
        );
    }

    #[test]
    fn test_opaque_scope_fails_until_cleared() {
        let mut record = sample();
        let mut scope = ScopeVariables::new();
        scope.insert("file".into(), ScopeValue::Opaque("std::fs::File"));
        record.set_scope_variables(scope);

        let fields: IndexSet<_> = [RecordField::Message].into_iter().collect();
        assert!(matches!(record.to_json(&fields), Err(EntityError::Json(_))));

        record.clear_unserializable();
        assert!(record.scope_variables().is_empty());
        assert!(record.backtrace().is_empty());
        assert_eq!(
            record.to_json(&fields).unwrap(),
            r#"{"message":"division by zero"}"#
        );
    }

    #[test]
    fn test_minimal_json() {
        let value: serde_json::Value = serde_json::from_str(&sample().minimal_json()).unwrap();
        assert_eq!(value["severity"], "WARNING");
        assert_eq!(value["file"], "src/math.rs");
        assert!(value.get("scope_variables").is_none());
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let records: Vec<_> = (0..64).map(|_| ErrorRecord::new("m", "f", 1)).collect();
        for pair in records.windows(2) {
            assert!(pair[0].timestamp() <= pair[1].timestamp());
        }
    }

    #[test]
    fn test_clock_steps_back_within_a_microsecond() {
        let latest = AtomicI64::new(i64::MIN);
        let at = |secs, nanos| DateTime::from_timestamp(secs, nanos).unwrap();

        let first = clamp_to_latest(at(1_700_000_000, 700), &latest);
        assert_eq!(first, at(1_700_000_000, 0));

        let stepped_back = clamp_to_latest(at(1_700_000_000, 300), &latest);
        assert!(stepped_back >= first);

        let far_back = clamp_to_latest(at(1_699_999_999, 0), &latest);
        assert_eq!(far_back, first);

        let later = clamp_to_latest(at(1_700_000_001, 1_500), &latest);
        assert_eq!(later, at(1_700_000_001, 1_000));
    }

    #[test]
    fn test_new_records_are_unclassified() {
        assert_eq!(ErrorRecord::new("m", "f", 1).severity(), Severity::Unclassified);
    }

    #[test]
    fn test_field_names_parse() {
        assert_eq!("raw_level".parse::<RecordField>(), Ok(RecordField::RawLevel));
        assert_eq!("Backtrace".parse::<RecordField>(), Ok(RecordField::Backtrace));
        assert_eq!(
            "ip".parse::<RecordField>(),
            Err(UnknownFieldError("ip".to_string()))
        );
    }
}
