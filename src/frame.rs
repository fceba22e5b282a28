//! Stack frames and the sanitizer applied before a backtrace is stored.
//!
//! Frames are captured either by a [`FrameCollector`] when a non-fatal fault
//! is raised, or handed over by a [`Throwable`](crate::Throwable) as its
//! trace. Raw frames may carry a call-type marker and argument values; both
//! are stripped by [`sanitize`] before the frames reach a record.

use core::fmt;

use serde::Serialize;

use crate::scope::ScopeValue;

/// How a frame's function was invoked.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum CallType {
    /// Associated function called through its type, `Type::function`.
    #[serde(rename = "::")]
    Associated,
    /// Method called on a receiver, `value.method`.
    #[serde(rename = ".")]
    Method,
}

impl CallType {
    /// The separator used between owner and function.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Associated => "::",
            Self::Method => ".",
        }
    }
}

/// One entry of a captured call stack, most recent call first.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StackFrame {
    /// Function name, without its owning type.
    pub function: String,
    /// Source file of the call site, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Source line of the call site, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Owning type of the function, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Description of the receiver the function ran on, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    /// Call-type marker. Removed by [`sanitize`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_type: Option<CallType>,
    /// Raw argument values. Removed by [`sanitize`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<ScopeValue>>,
}

impl StackFrame {
    /// Creates a frame for `function` with no further details.
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            ..Self::default()
        }
    }

    /// Sets the source location.
    #[must_use]
    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    /// Sets the owning type and how the function was invoked on it.
    #[must_use]
    pub fn in_class(mut self, class: impl Into<String>, call_type: CallType) -> Self {
        self.class = Some(class.into());
        self.call_type = Some(call_type);
        self
    }

    /// Sets the receiver description.
    #[must_use]
    pub fn on_object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    /// Sets the raw argument values.
    #[must_use]
    pub fn with_args(mut self, args: Vec<ScopeValue>) -> Self {
        self.args = Some(args);
        self
    }

    /// Whether the frame carries neither a call-type marker nor arguments.
    pub fn is_sanitized(&self) -> bool {
        self.call_type.is_none() && self.args.is_none()
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(class) = &self.class {
            let separator = self.call_type.map_or("::", CallType::as_str);
            write!(f, "{class}{separator}")?;
        }
        f.write_str(&self.function)?;
        if let Some(file) = &self.file {
            write!(f, " - {file}")?;
            if let Some(line) = self.line {
                write!(f, ":{line}")?;
            }
        }
        Ok(())
    }
}

/// Strips call-type markers and argument values from every frame.
///
/// Order and every other field are preserved, and sanitizing twice is the
/// same as sanitizing once.
pub fn sanitize(mut frames: Vec<StackFrame>) -> Vec<StackFrame> {
    sanitize_in_place(&mut frames);
    frames
}

/// In-place form of [`sanitize`].
pub fn sanitize_in_place(frames: &mut [StackFrame]) {
    for frame in frames {
        frame.call_type = None;
        frame.args = None;
    }
}

/// Captures the current call stack for a fault that carries no trace of its
/// own.
///
/// The dispatcher calls this once per non-fatal fault and once per panic.
/// `faultline-backtrace` provides an implementation on top of the
/// `backtrace` crate; closures work too.
pub trait FrameCollector: Send + Sync + 'static {
    /// Returns the frames of the current call stack, most recent first.
    fn collect(&self) -> Vec<StackFrame>;
}

impl<F> FrameCollector for F
where
    F: Fn() -> Vec<StackFrame> + Send + Sync + 'static,
{
    fn collect(&self) -> Vec<StackFrame> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_frames() -> Vec<StackFrame> {
        vec![
            StackFrame::new("handle")
                .at("src/routes.rs", 41)
                .in_class("app::Router", CallType::Method)
                .on_object("Router { routes: 3 }")
                .with_args(vec![ScopeValue::from("/login"), ScopeValue::from(2)]),
            StackFrame::new("main").at("src/main.rs", 9),
            StackFrame::new("parse")
                .in_class("app::Config", CallType::Associated)
                .with_args(vec![ScopeValue::Opaque("std::fs::File")]),
        ]
    }

    #[test]
    fn test_sanitize_strips_markers_and_args() {
        let sanitized = sanitize(raw_frames());
        assert_eq!(sanitized.len(), 3);
        assert!(sanitized.iter().all(StackFrame::is_sanitized));

        assert_eq!(sanitized[0].function, "handle");
        assert_eq!(sanitized[0].file.as_deref(), Some("src/routes.rs"));
        assert_eq!(sanitized[0].line, Some(41));
        assert_eq!(sanitized[0].class.as_deref(), Some("app::Router"));
        assert_eq!(sanitized[0].object.as_deref(), Some("Router { routes: 3 }"));
        assert_eq!(sanitized[1].function, "main");
        assert_eq!(sanitized[2].function, "parse");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let once = sanitize(raw_frames());
        let twice = sanitize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sanitized_frames_serialize() {
        let json = serde_json::to_string(&sanitize(raw_frames())).unwrap();
        assert!(!json.contains("call_type"));
        assert!(!json.contains("args"));
        assert!(json.contains(r#""function":"handle""#));
    }

    #[test]
    fn test_display() {
        let frame = StackFrame::new("parse")
            .at("src/config.rs", 12)
            .in_class("Config", CallType::Associated);
        assert_eq!(frame.to_string(), "Config::parse - src/config.rs:12");
        assert_eq!(StackFrame::new("main").to_string(), "main");
    }

    #[test]
    fn test_closures_collect_frames() {
        let collector = || vec![StackFrame::new("main")];
        assert_eq!(FrameCollector::collect(&collector).len(), 1);
    }
}
