//! Client-facing rendering of faults.
//!
//! Only a reduced view of the record is ever shown to the client: the
//! severity, message, location and sanitized backtrace. Scope variables and
//! the caller address stay in the log.
//!
//! [`DisplayFormatter`] lays the view out as a small tree:
//!
//! ```text
//! o  WARNING: division by zero
//! |- at src/math.rs:17
//! |- divide - src/math.rs:17
//! |- main - src/main.rs:4
//! ```

use core::fmt::{self, Write as _};
use std::io;

use serde::Serialize;

use crate::{frame::StackFrame, record::ErrorRecord, severity::Severity};

/// The part of a record that may be shown to the client.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct DisplayView<'a> {
    /// Severity bucket.
    pub severity: Severity,
    /// Human-readable description.
    pub message: &'a str,
    /// Source file.
    pub file: &'a str,
    /// Source line.
    pub line: &'a str,
    /// Sanitized call stack, most recent call first.
    pub backtrace: &'a [StackFrame],
}

impl<'a> From<&'a ErrorRecord> for DisplayView<'a> {
    fn from(record: &'a ErrorRecord) -> Self {
        Self {
            severity: record.severity(),
            message: record.message(),
            file: record.file(),
            line: record.line(),
            backtrace: record.backtrace(),
        }
    }
}

impl DisplayView<'_> {
    /// Wraps the view with a formatter so it can be used with `{}`.
    pub fn display_with<'b>(&'b self, formatter: &'b DisplayFormatter) -> impl fmt::Display + 'b {
        struct Displayed<'b, 'a> {
            view: &'b DisplayView<'a>,
            formatter: &'b DisplayFormatter,
        }

        impl fmt::Display for Displayed<'_, '_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.formatter.format(self.view, f)
            }
        }

        Displayed {
            view: self,
            formatter,
        }
    }
}

/// Prefix and suffix written around a line.
#[derive(Copy, Clone, Debug)]
pub struct LineFormatting {
    /// Text written before the line
    pub prefix: &'static str,
    /// Text written after the line
    pub suffix: &'static str,
}

impl LineFormatting {
    /// Creates a line formatting.
    pub const fn new(prefix: &'static str, suffix: &'static str) -> Self {
        Self { prefix, suffix }
    }
}

/// Formatting for an item that may span several lines.
#[derive(Copy, Clone, Debug)]
pub struct ItemFormatting {
    /// Used when the item is a single line
    pub standalone_line: LineFormatting,
    /// First line of a multi-line item
    pub first_line: LineFormatting,
    /// Lines between the first and the last
    pub middle_line: LineFormatting,
    /// Last line of a multi-line item
    pub last_line: LineFormatting,
}

impl ItemFormatting {
    /// Creates an item formatting from `(prefix, suffix)` pairs.
    pub const fn new(
        standalone_line: (&'static str, &'static str),
        first_line: (&'static str, &'static str),
        middle_line: (&'static str, &'static str),
        last_line: (&'static str, &'static str),
    ) -> Self {
        Self {
            standalone_line: LineFormatting::new(standalone_line.0, standalone_line.1),
            first_line: LineFormatting::new(first_line.0, first_line.1),
            middle_line: LineFormatting::new(middle_line.0, middle_line.1),
            last_line: LineFormatting::new(last_line.0, last_line.1),
        }
    }
}

/// Tree-style text layout for a [`DisplayView`].
///
/// The headline carries the severity and message. Below it come the
/// location and then one item per backtrace frame.
#[derive(Copy, Clone, Debug)]
pub struct DisplayFormatter {
    /// Written before everything else
    pub header: &'static str,
    /// Formatting of the `SEVERITY: message` headline
    pub headline: ItemFormatting,
    /// Items followed by more items
    pub item_middle: ItemFormatting,
    /// The final item
    pub item_last: ItemFormatting,
    /// Written after everything else
    pub footer: &'static str,
}

impl DisplayFormatter {
    /// Plain ASCII without escape codes, suitable for HTML `<pre>` blocks and
    /// log files.
    pub const ASCII_NO_ANSI: Self = Self {
        header: "",
        headline: ItemFormatting::new(
            ("o  ", "\n"),
            ("o  ", "\n"),
            ("|  ", "\n"),
            ("|  ", "\n"),
        ),
        item_middle: ItemFormatting::new(
            ("|- ", "\n"),
            ("|- ", "\n"),
            ("|  ", "\n"),
            ("|  ", "\n"),
        ),
        item_last: ItemFormatting::new(
            ("`- ", "\n"),
            ("`- ", "\n"),
            ("   ", "\n"),
            ("   ", "\n"),
        ),
        footer: "",
    };

    /// Unicode box drawing with ANSI colors, for terminals.
    pub const UNICODE_ANSI: Self = Self {
        header: "",
        headline: ItemFormatting::new(
            ("\x1b[97m● \x1b[1m", "\x1b[0m\n"),
            ("\x1b[97m● \x1b[1m", "\x1b[0m\n"),
            ("│ \x1b[1;97m", "\x1b[0m\n"),
            ("│ \x1b[1;97m", "\x1b[0m\n"),
        ),
        item_middle: ItemFormatting::new(
            ("├ ", "\n"),
            ("├ ", "\n"),
            ("│ ", "\n"),
            ("│ ", "\n"),
        ),
        item_last: ItemFormatting::new(("╰ ", "\n"), ("╰ ", "\n"), ("  ", "\n"), ("  ", "\n")),
        footer: "",
    };

    /// Writes `view` into `f`.
    pub fn format(&self, view: &DisplayView<'_>, f: &mut impl fmt::Write) -> fmt::Result {
        let mut buffer = String::new();
        f.write_str(self.header)?;

        write!(buffer, "{}: {}", view.severity, view.message)?;
        format_item(f, &self.headline, &buffer)?;

        let item_count = 1 + view.backtrace.len();
        let location = format!("at {}:{}", view.file, view.line);
        let items =
            core::iter::once(location).chain(view.backtrace.iter().map(ToString::to_string));
        for (index, item) in items.enumerate() {
            let formatting = if index + 1 == item_count {
                &self.item_last
            } else {
                &self.item_middle
            };
            format_item(f, formatting, &item)?;
        }

        f.write_str(self.footer)
    }
}

impl Default for DisplayFormatter {
    fn default() -> Self {
        Self::ASCII_NO_ANSI
    }
}

fn format_item(f: &mut impl fmt::Write, formatting: &ItemFormatting, value: &str) -> fmt::Result {
    let mut lines = value.trim_end().lines().peekable();
    let mut is_first = true;
    while let Some(line) = lines.next() {
        let is_last = lines.peek().is_none();
        let line_formatting = match (is_first, is_last) {
            (true, true) => &formatting.standalone_line,
            (true, false) => &formatting.first_line,
            (false, false) => &formatting.middle_line,
            (false, true) => &formatting.last_line,
        };
        f.write_str(line_formatting.prefix)?;
        f.write_str(line)?;
        f.write_str(line_formatting.suffix)?;
        is_first = false;
    }
    Ok(())
}

/// The client-facing output channel.
pub trait ClientOutput: Send + 'static {
    /// Shows `view` to the client.
    fn render(&mut self, view: &DisplayView<'_>) -> io::Result<()>;
}

/// Renders views with a [`DisplayFormatter`] into any writer.
#[derive(Debug)]
pub struct WriterOutput<W> {
    writer: W,
    formatter: DisplayFormatter,
}

impl WriterOutput<io::Stdout> {
    /// Renders plain ASCII to standard output, where a CGI response body goes.
    pub fn stdout() -> Self {
        Self::new(io::stdout(), DisplayFormatter::ASCII_NO_ANSI)
    }
}

impl<W> WriterOutput<W> {
    /// Renders into `writer` using `formatter`.
    pub fn new(writer: W, formatter: DisplayFormatter) -> Self {
        Self { writer, formatter }
    }

    /// The underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Consumes the output, returning the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: io::Write + Send + 'static> ClientOutput for WriterOutput<W> {
    fn render(&mut self, view: &DisplayView<'_>) -> io::Result<()> {
        let mut rendered = String::new();
        self.formatter
            .format(view, &mut rendered)
            .map_err(|fmt::Error| io::Error::other("formatting failed"))?;
        self.writer.write_all(rendered.as_bytes())?;
        self.writer.flush()
    }
}
