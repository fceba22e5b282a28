#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! Live stack capture for the faultline fault dispatcher.
//!
//! Faults raised with `trigger!` and panics caught by the panic hook carry no
//! call stack of their own. Install a [`BacktraceCollector`] on the
//! dispatcher and every such record gets one:
//!
//! ```rust
//! use faultline::{FaultDispatcher, Options};
//! use faultline_backtrace::BacktraceCollector;
//!
//! let dispatcher = FaultDispatcher::builder()
//!     .options(Options::new().write(false).display(false))
//!     .frame_collector(BacktraceCollector::new_from_env())
//!     .build();
//! ```
//!
//! Symbols are split the way the record expects them: the owning type or
//! module goes into [`StackFrame::class`], the bare function name into
//! [`StackFrame::function`].
//!
//! # Environment Variables
//!
//! - `RUST_BACKTRACE=full` - Disables filtering and shows full paths
//! - `FAULTLINE_BACKTRACE` - Comma-separated options:
//!   - `full_paths` - Show full file paths in backtraces
//!
//! # Path privacy
//!
//! Paths of the standard library and of registry crates are shortened, but
//! paths of your own crates are recorded as the debug information has them.
//! Records end up in log files and, when display is enabled, in responses. Use
//! the `--remap-path-prefix` option of `rustc` if that exposes too much:
//!
//! ```sh
//! export RUSTFLAGS="--remap-path-prefix=$HOME=/home/user --remap-path-prefix=$PWD=/build"
//! ```

use std::{borrow::Cow, panic::Location, sync::OnceLock};

use backtrace::BytesOrWideString;
use faultline::{FrameCollector, StackFrame, frame::CallType};

/// Captures the current call stack for fault records.
///
/// # Examples
///
/// ```rust
/// use faultline::FrameCollector;
/// use faultline_backtrace::{BacktraceCollector, BacktraceFilter};
///
/// let collector = BacktraceCollector {
///     filter: BacktraceFilter {
///         skipped_middle_crates: &["tokio", "hyper"],
///         max_entry_count: 10,
///         ..BacktraceFilter::DEFAULT
///     },
/// };
/// assert!(collector.collect().len() <= 10);
/// ```
#[derive(Copy, Clone, Debug, Default)]
pub struct BacktraceCollector {
    /// Which frames are kept.
    pub filter: BacktraceFilter,
}

/// Configuration for filtering frames from certain crates in a backtrace.
#[derive(Copy, Clone, Debug)]
pub struct BacktraceFilter {
    /// Crates whose frames are dropped while they are at the top of the
    /// stack.
    pub skipped_initial_crates: &'static [&'static str],
    /// Crates whose consecutive frames are collapsed into a single
    /// placeholder frame.
    pub skipped_middle_crates: &'static [&'static str],
    /// Crates whose frames are dropped while they are at the bottom of the
    /// stack.
    pub skipped_final_crates: &'static [&'static str],
    /// Maximum number of frames kept.
    pub max_entry_count: usize,
    /// Whether to record full file paths.
    pub show_full_path: bool,
}

impl BacktraceFilter {
    /// Default backtrace filter settings.
    pub const DEFAULT: Self = Self {
        skipped_initial_crates: &[
            "backtrace",
            "faultline",
            "faultline-backtrace",
            "core",
            "std",
            "alloc",
        ],
        skipped_middle_crates: &["std", "core", "alloc"],
        skipped_final_crates: &["std", "core", "alloc"],
        max_entry_count: 20,
        show_full_path: false,
    };

    /// Keeps every frame.
    pub const UNFILTERED: Self = Self {
        skipped_initial_crates: &[],
        skipped_middle_crates: &[],
        skipped_final_crates: &[],
        max_entry_count: usize::MAX,
        show_full_path: true,
    };
}

impl Default for BacktraceFilter {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug)]
struct FaultlineEnvOptions {
    rust_backtrace_full: bool,
    show_full_path: bool,
}

impl FaultlineEnvOptions {
    fn get() -> &'static Self {
        static FAULTLINE_FLAGS: OnceLock<FaultlineEnvOptions> = OnceLock::new();

        FAULTLINE_FLAGS.get_or_init(|| {
            let rust_backtrace_full =
                std::env::var_os("RUST_BACKTRACE").is_some_and(|var| var == "full");
            let mut show_full_path = rust_backtrace_full;
            if let Some(var) = std::env::var_os("FAULTLINE_BACKTRACE") {
                for v in var.to_string_lossy().split(',') {
                    if v.trim().eq_ignore_ascii_case("full_paths") {
                        show_full_path = true;
                    }
                }
            }
            FaultlineEnvOptions {
                rust_backtrace_full,
                show_full_path,
            }
        })
    }
}

impl BacktraceCollector {
    /// Creates a collector configured from the environment.
    ///
    /// `RUST_BACKTRACE=full` disables all filtering. `FAULTLINE_BACKTRACE`
    /// may contain `full_paths` to keep full file paths.
    pub fn new_from_env() -> Self {
        let env_options = FaultlineEnvOptions::get();
        Self {
            filter: if env_options.rust_backtrace_full {
                BacktraceFilter {
                    show_full_path: env_options.show_full_path,
                    ..BacktraceFilter::UNFILTERED
                }
            } else {
                BacktraceFilter {
                    show_full_path: env_options.show_full_path,
                    ..BacktraceFilter::DEFAULT
                }
            },
        }
    }

    /// Captures the current call stack, most recent call first.
    pub fn capture(&self) -> Vec<StackFrame> {
        capture(&self.filter)
    }
}

impl FrameCollector for BacktraceCollector {
    fn collect(&self) -> Vec<StackFrame> {
        self.capture()
    }
}

struct RawFrame {
    symbol: String,
    path: FramePath,
    line: Option<u32>,
}

enum Entry {
    Frame(RawFrame),
    Omitted {
        count: usize,
        skipped_crate: &'static str,
    },
}

fn capture(filter: &BacktraceFilter) -> Vec<StackFrame> {
    let mut initial_filtering = !filter.skipped_initial_crates.is_empty();
    let mut entries: Vec<Entry> = Vec::new();
    let mut omitted_run: Option<(&'static str, usize, Option<RawFrame>)> = None;

    backtrace::trace(|frame| {
        backtrace::resolve_frame(frame, |symbol| {
            let (Some(name), Some(filename)) = (symbol.name(), symbol.filename_raw()) else {
                return;
            };
            if entries.len() >= filter.max_entry_count {
                return;
            }

            let path = FramePath::new(filename);

            if initial_filtering {
                if let Some(crate_name) = &path.crate_name
                    && filter.skipped_initial_crates.contains(&&**crate_name)
                {
                    return;
                }
                initial_filtering = false;
            }

            if let Some(crate_name) = &path.crate_name
                && let Some((run_crate, count, first)) = &mut omitted_run
                && &**crate_name == *run_crate
            {
                *count += 1;
                *first = None;
                return;
            }

            if let Some(run) = omitted_run.take() {
                entries.push(end_run(run));
            }

            let raw = RawFrame {
                symbol: format!("{name:#}"),
                path,
                line: symbol.lineno(),
            };

            if let Some(crate_name) = &raw.path.crate_name
                && let Some(skipped_crate) = filter
                    .skipped_middle_crates
                    .iter()
                    .find(|&skipped| skipped == crate_name)
            {
                omitted_run = Some((*skipped_crate, 1, Some(raw)));
                return;
            }

            entries.push(Entry::Frame(raw));
        });

        true
    });

    if let Some(run) = omitted_run.take() {
        entries.push(end_run(run));
    }

    while let Some(last) = entries.last() {
        let skip = match last {
            Entry::Frame(frame) => {
                frame
                    .path
                    .crate_name
                    .as_deref()
                    .is_some_and(|crate_name| filter.skipped_final_crates.contains(&crate_name))
                    || frame.symbol == "__libc_start_call_main"
                    || frame.symbol == "__libc_start_main_impl"
            }
            Entry::Omitted { skipped_crate, .. } => {
                filter.skipped_final_crates.contains(skipped_crate)
            }
        };
        if !skip {
            break;
        }
        entries.pop();
    }

    entries
        .into_iter()
        .map(|entry| match entry {
            Entry::Frame(raw) => to_stack_frame(raw, filter.show_full_path),
            Entry::Omitted {
                count,
                skipped_crate,
            } => StackFrame::new(format!("[{count} frame(s) from {skipped_crate} omitted]")),
        })
        .collect()
}

/// A run of one skipped frame is kept as is.
fn end_run((skipped_crate, count, first): (&'static str, usize, Option<RawFrame>)) -> Entry {
    match first {
        Some(frame) if count == 1 => Entry::Frame(frame),
        _ => Entry::Omitted {
            count,
            skipped_crate,
        },
    }
}

fn to_stack_frame(raw: RawFrame, show_full_path: bool) -> StackFrame {
    let (owner, function) = split_symbol(&raw.symbol);
    let file = match raw.path.split_suffix {
        Some(suffix) if !show_full_path => suffix,
        _ => raw.path.raw_path,
    };
    let mut frame = StackFrame::new(function);
    frame.file = Some(file);
    frame.line = raw.line;
    if let Some(owner) = owner {
        let call_type = is_type_like(owner).then_some(CallType::Associated);
        frame.class = Some(owner.to_owned());
        frame.call_type = call_type;
    }
    frame
}

/// Splits a demangled symbol into its owner path and function name.
fn split_symbol(symbol: &str) -> (Option<&str>, &str) {
    let function = get_function_name(symbol);
    let start = function.as_ptr() as usize - symbol.as_ptr() as usize;
    let owner = symbol[..start].strip_suffix("::").filter(|owner| !owner.is_empty());
    (owner, &symbol[start..])
}

/// Whether the last segment of `owner` names a type rather than a module.
fn is_type_like(owner: &str) -> bool {
    if owner.starts_with('<') {
        return true;
    }
    let last = owner.rsplit("::").next().unwrap_or(owner);
    last.chars().next().is_some_and(char::is_uppercase)
}

fn get_function_name(s: &str) -> &str {
    let mut word_start = 0usize;
    let mut word_end = 0usize;
    let mut angle_nesting_level = 0u64;
    let mut curly_nesting_level = 0u64;
    let mut potential_function_arrow = false;
    let mut inside_word = false;

    for (i, c) in s.char_indices() {
        if curly_nesting_level == 0 && angle_nesting_level == 0 {
            if !inside_word && unicode_ident::is_xid_start(c) {
                word_start = i;
                inside_word = true;
            } else if inside_word && !unicode_ident::is_xid_continue(c) {
                word_end = i;
                inside_word = false;
            }
        }

        let was_potential_function_arrow = potential_function_arrow;
        potential_function_arrow = c == '-';

        if c == '<' {
            angle_nesting_level = angle_nesting_level.saturating_add(1);
        } else if c == '>' && !was_potential_function_arrow {
            angle_nesting_level = angle_nesting_level.saturating_sub(1);
        } else if c == '{' {
            curly_nesting_level = curly_nesting_level.saturating_add(1);
            if !inside_word && curly_nesting_level == 1 && angle_nesting_level == 0 {
                word_start = i;
                inside_word = true;
            }
        } else if c == '}' {
            curly_nesting_level = curly_nesting_level.saturating_sub(1);
            if inside_word && curly_nesting_level == 0 {
                word_end = i + 1;
                inside_word = false;
            }
        }
    }

    if word_start < word_end {
        &s[word_start..word_end]
    } else {
        &s[word_start..]
    }
}

/// Crate detection for a frame's source path.
#[derive(Debug)]
struct FramePath {
    raw_path: String,
    crate_name: Option<Cow<'static, str>>,
    /// The path with its well-known prefix removed.
    split_suffix: Option<String>,
}

const fn get_path_matcher(location: &'static Location<'static>) -> Option<(&'static str, usize)> {
    let file = location.file();

    let Some(prefix_len) = file.len().checked_sub("/src/lib.rs".len()) else {
        return None;
    };

    let (prefix, _) = file.split_at(prefix_len);
    let (matcher_prefix, _) = file.split_at(prefix_len + 4);

    let mut splitter_prefix = prefix;
    while !splitter_prefix.is_empty() {
        let (new_prefix, last_char) = splitter_prefix.split_at(splitter_prefix.len() - 1);
        splitter_prefix = new_prefix;
        if last_char.eq_ignore_ascii_case(std::path::MAIN_SEPARATOR_STR) {
            break;
        }
    }

    Some((matcher_prefix, splitter_prefix.len()))
}

const FAULTLINE_BACKTRACE_MATCHER: Option<(&str, usize)> = get_path_matcher(Location::caller());
const FAULTLINE_MATCHER: Option<(&str, usize)> =
    get_path_matcher(faultline::__private::FAULTLINE_LOCATION);

impl FramePath {
    fn new(path: BytesOrWideString<'_>) -> Self {
        static REGEXES: OnceLock<[regex::Regex; 2]> = OnceLock::new();
        let [std_regex, registry_regex] = REGEXES.get_or_init(|| {
            [
                // /lib/rustlib/src/rust/library/{std|core|alloc}/src/...
                // /rustc/{40-char-hash}/library/{std|core|alloc}/src/...
                regex::Regex::new(
                    r"(?:/lib/rustlib/src/rust|^/rustc/[0-9a-f]{40})/library/(std|core|alloc)/src/.*$",
                )
                .expect("built-in regex pattern for std library paths should be valid"),
                // /.cargo/registry/src/{index}-{16-char-hash}/{crate}-{version}/src/...
                regex::Regex::new(
                    r"/\.cargo/registry/src/[^/]+-[0-9a-f]{16}/([^./]+)-[0-9]+\.[^/]*/src/.*$",
                )
                .expect("built-in regex pattern for cargo registry paths should be valid"),
            ]
        });

        let raw_path = path.to_str_lossy().into_owned();

        for regex in [std_regex, registry_regex] {
            if let Some(crate_capture) = regex
                .captures(&raw_path)
                .and_then(|captures| captures.get(1))
            {
                return Self {
                    crate_name: Some(Cow::Owned(crate_capture.as_str().to_owned())),
                    split_suffix: Some(raw_path[crate_capture.start()..].to_owned()),
                    raw_path,
                };
            }
        }

        for (matcher, crate_name) in [
            (FAULTLINE_MATCHER, "faultline"),
            (FAULTLINE_BACKTRACE_MATCHER, "faultline-backtrace"),
        ] {
            if let Some((matcher_prefix, splitter_prefix_len)) = matcher
                && raw_path.starts_with(matcher_prefix)
            {
                return Self {
                    crate_name: Some(Cow::Borrowed(crate_name)),
                    split_suffix: Some(raw_path[splitter_prefix_len + 1..].to_owned()),
                    raw_path,
                };
            }
        }

        Self {
            raw_path,
            crate_name: None,
            split_suffix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_names() {
        assert_eq!(get_function_name("myapp::db::connect"), "connect");
        assert_eq!(get_function_name("<myapp::Pool as core::ops::Drop>::drop"), "drop");
        assert_eq!(get_function_name("myapp::main::{{closure}}"), "{{closure}}");
        assert_eq!(get_function_name("main"), "main");
    }

    #[test]
    fn test_split_symbol() {
        assert_eq!(split_symbol("myapp::db::connect"), (Some("myapp::db"), "connect"));
        assert_eq!(
            split_symbol("myapp::db::Pool::get"),
            (Some("myapp::db::Pool"), "get")
        );
        assert_eq!(
            split_symbol("<myapp::Pool as core::ops::Drop>::drop"),
            (Some("<myapp::Pool as core::ops::Drop>"), "drop")
        );
        assert_eq!(split_symbol("main"), (None, "main"));
    }

    #[test]
    fn test_type_like_owners() {
        assert!(is_type_like("myapp::db::Pool"));
        assert!(is_type_like("<myapp::Pool as core::ops::Drop>"));
        assert!(!is_type_like("myapp::db"));
    }

    #[test]
    fn test_frames_for_methods_and_functions() {
        let method = to_stack_frame(
            RawFrame {
                symbol: "myapp::db::Pool::get".into(),
                path: FramePath {
                    raw_path: "/build/src/db.rs".into(),
                    crate_name: None,
                    split_suffix: None,
                },
                line: Some(7),
            },
            false,
        );
        assert_eq!(method.function, "get");
        assert_eq!(method.class.as_deref(), Some("myapp::db::Pool"));
        assert_eq!(method.call_type, Some(CallType::Associated));
        assert_eq!(method.to_string(), "myapp::db::Pool::get - /build/src/db.rs:7");

        let function = to_stack_frame(
            RawFrame {
                symbol: "std::rt::lang_start".into(),
                path: FramePath {
                    raw_path: "/rustc/abc/library/std/src/rt.rs".into(),
                    crate_name: Some(Cow::Borrowed("std")),
                    split_suffix: Some("std/src/rt.rs".into()),
                },
                line: None,
            },
            false,
        );
        assert_eq!(function.file.as_deref(), Some("std/src/rt.rs"));
        assert_eq!(function.call_type, None);
    }

    #[test]
    fn test_capture_respects_max_entry_count() {
        let filter = BacktraceFilter {
            max_entry_count: 2,
            ..BacktraceFilter::UNFILTERED
        };
        assert!(capture(&filter).len() <= 2);
    }
}
