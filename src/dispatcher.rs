//! The fault dispatcher and its action pipeline.

use core::{cell::Cell, fmt};
use std::{
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
};

use crate::{
    caller::{CallerAddressSource, CgiEnvironment},
    entity::Entity,
    frame::{self, FrameCollector, StackFrame},
    hooks::{self, AlreadyInitializedError},
    options::{Config, ConfigError, Options},
    record::ErrorRecord,
    render::{ClientOutput, DisplayView, WriterOutput},
    reporting,
    scope::ScopeVariables,
    severity::{FaultLevel, FaultSignal, Severity},
    sink::{FileSink, LogSink},
    terminator::{ProcessExit, Terminator},
    throwable::Throwable,
};

/// How a fault handling pass ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// The current thread's reporting mask silenced the fault. Nothing was
    /// built, written, rendered or halted.
    Ignored,
    /// Neither writing nor display is enabled, so the record was dropped.
    Discarded,
    /// Display was refused for the caller address, so execution continues.
    Continued {
        /// Whether the record reached the log sink.
        persisted: bool,
    },
    /// The terminator was invoked.
    Halted {
        /// Whether the record reached the log sink.
        persisted: bool,
        /// Whether the record was rendered to the client.
        rendered: bool,
    },
}

impl Disposition {
    /// Whether the pass invoked the terminator.
    pub const fn halted(self) -> bool {
        matches!(self, Self::Halted { .. })
    }
}

/// Failure of a fault handling pass.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Writing is enabled but no log destination was set.
    #[error(
        "fault needs to be written to the log but no log destination has been set; \
         call `FaultDispatcher::set_log_destination` first"
    )]
    MissingLogDestination,
    /// The log sink failed.
    #[error("failed to write fault record to the log sink")]
    Sink(#[source] io::Error),
    /// Rendering to the client failed.
    #[error("failed to render fault to the client")]
    Output(#[source] io::Error),
    /// A fault was raised on this thread while another one was being handled.
    #[error("fault raised while another fault was being handled")]
    Reentrant,
}

struct Collaborators {
    sink: Box<dyn LogSink>,
    output: Box<dyn ClientOutput>,
}

/// Process-wide fault interception service.
///
/// A dispatcher is built once at startup, shared as an
/// `Arc<FaultDispatcher>`, and installed with
/// [`initialize`](Self::initialize). Non-fatal faults are handed to
/// [`handle_fault`](Self::handle_fault), usually through [`trigger!`];
/// panics reach [`handle_exception`](Self::handle_exception) through the
/// panic hook.
///
/// Every pass runs the same pipeline: suppression check, record
/// construction and classification, enrichment with the caller address and a
/// sanitized backtrace, then routing to the log sink, the client output and
/// the terminator according to the current [`Config`].
///
/// # Examples
///
/// ```
/// use faultline::{Disposition, FaultDispatcher, FaultLevel, Options, ScopeVariables};
///
/// let dir = std::env::temp_dir().join("faultline-doc");
/// let dispatcher = FaultDispatcher::builder()
///     .options(Options::new().display(false))
///     .log_destination(&dir)
///     .terminator(|_code| {})
///     .build();
///
/// let disposition = dispatcher
///     .handle_fault(
///         FaultLevel::USER_WARNING,
///         "cache miss storm",
///         file!(),
///         line!(),
///         ScopeVariables::new(),
///     )
///     .unwrap();
/// assert_eq!(disposition, Disposition::Halted { persisted: true, rendered: false });
/// ```
///
/// [`trigger!`]: crate::trigger
pub struct FaultDispatcher {
    config: RwLock<Config>,
    log_destination: RwLock<Option<PathBuf>>,
    collaborators: Mutex<Collaborators>,
    caller_source: Box<dyn CallerAddressSource>,
    frame_collector: Option<Box<dyn FrameCollector>>,
    terminator: Box<dyn Terminator>,
}

impl fmt::Debug for FaultDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultDispatcher")
            .field("config", &*read(&self.config))
            .field("log_destination", &*read(&self.log_destination))
            .field("frame_collector", &self.frame_collector.is_some())
            .finish_non_exhaustive()
    }
}

impl FaultDispatcher {
    /// Starts building a dispatcher.
    pub fn builder() -> FaultDispatcherBuilder {
        FaultDispatcherBuilder::new()
    }

    /// Installs the dispatcher as the process panic hook and as the
    /// [installed](Self::installed) dispatcher.
    ///
    /// The previous panic hook is kept and runs after every pass that does
    /// not halt. Only one dispatcher can be initialized per process; later
    /// calls fail and change nothing.
    pub fn initialize(self: &Arc<Self>) -> Result<(), AlreadyInitializedError> {
        hooks::install(Arc::clone(self))
    }

    /// The dispatcher installed by [`initialize`](Self::initialize), if any.
    pub fn installed() -> Option<Arc<Self>> {
        hooks::installed()
    }

    /// Merges `options` into the current configuration.
    pub fn configure(&self, options: Options) {
        tracing::debug!(?options, "updating fault dispatcher configuration");
        write(&self.config).merge(options);
    }

    /// Applies the `FAULTLINE*` environment variables.
    ///
    /// See [`Options::from_env`] for the variables that are read.
    /// `FAULTLINE_LOG_DIR` sets the log destination.
    pub fn configure_from_env(&self) -> Result<(), ConfigError> {
        self.configure_from_lookup(|name| std::env::var(name).ok())
    }

    fn configure_from_lookup(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        self.configure(Options::from_lookup(&lookup)?);
        if let Some(directory) = lookup("FAULTLINE_LOG_DIR").filter(|dir| !dir.trim().is_empty()) {
            self.set_log_destination(directory.trim());
        }
        Ok(())
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Config {
        read(&self.config).clone()
    }

    /// Sets the directory records are written to.
    pub fn set_log_destination(&self, directory: impl Into<PathBuf>) {
        *write(&self.log_destination) = Some(directory.into());
    }

    /// The directory records are written to.
    pub fn log_destination(&self) -> Option<PathBuf> {
        read(&self.log_destination).clone()
    }

    /// Handles a non-fatal fault.
    ///
    /// Returns [`Disposition::Ignored`] without doing anything when `level`
    /// is silenced on the current thread.
    pub fn handle_fault(
        &self,
        level: FaultLevel,
        message: impl Into<String>,
        file: impl Into<String>,
        line: impl fmt::Display,
        scope_variables: ScopeVariables,
    ) -> Result<Disposition, DispatchError> {
        if !reporting::current().reports(level) {
            return Ok(Disposition::Ignored);
        }
        let _pass = PassGuard::enter()?;

        let mut record = ErrorRecord::new(message, file, line);
        record
            .set_severity(Severity::classify(FaultSignal::Level(level)))
            .set_raw_level(level.code())
            .set_scope_variables(scope_variables);
        let backtrace = self.collect_frames();
        self.route(record, backtrace)
    }

    /// Handles an uncaught exception.
    ///
    /// Returns [`Disposition::Ignored`] without doing anything when every
    /// fault is silenced on the current thread.
    pub fn handle_exception(
        &self,
        exception: &dyn Throwable,
    ) -> Result<Disposition, DispatchError> {
        if reporting::current().is_empty() {
            return Ok(Disposition::Ignored);
        }
        let _pass = PassGuard::enter()?;

        let mut record =
            ErrorRecord::new(exception.message(), exception.file(), exception.line());
        record
            .set_severity(Severity::classify(FaultSignal::UncaughtException))
            .set_raw_level(exception.code());
        let mut backtrace = exception.trace();
        if backtrace.is_empty() {
            backtrace = self.collect_frames();
        }
        self.route(record, backtrace)
    }

    fn collect_frames(&self) -> Vec<StackFrame> {
        self.frame_collector
            .as_ref()
            .map(|collector| collector.collect())
            .unwrap_or_default()
    }

    fn route(
        &self,
        mut record: ErrorRecord,
        backtrace: Vec<StackFrame>,
    ) -> Result<Disposition, DispatchError> {
        record
            .set_caller_address(self.caller_source.caller_address())
            .set_backtrace(frame::sanitize(backtrace));

        let _span = tracing::debug_span!(
            "fault",
            severity = %record.severity(),
            raw_level = record.raw_level(),
        )
        .entered();

        let config = self.config();
        let mut collaborators = lock(&self.collaborators);

        let persisted = if config.write {
            let destination = self
                .log_destination()
                .ok_or(DispatchError::MissingLogDestination)?;
            let serialized = serialize(&record, &config);
            persist(collaborators.sink.as_mut(), &destination, &serialized)?;
            tracing::debug!(destination = %destination.display(), "fault record written");
            true
        } else {
            false
        };

        if !config.display {
            if !persisted {
                tracing::debug!("writing and display are both disabled, discarding fault record");
                return Ok(Disposition::Discarded);
            }
            drop(collaborators);
            self.halt(config.exit_code);
            return Ok(Disposition::Halted {
                persisted,
                rendered: false,
            });
        }

        if !config.allows_display_to(record.caller_address()) {
            tracing::warn!(
                caller_address = record.caller_address(),
                "caller is not allowed to see faults, continuing without display"
            );
            return Ok(Disposition::Continued { persisted });
        }

        collaborators
            .output
            .render(&DisplayView::from(&record))
            .map_err(DispatchError::Output)?;
        drop(collaborators);
        self.halt(config.exit_code);
        Ok(Disposition::Halted {
            persisted,
            rendered: true,
        })
    }

    fn halt(&self, code: i32) {
        tracing::debug!(code, "halting after fault");
        self.terminator.terminate(code);
    }
}

fn serialize(record: &ErrorRecord, config: &Config) -> String {
    match record.to_json(&config.included_fields) {
        Ok(serialized) => serialized,
        Err(error) => {
            tracing::warn!(
                %error,
                "dropping scope variables and backtrace from unserializable fault record"
            );
            let mut reduced = record.clone();
            reduced.clear_unserializable();
            reduced.to_json(&config.included_fields).unwrap_or_else(|error| {
                tracing::warn!(%error, "falling back to minimal fault record");
                reduced.minimal_json()
            })
        }
    }
}

fn persist(
    sink: &mut dyn LogSink,
    destination: &Path,
    serialized: &str,
) -> Result<(), DispatchError> {
    sink.set_directory(destination).map_err(DispatchError::Sink)?;
    sink.write(serialized).map_err(DispatchError::Sink)
}

thread_local! {
    static IN_FLIGHT: Cell<bool> = const { Cell::new(false) };
}

struct PassGuard(());

impl PassGuard {
    fn enter() -> Result<Self, DispatchError> {
        if IN_FLIGHT.with(|in_flight| in_flight.replace(true)) {
            tracing::error!("fault raised while handling another fault");
            Err(DispatchError::Reentrant)
        } else {
            Ok(Self(()))
        }
    }
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        IN_FLIGHT.with(|in_flight| in_flight.set(false));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Builder for a [`FaultDispatcher`].
///
/// Every collaborator has a default: a [`FileSink`], plain text on standard
/// output, the CGI environment as caller address source, no frame collector
/// and [`ProcessExit`].
pub struct FaultDispatcherBuilder {
    config: Config,
    log_destination: Option<PathBuf>,
    sink: Box<dyn LogSink>,
    output: Box<dyn ClientOutput>,
    caller_source: Box<dyn CallerAddressSource>,
    frame_collector: Option<Box<dyn FrameCollector>>,
    terminator: Box<dyn Terminator>,
}

impl Default for FaultDispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FaultDispatcherBuilder {
    /// Creates a builder with the default collaborators.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            log_destination: None,
            sink: Box::new(FileSink::new()),
            output: Box::new(WriterOutput::stdout()),
            caller_source: Box::new(CgiEnvironment),
            frame_collector: None,
            terminator: Box::new(ProcessExit),
        }
    }

    /// Merges `options` into the initial configuration.
    #[must_use]
    pub fn options(mut self, options: Options) -> Self {
        self.config.merge(options);
        self
    }

    /// Sets the log destination.
    #[must_use]
    pub fn log_destination(mut self, directory: impl Into<PathBuf>) -> Self {
        self.log_destination = Some(directory.into());
        self
    }

    /// Sets the log sink.
    #[must_use]
    pub fn sink(mut self, sink: impl LogSink) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Sets the client output.
    #[must_use]
    pub fn output(mut self, output: impl ClientOutput) -> Self {
        self.output = Box::new(output);
        self
    }

    /// Sets the caller address source.
    #[must_use]
    pub fn caller_source(mut self, caller_source: impl CallerAddressSource) -> Self {
        self.caller_source = Box::new(caller_source);
        self
    }

    /// Sets the collector used when a fault carries no backtrace of its own.
    #[must_use]
    pub fn frame_collector(mut self, frame_collector: impl FrameCollector) -> Self {
        self.frame_collector = Some(Box::new(frame_collector));
        self
    }

    /// Sets the terminator.
    #[must_use]
    pub fn terminator(mut self, terminator: impl Terminator) -> Self {
        self.terminator = Box::new(terminator);
        self
    }

    /// Builds the dispatcher.
    pub fn build(self) -> Arc<FaultDispatcher> {
        Arc::new(FaultDispatcher {
            config: RwLock::new(self.config),
            log_destination: RwLock::new(self.log_destination),
            collaborators: Mutex::new(Collaborators {
                sink: self.sink,
                output: self.output,
            }),
            caller_source: self.caller_source,
            frame_collector: self.frame_collector,
            terminator: self.terminator,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{record::RecordField, scope::ScopeValue, throwable::Thrown};

    #[derive(Clone, Default)]
    struct Shared<T>(Arc<Mutex<T>>);

    impl<T: Clone> Shared<T> {
        fn get(&self) -> T {
            self.0.lock().unwrap().clone()
        }
    }

    impl<T> Shared<Vec<T>> {
        fn push(&self, value: T) {
            self.0.lock().unwrap().push(value);
        }
    }

    #[derive(Clone, Default)]
    struct MemorySink {
        directories: Shared<Vec<PathBuf>>,
        lines: Shared<Vec<String>>,
    }

    impl LogSink for MemorySink {
        fn set_directory(&mut self, directory: &Path) -> io::Result<()> {
            self.directories.push(directory.to_path_buf());
            Ok(())
        }

        fn write(&mut self, serialized: &str) -> io::Result<()> {
            self.lines.push(serialized.to_owned());
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct MemoryOutput(Shared<Vec<String>>);

    impl ClientOutput for MemoryOutput {
        fn render(&mut self, view: &DisplayView<'_>) -> io::Result<()> {
            self.0.push(view.message.to_owned());
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct FailingSink {
        writes: Arc<AtomicUsize>,
    }

    impl LogSink for FailingSink {
        fn set_directory(&mut self, _directory: &Path) -> io::Result<()> {
            Ok(())
        }

        fn write(&mut self, _serialized: &str) -> io::Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::other("disk gone"))
        }
    }

    #[derive(Clone, Default)]
    struct FailingOutput {
        renders: Arc<AtomicUsize>,
    }

    impl ClientOutput for FailingOutput {
        fn render(&mut self, _view: &DisplayView<'_>) -> io::Result<()> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away"))
        }
    }

    struct Fixture {
        dispatcher: Arc<FaultDispatcher>,
        sink: MemorySink,
        output: MemoryOutput,
        halts: Arc<AtomicUsize>,
    }

    fn fixture(options: Options, caller: Option<&'static str>) -> Fixture {
        let sink = MemorySink::default();
        let output = MemoryOutput::default();
        let halts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&halts);
        let dispatcher = FaultDispatcher::builder()
            .options(options)
            .log_destination("/var/log/app")
            .sink(sink.clone())
            .output(output.clone())
            .caller_source(move || caller.map(str::to_owned))
            .terminator(move |_code| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build();
        Fixture {
            dispatcher,
            sink,
            output,
            halts,
        }
    }

    fn warn(dispatcher: &FaultDispatcher) -> Result<Disposition, DispatchError> {
        dispatcher.handle_fault(
            FaultLevel::WARNING,
            "disk almost full",
            "src/disk.rs",
            12,
            ScopeVariables::new(),
        )
    }

    #[test]
    fn test_default_pipeline_writes_renders_and_halts() {
        let fixture = fixture(Options::new(), None);
        let disposition = warn(&fixture.dispatcher).unwrap();
        assert_eq!(
            disposition,
            Disposition::Halted {
                persisted: true,
                rendered: true
            }
        );
        assert_eq!(fixture.sink.directories.get(), [PathBuf::from("/var/log/app")]);
        assert_eq!(fixture.output.0.get(), ["disk almost full"]);
        assert_eq!(fixture.halts.load(Ordering::SeqCst), 1);

        let record: serde_json::Value = serde_json::from_str(&fixture.sink.lines.get()[0]).unwrap();
        assert_eq!(record["severity"], "WARNING");
        assert_eq!(record["raw_level"], "2");
        assert_eq!(record["line"], "12");
    }

    #[test]
    fn test_neither_write_nor_display_discards() {
        let fixture = fixture(Options::new().write(false).display(false), None);
        assert_eq!(warn(&fixture.dispatcher).unwrap(), Disposition::Discarded);
        assert!(fixture.sink.lines.get().is_empty());
        assert_eq!(fixture.halts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_display_only() {
        let fixture = fixture(Options::new().write(false), None);
        assert_eq!(
            warn(&fixture.dispatcher).unwrap(),
            Disposition::Halted {
                persisted: false,
                rendered: true
            }
        );
        assert!(fixture.sink.lines.get().is_empty());
    }

    #[test]
    fn test_exit_code_reaches_terminator() {
        let codes = Shared::<Vec<i32>>::default();
        let recorded = codes.clone();
        let dispatcher = FaultDispatcher::builder()
            .options(Options::new().write(false).exit_code(70))
            .output(MemoryOutput::default())
            .caller_source(|| None)
            .terminator(move |code| recorded.push(code))
            .build();
        warn(&dispatcher).unwrap();
        assert_eq!(codes.get(), [70]);
    }

    #[test]
    fn test_exception_uses_own_trace_and_code() {
        let fixture = fixture(Options::new().display(false), None);
        let thrown = Thrown::new("connection refused")
            .with_code(111)
            .with_trace(vec![StackFrame::new("connect").at("src/db.rs", 40)]);
        fixture.dispatcher.handle_exception(&thrown).unwrap();

        let record: serde_json::Value = serde_json::from_str(&fixture.sink.lines.get()[0]).unwrap();
        assert_eq!(record["severity"], "EXCEPTION");
        assert_eq!(record["raw_level"], "111");
        assert_eq!(record["backtrace"][0]["function"], "connect");
        assert_eq!(record["scope_variables"], serde_json::json!({}));
    }

    #[test]
    fn test_collector_fills_missing_backtrace() {
        let sink = MemorySink::default();
        let dispatcher = FaultDispatcher::builder()
            .options(Options::new().display(false).included_fields([RecordField::Backtrace]))
            .log_destination("/logs")
            .sink(sink.clone())
            .caller_source(|| None)
            .frame_collector(|| {
                vec![StackFrame::new("collected").with_args(vec![ScopeValue::Integer(1)])]
            })
            .terminator(|_code| {})
            .build();
        warn(&dispatcher).unwrap();
        assert_eq!(sink.lines.get(), [r#"{"backtrace":[{"function":"collected"}]}"#]);
    }

    #[test]
    fn test_configure_merges() {
        let fixture = fixture(Options::new(), None);
        fixture.dispatcher.configure(Options::new().write(false));
        fixture.dispatcher.configure(Options::new().exit_code(3));
        let config = fixture.dispatcher.config();
        assert!(!config.write);
        assert!(config.display);
        assert_eq!(config.exit_code, 3);
    }

    #[test]
    fn test_reentrant_pass_fails() {
        let _outer = PassGuard::enter().unwrap();
        let fixture = fixture(Options::new(), None);
        assert!(matches!(warn(&fixture.dispatcher), Err(DispatchError::Reentrant)));
        assert!(fixture.sink.lines.get().is_empty());
    }

    #[test]
    fn test_sink_failure_stops_the_pass() {
        let sink = FailingSink::default();
        let output = MemoryOutput::default();
        let halts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&halts);
        let dispatcher = FaultDispatcher::builder()
            .log_destination("/var/log/app")
            .sink(sink.clone())
            .output(output.clone())
            .caller_source(|| None)
            .terminator(move |_code| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        let error = warn(&dispatcher).unwrap_err();
        assert!(matches!(&error, DispatchError::Sink(source) if source.to_string() == "disk gone"));
        assert_eq!(sink.writes.load(Ordering::SeqCst), 1);
        assert!(output.0.get().is_empty());
        assert_eq!(halts.load(Ordering::SeqCst), 0);

        dispatcher.configure(Options::new().display(false));
        assert!(matches!(warn(&dispatcher), Err(DispatchError::Sink(_))));
        assert_eq!(sink.writes.load(Ordering::SeqCst), 2);
        assert_eq!(halts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_output_failure_skips_halt() {
        let sink = MemorySink::default();
        let output = FailingOutput::default();
        let halts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&halts);
        let dispatcher = FaultDispatcher::builder()
            .log_destination("/var/log/app")
            .sink(sink.clone())
            .output(output.clone())
            .caller_source(|| None)
            .terminator(move |_code| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        let Err(DispatchError::Output(source)) = warn(&dispatcher) else {
            panic!("expected an output failure");
        };
        assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(sink.lines.get().len(), 1);
        assert_eq!(output.renders.load(Ordering::SeqCst), 1);
        assert_eq!(halts.load(Ordering::SeqCst), 0);
    }

    fn no_halt(code: i32) {
        panic!("unexpected halt with exit code {code}");
    }

    #[test]
    fn test_missing_destination_fails_before_output() {
        let output = MemoryOutput::default();
        let dispatcher = FaultDispatcher::builder()
            .sink(MemorySink::default())
            .output(output.clone())
            .caller_source(|| None)
            .terminator(no_halt)
            .build();

        assert!(matches!(
            warn(&dispatcher),
            Err(DispatchError::MissingLogDestination)
        ));
        assert!(output.0.get().is_empty());
    }

    #[test]
    fn test_log_dir_variable_sets_destination() {
        let fixture = fixture(Options::new(), None);
        fixture
            .dispatcher
            .configure_from_lookup(|name| match name {
                "FAULTLINE" => Some("no_display".to_owned()),
                "FAULTLINE_LOG_DIR" => Some(" /srv/faults ".to_owned()),
                _ => None,
            })
            .unwrap();

        assert_eq!(
            fixture.dispatcher.log_destination(),
            Some(PathBuf::from("/srv/faults"))
        );
        assert!(!fixture.dispatcher.config().display);

        warn(&fixture.dispatcher).unwrap();
        assert_eq!(
            fixture.sink.directories.get(),
            [PathBuf::from("/srv/faults")]
        );
    }

    #[test]
    fn test_blank_log_dir_variable_is_ignored() {
        let fixture = fixture(Options::new(), None);
        fixture
            .dispatcher
            .configure_from_lookup(|name| {
                (name == "FAULTLINE_LOG_DIR").then(|| "  ".to_owned())
            })
            .unwrap();
        assert_eq!(
            fixture.dispatcher.log_destination(),
            Some(PathBuf::from("/var/log/app"))
        );
    }

    #[test]
    fn test_invalid_environment_leaves_config_untouched() {
        let fixture = fixture(Options::new(), None);
        let result = fixture
            .dispatcher
            .configure_from_lookup(|name| (name == "FAULTLINE").then(|| "loud".to_owned()));
        assert!(matches!(result, Err(ConfigError::UnknownFlag(_))));
        assert!(fixture.dispatcher.config().display);
    }

    #[test]
    fn test_halted_helper() {
        assert!(
            Disposition::Halted {
                persisted: false,
                rendered: false
            }
            .halted()
        );
        assert!(!Disposition::Continued { persisted: true }.halted());
        assert!(!Disposition::Ignored.halted());
    }
}
