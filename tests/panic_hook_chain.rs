use std::{
    io, panic,
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use faultline::{FaultDispatcher, LogSink, Options, reporting};

static PREVIOUS_HOOK_CALLS: AtomicUsize = AtomicUsize::new(0);

#[derive(Clone, Default)]
struct FlakySink {
    failing: Arc<AtomicBool>,
    lines: Arc<Mutex<Vec<String>>>,
}

impl LogSink for FlakySink {
    fn set_directory(&mut self, _directory: &Path) -> io::Result<()> {
        Ok(())
    }

    fn write(&mut self, serialized: &str) -> io::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(io::Error::other("disk gone"));
        }
        self.lines.lock().unwrap().push(serialized.to_owned());
        Ok(())
    }
}

fn checkout(items: &[u32]) -> u32 {
    if items.is_empty() {
        panic!("empty cart");
    }
    items.iter().sum()
}

// The panic hook is process-wide, so this binary holds a single test.
#[test]
fn previous_hook_runs_when_the_pass_does_not_halt() {
    panic::set_hook(Box::new(|_info| {
        PREVIOUS_HOOK_CALLS.fetch_add(1, Ordering::SeqCst);
    }));

    let sink = FlakySink::default();
    let halts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&halts);
    let dispatcher = FaultDispatcher::builder()
        .options(Options::new().allowed_caller_addresses(["127.0.0.1"]))
        .log_destination("/unused")
        .sink(sink.clone())
        .caller_source(|| Some("203.0.113.9".to_owned()))
        .terminator(move |_code| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build();
    dispatcher.initialize().unwrap();

    // Display refused for the caller: the record is written, nothing halts.
    assert!(panic::catch_unwind(|| checkout(&[])).is_err());
    assert_eq!(sink.lines.lock().unwrap().len(), 1);
    assert_eq!(PREVIOUS_HOOK_CALLS.load(Ordering::SeqCst), 1);

    // The sink fails: the error is logged and the previous hook still runs.
    sink.failing.store(true, Ordering::SeqCst);
    assert!(panic::catch_unwind(|| checkout(&[])).is_err());
    assert_eq!(sink.lines.lock().unwrap().len(), 1);
    assert_eq!(PREVIOUS_HOOK_CALLS.load(Ordering::SeqCst), 2);
    sink.failing.store(false, Ordering::SeqCst);

    // Silenced thread: nothing is written, the previous hook runs.
    reporting::silenced(|| assert!(panic::catch_unwind(|| checkout(&[])).is_err()));
    assert_eq!(sink.lines.lock().unwrap().len(), 1);
    assert_eq!(PREVIOUS_HOOK_CALLS.load(Ordering::SeqCst), 3);

    // Write-only: the pass halts and the previous hook is skipped.
    dispatcher.configure(Options::new().display(false));
    assert!(panic::catch_unwind(|| checkout(&[])).is_err());
    assert_eq!(sink.lines.lock().unwrap().len(), 2);
    assert_eq!(halts.load(Ordering::SeqCst), 1);
    assert_eq!(PREVIOUS_HOOK_CALLS.load(Ordering::SeqCst), 3);
}
