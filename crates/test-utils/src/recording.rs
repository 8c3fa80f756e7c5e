use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use stepdag::dag::{Operation, Stages, StepData};
use stepdag::exec::replace_extension;

/// One call to a recorded operation.
///
/// `started` / `finished` are ticks of a clock shared by every operation
/// of the same [`Recorder`], so they order calls across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub label: String,
    pub data: StepData,
    pub thread: Option<String>,
    pub started: usize,
    pub finished: usize,
}

/// Shared log of operation calls.
#[derive(Debug, Default)]
pub struct Recorder {
    clock: AtomicUsize,
    log: Mutex<Vec<Invocation>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// An operation that records itself under `"{tag}:{name}"`.
    pub fn operation(self: &Arc<Self>, tag: &str) -> Arc<dyn Operation> {
        Arc::new(RecordingOperation {
            tag: tag.to_string(),
            recorder: Arc::clone(self),
            delay: None,
            panic_on: None,
        })
    }

    /// Like [`operation`](Self::operation), but sleeps `delay` inside
    /// every call to widen race windows.
    pub fn slow_operation(self: &Arc<Self>, tag: &str, delay: Duration) -> Arc<dyn Operation> {
        Arc::new(RecordingOperation {
            tag: tag.to_string(),
            recorder: Arc::clone(self),
            delay: Some(delay),
            panic_on: None,
        })
    }

    /// Records like [`operation`](Self::operation), then panics when the
    /// step's name equals `name`.
    pub fn panicking_operation(self: &Arc<Self>, tag: &str, name: &str) -> Arc<dyn Operation> {
        Arc::new(RecordingOperation {
            tag: tag.to_string(),
            recorder: Arc::clone(self),
            delay: None,
            panic_on: Some(name.to_string()),
        })
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.log.lock().unwrap().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.invocations().into_iter().map(|i| i.label).collect()
    }

    pub fn find(&self, label: &str) -> Option<Invocation> {
        self.invocations().into_iter().find(|i| i.label == label)
    }

    /// How many times each label was invoked.
    pub fn counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for inv in self.invocations() {
            *counts.entry(inv.label).or_insert(0) += 1;
        }
        counts
    }

    fn tick(&self) -> usize {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }
}

struct RecordingOperation {
    tag: String,
    recorder: Arc<Recorder>,
    delay: Option<Duration>,
    panic_on: Option<String>,
}

impl Operation for RecordingOperation {
    fn execute(&self, data: &StepData) {
        let started = self.recorder.tick();
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        let finished = self.recorder.tick();

        self.recorder.log.lock().unwrap().push(Invocation {
            label: format!("{}:{}", self.tag, data.name),
            data: data.clone(),
            thread: thread::current().name().map(str::to_string),
            started,
            finished,
        });

        if self.panic_on.as_deref() == Some(data.name.as_str()) {
            panic!("recorded operation asked to panic on '{}'", data.name);
        }
    }
}

/// Pipeline stages that record into `recorder` with tags `"intermediate"`
/// and `"output"`, renaming items to `.caf` for the second stage.
pub fn recording_stages(recorder: &Arc<Recorder>) -> Stages {
    Stages::new(
        recorder.operation("intermediate"),
        recorder.operation("output"),
        Arc::new(|name: &str| replace_extension(name, "caf")),
    )
}

/// [`recording_stages`] with a per-call sleep.
pub fn slow_recording_stages(recorder: &Arc<Recorder>, delay: Duration) -> Stages {
    Stages::new(
        recorder.slow_operation("intermediate", delay),
        recorder.slow_operation("output", delay),
        Arc::new(|name: &str| replace_extension(name, "caf")),
    )
}
