//! Session controller: owns the lifecycle of capture, segmentation,
//! dispatch, and the transcript store.

use crate::audio::source::FrameSource;
use crate::defaults;
use crate::error::{MeetscribeError, Result};
use crate::pipeline::commit::Committer;
use crate::pipeline::dispatcher::{DispatcherConfig, spawn_workers};
use crate::pipeline::queue::{Enqueue, UtteranceSender, utterance_queue};
use crate::segment::{SegmenterConfig, SilenceSegmenter};
use crate::session::report::{LogReporter, SessionReporter, Subsystem};
use crate::session::state::{SessionState, StateCell};
use crate::speaker::SpeakerPolicy;
use crate::stt::service::TranscriptionService;
use crate::transcript::entry::TranscriptEntry;
use crate::transcript::store::TranscriptStore;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Options supplied at session start.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub meeting_title: String,
    pub participants: Vec<String>,
    /// Attribution policy for the whole session.
    pub policy: SpeakerPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            meeting_title: defaults::DEFAULT_MEETING_TITLE.to_string(),
            participants: Vec::new(),
            policy: SpeakerPolicy::SingleSpeaker,
        }
    }
}

/// Pipeline-level configuration for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub segmenter: SegmenterConfig,
    pub dispatcher: DispatcherConfig,
    pub queue_capacity: usize,
    /// How long `force_stop` waits for threads before detaching them.
    pub force_stop_deadline: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            segmenter: SegmenterConfig::default(),
            dispatcher: DispatcherConfig::default(),
            queue_capacity: defaults::QUEUE_CAPACITY,
            force_stop_deadline: Duration::from_millis(defaults::FORCE_STOP_DEADLINE_MS),
        }
    }
}

impl SessionConfig {
    /// Builds a session configuration from the loaded config file.
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            segmenter: config.segmenter(),
            dispatcher: config.dispatcher(),
            queue_capacity: config.dispatch.queue_capacity,
            force_stop_deadline: Duration::from_millis(defaults::FORCE_STOP_DEADLINE_MS),
        }
    }
}

/// Orchestrates one recording session.
///
/// `Stopped` is terminal: a new session requires a fresh controller.
pub struct SessionController {
    config: SessionConfig,
    options: SessionOptions,
    state: Arc<StateCell>,
    store: Arc<TranscriptStore>,
    /// Force-stop flag: discard in-flight work and unblock everything.
    cancel: Arc<AtomicBool>,
    /// Drain flag: the capture loop stops pulling frames and flushes.
    capture_stop: Arc<AtomicBool>,
    fatal: Arc<Mutex<Option<MeetscribeError>>>,
    reporter: Arc<dyn SessionReporter>,
    source: Option<Box<dyn FrameSource>>,
    service: Arc<dyn TranscriptionService>,
    threads: Vec<JoinHandle<()>>,
}

impl SessionController {
    /// Creates an idle session around a frame source and a transcription
    /// service.
    pub fn new(
        config: SessionConfig,
        options: SessionOptions,
        source: Box<dyn FrameSource>,
        service: Arc<dyn TranscriptionService>,
    ) -> Self {
        let store = Arc::new(TranscriptStore::new(options.policy));
        Self {
            config,
            options,
            state: Arc::new(StateCell::new()),
            store,
            cancel: Arc::new(AtomicBool::new(false)),
            capture_stop: Arc::new(AtomicBool::new(false)),
            fatal: Arc::new(Mutex::new(None)),
            reporter: Arc::new(LogReporter),
            source: Some(source),
            service,
            threads: Vec::new(),
        }
    }

    /// Sets a custom incident reporter. Only meaningful before `start`.
    pub fn with_reporter(mut self, reporter: Arc<dyn SessionReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Registers a channel notified on every transcript append.
    /// Only meaningful before `start`.
    pub fn with_entry_sender(mut self, tx: Sender<TranscriptEntry>) -> Self {
        self.store = Arc::new(TranscriptStore::new(self.options.policy).with_entry_sender(tx));
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state.current()
    }

    /// The session's transcript store, readable at any time.
    pub fn transcript(&self) -> Arc<TranscriptStore> {
        self.store.clone()
    }

    /// Options this session was opened with.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Transitions `Idle → Recording` and spawns the pipeline threads.
    pub fn start(&mut self) -> Result<()> {
        self.state.transition(SessionState::Recording)?;

        let mut source = self.source.take().ok_or(MeetscribeError::AlreadyStarted)?;
        if let Err(e) = source.start() {
            self.reporter.fatal(Subsystem::Capture, &e);
            self.state.force_stop();
            return Err(e);
        }

        let (sender, receiver) = utterance_queue(self.config.queue_capacity, self.cancel.clone());

        let committer = Arc::new(Committer::new(self.store.clone()));
        self.threads.extend(spawn_workers(
            &self.config.dispatcher,
            receiver,
            self.service.clone(),
            committer,
            self.cancel.clone(),
            self.reporter.clone(),
        ));

        let segmenter = SilenceSegmenter::new(self.config.segmenter);
        let capture = CaptureStage {
            source,
            segmenter,
            sender,
            capture_stop: self.capture_stop.clone(),
            cancel: self.cancel.clone(),
            fatal: self.fatal.clone(),
            state: self.state.clone(),
            store: self.store.clone(),
            reporter: self.reporter.clone(),
        };
        self.threads.push(thread::spawn(move || capture.run()));

        Ok(())
    }

    /// Cooperative stop: drain the queue, let in-flight calls finish, then
    /// transition to `Stopped`. Surfaces a recorded fatal capture error.
    pub fn stop(&mut self) -> Result<()> {
        match self.state.current() {
            SessionState::Recording => {
                self.state.transition(SessionState::Draining)?;
            }
            SessionState::Idle => {
                self.state.transition(SessionState::Stopped)?;
                return Ok(());
            }
            // Already draining or stopped (capture failure, force stop,
            // concurrent stop): fall through to join and report.
            SessionState::Draining | SessionState::Stopped => {}
        }

        self.capture_stop.store(true, Ordering::SeqCst);
        self.join_all();

        if self.state.current() != SessionState::Stopped {
            self.state.transition(SessionState::Stopped)?;
        }
        self.take_fatal()
    }

    /// Immediate stop with a bounded deadline: in-flight utterances are
    /// discarded, late transcription results are rejected by the closed
    /// store, and threads still running at the deadline are detached.
    /// Returns the state the session was in.
    pub fn force_stop(&mut self) -> SessionState {
        self.cancel.store(true, Ordering::SeqCst);
        self.capture_stop.store(true, Ordering::SeqCst);
        self.store.close();
        let previous = self.state.force_stop();

        let deadline = Instant::now() + self.config.force_stop_deadline;
        loop {
            let mut remaining = Vec::new();
            for handle in self.threads.drain(..) {
                if handle.is_finished() {
                    join_and_log(handle);
                } else {
                    remaining.push(handle);
                }
            }
            self.threads = remaining;

            if self.threads.is_empty() {
                break;
            }
            if Instant::now() >= deadline {
                // Dropping JoinHandles detaches threads; they die with the
                // process.
                self.threads.clear();
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        previous
    }

    fn join_all(&mut self) {
        for handle in self.threads.drain(..) {
            join_and_log(handle);
        }
    }

    fn take_fatal(&self) -> Result<()> {
        match self.fatal.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn join_and_log(handle: JoinHandle<()>) {
    if let Err(panic_info) = handle.join() {
        let msg = panic_info
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("unknown panic");
        eprintln!("meetscribe: pipeline thread panicked: {msg}");
    }
}

/// The capture + segmentation stage, run as one sequential thread so frame
/// order is preserved end to end.
struct CaptureStage {
    source: Box<dyn FrameSource>,
    segmenter: SilenceSegmenter,
    sender: UtteranceSender,
    capture_stop: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    fatal: Arc<Mutex<Option<MeetscribeError>>>,
    state: Arc<StateCell>,
    store: Arc<TranscriptStore>,
    reporter: Arc<dyn SessionReporter>,
}

impl CaptureStage {
    fn run(mut self) {
        let idle_poll = Duration::from_millis(5);

        loop {
            if self.capture_stop.load(Ordering::SeqCst) || self.cancel.load(Ordering::SeqCst) {
                break;
            }

            match self.source.next_frame() {
                Ok(Some(frame)) => {
                    if let Some(utterance) = self.segmenter.push(frame)
                        && self.sender.enqueue(utterance) != Enqueue::Accepted
                    {
                        break;
                    }
                }
                Ok(None) => {
                    if self.source.is_finite() {
                        // Script/file exhausted: flush below and drain.
                        break;
                    }
                    thread::sleep(idle_poll);
                }
                Err(error) => {
                    // A capture gap cannot be repaired; abort the session.
                    self.reporter.fatal(Subsystem::Capture, &error);
                    *self.fatal.lock() = Some(error);
                    self.cancel.store(true, Ordering::SeqCst);
                    self.store.close();
                    self.state.force_stop();
                    let _ = self.source.stop();
                    return;
                }
            }
        }

        if !self.cancel.load(Ordering::SeqCst)
            && let Some(utterance) = self.segmenter.flush()
        {
            let _ = self.sender.enqueue(utterance);
        }

        if let Err(e) = self.source.stop() {
            self.reporter
                .incident(Subsystem::Capture, &format!("failed to stop capture: {e}"));
        }
        // Dropping the sender closes the queue; workers drain and exit.
    }
}
