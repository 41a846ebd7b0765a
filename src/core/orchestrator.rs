//! Single-flight execution of mutating package operations.
//!
//! [`MutationOrchestrator`] runs at most one install/update/uninstall at a time
//! against its environment. Each accepted submission becomes a job running on
//! a worker thread; callers follow it through a [`JobHandle`], which delivers
//! every output line as it is produced and exactly one terminal outcome.
//!
//! # Job Lifecycle
//! `Pending -> Running -> Succeeded | Failed`, announced by the `Queued`,
//! `Started` and `Finished` events. The orchestrator accepts a new submission
//! as soon as the previous job reaches a terminal state, before the terminal
//! event is delivered.
//!
//! # Outcomes
//! - exit status 0 resolves to `Succeeded`
//! - any other status, a launch error, a timeout or a cancellation resolves to
//!   `Failed` with a human-readable reason; the process and its process group
//!   are killed in the last two cases

use crate::core::error::{PipPilotError, Result};
use crate::core::package::MutationKind;
use crate::core::pip::PackageManager;
use crate::core::process::{for_each_line, isolate, program_name, terminate, POLL_INTERVAL};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::io::Read;
use std::process::{Child, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_MUTATION_TIMEOUT: Duration = Duration::from_secs(60);

/// How long output is still collected once the process has exited.
const EXIT_GRACE: Duration = Duration::from_millis(250);

pub const REASON_TIMEOUT: &str = "timeout";
pub const REASON_CANCELLED: &str = "cancelled";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed(String),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationJob {
    pub target: String,
    pub kind: MutationKind,
    pub state: JobState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed { reason: String },
}

impl JobOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        JobOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded)
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            JobOutcome::Succeeded => Ok(()),
            JobOutcome::Failed { reason } => Err(PipPilotError::mutation_failed(reason)),
        }
    }

    fn as_state(&self) -> JobState {
        match self {
            JobOutcome::Succeeded => JobState::Succeeded,
            JobOutcome::Failed { reason } => JobState::Failed(reason.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// The job was accepted and is `Pending`
    Queued,
    /// The job is `Running`
    Started,
    Line(String),
    Finished(JobOutcome),
}

/// Requests cancellation of a running job. Cheap to clone and send.
#[derive(Debug, Clone)]
pub struct Canceller {
    flag: Arc<AtomicBool>,
}

impl Canceller {
    fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct JobHandle {
    job: Arc<Mutex<MutationJob>>,
    events: Receiver<JobEvent>,
    canceller: Canceller,
}

impl JobHandle {
    /// Snapshot of the job as it is now
    pub fn job(&self) -> MutationJob {
        lock(&self.job).clone()
    }

    pub fn state(&self) -> JobState {
        lock(&self.job).state.clone()
    }

    pub fn events(&self) -> &Receiver<JobEvent> {
        &self.events
    }

    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    pub fn wait(self) -> JobOutcome {
        self.wait_with(|_| {})
    }

    /// Block until the job finishes, forwarding each output line as it arrives.
    pub fn wait_with(self, mut on_line: impl FnMut(&str)) -> JobOutcome {
        for event in self.events.iter() {
            match event {
                JobEvent::Queued | JobEvent::Started => {}
                JobEvent::Line(line) => on_line(&line),
                JobEvent::Finished(outcome) => return outcome,
            }
        }
        // The worker always sends a terminal event unless it panicked.
        JobOutcome::failed("worker stopped unexpectedly")
    }
}

pub struct MutationOrchestrator<M: ?Sized> {
    manager: Arc<M>,
    timeout: Duration,
    in_flight: Arc<AtomicBool>,
    interrupt: Canceller,
}

impl<M: PackageManager + ?Sized + 'static> MutationOrchestrator<M> {
    pub fn new(manager: Arc<M>) -> Self {
        Self {
            manager,
            timeout: DEFAULT_MUTATION_TIMEOUT,
            in_flight: Arc::new(AtomicBool::new(false)),
            interrupt: Canceller::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cancels the running job and every job submitted afterwards. Meant for
    /// signal handlers, which must not block on the job.
    pub fn interrupter(&self) -> Canceller {
        self.interrupt.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Start `kind` on `package`, or fail with `Busy` if a job is still running.
    pub fn submit(&self, package: &str, kind: MutationKind) -> Result<JobHandle> {
        self.submit_with_timeout(package, kind, self.timeout)
    }

    fn submit_with_timeout(
        &self,
        package: &str,
        kind: MutationKind,
        timeout: Duration,
    ) -> Result<JobHandle> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("Rejecting {kind} of {package}: another job is running");
            return Err(PipPilotError::busy(package));
        }
        let flight = FlightGuard(Arc::clone(&self.in_flight));

        let job = Arc::new(Mutex::new(MutationJob {
            target: package.to_string(),
            kind,
            state: JobState::Pending,
        }));
        let canceller = Canceller::new();
        let (tx, rx) = crossbeam_channel::unbounded();
        if tx.send(JobEvent::Queued).is_err() {
            log::debug!("Job event dropped, handle is gone");
        }

        let worker = JobWorker {
            manager: Arc::clone(&self.manager),
            job: Arc::clone(&job),
            canceller: canceller.clone(),
            interrupt: self.interrupt.clone(),
            events: tx,
            timeout,
        };
        thread::Builder::new()
            .name(format!("pip-pilot-{kind}"))
            .spawn(move || worker.run(flight))?;

        Ok(JobHandle {
            job,
            events: rx,
            canceller,
        })
    }

    /// Run one job per package, one after another. A failed job does not stop
    /// the sequence. Once `deadline` is spent the remaining packages fail with
    /// `timeout` without being launched.
    pub fn run_sequence(
        &self,
        kind: MutationKind,
        packages: &[String],
        deadline: Option<Duration>,
        mut on_event: impl FnMut(&str, &JobEvent),
    ) -> Result<Vec<(String, JobOutcome)>> {
        let started = Instant::now();
        let mut outcomes = Vec::with_capacity(packages.len());

        for package in packages {
            let remaining = match deadline {
                Some(limit) => limit.saturating_sub(started.elapsed()),
                None => self.timeout,
            };
            let skipped = if self.interrupt.is_cancelled() {
                Some(REASON_CANCELLED)
            } else if remaining.is_zero() {
                Some(REASON_TIMEOUT)
            } else {
                None
            };
            if let Some(reason) = skipped {
                let outcome = JobOutcome::failed(reason);
                on_event(package, &JobEvent::Finished(outcome.clone()));
                outcomes.push((package.clone(), outcome));
                continue;
            }

            let handle = self.submit_with_timeout(package, kind, self.timeout.min(remaining))?;
            let mut outcome = None;
            for event in handle.events().iter() {
                on_event(package, &event);
                if let JobEvent::Finished(result) = event {
                    outcome = Some(result);
                    break;
                }
            }
            let outcome = outcome.unwrap_or_else(|| JobOutcome::failed("worker stopped unexpectedly"));
            outcomes.push((package.clone(), outcome));
        }

        Ok(outcomes)
    }
}

/// Clears the single-flight flag when dropped, including on worker panic.
struct FlightGuard(Arc<AtomicBool>);

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct JobWorker<M: ?Sized> {
    manager: Arc<M>,
    job: Arc<Mutex<MutationJob>>,
    canceller: Canceller,
    interrupt: Canceller,
    events: Sender<JobEvent>,
    timeout: Duration,
}

impl<M: PackageManager + ?Sized> JobWorker<M> {
    fn run(self, flight: FlightGuard) {
        let (target, kind) = {
            let mut job = lock(&self.job);
            job.state = JobState::Running;
            (job.target.clone(), job.kind)
        };
        log::info!("Starting {kind} of {target}");
        self.emit(JobEvent::Started);

        let outcome = self.execute(kind, &target);
        match &outcome {
            JobOutcome::Succeeded => log::info!("{kind} of {target} succeeded"),
            JobOutcome::Failed { reason } => log::warn!("{kind} of {target} failed: {reason}"),
        }

        lock(&self.job).state = outcome.as_state();
        drop(flight);
        self.emit(JobEvent::Finished(outcome));
    }

    fn execute(&self, kind: MutationKind, target: &str) -> JobOutcome {
        let mut command = self.manager.mutation_command(kind, target);
        let program = program_name(&command);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        isolate(&mut command);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => return JobOutcome::failed(format!("failed to launch {program}: {e}")),
        };

        let (line_tx, line_rx) = crossbeam_channel::unbounded();
        if let Some(stdout) = child.stdout.take() {
            spawn_reader(stdout, line_tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader(stderr, line_tx);
        }

        self.supervise(&mut child, &program, &line_rx)
    }

    /// Relay output until the child exits, the deadline passes or the job is
    /// cancelled.
    fn supervise(&self, child: &mut Child, program: &str, lines: &Receiver<String>) -> JobOutcome {
        let deadline = Instant::now() + self.timeout;
        let mut streams_open = true;

        loop {
            if self.canceller.is_cancelled() || self.interrupt.is_cancelled() {
                log::debug!("Cancelling {program} (pid {})", child.id());
                terminate(child, program);
                return JobOutcome::failed(REASON_CANCELLED);
            }
            let now = Instant::now();
            if now >= deadline {
                log::debug!("{program} (pid {}) exceeded {:?}", child.id(), self.timeout);
                terminate(child, program);
                return JobOutcome::failed(REASON_TIMEOUT);
            }
            let wait = POLL_INTERVAL.min(deadline - now);

            if streams_open {
                match lines.recv_timeout(wait) {
                    Ok(line) => {
                        self.emit(JobEvent::Line(line));
                        continue;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => streams_open = false,
                }
            } else {
                thread::sleep(wait);
            }

            match child.try_wait() {
                Ok(Some(status)) => {
                    self.drain(lines);
                    return outcome_for(status);
                }
                Ok(None) => {}
                Err(e) => {
                    terminate(child, program);
                    return JobOutcome::failed(format!("failed to wait for {program}: {e}"));
                }
            }
        }
    }

    /// Forward output still in flight after the process exited.
    fn drain(&self, lines: &Receiver<String>) {
        let grace = Instant::now() + EXIT_GRACE;
        while let Ok(line) = lines.recv_deadline(grace) {
            self.emit(JobEvent::Line(line));
        }
    }

    fn emit(&self, event: JobEvent) {
        if self.events.send(event).is_err() {
            log::debug!("Job event dropped, handle is gone");
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(stream: R, tx: Sender<String>) {
    thread::spawn(move || for_each_line(stream, |line| tx.send(line).is_ok()));
}

fn outcome_for(status: ExitStatus) -> JobOutcome {
    match status.code() {
        Some(0) => JobOutcome::Succeeded,
        Some(code) => JobOutcome::failed(format!("exit code {code}")),
        None => JobOutcome::failed(format!("terminated without exit code ({status})")),
    }
}

fn lock(job: &Mutex<MutationJob>) -> std::sync::MutexGuard<'_, MutationJob> {
    job.lock().unwrap_or_else(PoisonError::into_inner)
}
