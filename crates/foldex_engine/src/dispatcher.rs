/* 📖 # Why does one worker thread run every rebuild?

Rebuilds are cheap, and running them one after another removes any need to
coordinate two rebuilds of the same folder: whichever runs last reads the store
last and writes the final index. The Dispatcher is a plain state machine driven
by explicit `now` instants, which keeps the settle delay testable without
sleeping. DispatcherHandle puts it on a dedicated thread and feeds it through
an mpsc channel, waking up either for the next message or the next deadline.
*/

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use foldex_base::{EntryKind, FilePath, FoldexResult, PalHandle};

use crate::planner::{ChangeEvent, RebuildTarget, plan_rebuild};
use crate::settings::SettingsHandle;
use crate::updater::{IndexOutcome, TreeReport, update_index, update_index_tree};

/// Pause between a rename notification and the rebuilds it triggers.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct Scheduled {
    due: Instant,
    seq: u64,
    target: RebuildTarget,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

/// Turns change events into scheduled rebuilds and runs them when they are due.
#[derive(Debug)]
pub struct Dispatcher {
    pal: PalHandle,
    settings: SettingsHandle,
    settle_delay: Duration,
    queue: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
}

impl Dispatcher {
    pub fn new(pal: PalHandle, settings: SettingsHandle, settle_delay: Duration) -> Self {
        Self {
            pal,
            settings,
            settle_delay,
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Schedule the rebuilds `event` calls for, returning how many were queued.
    ///
    /// Renames whose new path or its parent do not resolve are discarded.
    pub fn submit(&mut self, event: ChangeEvent, now: Instant) -> usize {
        if let ChangeEvent::Renamed { from, to } = &event
            && !self.rename_target_resolves(to)
        {
            debug!(from = %from, to = %to, "discarding rename to unresolvable path");
            return 0;
        }
        let plan = plan_rebuild(&event, &self.settings.get());
        let due = if plan.settle {
            now + self.settle_delay
        } else {
            now
        };
        let queued = plan.targets.len();
        for target in plan.targets {
            debug!(?target, "scheduling rebuild");
            self.queue.push(Reverse(Scheduled {
                due,
                seq: self.next_seq,
                target,
            }));
            self.next_seq += 1;
        }
        queued
    }

    fn rename_target_resolves(&self, to: &FilePath) -> bool {
        let resolves = |path: &FilePath, folder_only: bool| match self.pal.entry_kind(path) {
            Ok(Some(kind)) => !folder_only || kind == EntryKind::Folder,
            Ok(None) => false,
            Err(e) => {
                debug!(path = %path, error = %e, "failed to resolve renamed path");
                false
            }
        };
        resolves(to, false) && to.parent().is_some_and(|parent| resolves(&parent, true))
    }

    /// Run every rebuild due at `now`, in scheduling order.
    ///
    /// Each rebuild reads the settings as they are when it runs.
    pub fn run_due(&mut self, now: Instant) -> Vec<IndexOutcome> {
        let mut outcomes = Vec::new();
        while self
            .queue
            .peek()
            .is_some_and(|Reverse(scheduled)| scheduled.due <= now)
        {
            if let Some(Reverse(scheduled)) = self.queue.pop() {
                self.execute(scheduled.target, &mut outcomes);
            }
        }
        outcomes
    }

    fn execute(&self, target: RebuildTarget, outcomes: &mut Vec<IndexOutcome>) {
        match target {
            RebuildTarget::Folder(folder) => {
                outcomes.push(update_index(&self.pal, &folder, &self.settings.get(), None));
            }
            RebuildTarget::Tree {
                root,
                previous_index_file_name,
            } => {
                let report = rebuild_tree(
                    &self.pal,
                    &self.settings,
                    &root,
                    previous_index_file_name.as_deref(),
                );
                outcomes.extend(report.outcomes);
            }
        }
    }

    /// When the earliest queued rebuild becomes due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.peek().map(|Reverse(scheduled)| scheduled.due)
    }

    /// Number of queued rebuilds.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// Rebuild the tree below `root` with the current settings.
///
/// Once every folder has been rebuilt, indexes named `previous_index_file_name` are gone
/// and the name is dropped from the persisted settings.
pub fn rebuild_tree(
    pal: &PalHandle,
    settings: &SettingsHandle,
    root: &FilePath,
    previous_index_file_name: Option<&str>,
) -> TreeReport {
    let report = update_index_tree(pal, root, &settings.get(), previous_index_file_name);
    if report.is_complete()
        && let Some(previous) = previous_index_file_name
        && let Err(e) = settings.clear_previous_index_file_name(previous)
    {
        warn!(error = %e, "failed to persist completed index rename");
    }
    report
}

/// Message accepted by the dispatcher thread.
#[derive(Debug)]
pub enum DispatchMessage {
    Event(ChangeEvent),
    Shutdown,
}

/// Owns the dispatcher thread. Dropping the handle stops the thread after the rebuilds
/// that are already due.
#[derive(Debug)]
pub struct DispatcherHandle {
    sender: Sender<DispatchMessage>,
    worker: Option<JoinHandle<()>>,
}

impl DispatcherHandle {
    pub fn spawn(dispatcher: Dispatcher) -> FoldexResult<Self> {
        let (sender, receiver) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("foldex-dispatcher".to_string())
            .spawn(move || run_dispatcher(dispatcher, receiver))
            .map_err(|e| foldex_base::err!("Failed to spawn dispatcher thread: {}", e))?;
        Ok(Self {
            sender,
            worker: Some(worker),
        })
    }

    /// Queue an event. Returns false once the dispatcher thread has stopped.
    pub fn submit(&self, event: impl Into<ChangeEvent>) -> bool {
        self.sender
            .send(DispatchMessage::Event(event.into()))
            .is_ok()
    }

    /// A sender for feeding events from other threads, such as a store watch callback.
    pub fn sender(&self) -> Sender<DispatchMessage> {
        self.sender.clone()
    }

    /// Stop the dispatcher thread and wait for it to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = self.sender.send(DispatchMessage::Shutdown);
        if worker.join().is_err() {
            warn!("dispatcher thread panicked");
        }
    }
}

impl Drop for DispatcherHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_dispatcher(mut dispatcher: Dispatcher, receiver: Receiver<DispatchMessage>) {
    info!("dispatcher started");
    loop {
        dispatcher.run_due(Instant::now());
        let message = match dispatcher.next_deadline() {
            Some(deadline) => {
                match receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                    Ok(message) => message,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match receiver.recv() {
                Ok(message) => message,
                Err(_) => break,
            },
        };
        match message {
            DispatchMessage::Event(event) => {
                dispatcher.submit(event, Instant::now());
            }
            DispatchMessage::Shutdown => break,
        }
    }
    dispatcher.run_due(Instant::now());
    info!(dropped = dispatcher.pending(), "dispatcher stopped");
}
