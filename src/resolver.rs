use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use thiserror::Error;
use url::Url;

use crate::candidates;
use crate::catalog::{GiftEntry, MediaKind};
use crate::probe::Probe;

pub const DEFAULT_OVERALL_TIMEOUT: Duration = Duration::from_secs(12);
pub const DEFAULT_SEARCH_URL_BASE: &str = "https://duckduckgo.com/?q=";

fn resolver_debug_enabled() -> bool {
    static FLAG: OnceCell<bool> = OnceCell::new();
    *FLAG.get_or_init(|| {
        std::env::var("GIFTWRAP_DEBUG_RESOLVER")
            .map(|val| {
                let trimmed = val.trim();
                !(trimmed.is_empty()
                    || trimmed.eq_ignore_ascii_case("0")
                    || trimmed.eq_ignore_ascii_case("false")
                    || trimmed.eq_ignore_ascii_case("no")
                    || trimmed.eq_ignore_ascii_case("off"))
            })
            .unwrap_or(false)
    })
}

fn resolver_debug_writer() -> Option<&'static Mutex<std::fs::File>> {
    static WRITER: OnceCell<Option<Mutex<std::fs::File>>> = OnceCell::new();
    WRITER
        .get_or_init(|| {
            std::env::var("GIFTWRAP_DEBUG_LOG").ok().and_then(|path| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map(Mutex::new)
                    .ok()
            })
        })
        .as_ref()
}

pub fn debug_log(message: impl AsRef<str>) {
    if !resolver_debug_enabled() {
        return;
    }
    if let Some(writer) = resolver_debug_writer() {
        let mut file = writer.lock();
        let _ = writeln!(file, "{}", message.as_ref());
        return;
    }
    eprintln!("{}", message.as_ref());
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("candidate {candidate:?} is not playable")]
    CandidateProbeFailed { candidate: String },
    #[error("all {attempted} candidate(s) failed to resolve")]
    AllCandidatesExhausted { attempted: usize },
    #[error("could not reach {reference:?} to open it externally")]
    ExternalFetchFailed { reference: String },
}

#[derive(Debug)]
pub enum ResolverEvent {
    CandidateFailed {
        request_id: u64,
        index: usize,
        candidate: String,
    },
    Resolved {
        request_id: u64,
        index: usize,
        candidate: String,
    },
    Exhausted {
        request_id: u64,
        attempted: usize,
    },
}

impl ResolverEvent {
    pub fn request_id(&self) -> u64 {
        match self {
            ResolverEvent::CandidateFailed { request_id, .. }
            | ResolverEvent::Resolved { request_id, .. }
            | ResolverEvent::Exhausted { request_id, .. } => *request_id,
        }
    }
}

/// One queued probe pass over a candidate list, starting at `start_index`.
pub struct ResolveRequest {
    pub request_id: u64,
    pub candidates: Vec<String>,
    pub start_index: usize,
    pub cancel_flag: Arc<AtomicBool>,
    pub events: Sender<ResolverEvent>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { workers: 1 }
    }
}

struct Inner {
    probe: Arc<dyn Probe>,
    jobs: Sender<ResolveRequest>,
    stop: Sender<()>,
}

/// Background probe runner. Owns worker threads for the lifetime of the app;
/// per-gift resolution state lives with the modal, not here.
pub struct Manager {
    inner: Arc<Inner>,
    handles: Vec<thread::JoinHandle<()>>,
}

#[derive(Clone)]
pub struct Handle {
    jobs: Sender<ResolveRequest>,
}

impl Handle {
    pub fn enqueue(&self, request: ResolveRequest) {
        let _ = self.jobs.send(request);
    }
}

impl Manager {
    pub fn new(probe: Arc<dyn Probe>, cfg: Config) -> Self {
        let workers = cfg.workers.max(1);
        let (job_tx, job_rx) = unbounded();
        let (stop_tx, stop_rx) = unbounded();

        let inner = Arc::new(Inner {
            probe,
            jobs: job_tx,
            stop: stop_tx,
        });

        let mut handles = Vec::new();
        for _ in 0..workers {
            let rx_jobs = job_rx.clone();
            let rx_stop = stop_rx.clone();
            let worker_inner = inner.clone();
            handles.push(thread::spawn(move || worker_inner.worker(rx_jobs, rx_stop)));
        }

        Self { inner, handles }
    }

    pub fn handle(&self) -> Handle {
        Handle {
            jobs: self.inner.jobs.clone(),
        }
    }

    fn shutdown(&mut self) {
        for _ in &self.handles {
            let _ = self.inner.stop.send(());
        }
        while let Some(handle) = self.handles.pop() {
            let _ = handle.join();
        }
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Inner {
    fn worker(&self, jobs: Receiver<ResolveRequest>, stop: Receiver<()>) {
        loop {
            crossbeam_channel::select! {
                recv(stop) -> _ => break,
                recv(jobs) -> msg => {
                    match msg {
                        Ok(request) => run_probe_sequence(self.probe.as_ref(), request),
                        Err(_) => break,
                    }
                }
            }
        }
    }
}

/// Probes candidates strictly in order. Stops at the first success; stays
/// silent once the cancel flag is raised so late results cannot leak into a
/// newer selection.
pub(crate) fn run_probe_sequence(probe: &dyn Probe, request: ResolveRequest) {
    let ResolveRequest {
        request_id,
        candidates,
        start_index,
        cancel_flag,
        events,
    } = request;

    for (index, candidate) in candidates.iter().enumerate().skip(start_index) {
        if cancel_flag.load(Ordering::SeqCst) {
            debug_log(format!("request {request_id} cancelled before candidate {index}"));
            return;
        }
        debug_log(format!("request {request_id} probing [{index}] {candidate}"));
        let playable = probe.is_playable(candidate);
        if cancel_flag.load(Ordering::SeqCst) {
            debug_log(format!("request {request_id} cancelled, dropping result for {candidate}"));
            return;
        }
        if playable {
            let _ = events.send(ResolverEvent::Resolved {
                request_id,
                index,
                candidate: candidate.clone(),
            });
            return;
        }
        let _ = events.send(ResolverEvent::CandidateFailed {
            request_id,
            index,
            candidate: candidate.clone(),
        });
    }

    if !cancel_flag.load(Ordering::SeqCst) {
        let _ = events.send(ResolverEvent::Exhausted {
            request_id,
            attempted: candidates.len().saturating_sub(start_index),
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Probing,
    Resolved,
    Exhausted,
}

/// Per-gift resolution state. Created when the reveal modal opens, discarded
/// when it closes or the selection changes; nothing here outlives the modal.
pub struct Resolution {
    pub gift: GiftEntry,
    pub candidates: Vec<String>,
    pub active_index: usize,
    pub current_src: Option<String>,
    pub failed: bool,
    pub loading: bool,
    pub phase: Phase,
    pub last_error: Option<ResolveError>,
    request_id: u64,
    cancel_flag: Arc<AtomicBool>,
    started_at: Instant,
}

impl Resolution {
    pub fn new(gift: GiftEntry, origin: Option<&Url>, request_id: u64) -> Self {
        let candidates = candidates::generate(&gift.media, origin);
        Self {
            gift,
            candidates,
            active_index: 0,
            current_src: None,
            failed: false,
            loading: false,
            phase: Phase::Idle,
            last_error: None,
            request_id,
            cancel_flag: Arc::new(AtomicBool::new(false)),
            started_at: Instant::now(),
        }
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Only direct video is probed; images and embeds are used as-is and any
    /// render-time failure falls back to the poster declaratively.
    pub fn needs_probe(&self) -> bool {
        self.gift.kind == MediaKind::Video && !self.candidates.is_empty()
    }

    /// Moves into `Probing` and hands back the request to enqueue, or
    /// resolves immediately for kinds that are never probed.
    pub fn start(&mut self, events: Sender<ResolverEvent>) -> Option<ResolveRequest> {
        if !self.needs_probe() {
            let src = self
                .candidates
                .first()
                .cloned()
                .unwrap_or_else(|| self.gift.media.clone());
            self.phase = Phase::Resolved;
            self.current_src = Some(src);
            self.loading = false;
            self.failed = false;
            return None;
        }

        self.phase = Phase::Probing;
        self.loading = true;
        self.failed = false;
        self.started_at = Instant::now();
        Some(ResolveRequest {
            request_id: self.request_id,
            candidates: self.candidates.clone(),
            start_index: self.active_index,
            cancel_flag: self.cancel_flag.clone(),
            events,
        })
    }

    /// Adopts the first candidate untested. Used when no probe runner exists,
    /// so the reveal still has a source to show instead of spinning forever.
    pub fn resolve_without_probe(&mut self) {
        self.cancel();
        self.current_src = Some(
            self.candidates
                .first()
                .cloned()
                .unwrap_or_else(|| self.gift.media.clone()),
        );
        self.phase = Phase::Resolved;
        self.loading = false;
        self.failed = false;
        self.last_error = None;
    }

    /// Applies a worker event. Stale request ids and cancelled requests are
    /// dropped without touching state; returns whether anything changed.
    pub fn apply(&mut self, event: &ResolverEvent) -> bool {
        if event.request_id() != self.request_id {
            return false;
        }
        if self.cancel_flag.load(Ordering::SeqCst) {
            return false;
        }
        if self.phase != Phase::Probing {
            return false;
        }

        match event {
            ResolverEvent::CandidateFailed { index, candidate, .. } => {
                self.last_error = Some(ResolveError::CandidateProbeFailed {
                    candidate: candidate.clone(),
                });
                // active_index stays a valid index until exhaustion flips failed.
                if index + 1 < self.candidates.len() {
                    self.active_index = index + 1;
                }
                true
            }
            ResolverEvent::Resolved { index, candidate, .. } => {
                self.active_index = *index;
                self.current_src = Some(candidate.clone());
                self.phase = Phase::Resolved;
                self.loading = false;
                self.failed = false;
                self.last_error = None;
                true
            }
            ResolverEvent::Exhausted { attempted, .. } => {
                self.exhaust(*attempted);
                true
            }
        }
    }

    fn exhaust(&mut self, attempted: usize) {
        self.phase = Phase::Exhausted;
        self.failed = true;
        self.loading = false;
        self.current_src = None;
        self.last_error = Some(ResolveError::AllCandidatesExhausted { attempted });
    }

    /// The rendered media errored after a successful resolve: advance to the
    /// next unvisited candidate, or exhaust when none remain.
    pub fn playback_error(
        &mut self,
        next_request_id: u64,
        events: Sender<ResolverEvent>,
    ) -> Option<ResolveRequest> {
        if self.phase != Phase::Resolved {
            return None;
        }
        self.current_src = None;
        if self.gift.kind != MediaKind::Video || self.active_index + 1 >= self.candidates.len() {
            // `attempted` counts this pass only, and this pass played exactly
            // the one candidate that just errored.
            self.exhaust(1);
            return None;
        }
        self.active_index += 1;
        self.request_id = next_request_id;
        self.cancel_flag = Arc::new(AtomicBool::new(false));
        self.phase = Phase::Idle;
        self.start(events)
    }

    /// Explicit user retry from `Exhausted`: fresh candidate list, fresh
    /// request, probing restarts at index 0.
    pub fn retry(
        &mut self,
        origin: Option<&Url>,
        next_request_id: u64,
        events: Sender<ResolverEvent>,
    ) -> Option<ResolveRequest> {
        self.cancel();
        self.candidates = candidates::generate(&self.gift.media, origin);
        self.active_index = 0;
        self.current_src = None;
        self.failed = false;
        self.loading = false;
        self.last_error = None;
        self.request_id = next_request_id;
        self.cancel_flag = Arc::new(AtomicBool::new(false));
        self.phase = Phase::Idle;
        self.start(events)
    }

    /// Raised when the modal closes or the selection changes; pending probe
    /// continuations become no-ops.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    /// Overall safety timeout: clears the loading indicator even when no
    /// probe completion ever arrives. Returns whether anything changed.
    pub fn tick(&mut self, overall_timeout: Duration) -> bool {
        if self.phase == Phase::Probing
            && self.loading
            && self.started_at.elapsed() >= overall_timeout
        {
            self.loading = false;
            return true;
        }
        false
    }

    pub fn poster(&self) -> Option<&str> {
        let poster = self.gift.poster.trim();
        if poster.is_empty() {
            None
        } else {
            Some(poster)
        }
    }
}

/// Picks the URL for the "open externally" action: the original reference if
/// it answers a quick request, otherwise a web search for it. The error, when
/// present, explains why the fallback was taken.
pub fn external_open_url(
    client: &Client,
    user_agent: &str,
    reference: &str,
    origin: Option<&Url>,
    search_base: &str,
) -> (String, Option<ResolveError>) {
    let fallback = || {
        (
            search_link(search_base, reference),
            Some(ResolveError::ExternalFetchFailed {
                reference: reference.to_string(),
            }),
        )
    };

    let absolute = if reference.starts_with("http://") || reference.starts_with("https://") {
        reference.to_string()
    } else if let Some(origin) = origin {
        match origin.join(reference.trim_start_matches("./")) {
            Ok(url) => url.to_string(),
            Err(_) => return fallback(),
        }
    } else {
        return fallback();
    };

    let reachable = client
        .get(&absolute)
        .header(USER_AGENT, user_agent)
        .send()
        .map(|response| response.status().is_success())
        .unwrap_or(false);

    if reachable {
        (absolute, None)
    } else {
        fallback()
    }
}

pub fn search_link(search_base: &str, reference: &str) -> String {
    format!(
        "{}{}",
        search_base,
        utf8_percent_encode(reference, NON_ALPHANUMERIC)
    )
}
