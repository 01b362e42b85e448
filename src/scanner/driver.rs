use crate::candidate::{space_size, Candidate, CandidateSequence};
use crate::config::ScanSession;
use crate::resolver::{ResponseClassifier, Transport};
use crate::scanner::rate_limiter::{Clock, RateLimiter, TokioClock};
use crate::storage::{locate_resume_point, RecordWriter, ResumePoint, ScanRecord};
use crate::Result;
use std::time::{Duration, Instant};

/// Counters for the current run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanProgress {
    /// Candidates attempted
    pub processed: u64,

    /// Attempts that resolved to a destination
    pub found: u64,

    /// Records appended to the store
    pub written: u64,

    /// Not-found records left out of the store
    pub suppressed: u64,

    /// Attempts that timed out or failed to connect
    pub network_failures: u64,

    pub last_attempted: Option<Candidate>,
}

/// Final report of a run
#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub processed: u64,
    pub found: u64,
    pub written: u64,
    pub suppressed: u64,
    pub network_failures: u64,
    pub last_attempted: Option<Candidate>,

    /// Where the next run would start, `None` once the space is exhausted
    pub next_candidate: Option<Candidate>,
    pub exhausted: bool,
    pub elapsed: Duration,
}

/// What happened to one candidate
#[derive(Debug, Clone)]
pub struct StepReport {
    pub candidate: Candidate,
    pub record: ScanRecord,

    /// False when the record was suppressed
    pub written: bool,

    /// Time spent held back by the rate limiter
    pub waited: Duration,
}

/// The scan loop
///
/// Owns the whole per-session state: the candidate cursor, the limiter's
/// last request start, the store writer and the run counters. One candidate
/// is fully resolved and persisted before the next one is pulled.
pub struct Scanner<T, C = TokioClock> {
    session: ScanSession,
    sequence: CandidateSequence,
    classifier: ResponseClassifier<T>,
    limiter: RateLimiter<C>,
    writer: RecordWriter,
    progress: ScanProgress,
    in_flight: Option<Candidate>,
}

impl<T: Transport> Scanner<T, TokioClock> {
    /// Creates a scanner paced by the wall clock
    ///
    /// # Errors
    ///
    /// Fails if the resume point cannot be determined or the store cannot
    /// be opened for appending.
    pub fn new(session: ScanSession, transport: T) -> Result<Self> {
        Self::with_clock(session, transport, TokioClock)
    }
}

impl<T: Transport, C: Clock> Scanner<T, C> {
    pub fn with_clock(session: ScanSession, transport: T, clock: C) -> Result<Self> {
        let length = session.scan.length;
        let path = session.scan.output_path.clone();

        let explicit = session.scan.start_from.as_deref();
        let resume = locate_resume_point(&path, &session.http.base_url, length, explicit)?;
        let sequence = match resume {
            ResumePoint::Start(candidate) => {
                tracing::info!(
                    "Starting from {} (index {} of {})",
                    candidate,
                    candidate.index(),
                    space_size(length)
                );
                CandidateSequence::starting_at(candidate)
            }
            ResumePoint::Exhausted { last } => {
                tracing::info!(
                    "All {} candidates of length {} are recorded (last: {}); nothing to scan",
                    space_size(length),
                    length,
                    last
                );
                CandidateSequence::exhausted(length)
            }
        };

        let classifier = ResponseClassifier::new(transport, &session)?;
        let writer = RecordWriter::open(&path, session.scan.sync_writes)?;
        let limiter = RateLimiter::with_clock(session.delay(), clock);

        Ok(Self {
            session,
            sequence,
            classifier,
            limiter,
            writer,
            progress: ScanProgress::default(),
            in_flight: None,
        })
    }

    /// Resolves and persists the next candidate
    ///
    /// Returns `Ok(None)` once the space is exhausted. A persistence failure
    /// is returned as an error and the candidate stays in flight.
    pub async fn step(&mut self) -> Result<Option<StepReport>> {
        let Some(candidate) = self.sequence.next() else {
            return Ok(None);
        };
        self.in_flight = Some(candidate.clone());

        let waited = self.limiter.acquire().await;

        let short_url = self.session.short_url(&candidate);
        let resolution = self.classifier.resolve(&short_url).await;
        let record = ScanRecord::new(short_url, resolution.outcome);

        let written = self.persist(&record)?;

        self.progress.processed += 1;
        if record.outcome.is_found() {
            self.progress.found += 1;
            tracing::info!("+ Found: {} -> {}", record.short_url, record.outcome);
        } else if record.outcome.is_network_failure() {
            self.progress.network_failures += 1;
            tracing::debug!("{} -> {} (recorded, continuing)", record.short_url, record.outcome);
        } else {
            tracing::debug!("{} -> {}", record.short_url, record.outcome);
        }
        self.progress.last_attempted = Some(candidate.clone());
        self.in_flight = None;

        Ok(Some(StepReport {
            candidate,
            record,
            written,
            waited,
        }))
    }

    /// Appends the record unless it is a suppressed not-found outcome
    fn persist(&mut self, record: &ScanRecord) -> Result<bool> {
        if self.session.scan.skip_not_found && record.outcome.is_not_found() {
            self.progress.suppressed += 1;
            return Ok(false);
        }

        self.writer.append(record)?;
        self.progress.written += 1;
        Ok(true)
    }

    /// Runs until the space is exhausted or the request limit is reached
    pub async fn run(&mut self) -> Result<ScanSummary> {
        let started = Instant::now();
        let length = self.session.scan.length;

        tracing::info!(
            "Scanning {}-character suffixes of {} ({} combinations, {} remaining)",
            length,
            self.session.http.base_url,
            space_size(length),
            self.sequence.remaining()
        );
        tracing::info!("Pacing request starts {:?} apart", self.limiter.interval());
        if self.session.scan.skip_not_found {
            tracing::info!("Not-found outcomes will not be written");
        }

        let interval = self.session.scan.progress_interval.max(1);

        loop {
            if let Some(limit) = self.session.scan.max_requests {
                if self.progress.processed >= limit {
                    tracing::info!("Reached request limit of {}", limit);
                    break;
                }
            }

            if self.step().await?.is_none() {
                tracing::info!("Candidate space exhausted");
                break;
            }

            if self.progress.processed % interval == 0 {
                self.log_progress();
            }
        }

        let summary = self.summary(started.elapsed());
        tracing::info!(
            "Scan finished: {} processed, {} found, {} written, {} suppressed, {} network failures in {:?}",
            summary.processed,
            summary.found,
            summary.written,
            summary.suppressed,
            summary.network_failures,
            summary.elapsed
        );
        Ok(summary)
    }

    fn log_progress(&self) {
        match &self.progress.last_attempted {
            Some(current) => tracing::info!(
                "Processed: {} | Found: {} | Current: {} (index: {})",
                self.progress.processed,
                self.progress.found,
                current,
                current.index()
            ),
            None => tracing::info!(
                "Processed: {} | Found: {}",
                self.progress.processed,
                self.progress.found
            ),
        }
    }

    fn summary(&self, elapsed: Duration) -> ScanSummary {
        let next_candidate = self.next_candidate().cloned();
        ScanSummary {
            processed: self.progress.processed,
            found: self.progress.found,
            written: self.progress.written,
            suppressed: self.progress.suppressed,
            network_failures: self.progress.network_failures,
            last_attempted: self.progress.last_attempted.clone(),
            exhausted: next_candidate.is_none(),
            next_candidate,
            elapsed,
        }
    }

    pub fn progress(&self) -> &ScanProgress {
        &self.progress
    }

    /// Next candidate the sequence will yield
    pub fn next_candidate(&self) -> Option<&Candidate> {
        self.sequence.peek()
    }

    /// Candidate to pass as the start override to continue this run
    ///
    /// This is the candidate being resolved if a step was interrupted, else
    /// the next one in sequence.
    pub fn resume_hint(&self) -> Option<&Candidate> {
        self.in_flight.as_ref().or_else(|| self.sequence.peek())
    }
}

/// Resolves a single short URL outside of any enumeration
///
/// The record is persisted under the same suppression rule as a scan.
pub async fn test_url<T: Transport>(
    session: &ScanSession,
    transport: T,
    short_url: &str,
) -> Result<ScanRecord> {
    let classifier = ResponseClassifier::new(transport, session)?;
    let resolution = classifier.resolve(short_url).await;

    tracing::info!(
        "Testing URL: {} -> {} (final state {})",
        short_url,
        resolution.outcome,
        resolution.final_state()
    );
    if let Some(rule) = resolution.extraction_rule {
        tracing::info!("Destination extracted by rule '{}'", rule);
    }

    let record = ScanRecord::new(short_url, resolution.outcome);
    let suppress = session.scan.skip_not_found && record.outcome.is_not_found();
    if suppress {
        tracing::info!("Not-found outcome not written");
    } else {
        let mut writer = RecordWriter::open(&session.scan.output_path, session.scan.sync_writes)?;
        writer.append(&record)?;
    }

    Ok(record)
}
