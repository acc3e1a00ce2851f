//! The bulk lint pipeline.
//!
//! One reader thread streams PEM blocks from disk onto a bounded jobs
//! queue; a pool of workers (one per CPU by default) drains it, each with a
//! private issuer cache; a single writer serialises results to CSV. Bounded
//! queues provide backpressure in both directions, so resident memory stays
//! proportional to queue capacity rather than archive size.

use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{debug, info, warn};

use crate::cache::IssuerCache;
use crate::certdata::CertData;
use crate::engine::Linter;
use crate::findings::FindingSet;
use crate::pem;
use crate::report::{self, ReportOptions};
use crate::revocation::RevocationCheck;
use crate::XlintError;

/// Capacity of the jobs and results queues.
const QUEUE_CAPACITY: usize = 100;

/// Marker byte substrings, matched anywhere in a line so that leading
/// whitespace or armor prefixes do not hide a boundary.
const BEGIN_MARKER: &[u8] = b"-BEGIN CERTIFICATE-";
const END_MARKER: &[u8] = b"-END CERTIFICATE-";

/// A message on the results queue: one certificate's findings, or a
/// synthetic entry for a PEM block that would not decode.
pub struct LintResult {
    pub cert: Option<CertData>,
    pub raw_pem: Option<String>,
    pub findings: FindingSet,
}

/// Cooperative cancellation signal, honored at every queue operation.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bulk pipeline options.
#[derive(Debug, Clone, Copy)]
pub struct BulkOptions {
    /// Worker count; 0 means one per available CPU.
    pub workers: usize,
}

impl Default for BulkOptions {
    fn default() -> Self {
        BulkOptions { workers: 0 }
    }
}

/// Totals reported after a bulk run.
#[derive(Debug, Clone, Copy)]
pub struct BulkSummary {
    /// Certificates successfully decoded and dispatched to workers.
    pub certificates: u64,
    /// Certificates that produced report rows.
    pub reported: u64,
}

/// Run the full pipeline over a concatenated-PEM archive, writing the CSV
/// report to `out`.
pub fn run_bulk<W: std::io::Write>(
    bulk_path: &Path,
    out: W,
    linter: Arc<Linter>,
    options: &BulkOptions,
    report_options: &ReportOptions,
    revocation: Option<&dyn RevocationCheck>,
    cancel: CancelToken,
) -> Result<BulkSummary, XlintError> {
    let file = std::fs::File::open(bulk_path).map_err(|e| {
        XlintError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", bulk_path.display(), e),
        ))
    })?;

    let workers = if options.workers > 0 {
        options.workers
    } else {
        thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    };

    let (jobs_tx, jobs_rx) = sync_channel::<Vec<u8>>(QUEUE_CAPACITY);
    let (results_tx, results_rx) = sync_channel::<LintResult>(QUEUE_CAPACITY);
    let jobs_rx = Arc::new(Mutex::new(jobs_rx));

    // The live-worker gauge backs the shutdown handshake: the results queue
    // closes exactly once, when the last sender (worker or reader) drops.
    let running = Arc::new(AtomicUsize::new(0));

    let summary = thread::scope(|scope| -> Result<BulkSummary, XlintError> {
        let reader_cancel = cancel.clone();
        let reader_results = results_tx.clone();
        let reader = scope.spawn(move || {
            read_pem_stream(file, jobs_tx, reader_results, reader_cancel)
        });

        for _ in 0..workers {
            let jobs = Arc::clone(&jobs_rx);
            let results = results_tx.clone();
            let linter = Arc::clone(&linter);
            let running = Arc::clone(&running);
            let cancel = cancel.clone();
            scope.spawn(move || worker(jobs, results, linter, running, cancel));
        }

        // Only workers and the reader may keep the queues open: the results
        // queue closes when the last worker drops its sender, and the jobs
        // queue closes toward the reader when the last worker exits. Holding
        // either here would wedge shutdown.
        drop(results_tx);
        drop(jobs_rx);

        let reported = match report::write_report(results_rx, out, report_options, revocation) {
            Ok(reported) => reported,
            Err(e) => {
                // Unblock the producers before the scope joins them.
                cancel.cancel();
                return Err(e);
            }
        };

        let certificates = match reader.join() {
            Ok(Ok(count)) => count,
            Ok(Err(e)) => return Err(XlintError::Io(e)),
            Err(_) => {
                warn!("reader thread panicked");
                0
            }
        };

        Ok(BulkSummary {
            certificates,
            reported,
        })
    })?;

    info!(certificates = summary.certificates, "Checked {} certificates", summary.certificates);
    Ok(summary)
}

/// Reader: line-oriented scan so arbitrarily large archives stream in
/// bounded memory. The buffer resets on every BEGIN marker and is decoded
/// on every END marker; a block that fails to decode becomes a synthetic
/// error Result instead of halting the stream.
fn read_pem_stream(
    file: std::fs::File,
    jobs: SyncSender<Vec<u8>>,
    results: SyncSender<LintResult>,
    cancel: CancelToken,
) -> std::io::Result<u64> {
    let mut reader = std::io::BufReader::new(file);
    let mut line: Vec<u8> = Vec::new();
    let mut block: Vec<u8> = Vec::new();
    let mut count: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        // Normalize the terminator: CRLF and LF both become LF.
        while matches!(line.last(), Some(&b'\n') | Some(&b'\r')) {
            line.pop();
        }

        if contains(&line, BEGIN_MARKER) {
            block.clear();
        }
        block.extend_from_slice(&line);
        block.push(b'\n');

        if contains(&line, END_MARKER) {
            match pem::decode_block(&block) {
                Some(der) => {
                    count += 1;
                    if jobs.send(der).is_err() {
                        break; // all workers gone
                    }
                }
                None => {
                    let mut findings = FindingSet::new();
                    findings.err("Failed to decode PEM block");
                    let synthetic = LintResult {
                        cert: None,
                        raw_pem: Some(String::from_utf8_lossy(&block).into_owned()),
                        findings,
                    };
                    if results.send(synthetic).is_err() {
                        break;
                    }
                }
            }
            block.clear();
        }
    }

    Ok(count)
}

/// Worker: drain jobs until the queue closes, linting with a private issuer
/// cache. Emits a Result only when a non-skipped lint produced findings.
fn worker(
    jobs: Arc<Mutex<Receiver<Vec<u8>>>>,
    results: SyncSender<LintResult>,
    linter: Arc<Linter>,
    running: Arc<AtomicUsize>,
    cancel: CancelToken,
) {
    running.fetch_add(1, Ordering::SeqCst);
    let mut cache = IssuerCache::default();

    loop {
        if cancel.is_cancelled() {
            break;
        }

        // Take the lock only for the receive so workers do not serialise
        // their actual lint work.
        let job = match jobs.lock() {
            Ok(receiver) => receiver.recv(),
            Err(_) => break,
        };
        let der = match job {
            Ok(der) => der,
            Err(_) => break, // jobs queue closed and drained
        };

        let outcome = linter.lint(&der, &mut cache, false);
        if outcome.skipped || outcome.findings.is_empty() {
            continue;
        }

        let result = LintResult {
            cert: outcome.cert,
            raw_pem: None,
            findings: outcome.findings,
        };
        if results.send(result).is_err() {
            break; // writer gone
        }
    }

    let live = running.fetch_sub(1, Ordering::SeqCst) - 1;
    debug!(live, "worker exiting");
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn run_reader(input: &[u8]) -> (u64, Vec<Vec<u8>>, Vec<LintResult>) {
        let mut tmp = tempfile();
        tmp.write_all(input).unwrap();
        tmp.flush().unwrap();
        let file = tmp.reopen();

        let (jobs_tx, jobs_rx) = sync_channel(QUEUE_CAPACITY);
        let (results_tx, results_rx) = sync_channel(QUEUE_CAPACITY);

        let count = read_pem_stream(file, jobs_tx, results_tx, CancelToken::new()).unwrap();
        let jobs: Vec<Vec<u8>> = jobs_rx.try_iter().collect();
        let results: Vec<LintResult> = results_rx.try_iter().collect();
        (count, jobs, results)
    }

    struct TempPem {
        path: std::path::PathBuf,
        file: std::fs::File,
    }

    impl TempPem {
        fn reopen(&self) -> std::fs::File {
            std::fs::File::open(&self.path).unwrap()
        }
    }

    impl Write for TempPem {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.file.write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            self.file.flush()
        }
    }

    impl Drop for TempPem {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    fn tempfile() -> TempPem {
        let path = std::env::temp_dir().join(format!(
            "xlint-pipeline-test-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        let file = std::fs::File::create(&path).unwrap();
        TempPem { path, file }
    }

    const GOOD_BLOCK: &str = "-----BEGIN CERTIFICATE-----\nAQIDBAU=\n-----END CERTIFICATE-----\n";

    #[test]
    fn reader_emits_one_job_per_block() {
        let input = format!("{GOOD_BLOCK}\n{GOOD_BLOCK}");
        let (count, jobs, results) = run_reader(input.as_bytes());
        assert_eq!(count, 2);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0], vec![1, 2, 3, 4, 5]);
        assert!(results.is_empty());
    }

    #[test]
    fn reader_handles_crlf_line_endings() {
        let input = GOOD_BLOCK.replace('\n', "\r\n");
        let (count, jobs, _) = run_reader(input.as_bytes());
        assert_eq!(count, 1);
        assert_eq!(jobs[0], vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn bad_block_becomes_synthetic_result() {
        let input = format!(
            "{GOOD_BLOCK}-----BEGIN CERTIFICATE-----\n!!not base64!!\n-----END CERTIFICATE-----\n"
        );
        let (count, jobs, results) = run_reader(input.as_bytes());
        assert_eq!(count, 1);
        assert_eq!(jobs.len(), 1);
        assert_eq!(results.len(), 1);
        let synthetic = &results[0];
        assert!(synthetic.cert.is_none());
        assert!(synthetic.raw_pem.as_deref().unwrap().contains("not base64"));
        assert_eq!(synthetic.findings.len(), 1);
    }

    #[test]
    fn garbage_between_blocks_is_ignored() {
        let input = format!("junk line\r\n{GOOD_BLOCK}trailing junk\n");
        let (count, jobs, results) = run_reader(input.as_bytes());
        assert_eq!(count, 1);
        assert_eq!(jobs.len(), 1);
        assert!(results.is_empty());
    }

    #[test]
    fn cancelled_reader_stops_early() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let mut tmp = tempfile();
        tmp.write_all(GOOD_BLOCK.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let (jobs_tx, jobs_rx) = sync_channel(QUEUE_CAPACITY);
        let (results_tx, _results_rx) = sync_channel(QUEUE_CAPACITY);
        let count = read_pem_stream(tmp.reopen(), jobs_tx, results_tx, cancel).unwrap();
        assert_eq!(count, 0);
        assert!(jobs_rx.try_iter().next().is_none());
    }
}
