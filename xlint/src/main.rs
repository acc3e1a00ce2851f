//! xlint: Command-line X.509 certificate linter.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing::warn;

use xlint_lib::{
    run_bulk, BulkOptions, CancelToken, CrlRevocationClient, IssuerCache, LintOptions, Linter,
    Registry, ReportOptions, RevocationCheck, TrustStore,
};

#[derive(Debug, Parser)]
#[command(
    name = "xlint",
    about = "Lint X.509 certificates against RFC 5280 and the CABF Baseline Requirements"
)]
struct Opts {
    /// Certificate file (PEM or DER); findings are printed to stdout
    #[arg(long)]
    cert: Option<PathBuf>,

    /// Concatenated-PEM archive to lint in bulk; results go to the report
    #[arg(long)]
    bulk: Option<PathBuf>,

    /// Known issuer certificate (PEM or DER), skips AIA downloads
    #[arg(long)]
    issuer: Option<PathBuf>,

    /// Also run checks on certificates that have already expired
    #[arg(long)]
    expired: bool,

    /// Report filename for bulk mode
    #[arg(long, default_value = "report.csv")]
    report: PathBuf,

    /// Embed certificate PEM in the report
    #[arg(long)]
    include: bool,

    /// Add a revocation column to the report (downloads CRLs)
    #[arg(long)]
    revoked: bool,

    /// Trusted roots PEM bundle (default: the system trust store)
    #[arg(long)]
    roots: Option<PathBuf>,

    /// Worker threads for bulk mode (default: one per CPU)
    #[arg(long, default_value_t = 0)]
    workers: usize,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    init_log(opts.verbose);

    if opts.cert.is_none() && opts.bulk.is_none() {
        Opts::command().print_help()?;
        return Ok(());
    }

    let trust = Arc::new(load_trust_store(opts.roots.as_deref())?);

    let issuer_der = match &opts.issuer {
        Some(path) => {
            let data = std::fs::read(path)
                .with_context(|| format!("Failed to read issuer file: {}", path.display()))?;
            Some(xlint_lib::pem::certificate_der(&data)?)
        }
        None => None,
    };

    let linter = Linter::new(
        Registry::with_defaults(),
        trust,
        LintOptions {
            check_expired: opts.expired,
            issuer_der,
        },
    )?;

    if let Some(bulk_path) = &opts.bulk {
        return lint_bulk(&opts, bulk_path, linter);
    }

    if let Some(cert_path) = &opts.cert {
        lint_single(cert_path, &linter)?;
    }

    Ok(())
}

/// Single-certificate mode: print the type tag and every finding to stdout.
/// Lint findings never change the exit code.
fn lint_single(path: &PathBuf, linter: &Linter) -> Result<()> {
    let input = std::fs::read(path)
        .with_context(|| format!("Failed to read certificate file: {}", path.display()))?;
    // A file that fails PEM framing is linted as raw bytes so the structural
    // findings still print; lint results never change the exit code.
    let der = match xlint_lib::pem::certificate_der(&input) {
        Ok(der) => der,
        Err(_) => input,
    };

    let mut cache = IssuerCache::default();
    let outcome = linter.lint(&der, &mut cache, true);

    let cert_type = outcome
        .cert
        .as_ref()
        .map(|data| data.cert_type.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!("Certificate Type: {}", cert_type);

    for finding in outcome.findings.list() {
        println!("{}", finding);
    }

    Ok(())
}

/// Bulk mode: stream the archive through the pipeline into the CSV report.
/// Only failure to create the report (or open the input) is fatal.
fn lint_bulk(opts: &Opts, bulk_path: &PathBuf, linter: Linter) -> Result<()> {
    let report_file = std::fs::File::create(&opts.report)
        .with_context(|| format!("Failed to create report file: {}", opts.report.display()))?;
    let out = std::io::BufWriter::new(report_file);

    let revocation_client = if opts.revoked {
        Some(CrlRevocationClient::new()?)
    } else {
        None
    };
    let revocation = revocation_client
        .as_ref()
        .map(|client| client as &dyn RevocationCheck);

    run_bulk(
        bulk_path,
        out,
        Arc::new(linter),
        &BulkOptions {
            workers: opts.workers,
        },
        &ReportOptions {
            include_pem: opts.include,
            check_revoked: opts.revoked,
        },
        revocation,
        CancelToken::new(),
    )?;

    Ok(())
}

/// Roots come from the caller or the system store. An unavailable system
/// store is not fatal: chains simply fail verification.
fn load_trust_store(roots: Option<&std::path::Path>) -> Result<TrustStore> {
    match roots {
        Some(path) => TrustStore::from_pem_file(path)
            .with_context(|| format!("Failed to load roots from {}", path.display())),
        None => match TrustStore::system() {
            Ok(store) => Ok(store),
            Err(e) => {
                warn!("no system trust store: {e}");
                Ok(TrustStore::new())
            }
        },
    }
}

fn init_log(verbosity: u8) {
    let level = match verbosity {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
