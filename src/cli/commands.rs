//! Command implementations
//!
//! Each command returns `Ok(true)` on success, `Ok(false)` when it ran to
//! completion but the outcome warrants a failing exit status.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::adapters::toml_config::AnalysisConfig;
use crate::app::{AnalyzeInteractor, InspectInteractor, VerifyInteractor, VerifyRequest};
use crate::cli::args::{AnalyzeArgs, HashArgs, InspectArgs, ProgressMode, VerifyArgs};
use crate::cli::{Cli, Commands};
use crate::engine::progress::{
    CancelToken, JsonProgressCallback, NoProgress, ProgressCallback, TracingProgressCallback,
};
use crate::hash::ContentHasher;
use crate::output::writer::ReportWriter;
use crate::utils::path::{collect_videos, mirrored_report_path, report_path_for};

/// Dispatch the parsed command line
pub async fn run(cli: Cli) -> Result<bool> {
    let config = AnalysisConfig::discover(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Analyze(args) => analyze(args, config).await,
        Commands::Inspect(args) => inspect(args).await,
        Commands::Hash(args) => hash(args, config).await,
        Commands::Verify(args) => verify(args, config).await,
    }
}

fn progress_for(mode: ProgressMode) -> Arc<dyn ProgressCallback> {
    match mode {
        ProgressMode::None => Arc::new(NoProgress),
        ProgressMode::Log => Arc::new(TracingProgressCallback),
        ProgressMode::Json => Arc::new(JsonProgressCallback),
    }
}

/// Cancel `cancel` on Ctrl-C
fn cancel_on_interrupt(cancel: &CancelToken) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; cancelling analysis");
            cancel.cancel();
        }
    });
}

/// Execute the analyze command
pub async fn analyze(args: AnalyzeArgs, mut config: AnalysisConfig) -> Result<bool> {
    args.apply_to(&mut config);
    config.validate().context("Invalid analysis settings")?;

    if !args.input.exists() {
        return Err(anyhow::anyhow!(
            "Input does not exist: {}",
            args.input.display()
        ));
    }

    let interactor = AnalyzeInteractor::new(config).with_progress(progress_for(args.progress));
    let writer = ReportWriter::new(args.format);
    let cancel = CancelToken::new();
    cancel_on_interrupt(&cancel);

    if args.input.is_dir() {
        return analyze_directory(&interactor, &writer, &args, cancel).await;
    }

    let report = interactor
        .analyze_with_cancel(&args.input, cancel)
        .await
        .with_context(|| format!("Analysis of {} failed", args.input.display()))?;

    match &args.output {
        Some(path) => writer.write_file(&report, path)?,
        None => writer.write_stdout(&report)?,
    }

    if report.tampering_suspected() {
        warn!(
            altered = report.altered_frames().len(),
            "Potential tampering detected in {}",
            report.filename()
        );
    } else {
        info!("No signs of tampering detected in {}", report.filename());
    }
    Ok(true)
}

async fn analyze_directory(
    interactor: &AnalyzeInteractor,
    writer: &ReportWriter,
    args: &AnalyzeArgs,
    cancel: CancelToken,
) -> Result<bool> {
    let videos = collect_videos(&args.input);
    if videos.is_empty() {
        warn!("No supported videos found under {}", args.input.display());
        return Ok(true);
    }
    info!("Analyzing {} videos under {}", videos.len(), args.input.display());

    let mut all_ok = true;
    for (video, result) in interactor.analyze_many(videos, cancel).await {
        match result {
            Ok(report) => {
                let extension = writer.format().extension();
                let path = match args.output.as_deref() {
                    Some(out) => mirrored_report_path(&video, &args.input, out, extension),
                    None => report_path_for(
                        &video,
                        video.parent().unwrap_or_else(|| Path::new(".")),
                        extension,
                    ),
                };
                writer.write_file(&report, &path)?;
                println!(
                    "{}\t{} altered\t{}",
                    video.display(),
                    report.altered_frames().len(),
                    path.display()
                );
            }
            Err(e) => {
                all_ok = false;
                error!(error = %e, "Analysis of {} failed", video.display());
                println!("{}\tfailed: {}", video.display(), e);
            }
        }
    }
    Ok(all_ok)
}

/// Execute the inspect command
pub async fn inspect(args: InspectArgs) -> Result<bool> {
    let response = InspectInteractor::new()
        .execute(&args.input)
        .await
        .with_context(|| format!("Failed to inspect {}", args.input.display()))?;
    println!("{}", response.render(args.format)?.trim_end());
    Ok(true)
}

/// Execute the hash command
pub async fn hash(args: HashArgs, config: AnalysisConfig) -> Result<bool> {
    let algorithm = args.algorithm.unwrap_or(config.hashing.algorithm);
    let hasher = ContentHasher::new(algorithm).with_chunk_size(config.hashing.chunk_size);
    let input = args.input.clone();

    let fingerprint = tokio::task::spawn_blocking(move || {
        hasher.hash_path(&input, &CancelToken::new(), &NoProgress)
    })
    .await
    .context("Hash task failed")??;

    println!("{}  {}", fingerprint, args.input.display());
    Ok(true)
}

/// Execute the verify command
pub async fn verify(args: VerifyArgs, config: AnalysisConfig) -> Result<bool> {
    let algorithm = args.algorithm.unwrap_or(config.hashing.algorithm);
    let hasher = ContentHasher::new(algorithm).with_chunk_size(config.hashing.chunk_size);

    let outcome = VerifyInteractor::new(hasher)
        .execute(VerifyRequest {
            report_path: args.report.clone(),
            video_path: args.input.clone(),
        })
        .await
        .with_context(|| format!("Failed to verify against {}", args.report.display()))?;

    for check in &outcome.checks {
        let status = if check.success { "OK" } else { "MISMATCH" };
        if check.success {
            println!("{:<8} {:<18} {}", status, check.check_type, check.actual);
        } else {
            println!(
                "{:<8} {:<18} expected {}, found {}",
                status, check.check_type, check.expected, check.actual
            );
        }
    }

    if outcome.success {
        println!("Verification passed");
    } else {
        println!("Verification FAILED");
    }
    Ok(outcome.success)
}

