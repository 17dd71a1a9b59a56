//! Update command - download and apply new releases, then redeploy.

use std::collections::HashMap;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use console::style;
use dialoguer::Confirm;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use rimeup::updater::{
    completion_channel, progress_channel, ArtifactKind, CombinedReport, ProgressEvent,
    RunCompletion, RunOutcome, UpdateError, DEFAULT_PROGRESS_CAPACITY, NOT_INSTALLED,
};
use tracing::{info, warn};

use super::format_bytes;
use crate::error::CliError;
use crate::runner::CliRunner;

/// How often the render loop drains progress events.
const RENDER_INTERVAL: Duration = Duration::from_millis(100);

/// Bar resolution; events carry a ratio in `0.0..=1.0`.
const BAR_LENGTH: u64 = 1000;

/// Arguments for the update command.
pub struct UpdateArgs {
    /// Restrict to these kinds; empty means all configured.
    pub only: Vec<ArtifactKind>,
    pub no_deploy: bool,
    pub yes: bool,
}

/// Run the update command.
pub fn run(runner: &CliRunner, args: UpdateArgs) -> Result<(), CliError> {
    let (config, mut updater) = runner.combined_updater()?;
    updater.retain_kinds(&args.only);
    if updater.updaters().is_empty() {
        return Err(CliError::Config(
            "None of the selected artifacts is configured.".to_string(),
        ));
    }

    println!("Checking {} releases...", config.source.label());
    let check_failures = match updater.fetch_all_updates() {
        Ok(()) => Vec::new(),
        Err(UpdateError::Aggregate(failures)) => failures,
        Err(e) => return Err(e.into()),
    };
    for (kind, e) in &check_failures {
        println!("  {} {}: {}", style("✗").red().bold(), kind.label(), e);
    }

    let pending: Vec<ArtifactKind> = updater
        .updaters()
        .iter()
        .filter(|u| u.has_update())
        .map(|u| u.kind())
        .collect();

    if pending.is_empty() {
        if check_failures.is_empty() {
            println!("{}", style("Everything is up to date.").green());
            return Ok(());
        }
        return Err(UpdateError::Aggregate(check_failures).into());
    }

    println!();
    println!("Updates available:");
    for kind in &pending {
        if let Some(u) = updater.updaters().iter().find(|u| u.kind() == *kind) {
            let local = u
                .record()
                .ok()
                .flatten()
                .map(|r| r.tag)
                .unwrap_or_else(|| NOT_INSTALLED.to_string());
            let (remote, size) = u
                .update_info()
                .map(|i| (i.tag.clone(), i.size_bytes))
                .unwrap_or_default();
            println!(
                "  {:<7} {} -> {} ({})",
                kind.label(),
                local,
                style(remote).cyan(),
                format_bytes(size)
            );
        }
    }
    println!();

    if !args.yes && !confirm(pending.len())? {
        println!("Cancelled.");
        return Ok(());
    }

    updater.retain_kinds(&pending);
    let deploy = !args.no_deploy && config.auto_deploy;
    info!(kinds = ?pending, deploy, "Starting update");

    let (sink, events) = progress_channel(DEFAULT_PROGRESS_CAPACITY);
    let (done_tx, done_rx) = completion_channel();
    let callback = sink.into_callback();

    let worker = thread::Builder::new()
        .name("rimeup-update".to_string())
        .spawn(move || updater.run_all_with_progress(Some(callback), Some(done_tx), deploy))?;

    let display = UpdateDisplay::new(&pending);
    display.render_until_done(&events, &done_rx, pending.len());

    if deploy {
        display.deploying();
    }
    let report = worker
        .join()
        .map_err(|_| CliError::Interaction("Update worker panicked".to_string()))?;
    display.clear();

    print_summary(&report, deploy);

    let mut failures = check_failures;
    if let Err(UpdateError::Aggregate(run_failures)) = report.into_result() {
        failures.extend(run_failures);
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(UpdateError::Aggregate(failures).into())
    }
}

fn confirm(count: usize) -> Result<bool, CliError> {
    Confirm::new()
        .with_prompt(format!("Apply {} update(s)?", count))
        .default(true)
        .interact()
        .map_err(|e| {
            CliError::Interaction(format!(
                "Could not read confirmation ({}). Use --yes to skip the prompt.",
                e
            ))
        })
}

/// One progress bar per running artifact.
struct UpdateDisplay {
    multi: MultiProgress,
    bars: HashMap<ArtifactKind, ProgressBar>,
    status: ProgressBar,
}

impl UpdateDisplay {
    fn new(kinds: &[ArtifactKind]) -> Self {
        let multi = MultiProgress::new();
        let style = ProgressStyle::default_bar()
            .template("{prefix:>7.bold} [{bar:30.cyan/blue}] {percent:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");

        let bars = kinds
            .iter()
            .map(|kind| {
                let bar = multi.add(ProgressBar::new(BAR_LENGTH));
                bar.set_style(style.clone());
                bar.set_prefix(kind.label());
                bar.set_message("waiting");
                (*kind, bar)
            })
            .collect();

        let status = multi.add(ProgressBar::hidden());
        Self {
            multi,
            bars,
            status,
        }
    }

    /// Drain progress until `expected` completions arrived or the worker left.
    fn render_until_done(
        &self,
        events: &Receiver<ProgressEvent>,
        completions: &Receiver<RunCompletion>,
        expected: usize,
    ) {
        let mut remaining = expected;
        while remaining > 0 {
            for event in events.try_iter() {
                self.apply(&event);
            }
            match completions.recv_timeout(RENDER_INTERVAL) {
                Ok(completion) => {
                    self.finish(&completion);
                    remaining -= 1;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn apply(&self, event: &ProgressEvent) {
        let Some(bar) = self.bars.get(&event.kind) else {
            return;
        };
        bar.set_position((event.percent * BAR_LENGTH as f64) as u64);
        if event.is_download_phase {
            let total = if event.total > 0 {
                format_bytes(event.total)
            } else {
                "?".to_string()
            };
            bar.set_message(format!(
                "{} {}/{} {:.1} MB/s via {}",
                event.file_name,
                format_bytes(event.downloaded),
                total,
                event.speed_mbps,
                event.source_label
            ));
        } else {
            bar.set_message(event.message.clone());
        }
    }

    fn finish(&self, completion: &RunCompletion) {
        let Some(bar) = self.bars.get(&completion.kind) else {
            return;
        };
        match &completion.result {
            Ok(outcome) => {
                bar.set_position(BAR_LENGTH);
                bar.finish_with_message(format!("{}", style(outcome_text(outcome)).green()));
            }
            Err(e) => {
                warn!(kind = %completion.kind, error = %e, "Update failed");
                bar.abandon_with_message(format!("{}", style(e).red()));
            }
        }
    }

    fn deploying(&self) {
        self.status.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        self.status.set_message("Finishing...");
        self.status.enable_steady_tick(RENDER_INTERVAL);
    }

    fn clear(&self) {
        self.status.finish_and_clear();
        let _ = self.multi.clear();
    }
}

fn outcome_text(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Updated { tag, .. } => format!("updated to {}", tag),
        RunOutcome::RecordRefreshed { tag } => format!("already current at {}", tag),
        RunOutcome::AlreadyUpToDate => "up to date".to_string(),
    }
}

fn print_summary(report: &CombinedReport, deploy_requested: bool) {
    println!();
    println!("Update Summary");
    println!("──────────────");
    for (kind, result) in &report.outcomes {
        match result {
            Ok(outcome) => {
                println!(
                    "  {} {:<7} {}",
                    style("✓").green().bold(),
                    kind.label(),
                    outcome_text(outcome)
                );
                if let RunOutcome::Updated { warnings, .. } = outcome {
                    for warning in warnings {
                        println!("      {} {}", style("!").yellow(), warning);
                    }
                }
            }
            Err(e) => println!(
                "  {} {:<7} {}",
                style("✗").red().bold(),
                kind.label(),
                e
            ),
        }
    }

    println!();
    match &report.deploy {
        Some(Ok(())) => println!("{} Input method redeployed.", style("✓").green().bold()),
        Some(Err(e)) => println!(
            "{} Deploy failed: {}. Run {} to retry.",
            style("!").yellow().bold(),
            e,
            style("rimeup deploy").bold()
        ),
        None if !report.updated().is_empty() && !deploy_requested => println!(
            "Files changed. Run {} to load them.",
            style("rimeup deploy").bold()
        ),
        None if report.has_failures() && !report.updated().is_empty() => println!(
            "Not redeploying because some updates failed. Run {} when ready.",
            style("rimeup deploy").bold()
        ),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_text() {
        assert_eq!(
            outcome_text(&RunOutcome::Updated {
                tag: "v1".into(),
                warnings: vec![]
            }),
            "updated to v1"
        );
        assert_eq!(outcome_text(&RunOutcome::AlreadyUpToDate), "up to date");
    }

    #[test]
    fn test_display_ignores_unknown_kinds() {
        let display = UpdateDisplay::new(&[ArtifactKind::Dict]);
        display.apply(&ProgressEvent::stage(ArtifactKind::Model, "Extracting", 0.5));
        display.finish(&RunCompletion {
            kind: ArtifactKind::Scheme,
            result: Ok(RunOutcome::AlreadyUpToDate),
        });
        assert_eq!(display.bars[&ArtifactKind::Dict].position(), 0);
    }

    #[test]
    fn test_render_stops_when_worker_disconnects() {
        let display = UpdateDisplay::new(&[ArtifactKind::Dict]);
        let (sink, events) = progress_channel(4);
        let (done_tx, done_rx) = completion_channel();

        sink.publish(ProgressEvent::stage(ArtifactKind::Dict, "Extracting", 0.5));
        drop(done_tx);

        display.render_until_done(&events, &done_rx, 3);
        assert_eq!(display.bars[&ArtifactKind::Dict].position(), BAR_LENGTH / 2);
    }
}
