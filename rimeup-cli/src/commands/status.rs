//! Status command - compare installed versions with the latest releases.

use console::style;
use rimeup::updater::{ArtifactKind, ArtifactStatus, UpdateError, UpdateResult};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the status command.
pub fn run(runner: &CliRunner) -> Result<(), CliError> {
    let (config, mut updater) = runner.combined_updater()?;

    println!(
        "Checking {} releases for {}",
        config.source.label(),
        config.rime_dir.display()
    );
    println!();

    // Per-kind failures are shown in the table.
    let failures = match updater.fetch_all_updates() {
        Ok(()) => Vec::new(),
        Err(UpdateError::Aggregate(failures)) => failures,
        Err(e) => return Err(e.into()),
    };

    let mut rows: Vec<(ArtifactKind, UpdateResult<ArtifactStatus>)> = updater
        .updaters()
        .iter()
        .filter(|u| u.update_info().is_some())
        .map(|u| (u.kind(), u.status()))
        .collect();
    rows.extend(failures.into_iter().map(|(kind, e)| (kind, Err(e))));
    rows.sort_by_key(|(kind, _)| *kind);

    print_table(&rows);

    let pending = rows
        .iter()
        .filter(|(_, s)| matches!(s, Ok(s) if s.needs_update))
        .count();
    println!();
    if pending > 0 {
        println!(
            "{} update(s) available. Run {} to apply.",
            pending,
            style("rimeup update").bold()
        );
    } else if rows.iter().all(|(_, s)| s.is_ok()) {
        println!("{}", style("Everything is up to date.").green());
    }
    Ok(())
}

fn print_table(rows: &[(ArtifactKind, UpdateResult<ArtifactStatus>)]) {
    println!(
        "{:<8} {:<22} {:<22} {}",
        style("ARTIFACT").bold(),
        style("INSTALLED").bold(),
        style("LATEST").bold(),
        style("STATUS").bold()
    );

    for (kind, status) in rows {
        match status {
            Ok(s) => {
                let message = if s.needs_update {
                    style(s.message.clone()).yellow()
                } else {
                    style(s.message.clone()).green()
                };
                println!(
                    "{:<8} {:<22} {:<22} {}",
                    kind.label(),
                    truncate(&s.local_version, 22),
                    truncate(&s.remote_version, 22),
                    message
                );
            }
            Err(e) => {
                println!(
                    "{:<8} {:<22} {:<22} {}",
                    kind.label(),
                    "-",
                    "-",
                    style(e.to_string()).red()
                );
            }
        }
    }
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
