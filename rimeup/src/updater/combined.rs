//! Update-everything driver over the per-artifact updaters.

use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

use tracing::{info, warn};

use super::artifact::{ArtifactStatus, ArtifactUpdater, RunOutcome, UpdaterServices};
use super::config::UpdaterConfig;
use super::error::{UpdateError, UpdateResult};
use super::kind::ArtifactKind;
use super::progress::{ProgressCallback, RunCompletion};
use crate::deploy::{self, Deployer};

/// Result of [`CombinedUpdater::run_all_with_progress`].
#[derive(Debug, Default)]
pub struct CombinedReport {
    /// Per-artifact outcome, in artifact order. Artifacts that did not need
    /// updating report `AlreadyUpToDate`.
    pub outcomes: Vec<(ArtifactKind, UpdateResult<RunOutcome>)>,
    /// Deploy result, `None` when no deploy was attempted.
    pub deploy: Option<UpdateResult<()>>,
}

impl CombinedReport {
    /// Kinds whose files changed.
    pub fn updated(&self) -> Vec<ArtifactKind> {
        self.outcomes
            .iter()
            .filter(|(_, r)| matches!(r, Ok(o) if o.changed_files()))
            .map(|(k, _)| *k)
            .collect()
    }

    /// Whether any artifact failed.
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|(_, r)| r.is_err())
    }

    /// Whether every run succeeded. Deploy failures are not counted here.
    pub fn is_success(&self) -> bool {
        !self.has_failures()
    }

    /// Fold per-artifact failures into one `Aggregate` error.
    pub fn into_result(self) -> UpdateResult<Vec<(ArtifactKind, RunOutcome)>> {
        let mut ok = Vec::new();
        let mut failed = Vec::new();
        for (kind, result) in self.outcomes {
            match result {
                Ok(outcome) => ok.push((kind, outcome)),
                Err(e) => failed.push((kind, e)),
            }
        }
        if failed.is_empty() {
            Ok(ok)
        } else {
            Err(UpdateError::Aggregate(failed))
        }
    }
}

/// Drives the scheme, dictionary and model updaters together.
pub struct CombinedUpdater {
    updaters: Vec<ArtifactUpdater>,
    deployer: Arc<dyn Deployer>,
}

impl CombinedUpdater {
    /// Create from already-built updaters.
    pub fn new(updaters: Vec<ArtifactUpdater>, deployer: Arc<dyn Deployer>) -> Self {
        Self { updaters, deployer }
    }

    /// Build one updater per configured artifact, sharing `services`.
    pub fn from_services(config: &UpdaterConfig, services: UpdaterServices) -> Self {
        let deployer = services.deployer.clone();
        let updaters = config
            .artifacts
            .iter()
            .map(|spec| ArtifactUpdater::new(spec.clone(), config, services.clone()))
            .collect();
        Self::new(updaters, deployer)
    }

    /// Build with the production HTTP stack.
    pub fn from_config(config: &UpdaterConfig, deployer: Arc<dyn Deployer>) -> UpdateResult<Self> {
        let services = UpdaterServices::from_config(config, deployer)?;
        Ok(Self::from_services(config, services))
    }

    /// Keep only the given kinds.
    pub fn retain_kinds(&mut self, kinds: &[ArtifactKind]) {
        if !kinds.is_empty() {
            self.updaters.retain(|u| kinds.contains(&u.kind()));
        }
    }

    /// The managed updaters.
    pub fn updaters(&self) -> &[ArtifactUpdater] {
        &self.updaters
    }

    /// The updater for `kind`.
    pub fn updater_mut(&mut self, kind: ArtifactKind) -> Option<&mut ArtifactUpdater> {
        self.updaters.iter_mut().find(|u| u.kind() == kind)
    }

    /// Check every artifact, caching whatever succeeded.
    ///
    /// One failure does not stop the other checks; all failures are returned
    /// together as `Aggregate`.
    pub fn fetch_all_updates(&mut self) -> UpdateResult<()> {
        let mut failures = Vec::new();
        for updater in &mut self.updaters {
            if let Err(e) = updater.check_update() {
                warn!(kind = %updater.kind(), error = %e, "Update check failed");
                failures.push((updater.kind(), e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(UpdateError::Aggregate(failures))
        }
    }

    /// Whether any checked artifact has a newer remote version.
    pub fn has_any_update(&self) -> bool {
        self.updaters.iter().any(ArtifactUpdater::has_update)
    }

    /// Status of every artifact.
    pub fn statuses(&self) -> Vec<(ArtifactKind, UpdateResult<ArtifactStatus>)> {
        self.updaters.iter().map(|u| (u.kind(), u.status())).collect()
    }

    /// Run every artifact that needs it, concurrently, then deploy once.
    ///
    /// Artifacts without cached remote info are checked first. Each finished
    /// run is signalled on `completions`. The deploy step runs only when
    /// `deploy` is set, no run failed, and at least one run changed files.
    pub fn run_all_with_progress(
        &mut self,
        on_progress: Option<ProgressCallback>,
        completions: Option<Sender<RunCompletion>>,
        deploy: bool,
    ) -> CombinedReport {
        let mut report = CombinedReport::default();
        let mut selected = Vec::new();

        for updater in &mut self.updaters {
            let kind = updater.kind();
            if updater.update_info().is_none() {
                if let Err(e) = updater.check_update() {
                    notify(&completions, kind, Err(e.to_string()));
                    report.outcomes.push((kind, Err(e)));
                    continue;
                }
            }
            if updater.has_update() {
                selected.push(kind);
            } else {
                notify(&completions, kind, Ok(RunOutcome::AlreadyUpToDate));
                report.outcomes.push((kind, Ok(RunOutcome::AlreadyUpToDate)));
            }
        }

        info!(count = selected.len(), "Running artifact updates");

        let results: Vec<(ArtifactKind, UpdateResult<RunOutcome>)> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .updaters
                .iter_mut()
                .filter(|u| selected.contains(&u.kind()))
                .map(|updater| {
                    let kind = updater.kind();
                    let callback = on_progress.clone();
                    let tx = completions.clone();
                    let handle = scope.spawn(move || {
                        let result = updater.run(callback.as_ref());
                        notify(
                            &tx,
                            kind,
                            result.as_ref().map(Clone::clone).map_err(|e| e.to_string()),
                        );
                        result
                    });
                    (kind, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(kind, handle)| {
                    let result = handle
                        .join()
                        .unwrap_or_else(|_| Err(UpdateError::WorkerPanicked(kind)));
                    (kind, result)
                })
                .collect()
        });

        report.outcomes.extend(results);
        report.outcomes.sort_by_key(|(kind, _)| *kind);

        if deploy && !report.has_failures() && !report.updated().is_empty() {
            report.deploy = Some(self.deploy());
        }
        report
    }

    /// Terminate and redeploy the frontend once.
    pub fn deploy(&self) -> UpdateResult<()> {
        deploy::redeploy(self.deployer.as_ref())
    }
}

fn notify(
    tx: &Option<Sender<RunCompletion>>,
    kind: ArtifactKind,
    result: Result<RunOutcome, String>,
) {
    if let Some(tx) = tx {
        // The receiver may already be gone when the caller stopped listening.
        let _ = tx.send(RunCompletion { kind, result });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_into_result_aggregates() {
        let report = CombinedReport {
            outcomes: vec![
                (ArtifactKind::Scheme, Ok(RunOutcome::AlreadyUpToDate)),
                (
                    ArtifactKind::Model,
                    Err(UpdateError::DeployFailed("x".into())),
                ),
            ],
            deploy: None,
        };
        assert!(report.has_failures());

        match report.into_result() {
            Err(UpdateError::Aggregate(failed)) => {
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].0, ArtifactKind::Model);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_report_updated_kinds() {
        let report = CombinedReport {
            outcomes: vec![
                (
                    ArtifactKind::Dict,
                    Ok(RunOutcome::Updated {
                        tag: "dict-nightly".into(),
                        warnings: vec![],
                    }),
                ),
                (
                    ArtifactKind::Model,
                    Ok(RunOutcome::RecordRefreshed { tag: "LTS".into() }),
                ),
            ],
            deploy: None,
        };
        assert_eq!(report.updated(), vec![ArtifactKind::Dict]);
        assert!(report.is_success());
    }
}
