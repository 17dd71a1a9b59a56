//! Progress events and the channels that carry them to a UI.
//!
//! Progress is best-effort: producers publish through a bounded channel and
//! drop the event when the consumer falls behind. Completion of a run travels
//! on a separate unbounded channel and is never dropped.

use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TrySendError};
use std::sync::Arc;

use super::artifact::RunOutcome;
use super::kind::ArtifactKind;

/// Default capacity of the progress channel.
pub const DEFAULT_PROGRESS_CAPACITY: usize = 64;

/// One progress update.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// Artifact the event belongs to.
    pub kind: ArtifactKind,
    /// Human-readable status line.
    pub message: String,
    /// Completion ratio in `0.0..=1.0`.
    pub percent: f64,
    /// Release source label ("GitHub", "CNB").
    pub source_label: String,
    /// Asset file name.
    pub file_name: String,
    /// Bytes downloaded so far.
    pub downloaded: u64,
    /// Total bytes, 0 when unknown.
    pub total: u64,
    /// Instantaneous download speed in MB/s.
    pub speed_mbps: f64,
    /// True while bytes are being transferred.
    pub is_download_phase: bool,
}

impl ProgressEvent {
    /// A non-download status event.
    pub fn stage(kind: ArtifactKind, message: impl Into<String>, percent: f64) -> Self {
        Self {
            kind,
            message: message.into(),
            percent: percent.clamp(0.0, 1.0),
            source_label: String::new(),
            file_name: String::new(),
            downloaded: 0,
            total: 0,
            speed_mbps: 0.0,
            is_download_phase: false,
        }
    }
}

/// Callback receiving progress events.
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Producer side of the bounded progress channel.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: SyncSender<ProgressEvent>,
}

impl ProgressSink {
    /// Publish an event, dropping it if the channel is full or closed.
    ///
    /// Returns whether the event was queued.
    pub fn publish(&self, event: ProgressEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Adapt this sink into a callback usable by the updaters.
    pub fn into_callback(self) -> ProgressCallback {
        Arc::new(move |event: &ProgressEvent| {
            self.publish(event.clone());
        })
    }
}

/// Create a bounded progress channel.
pub fn progress_channel(capacity: usize) -> (ProgressSink, Receiver<ProgressEvent>) {
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    (ProgressSink { tx }, rx)
}

/// Final outcome of one artifact run.
#[derive(Debug, Clone)]
pub struct RunCompletion {
    /// Artifact the run belonged to.
    pub kind: ArtifactKind,
    /// Outcome of the run, or the rendered error.
    ///
    /// The typed error stays with the caller's report; this signal only
    /// needs to be displayable.
    pub result: Result<RunOutcome, String>,
}

/// Create the unbounded completion channel.
pub fn completion_channel() -> (Sender<RunCompletion>, Receiver<RunCompletion>) {
    mpsc::channel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::updater::error::UpdateError;

    #[test]
    fn test_stage_event_clamps_percent() {
        let event = ProgressEvent::stage(ArtifactKind::Dict, "Extracting", 1.7);
        assert_eq!(event.percent, 1.0);
        assert!(!event.is_download_phase);
    }

    #[test]
    fn test_full_channel_drops_instead_of_blocking() {
        let (sink, rx) = progress_channel(2);

        assert!(sink.publish(ProgressEvent::stage(ArtifactKind::Scheme, "a", 0.1)));
        assert!(sink.publish(ProgressEvent::stage(ArtifactKind::Scheme, "b", 0.2)));
        assert!(!sink.publish(ProgressEvent::stage(ArtifactKind::Scheme, "c", 0.3)));

        let received: Vec<String> = rx.try_iter().map(|e| e.message).collect();
        assert_eq!(received, vec!["a", "b"]);
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let (sink, rx) = progress_channel(4);
        drop(rx);
        assert!(!sink.publish(ProgressEvent::stage(ArtifactKind::Model, "x", 0.0)));
    }

    #[test]
    fn test_callback_forwards_events() {
        let (sink, rx) = progress_channel(4);
        let callback = sink.into_callback();
        callback(&ProgressEvent::stage(ArtifactKind::Model, "Downloading", 0.5));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, ArtifactKind::Model);
        assert_eq!(event.message, "Downloading");
    }

    #[test]
    fn test_completion_channel_is_unbounded() {
        let (tx, rx) = completion_channel();
        for _ in 0..1000 {
            tx.send(RunCompletion {
                kind: ArtifactKind::Dict,
                result: Err(UpdateError::DeployFailed("x".into()).to_string()),
            })
            .unwrap();
        }
        assert_eq!(rx.try_iter().count(), 1000);
    }
}
