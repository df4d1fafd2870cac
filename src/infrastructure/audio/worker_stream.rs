use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

use crate::application::ports::{RecognizedSegment, SegmentStream, TranscriptionError};

pub type SegmentReceiver = mpsc::Receiver<Result<RecognizedSegment, TranscriptionError>>;

/// Segments sent by a blocking decode worker, followed by an error item if the worker
/// did not run to completion. A closed channel alone is not treated as success.
pub fn worker_segments(receiver: SegmentReceiver, worker: JoinHandle<()>) -> SegmentStream {
    let received = futures::stream::unfold(receiver, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    });

    let outcome = futures::stream::once(worker).filter_map(|joined| async move {
        joined.err().map(|e| Err(worker_failed(e)))
    });

    received.chain(outcome).boxed()
}

pub fn worker_failed(err: JoinError) -> TranscriptionError {
    if err.is_panic() {
        tracing::error!(error = %err, "Transcription worker panicked");
        TranscriptionError::TranscriptionFailed(format!("transcription worker panicked: {}", err))
    } else {
        TranscriptionError::TranscriptionFailed(format!("transcription worker aborted: {}", err))
    }
}
