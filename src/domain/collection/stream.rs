//! Abortable KOSPI200 batch run over an event stream.

use super::sse::SseDecoder;
use super::wire::BatchProgress;
use crate::error::SdkError;

use futures_util::stream::{AbortHandle, Abortable, BoxStream};
use futures_util::{Stream, StreamExt};

/// Lifecycle of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchRunState {
    Running,
    /// The server reported `completed: true`.
    Completed,
    /// Aborted, failed, or the stream ended early.
    Idle,
}

/// Cloneable handle that stops a [`BatchRun`] from another task.
#[derive(Debug, Clone)]
pub struct BatchAbort(AbortHandle);

impl BatchAbort {
    pub fn abort(&self) {
        self.0.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.0.is_aborted()
    }
}

/// A running batch collection. Pull events with [`BatchRun::next`].
pub struct BatchRun {
    /// Dropped once the run stops, which closes the response body.
    events: Option<Abortable<BoxStream<'static, Result<BatchProgress, SdkError>>>>,
    handle: AbortHandle,
    state: BatchRunState,
    last: Option<BatchProgress>,
}

impl BatchRun {
    /// Decode progress events from a byte stream, e.g. a response body.
    pub fn from_byte_stream<S, B, E>(bytes: S) -> Self
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: AsRef<[u8]> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let events = async_stream::stream! {
            let mut decoder = SseDecoder::new();
            futures_util::pin_mut!(bytes);
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => {
                        for progress in decoder.push(chunk.as_ref()) {
                            yield Ok(progress);
                        }
                    }
                    Err(e) => {
                        yield Err(SdkError::Stream(e.to_string()));
                        return;
                    }
                }
            }
            if let Some(progress) = decoder.finish() {
                yield Ok(progress);
            }
        };

        let (handle, registration) = AbortHandle::new_pair();
        Self {
            events: Some(Abortable::new(events.boxed(), registration)),
            handle,
            state: BatchRunState::Running,
            last: None,
        }
    }

    /// Next progress event. `None` once the run is completed, aborted,
    /// failed or the stream has ended.
    pub async fn next(&mut self) -> Option<Result<BatchProgress, SdkError>> {
        if self.state != BatchRunState::Running {
            self.events = None;
            return None;
        }
        let events = self.events.as_mut()?;

        match events.next().await {
            Some(Ok(progress)) => {
                tracing::debug!(
                    processed = progress.processed_count,
                    total = progress.total_count,
                    stock = ?progress.current_stock_code,
                    "Batch progress"
                );
                if progress.completed {
                    tracing::info!(
                        saved = progress.cumulative_saved_count,
                        received = progress.cumulative_received_count,
                        "Batch collection completed"
                    );
                    self.state = BatchRunState::Completed;
                    self.events = None;
                }
                self.last = Some(progress.clone());
                Some(Ok(progress))
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, "Batch stream failed");
                self.state = BatchRunState::Idle;
                self.events = None;
                Some(Err(e))
            }
            None => {
                if self.handle.is_aborted() {
                    tracing::info!("Batch collection aborted");
                } else {
                    tracing::warn!("Batch stream ended before completion");
                }
                self.state = BatchRunState::Idle;
                self.events = None;
                None
            }
        }
    }

    /// Drain the run, returning the last event seen.
    pub async fn wait(mut self) -> Result<Option<BatchProgress>, SdkError> {
        while let Some(event) = self.next().await {
            event?;
        }
        Ok(self.last)
    }

    /// Stop the run and release the underlying stream.
    pub fn abort(&mut self) {
        self.handle.abort();
        self.state = BatchRunState::Idle;
        self.events = None;
    }

    /// Whether the underlying stream is still held.
    pub fn is_open(&self) -> bool {
        self.events.is_some()
    }

    pub fn abort_handle(&self) -> BatchAbort {
        BatchAbort(self.handle.clone())
    }

    pub fn state(&self) -> BatchRunState {
        self.state
    }

    pub fn last_progress(&self) -> Option<&BatchProgress> {
        self.last.as_ref()
    }
}

impl std::fmt::Debug for BatchRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRun")
            .field("state", &self.state)
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}
