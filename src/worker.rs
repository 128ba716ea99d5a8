//! Runs a [`SnapEngine`] on a dedicated thread.
//!
//! The worker owns the engine: requests and responses are immutable values exchanged over
//! channels, no state is shared with the caller.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::{CycleOutput, FeedSnapshot, ShapeIndex, SnapConfig, SnapEngine, Timestamp};

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerRequest {
    Refresh {
        snapshot: FeedSnapshot,
        now: Timestamp,
    },
    SetConfig(SnapConfig),
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerResponse {
    /// Output of a successful refresh cycle.
    Update(CycleOutput),
    /// The refresh cycle failed, the engine state is unchanged.
    Error(EngineError),
}

pub struct SnapWorker {
    requests: Sender<WorkerRequest>,
    responses: Receiver<WorkerResponse>,
    handle: Option<JoinHandle<()>>,
}

impl SnapWorker {
    /// Moves the engine to a new thread and starts serving requests.
    pub fn spawn<S>(engine: SnapEngine<S>) -> Result<Self, EngineError>
    where
        S: ShapeIndex + Send + 'static,
    {
        let (requests, request_receiver) = channel::unbounded();
        let (response_sender, responses) = channel::unbounded();

        let handle = thread::Builder::new()
            .name("trailsnap-worker".into())
            .spawn(move || serve(engine, request_receiver, response_sender))?;

        Ok(Self {
            requests,
            responses,
            handle: Some(handle),
        })
    }

    /// Queues a refresh cycle, its output is received with [`SnapWorker::recv`].
    pub fn refresh(&self, snapshot: FeedSnapshot, now: Timestamp) -> Result<(), EngineError> {
        self.send(WorkerRequest::Refresh { snapshot, now })
    }

    /// Replaces the engine configuration, effective from the next queued refresh.
    pub fn set_config(&self, config: SnapConfig) -> Result<(), EngineError> {
        self.send(WorkerRequest::SetConfig(config))
    }

    /// Blocks until the next response.
    pub fn recv(&self) -> Result<WorkerResponse, EngineError> {
        self.responses
            .recv()
            .map_err(|_| EngineError::WorkerDisconnected)
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<WorkerResponse>, EngineError> {
        match self.responses.recv_timeout(timeout) {
            Ok(response) => Ok(Some(response)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::WorkerDisconnected),
        }
    }

    /// Gets the next response if one is ready.
    pub fn try_recv(&self) -> Result<Option<WorkerResponse>, EngineError> {
        match self.responses.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(EngineError::WorkerDisconnected),
        }
    }

    /// Stops the worker after the requests already queued are served.
    pub fn shutdown(mut self) -> Result<(), EngineError> {
        self.stop()
    }

    fn send(&self, request: WorkerRequest) -> Result<(), EngineError> {
        self.requests
            .send(request)
            .map_err(|_| EngineError::WorkerDisconnected)
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        // the worker may already be gone, joining tells if it panicked
        let _ = self.requests.send(WorkerRequest::Shutdown);
        handle.join().map_err(|_| EngineError::WorkerDisconnected)
    }
}

impl Drop for SnapWorker {
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            warn!("Snap worker stopped abnormally: {error}");
        }
    }
}

fn serve<S: ShapeIndex>(
    mut engine: SnapEngine<S>,
    requests: Receiver<WorkerRequest>,
    responses: Sender<WorkerResponse>,
) {
    debug!("Snap worker started");

    for request in requests {
        let response = match request {
            WorkerRequest::Refresh { snapshot, now } => match engine.refresh(&snapshot, now) {
                Ok(output) => WorkerResponse::Update(output),
                Err(error) => WorkerResponse::Error(error),
            },
            WorkerRequest::SetConfig(config) => {
                engine.set_config(config);
                continue;
            }
            WorkerRequest::Shutdown => break,
        };

        if responses.send(response).is_err() {
            debug!("Response receiver dropped");
            break;
        }
    }

    debug!("Snap worker stopped");
}
