//! Event-loop side handle to the store worker.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::JoinHandle;

use crate::domain::error::{Result, ShellError};
use crate::storage::backend::Storage;
use crate::worker::handler::{self, Envelope, StoreWorker};
use crate::worker::messages::{Completion, StoreRequest, StoreResponse, Ticket};

/// Submits store requests without blocking and collects their completions.
///
/// Requests are answered strictly in submission order. `poll` never blocks; `wait`
/// blocks for one ticket and buffers any earlier completions so `poll` still
/// returns them afterwards, in order.
pub struct StoreClient {
    requests: Sender<Envelope>,
    completions: Receiver<Completion>,
    ready: VecDeque<Completion>,
    next_ticket: u64,
    outstanding: usize,
    handle: Option<JoinHandle<()>>,
}

impl StoreClient {
    /// Spawns the worker thread that owns `storage` and opens it there.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(storage: Box<dyn Storage>) -> Result<Self> {
        let (request_tx, request_rx) = mpsc::channel();
        let (completion_tx, completion_rx) = mpsc::channel();
        let worker = StoreWorker::new(storage);

        let handle = std::thread::Builder::new()
            .name("tabshell-store".to_string())
            .spawn(move || handler::run(worker, request_rx, completion_tx))?;

        Ok(Self {
            requests: request_tx,
            completions: completion_rx,
            ready: VecDeque::new(),
            next_ticket: 0,
            outstanding: 0,
            handle: Some(handle),
        })
    }

    /// Queues a request and returns its ticket.
    ///
    /// Never fails: if the worker is gone the completion is an immediate
    /// [`StoreResponse::Error`].
    pub fn submit(&mut self, request: StoreRequest) -> Ticket {
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        tracing::trace!(%ticket, operation = request.name(), "store request submitted");

        let envelope = Envelope {
            ticket,
            request,
            parent: tracing::Span::current(),
        };

        match self.requests.send(envelope) {
            Ok(()) => self.outstanding += 1,
            Err(mpsc::SendError(envelope)) => {
                tracing::warn!(%ticket, operation = envelope.request.name(), "store worker is not running");
                self.ready.push_back(Completion {
                    ticket,
                    response: StoreResponse::Error {
                        message: format!("{}: store worker is not running", envelope.request.name()),
                        not_found: false,
                    },
                });
            }
        }

        ticket
    }

    /// Returns the next completion if one is available.
    pub fn poll(&mut self) -> Option<Completion> {
        if let Some(completion) = self.ready.pop_front() {
            return Some(completion);
        }

        match self.completions.try_recv() {
            Ok(completion) => {
                self.outstanding = self.outstanding.saturating_sub(1);
                Some(completion)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => self.fail_outstanding(),
        }
    }

    /// Blocks for the next completion. `None` once nothing is outstanding.
    pub fn next_blocking(&mut self) -> Option<Completion> {
        if let Some(completion) = self.ready.pop_front() {
            return Some(completion);
        }
        if self.outstanding == 0 {
            return None;
        }

        match self.completions.recv() {
            Ok(completion) => {
                self.outstanding -= 1;
                Some(completion)
            }
            Err(_) => self.fail_outstanding(),
        }
    }

    /// Blocks until `ticket` completes and returns its response.
    ///
    /// Completions for other tickets that arrive first stay queued for `poll`.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Worker`] if the worker exits before answering.
    pub fn wait(&mut self, ticket: Ticket) -> Result<StoreResponse> {
        if let Some(index) = self.ready.iter().position(|c| c.ticket == ticket) {
            if let Some(completion) = self.ready.remove(index) {
                return Ok(completion.response);
            }
        }

        loop {
            let completion = self
                .completions
                .recv()
                .map_err(|_| ShellError::Worker(format!("store worker exited before answering {ticket}")))?;
            self.outstanding = self.outstanding.saturating_sub(1);

            if completion.ticket == ticket {
                return Ok(completion.response);
            }
            self.ready.push_back(completion);
        }
    }

    /// Submits a request and blocks for its response.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Worker`] if the worker exits before answering.
    pub fn request(&mut self, request: StoreRequest) -> Result<StoreResponse> {
        let ticket = self.submit(request);
        self.wait(ticket)
    }

    /// `true` when every submitted request has been handed back.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.outstanding == 0 && self.ready.is_empty()
    }

    /// Closes the store after all earlier requests and joins the worker thread.
    ///
    /// Completions still pending are dropped. Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Returns an error if the store failed to close.
    pub fn shutdown(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        let outcome = match self.request(StoreRequest::Shutdown)? {
            StoreResponse::Error { message, .. } => Err(ShellError::Worker(message)),
            _ => Ok(()),
        };

        if handle.join().is_err() {
            tracing::error!("store worker panicked");
        }
        self.ready.clear();
        self.outstanding = 0;
        outcome
    }

    /// The worker died; nothing outstanding will complete.
    fn fail_outstanding(&mut self) -> Option<Completion> {
        if self.outstanding > 0 {
            tracing::error!(outstanding = self.outstanding, "store worker disconnected");
        }
        self.outstanding = 0;
        None
    }
}

impl Drop for StoreClient {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(e) = self.shutdown() {
                tracing::warn!(error = %e, "store shutdown on drop failed");
            }
        }
    }
}

impl std::fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient")
            .field("next_ticket", &self.next_ticket)
            .field("outstanding", &self.outstanding)
            .field("ready", &self.ready.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;

    fn client() -> StoreClient {
        StoreClient::spawn(Box::new(SqliteStorage::in_memory())).unwrap()
    }

    #[test]
    fn completions_arrive_in_submission_order() {
        let mut client = client();
        let first = client.submit(StoreRequest::RecordVisit {
            url: "https://a.test".into(),
            title: "A".into(),
        });
        let second = client.submit(StoreRequest::ListHistory { limit: 10 });

        let mut seen = Vec::new();
        while let Some(completion) = client.next_blocking() {
            seen.push(completion);
        }

        assert_eq!(seen.iter().map(|c| c.ticket).collect::<Vec<_>>(), vec![first, second]);
        match &seen[1].response {
            StoreResponse::History { entries } => assert_eq!(entries.len(), 1),
            other => panic!("unexpected response: {other:?}"),
        }
        assert!(client.is_idle());
    }

    #[test]
    fn wait_keeps_earlier_completions_for_poll() {
        let mut client = client();
        let first = client.submit(StoreRequest::GetAllSettings);
        let second = client.submit(StoreRequest::LoadTabSnapshot);

        let response = client.wait(second).unwrap();
        assert_eq!(response, StoreResponse::Snapshot { tabs: Vec::new() });

        let buffered = client.poll().unwrap();
        assert_eq!(buffered.ticket, first);
        assert!(client.poll().is_none());
    }

    #[test]
    fn requests_after_shutdown_fail_fast() {
        let mut client = client();
        client.shutdown().unwrap();
        client.shutdown().unwrap();

        let ticket = client.submit(StoreRequest::ClearHistory);
        let completion = client.poll().unwrap();
        assert_eq!(completion.ticket, ticket);
        assert!(completion.response.is_error());
    }
}
