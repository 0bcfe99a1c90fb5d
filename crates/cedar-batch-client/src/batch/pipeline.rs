//! Fan-out / fan-in pipeline behind batch checks.
//!
//! ```text
//!                 hand-off queue            output queue
//! ┌──────────┐   ┌─────────────┐  worker 1  ┌──────────┐   ┌────────────┐
//! │ requests │──▶│  producer   │──worker 2─▶│ (req,dec)│──▶│ aggregator │
//! └──────────┘   └─────────────┘  worker N  └──────────┘   └────────────┘
//! ```
//!
//! All stages share one cancellation token and one single-assignment error
//! slot. The first failure is kept, later ones are dropped, and every blocking
//! send or receive in the producer and workers races the token.

use std::collections::HashMap;
use std::future::{self, Future};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use cedar_batch_domain::{BatchInput, Decision, Evaluator, Request};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

use super::types::{BatchCheckError, BatchDecisions, BatchOptions, BatchOutcome, CancelCause};

/// Capacity of the hand-off and output queues.
///
/// Tokio needs at least one slot; a single slot keeps each hand-off close to
/// a rendezvous so at most one request waits between producer and workers.
const QUEUE_CAPACITY: usize = 1;

type Evaluated = (Request, Decision);

/// Cancellation token plus the first-error slot shared by every stage.
#[derive(Clone)]
struct Abort {
    token: CancellationToken,
    first_error: Arc<OnceLock<BatchCheckError>>,
}

impl Abort {
    fn new(token: CancellationToken) -> Self {
        Self {
            token,
            first_error: Arc::new(OnceLock::new()),
        }
    }

    /// Records `err` unless an earlier error is already recorded, then
    /// cancels the batch.
    fn fail(&self, err: BatchCheckError) {
        if let Err(discarded) = self.first_error.set(err) {
            debug!(error = %discarded, "discarding error raised after the first failure");
        }
        self.token.cancel();
    }

    /// Called by a stage that saw the token fire. If nothing inside the
    /// pipeline caused it, the caller did.
    fn observe_cancellation(&self) {
        let _ = self.first_error.set(BatchCheckError::Cancelled {
            cause: CancelCause::Caller,
        });
    }

    fn first_error(&self) -> Option<BatchCheckError> {
        self.first_error.get().cloned()
    }
}

/// Owns the pool's master output sender and drops it when the last worker
/// exits, which closes the output queue for the aggregator.
struct OutputCloser {
    running: AtomicUsize,
    sender: Mutex<Option<mpsc::Sender<Evaluated>>>,
}

impl OutputCloser {
    fn new(workers: usize, sender: mpsc::Sender<Evaluated>) -> Self {
        Self {
            running: AtomicUsize::new(workers),
            sender: Mutex::new(Some(sender)),
        }
    }

    fn close(&self) {
        let sender = match self.sender.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(sender);
    }
}

/// Decrements the running-worker count when a worker exits, including
/// while unwinding from a panic.
struct WorkerGuard {
    closer: Arc<OutputCloser>,
    worker: usize,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        if self.closer.running.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.closer.close();
            debug!(worker = self.worker, "last worker finished; output queue closed");
        }
    }
}

/// Evaluates every request in `input` with up to `options.parallelism`
/// concurrent evaluator calls.
///
/// Returns the decisions gathered so far together with the first error.
/// A zero parallelism is rejected before any task starts. Once the batch is
/// cancelled (by the caller, the timeout, or an evaluation failure) no new
/// evaluations begin; calls already in flight run to completion.
#[instrument(skip_all, fields(parallelism = options.parallelism, requests = input.len_hint()))]
pub async fn run_batch<E>(
    evaluator: Arc<E>,
    input: BatchInput,
    options: BatchOptions,
) -> BatchOutcome
where
    E: Evaluator + ?Sized + 'static,
{
    if options.parallelism == 0 {
        return BatchOutcome::failed(BatchCheckError::InvalidParallelism {
            parallelism: options.parallelism,
        });
    }

    let requests = input.normalize();
    let total = requests.len();
    debug!(total, "starting batch");

    let token = match &options.cancel {
        Some(parent) => parent.child_token(),
        None => CancellationToken::new(),
    };
    let abort = Abort::new(token);

    let (request_tx, request_rx) = mpsc::channel::<Request>(QUEUE_CAPACITY);
    let (output_tx, output_rx) = mpsc::channel::<Evaluated>(QUEUE_CAPACITY);
    let request_rx = Arc::new(AsyncMutex::new(request_rx));

    let aggregator = tokio::spawn(aggregate(output_rx, total));

    let mut stages = JoinSet::new();
    let workers = options.parallelism;
    let senders: Vec<_> = (0..workers).map(|_| output_tx.clone()).collect();
    let closer = Arc::new(OutputCloser::new(workers, output_tx));
    for (worker, output) in senders.into_iter().enumerate() {
        let guard = WorkerGuard {
            closer: Arc::clone(&closer),
            worker,
        };
        stages.spawn(work(
            worker,
            Arc::clone(&evaluator),
            Arc::clone(&request_rx),
            output,
            abort.clone(),
            guard,
        ));
    }
    drop(request_rx);
    stages.spawn(produce(requests, request_tx, abort.clone()));

    let deadline = expire_after(options.timeout);
    tokio::pin!(deadline);
    let mut deadline_fired = false;
    loop {
        tokio::select! {
            joined = stages.join_next() => match joined {
                None => break,
                Some(Ok(())) => {}
                Some(Err(err)) => {
                    error!(error = %err, "batch stage terminated abnormally");
                    abort.fail(BatchCheckError::TaskFailed {
                        message: err.to_string(),
                    });
                }
            },
            () = &mut deadline, if !deadline_fired => {
                deadline_fired = true;
                warn!(timeout = ?options.timeout, "batch deadline exceeded");
                abort.fail(BatchCheckError::Cancelled {
                    cause: CancelCause::DeadlineExceeded,
                });
            }
        }
    }

    let decisions = match aggregator.await {
        Ok(decisions) => decisions,
        Err(err) => {
            error!(error = %err, "aggregator terminated abnormally");
            abort.fail(BatchCheckError::TaskFailed {
                message: err.to_string(),
            });
            HashMap::new()
        }
    };

    let error = abort.first_error();
    debug!(
        collected = decisions.len(),
        failed = error.is_some(),
        "batch finished"
    );
    BatchOutcome { decisions, error }
}

/// Completes after `timeout`, or never when there is none.
fn expire_after(timeout: Option<Duration>) -> impl Future<Output = ()> {
    async move {
        match timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => future::pending().await,
        }
    }
}

/// Feeds requests to the workers one at a time. Dropping `tx` on return
/// closes the hand-off queue.
async fn produce(requests: Vec<Request>, tx: mpsc::Sender<Request>, abort: Abort) {
    for request in requests {
        tokio::select! {
            biased;
            _ = abort.token.cancelled() => {
                abort.observe_cancellation();
                return;
            }
            sent = tx.send(request) => {
                if sent.is_err() {
                    // Every worker is gone.
                    return;
                }
            }
        }
    }
}

async fn work<E>(
    worker: usize,
    evaluator: Arc<E>,
    requests: Arc<AsyncMutex<mpsc::Receiver<Request>>>,
    output: mpsc::Sender<Evaluated>,
    abort: Abort,
    _guard: WorkerGuard,
) where
    E: Evaluator + ?Sized,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = abort.token.cancelled() => {
                abort.observe_cancellation();
                return;
            }
            next = next_request(&requests) => next,
        };
        let Some(request) = next else {
            return;
        };

        match evaluator.evaluate(&request).await {
            Ok(decision) => {
                // A finished evaluation is still delivered if the queue has
                // room, even when the batch was cancelled meanwhile.
                tokio::select! {
                    biased;
                    sent = output.send((request, decision)) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                    _ = abort.token.cancelled() => {
                        abort.observe_cancellation();
                        return;
                    }
                }
            }
            Err(source) => {
                warn!(
                    worker,
                    principal = %request.principal,
                    action = %request.action,
                    resource = %request.resource,
                    error = %source,
                    "evaluation failed; aborting batch"
                );
                abort.fail(BatchCheckError::evaluation(request, source));
                return;
            }
        }
    }
}

async fn next_request(requests: &AsyncMutex<mpsc::Receiver<Request>>) -> Option<Request> {
    requests.lock().await.recv().await
}

/// Drains the output queue until the last worker closes it. The map is
/// owned here alone, so no locking is involved.
async fn aggregate(mut rx: mpsc::Receiver<Evaluated>, expected: usize) -> BatchDecisions {
    let mut decisions = HashMap::with_capacity(expected);
    while let Some((request, decision)) = rx.recv().await {
        decisions.insert(request, decision);
    }
    decisions
}
