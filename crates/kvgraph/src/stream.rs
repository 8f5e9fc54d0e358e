//! Lazy relation streams and the fan-in combinator behind them.
//!
//! Every traversal runs one or more *producers* on worker threads. Each
//! producer pushes into a shared bounded channel through a [`RelationSink`].
//! A coordinator thread owns the first sender and joins every producer
//! before dropping it; the consumer therefore sees the end of the stream
//! exactly when all producers are done, never earlier.
//!
//! Dropping a [`RelationStream`] (or calling [`RelationStream::cancel`])
//! trips a shared [`CancelToken`] and drops the receiving end. A producer
//! blocked on a full channel wakes up with a send error, a running one sees
//! the token at its next checkpoint, and both exit. Abandoning a stream
//! half-way therefore never leaves threads parked forever.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use kvgraph_core::Relation;

use crate::error::GraphError;

/// One item of a relation stream.
pub type RelationResult = Result<Relation, GraphError>;

/// Shared cancellation flag between a stream and its producers.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Producer-side handle onto a stream.
pub struct RelationSink {
    tx: SyncSender<RelationResult>,
    cancel: CancelToken,
}

impl RelationSink {
    /// Delivers one item, blocking while the channel is full.
    ///
    /// Returns `false` once the stream was cancelled or its consumer is
    /// gone; the producer must stop.
    pub fn emit(&self, item: RelationResult) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.tx.send(item).is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A unit of work feeding a stream.
pub type Producer = Box<dyn FnOnce(&RelationSink) + Send + 'static>;

type RelationFilter = Box<dyn Fn(&Relation) -> bool + Send + 'static>;

/// A lazy, finite stream of relations.
///
/// Items arrive in no particular order. A backend failure inside a producer
/// is delivered as an `Err` item.
pub struct RelationStream {
    rx: Receiver<RelationResult>,
    cancel: CancelToken,
    filter: Option<RelationFilter>,
}

impl RelationStream {
    /// Runs `producers` concurrently and merges their output.
    ///
    /// `capacity` bounds the channel; `0` makes every hand-off a rendezvous.
    pub fn merge(label: &'static str, capacity: usize, producers: Vec<Producer>) -> Self {
        let (tx, rx) = mpsc::sync_channel(capacity);
        let cancel = CancelToken::new();

        let handles: Vec<JoinHandle<()>> = producers
            .into_iter()
            .map(|producer| {
                let sink = RelationSink {
                    tx: tx.clone(),
                    cancel: cancel.clone(),
                };
                thread::spawn(move || producer(&sink))
            })
            .collect();

        let coordinator_cancel = cancel.clone();
        thread::spawn(move || {
            let panicked = handles
                .into_iter()
                .map(JoinHandle::join)
                .filter(Result::is_err)
                .count();
            if panicked > 0 {
                tracing::error!("{} {} producer(s) panicked", panicked, label);
                if !coordinator_cancel.is_cancelled() {
                    let _ = tx.send(Err(GraphError::Traversal {
                        reason: format!("{panicked} {label} producer(s) panicked"),
                    }));
                }
            }
            // Last sender goes away here, after every producer has joined.
            drop(tx);
        });

        RelationStream {
            rx,
            cancel,
            filter: None,
        }
    }

    /// Keeps only relations accepted by `keep`. Errors always pass through.
    pub fn filtered(mut self, keep: impl Fn(&Relation) -> bool + Send + 'static) -> Self {
        let combined: RelationFilter = match self.filter.take() {
            Some(previous) => {
                Box::new(move |relation: &Relation| previous(relation) && keep(relation))
            }
            None => Box::new(keep),
        };
        self.filter = Some(combined);
        self
    }

    /// Stops the producers. Items not yet received are discarded.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Iterator for RelationStream {
    type Item = RelationResult;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            let item = self.rx.recv().ok()?;
            match (&item, &self.filter) {
                (Ok(relation), Some(keep)) if !keep(relation) => continue,
                _ => return Some(item),
            }
        }
    }
}

impl Drop for RelationStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    fn counting_producer(host: &'static str, count: usize) -> Producer {
        Box::new(move |sink: &RelationSink| {
            for i in 0..count {
                if !sink.emit(Ok(Relation::new(host, format!("t{i}")))) {
                    return;
                }
            }
        })
    }

    #[test]
    fn test_merged_stream_yields_everything_then_ends() {
        let stream = RelationStream::merge(
            "test",
            0,
            vec![counting_producer("a", 5), counting_producer("b", 7)],
        );
        let relations: Vec<Relation> = stream.collect::<Result<_, _>>().unwrap();
        assert_eq!(relations.len(), 12);
        assert_eq!(relations.iter().filter(|r| r.host.as_str() == "a").count(), 5);
        assert_eq!(relations.iter().filter(|r| r.host.as_str() == "b").count(), 7);
    }

    #[test]
    fn test_empty_producer_list_ends_immediately() {
        let mut stream = RelationStream::merge("test", 4, Vec::new());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_filter_drops_rejected_relations() {
        let stream = RelationStream::merge("test", 1, vec![counting_producer("a", 10)])
            .filtered(|r| r.target.as_str().ends_with('3'));
        let relations: Vec<Relation> = stream.collect::<Result<_, _>>().unwrap();
        assert_eq!(relations, vec![Relation::new("a", "t3")]);
    }

    #[test]
    fn test_errors_pass_through_filter() {
        let failing: Producer = Box::new(|sink: &RelationSink| {
            sink.emit(Err(GraphError::Traversal {
                reason: "boom".into(),
            }));
        });
        let mut stream = RelationStream::merge("test", 0, vec![failing]).filtered(|_| false);
        assert!(matches!(stream.next(), Some(Err(GraphError::Traversal { .. }))));
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_producer_panic_surfaces_as_error() {
        let panicking: Producer = Box::new(|_sink: &RelationSink| panic!("producer died"));
        let items: Vec<RelationResult> =
            RelationStream::merge("test", 0, vec![panicking, counting_producer("a", 2)]).collect();
        assert_eq!(items.iter().filter(|item| item.is_ok()).count(), 2);
        assert!(items
            .iter()
            .any(|item| matches!(item, Err(GraphError::Traversal { .. }))));
    }

    #[test]
    fn test_dropping_early_releases_blocked_producers() {
        let finished = Arc::new(AtomicUsize::new(0));
        let producers: Vec<Producer> = (0..2)
            .map(|_| {
                let finished = Arc::clone(&finished);
                Box::new(move |sink: &RelationSink| {
                    // Would never finish if a blocked send were not released.
                    while sink.emit(Ok(Relation::new("h", "t"))) {}
                    finished.fetch_add(1, Ordering::SeqCst);
                }) as Producer
            })
            .collect();

        let mut stream = RelationStream::merge("test", 0, producers);
        assert!(stream.next().is_some());
        drop(stream);

        let deadline = Instant::now() + Duration::from_secs(5);
        while finished.load(Ordering::SeqCst) < 2 {
            assert!(Instant::now() < deadline, "producers still blocked after drop");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_cancel_ends_iteration() {
        let producer: Producer = Box::new(|sink: &RelationSink| {
            while sink.emit(Ok(Relation::new("h", "t"))) {}
        });
        let mut stream = RelationStream::merge("test", 0, vec![producer]);
        assert!(stream.next().is_some());
        stream.cancel();
        assert!(stream.is_cancelled());
        assert!(stream.next().is_none());
    }
}
