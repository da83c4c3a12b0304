use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::task::JoinSet;
use tracing::error;

/// FIFO of pending work items shared by the workers of one phase.
#[derive(Debug)]
pub struct WorkQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> WorkQueue<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: Mutex::new(items.into_iter().collect()),
        }
    }

    pub fn pop(&self) -> Option<T> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Results pushed by concurrent workers, drained by the coordinator once the
/// phase has joined.
#[derive(Debug)]
pub struct Collector<T> {
    items: Mutex<Vec<T>>,
}

impl<T> Default for Collector<T> {
    fn default() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }
}

impl<T> Collector<T> {
    pub fn push(&self, item: T) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item);
    }

    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.items.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Spawns `workers` tasks built by `make` and waits for all of them. A
/// panicking worker is logged; the phase still completes.
pub async fn run_workers<F, Fut>(phase: &'static str, workers: usize, make: F)
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut join_set = JoinSet::new();
    for worker in 0..workers {
        join_set.spawn(make(worker));
    }

    while let Some(joined) = join_set.join_next().await {
        if let Err(e) = joined {
            error!(phase, error = %e, "Worker task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_workers_drain_queue() {
        let queue = Arc::new(WorkQueue::new(0..100usize));
        let total = Arc::new(AtomicUsize::new(0));

        run_workers("test", 4, |_| {
            let queue = queue.clone();
            let total = total.clone();
            async move {
                while let Some(n) = queue.pop() {
                    total.fetch_add(n, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                }
            }
        })
        .await;

        assert!(queue.is_empty());
        assert_eq!(total.load(Ordering::SeqCst), (0..100).sum::<usize>());
    }

    #[tokio::test]
    async fn test_panicking_worker_does_not_abort_phase() {
        let collector = Arc::new(Collector::default());
        run_workers("test", 3, |i| {
            let collector = collector.clone();
            async move {
                if i == 1 {
                    panic!("worker failure");
                }
                collector.push(i);
            }
        })
        .await;

        let mut seen = collector.take();
        seen.sort();
        assert_eq!(seen, vec![0, 2]);
    }
}
