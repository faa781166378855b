use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting permit pool bounding how much work runs at once.
///
/// The pool knows nothing about how work is launched: callers acquire a
/// [`WorkerPermit`] before starting a unit of work and hold it until the work
/// ends. Dropping the permit returns capacity, so release happens on success,
/// failure and panic unwinding alike.
///
/// The pool also tracks how many permits are currently out and the highest
/// count ever observed, which is how the concurrency caps are verified.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    counters: Arc<Counters>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct Counters {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Capacity token handed out by [`WorkerPool::acquire`].
#[derive(Debug)]
pub struct WorkerPermit {
    _permit: OwnedSemaphorePermit,
    counters: Arc<Counters>,
}

impl WorkerPool {
    /// Creates a pool with `capacity` permits.
    ///
    /// A zero capacity is raised to one: a pool that can never grant a permit
    /// would block its callers forever.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            counters: Arc::new(Counters::default()),
            capacity,
        }
    }

    /// Waits for a free permit.
    pub async fn acquire(&self) -> WorkerPermit {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("worker pool semaphore is never closed");

        let now = self.counters.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.counters.peak.fetch_max(now, Ordering::AcqRel);

        WorkerPermit {
            _permit: permit,
            counters: Arc::clone(&self.counters),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently held.
    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::Acquire)
    }

    /// Highest number of permits held at the same time since creation.
    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::Acquire)
    }
}

impl Drop for WorkerPermit {
    fn drop(&mut self) {
        // Runs before the semaphore permit field is dropped, so in_flight
        // never reads above capacity.
        self.counters.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
