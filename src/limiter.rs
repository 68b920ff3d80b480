//! Admission control for conversions.
//!
//! Rasterization is CPU-bound, so the number of conversions running at once is
//! capped independently of how many connections the server accepts. Waiting
//! requests are admitted in arrival order (tokio's semaphore is fair), so no
//! request starves while slots are being freed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::error::ConvertError;

/// Default number of simultaneous conversions.
pub const DEFAULT_MAX_CONCURRENT_CONVERSIONS: usize = 10;

/// Bounds the number of conversions executing at the same time.
///
/// Cloning is cheap; clones share the same slots.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
    admission_timeout: Option<Duration>,
}

impl ConcurrencyLimiter {
    /// Create a limiter with `capacity` slots and no admission timeout.
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
            admission_timeout: None,
        }
    }

    /// Give up waiting for a slot after `timeout`.
    pub fn with_admission_timeout(mut self, timeout: Duration) -> Self {
        self.admission_timeout = Some(timeout);
        self
    }

    /// Wait for a free slot.
    ///
    /// Without an admission timeout this waits indefinitely. With one, it
    /// fails with [`ConvertError::Overloaded`] once the timeout elapses.
    pub async fn acquire(&self) -> Result<ConversionSlot, ConvertError> {
        let acquire = Arc::clone(&self.semaphore).acquire_owned();

        let permit = match self.admission_timeout {
            None => acquire.await.map_err(|_| ConvertError::LimiterClosed)?,
            Some(waited) => match tokio::time::timeout(waited, acquire).await {
                Ok(permit) => permit.map_err(|_| ConvertError::LimiterClosed)?,
                Err(_) => {
                    warn!(
                        capacity = self.capacity,
                        "No conversion slot became free within {:?}", waited
                    );
                    return Err(ConvertError::Overloaded { waited });
                }
            },
        };

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(running, capacity = self.capacity, "Conversion slot acquired");

        Ok(ConversionSlot {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Stop admitting; pending and future acquisitions fail.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Number of slots currently held.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn admission_timeout(&self) -> Option<Duration> {
        self.admission_timeout
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_CONVERSIONS)
    }
}

/// One unit of admission capacity, returned to the limiter on drop.
#[derive(Debug)]
pub struct ConversionSlot {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for ConversionSlot {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Tests
// =============================================================================
