//! Waits for controllers to finish their initial sync

use std::sync::Arc;
use tokio::sync::Semaphore;

/// Tracks process initialization
///
/// Issues a [`Handle`] to each component that must initialize before the
/// process is ready, and completes once every handle has been dropped.
#[derive(Debug)]
pub struct Initialized {
    semaphore: Arc<Semaphore>,
    issued: u32,
}

/// Signals that a component has initialized when dropped
#[derive(Debug)]
#[must_use]
pub struct Handle(Arc<Semaphore>);

impl Default for Initialized {
    fn default() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(0)),
            issued: 0,
        }
    }
}

impl Initialized {
    pub fn add_handle(&mut self) -> Handle {
        self.issued += 1;
        Handle(self.semaphore.clone())
    }

    /// Waits for all issued handles to be dropped.
    pub async fn initialized(self) {
        let _permit = self
            .semaphore
            .acquire_many(self.issued)
            .await
            .expect("semaphore cannot be closed");
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.0.add_permits(1);
    }
}
