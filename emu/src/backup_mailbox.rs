use std::sync::{Mutex, PoisonError};

/// Latest backup content published by the emulator thread, waiting to be persisted.
///
/// Only the newest copy matters: publishing again before anyone took the previous one
/// overwrites it.
#[derive(Debug, Default)]
pub struct BackupMailbox {
    latest: Mutex<Option<Vec<u8>>>,
}

impl BackupMailbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, data: &[u8]) {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        match latest.as_mut() {
            Some(buffer) => {
                buffer.clear();
                buffer.extend_from_slice(data);
            }
            None => *latest = Some(data.to_vec()),
        }
    }

    /// Take the pending copy, if something was published since the last call.
    pub fn take(&self) -> Option<Vec<u8>> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
