use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async lock per (user, quiz) session. Request handlers and the
/// countdown's auto-submit take it around every load-modify-save cycle.
#[derive(Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, user_id: &str, quiz_id: &str) -> OwnedMutexGuard<()> {
        let session = {
            let mut locks = self.locks.lock().await;
            // Unreferenced entries belong to sessions nobody holds or waits on.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                locks
                    .entry((user_id.to_string(), quiz_id.to_string()))
                    .or_default(),
            )
        };
        session.lock_owned().await
    }
}
