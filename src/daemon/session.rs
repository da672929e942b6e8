//! Cross-thread session state
//!
//! Owns the pending-creation counter, the pane-to-rule bindings and the
//! shutdown flag. Bindings are written by the UI thread only; the monitor
//! reads them when no creation is in flight.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::{ConfigStore, RuleHandle};

use super::backend::{PaneId, WindowId};

#[derive(Debug, Clone)]
pub struct Binding {
    pub window: WindowId,
    pub rule: RuleHandle,
}

#[derive(Debug)]
pub struct Session {
    store: Arc<ConfigStore>,
    pending_creations: AtomicUsize,
    bindings: Mutex<HashMap<PaneId, Binding>>,
    next_pane: AtomicU64,
    shutdown: AtomicBool,
}

impl Session {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self {
            store,
            pending_creations: AtomicUsize::new(0),
            bindings: Mutex::new(HashMap::new()),
            next_pane: AtomicU64::new(1),
            shutdown: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PaneId, Binding>> {
        self.bindings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn allocate_pane(&self) -> PaneId {
        PaneId(self.next_pane.fetch_add(1, Ordering::Relaxed))
    }

    pub fn pending_creations(&self) -> usize {
        self.pending_creations.load(Ordering::SeqCst)
    }

    pub fn is_idle(&self) -> bool {
        self.pending_creations() == 0
    }

    pub fn begin_creation(&self) {
        self.pending_creations.fetch_add(1, Ordering::SeqCst);
    }

    /// Called once per `begin_creation`, after a successful pane is bound
    pub fn finish_creation(&self) {
        let _ = self
            .pending_creations
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn bind(&self, pane: PaneId, window: WindowId, rule: RuleHandle) {
        self.lock().insert(pane, Binding { window, rule });
    }

    pub fn unbind(&self, pane: PaneId) -> Option<Binding> {
        self.lock().remove(&pane)
    }

    /// Bindings ordered by pane id
    pub fn snapshot(&self) -> Vec<(PaneId, Binding)> {
        let mut bindings: Vec<_> = self
            .lock()
            .iter()
            .map(|(pane, binding)| (*pane, binding.clone()))
            .collect();
        bindings.sort_by_key(|(pane, _)| *pane);
        bindings
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Document, MatchRule};
    use std::path::PathBuf;

    fn session() -> Session {
        Session::new(Arc::new(ConfigStore::from_document(
            PathBuf::from("unused.json"),
            Document::default(),
        )))
    }

    #[test]
    fn test_pending_counter_never_underflows() {
        let session = session();
        assert!(session.is_idle());
        session.begin_creation();
        session.begin_creation();
        assert_eq!(session.pending_creations(), 2);
        session.finish_creation();
        session.finish_creation();
        session.finish_creation();
        assert_eq!(session.pending_creations(), 0);
    }

    #[test]
    fn test_bindings_snapshot_is_ordered() {
        let session = session();
        let rule = session.store().mint(MatchRule::default());
        let first = session.allocate_pane();
        let second = session.allocate_pane();
        session.bind(second, 20, rule.clone());
        session.bind(first, 10, rule);

        let snapshot = session.snapshot();
        assert_eq!(snapshot[0].0, first);
        assert_eq!(snapshot[1].0, second);
        assert_eq!(snapshot[1].1.window, 20);

        assert!(session.unbind(first).is_some());
        assert!(session.unbind(first).is_none());
        assert_eq!(session.snapshot().len(), 1);
    }

    #[test]
    fn test_shutdown_flag() {
        let session = session();
        assert!(!session.is_shutting_down());
        session.request_shutdown();
        assert!(session.is_shutting_down());
    }
}
