//! # Change Notification
//!
//! The observer side of the about-to-set / has-set bracket, plus the
//! transaction hooks the label cell uses.
//!
//! ## Table of Contents
//! 1. PropertyStatus - per-cell status flags
//! 2. PropertyContainer - observer of cell changes
//! 3. TransactionManager - undo transaction hooks
//! 4. TransactionLog - in-memory transaction manager
//! 5. ChangeRecorder - recording container

use std::sync::Arc;

use bitflags::bitflags;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;

// ============================================================================
// Status Flags
// ============================================================================

bitflags! {
    /// Status bits carried by every cell
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PropertyStatus: u32 {
        /// Set by every completed change
        const TOUCHED = 1 << 0;
        /// Float lists write their side file as f32
        const SINGLE_PRECISION = 1 << 1;
    }
}

// ============================================================================
// Container
// ============================================================================

/// Edit of a related cell returned by the proposed-label-change hook.
/// Applied after the label itself has changed.
pub type DeferredChange = Box<dyn FnOnce() -> Result<()> + Send>;

/// How a label is written while the document is being exported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelExport {
    /// Labels may repeat in the target document, so restore them verbatim
    pub allow_duplicate_labels: bool,
    /// The owning object's internal name
    pub internal_name: String,
    /// Name the object will carry in the exported document
    pub export_name: String,
}

/// The object that owns a set of cells and observes their changes
pub trait PropertyContainer: Send + Sync {
    /// Name used in full property names and transaction titles
    fn object_name(&self) -> String;

    fn on_before_change(&self, _property: &str) {}

    fn on_changed(&self, _property: &str) {}

    /// Offered every new label before it is assigned. May rewrite `label` and
    /// return edits of related cells.
    fn propose_label_change(&self, _label: &mut String) -> Vec<DeferredChange> {
        Vec::new()
    }

    fn transactions(&self) -> Option<Arc<dyn TransactionManager>> {
        None
    }

    /// Set while the document is being exported
    fn label_export(&self) -> Option<LabelExport> {
        None
    }
}

// ============================================================================
// Transactions
// ============================================================================

/// Undo transaction hooks
pub trait TransactionManager: Send + Sync {
    fn has_active(&self) -> bool;
    fn open(&self, name: &str);
    fn close(&self);
}

#[derive(Debug, Default)]
struct TransactionState {
    active: Option<String>,
    committed: Vec<String>,
}

/// Transaction manager that only records names
#[derive(Debug, Default)]
pub struct TransactionLog {
    state: Mutex<TransactionState>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<String> {
        self.state.lock().active.clone()
    }

    /// Names of closed transactions, oldest first
    pub fn committed(&self) -> Vec<String> {
        self.state.lock().committed.clone()
    }
}

impl TransactionManager for TransactionLog {
    fn has_active(&self) -> bool {
        self.state.lock().active.is_some()
    }

    fn open(&self, name: &str) {
        debug!("Opening transaction '{}'", name);
        self.state.lock().active = Some(name.to_string());
    }

    fn close(&self) {
        let mut state = self.state.lock();
        if let Some(name) = state.active.take() {
            debug!("Closing transaction '{}'", name);
            state.committed.push(name);
        }
    }
}

// ============================================================================
// Change Recorder
// ============================================================================

/// One observed hook call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Before(String),
    After(String),
}

type LabelHook = Box<dyn Fn(&mut String) -> Vec<DeferredChange> + Send + Sync>;

/// Container that records every hook call, for hosts without a document model
pub struct ChangeRecorder {
    object_name: String,
    events: Mutex<Vec<ChangeEvent>>,
    transactions: Option<Arc<TransactionLog>>,
    label_hook: Option<LabelHook>,
    label_export: Mutex<Option<LabelExport>>,
}

impl ChangeRecorder {
    pub fn new(object_name: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            events: Mutex::new(Vec::new()),
            transactions: None,
            label_hook: None,
            label_export: Mutex::new(None),
        }
    }

    pub fn with_transactions(mut self, transactions: Arc<TransactionLog>) -> Self {
        self.transactions = Some(transactions);
        self
    }

    pub fn with_label_hook(
        mut self,
        hook: impl Fn(&mut String) -> Vec<DeferredChange> + Send + Sync + 'static,
    ) -> Self {
        self.label_hook = Some(Box::new(hook));
        self
    }

    pub fn set_label_export(&self, export: Option<LabelExport>) {
        *self.label_export.lock() = export;
    }

    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().clone()
    }

    pub fn before_count(&self, property: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, ChangeEvent::Before(p) if p == property))
            .count()
    }

    pub fn after_count(&self, property: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, ChangeEvent::After(p) if p == property))
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl PropertyContainer for ChangeRecorder {
    fn object_name(&self) -> String {
        self.object_name.clone()
    }

    fn on_before_change(&self, property: &str) {
        self.events.lock().push(ChangeEvent::Before(property.to_string()));
    }

    fn on_changed(&self, property: &str) {
        self.events.lock().push(ChangeEvent::After(property.to_string()));
    }

    fn propose_label_change(&self, label: &mut String) -> Vec<DeferredChange> {
        match &self.label_hook {
            Some(hook) => hook(label),
            None => Vec::new(),
        }
    }

    fn transactions(&self) -> Option<Arc<dyn TransactionManager>> {
        self.transactions
            .clone()
            .map(|log| log as Arc<dyn TransactionManager>)
    }

    fn label_export(&self) -> Option<LabelExport> {
        self.label_export.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_log() {
        let log = TransactionLog::new();
        assert!(!log.has_active());
        log.open("Change Box.Label");
        assert_eq!(log.active().as_deref(), Some("Change Box.Label"));
        log.close();
        log.close();
        assert!(!log.has_active());
        assert_eq!(log.committed(), vec!["Change Box.Label".to_string()]);
    }

    #[test]
    fn test_recorder_counts() {
        let recorder = ChangeRecorder::new("Box");
        recorder.on_before_change("Length");
        recorder.on_changed("Length");
        recorder.on_changed("Width");
        assert_eq!(recorder.before_count("Length"), 1);
        assert_eq!(recorder.after_count("Length"), 1);
        assert_eq!(recorder.after_count("Width"), 1);
        recorder.clear();
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_status_flags() {
        let mut status = PropertyStatus::default();
        status.insert(PropertyStatus::SINGLE_PRECISION);
        assert!(status.contains(PropertyStatus::SINGLE_PRECISION));
        assert!(!status.contains(PropertyStatus::TOUCHED));
    }
}
