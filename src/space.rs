//! Logical tables
//!
//! A space is the unit a mutation targets: it carries the engine that
//! indexes its tuples, an ordered list of replace triggers, and the
//! flags that govern trigger execution and durability. A temporary
//! space is never logged.

use std::fmt;
use std::sync::Arc;

use crate::engine::Engine;
use crate::txn::Txn;

/// Space identifier.
pub type SpaceId = u32;

/// A trigger invoked with the transaction that performed a change.
///
/// Triggers must not fail; a panic from a trigger is a programming
/// defect that aborts the process.
pub type Trigger = Box<dyn Fn(&Txn) + Send + Sync>;

/// A logical table backed by an engine.
pub struct Space {
    id: SpaceId,
    engine: Arc<dyn Engine>,
    on_replace: Vec<Trigger>,
    /// Master switch for replace triggers; commit and rollback
    /// triggers are unaffected.
    pub run_triggers: bool,
    temporary: bool,
}

impl Space {
    /// Creates a durable space served by `engine`.
    pub fn new(id: SpaceId, engine: Arc<dyn Engine>) -> Self {
        Self {
            id,
            engine,
            on_replace: Vec::new(),
            run_triggers: true,
            temporary: false,
        }
    }

    /// Creates a temporary space: its mutations bypass the log.
    pub fn temporary(id: SpaceId, engine: Arc<dyn Engine>) -> Self {
        let mut space = Self::new(id, engine);
        space.temporary = true;
        space
    }

    /// Space identifier.
    pub fn id(&self) -> SpaceId {
        self.id
    }

    /// The engine indexing this space.
    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// Whether mutations of this space bypass the log.
    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    /// Appends a replace trigger; triggers run in insertion order.
    pub fn on_replace(&mut self, trigger: Trigger) {
        self.on_replace.push(trigger);
    }

    /// The ordered replace-trigger list.
    pub fn replace_triggers(&self) -> &[Trigger] {
        &self.on_replace
    }
}

impl fmt::Debug for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Space")
            .field("id", &self.id)
            .field("temporary", &self.temporary)
            .field("run_triggers", &self.run_triggers)
            .field("on_replace", &self.on_replace.len())
            .finish()
    }
}
