//! Calling contexts
//!
//! A call context is the inlining stack from the entry point down to the
//! current frame, identified by the chain of call statements. Contexts are
//! hash-consed: structurally equal chains share one descriptor.

use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use argus_ar::{
    FunctionId,
    StatementRef,
};

/// A statement position within a function of the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Site {
    /// The containing function.
    pub function: FunctionId,
    /// The statement within it.
    pub statement: StatementRef,
}

/// A calling context: empty for the entry point, or a parent context plus
/// one call site.
#[derive(Debug)]
pub struct CallContext {
    id: u64,
    parent: Option<CallContextRef>,
    call: Option<Site>,
}

/// Shared reference to a calling context.
pub type CallContextRef = Arc<CallContext>;

impl CallContext {
    /// The stable unique index of this context.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Return true for the entry-point context.
    pub fn is_empty(&self) -> bool {
        self.call.is_none()
    }

    /// The call site of the innermost frame, absent on the entry context.
    pub fn call(&self) -> Option<Site> {
        self.call
    }

    /// The enclosing context, absent on the entry context.
    pub fn parent(&self) -> Option<&CallContextRef> {
        self.parent.as_ref()
    }

    /// The call sites from the entry point to the current frame.
    pub fn frames(&self) -> Vec<Site> {
        let mut frames = Vec::new();
        let mut current = self;
        while let Some(site) = current.call {
            frames.push(site);
            match &current.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        frames.reverse();
        frames
    }
}

impl PartialEq for CallContext {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CallContext {}

impl fmt::Display for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, ".")
        }
        for (i, site) in self.frames().iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(
                f,
                "f{}:b{}:s{}",
                site.function.0, site.statement.block.0, site.statement.index
            )?;
        }
        Ok(())
    }
}

/// Factory hash-consing calling contexts.
///
/// Shared across analysis threads; lookups are idempotent and identities
/// never change once observed.
pub struct CallContextFactory {
    empty: CallContextRef,
    children: RwLock<HashMap<(u64, Site), CallContextRef>>,
    next_id: RwLock<u64>,
}

impl CallContextFactory {
    /// Build a factory with the distinguished empty context.
    pub fn new() -> Self {
        CallContextFactory {
            empty: Arc::new(CallContext {
                id: 0,
                parent: None,
                call: None,
            }),
            children: RwLock::new(HashMap::new()),
            next_id: RwLock::new(1),
        }
    }

    /// The entry-point context.
    pub fn empty(&self) -> CallContextRef {
        Arc::clone(&self.empty)
    }

    /// The context for `parent` extended with the call at `site`.
    pub fn extend(&self, parent: &CallContextRef, site: Site) -> CallContextRef {
        let key = (parent.id, site);
        if let Some(existing) = self.children.read().get(&key) {
            return Arc::clone(existing)
        }
        let mut children = self.children.write();
        if let Some(existing) = children.get(&key) {
            return Arc::clone(existing)
        }
        let mut next_id = self.next_id.write();
        let context = Arc::new(CallContext {
            id: *next_id,
            parent: Some(Arc::clone(parent)),
            call: Some(site),
        });
        *next_id += 1;
        children.insert(key, Arc::clone(&context));
        context
    }
}

impl Default for CallContextFactory {
    fn default() -> Self {
        CallContextFactory::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_ar::BasicBlockId;

    fn site(function: u32, index: u32) -> Site {
        Site {
            function: FunctionId(function),
            statement: StatementRef {
                block: BasicBlockId(0),
                index,
            },
        }
    }

    #[test]
    fn hash_consing() {
        let factory = CallContextFactory::new();
        let root = factory.empty();
        let a = factory.extend(&root, site(1, 0));
        let b = factory.extend(&root, site(1, 0));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.id(), b.id());

        let c = factory.extend(&a, site(2, 3));
        assert_ne!(c.id(), a.id());
        assert_eq!(c.frames(), vec![site(1, 0), site(2, 3)]);
        assert!(root.is_empty());
        assert!(!c.is_empty());
    }
}
