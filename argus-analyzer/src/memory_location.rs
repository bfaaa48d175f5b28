//! Memory location descriptors
//!
//! Every addressable region the analyzer reasons about is represented by a
//! uniqued memory location: locals, globals, functions, the absolute zero
//! address, `argv`, `errno` and dynamic allocations identified by their call
//! site and calling context.

use core::cmp::Ordering;
use core::fmt;
use std::sync::atomic::{
    AtomicU64,
    Ordering as AtomicOrdering,
};
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::call_context::Site;

/// What a memory location stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemoryLocationKind {
    /// The storage of an addressable local variable.
    Local {
        /// The AR variable whose storage this is.
        var: argus_ar::VarId,
    },
    /// The storage of a global variable.
    Global {
        /// The AR global.
        global: argus_ar::GlobalId,
    },
    /// The code of a function, as a pointer target.
    Function {
        /// The function.
        function: argus_ar::FunctionId,
    },
    /// The storage of an aggregate temporary.
    Aggregate {
        /// The AR variable whose storage this is.
        var: argus_ar::VarId,
    },
    /// The absolute zero address and everything reachable from it.
    AbsoluteZero,
    /// The `argv` array of the program.
    Argv,
    /// The libc `errno` variable.
    LibcErrno,
    /// A dynamic allocation, identified by its call site and context.
    DynAlloc {
        /// The allocating call statement.
        site: Site,
        /// Index of the calling context of the allocation.
        context_id: u64,
    },
}

/// A uniqued memory location descriptor.
#[derive(Debug)]
pub struct MemoryLocation {
    id: u64,
    kind: MemoryLocationKind,
}

/// Shared reference to a memory location.
pub type MemoryLocationRef = Arc<MemoryLocation>;

impl MemoryLocation {
    /// The stable unique index.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The descriptor kind.
    pub fn kind(&self) -> &MemoryLocationKind {
        &self.kind
    }

    /// Return true for dynamic allocations.
    pub fn is_dyn_alloc(&self) -> bool {
        matches!(self.kind, MemoryLocationKind::DynAlloc { .. })
    }

    /// The function this location is the code of, if any.
    pub fn as_function(&self) -> Option<argus_ar::FunctionId> {
        match self.kind {
            MemoryLocationKind::Function { function } => Some(function),
            _ => None,
        }
    }
}

impl PartialEq for MemoryLocation {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MemoryLocation {}

impl PartialOrd for MemoryLocation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MemoryLocation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl core::hash::Hash for MemoryLocation {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for MemoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            MemoryLocationKind::Local { var } => write!(f, "local%{}", var.0),
            MemoryLocationKind::Global { global } => write!(f, "global@{}", global.0),
            MemoryLocationKind::Function { function } => write!(f, "fun f{}", function.0),
            MemoryLocationKind::Aggregate { var } => write!(f, "agg%{}", var.0),
            MemoryLocationKind::AbsoluteZero => write!(f, "absolute_zero"),
            MemoryLocationKind::Argv => write!(f, "argv"),
            MemoryLocationKind::LibcErrno => write!(f, "errno"),
            MemoryLocationKind::DynAlloc { site, context_id } => write!(
                f,
                "dyn_alloc@f{}:{}#{}",
                site.function.0, site.statement.index, context_id
            ),
        }
    }
}

/// Process-wide pool of memory location descriptors.
pub struct MemoryFactory {
    next_id: AtomicU64,
    locals: RwLock<HashMap<argus_ar::VarId, MemoryLocationRef>>,
    globals: RwLock<HashMap<argus_ar::GlobalId, MemoryLocationRef>>,
    functions: RwLock<HashMap<argus_ar::FunctionId, MemoryLocationRef>>,
    aggregates: RwLock<HashMap<argus_ar::VarId, MemoryLocationRef>>,
    dyn_allocs: RwLock<HashMap<(Site, u64), MemoryLocationRef>>,
    absolute_zero: MemoryLocationRef,
    argv: MemoryLocationRef,
    libc_errno: MemoryLocationRef,
}

impl MemoryFactory {
    /// Build a factory; the singleton locations are created up front.
    pub fn new() -> Self {
        let next_id = AtomicU64::new(3);
        MemoryFactory {
            absolute_zero: Arc::new(MemoryLocation {
                id: 0,
                kind: MemoryLocationKind::AbsoluteZero,
            }),
            argv: Arc::new(MemoryLocation {
                id: 1,
                kind: MemoryLocationKind::Argv,
            }),
            libc_errno: Arc::new(MemoryLocation {
                id: 2,
                kind: MemoryLocationKind::LibcErrno,
            }),
            next_id,
            locals: RwLock::new(HashMap::new()),
            globals: RwLock::new(HashMap::new()),
            functions: RwLock::new(HashMap::new()),
            aggregates: RwLock::new(HashMap::new()),
            dyn_allocs: RwLock::new(HashMap::new()),
        }
    }

    fn intern<K: Eq + core::hash::Hash>(
        &self,
        map: &RwLock<HashMap<K, MemoryLocationRef>>,
        key: K,
        kind: impl FnOnce() -> MemoryLocationKind,
    ) -> MemoryLocationRef {
        if let Some(existing) = map.read().get(&key) {
            return Arc::clone(existing)
        }
        let mut write = map.write();
        if let Some(existing) = write.get(&key) {
            return Arc::clone(existing)
        }
        let location = Arc::new(MemoryLocation {
            id: self.next_id.fetch_add(1, AtomicOrdering::SeqCst),
            kind: kind(),
        });
        write.insert(key, Arc::clone(&location));
        location
    }

    /// The storage of an addressable local.
    pub fn local(&self, var: argus_ar::VarId) -> MemoryLocationRef {
        self.intern(&self.locals, var, || MemoryLocationKind::Local { var })
    }

    /// The storage of a global.
    pub fn global(&self, global: argus_ar::GlobalId) -> MemoryLocationRef {
        self.intern(&self.globals, global, || MemoryLocationKind::Global {
            global,
        })
    }

    /// The code of a function.
    pub fn function(&self, function: argus_ar::FunctionId) -> MemoryLocationRef {
        self.intern(&self.functions, function, || MemoryLocationKind::Function {
            function,
        })
    }

    /// The storage of an aggregate temporary.
    pub fn aggregate(&self, var: argus_ar::VarId) -> MemoryLocationRef {
        self.intern(&self.aggregates, var, || MemoryLocationKind::Aggregate {
            var,
        })
    }

    /// The absolute zero address.
    pub fn absolute_zero(&self) -> MemoryLocationRef {
        Arc::clone(&self.absolute_zero)
    }

    /// The `argv` array.
    pub fn argv(&self) -> MemoryLocationRef {
        Arc::clone(&self.argv)
    }

    /// The libc `errno` variable.
    pub fn libc_errno(&self) -> MemoryLocationRef {
        Arc::clone(&self.libc_errno)
    }

    /// A dynamic allocation at `site` under the given calling context.
    pub fn dyn_alloc(&self, site: Site, context_id: u64) -> MemoryLocationRef {
        self.intern(&self.dyn_allocs, (site, context_id), || {
            MemoryLocationKind::DynAlloc { site, context_id }
        })
    }
}

impl Default for MemoryFactory {
    fn default() -> Self {
        MemoryFactory::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_ar::{
        BasicBlockId,
        FunctionId,
        StatementRef,
        VarId,
    };

    #[test]
    fn identity_is_stable() {
        let factory = MemoryFactory::new();
        let a = factory.local(VarId(1));
        let b = factory.local(VarId(1));
        assert!(Arc::ptr_eq(&a, &b));
        assert_ne!(factory.local(VarId(2)).id(), a.id());
        assert_eq!(factory.absolute_zero().id(), factory.absolute_zero().id());
    }

    #[test]
    fn dyn_allocs_are_context_sensitive() {
        let factory = MemoryFactory::new();
        let site = Site {
            function: FunctionId(0),
            statement: StatementRef {
                block: BasicBlockId(1),
                index: 2,
            },
        };
        let a = factory.dyn_alloc(site, 0);
        let b = factory.dyn_alloc(site, 0);
        let c = factory.dyn_alloc(site, 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_ne!(a.id(), c.id());
    }
}
