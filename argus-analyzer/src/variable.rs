//! Analyzer variable descriptors
//!
//! The analyzer gives every abstract dimension a uniqued variable
//! descriptor: source variables, but also synthesized ones such as the byte
//! offset of a pointer, the allocated size of a memory location, or a memory
//! cell. Descriptors are produced by a process-wide factory and compared by
//! their stable index.

use core::cmp::Ordering;
use core::fmt;
use std::sync::atomic::{
    AtomicU64,
    Ordering as AtomicOrdering,
};
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use argus_num::Signedness;

use crate::{
    call_context::Site,
    error::AnalyzerError,
    memory_location::MemoryLocationRef,
};

/// What a variable descriptor stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// A source-level local of the bundle.
    Local {
        /// The AR variable.
        var: argus_ar::VarId,
    },
    /// A compiler temporary of the bundle.
    Internal {
        /// The AR variable.
        var: argus_ar::VarId,
    },
    /// The shadow of a global variable's scalar value.
    Global {
        /// The AR global.
        global: argus_ar::GlobalId,
    },
    /// A pointer holding a function address.
    FunctionPointer {
        /// The target function.
        function: argus_ar::FunctionId,
    },
    /// A memory cell: a scalar slice of a memory location.
    Cell {
        /// The sliced memory location.
        memory: MemoryLocationRef,
        /// Byte offset of the cell.
        offset: u64,
        /// Byte size of the cell.
        size: u64,
    },
    /// The byte offset of a pointer variable.
    Offset {
        /// Index of the pointer variable this offset belongs to.
        parent: u64,
    },
    /// The allocated size of a memory location, in bytes.
    AllocSize {
        /// Index of the memory location.
        memory: u64,
    },
    /// The returned value of a function.
    Return {
        /// The function.
        function: argus_ar::FunctionId,
    },
    /// A named variable with no AR counterpart.
    NamedShadow {
        /// Its name.
        name: String,
    },
    /// A fresh anonymous variable.
    UnnamedShadow {
        /// Disambiguating index.
        index: u64,
    },
    /// The pointer produced by an inline assembly callee.
    AsmPointer {
        /// The statement that used the assembly.
        site: Site,
    },
}

/// A uniqued variable descriptor.
#[derive(Debug)]
pub struct Variable {
    id: u64,
    kind: VariableKind,
    bit_width: u64,
    sign: Signedness,
    is_pointer: bool,
}

/// Shared reference to a variable descriptor.
pub type VariableRef = Arc<Variable>;

impl Variable {
    /// The stable unique index.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The descriptor kind.
    pub fn kind(&self) -> &VariableKind {
        &self.kind
    }

    /// Machine-integer view of the value: width in bits.
    pub fn bit_width(&self) -> u64 {
        self.bit_width
    }

    /// Machine-integer view of the value: signedness.
    pub fn sign(&self) -> Signedness {
        self.sign
    }

    /// Return true if the variable holds an address.
    pub fn is_pointer(&self) -> bool {
        self.is_pointer
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl core::hash::Hash for Variable {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            VariableKind::Local { var } | VariableKind::Internal { var } => {
                write!(f, "%{}", var.0)
            }
            VariableKind::Global { global } => write!(f, "@{}", global.0),
            VariableKind::FunctionPointer { function } => write!(f, "&f{}", function.0),
            VariableKind::Cell {
                memory,
                offset,
                size,
            } => write!(f, "{memory}[{offset}:{size}]"),
            VariableKind::Offset { parent } => write!(f, "offset(v{parent})"),
            VariableKind::AllocSize { memory } => write!(f, "alloc_size(m{memory})"),
            VariableKind::Return { function } => write!(f, "ret(f{})", function.0),
            VariableKind::NamedShadow { name } => write!(f, "${name}"),
            VariableKind::UnnamedShadow { index } => write!(f, "$shadow{index}"),
            VariableKind::AsmPointer { site } => {
                write!(f, "asm@f{}:{}", site.function.0, site.statement.index)
            }
        }
    }
}

/// Process-wide pool of variable descriptors.
///
/// Repeated lookups of the same entity return the same descriptor; inserts
/// are idempotent under concurrent use. Pointer-kind descriptors eagerly own
/// a sibling offset variable.
pub struct VariableFactory {
    next_id: AtomicU64,
    pointer_bit_width: u64,
    locals: RwLock<HashMap<argus_ar::VarId, VariableRef>>,
    internals: RwLock<HashMap<argus_ar::VarId, VariableRef>>,
    globals: RwLock<HashMap<argus_ar::GlobalId, VariableRef>>,
    function_pointers: RwLock<HashMap<argus_ar::FunctionId, VariableRef>>,
    cells: RwLock<HashMap<(u64, u64, u64), VariableRef>>,
    offsets: RwLock<HashMap<u64, VariableRef>>,
    alloc_sizes: RwLock<HashMap<u64, VariableRef>>,
    returns: RwLock<HashMap<argus_ar::FunctionId, VariableRef>>,
    named_shadows: RwLock<HashMap<String, VariableRef>>,
    asm_pointers: RwLock<HashMap<Site, VariableRef>>,
}

impl VariableFactory {
    /// Build a factory for a target with the given pointer width.
    pub fn new(pointer_bit_width: u64) -> Self {
        VariableFactory {
            next_id: AtomicU64::new(0),
            pointer_bit_width,
            locals: RwLock::new(HashMap::new()),
            internals: RwLock::new(HashMap::new()),
            globals: RwLock::new(HashMap::new()),
            function_pointers: RwLock::new(HashMap::new()),
            cells: RwLock::new(HashMap::new()),
            offsets: RwLock::new(HashMap::new()),
            alloc_sizes: RwLock::new(HashMap::new()),
            returns: RwLock::new(HashMap::new()),
            named_shadows: RwLock::new(HashMap::new()),
            asm_pointers: RwLock::new(HashMap::new()),
        }
    }

    fn make(
        &self,
        kind: VariableKind,
        bit_width: u64,
        sign: Signedness,
        is_pointer: bool,
    ) -> VariableRef {
        Arc::new(Variable {
            id: self.next_id.fetch_add(1, AtomicOrdering::SeqCst),
            kind,
            bit_width,
            sign,
            is_pointer,
        })
    }

    fn intern<K: Eq + core::hash::Hash + Clone>(
        &self,
        map: &RwLock<HashMap<K, VariableRef>>,
        key: K,
        make: impl FnOnce() -> VariableRef,
    ) -> VariableRef {
        if let Some(existing) = map.read().get(&key) {
            return Arc::clone(existing)
        }
        let mut write = map.write();
        if let Some(existing) = write.get(&key) {
            return Arc::clone(existing)
        }
        let var = make();
        write.insert(key, Arc::clone(&var));
        var
    }

    /// The descriptor of a source-level local.
    pub fn local(
        &self,
        var: argus_ar::VarId,
        bit_width: u64,
        sign: Signedness,
        is_pointer: bool,
    ) -> VariableRef {
        let v = self.intern(&self.locals, var, || {
            self.make(VariableKind::Local { var }, bit_width, sign, is_pointer)
        });
        if is_pointer {
            let _ = self.offset_var(&v);
        }
        v
    }

    /// The descriptor of a compiler temporary.
    pub fn internal(
        &self,
        var: argus_ar::VarId,
        bit_width: u64,
        sign: Signedness,
        is_pointer: bool,
    ) -> VariableRef {
        let v = self.intern(&self.internals, var, || {
            self.make(VariableKind::Internal { var }, bit_width, sign, is_pointer)
        });
        if is_pointer {
            let _ = self.offset_var(&v);
        }
        v
    }

    /// The shadow descriptor of a global's scalar value.
    pub fn global(&self, global: argus_ar::GlobalId, bit_width: u64, sign: Signedness) -> VariableRef {
        self.intern(&self.globals, global, || {
            self.make(VariableKind::Global { global }, bit_width, sign, false)
        })
    }

    /// The descriptor of a function pointer constant.
    pub fn function_pointer(&self, function: argus_ar::FunctionId) -> VariableRef {
        let width = self.pointer_bit_width;
        let v = self.intern(&self.function_pointers, function, || {
            self.make(
                VariableKind::FunctionPointer { function },
                width,
                Signedness::Unsigned,
                true,
            )
        });
        let _ = self.offset_var(&v);
        v
    }

    /// The cell of `memory` at `[offset, offset + size)`, holding a value of
    /// the given signedness.
    ///
    /// Oversized cells cannot be given a machine integer view and are a hard
    /// error.
    pub fn cell(
        &self,
        memory: &MemoryLocationRef,
        offset: u64,
        size: u64,
        sign: Signedness,
        is_pointer: bool,
    ) -> Result<VariableRef, AnalyzerError> {
        let Some(bit_width) = size.checked_mul(8) else {
            return Err(AnalyzerError::CellTooLarge { size })
        };
        if bit_width == 0 {
            return Err(AnalyzerError::CellTooLarge { size })
        }
        let key = (memory.id(), offset, size);
        let memory = Arc::clone(memory);
        let v = self.intern(&self.cells, key, move || {
            self.make(
                VariableKind::Cell {
                    memory,
                    offset,
                    size,
                },
                bit_width,
                sign,
                is_pointer,
            )
        });
        if is_pointer {
            let _ = self.offset_var(&v);
        }
        Ok(v)
    }

    /// The sibling offset variable of a pointer descriptor.
    pub fn offset_var(&self, parent: &VariableRef) -> VariableRef {
        let width = self.pointer_bit_width;
        let parent_id = parent.id();
        self.intern(&self.offsets, parent_id, || {
            self.make(
                VariableKind::Offset { parent: parent_id },
                width,
                Signedness::Unsigned,
                false,
            )
        })
    }

    /// The allocated-size variable of a memory location, interned by the
    /// location's index.
    pub fn alloc_size_var(&self, memory_id: u64) -> VariableRef {
        let width = self.pointer_bit_width;
        self.intern(&self.alloc_sizes, memory_id, || {
            self.make(
                VariableKind::AllocSize { memory: memory_id },
                width,
                Signedness::Unsigned,
                false,
            )
        })
    }

    /// The return-value descriptor of a function.
    pub fn return_var(
        &self,
        function: argus_ar::FunctionId,
        bit_width: u64,
        sign: Signedness,
        is_pointer: bool,
    ) -> VariableRef {
        let v = self.intern(&self.returns, function, || {
            self.make(VariableKind::Return { function }, bit_width, sign, is_pointer)
        });
        if is_pointer {
            let _ = self.offset_var(&v);
        }
        v
    }

    /// A named variable with no AR counterpart.
    pub fn named_shadow(&self, name: &str, bit_width: u64, sign: Signedness) -> VariableRef {
        self.intern(&self.named_shadows, name.to_owned(), || {
            self.make(
                VariableKind::NamedShadow {
                    name: name.to_owned(),
                },
                bit_width,
                sign,
                false,
            )
        })
    }

    /// A fresh anonymous variable; never interned.
    pub fn unnamed_shadow(&self, bit_width: u64, sign: Signedness) -> VariableRef {
        let index = self.next_id.load(AtomicOrdering::SeqCst);
        self.make(
            VariableKind::UnnamedShadow { index },
            bit_width,
            sign,
            false,
        )
    }

    /// The pointer produced by an inline-assembly callee at `site`.
    pub fn asm_pointer(&self, site: Site) -> VariableRef {
        let width = self.pointer_bit_width;
        let v = self.intern(&self.asm_pointers, site, || {
            self.make(
                VariableKind::AsmPointer { site },
                width,
                Signedness::Unsigned,
                true,
            )
        });
        let _ = self.offset_var(&v);
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_stable() {
        let factory = VariableFactory::new(64);
        let a = factory.local(argus_ar::VarId(3), 32, Signedness::Signed, false);
        let b = factory.local(argus_ar::VarId(3), 32, Signedness::Signed, false);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.id(), b.id());
        let c = factory.local(argus_ar::VarId(4), 32, Signedness::Signed, false);
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn pointers_own_an_offset_variable() {
        let factory = VariableFactory::new(64);
        let p = factory.local(argus_ar::VarId(0), 64, Signedness::Unsigned, true);
        let off1 = factory.offset_var(&p);
        let off2 = factory.offset_var(&p);
        assert!(Arc::ptr_eq(&off1, &off2));
        assert_eq!(off1.bit_width(), 64);
        assert_eq!(off1.sign(), Signedness::Unsigned);
    }

    #[test]
    fn return_var_is_per_function() {
        let factory = VariableFactory::new(64);
        let r1 = factory.return_var(argus_ar::FunctionId(1), 32, Signedness::Signed, false);
        let r2 = factory.return_var(argus_ar::FunctionId(1), 32, Signedness::Signed, false);
        let r3 = factory.return_var(argus_ar::FunctionId(2), 32, Signedness::Signed, false);
        assert!(Arc::ptr_eq(&r1, &r2));
        assert_ne!(r1.id(), r3.id());
    }
}
