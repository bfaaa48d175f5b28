//! Bundles: translation units of AR

use std::sync::Arc;

use hashbrown::HashMap;

use crate::{
    code::Code,
    types::{
        DataLayout,
        FunctionType,
        Type,
    },
    value::{
        Constant,
        Operand,
    },
};

/// Index of a variable within a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub u32);

/// Index of a function within a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunctionId(pub u32);

/// Index of a global variable within a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlobalId(pub u32);

/// The storage kind of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// A named source-level local.
    Local,
    /// A compiler temporary.
    Internal,
}

/// A function-scoped variable.
#[derive(Debug, Clone)]
pub struct Variable {
    /// The variable index.
    pub id: VarId,
    /// Source name, absent for temporaries.
    pub name: Option<String>,
    /// Declared type.
    pub ty: Type,
    /// Storage kind.
    pub kind: VariableKind,
    /// Owning function.
    pub function: FunctionId,
}

/// A global variable; operands reference it through its address.
#[derive(Debug, Clone)]
pub struct Global {
    /// The global index.
    pub id: GlobalId,
    /// Link name.
    pub name: String,
    /// Type of the stored value (the pointee).
    pub ty: Type,
    /// Static initializer, if any.
    pub initializer: Option<Constant>,
}

/// A function: type, parameters and an optional body.
#[derive(Debug, Clone)]
pub struct Function {
    /// The function index.
    pub id: FunctionId,
    /// Link name.
    pub name: String,
    /// The function type.
    pub ty: Arc<FunctionType>,
    /// Parameter variables, in order.
    pub parameters: Vec<VarId>,
    /// The body; `None` for declarations.
    pub body: Option<Code>,
}

impl Function {
    /// Return true if the function has no body.
    pub fn is_declaration(&self) -> bool {
        self.body.is_none()
    }
}

/// A translation unit: functions, globals, variables and the data layout.
#[derive(Debug, Clone)]
pub struct Bundle {
    data_layout: DataLayout,
    functions: Vec<Function>,
    globals: Vec<Global>,
    variables: Vec<Variable>,
    function_names: HashMap<String, FunctionId>,
}

impl Bundle {
    /// Build an empty bundle over the given layout.
    pub fn new(data_layout: DataLayout) -> Self {
        Bundle {
            data_layout,
            functions: Vec::new(),
            globals: Vec::new(),
            variables: Vec::new(),
            function_names: HashMap::new(),
        }
    }

    /// The target data layout.
    pub fn data_layout(&self) -> &DataLayout {
        &self.data_layout
    }

    /// Declare a function; attach a body separately with
    /// [`Bundle::set_body`].
    pub fn add_function(&mut self, name: &str, ty: FunctionType) -> FunctionId {
        let id = FunctionId(u32::try_from(self.functions.len()).expect("fits u32"));
        self.functions.push(Function {
            id,
            name: name.to_owned(),
            ty: Arc::new(ty),
            parameters: Vec::new(),
            body: None,
        });
        self.function_names.insert(name.to_owned(), id);
        id
    }

    /// Attach a body to a declared function.
    pub fn set_body(&mut self, function: FunctionId, body: Code) {
        self.functions[function.0 as usize].body = Some(body);
    }

    /// The function data of `id`.
    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0 as usize]
    }

    /// Look a function up by name.
    pub fn function_by_name(&self, name: &str) -> Option<FunctionId> {
        self.function_names.get(name).copied()
    }

    /// Every function of the bundle.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }

    /// Add a global variable.
    pub fn add_global(&mut self, name: &str, ty: Type, initializer: Option<Constant>) -> GlobalId {
        let id = GlobalId(u32::try_from(self.globals.len()).expect("fits u32"));
        self.globals.push(Global {
            id,
            name: name.to_owned(),
            ty,
            initializer,
        });
        id
    }

    /// The global data of `id`.
    pub fn global(&self, id: GlobalId) -> &Global {
        &self.globals[id.0 as usize]
    }

    /// Every global of the bundle.
    pub fn globals(&self) -> impl Iterator<Item = &Global> {
        self.globals.iter()
    }

    fn new_var(
        &mut self,
        function: FunctionId,
        name: Option<String>,
        ty: Type,
        kind: VariableKind,
    ) -> VarId {
        let id = VarId(u32::try_from(self.variables.len()).expect("fits u32"));
        self.variables.push(Variable {
            id,
            name,
            ty,
            kind,
            function,
        });
        id
    }

    /// Add a named source-level local to `function`.
    pub fn new_local(&mut self, function: FunctionId, name: &str, ty: Type) -> VarId {
        self.new_var(function, Some(name.to_owned()), ty, VariableKind::Local)
    }

    /// Add a compiler temporary to `function`.
    pub fn new_internal(&mut self, function: FunctionId, ty: Type) -> VarId {
        self.new_var(function, None, ty, VariableKind::Internal)
    }

    /// Add a parameter variable to `function`.
    pub fn add_parameter(&mut self, function: FunctionId, name: &str, ty: Type) -> VarId {
        let var = self.new_local(function, name, ty);
        self.functions[function.0 as usize].parameters.push(var);
        var
    }

    /// The variable data of `id`.
    pub fn var(&self, id: VarId) -> &Variable {
        &self.variables[id.0 as usize]
    }

    /// The static type of an operand.
    pub fn operand_type(&self, operand: &Operand) -> Type {
        match operand {
            Operand::Var(v) => self.var(*v).ty.clone(),
            Operand::Constant(c) => self.constant_type(c),
        }
    }

    /// The static type of a constant.
    pub fn constant_type(&self, constant: &Constant) -> Type {
        match constant {
            Constant::Int(n) => Type::Int {
                bit_width: n.bit_width(),
                sign: n.sign(),
            },
            Constant::Float { bit_width } => Type::Float {
                bit_width: *bit_width,
            },
            Constant::Null(ty) | Constant::Undefined(ty) | Constant::InlineAsm(ty) => ty.clone(),
            Constant::GlobalAddress(g) => Type::pointer(self.global(*g).ty.clone()),
            Constant::FunctionAddress(f) => {
                Type::Pointer(Arc::new(Type::Function(Arc::clone(&self.function(*f).ty))))
            }
            Constant::Aggregate { ty, .. }
            | Constant::AggregateZero(ty)
            | Constant::AggregateUndefined(ty) => ty.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_registry() {
        let mut bundle = Bundle::new(DataLayout::lp64());
        let f = bundle.add_function(
            "main",
            FunctionType {
                return_type: Type::si(32),
                parameters: vec![],
                variadic: false,
            },
        );
        assert_eq!(bundle.function_by_name("main"), Some(f));
        assert!(bundle.function(f).is_declaration());
        bundle.set_body(f, Code::new());
        assert!(!bundle.function(f).is_declaration());
    }

    #[test]
    fn operand_types() {
        let mut bundle = Bundle::new(DataLayout::lp64());
        let f = bundle.add_function(
            "f",
            FunctionType {
                return_type: Type::Void,
                parameters: vec![Type::si(32)],
                variadic: false,
            },
        );
        let p = bundle.add_parameter(f, "x", Type::si(32));
        assert_eq!(bundle.operand_type(&Operand::Var(p)), Type::si(32));

        let g = bundle.add_global("g", Type::si(64), None);
        assert_eq!(
            bundle.operand_type(&Operand::Constant(Constant::GlobalAddress(g))),
            Type::pointer(Type::si(64))
        );
    }
}
