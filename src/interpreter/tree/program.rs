//! Arena-backed syntax tree
//!
//! The interpreter never owns source text. It consumes a resolved tree in which
//! every statement, expression, variable, function and scope lives in a flat
//! arena and is addressed by a copyable id. Node identity is the id, which is
//! what the executor keys its environments on.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::interpreter::executor::forall::{Iterable, RangeIterable, RANGE_TYPE};
use crate::interpreter::executor::stdlib::Primitive;

/* ===================== Ids ===================== */

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Statement node id
    StmtId,
    "stmt"
);
define_id!(
    /// Expression node id
    ExprId,
    "expr"
);
define_id!(
    /// Variable (declared symbol) id
    VarId,
    "var"
);
define_id!(
    /// Function definition id
    FnId,
    "fn"
);
define_id!(
    /// Lexical scope id
    ScopeId,
    "scope"
);

/* ===================== Immediates ===================== */

/// Scalar immediate value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Immediate {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Immediate {
    pub fn type_name(&self) -> &'static str {
        match self {
            Immediate::Bool(_) => "bool",
            Immediate::Int(_) => "int",
            Immediate::Float(_) => "float",
            Immediate::Str(_) => "string",
        }
    }
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Immediate::Bool(b) => write!(f, "{}", b),
            Immediate::Int(i) => write!(f, "{}", i),
            Immediate::Float(x) => write!(f, "{}", x),
            Immediate::Str(s) => write!(f, "{}", s),
        }
    }
}

/* ===================== Statements ===================== */

#[derive(Debug, Clone)]
pub enum StmtKind {
    Expr(ExprId),
    Block {
        body: Option<StmtId>,
    },
    While {
        cond: ExprId,
        body: Option<StmtId>,
        /// `false` means do-while: the body runs once before the first test
        is_while_do: bool,
    },
    For {
        indices: Vec<VarId>,
        iterators: Vec<ExprId>,
        body: Option<StmtId>,
    },
    Cond {
        cond: ExprId,
        then_s: Option<StmtId>,
        else_s: Option<StmtId>,
    },
    Select {
        selector: ExprId,
        whens: Option<StmtId>,
    },
    When {
        cases: Vec<ExprId>,
        body: Option<StmtId>,
    },
    Return {
        value: Option<ExprId>,
    },
    Label {
        name: String,
    },
    Goto {
        target: StmtId,
    },
}

impl StmtKind {
    pub fn name(&self) -> &'static str {
        match self {
            StmtKind::Expr(_) => "ExprStmt",
            StmtKind::Block { .. } => "BlockStmt",
            StmtKind::While { .. } => "WhileLoopStmt",
            StmtKind::For { .. } => "ForLoopStmt",
            StmtKind::Cond { .. } => "CondStmt",
            StmtKind::Select { .. } => "SelectStmt",
            StmtKind::When { .. } => "WhenStmt",
            StmtKind::Return { .. } => "ReturnStmt",
            StmtKind::Label { .. } => "LabelStmt",
            StmtKind::Goto { .. } => "GotoStmt",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    /// Next statement in the same sequence
    pub next: Option<StmtId>,
    /// Enclosing compound statement (None at the top of a body)
    pub parent: Option<StmtId>,
    pub scope: ScopeId,
}

/* ===================== Expressions ===================== */

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Immediate),
    Sym(VarId),
    Def(VarId),
    Assign { target: VarId, value: ExprId },
    Name(String),
    FnRef(FnId),
    Call { callee: ExprId, args: Vec<ExprId> },
    Cond { cond: ExprId, then_e: ExprId, else_e: ExprId },
    Closure { params: Vec<VarId>, body: Option<StmtId> },
}

impl ExprKind {
    pub fn name(&self) -> &'static str {
        match self {
            ExprKind::Literal(_) => "LiteralExpr",
            ExprKind::Sym(_) => "SymExpr",
            ExprKind::Def(_) => "DefExpr",
            ExprKind::Assign { .. } => "AssignExpr",
            ExprKind::Name(_) => "NameExpr",
            ExprKind::FnRef(_) => "FnRefExpr",
            ExprKind::Call { .. } => "CallExpr",
            ExprKind::Cond { .. } => "CondExpr",
            ExprKind::Closure { .. } => "ClosureExpr",
        }
    }
}

/* ===================== Symbols ===================== */

#[derive(Debug, Clone)]
pub struct Var {
    pub name: String,
}

#[derive(Debug, Clone)]
pub enum FnBody {
    User(Option<StmtId>),
    Native(Primitive),
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<VarId>,
    pub body: FnBody,
    /// Scope the function is declared in
    pub scope: ScopeId,
}

impl Function {
    pub fn arity(&self) -> usize {
        match &self.body {
            FnBody::User(_) => self.params.len(),
            FnBody::Native(p) => p.arity(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub functions: Vec<FnId>,
}

/// One top-level compilation unit
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub body: Option<StmtId>,
    pub scope: ScopeId,
}

/* ===================== Program ===================== */

/// A fully resolved program, shared read-only by every execution context
pub struct Program {
    pub(crate) stmts: Vec<Stmt>,
    pub(crate) exprs: Vec<ExprKind>,
    pub(crate) vars: Vec<Var>,
    pub(crate) functions: Vec<Function>,
    pub(crate) scopes: Vec<Scope>,
    pub(crate) modules: Vec<Module>,
    pub(crate) entry: Option<FnId>,
    iterables: HashMap<String, Box<dyn Iterable>>,
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("stmts", &self.stmts.len())
            .field("exprs", &self.exprs.len())
            .field("functions", &self.functions.len())
            .field("modules", &self.modules.len())
            .field("entry", &self.entry)
            .finish()
    }
}

impl Program {
    pub(crate) fn empty() -> Self {
        let mut program = Program {
            stmts: Vec::new(),
            exprs: Vec::new(),
            vars: Vec::new(),
            functions: Vec::new(),
            scopes: vec![Scope::default()],
            modules: Vec::new(),
            entry: None,
            iterables: HashMap::new(),
        };
        program.register_iterable(RANGE_TYPE, RangeIterable);
        program
    }

    /// The prelude scope holding native primitives
    pub fn root_scope(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    pub fn expr(&self, id: ExprId) -> &ExprKind {
        &self.exprs[id.index()]
    }

    pub fn var(&self, id: VarId) -> &Var {
        &self.vars[id.index()]
    }

    pub fn function(&self, id: FnId) -> &Function {
        &self.functions[id.index()]
    }

    /// Every function, primitives first
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn entry(&self) -> Option<FnId> {
        self.entry
    }

    /// Every function called `name` visible from `scope`, innermost scope first
    pub fn visible_functions(&self, scope: ScopeId, name: &str) -> Vec<FnId> {
        let mut found = Vec::new();
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            let scope = &self.scopes[id.index()];
            found.extend(
                scope
                    .functions
                    .iter()
                    .copied()
                    .filter(|f| self.functions[f.index()].name == name),
            );
            cursor = scope.parent;
        }
        found
    }

    /// Register a native iterator implementation for heap objects of `type_name`
    pub fn register_iterable(&mut self, type_name: impl Into<String>, iterable: impl Iterable + 'static) {
        self.iterables.insert(type_name.into(), Box::new(iterable));
    }

    pub fn iterable(&self, type_name: &str) -> Option<&dyn Iterable> {
        self.iterables.get(type_name).map(|b| b.as_ref())
    }

    /* ----- arena construction (used by the loader) ----- */

    pub(crate) fn add_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            functions: Vec::new(),
        });
        id
    }

    pub(crate) fn add_function(&mut self, function: Function) -> FnId {
        let id = FnId(self.functions.len() as u32);
        self.scopes[function.scope.index()].functions.push(id);
        self.functions.push(function);
        id
    }

    pub(crate) fn add_var(&mut self, name: &str) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(Var {
            name: name.to_string(),
        });
        id
    }

    pub(crate) fn add_expr(&mut self, kind: ExprKind) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(kind);
        id
    }

    pub(crate) fn add_stmt(&mut self, kind: StmtKind, parent: Option<StmtId>, scope: ScopeId) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(Stmt {
            kind,
            next: None,
            parent,
            scope,
        });
        id
    }
}
