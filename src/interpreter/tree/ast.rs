//! Serialized program form
//!
//! This is the shape an upstream compiler hands over: nested, name-based,
//! and tagged with `"t"` so it reads naturally as JSON. The loader in
//! [`super::lower`] turns it into the id-addressed [`super::Program`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramDef {
    pub modules: Vec<ModuleDef>,
    /// Entry function name; `main` is used when present and this is unset
    #[serde(default)]
    pub entry: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDef {
    pub name: String,
    #[serde(default)]
    pub functions: Vec<FunctionDef>,
    #[serde(default)]
    pub body: Vec<StmtDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    /// Nested function definitions, visible only inside this function
    #[serde(default)]
    pub functions: Vec<FunctionDef>,
    #[serde(default)]
    pub body: Vec<StmtDef>,
}

/// Statement AST node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum StmtDef {
    Expr {
        expr: ExprDef,
    },
    Block {
        body: Vec<StmtDef>,
    },
    While {
        cond: ExprDef,
        #[serde(default)]
        body: Vec<StmtDef>,
        #[serde(default)]
        do_while: bool,
    },
    For {
        indices: Vec<String>,
        iterators: Vec<ExprDef>,
        #[serde(default)]
        body: Vec<StmtDef>,
    },
    If {
        cond: ExprDef,
        #[serde(default)]
        then_s: Vec<StmtDef>,
        #[serde(default)]
        else_s: Vec<StmtDef>,
    },
    Select {
        selector: ExprDef,
        whens: Vec<WhenDef>,
    },
    Return {
        #[serde(default)]
        value: Option<ExprDef>,
    },
    Label {
        name: String,
    },
    Goto {
        label: String,
    },
}

/// One arm of a select; no cases means "otherwise"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhenDef {
    #[serde(default)]
    pub cases: Vec<ExprDef>,
    #[serde(default)]
    pub body: Vec<StmtDef>,
}

/// Expression AST node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum ExprDef {
    Bool {
        v: bool,
    },
    Int {
        v: i64,
    },
    Float {
        v: f64,
    },
    Str {
        v: String,
    },
    Var {
        name: String,
    },
    Let {
        name: String,
    },
    Assign {
        name: String,
        value: Box<ExprDef>,
    },
    Name {
        name: String,
    },
    /// Function bound when the program is loaded
    FnRef {
        name: String,
    },
    Call {
        callee: Box<ExprDef>,
        #[serde(default)]
        args: Vec<ExprDef>,
    },
    If {
        cond: Box<ExprDef>,
        then_e: Box<ExprDef>,
        else_e: Box<ExprDef>,
    },
    Closure {
        #[serde(default)]
        params: Vec<String>,
        #[serde(default)]
        body: Vec<StmtDef>,
    },
}
