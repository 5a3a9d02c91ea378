//! Loader: serialized program form -> arena tree
//!
//! Lowering resolves variable names lexically, links statement sequences,
//! resolves goto labels and rejects gotos that would jump into a nested
//! statement, then picks the entry function.

use std::collections::HashMap;

use super::ast::{ExprDef, FunctionDef, ModuleDef, ProgramDef, StmtDef, WhenDef};
use super::program::{
    ExprId, ExprKind, FnBody, FnId, Function, Immediate, Module, Program, ScopeId, StmtId,
    StmtKind, VarId,
};
use super::TreeError;
use crate::interpreter::executor::stdlib::Primitive;

const DEFAULT_ENTRY: &str = "main";

/// Parse a JSON program and lower it
pub fn parse_program(json: &str) -> Result<Program, TreeError> {
    let def: ProgramDef = serde_json::from_str(json)?;
    load_program(&def)
}

/// Lower a program definition into an arena tree
pub fn load_program(def: &ProgramDef) -> Result<Program, TreeError> {
    let mut program = Program::empty();
    let root = program.root_scope();
    for primitive in Primitive::ALL {
        program.add_function(Function {
            name: primitive.name().to_string(),
            params: Vec::new(),
            body: FnBody::Native(primitive),
            scope: root,
        });
    }

    let mut lowerer = Lowerer {
        program: &mut program,
        frames: Vec::new(),
    };
    let mut module_fns = Vec::new();
    for module in &def.modules {
        module_fns.extend(lowerer.lower_module(module)?);
    }

    program.entry = resolve_entry(&program, &module_fns, def.entry.as_deref())?;
    Ok(program)
}

fn resolve_entry(
    program: &Program,
    candidates: &[FnId],
    requested: Option<&str>,
) -> Result<Option<FnId>, TreeError> {
    let name = requested.unwrap_or(DEFAULT_ENTRY);
    let matches: Vec<FnId> = candidates
        .iter()
        .copied()
        .filter(|f| program.function(*f).name == name)
        .collect();

    match (matches.as_slice(), requested) {
        ([only], _) => Ok(Some(*only)),
        ([], None) => Ok(None),
        ([], Some(_)) => Err(TreeError::MissingEntry(name.to_string())),
        (_, _) => Err(TreeError::AmbiguousEntry(name.to_string())),
    }
}

/* ===================== Lowering state ===================== */

/// Labels and pending gotos of one function or module body
#[derive(Default)]
struct BodyCx {
    labels: HashMap<String, StmtId>,
    gotos: Vec<(StmtId, String)>,
}

struct Lowerer<'p> {
    program: &'p mut Program,
    /// Lexical variable frames, innermost last
    frames: Vec<HashMap<String, VarId>>,
}

impl Lowerer<'_> {
    fn lower_module(&mut self, module: &ModuleDef) -> Result<Vec<FnId>, TreeError> {
        let root = self.program.root_scope();
        let scope = self.program.add_scope(Some(root));
        let fns = self.declare_functions(&module.functions, scope);

        self.frames.push(HashMap::new());
        let mut cx = BodyCx::default();
        let body = self.lower_seq(&module.body, None, scope, &mut cx)?;
        self.patch_gotos(cx)?;

        for (id, def) in fns.iter().zip(&module.functions) {
            self.lower_function(*id, def)?;
        }
        self.frames.pop();

        self.program.modules.push(Module {
            name: module.name.clone(),
            body,
            scope,
        });
        Ok(fns)
    }

    /// Register functions up front so bodies can call each other in any order
    fn declare_functions(&mut self, defs: &[FunctionDef], scope: ScopeId) -> Vec<FnId> {
        defs.iter()
            .map(|def| {
                let params = def.params.iter().map(|p| self.program.add_var(p)).collect();
                self.program.add_function(Function {
                    name: def.name.clone(),
                    params,
                    body: FnBody::User(None),
                    scope,
                })
            })
            .collect()
    }

    fn lower_function(&mut self, id: FnId, def: &FunctionDef) -> Result<(), TreeError> {
        let outer = self.program.function(id).scope;
        let scope = self.program.add_scope(Some(outer));
        let nested = self.declare_functions(&def.functions, scope);

        let params = self.program.function(id).params.clone();
        let frame = def.params.iter().cloned().zip(params).collect();
        self.frames.push(frame);

        let mut cx = BodyCx::default();
        let body = self.lower_seq(&def.body, None, scope, &mut cx)?;
        self.patch_gotos(cx)?;
        self.program.functions[id.index()].body = FnBody::User(body);

        for (nid, ndef) in nested.iter().zip(&def.functions) {
            self.lower_function(*nid, ndef)?;
        }
        self.frames.pop();
        Ok(())
    }

    fn patch_gotos(&mut self, cx: BodyCx) -> Result<(), TreeError> {
        for (goto, label) in cx.gotos {
            let target = *cx
                .labels
                .get(&label)
                .ok_or_else(|| TreeError::UnknownLabel(label.clone()))?;

            // The label's enclosing statement must enclose the goto as well
            let label_parent = self.program.stmt(target).parent;
            let mut cursor = self.program.stmt(goto).parent;
            while cursor != label_parent {
                match cursor {
                    Some(s) => cursor = self.program.stmt(s).parent,
                    None => return Err(TreeError::GotoIntoNestedScope(label)),
                }
            }

            self.program.stmts[goto.index()].kind = StmtKind::Goto { target };
        }
        Ok(())
    }

    /* ===================== Variables ===================== */

    fn declare(&mut self, name: &str) -> VarId {
        let id = self.program.add_var(name);
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), id);
        }
        id
    }

    fn lookup(&self, name: &str) -> Result<VarId, TreeError> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).copied())
            .ok_or_else(|| TreeError::UnknownName(name.to_string()))
    }

    /* ===================== Statements ===================== */

    /// Lower a statement sequence in its own variable frame and link it
    fn lower_seq(
        &mut self,
        defs: &[StmtDef],
        parent: Option<StmtId>,
        scope: ScopeId,
        cx: &mut BodyCx,
    ) -> Result<Option<StmtId>, TreeError> {
        self.frames.push(HashMap::new());
        let mut ids = Vec::with_capacity(defs.len());
        for def in defs {
            ids.push(self.lower_stmt(def, parent, scope, cx)?);
        }
        self.frames.pop();

        for pair in ids.windows(2) {
            self.program.stmts[pair[0].index()].next = Some(pair[1]);
        }
        Ok(ids.first().copied())
    }

    fn lower_stmt(
        &mut self,
        def: &StmtDef,
        parent: Option<StmtId>,
        scope: ScopeId,
        cx: &mut BodyCx,
    ) -> Result<StmtId, TreeError> {
        // Compound statements are allocated first so their children can
        // point back at them; the kind is filled in once children exist.
        let id = self
            .program
            .add_stmt(StmtKind::Block { body: None }, parent, scope);

        let kind = match def {
            StmtDef::Expr { expr } => StmtKind::Expr(self.lower_expr(expr, scope)?),

            StmtDef::Block { body } => StmtKind::Block {
                body: self.lower_seq(body, Some(id), scope, cx)?,
            },

            StmtDef::While {
                cond,
                body,
                do_while,
            } => {
                let cond = self.lower_expr(cond, scope)?;
                StmtKind::While {
                    cond,
                    body: self.lower_seq(body, Some(id), scope, cx)?,
                    is_while_do: !do_while,
                }
            }

            StmtDef::For {
                indices,
                iterators,
                body,
            } => {
                let iterators = iterators
                    .iter()
                    .map(|e| self.lower_expr(e, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                self.frames.push(HashMap::new());
                let indices = indices.iter().map(|name| self.declare(name)).collect();
                let body = self.lower_seq(body, Some(id), scope, cx);
                self.frames.pop();
                StmtKind::For {
                    indices,
                    iterators,
                    body: body?,
                }
            }

            StmtDef::If {
                cond,
                then_s,
                else_s,
            } => {
                let cond = self.lower_expr(cond, scope)?;
                StmtKind::Cond {
                    cond,
                    then_s: self.lower_seq(then_s, Some(id), scope, cx)?,
                    else_s: self.lower_seq(else_s, Some(id), scope, cx)?,
                }
            }

            StmtDef::Select { selector, whens } => {
                let selector = self.lower_expr(selector, scope)?;
                StmtKind::Select {
                    selector,
                    whens: self.lower_whens(whens, id, scope, cx)?,
                }
            }

            StmtDef::Return { value } => StmtKind::Return {
                value: value
                    .as_ref()
                    .map(|e| self.lower_expr(e, scope))
                    .transpose()?,
            },

            StmtDef::Label { name } => {
                if cx.labels.insert(name.clone(), id).is_some() {
                    return Err(TreeError::DuplicateLabel(name.clone()));
                }
                StmtKind::Label { name: name.clone() }
            }

            StmtDef::Goto { label } => {
                cx.gotos.push((id, label.clone()));
                // patched once every label of the body is known
                StmtKind::Goto { target: id }
            }
        };

        self.program.stmts[id.index()].kind = kind;
        Ok(id)
    }

    fn lower_whens(
        &mut self,
        whens: &[WhenDef],
        select: StmtId,
        scope: ScopeId,
        cx: &mut BodyCx,
    ) -> Result<Option<StmtId>, TreeError> {
        let mut ids = Vec::with_capacity(whens.len());
        for when in whens {
            let id = self
                .program
                .add_stmt(StmtKind::Block { body: None }, Some(select), scope);
            let cases = when
                .cases
                .iter()
                .map(|e| self.lower_expr(e, scope))
                .collect::<Result<Vec<_>, _>>()?;
            let body = self.lower_seq(&when.body, Some(id), scope, cx)?;
            self.program.stmts[id.index()].kind = StmtKind::When { cases, body };
            ids.push(id);
        }
        for pair in ids.windows(2) {
            self.program.stmts[pair[0].index()].next = Some(pair[1]);
        }
        Ok(ids.first().copied())
    }

    /* ===================== Expressions ===================== */

    fn lower_expr(&mut self, def: &ExprDef, scope: ScopeId) -> Result<ExprId, TreeError> {
        let kind = match def {
            ExprDef::Bool { v } => ExprKind::Literal(Immediate::Bool(*v)),
            ExprDef::Int { v } => ExprKind::Literal(Immediate::Int(*v)),
            ExprDef::Float { v } => ExprKind::Literal(Immediate::Float(*v)),
            ExprDef::Str { v } => ExprKind::Literal(Immediate::Str(v.clone())),
            ExprDef::Var { name } => ExprKind::Sym(self.lookup(name)?),
            ExprDef::Let { name } => ExprKind::Def(self.declare(name)),
            ExprDef::Assign { name, value } => {
                let target = self.lookup(name)?;
                ExprKind::Assign {
                    target,
                    value: self.lower_expr(value, scope)?,
                }
            }
            ExprDef::Name { name } => ExprKind::Name(name.clone()),
            ExprDef::FnRef { name } => {
                let visible = self.program.visible_functions(scope, name);
                match visible.as_slice() {
                    [only] => ExprKind::FnRef(*only),
                    _ => {
                        return Err(TreeError::UnresolvedFunction {
                            name: name.clone(),
                            candidates: visible.len(),
                        })
                    }
                }
            }
            ExprDef::Call { callee, args } => {
                let callee = self.lower_expr(callee, scope)?;
                let args = args
                    .iter()
                    .map(|a| self.lower_expr(a, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                ExprKind::Call { callee, args }
            }
            ExprDef::If {
                cond,
                then_e,
                else_e,
            } => ExprKind::Cond {
                cond: self.lower_expr(cond, scope)?,
                then_e: self.lower_expr(then_e, scope)?,
                else_e: self.lower_expr(else_e, scope)?,
            },
            ExprDef::Closure { params, body } => {
                self.frames.push(HashMap::new());
                let params = params.iter().map(|p| self.declare(p)).collect();
                let mut cx = BodyCx::default();
                let body = self.lower_seq(body, None, scope, &mut cx);
                self.frames.pop();
                let body = body?;
                self.patch_gotos(cx)?;
                ExprKind::Closure { params, body }
            }
        };
        Ok(self.program.add_expr(kind))
    }
}
