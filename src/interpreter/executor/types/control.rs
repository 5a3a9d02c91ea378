//! Activations and their environments

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::values::Slot;
use crate::interpreter::tree::{ExprId, FnId, ScopeId, StmtId, VarId};

/* ===================== Environment ===================== */

/// Syntax-node identity used as an environment key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "t", content = "id")]
pub enum NodeKey {
    Stmt(StmtId),
    Expr(ExprId),
    Var(VarId),
}

/// Per-activation map from syntax node to slot
///
/// Holds true locals (keyed by variable) and memoized sub-expression values
/// (keyed by expression or statement). A key's slot is stable for the life of
/// the activation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    slots: HashMap<NodeKey, Slot>,
}

impl Environment {
    pub fn get(&self, key: NodeKey) -> Option<&Slot> {
        self.slots.get(&key)
    }

    /// The slot for `key`, created empty on first use
    pub fn slot(&mut self, key: NodeKey) -> &mut Slot {
        self.slots.entry(key).or_default()
    }

    pub fn put(&mut self, key: NodeKey, value: Slot) {
        self.slots.insert(key, value);
    }

    /// Allocate a fresh, uninitialized slot for a declared variable
    pub fn declare(&mut self, var: VarId) {
        self.slots.insert(NodeKey::Var(var), Slot::Uninitialized);
    }

    pub fn values(&self) -> impl Iterator<Item = &Slot> {
        self.slots.values()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// JSON maps need string keys, so the environment travels as a list of pairs.
impl Serialize for Environment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.slots.iter())
    }
}

impl<'de> Deserialize<'de> for Environment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pairs = Vec::<(NodeKey, Slot)>::deserialize(deserializer)?;
        Ok(Environment {
            slots: pairs.into_iter().collect(),
        })
    }
}

/* ===================== Activation ===================== */

/// Outcome of a statement handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmtFlow {
    /// More work is scheduled for this statement or its children
    Pending,
    /// The statement finished; advance to the next one
    Complete,
    /// Cursor relocated by a goto
    Jumped,
    /// The activation was detached by a return
    Returned,
}

/// One evaluation context
///
/// Pending work lives in explicit stacks instead of the host call stack:
/// statements waiting for a child sequence (with the stage to resume at),
/// expressions waiting for a sub-expression (with their own stage), and the
/// evaluated operand values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activation {
    pub env: Environment,

    /// Statements suspended on a child sequence; parallel to `stage_stack`
    pub stmt_stack: Vec<StmtId>,
    pub stage_stack: Vec<u32>,

    /// Expressions suspended on a sub-expression, with their resume stage
    pub expr_stack: Vec<(ExprId, u32)>,

    /// Evaluated operands
    pub val_stack: Vec<Slot>,

    pub stmt: Option<StmtId>,
    pub expr: Option<ExprId>,
    /// Progress of the current statement
    pub stage: u32,
    /// Progress of the current expression
    pub expr_stage: u32,

    /// Function being run; None for a compilation unit body
    pub function: Option<FnId>,
    pub scope: ScopeId,
}

impl Activation {
    pub fn new(stmt: Option<StmtId>, scope: ScopeId) -> Self {
        Activation {
            env: Environment::default(),
            stmt_stack: Vec::new(),
            stage_stack: Vec::new(),
            expr_stack: Vec::new(),
            val_stack: Vec::new(),
            stmt,
            expr: None,
            stage: 0,
            expr_stage: 0,
            function: None,
            scope,
        }
    }

    /// Nothing left to run in this activation
    pub fn is_exhausted(&self) -> bool {
        self.stmt.is_none() && self.expr.is_none()
    }

    pub fn push_continuation(&mut self, stmt: StmtId, stage: u32) {
        self.stmt_stack.push(stmt);
        self.stage_stack.push(stage);
    }

    pub fn pop_continuation(&mut self) -> Option<(StmtId, u32)> {
        let stmt = self.stmt_stack.pop()?;
        let stage = self.stage_stack.pop()?;
        Some((stmt, stage))
    }

    /// Run a child statement sequence, then resume the current statement at `resume`
    ///
    /// Resuming at stage 0 means the current statement is finished once the
    /// child sequence is.
    pub fn descend(&mut self, child: Option<StmtId>, resume: u32) -> StmtFlow {
        match (child, self.stmt) {
            (Some(child), Some(current)) => {
                self.push_continuation(current, resume);
                self.stmt = Some(child);
                self.stage = 0;
                StmtFlow::Pending
            }
            _ if resume == 0 => StmtFlow::Complete,
            _ => {
                self.stage = resume;
                StmtFlow::Pending
            }
        }
    }

    /// Evaluate `child`, resuming the current node at `resume` afterwards
    pub fn eval(&mut self, child: ExprId, resume: u32) {
        match self.expr {
            Some(current) => self.expr_stack.push((current, resume)),
            None => self.stage = resume,
        }
        self.expr = Some(child);
        self.expr_stage = 0;
    }

    /// Finish the current expression with `value`
    ///
    /// The value is memoized under the expression and pushed as an operand;
    /// control returns to the suspended expression or, with none left, to the
    /// current statement.
    pub fn finish_expr(&mut self, value: Slot) {
        if let Some(expr) = self.expr {
            self.env.put(NodeKey::Expr(expr), value.clone());
        }
        self.val_stack.push(value);
        match self.expr_stack.pop() {
            Some((expr, stage)) => {
                self.expr = Some(expr);
                self.expr_stage = stage;
            }
            None => {
                self.expr = None;
                self.expr_stage = 0;
            }
        }
    }

    pub fn roots(&self) -> impl Iterator<Item = &Slot> {
        self.env.values().chain(self.val_stack.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_is_stable_per_key() {
        let mut env = Environment::default();
        let key = NodeKey::Var(VarId(3));

        *env.slot(key) = Slot::int(7);
        assert_eq!(env.slot(key), &Slot::int(7));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn test_continuation_stacks_move_together() {
        let mut frame = Activation::new(Some(StmtId(0)), ScopeId(0));
        assert_eq!(frame.descend(Some(StmtId(1)), 2), StmtFlow::Pending);
        assert_eq!(frame.stmt_stack.len(), frame.stage_stack.len());
        assert_eq!(frame.pop_continuation(), Some((StmtId(0), 2)));
        assert_eq!(frame.pop_continuation(), None);
        assert!(frame.stage_stack.is_empty());
    }

    #[test]
    fn test_descend_into_nothing() {
        let mut frame = Activation::new(Some(StmtId(0)), ScopeId(0));
        assert_eq!(frame.descend(None, 0), StmtFlow::Complete);
        assert_eq!(frame.descend(None, 3), StmtFlow::Pending);
        assert_eq!(frame.stage, 3);
        assert!(frame.stmt_stack.is_empty());
    }

    #[test]
    fn test_environment_round_trips_through_json() {
        let mut env = Environment::default();
        env.put(NodeKey::Var(VarId(1)), Slot::int(5));
        env.put(NodeKey::Expr(ExprId(2)), Slot::Selector("f".to_string()));

        let json = serde_json::to_string(&env).unwrap();
        let back: Environment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, env);
    }
}
