//! Execution stages for each node kind
//!
//! An activation stores its progress through a node as a raw stage number so
//! it can be suspended and serialized at any boundary. Each node kind decodes
//! that number into its own phase enum; a number outside the kind's stage set
//! does not decode and is reported as an internal error.

macro_rules! stage_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident = $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(u32)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl TryFrom<u32> for $name {
            type Error = u32;

            fn try_from(stage: u32) -> Result<Self, u32> {
                match stage {
                    $($value => Ok($name::$variant),)+
                    other => Err(other),
                }
            }
        }

        impl From<$name> for u32 {
            fn from(phase: $name) -> u32 {
                phase as u32
            }
        }
    };
}

stage_enum!(
    /// Stages for expression statements
    ExprStmtPhase { Eval = 0, Discard = 1 }
);

stage_enum!(
    /// Stages for blocks
    BlockPhase { Enter = 0 }
);

stage_enum!(
    /// Stages for while and do-while loops
    WhilePhase {
        /// Run the body first when this is a do-while
        Enter = 0,
        /// Evaluate the condition
        Test = 1,
        /// Inspect the condition and loop or exit
        Check = 2,
    }
);

stage_enum!(
    /// Stages for forall loops driving the iterator protocol
    ForPhase {
        EvalIterator = 0,
        Start = 1,
        Valid = 2,
        Check = 3,
        Body = 4,
        Next = 5,
        Advance = 6,
    }
);

stage_enum!(
    /// Stages for conditional statements and expressions
    CondPhase { Test = 0, Branch = 1 }
);

stage_enum!(
    /// Stages for multi-way select
    SelectPhase { Eval = 0, Dispatch = 1 }
);

stage_enum!(
    /// Stages for return
    ReturnPhase { Eval = 0, Detach = 1 }
);

stage_enum!(
    /// Stages for assignment
    AssignPhase { Eval = 0, Store = 1 }
);

stage_enum!(
    /// Single-stage nodes (labels, gotos, leaf expressions)
    LeafPhase { Eval = 0 }
);

/// Stages for a call with `nargs` arguments
///
/// `0` evaluates the callee, `1..=nargs` evaluate each argument,
/// `nargs + 1` resolves and enters the call, `nargs + 2` collects the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Callee,
    Arg(usize),
    Invoke,
    Complete,
}

impl CallPhase {
    pub fn decode(stage: u32, nargs: usize) -> Option<Self> {
        let stage = stage as usize;
        match stage {
            0 => Some(CallPhase::Callee),
            s if s <= nargs => Some(CallPhase::Arg(s - 1)),
            s if s == nargs + 1 => Some(CallPhase::Invoke),
            s if s == nargs + 2 => Some(CallPhase::Complete),
            _ => None,
        }
    }

    pub fn invoke_stage(nargs: usize) -> u32 {
        (nargs + 1) as u32
    }

    pub fn complete_stage(nargs: usize) -> u32 {
        (nargs + 2) as u32
    }
}

/// Stages for a select arm with `ncases` case expressions
///
/// `0` enters, `1..=ncases` compare case `k - 1` with the selector,
/// `ncases + 1` leaves the enclosing select after the body ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhenPhase {
    Enter,
    Compare(usize),
    Leave,
}

impl WhenPhase {
    pub fn decode(stage: u32, ncases: usize) -> Option<Self> {
        let stage = stage as usize;
        match stage {
            0 => Some(WhenPhase::Enter),
            s if s <= ncases => Some(WhenPhase::Compare(s - 1)),
            s if s == ncases + 1 => Some(WhenPhase::Leave),
            _ => None,
        }
    }

    pub fn leave_stage(ncases: usize) -> u32 {
        (ncases + 1) as u32
    }
}
