use strum_macros::{Display, EnumString};
use enum_assoc::Assoc;

/// TacOp is the closed alphabet of quadruple operations produced by the
/// intermediate code generator and consumed by the MIPS backend.
/// Each variant carries its listing mnemonic (via strum serialization) and
/// whether the operation writes a value into its result slot.
#[derive(Debug,
         Eq, PartialEq,
         Copy, Clone,
         Display, EnumString,
         Assoc)]
#[func(pub const fn has_result(&self) -> bool)] // Does the operation write its result slot
pub enum TacOp {
    // Arithmetic
    #[strum(serialize = "+")]
    #[assoc(has_result = true)]
    Add,
    #[strum(serialize = "-")]
    #[assoc(has_result = true)]
    Sub,
    #[strum(serialize = "*")]
    #[assoc(has_result = true)]
    Mul,
    #[strum(serialize = "/")]
    #[assoc(has_result = true)]
    Div,
    #[strum(serialize = "%")]
    #[assoc(has_result = true)]
    Mod,

    // Relational
    #[strum(serialize = "<")]
    #[assoc(has_result = true)]
    Lt,
    #[strum(serialize = "<=")]
    #[assoc(has_result = true)]
    Le,
    #[strum(serialize = ">")]
    #[assoc(has_result = true)]
    Gt,
    #[strum(serialize = ">=")]
    #[assoc(has_result = true)]
    Ge,
    #[strum(serialize = "==")]
    #[assoc(has_result = true)]
    Eq,
    #[strum(serialize = "!=")]
    #[assoc(has_result = true)]
    Ne,

    // Logical
    #[strum(serialize = "&&")]
    #[assoc(has_result = true)]
    And,
    #[strum(serialize = "||")]
    #[assoc(has_result = true)]
    Or,
    #[strum(serialize = "!")]
    #[assoc(has_result = true)]
    Not,
    #[strum(serialize = "neg")]
    #[assoc(has_result = true)]
    Neg,

    // Assignment and indexing
    #[strum(serialize = "=")]
    #[assoc(has_result = true)]
    Assign,
    #[strum(serialize = "[]")]
    #[assoc(has_result = true)]
    IndexGet,
    #[strum(serialize = "[]=")]
    #[assoc(has_result = false)]
    IndexSet,
    #[strum(serialize = "alloc")]
    #[assoc(has_result = true)]
    Alloc,

    // Control flow
    #[strum(serialize = "label")]
    #[assoc(has_result = false)]
    Label,
    #[strum(serialize = "if")]
    #[assoc(has_result = false)]
    If,
    #[strum(serialize = "goto")]
    #[assoc(has_result = false)]
    Goto,

    // Functions
    #[strum(serialize = "FUNC")]
    #[assoc(has_result = false)]
    Func,
    #[strum(serialize = "param")]
    #[assoc(has_result = false)]
    Param,
    #[strum(serialize = "endfunc")]
    #[assoc(has_result = false)]
    EndFunc,
    #[strum(serialize = "RETURN")]
    #[assoc(has_result = false)]
    Return,
    #[strum(serialize = "CALL_FUNC")]
    #[assoc(has_result = true)]
    CallFunc,
    #[strum(serialize = "CALL_METHOD")]
    #[assoc(has_result = true)]
    CallMethod,

    // Objects
    #[strum(serialize = "ALLOC_OBJ")]
    #[assoc(has_result = true)]
    AllocObj,
    #[strum(serialize = "CALL_CONSTRUCTOR")]
    #[assoc(has_result = true)]
    CallConstructor,
    #[strum(serialize = "GET_FIELD")]
    #[assoc(has_result = true)]
    GetField,
    #[strum(serialize = "SET_FIELD")]
    #[assoc(has_result = false)]
    SetField,

    // Classes
    #[strum(serialize = "CLASS")]
    #[assoc(has_result = false)]
    Class,
    #[strum(serialize = "INHERIT")]
    #[assoc(has_result = false)]
    Inherit,
    #[strum(serialize = "FIELD")]
    #[assoc(has_result = false)]
    Field,
    #[strum(serialize = "FIELD_CONST")]
    #[assoc(has_result = false)]
    FieldConst,
    #[strum(serialize = "ENDCLASS")]
    #[assoc(has_result = false)]
    EndClass,

    // I/O
    #[strum(serialize = "PRINT")]
    #[assoc(has_result = false)]
    Print,

    // Exceptions
    #[strum(serialize = "ON_EXCEPTION")]
    #[assoc(has_result = false)]
    OnException,
    #[strum(serialize = "EXC_ASSIGN")]
    #[assoc(has_result = false)]
    ExcAssign,
}

impl TacOp {
    /// True for the two-operand value operations lowered as `res = a1 op a2`.
    pub fn is_binary(&self) -> bool {
        matches!(self,
            TacOp::Add | TacOp::Sub | TacOp::Mul | TacOp::Div | TacOp::Mod
          | TacOp::Lt | TacOp::Le | TacOp::Gt | TacOp::Ge | TacOp::Eq | TacOp::Ne
          | TacOp::And | TacOp::Or)
    }

    /// True for the one-operand value operations lowered as `res = op a1`.
    pub fn is_unary(&self) -> bool {
        matches!(self, TacOp::Not | TacOp::Neg)
    }

    /// True when the arg2 slot of the quadruple holds an argument or
    /// parameter count rather than a value operand.
    pub fn arg2_is_count(&self) -> bool {
        matches!(self,
            TacOp::Func | TacOp::CallFunc | TacOp::CallMethod | TacOp::CallConstructor)
    }
}
