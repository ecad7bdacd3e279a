use std::fmt;

/// Operand is the sum type for quadruple argument and result slots.
/// Keeping the operand kinds distinct (instead of flat strings) lets the
/// backend dispatch on what a slot actually holds: a literal gets a `li`,
/// a temporary gets a register, a name gets resolved against the symbol
/// table, a label is only ever a branch target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Integer literal, e.g. `42`
    Integer(i64),

    /// Boolean literal, `true` or `false`
    Boolean(bool),

    /// Quoted string literal. Stored without the surrounding quotes.
    Text(String),

    /// The `null` literal
    Null,

    /// Compiler temporary `t<n>` minted by the quadruple table
    Temporary(u32),

    /// Source-level identifier resolved through the symbol table
    Name(String),

    /// Branch target / label name
    Label(String),

    /// Member path such as `obj.prop` or `arr.size`.
    /// The object part is a name or temporary rendered as text.
    Member {
        object: String,
        property: String,
    },

    /// Indexed slot such as `t1[0]`, used when filling array literals
    /// and when binding the foreach element.
    Indexed {
        base: String,
        index: Box<Operand>,
    },

    /// Argument or parameter count for FUNC / CALL_* quadruples
    Count(usize),
}

impl Operand {
    pub fn name<S: Into<String>>(name: S) -> Self {
        Operand::Name(name.into())
    }

    pub fn label<S: Into<String>>(name: S) -> Self {
        Operand::Label(name.into())
    }

    pub fn member<S: Into<String>, P: Into<String>>(object: S, property: P) -> Self {
        Operand::Member { object: object.into(), property: property.into() }
    }

    pub fn indexed<S: Into<String>>(base: S, index: Operand) -> Self {
        Operand::Indexed { base: base.into(), index: Box::new(index) }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, Operand::Temporary(_))
    }

    /// Name of a label operand if this is one
    pub fn label_name(&self) -> Option<&str> {
        match self {
            Operand::Label(name) => Some(name.as_str()),
            _ => None
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Integer(value) => write!(f, "{}", value),
            Operand::Boolean(value) => write!(f, "{}", value),
            Operand::Text(value) => write!(f, "\"{}\"", value),
            Operand::Null => write!(f, "null"),
            Operand::Temporary(id) => write!(f, "t{}", id),
            Operand::Name(name) => write!(f, "{}", name),
            Operand::Label(name) => write!(f, "{}", name),
            Operand::Member { object, property } => write!(f, "{}.{}", object, property),
            Operand::Indexed { base, index } => write!(f, "{}[{}]", base, index),
            Operand::Count(count) => write!(f, "{}", count),
        }
    }
}
