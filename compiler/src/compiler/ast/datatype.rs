use std::fmt;

/// Base types supported by the Compiscript type system.
/// Anything that is not a primitive name resolves as a class type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseType {
    Integer,
    Boolean,
    Str,
    Null,
    Exception,
    Class(String)
}

impl BaseType {
    /// Convert a source type name to a base type.
    /// Unknown names are class references by construction of the grammar.
    pub fn parse(name: &str) -> BaseType {
        match name.trim() {
            "integer" => Self::Integer,
            "boolean" => Self::Boolean,
            "string" => Self::Str,
            "null" => Self::Null,
            other => Self::Class(String::from(other))
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            BaseType::Class(name) => Some(name.as_str()),
            _ => None
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseType::Integer => write!(f, "integer"),
            BaseType::Boolean => write!(f, "boolean"),
            BaseType::Str => write!(f, "string"),
            BaseType::Null => write!(f, "null"),
            BaseType::Exception => write!(f, "exception"),
            BaseType::Class(name) => write!(f, "{}", name),
        }
    }
}

/// Every expression and symbol carries a (base, rank) pair.
/// Rank 0 is a scalar, rank n >= 1 an n-dimensional array. A base of `None`
/// means the type is unknown: either a diagnosed violation propagating
/// without cascading, or a void function return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataType {
    pub base: Option<BaseType>,
    pub rank: usize,
}

impl DataType {
    pub fn scalar(base: BaseType) -> Self {
        DataType { base: Some(base), rank: 0 }
    }

    pub fn array(base: BaseType, rank: usize) -> Self {
        DataType { base: Some(base), rank }
    }

    /// The propagated "unknown" type. One mismatch must not cascade, so
    /// checks against an unknown operand stay silent.
    pub fn unknown() -> Self {
        DataType { base: None, rank: 0 }
    }

    /// Void function return: no base, rank 0, distinguished only by context.
    pub fn void() -> Self {
        DataType { base: None, rank: 0 }
    }

    pub fn integer() -> Self {
        Self::scalar(BaseType::Integer)
    }

    pub fn boolean() -> Self {
        Self::scalar(BaseType::Boolean)
    }

    pub fn is_unknown(&self) -> bool {
        self.base.is_none()
    }

    pub fn is_array(&self) -> bool {
        self.rank > 0
    }

    pub fn is_scalar_of(&self, base: &BaseType) -> bool {
        self.rank == 0 && self.base.as_ref() == Some(base)
    }

    /// Element type of an array: same base, rank reduced by one.
    pub fn element(&self) -> DataType {
        DataType {
            base: self.base.clone(),
            rank: self.rank.saturating_sub(1),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.base {
            Some(base) => {
                write!(f, "{}", base)?;
                for _ in 0..self.rank {
                    write!(f, "[]")?;
                }
                Ok(())
            }
            None => write!(f, "void")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BaseType, DataType};

    #[test]
    fn test_base_type_parse() {
        assert_eq!(BaseType::parse("integer"), BaseType::Integer);
        assert_eq!(BaseType::parse("boolean"), BaseType::Boolean);
        assert_eq!(BaseType::parse("string"), BaseType::Str);
        assert_eq!(BaseType::parse("Dog"), BaseType::Class(String::from("Dog")));
    }

    #[test]
    fn test_element_reduces_rank() {
        let matrix = DataType::array(BaseType::Integer, 2);
        assert_eq!(matrix.element(), DataType::array(BaseType::Integer, 1));
        assert_eq!(matrix.element().element(), DataType::integer());
    }

    #[test]
    fn test_display() {
        assert_eq!(DataType::integer().to_string(), "integer");
        assert_eq!(DataType::array(BaseType::Boolean, 1).to_string(), "boolean[]");
        assert_eq!(DataType::void().to_string(), "void");
    }
}
