use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;

use super::datatype::DataType;

/// Symbol kinds associated with an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
    Method,
    Constructor,
    Class,
    Field,
}

/// Name and declared type of one formal parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    pub name: String,
    pub datatype: DataType,
}

/// Symbol defines the data associated with an identifier: its declared
/// (base, rank) type, mutability, kind, the parameter list and return type
/// for callables, the parent class and member table for classes, and the
/// frame offset assigned during code generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub identifier: String,
    pub datatype: DataType,
    pub scope_name: String,      // Name of the scope declared in
    pub line: usize,
    pub mutable: bool,           // false for constants and parameters
    pub kind: SymbolKind,

    // Callables only
    pub params: Vec<ParameterInfo>,
    pub return_type: DataType,

    // Classes only
    pub parent_class: Option<String>,
    pub has_constructor: bool,
    pub constructor_params: Vec<ParameterInfo>,
    pub members: IndexMap<String, Symbol>,

    // Assigned during code generation
    pub address: i64,
    /// Declared element count for arrays, recorded when the array literal
    /// initializer is lowered. Drives the foreach bound.
    pub size: usize,
}

impl Symbol {
    fn base(identifier: String, datatype: DataType, line: usize, mutable: bool, kind: SymbolKind) -> Self {
        Symbol {
            identifier,
            datatype,
            scope_name: String::new(),
            line,
            mutable,
            kind,
            params: vec![],
            return_type: DataType::void(),
            parent_class: None,
            has_constructor: false,
            constructor_params: vec![],
            members: IndexMap::new(),
            address: 0,
            size: 0,
        }
    }

    pub fn variable(identifier: String, datatype: DataType, line: usize, mutable: bool) -> Self {
        Self::base(identifier, datatype, line, mutable, SymbolKind::Variable)
    }

    pub fn field(identifier: String, datatype: DataType, line: usize, mutable: bool) -> Self {
        Self::base(identifier, datatype, line, mutable, SymbolKind::Field)
    }

    pub fn function(identifier: String, params: Vec<ParameterInfo>, return_type: DataType, line: usize) -> Self {
        let mut symbol = Self::base(identifier, DataType::void(), line, false, SymbolKind::Function);
        symbol.params = params;
        symbol.return_type = return_type;
        symbol
    }

    pub fn method(identifier: String, params: Vec<ParameterInfo>, return_type: DataType, line: usize) -> Self {
        let mut symbol = Self::function(identifier, params, return_type, line);
        symbol.kind = SymbolKind::Method;
        symbol
    }

    pub fn constructor(identifier: String, params: Vec<ParameterInfo>, line: usize) -> Self {
        let mut symbol = Self::function(identifier, params, DataType::void(), line);
        symbol.kind = SymbolKind::Constructor;
        symbol
    }

    pub fn class(identifier: String, parent_class: Option<String>, line: usize) -> Self {
        let mut symbol = Self::base(identifier, DataType::void(), line, false, SymbolKind::Class);
        symbol.parent_class = parent_class;
        symbol
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.kind, SymbolKind::Function | SymbolKind::Method | SymbolKind::Constructor)
    }
}

/// Stable handle into the scope arena. The global scope is always index 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    pub fn global() -> ScopeId {
        ScopeId(0)
    }
}

/// One node of the scope tree. Owns its local symbol map (insertion
/// ordered, duplicate insertion fails without overwrite), a link to its
/// parent and its children keyed by canonical scope name.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    name: String,
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    child_keys: IndexMap<String, ScopeId>,
    symbols: IndexMap<String, Symbol>,
}

impl Scope {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn children(&self) -> &[ScopeId] {
        &self.children
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

/// SymbolTable is the tree of scopes rooted at Global, stored in an arena
/// so parent and child links are plain ids rather than ownership cycles.
/// The canonical child keys (`function_<name>`, `if_<line>`, ...) are the
/// contract that lets the TAC generator re-enter exactly the scopes the
/// analyzer created.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    pub const GLOBAL_SCOPE: &'static str = "Global";

    /// Create a symbol table holding only the global scope.
    pub fn new() -> Self {
        SymbolTable {
            scopes: vec![Scope {
                name: String::from(Self::GLOBAL_SCOPE),
                parent: None,
                children: vec![],
                child_keys: IndexMap::new(),
                symbols: IndexMap::new(),
            }],
        }
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    /// Insert a symbol into the given scope.
    /// @return false when the identifier already exists there; the first
    /// symbol is never overwritten. This is the sole redeclaration check.
    pub fn insert(&mut self, scope: ScopeId, mut symbol: Symbol) -> bool {
        let scope = &mut self.scopes[scope.0];
        if scope.symbols.contains_key(&symbol.identifier) {
            return false;
        }
        symbol.scope_name = scope.name.clone();
        scope.symbols.insert(symbol.identifier.clone(), symbol);
        true
    }

    /// Scope-local lookup only.
    pub fn lookup_local(&self, scope: ScopeId, identifier: &str) -> Option<&Symbol> {
        self.scopes[scope.0].symbols.get(identifier)
    }

    /// Walk-to-root lookup. Stops at the first match; the global scope is
    /// the final fallback.
    pub fn lookup_global(&self, scope: ScopeId, identifier: &str) -> Option<&Symbol> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(symbol) = self.scopes[id.0].symbols.get(identifier) {
                return Some(symbol);
            }
            current = self.scopes[id.0].parent;
        }
        None
    }

    /// Create a child scope under `parent` with the given canonical key.
    /// @return the new scope id, or None when a sibling already uses the
    /// key (the analyzer keeps keys unique by embedding source lines).
    pub fn create_child(&mut self, parent: ScopeId, key: &str) -> Option<ScopeId> {
        if self.scopes[parent.0].child_keys.contains_key(key) {
            return None;
        }
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            name: String::from(key),
            parent: Some(parent),
            children: vec![],
            child_keys: IndexMap::new(),
            symbols: IndexMap::new(),
        });
        let parent = &mut self.scopes[parent.0];
        parent.children.push(id);
        parent.child_keys.insert(String::from(key), id);
        Some(id)
    }

    /// Find a child scope by canonical key.
    pub fn child(&self, parent: ScopeId, key: &str) -> Option<ScopeId> {
        self.scopes[parent.0].child_keys.get(key).copied()
    }

    /// Attach a member record to a class symbol's member table.
    /// @return false when the class cannot be found or the member exists.
    pub fn add_class_member(&mut self, scope: ScopeId, class_name: &str, member: Symbol) -> bool {
        let holder = match self.find_symbol_scope(scope, class_name) {
            Some(holder) => holder,
            None => return false,
        };
        let class = self.scopes[holder.0].symbols.get_mut(class_name).unwrap();
        if class.kind != SymbolKind::Class || class.members.contains_key(&member.identifier) {
            return false;
        }
        class.members.insert(member.identifier.clone(), member);
        true
    }

    /// Resolve a member against a class, walking the parent-class chain
    /// until found or the chain ends. The visited guard bounds the walk in
    /// the presence of (diagnosed) inheritance cycles.
    pub fn get_class_member(&self, scope: ScopeId, class_name: &str, member_name: &str) -> Option<&Symbol> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = Some(String::from(class_name));

        while let Some(name) = current {
            if !visited.insert(name.clone()) {
                return None;
            }
            let class = self.lookup_global(scope, &name)?;
            if class.kind != SymbolKind::Class {
                return None;
            }
            if let Some(member) = class.members.get(member_name) {
                return Some(member);
            }
            current = class.parent_class.clone();
        }
        None
    }

    /// True when following `class_name`'s parent chain revisits a class.
    pub fn has_inheritance_cycle(&self, scope: ScopeId, class_name: &str) -> bool {
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = Some(String::from(class_name));

        while let Some(name) = current {
            if !visited.insert(name.clone()) {
                return true;
            }
            current = match self.lookup_global(scope, &name) {
                Some(symbol) if symbol.kind == SymbolKind::Class => symbol.parent_class.clone(),
                _ => None,
            };
        }
        false
    }

    /// Mutable access for the code generator: frame offsets and array sizes
    /// are written onto symbols after analysis is complete.
    pub fn symbol_mut(&mut self, scope: ScopeId, identifier: &str) -> Option<&mut Symbol> {
        self.scopes[scope.0].symbols.get_mut(identifier)
    }

    /// Scope holding the first match of a walk-to-root lookup.
    pub fn find_symbol_scope(&self, scope: ScopeId, identifier: &str) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if self.scopes[id.0].symbols.contains_key(identifier) {
                return Some(id);
            }
            current = self.scopes[id.0].parent;
        }
        None
    }

    /// All scope ids in the subtree rooted at `scope`, breadth-first.
    pub fn subtree(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut ids = vec![scope];
        let mut cursor = 0;
        while cursor < ids.len() {
            let current = ids[cursor];
            ids.extend(self.scopes[current.0].children.iter().copied());
            cursor += 1;
        }
        ids
    }
}

/// Hierarchical dump of the symbol table, scope by scope.
impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn print_scope(table: &SymbolTable, f: &mut fmt::Formatter<'_>, id: ScopeId, depth: usize) -> fmt::Result {
            let indent = "  ".repeat(depth);
            let scope = table.scope(id);

            writeln!(f, "{}Scope: {}", indent, scope.name())?;
            if scope.symbols.is_empty() {
                writeln!(f, "{}  (sin símbolos)", indent)?;
            }
            for symbol in scope.symbols() {
                writeln!(f, "{}  - {}:", indent, symbol.identifier)?;
                writeln!(f, "{}      Tipo: {}", indent, symbol.datatype)?;
                writeln!(f, "{}      Dimensión: {}", indent, symbol.datatype.rank)?;
                writeln!(f, "{}      Mutable: {}", indent, symbol.mutable)?;
                match &symbol.parent_class {
                    Some(parent) => writeln!(f, "{}      Clase Padre: {}", indent, parent)?,
                    None => writeln!(f, "{}      Clase Padre: -", indent)?,
                }
                writeln!(f, "{}      Kind: {:?}", indent, symbol.kind)?;
                writeln!(f, "{}      Línea: {}", indent, symbol.line)?;
            }

            for child in scope.children() {
                print_scope(table, f, *child, depth + 1)?;
            }
            Ok(())
        }

        print_scope(self, f, ScopeId::global(), 0)
    }
}
