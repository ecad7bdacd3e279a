use super::{SemanticAnalyser, SemanticError, SemanticErrorKind};
use super::super::ast::{
    AnalysedProgram,
    AssignTarget,
    BaseType,
    BinaryOperation,
    DataType,
    Expression,
    Literal,
    Parameter,
    ParameterInfo,
    Program,
    ScopeId,
    Statement,
    Symbol,
    SymbolKind,
    SymbolTable,
    SwitchCase,
    TypeAnnotation,
    UnaryOperation,
};

/// Expected-return frame for the function currently being analysed.
struct FunctionFrame {
    name: String,
    expected_return: DataType,
    declared_void: bool,
    found_return: bool,
}

/// CompiscriptSemanticAnalyser is a concrete SemanticAnalyser.
/// It walks the statement tree once, building the scope tree keyed by the
/// canonical scope names the TAC generator will re-enter, attaching one
/// symbol per declaration, and inferring a (base, rank) type for every
/// expression. Violations accumulate as diagnostics; inference propagates
/// the unknown type so one mismatch does not cascade into many.
pub struct CompiscriptSemanticAnalyser {
    table: SymbolTable,
    current_scope: ScopeId,
    diagnostics: Vec<SemanticError>,
    current_class: Option<String>,
    function_frames: Vec<FunctionFrame>,
    loop_depth: usize,
    breakable_depth: usize,
}

impl CompiscriptSemanticAnalyser {
    fn error(&mut self, line: usize, kind: SemanticErrorKind, message: String) {
        self.diagnostics.push(SemanticError::new(line, kind, message));
    }

    /// Open the child scope with the given canonical key, creating it if
    /// needed. When a sibling already holds the key (two constructs on one
    /// source line) the existing child is re-entered best-effort.
    fn enter_scope(&mut self, key: &str) {
        let id = match self.table.create_child(self.current_scope, key) {
            Some(id) => id,
            None => self.table.child(self.current_scope, key).unwrap(),
        };
        self.current_scope = id;
    }

    fn exit_scope(&mut self) {
        if let Some(parent) = self.table.scope(self.current_scope).parent() {
            self.current_scope = parent;
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn analyse_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::VariableDeclaration { name, declared_type, initializer, line } => {
                self.analyse_variable_declaration(name, declared_type.as_ref(), initializer.as_ref(), *line, true);
            }
            Statement::ConstantDeclaration { name, declared_type, initializer, line } => {
                self.analyse_variable_declaration(name, declared_type.as_ref(), Some(initializer), *line, false);
            }
            Statement::Assignment { target, value, line } => {
                self.analyse_assignment(target, value, *line);
            }
            Statement::ExpressionStatement { expression, .. } => {
                self.infer_expression(expression);
            }
            Statement::Print { expression, .. } => {
                self.infer_expression(expression);
            }
            Statement::If { condition, then_body, else_body, line } => {
                self.check_condition("if", condition);
                self.enter_scope(&format!("if_{}", line));
                self.analyse_body(then_body);
                self.exit_scope();
                if let Some(else_body) = else_body {
                    self.enter_scope(&format!("else_{}", line));
                    self.analyse_body(else_body);
                    self.exit_scope();
                }
            }
            Statement::While { condition, body, line } => {
                self.check_condition("while", condition);
                self.enter_scope(&format!("while_{}", line));
                self.enter_loop();
                self.analyse_body(body);
                self.exit_loop();
                self.exit_scope();
            }
            Statement::DoWhile { body, condition, line } => {
                self.enter_scope(&format!("doWhile_{}", line));
                self.enter_loop();
                self.analyse_body(body);
                self.exit_loop();
                self.exit_scope();
                self.check_condition("do-while", condition);
            }
            Statement::For { init, condition, update, body, line } => {
                self.enter_scope(&format!("for_{}", line));
                if let Some(init) = init {
                    self.analyse_statement(init);
                }
                if let Some(condition) = condition {
                    self.check_condition("for", condition);
                }
                if let Some(update) = update {
                    self.analyse_statement(update);
                }
                self.enter_loop();
                self.analyse_body(body);
                self.exit_loop();
                self.exit_scope();
            }
            Statement::Foreach { binding, iterable, body, line } => {
                let iterable_type = self.infer_expression(iterable);
                let element = if iterable_type.is_unknown() {
                    DataType::unknown()
                } else if iterable_type.is_array() {
                    iterable_type.element()
                } else {
                    self.error(*line, SemanticErrorKind::NotAnArray,
                               format!("foreach requiere un array (obtenido: {})", iterable_type));
                    DataType::unknown()
                };

                self.enter_scope(&format!("foreach_{}", line));
                self.table.insert(self.current_scope,
                                  Symbol::variable(binding.clone(), element, *line, true));
                self.enter_loop();
                self.analyse_body(body);
                self.exit_loop();
                self.exit_scope();
            }
            Statement::Break { line } => {
                if self.breakable_depth == 0 {
                    self.error(*line, SemanticErrorKind::BreakOutsideLoop,
                               String::from("break fuera de un bucle o switch"));
                }
            }
            Statement::Continue { line } => {
                if self.loop_depth == 0 {
                    self.error(*line, SemanticErrorKind::ContinueOutsideLoop,
                               String::from("continue fuera de un bucle"));
                }
            }
            Statement::Return { value, line } => {
                self.analyse_return(value.as_ref(), *line);
            }
            Statement::TryCatch { try_body, catch_binding, catch_body, line } => {
                self.enter_scope(&format!("try_{}", line));
                self.analyse_body(try_body);
                self.exit_scope();

                self.enter_scope(&format!("catch_{}", line));
                self.table.insert(self.current_scope,
                                  Symbol::variable(catch_binding.clone(),
                                                   DataType::scalar(BaseType::Exception),
                                                   *line, false));
                self.analyse_body(catch_body);
                self.exit_scope();
            }
            Statement::Switch { scrutinee, cases, default, line } => {
                self.analyse_switch(scrutinee, cases, default.as_deref(), *line);
            }
            Statement::FunctionDeclaration { name, parameters, return_type, body, line } => {
                let declared_return = return_type.as_ref().map(|annotation| annotation.datatype());
                self.analyse_function_declaration(name, parameters, declared_return, body, *line);
            }
            Statement::ClassDeclaration { name, parent, members, line } => {
                self.analyse_class_declaration(name, parent.as_deref(), members, *line);
            }
            Statement::Block { body, .. } => {
                self.analyse_body(body);
            }
        }
    }

    fn analyse_body(&mut self, body: &[Statement]) {
        for statement in body {
            self.analyse_statement(statement);
        }
    }

    fn enter_loop(&mut self) {
        self.loop_depth += 1;
        self.breakable_depth += 1;
    }

    fn exit_loop(&mut self) {
        self.loop_depth -= 1;
        self.breakable_depth -= 1;
    }

    fn analyse_variable_declaration(
        &mut self,
        name: &str,
        declared_type: Option<&TypeAnnotation>,
        initializer: Option<&Expression>,
        line: usize,
        mutable: bool,
    ) {
        let declared = match declared_type {
            Some(annotation) => annotation.datatype(),
            None => {
                self.error(line, SemanticErrorKind::MissingTypeAnnotation,
                           format!("La variable '{}' debe tener tipo explícito", name));
                DataType::unknown()
            }
        };

        if let Some(initializer) = initializer {
            let inferred = self.infer_expression(initializer);
            // An empty array literal (and any already-diagnosed initializer)
            // adopts the declared base without further checks.
            if !declared.is_unknown() && !inferred.is_unknown() && inferred != declared {
                self.error(line, SemanticErrorKind::TypeMismatch,
                           format!("Inicializador '{}' incompatible con tipo '{}'", inferred, declared));
            }
        }

        if !self.table.insert(self.current_scope,
                              Symbol::variable(String::from(name), declared, line, mutable)) {
            self.error(line, SemanticErrorKind::Redeclaration,
                       format!("Variable '{}' ya declarada en este ámbito", name));
        }
    }

    fn analyse_assignment(&mut self, target: &AssignTarget, value: &Expression, line: usize) {
        let value_type = self.infer_expression(value);

        match target {
            AssignTarget::Variable { name } => {
                let symbol = self.table.lookup_global(self.current_scope, name).cloned();
                match symbol {
                    None => {
                        self.error(line, SemanticErrorKind::UndeclaredIdentifier,
                                   format!("Asignación a variable no declarada '{}'", name));
                    }
                    Some(symbol) => {
                        if !symbol.mutable {
                            self.error(line, SemanticErrorKind::AssignToImmutable,
                                       format!("Intento de asignar a constante '{}'", name));
                        }
                        self.check_assignable(name, &symbol.datatype, &value_type, line);
                    }
                }
            }
            AssignTarget::Index { array, index } => {
                let array_type = self.infer_expression(array);
                let index_type = self.infer_expression(index);

                if !index_type.is_unknown() && !index_type.is_scalar_of(&BaseType::Integer) {
                    self.error(index.line(), SemanticErrorKind::InvalidIndex,
                               format!("El índice de un array debe ser integer (obtenido: {})", index_type));
                }
                if let Some(name) = array.identifier_name() {
                    let immutable = self.table.lookup_global(self.current_scope, name)
                        .map(|symbol| !symbol.mutable)
                        .unwrap_or(false);
                    if immutable {
                        let name = String::from(name);
                        self.error(line, SemanticErrorKind::AssignToImmutable,
                                   format!("Intento de asignar a constante '{}'", name));
                    }
                }
                if array_type.is_unknown() {
                    return;
                }
                if !array_type.is_array() {
                    self.error(line, SemanticErrorKind::NotAnArray,
                               format!("No se puede indexar un valor de tipo {}", array_type));
                    return;
                }
                let element = array_type.element();
                self.check_assignable("[]", &element, &value_type, line);
            }
            AssignTarget::Property { object, property } => {
                let object_type = self.infer_expression(object);
                if object_type.is_unknown() {
                    return;
                }
                let class_name = match Self::scalar_class_name(&object_type) {
                    Some(class_name) => class_name,
                    None => {
                        self.error(line, SemanticErrorKind::NotAClass,
                                   format!("Acceso a propiedad sobre un valor de tipo {}", object_type));
                        return;
                    }
                };
                let member = self.table
                    .get_class_member(self.current_scope, &class_name, property)
                    .cloned();
                match member {
                    None => {
                        self.error(line, SemanticErrorKind::UnknownMember,
                                   format!("La clase '{}' no tiene un miembro '{}'", class_name, property));
                    }
                    Some(member) => {
                        if !member.mutable {
                            self.error(line, SemanticErrorKind::AssignToImmutable,
                                       format!("Intento de asignar a constante '{}'", property));
                        }
                        self.check_assignable(property, &member.datatype, &value_type, line);
                    }
                }
            }
        }
    }

    fn check_assignable(&mut self, name: &str, target: &DataType, value: &DataType, line: usize) {
        if !target.is_unknown() && !value.is_unknown() && target != value {
            self.error(line, SemanticErrorKind::TypeMismatch,
                       format!("Tipo incompatible en asignación a '{}': {} vs {}", name, value, target));
        }
    }

    fn check_condition(&mut self, construct: &str, condition: &Expression) {
        let condition_type = self.infer_expression(condition);
        if condition_type.is_unknown() {
            return;
        }
        if !condition_type.is_scalar_of(&BaseType::Boolean) {
            self.error(condition.line(), SemanticErrorKind::NonBooleanCondition,
                       format!("Condición de {} debe ser boolean (obtenido: {})", construct, condition_type));
        }
    }

    fn analyse_return(&mut self, value: Option<&Expression>, line: usize) {
        let value_type = value.map(|value| self.infer_expression(value));

        let frame = match self.function_frames.last_mut() {
            Some(frame) => frame,
            None => {
                self.error(line, SemanticErrorKind::ReturnOutsideFunction,
                           String::from("return fuera de una función"));
                return;
            }
        };
        frame.found_return = true;
        let name = frame.name.clone();
        let expected = frame.expected_return.clone();
        let declared_void = frame.declared_void;

        match value_type {
            Some(value_type) => {
                if declared_void {
                    self.error(line, SemanticErrorKind::ReturnMismatch,
                               format!("La función void '{}' no debe retornar un valor", name));
                } else if !value_type.is_unknown() && !expected.is_unknown() && value_type != expected {
                    self.error(line, SemanticErrorKind::ReturnMismatch,
                               format!("Tipo de retorno incompatible en '{}': {} vs {}", name, value_type, expected));
                }
            }
            None => {
                if !declared_void {
                    self.error(line, SemanticErrorKind::ReturnMismatch,
                               format!("La función '{}' debe retornar un valor de tipo {}", name, expected));
                }
            }
        }
    }

    fn analyse_switch(&mut self, scrutinee: &Expression, cases: &[SwitchCase], default: Option<&[Statement]>, line: usize) {
        let scrutinee_type = self.infer_expression(scrutinee);
        let mut seen: Vec<Literal> = vec![];

        self.breakable_depth += 1;
        for (index, case) in cases.iter().enumerate() {
            let case_type = self.infer_expression(&case.value);
            if !case_type.is_unknown() && !scrutinee_type.is_unknown()
                && case_type.base != scrutinee_type.base {
                self.error(case.line, SemanticErrorKind::TypeMismatch,
                           format!("Case de tipo {} incompatible con switch de tipo {}", case_type, scrutinee_type));
            }
            if let Expression::Literal { value, .. } = &case.value {
                if seen.contains(value) {
                    self.error(case.line, SemanticErrorKind::DuplicateCase,
                               format!("Case duplicado: {}", value));
                } else {
                    seen.push(value.clone());
                }
            }

            self.enter_scope(&format!("case_{}_{}", line, index));
            self.analyse_body(&case.body);
            self.exit_scope();
        }

        if let Some(default) = default {
            self.enter_scope(&format!("default_{}", line));
            self.analyse_body(default);
            self.exit_scope();
        }
        self.breakable_depth -= 1;
    }

    fn analyse_function_declaration(
        &mut self,
        name: &str,
        parameters: &[Parameter],
        declared_return: Option<DataType>,
        body: &[Statement],
        line: usize,
    ) {
        let params: Vec<ParameterInfo> = parameters.iter().map(|parameter| {
            let datatype = match &parameter.declared_type {
                Some(annotation) => annotation.datatype(),
                None => {
                    self.error(parameter.line, SemanticErrorKind::MissingTypeAnnotation,
                               format!("El parámetro '{}' debe tener tipo explícito", parameter.name));
                    DataType::unknown()
                }
            };
            ParameterInfo { name: parameter.name.clone(), datatype }
        }).collect();

        let declared_void = declared_return.is_none();
        let return_type = declared_return.unwrap_or_else(DataType::void);

        let in_class = self.current_class.clone();
        let is_constructor = in_class.is_some() && name == "constructor";

        let symbol = if is_constructor {
            Symbol::constructor(String::from(name), params.clone(), line)
        } else if in_class.is_some() {
            Symbol::method(String::from(name), params.clone(), return_type.clone(), line)
        } else {
            Symbol::function(String::from(name), params.clone(), return_type.clone(), line)
        };

        if !self.table.insert(self.current_scope, symbol) {
            self.error(line, SemanticErrorKind::Redeclaration,
                       format!("Función '{}' ya declarada en este ámbito", name));
        }

        // The first constructor seen captures the class constructor signature.
        if is_constructor {
            let class_name = in_class.clone().unwrap();
            if let Some(holder) = self.table.find_symbol_scope(self.current_scope, &class_name) {
                if let Some(class_symbol) = self.table.symbol_mut(holder, &class_name) {
                    if !class_symbol.has_constructor {
                        class_symbol.has_constructor = true;
                        class_symbol.constructor_params = params.clone();
                    }
                }
            }
        }

        self.enter_scope(&format!("function_{}", name));

        if let Some(class_name) = &in_class {
            self.table.insert(self.current_scope,
                              Symbol::variable(String::from("this"),
                                               DataType::scalar(BaseType::Class(class_name.clone())),
                                               line, false));
        }
        for param in &params {
            if !self.table.insert(self.current_scope,
                                  Symbol::variable(param.name.clone(), param.datatype.clone(), line, false)) {
                self.error(line, SemanticErrorKind::Redeclaration,
                           format!("Parámetro '{}' duplicado", param.name));
            }
        }

        self.function_frames.push(FunctionFrame {
            name: String::from(name),
            expected_return: return_type,
            declared_void,
            found_return: false,
        });
        self.analyse_body(body);
        let frame = self.function_frames.pop().unwrap();
        self.exit_scope();

        if !frame.declared_void && !frame.found_return {
            self.error(line, SemanticErrorKind::MissingReturn,
                       format!("La función '{}' debe retornar un valor de tipo {} pero no tiene return",
                               name, frame.expected_return));
        }
    }

    fn analyse_class_declaration(&mut self, name: &str, parent: Option<&str>, members: &[Statement], line: usize) {
        let symbol = Symbol::class(String::from(name), parent.map(String::from), line);
        if !self.table.insert(self.current_scope, symbol) {
            self.error(line, SemanticErrorKind::Redeclaration,
                       format!("Clase '{}' ya declarada en este ámbito", name));
        }

        if self.table.has_inheritance_cycle(self.current_scope, name) {
            self.error(line, SemanticErrorKind::InheritanceCycle,
                       format!("Ciclo de herencia detectado en la clase '{}'", name));
        }

        let previous_class = self.current_class.replace(String::from(name));
        self.enter_scope(&format!("class_{}", name));
        let class_scope = self.current_scope;

        for member in members {
            self.analyse_statement(member);

            // Mirror the member into the class symbol's member table.
            let member_name = match member {
                Statement::VariableDeclaration { name, .. } => Some(name.clone()),
                Statement::ConstantDeclaration { name, .. } => Some(name.clone()),
                Statement::FunctionDeclaration { name, .. } => Some(name.clone()),
                _ => None,
            };
            if let Some(member_name) = member_name {
                if let Some(mut record) = self.table.lookup_local(class_scope, &member_name).cloned() {
                    if record.kind == SymbolKind::Variable {
                        record.kind = SymbolKind::Field;
                    }
                    self.table.add_class_member(class_scope, name, record);
                }
            }
        }

        self.exit_scope();
        self.current_class = previous_class;
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn scalar_class_name(datatype: &DataType) -> Option<String> {
        if datatype.rank != 0 {
            return None;
        }
        match &datatype.base {
            Some(BaseType::Class(name)) => Some(name.clone()),
            _ => None,
        }
    }

    fn infer_expression(&mut self, expression: &Expression) -> DataType {
        match expression {
            Expression::Literal { value, .. } => match value {
                Literal::INTEGER(_) => DataType::integer(),
                Literal::BOOL(_) => DataType::boolean(),
                Literal::STRING(_) => DataType::scalar(BaseType::Str),
                Literal::NULL => DataType::scalar(BaseType::Null),
            },
            Expression::Identifier { name, line } => self.infer_identifier(name, *line),
            Expression::This { line } => match self.current_class.clone() {
                Some(class_name) => DataType::scalar(BaseType::Class(class_name)),
                None => {
                    self.error(*line, SemanticErrorKind::UndeclaredIdentifier,
                               String::from("'this' fuera de una clase"));
                    DataType::unknown()
                }
            },
            Expression::ArrayLiteral { items, line } => self.infer_array_literal(items, *line),
            Expression::Unary { op, operand, line } => self.infer_unary(*op, operand, *line),
            Expression::Binary { op, lhs, rhs, line } => self.infer_binary(*op, lhs, rhs, *line),
            Expression::Index { base, index, line } => self.infer_index(base, index, *line),
            Expression::Property { base, property, line } => self.infer_property(base, property, *line),
            Expression::Call { callee, arguments, line } => self.infer_call(callee, arguments, *line),
            Expression::New { class, arguments, line } => self.infer_new(class, arguments, *line),
        }
    }

    fn infer_identifier(&mut self, name: &str, line: usize) -> DataType {
        let symbol = self.table.lookup_global(self.current_scope, name).cloned();
        match symbol {
            None => {
                self.error(line, SemanticErrorKind::UndeclaredIdentifier,
                           format!("Identificador '{}' no declarado", name));
                DataType::unknown()
            }
            Some(symbol) => match symbol.kind {
                SymbolKind::Variable | SymbolKind::Field => symbol.datatype,
                _ => {
                    self.error(line, SemanticErrorKind::InvalidOperands,
                               format!("'{}' no es una variable", name));
                    DataType::unknown()
                }
            },
        }
    }

    fn infer_array_literal(&mut self, items: &[Expression], line: usize) -> DataType {
        if items.is_empty() {
            // Adopts the declared base at the declaration site.
            return DataType { base: None, rank: 1 };
        }

        let item_types: Vec<DataType> = items.iter()
            .map(|item| self.infer_expression(item))
            .collect();

        if item_types.iter().any(|item| item.is_unknown()) {
            return DataType::unknown();
        }

        let first = &item_types[0];
        if item_types.iter().any(|item| item != first) {
            self.error(line, SemanticErrorKind::HeterogeneousArray,
                       String::from("Arreglo heterogéneo: los elementos deben compartir tipo y dimensión"));
            return DataType::unknown();
        }

        // Rectangularity is checkable when the rows are literal arrays.
        let row_lengths: Vec<usize> = items.iter()
            .filter_map(|item| match item {
                Expression::ArrayLiteral { items, .. } => Some(items.len()),
                _ => None,
            })
            .collect();
        if row_lengths.len() == items.len() && row_lengths.windows(2).any(|pair| pair[0] != pair[1]) {
            self.error(line, SemanticErrorKind::NonRectangularArray,
                       String::from("Arreglo no rectangular: las filas difieren en longitud"));
            return DataType::unknown();
        }

        DataType {
            base: first.base.clone(),
            rank: first.rank + 1,
        }
    }

    fn infer_unary(&mut self, op: UnaryOperation, operand: &Expression, line: usize) -> DataType {
        let operand_type = self.infer_expression(operand);
        if operand_type.is_unknown() {
            return match op {
                UnaryOperation::NOT => DataType::boolean(),
                _ => DataType::integer(),
            };
        }

        match op {
            UnaryOperation::NOT => {
                if operand_type.is_scalar_of(&BaseType::Boolean) {
                    DataType::boolean()
                } else {
                    self.error(line, SemanticErrorKind::InvalidOperands,
                               format!("Operador {} solo válido para booleanos, no {}", op, operand_type));
                    DataType::unknown()
                }
            }
            UnaryOperation::NEGATE | UnaryOperation::PLUS => {
                if operand_type.is_scalar_of(&BaseType::Integer) {
                    DataType::integer()
                } else {
                    self.error(line, SemanticErrorKind::InvalidOperands,
                               format!("Operador {} solo válido para enteros, no {}", op, operand_type));
                    DataType::unknown()
                }
            }
        }
    }

    fn infer_binary(&mut self, op: BinaryOperation, lhs: &Expression, rhs: &Expression, line: usize) -> DataType {
        let lhs_type = self.infer_expression(lhs);
        let rhs_type = self.infer_expression(rhs);

        let integer = DataType::integer();
        let boolean = DataType::boolean();
        let string = DataType::scalar(BaseType::Str);
        let unknown = lhs_type.is_unknown() || rhs_type.is_unknown();

        match op {
            BinaryOperation::ADD => {
                if unknown {
                    return DataType::unknown();
                }
                if lhs_type == string || rhs_type == string {
                    // String concatenation absorbs the other side.
                    if (lhs_type == string || lhs_type == integer)
                        && (rhs_type == string || rhs_type == integer) {
                        return string;
                    }
                }
                if lhs_type == integer && rhs_type == integer {
                    return integer;
                }
                self.error(line, SemanticErrorKind::InvalidOperands,
                           format!("Operador + solo válido para enteros o strings, no {} y {}", lhs_type, rhs_type));
                DataType::unknown()
            }
            BinaryOperation::SUB | BinaryOperation::MUL
            | BinaryOperation::DIV | BinaryOperation::MOD => {
                if unknown {
                    return integer;
                }
                if lhs_type == integer && rhs_type == integer {
                    return integer;
                }
                self.error(line, SemanticErrorKind::InvalidOperands,
                           format!("Operador {} solo válido para enteros, no {} y {}", op, lhs_type, rhs_type));
                DataType::unknown()
            }
            BinaryOperation::LESS_THAN | BinaryOperation::LESS_EQUAL
            | BinaryOperation::GREATER_THAN | BinaryOperation::GREATER_EQUAL => {
                if unknown {
                    return boolean;
                }
                if lhs_type == integer && rhs_type == integer {
                    return boolean;
                }
                self.error(line, SemanticErrorKind::InvalidOperands,
                           format!("Comparación {} solo válida para enteros, no {} y {}", op, lhs_type, rhs_type));
                DataType::unknown()
            }
            BinaryOperation::EQUAL | BinaryOperation::NOT_EQUAL => {
                if unknown {
                    return boolean;
                }
                if lhs_type == rhs_type {
                    return boolean;
                }
                self.error(line, SemanticErrorKind::InvalidOperands,
                           format!("No se puede comparar {} con {}", lhs_type, rhs_type));
                DataType::unknown()
            }
            BinaryOperation::AND | BinaryOperation::OR => {
                if unknown {
                    return boolean;
                }
                if lhs_type == boolean && rhs_type == boolean {
                    return boolean;
                }
                self.error(line, SemanticErrorKind::InvalidOperands,
                           format!("Operador {} solo válido para booleanos, no {} y {}", op, lhs_type, rhs_type));
                DataType::unknown()
            }
        }
    }

    fn infer_index(&mut self, base: &Expression, index: &Expression, line: usize) -> DataType {
        let base_type = self.infer_expression(base);
        let index_type = self.infer_expression(index);

        if !index_type.is_unknown() && !index_type.is_scalar_of(&BaseType::Integer) {
            self.error(index.line(), SemanticErrorKind::InvalidIndex,
                       format!("El índice de un array debe ser integer (obtenido: {})", index_type));
        }
        if base_type.is_unknown() {
            return DataType::unknown();
        }
        if !base_type.is_array() {
            self.error(line, SemanticErrorKind::NotAnArray,
                       format!("No se puede indexar un valor de tipo {}", base_type));
            return DataType::unknown();
        }
        base_type.element()
    }

    fn infer_property(&mut self, base: &Expression, property: &str, line: usize) -> DataType {
        let base_type = self.infer_expression(base);
        if base_type.is_unknown() {
            return DataType::unknown();
        }
        let class_name = match Self::scalar_class_name(&base_type) {
            Some(class_name) => class_name,
            None => {
                self.error(line, SemanticErrorKind::NotAClass,
                           format!("Acceso a propiedad sobre un valor de tipo {}", base_type));
                return DataType::unknown();
            }
        };
        let member = self.table.get_class_member(self.current_scope, &class_name, property).cloned();
        match member {
            Some(member) => member.datatype,
            None => {
                self.error(line, SemanticErrorKind::UnknownMember,
                           format!("La clase '{}' no tiene un miembro '{}'", class_name, property));
                DataType::unknown()
            }
        }
    }

    fn check_arguments(&mut self, callable: &str, params: &[ParameterInfo], arguments: &[DataType], line: usize) {
        if params.len() != arguments.len() {
            self.error(line, SemanticErrorKind::ArityMismatch,
                       format!("La función '{}' espera {} argumentos (recibió {})",
                               callable, params.len(), arguments.len()));
            return;
        }
        for (index, (param, argument)) in params.iter().zip(arguments.iter()).enumerate() {
            if !param.datatype.is_unknown() && !argument.is_unknown() && param.datatype != *argument {
                self.error(line, SemanticErrorKind::TypeMismatch,
                           format!("Argumento {} de '{}' incompatible: {} vs {}",
                                   index + 1, callable, argument, param.datatype));
            }
        }
    }

    fn infer_call(&mut self, callee: &Expression, arguments: &[Expression], line: usize) -> DataType {
        let argument_types: Vec<DataType> = arguments.iter()
            .map(|argument| self.infer_expression(argument))
            .collect();

        match callee {
            Expression::Identifier { name, .. } => {
                let symbol = self.table.lookup_global(self.current_scope, name).cloned();
                match symbol {
                    None => {
                        self.error(line, SemanticErrorKind::UndeclaredIdentifier,
                                   format!("Función '{}' no declarada", name));
                        DataType::unknown()
                    }
                    Some(symbol) if symbol.is_callable() => {
                        self.check_arguments(name, &symbol.params, &argument_types, line);
                        symbol.return_type
                    }
                    Some(_) => {
                        self.error(line, SemanticErrorKind::InvalidOperands,
                                   format!("'{}' no es una función", name));
                        DataType::unknown()
                    }
                }
            }
            Expression::Property { base, property, .. } => {
                let base_type = self.infer_expression(base);
                if base_type.is_unknown() {
                    return DataType::unknown();
                }
                let class_name = match Self::scalar_class_name(&base_type) {
                    Some(class_name) => class_name,
                    None => {
                        self.error(line, SemanticErrorKind::NotAClass,
                                   format!("Llamada a método sobre un valor de tipo {}", base_type));
                        return DataType::unknown();
                    }
                };
                let member = self.table.get_class_member(self.current_scope, &class_name, property).cloned();
                match member {
                    Some(member) if member.is_callable() => {
                        self.check_arguments(property, &member.params, &argument_types, line);
                        member.return_type
                    }
                    Some(_) => {
                        self.error(line, SemanticErrorKind::InvalidOperands,
                                   format!("'{}' no es un método de '{}'", property, class_name));
                        DataType::unknown()
                    }
                    None => {
                        self.error(line, SemanticErrorKind::UnknownMember,
                                   format!("La clase '{}' no tiene un miembro '{}'", class_name, property));
                        DataType::unknown()
                    }
                }
            }
            _ => {
                self.error(line, SemanticErrorKind::InvalidOperands,
                           String::from("Expresión no invocable"));
                DataType::unknown()
            }
        }
    }

    fn infer_new(&mut self, class: &str, arguments: &[Expression], line: usize) -> DataType {
        let argument_types: Vec<DataType> = arguments.iter()
            .map(|argument| self.infer_expression(argument))
            .collect();

        let symbol = self.table.lookup_global(self.current_scope, class).cloned();
        match symbol {
            Some(symbol) if symbol.kind == SymbolKind::Class => {
                let constructor = self.table
                    .get_class_member(self.current_scope, class, "constructor")
                    .cloned();
                match constructor {
                    Some(constructor) => {
                        self.check_arguments(class, &constructor.params, &argument_types, line);
                    }
                    None => {
                        if !arguments.is_empty() {
                            self.error(line, SemanticErrorKind::ArityMismatch,
                                       format!("La clase '{}' no define constructor", class));
                        }
                    }
                }
                DataType::scalar(BaseType::Class(String::from(class)))
            }
            _ => {
                self.error(line, SemanticErrorKind::NotAClass,
                           format!("Clase '{}' no declarada", class));
                DataType::unknown()
            }
        }
    }
}

/// SemanticAnalyser Trait Concrete Implementation
impl SemanticAnalyser for CompiscriptSemanticAnalyser {
    fn default() -> Self {
        Self {
            table: SymbolTable::new(),
            current_scope: ScopeId::global(),
            diagnostics: vec![],
            current_class: None,
            function_frames: vec![],
            loop_depth: 0,
            breakable_depth: 0,
        }
    }

    fn analyse(mut self, root: Program) -> AnalysedProgram {
        for statement in &root.statements {
            self.analyse_statement(statement);
        }

        AnalysedProgram {
            root,
            symbol_table: self.table,
            diagnostics: self.diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parser::{AstParser, PestCompiscriptParser};

    fn analyse(source: &str) -> AnalysedProgram {
        let root = PestCompiscriptParser::default().parse(source).unwrap();
        CompiscriptSemanticAnalyser::default().analyse(root)
    }

    fn kinds(analysed: &AnalysedProgram) -> Vec<(usize, SemanticErrorKind)> {
        analysed.diagnostics.iter().map(|error| (error.line, error.kind)).collect()
    }

    #[test]
    fn test_clean_arithmetic_declaration() {
        let analysed = analyse("let x: integer = (1+3)-(4*(5/2));");
        assert!(analysed.is_clean(), "{:?}", analysed.diagnostics);
    }

    #[test]
    fn test_redeclaration_reports_once_and_keeps_first_symbol() {
        let analysed = analyse("let x: integer = 1;\nlet x: boolean = true;");
        assert_eq!(kinds(&analysed), vec![(2, SemanticErrorKind::Redeclaration)]);
        let symbol = analysed.symbol_table
            .lookup_local(ScopeId::global(), "x").unwrap();
        assert_eq!(symbol.line, 1);
        assert_eq!(symbol.datatype, DataType::integer());
    }

    #[test]
    fn test_missing_annotation_still_inserts_symbol() {
        let analysed = analyse("let x = 1;");
        assert_eq!(kinds(&analysed), vec![(1, SemanticErrorKind::MissingTypeAnnotation)]);
        let symbol = analysed.symbol_table
            .lookup_local(ScopeId::global(), "x").unwrap();
        assert!(symbol.datatype.is_unknown());
    }

    #[test]
    fn test_constant_is_immutable() {
        let analysed = analyse("const limit: integer = 10;\nlimit = 20;");
        assert_eq!(kinds(&analysed), vec![(2, SemanticErrorKind::AssignToImmutable)]);
    }

    #[test]
    fn test_inference_table_violations_do_not_cascade() {
        // The inner violation propagates as unknown, so the outer addition
        // and the declaration check stay silent.
        let analysed = analyse("let x: integer = (1 + true) + 2;");
        assert_eq!(kinds(&analysed), vec![(1, SemanticErrorKind::InvalidOperands)]);
    }

    #[test]
    fn test_string_concatenation_takes_string() {
        let analysed = analyse("let s: string = \"total: \" + 4;");
        assert!(analysed.is_clean(), "{:?}", analysed.diagnostics);
    }

    #[test]
    fn test_equality_requires_same_base_and_rank() {
        let analysed = analyse("let b: boolean = 1 == true;");
        assert_eq!(kinds(&analysed), vec![(1, SemanticErrorKind::InvalidOperands)]);
    }

    #[test]
    fn test_logical_ops_require_booleans() {
        let analysed = analyse("let b: boolean = 1 && 2;");
        assert_eq!(kinds(&analysed), vec![(1, SemanticErrorKind::InvalidOperands)]);
    }

    #[test]
    fn test_indexing_reduces_rank_and_checks_index_type() {
        let clean = analyse("let m: integer[][] = [[1, 2], [3, 4]];\nlet row: integer[] = m[0];\nlet v: integer = m[0][1];");
        assert!(clean.is_clean(), "{:?}", clean.diagnostics);

        let bad_index = analyse("let a: integer[] = [1, 2];\nlet v: integer = a[true];");
        assert_eq!(kinds(&bad_index), vec![(2, SemanticErrorKind::InvalidIndex)]);

        let not_array = analyse("let x: integer = 1;\nlet v: integer = x[0];");
        assert_eq!(kinds(&not_array), vec![(2, SemanticErrorKind::NotAnArray)]);
    }

    #[test]
    fn test_heterogeneous_array_reports_once_and_keeps_declared_type() {
        let analysed = analyse("let h: integer[] = [1, \"x\"];");
        assert_eq!(kinds(&analysed), vec![(1, SemanticErrorKind::HeterogeneousArray)]);
        let symbol = analysed.symbol_table
            .lookup_local(ScopeId::global(), "h").unwrap();
        assert_eq!(symbol.datatype, DataType::array(BaseType::Integer, 1));
    }

    #[test]
    fn test_non_rectangular_array_diagnosed() {
        let analysed = analyse("let m: integer[][] = [[1, 2], [3]];");
        assert_eq!(kinds(&analysed), vec![(1, SemanticErrorKind::NonRectangularArray)]);
    }

    #[test]
    fn test_empty_array_literal_adopts_declared_base() {
        let analysed = analyse("let xs: integer[] = [];");
        assert!(analysed.is_clean(), "{:?}", analysed.diagnostics);
    }

    #[test]
    fn test_conditions_must_be_boolean() {
        let analysed = analyse("if (1) { let a: integer = 1; }\nwhile (2) { let b: integer = 2; }");
        assert_eq!(kinds(&analysed), vec![
            (1, SemanticErrorKind::NonBooleanCondition),
            (2, SemanticErrorKind::NonBooleanCondition),
        ]);
    }

    #[test]
    fn test_scope_tree_uses_canonical_keys() {
        let source = "\
let x: integer = 1;
if (x < 2) { let a: integer = 1; } else { let b: integer = 2; }
while (x < 5) { x = x + 1; }
do { x = x - 1; } while (x > 0);
for (let i: integer = 0; i < 3; i = i + 1) { print(i); }
let arr: integer[] = [1, 2, 3];
foreach (e in arr) { print(e); }
try { print(1); } catch (err) { print(2); }
switch (x) { case 1: { let c: integer = 1; } default: { let d: integer = 2; } }
function f(): integer { return 1; }
class Dog { let name: string; }
";
        let analysed = analyse(source);
        assert!(analysed.is_clean(), "{:?}", analysed.diagnostics);

        let table = &analysed.symbol_table;
        let global = ScopeId::global();
        for key in ["if_2", "else_2", "while_3", "doWhile_4", "for_5", "foreach_7",
                    "try_8", "catch_8", "case_9_0", "default_9", "function_f", "class_Dog"] {
            assert!(table.child(global, key).is_some(), "missing scope {}", key);
        }
    }

    #[test]
    fn test_foreach_binds_element_type() {
        let analysed = analyse("let m: integer[][] = [[1], [2]];\nforeach (row in m) { let v: integer = row[0]; }");
        assert!(analysed.is_clean(), "{:?}", analysed.diagnostics);

        let scope = analysed.symbol_table.child(ScopeId::global(), "foreach_2").unwrap();
        let binding = analysed.symbol_table.lookup_local(scope, "row").unwrap();
        assert_eq!(binding.datatype, DataType::array(BaseType::Integer, 1));
    }

    #[test]
    fn test_break_continue_tracking() {
        let analysed = analyse("break;\ncontinue;");
        assert_eq!(kinds(&analysed), vec![
            (1, SemanticErrorKind::BreakOutsideLoop),
            (2, SemanticErrorKind::ContinueOutsideLoop),
        ]);

        // break is legal inside a switch, continue is not
        let in_switch = analyse("let x: integer = 1;\nswitch (x) { case 1: { break; } }");
        assert!(in_switch.is_clean(), "{:?}", in_switch.diagnostics);
        let continue_in_switch = analyse("let x: integer = 1;\nswitch (x) { case 1: { continue; } }");
        assert_eq!(kinds(&continue_in_switch), vec![(2, SemanticErrorKind::ContinueOutsideLoop)]);
    }

    #[test]
    fn test_switch_case_type_and_duplicates() {
        let analysed = analyse("let x: integer = 1;\nswitch (x) { case true: { } case 1: { } case 1: { } }");
        assert_eq!(kinds(&analysed), vec![
            (2, SemanticErrorKind::TypeMismatch),
            (2, SemanticErrorKind::DuplicateCase),
        ]);
    }

    #[test]
    fn test_function_return_coverage() {
        let missing = analyse("function f(): integer { let x: integer = 1; }");
        assert_eq!(kinds(&missing), vec![(1, SemanticErrorKind::MissingReturn)]);

        let void_with_value = analyse("function f() { return 1; }");
        assert_eq!(kinds(&void_with_value), vec![(1, SemanticErrorKind::ReturnMismatch)]);

        let mismatch = analyse("function f(): integer { return true; }");
        assert_eq!(kinds(&mismatch), vec![(1, SemanticErrorKind::ReturnMismatch)]);

        let clean = analyse("function f(): integer { return 1; }");
        assert!(clean.is_clean(), "{:?}", clean.diagnostics);
    }

    #[test]
    fn test_call_checks_arity_and_types() {
        let source = "function add(a: integer, b: integer): integer { return a + b; }\n";
        let arity = analyse(&format!("{}let c: integer = add(1);", source));
        assert_eq!(kinds(&arity), vec![(2, SemanticErrorKind::ArityMismatch)]);

        let types = analyse(&format!("{}let c: integer = add(1, true);", source));
        assert_eq!(kinds(&types), vec![(2, SemanticErrorKind::TypeMismatch)]);

        let clean = analyse(&format!("{}let c: integer = add(1, 2);", source));
        assert!(clean.is_clean(), "{:?}", clean.diagnostics);
    }

    #[test]
    fn test_class_members_this_and_inheritance() {
        let source = "\
class Animal {
    let name: string;
    function speak(): string { return this.name; }
}
class Dog : Animal {
    function constructor(n: string) { this.name = n; }
}
let d: Dog = new Dog(\"Fido\");
let s: string = d.speak();
";
        let analysed = analyse(source);
        assert!(analysed.is_clean(), "{:?}", analysed.diagnostics);

        let animal = analysed.symbol_table
            .lookup_local(ScopeId::global(), "Animal").unwrap();
        assert_eq!(animal.kind, SymbolKind::Class);
        assert!(animal.members.contains_key("name"));
        assert!(animal.members.contains_key("speak"));

        let dog = analysed.symbol_table
            .lookup_local(ScopeId::global(), "Dog").unwrap();
        assert!(dog.has_constructor);
        assert_eq!(dog.constructor_params.len(), 1);
    }

    #[test]
    fn test_unknown_member_and_constructor_arity() {
        let source = "class Dog { function constructor(n: string) { } }\n";
        let unknown = analyse(&format!("{}let d: Dog = new Dog(\"x\");\nlet v: integer = d.age;", source));
        assert_eq!(kinds(&unknown), vec![(3, SemanticErrorKind::UnknownMember)]);

        let arity = analyse(&format!("{}let d: Dog = new Dog();", source));
        assert_eq!(kinds(&arity), vec![(2, SemanticErrorKind::ArityMismatch)]);

        let no_class = analyse("let d: Dog = new Dog();");
        assert_eq!(kinds(&no_class), vec![(1, SemanticErrorKind::NotAClass)]);
    }

    #[test]
    fn test_inheritance_cycle_diagnosed() {
        let analysed = analyse("class A : B { }\nclass B : A { }");
        assert_eq!(kinds(&analysed), vec![(2, SemanticErrorKind::InheritanceCycle)]);
    }

    #[test]
    fn test_property_assignment_through_this() {
        let source = "\
class Dog {
    let name: string;
    function rename(n: string) { this.name = n; }
}
";
        let analysed = analyse(source);
        assert!(analysed.is_clean(), "{:?}", analysed.diagnostics);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let source = "let x: integer = true;\nlet x: integer = 2;\nfunction f(): integer { }";
        let first = analyse(source);
        let second = analyse(source);
        assert_eq!(first.diagnostics, second.diagnostics);
        assert_eq!(first.symbol_table, second.symbol_table);
    }

    #[test]
    fn test_scenario_or_chain_is_clean() {
        let analysed = analyse("let b: boolean = 1==2 || 2==1 || 1<3;");
        assert!(analysed.is_clean(), "{:?}", analysed.diagnostics);
    }
}
