use std::collections::HashSet;

use compiscript_common::{Operand, TacOp, TacProgram};

use super::{FrameSizes, TacGenerator, TacOutput};
use super::super::ast::{
    AssignTarget,
    BinaryOperation,
    Expression,
    Literal,
    Program,
    ScopeId,
    Statement,
    SwitchCase,
    Symbol,
    SymbolKind,
    SymbolTable,
    UnaryOperation,
};

/// Labels keep the `L<line>` shape of the listing but are minted through
/// this allocator so reuse of a line base (two constructs on one line)
/// still yields globally unique labels. Derived labels append an
/// alphabetic suffix (`_true`, `_after`, ...) and therefore cannot collide
/// with any base.
struct LabelAllocator {
    used: HashSet<String>,
}

impl LabelAllocator {
    fn new() -> Self {
        Self { used: HashSet::new() }
    }

    fn base_for_line(&mut self, line: usize) -> String {
        let mut base = format!("L{}", line);
        let mut attempt = 2;
        while !self.used.insert(base.clone()) {
            base = format!("L{}_{}", line, attempt);
            attempt += 1;
        }
        base
    }
}

/// Break and continue resolve against this stack: loops push both targets,
/// switches push a break-only frame. `continue` skips switch frames.
enum JumpTarget {
    Loop {
        continue_label: String,
        break_label: String,
    },
    Switch {
        end_label: String,
    },
}

/// CompiscriptTacGenerator is a concrete TacGenerator.
/// It visits the statement tree a second time, switching into the scopes
/// the analyzer created (the canonical-key contract), and appends one
/// quadruple per elementary operation with fresh temporaries per statement.
pub struct CompiscriptTacGenerator {
    tac: TacProgram,
    current_scope: ScopeId,
    labels: LabelAllocator,
    jump_targets: Vec<JumpTarget>,
    frame_sizes: FrameSizes,
}

impl CompiscriptTacGenerator {
    /// Switch into the child scope with the canonical key, staying put when
    /// the analyzer never created it.
    fn enter_scope(&mut self, symbols: &SymbolTable, key: &str) -> ScopeId {
        let previous = self.current_scope;
        if let Some(child) = symbols.child(self.current_scope, key) {
            self.current_scope = child;
        }
        previous
    }

    fn restore_scope(&mut self, previous: ScopeId) {
        self.current_scope = previous;
    }

    fn emit_label(&mut self, name: &str) {
        self.tac.emit(TacOp::Label, None, None, Some(Operand::label(name)));
    }

    fn emit_if_goto(&mut self, condition: Operand, target: &str) {
        self.tac.emit(TacOp::If, Some(condition), Some(Operand::name("goto")), Some(Operand::label(target)));
    }

    fn emit_goto(&mut self, target: &str) {
        self.tac.emit(TacOp::Goto, Some(Operand::label(target)), None, None);
    }

    /// Statement-boundary temporary reset. Suppressed inside loops and
    /// switches: their induction and scrutinee temporaries stay live across
    /// the statements of the body.
    fn maybe_reset(&mut self) {
        if self.jump_targets.is_empty() {
            self.tac.reset_temporaries();
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn generate_statement(&mut self, statement: &Statement, symbols: &mut SymbolTable) {
        match statement {
            Statement::VariableDeclaration { name, initializer, .. } => {
                self.generate_declaration(name, initializer.as_ref(), symbols);
            }
            Statement::ConstantDeclaration { name, initializer, .. } => {
                self.generate_declaration(name, Some(initializer), symbols);
            }
            Statement::Assignment { target, value, .. } => {
                self.generate_assignment(target, value, symbols);
            }
            Statement::ExpressionStatement { expression, .. } => {
                self.generate_expression(expression, symbols);
                self.maybe_reset();
            }
            Statement::Print { expression, .. } => {
                let value = self.generate_expression(expression, symbols);
                self.tac.emit(TacOp::Print, None, None, Some(value));
                self.maybe_reset();
            }
            Statement::If { condition, then_body, else_body, line } => {
                self.generate_if(condition, then_body, else_body.as_deref(), *line, symbols);
            }
            Statement::While { condition, body, line } => {
                self.generate_while(condition, body, *line, symbols);
            }
            Statement::DoWhile { body, condition, line } => {
                self.generate_do_while(body, condition, *line, symbols);
            }
            Statement::For { init, condition, update, body, line } => {
                self.generate_for(init.as_deref(), condition.as_ref(), update.as_deref(), body, *line, symbols);
            }
            Statement::Foreach { binding, iterable, body, line } => {
                self.generate_foreach(binding, iterable, body, *line, symbols);
            }
            Statement::Break { .. } => {
                let target = self.jump_targets.iter().rev().map(|target| match target {
                    JumpTarget::Loop { break_label, .. } => break_label.clone(),
                    JumpTarget::Switch { end_label } => end_label.clone(),
                }).next();
                if let Some(target) = target {
                    self.emit_goto(&target);
                }
            }
            Statement::Continue { .. } => {
                let target = self.jump_targets.iter().rev().find_map(|target| match target {
                    JumpTarget::Loop { continue_label, .. } => Some(continue_label.clone()),
                    JumpTarget::Switch { .. } => None,
                });
                if let Some(target) = target {
                    self.emit_goto(&target);
                }
            }
            Statement::Return { value, .. } => {
                let value = value.as_ref().map(|value| self.generate_expression(value, symbols));
                self.tac.emit(TacOp::Return, value, None, None);
            }
            Statement::TryCatch { try_body, catch_binding, catch_body, line } => {
                self.generate_try_catch(try_body, catch_binding, catch_body, *line, symbols);
            }
            Statement::Switch { scrutinee, cases, default, line } => {
                self.generate_switch(scrutinee, cases, default.as_deref(), *line, symbols);
            }
            Statement::FunctionDeclaration { name, parameters, body, .. } => {
                let parameter_names: Vec<String> = parameters.iter()
                    .map(|parameter| parameter.name.clone())
                    .collect();
                self.generate_function(name, &parameter_names, body, symbols);
            }
            Statement::ClassDeclaration { name, parent, members, .. } => {
                self.generate_class(name, parent.as_deref(), members, symbols);
            }
            Statement::Block { body, .. } => {
                self.generate_body(body, symbols);
            }
        }
    }

    fn generate_body(&mut self, body: &[Statement], symbols: &mut SymbolTable) {
        for statement in body {
            self.generate_statement(statement, symbols);
        }
    }

    fn generate_declaration(&mut self, name: &str, initializer: Option<&Expression>, symbols: &mut SymbolTable) {
        if let Some(initializer) = initializer {
            // Record the declared element count so foreach can bound its
            // induction variable with `<name>.size`.
            if let Expression::ArrayLiteral { items, .. } = initializer {
                if let Some(symbol) = symbols.symbol_mut(self.current_scope, name) {
                    symbol.size = items.len();
                }
            }
            let value = self.generate_expression(initializer, symbols);
            self.tac.emit(TacOp::Assign, Some(value), None, Some(Operand::name(name)));
        }
        self.maybe_reset();
    }

    fn generate_assignment(&mut self, target: &AssignTarget, value: &Expression, symbols: &mut SymbolTable) {
        match target {
            AssignTarget::Variable { name } => {
                let value = self.generate_expression(value, symbols);
                self.tac.emit(TacOp::Assign, Some(value), None, Some(Operand::name(name)));
            }
            AssignTarget::Index { array, index } => {
                let array = self.generate_expression(array, symbols);
                let index = self.generate_expression(index, symbols);
                let value = self.generate_expression(value, symbols);
                self.tac.emit(TacOp::IndexSet, Some(value), Some(index), Some(array));
            }
            AssignTarget::Property { object, property } => {
                let object = self.generate_expression(object, symbols);
                let value = self.generate_expression(value, symbols);
                self.tac.emit(TacOp::SetField, Some(object), Some(Operand::name(property)), Some(value));
            }
        }
        self.maybe_reset();
    }

    fn generate_if(
        &mut self,
        condition: &Expression,
        then_body: &[Statement],
        else_body: Option<&[Statement]>,
        line: usize,
        symbols: &mut SymbolTable,
    ) {
        let base = self.labels.base_for_line(line);
        let true_label = format!("{}_true", base);
        let end_label = format!("{}_end", base);
        // Without an else branch the false target is the end label.
        let false_label = match else_body {
            Some(_) => format!("{}_false", base),
            None => end_label.clone(),
        };

        let condition = self.generate_expression(condition, symbols);
        self.emit_if_goto(condition, &true_label);
        self.emit_goto(&false_label);

        self.emit_label(&true_label);
        let previous = self.enter_scope(symbols, &format!("if_{}", line));
        self.generate_body(then_body, symbols);
        self.restore_scope(previous);

        if let Some(else_body) = else_body {
            self.emit_goto(&end_label);
            self.emit_label(&false_label);
            let previous = self.enter_scope(symbols, &format!("else_{}", line));
            self.generate_body(else_body, symbols);
            self.restore_scope(previous);
        }

        self.emit_label(&end_label);
        self.maybe_reset();
    }

    fn generate_while(&mut self, condition: &Expression, body: &[Statement], line: usize, symbols: &mut SymbolTable) {
        let base = self.labels.base_for_line(line);
        let start_label = format!("{}_start", base);
        let body_label = format!("{}_body", base);
        let after_label = format!("{}_after", base);

        self.emit_label(&start_label);
        let condition = self.generate_expression(condition, symbols);
        self.emit_if_goto(condition, &body_label);
        self.emit_goto(&after_label);

        self.emit_label(&body_label);
        self.jump_targets.push(JumpTarget::Loop {
            continue_label: start_label.clone(),
            break_label: after_label.clone(),
        });
        let previous = self.enter_scope(symbols, &format!("while_{}", line));
        self.generate_body(body, symbols);
        self.restore_scope(previous);
        self.jump_targets.pop();

        self.emit_goto(&start_label);
        self.emit_label(&after_label);
        self.maybe_reset();
    }

    fn generate_do_while(&mut self, body: &[Statement], condition: &Expression, line: usize, symbols: &mut SymbolTable) {
        let base = self.labels.base_for_line(line);
        let start_label = format!("{}_start", base);
        let cond_label = format!("{}_cond", base);
        let after_label = format!("{}_after", base);

        self.emit_label(&start_label);
        self.jump_targets.push(JumpTarget::Loop {
            continue_label: cond_label.clone(),
            break_label: after_label.clone(),
        });
        let previous = self.enter_scope(symbols, &format!("doWhile_{}", line));
        self.generate_body(body, symbols);
        self.restore_scope(previous);
        self.jump_targets.pop();

        self.emit_label(&cond_label);
        let condition = self.generate_expression(condition, symbols);
        self.emit_if_goto(condition, &start_label);
        self.emit_goto(&after_label);
        self.emit_label(&after_label);
        self.maybe_reset();
    }

    fn generate_for(
        &mut self,
        init: Option<&Statement>,
        condition: Option<&Expression>,
        update: Option<&Statement>,
        body: &[Statement],
        line: usize,
        symbols: &mut SymbolTable,
    ) {
        let base = self.labels.base_for_line(line);
        let start_label = format!("{}_start", base);
        let body_label = format!("{}_body", base);
        let update_label = format!("{}_update", base);
        let after_label = format!("{}_after", base);

        let previous = self.enter_scope(symbols, &format!("for_{}", line));
        if let Some(init) = init {
            self.generate_statement(init, symbols);
        }

        self.emit_label(&start_label);
        match condition {
            Some(condition) => {
                let condition = self.generate_expression(condition, symbols);
                self.emit_if_goto(condition, &body_label);
                self.emit_goto(&after_label);
            }
            // No condition: an unconditional loop
            None => self.emit_goto(&body_label),
        }

        self.emit_label(&body_label);
        self.jump_targets.push(JumpTarget::Loop {
            continue_label: update_label.clone(),
            break_label: after_label.clone(),
        });
        self.generate_body(body, symbols);
        self.jump_targets.pop();

        self.emit_label(&update_label);
        if let Some(update) = update {
            self.generate_statement(update, symbols);
        }
        self.emit_goto(&start_label);
        self.emit_label(&after_label);

        self.restore_scope(previous);
        self.maybe_reset();
    }

    fn generate_foreach(
        &mut self,
        binding: &str,
        iterable: &Expression,
        body: &[Statement],
        line: usize,
        symbols: &mut SymbolTable,
    ) {
        let base = self.labels.base_for_line(line);
        let start_label = format!("{}_start", base);
        let body_label = format!("{}_body", base);
        let update_label = format!("{}_update", base);
        let after_label = format!("{}_after", base);

        let iterable = self.generate_expression(iterable, symbols);
        let iterable_text = iterable.to_string();

        let index = self.tac.new_temp();
        self.tac.emit(TacOp::Assign, Some(Operand::Integer(0)), None, Some(index.clone()));

        self.emit_label(&start_label);
        let compare = self.tac.new_temp();
        self.tac.emit(TacOp::Lt,
                      Some(index.clone()),
                      Some(Operand::member(iterable_text.clone(), "size")),
                      Some(compare.clone()));
        self.emit_if_goto(compare, &body_label);
        self.emit_goto(&after_label);

        self.emit_label(&body_label);
        self.tac.emit(TacOp::Assign,
                      Some(Operand::indexed(iterable_text, index.clone())),
                      None,
                      Some(Operand::name(binding)));

        self.jump_targets.push(JumpTarget::Loop {
            continue_label: update_label.clone(),
            break_label: after_label.clone(),
        });
        let previous = self.enter_scope(symbols, &format!("foreach_{}", line));
        self.generate_body(body, symbols);
        self.restore_scope(previous);
        self.jump_targets.pop();

        self.emit_label(&update_label);
        let incremented = self.tac.new_temp();
        self.tac.emit(TacOp::Add, Some(index.clone()), Some(Operand::Integer(1)), Some(incremented.clone()));
        self.tac.emit(TacOp::Assign, Some(incremented), None, Some(index));
        self.emit_goto(&start_label);

        self.emit_label(&after_label);
        self.maybe_reset();
    }

    fn generate_try_catch(
        &mut self,
        try_body: &[Statement],
        catch_binding: &str,
        catch_body: &[Statement],
        line: usize,
        symbols: &mut SymbolTable,
    ) {
        let base = self.labels.base_for_line(line);
        let try_label = format!("{}_try", base);
        let catch_label = format!("{}_catch", base);
        let end_label = format!("{}_end", base);

        self.emit_label(&try_label);
        self.tac.emit(TacOp::OnException, Some(Operand::name("->")), None, Some(Operand::label(&catch_label)));

        let previous = self.enter_scope(symbols, &format!("try_{}", line));
        self.generate_body(try_body, symbols);
        self.restore_scope(previous);
        self.emit_goto(&end_label);

        self.emit_label(&catch_label);
        let previous = self.enter_scope(symbols, &format!("catch_{}", line));
        self.tac.emit(TacOp::ExcAssign,
                      Some(Operand::Text(String::from("Exception"))),
                      None,
                      Some(Operand::name(catch_binding)));
        self.generate_body(catch_body, symbols);
        self.restore_scope(previous);

        self.emit_label(&end_label);
        self.maybe_reset();
    }

    fn generate_switch(
        &mut self,
        scrutinee: &Expression,
        cases: &[SwitchCase],
        default: Option<&[Statement]>,
        line: usize,
        symbols: &mut SymbolTable,
    ) {
        let base = self.labels.base_for_line(line);
        let end_label = format!("{}_end", base);
        let case_labels: Vec<String> = (0..cases.len())
            .map(|index| format!("{}_case{}", base, index))
            .collect();

        let scrutinee = self.generate_expression(scrutinee, symbols);

        // Linear chain of equality tests, one per case.
        for (case, label) in cases.iter().zip(case_labels.iter()) {
            let case_value = self.generate_expression(&case.value, symbols);
            let compare = self.tac.new_temp();
            self.tac.emit(TacOp::Eq, Some(scrutinee.clone()), Some(case_value), Some(compare.clone()));
            self.emit_if_goto(compare, label);
        }

        let default_label = format!("{}_default", base);
        match default {
            Some(_) => self.emit_goto(&default_label),
            None => self.emit_goto(&end_label),
        }

        self.jump_targets.push(JumpTarget::Switch { end_label: end_label.clone() });

        for (index, (case, label)) in cases.iter().zip(case_labels.iter()).enumerate() {
            self.emit_label(label);
            let previous = self.enter_scope(symbols, &format!("case_{}_{}", line, index));
            self.generate_body(&case.body, symbols);
            self.restore_scope(previous);
            self.emit_goto(&end_label);
        }

        if let Some(default) = default {
            self.emit_label(&default_label);
            let previous = self.enter_scope(symbols, &format!("default_{}", line));
            self.generate_body(default, symbols);
            self.restore_scope(previous);
            self.emit_goto(&end_label);
        }

        self.jump_targets.pop();
        self.emit_label(&end_label);
        self.maybe_reset();
    }

    fn generate_function(&mut self, name: &str, parameter_names: &[String], body: &[Statement], symbols: &mut SymbolTable) {
        let return_type = match symbols.lookup_global(self.current_scope, name) {
            Some(symbol) if symbol.is_callable() && !symbol.return_type.is_unknown() => {
                symbol.return_type.to_string()
            }
            _ => String::from("void"),
        };

        self.tac.emit(TacOp::Func,
                      Some(Operand::name(name)),
                      Some(Operand::Count(parameter_names.len())),
                      Some(Operand::name(return_type)));
        for parameter in parameter_names {
            self.tac.emit(TacOp::Param, Some(Operand::name(parameter.clone())), None, None);
        }

        let key = format!("function_{}", name);
        let previous = self.enter_scope(symbols, &key);
        if self.current_scope != previous {
            self.assign_frame_offsets(symbols, self.current_scope, &key);
        }
        self.generate_body(body, symbols);
        self.restore_scope(previous);

        // Temporaries never cross function boundaries
        self.tac.reset_temporaries();
        self.tac.emit(TacOp::EndFunc, None, None, None);
    }

    fn generate_class(&mut self, name: &str, parent: Option<&str>, members: &[Statement], symbols: &mut SymbolTable) {
        match parent {
            Some(parent) => {
                self.tac.emit(TacOp::Class,
                              Some(Operand::name(name)),
                              Some(Operand::name("inherits")),
                              Some(Operand::name(parent)));
                self.tac.emit(TacOp::Inherit, Some(Operand::name(parent)), None, None);
            }
            None => {
                self.tac.emit(TacOp::Class, Some(Operand::name(name)), None, None);
            }
        }

        let previous = self.enter_scope(symbols, &format!("class_{}", name));
        for member in members {
            match member {
                Statement::FunctionDeclaration { .. } => self.generate_statement(member, symbols),
                Statement::VariableDeclaration { name, .. } => {
                    self.tac.emit(TacOp::Field, None, None, Some(Operand::name(name.clone())));
                }
                Statement::ConstantDeclaration { name, .. } => {
                    self.tac.emit(TacOp::FieldConst, None, None, Some(Operand::name(name.clone())));
                }
                _ => {}
            }
        }
        self.restore_scope(previous);

        self.tac.emit(TacOp::EndClass, None, None, Some(Operand::name(name)));
        self.maybe_reset();
    }

    /// Walk the function's scope subtree (stopping at nested function and
    /// class scopes, which own their own frames) assigning each variable a
    /// 4-byte slot above the fixed fp/ra save area.
    fn assign_frame_offsets(&mut self, symbols: &mut SymbolTable, function_scope: ScopeId, key: &str) {
        let mut offset: i64 = 8;
        let mut pending = vec![function_scope];

        while let Some(scope_id) = pending.pop() {
            let names: Vec<String> = symbols.scope(scope_id)
                .symbols()
                .filter(|symbol| symbol.kind == SymbolKind::Variable)
                .map(|symbol: &Symbol| symbol.identifier.clone())
                .collect();
            for name in names {
                if let Some(symbol) = symbols.symbol_mut(scope_id, &name) {
                    symbol.address = offset;
                    offset += 4;
                }
            }
            for child in symbols.scope(scope_id).children() {
                let child_name = symbols.scope(*child).name();
                if !child_name.starts_with("function_") && !child_name.starts_with("class_") {
                    pending.push(*child);
                }
            }
        }

        self.frame_sizes.insert(String::from(key), offset as u32);
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn generate_expression(&mut self, expression: &Expression, symbols: &mut SymbolTable) -> Operand {
        match expression {
            Expression::Literal { value, .. } => match value {
                Literal::INTEGER(value) => Operand::Integer(*value),
                Literal::BOOL(value) => Operand::Boolean(*value),
                Literal::STRING(value) => Operand::Text(value.clone()),
                Literal::NULL => Operand::Null,
            },
            Expression::Identifier { name, .. } => Operand::name(name.clone()),
            Expression::This { .. } => Operand::name("this"),
            Expression::ArrayLiteral { items, .. } => {
                let destination = self.tac.new_temp();
                self.tac.emit(TacOp::Alloc,
                              Some(Operand::Integer(items.len() as i64)),
                              None,
                              Some(destination.clone()));
                let base = destination.to_string();
                for (index, item) in items.iter().enumerate() {
                    let value = self.generate_expression(item, symbols);
                    self.tac.emit(TacOp::Assign,
                                  Some(value),
                                  None,
                                  Some(Operand::indexed(base.clone(), Operand::Integer(index as i64))));
                }
                destination
            }
            Expression::Unary { op, operand, .. } => {
                let value = self.generate_expression(operand, symbols);
                match op {
                    // Unary plus is the identity
                    UnaryOperation::PLUS => value,
                    UnaryOperation::NOT => {
                        let destination = self.tac.new_temp();
                        self.tac.emit(TacOp::Not, Some(value), None, Some(destination.clone()));
                        destination
                    }
                    UnaryOperation::NEGATE => {
                        let destination = self.tac.new_temp();
                        self.tac.emit(TacOp::Neg, Some(value), None, Some(destination.clone()));
                        destination
                    }
                }
            }
            Expression::Binary { op, lhs, rhs, .. } => {
                let lhs = self.generate_expression(lhs, symbols);
                let rhs = self.generate_expression(rhs, symbols);
                let destination = self.tac.new_temp();
                self.tac.emit(Self::binary_tac_op(*op), Some(lhs), Some(rhs), Some(destination.clone()));
                destination
            }
            Expression::Index { base, index, .. } => {
                let base = self.generate_expression(base, symbols);
                let index = self.generate_expression(index, symbols);
                let destination = self.tac.new_temp();
                self.tac.emit(TacOp::IndexGet, Some(base), Some(index), Some(destination.clone()));
                destination
            }
            Expression::Property { base, property, .. } => {
                let base = self.generate_expression(base, symbols);
                let destination = self.tac.new_temp();
                self.tac.emit(TacOp::GetField,
                              Some(base),
                              Some(Operand::name(property.clone())),
                              Some(destination.clone()));
                destination
            }
            Expression::Call { callee, arguments, .. } => {
                self.generate_call(callee, arguments, symbols)
            }
            Expression::New { class, arguments, .. } => {
                let count = arguments.len();
                for argument in arguments {
                    let value = self.generate_expression(argument, symbols);
                    self.tac.emit(TacOp::Param, Some(value), None, None);
                }
                let destination = self.tac.new_temp();
                self.tac.emit(TacOp::AllocObj, Some(Operand::name(class.clone())), None, Some(destination.clone()));
                self.tac.emit(TacOp::CallConstructor,
                              Some(Operand::name(class.clone())),
                              Some(Operand::Count(count)),
                              Some(destination.clone()));
                destination
            }
        }
    }

    fn generate_call(&mut self, callee: &Expression, arguments: &[Expression], symbols: &mut SymbolTable) -> Operand {
        // Method calls keep the receiver evaluated before the arguments.
        let receiver = match callee {
            Expression::Property { base, property, .. } => {
                let object = self.generate_expression(base, symbols);
                Some((object.to_string(), property.clone()))
            }
            _ => None,
        };

        let count = arguments.len();
        for argument in arguments {
            let value = self.generate_expression(argument, symbols);
            self.tac.emit(TacOp::Param, Some(value), None, None);
        }

        let destination = self.tac.new_temp();
        match (receiver, callee) {
            (Some((object, property)), _) => {
                self.tac.emit(TacOp::CallMethod,
                              Some(Operand::member(object, property)),
                              Some(Operand::Count(count)),
                              Some(destination.clone()));
            }
            (None, Expression::Identifier { name, .. }) => {
                self.tac.emit(TacOp::CallFunc,
                              Some(Operand::name(name.clone())),
                              Some(Operand::Count(count)),
                              Some(destination.clone()));
            }
            (None, other) => {
                let callee = self.generate_expression(other, symbols);
                self.tac.emit(TacOp::CallFunc,
                              Some(callee),
                              Some(Operand::Count(count)),
                              Some(destination.clone()));
            }
        }
        destination
    }

    fn binary_tac_op(op: BinaryOperation) -> TacOp {
        match op {
            BinaryOperation::ADD => TacOp::Add,
            BinaryOperation::SUB => TacOp::Sub,
            BinaryOperation::MUL => TacOp::Mul,
            BinaryOperation::DIV => TacOp::Div,
            BinaryOperation::MOD => TacOp::Mod,
            BinaryOperation::LESS_THAN => TacOp::Lt,
            BinaryOperation::LESS_EQUAL => TacOp::Le,
            BinaryOperation::GREATER_THAN => TacOp::Gt,
            BinaryOperation::GREATER_EQUAL => TacOp::Ge,
            BinaryOperation::EQUAL => TacOp::Eq,
            BinaryOperation::NOT_EQUAL => TacOp::Ne,
            BinaryOperation::AND => TacOp::And,
            BinaryOperation::OR => TacOp::Or,
        }
    }
}

/// TacGenerator Trait Concrete Implementation
impl TacGenerator for CompiscriptTacGenerator {
    fn default() -> Self {
        Self {
            tac: TacProgram::new(),
            current_scope: ScopeId::global(),
            labels: LabelAllocator::new(),
            jump_targets: vec![],
            frame_sizes: FrameSizes::new(),
        }
    }

    fn generate(mut self, root: &Program, symbols: &mut SymbolTable) -> TacOutput {
        for statement in &root.statements {
            self.generate_statement(statement, symbols);
        }

        TacOutput {
            tac: self.tac,
            frame_sizes: self.frame_sizes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parser::{AstParser, PestCompiscriptParser};
    use crate::compiler::semantic_analyser::{CompiscriptSemanticAnalyser, SemanticAnalyser};

    fn generate(source: &str) -> (TacOutput, SymbolTable) {
        let root = PestCompiscriptParser::default().parse(source).unwrap();
        let analysed = CompiscriptSemanticAnalyser::default().analyse(root);
        assert!(analysed.is_clean(), "{:?}", analysed.diagnostics);
        let mut symbols = analysed.symbol_table;
        let output = CompiscriptTacGenerator::default().generate(&analysed.root, &mut symbols);
        (output, symbols)
    }

    fn pretty_lines(tac: &TacProgram) -> Vec<String> {
        tac.quadruples().iter().map(|quad| quad.pretty()).collect()
    }

    #[test]
    fn test_arithmetic_folding_scenario() {
        let (output, _) = generate("let x: integer = (1+3)-(4*(5/2));");
        assert_eq!(pretty_lines(&output.tac), vec![
            "t1 = 1 + 3",
            "t2 = 5 / 2",
            "t3 = 4 * t2",
            "t4 = t1 - t3",
            "x = t4",
        ]);
    }

    #[test]
    fn test_or_chain_scenario() {
        let (output, _) = generate("let b: boolean = 1==2 || 2==1 || 1<3;");
        assert_eq!(pretty_lines(&output.tac), vec![
            "t1 = 1 == 2",
            "t2 = 2 == 1",
            "t3 = t1 || t2",
            "t4 = 1 < 3",
            "t5 = t3 || t4",
            "b = t5",
        ]);
    }

    #[test]
    fn test_array_literal_and_indexed_write_scenario() {
        let (output, symbols) = generate("let arr: integer[] = [1,2,3];\narr[0] = 10;");
        assert_eq!(pretty_lines(&output.tac), vec![
            "t1 = alloc 3",
            "t1[0] = 1",
            "t1[1] = 2",
            "t1[2] = 3",
            "arr = t1",
            "arr[0] = 10",
        ]);

        // The declared element count lands on the array symbol.
        let symbol = symbols.lookup_local(ScopeId::global(), "arr").unwrap();
        assert_eq!(symbol.size, 3);
    }

    #[test]
    fn test_if_else_scenario() {
        let (output, _) = generate("if (1<2) { let a: integer = 1; } else { let b: integer = 2; }");
        assert_eq!(pretty_lines(&output.tac), vec![
            "t1 = 1 < 2",
            "if t1 goto L1_true",
            "goto L1_false",
            "L1_true:",
            "a = 1",
            "goto L1_end",
            "L1_false:",
            "b = 2",
            "L1_end:",
        ]);
    }

    #[test]
    fn test_if_without_else_reuses_end_label() {
        let (output, _) = generate("if (1<2) { let a: integer = 1; }");
        assert_eq!(pretty_lines(&output.tac), vec![
            "t1 = 1 < 2",
            "if t1 goto L1_true",
            "goto L1_end",
            "L1_true:",
            "a = 1",
            "L1_end:",
        ]);
    }

    #[test]
    fn test_function_and_call_scenario_after_grouping() {
        let source = "function add(a: integer, b: integer): integer { return a + b; }\nlet c: integer = add(1, 2);";
        let (output, _) = generate(source);
        let grouped = output.tac.group_by_blocks();
        assert_eq!(pretty_lines(&grouped), vec![
            "param 1",
            "param 2",
            "t1 = call add, 2",
            "c = t1",
            "func add, n_params=2, ret_type=integer",
            "param a",
            "param b",
            "t1 = a + b",
            "return t1",
            "endfunc",
        ]);
    }

    #[test]
    fn test_while_lowering_and_loop_targets() {
        let source = "let x: integer = 0;\nwhile (x < 5) { x = x + 1; break; continue; }";
        let (output, _) = generate(source);
        assert_eq!(pretty_lines(&output.tac), vec![
            "x = 0",
            "L2_start:",
            "t1 = x < 5",
            "if t1 goto L2_body",
            "goto L2_after",
            "L2_body:",
            "t2 = x + 1",
            "x = t2",
            "goto L2_after",
            "goto L2_start",
            "goto L2_start",
            "L2_after:",
        ]);
    }

    #[test]
    fn test_do_while_lowering() {
        let source = "let j: integer = 0;\ndo { j = j + 1; } while (j < 2);";
        let (output, _) = generate(source);
        assert_eq!(pretty_lines(&output.tac), vec![
            "j = 0",
            "L2_start:",
            "t1 = j + 1",
            "j = t1",
            "L2_cond:",
            "t2 = j < 2",
            "if t2 goto L2_start",
            "goto L2_after",
            "L2_after:",
        ]);
    }

    #[test]
    fn test_for_lowering() {
        let source = "for (let i: integer = 0; i < 3; i = i + 1) { print(i); }";
        let (output, _) = generate(source);
        assert_eq!(pretty_lines(&output.tac), vec![
            "i = 0",
            "L1_start:",
            "t1 = i < 3",
            "if t1 goto L1_body",
            "goto L1_after",
            "L1_body:",
            "print i",
            "L1_update:",
            "t2 = i + 1",
            "i = t2",
            "goto L1_start",
            "L1_after:",
        ]);
    }

    #[test]
    fn test_foreach_lowering_uses_size_member() {
        let source = "let arr: integer[] = [1, 2];\nlet sum: integer = 0;\nforeach (e in arr) { sum = sum + e; }";
        let (output, _) = generate(source);
        let lines = pretty_lines(&output.tac);
        let foreach_lines: Vec<&str> = lines.iter().skip(5).map(String::as_str).collect();
        assert_eq!(foreach_lines, vec![
            "t1 = 0",
            "L3_start:",
            "t2 = t1 < arr.size",
            "if t2 goto L3_body",
            "goto L3_after",
            "L3_body:",
            "e = arr[t1]",
            "t3 = sum + e",
            "sum = t3",
            "L3_update:",
            "t4 = t1 + 1",
            "t1 = t4",
            "goto L3_start",
            "L3_after:",
        ]);
    }

    #[test]
    fn test_switch_lowering_and_break_targets_switch_end() {
        let source = "let x: integer = 2;\nswitch (x) { case 1: { print(1); break; } default: { print(3); } }";
        let (output, _) = generate(source);
        assert_eq!(pretty_lines(&output.tac), vec![
            "x = 2",
            "t1 = x == 1",
            "if t1 goto L2_case0",
            "goto L2_default",
            "L2_case0:",
            "print 1",
            "goto L2_end",
            "goto L2_end",
            "L2_default:",
            "print 3",
            "goto L2_end",
            "L2_end:",
        ]);
    }

    #[test]
    fn test_break_inside_switch_inside_loop_still_exits_switch_only() {
        let source = "\
let x: integer = 0;
while (x < 3) {
    switch (x) { case 1: { break; } }
    x = x + 1;
}";
        let (output, _) = generate(source);
        let lines = pretty_lines(&output.tac);
        // The break inside the case must jump to the switch end label, not
        // the while after label.
        let case_goto = lines.iter()
            .position(|line| line == "L3_case0:")
            .map(|index| lines[index + 1].clone())
            .unwrap();
        assert_eq!(case_goto, "goto L3_end");
        // continue would have skipped the switch frame; break must not.
        assert!(lines.contains(&String::from("goto L2_start")));
    }

    #[test]
    fn test_method_call_and_object_construction() {
        let source = "\
class Dog {
    function constructor(n: integer) { }
    function speak(): integer { return 1; }
}
let d: Dog = new Dog(5);
let v: integer = d.speak();
";
        let (output, _) = generate(source);
        let lines = pretty_lines(&output.tac);
        assert!(lines.contains(&String::from("class Dog")));
        assert!(lines.contains(&String::from("param 5")));
        assert!(lines.contains(&String::from("t1 = new Dog")));
        assert!(lines.contains(&String::from("t1 = constructor Dog, 1")));
        assert!(lines.contains(&String::from("t1 = call d.speak, 0")));
    }

    #[test]
    fn test_class_fields_and_inheritance_quads() {
        let source = "class Animal { let name: string; }\nclass Dog : Animal { const legs: integer = 4; }";
        let (output, _) = generate(source);
        assert_eq!(pretty_lines(&output.tac), vec![
            "class Animal",
            "field name",
            "endclass Animal",
            "class Dog inherits Animal",
            "inherits Animal",
            "const field legs",
            "endclass Dog",
        ]);
    }

    #[test]
    fn test_try_catch_lowering() {
        let source = "try { print(1); } catch (err) { print(2); }";
        let (output, _) = generate(source);
        assert_eq!(pretty_lines(&output.tac), vec![
            "L1_try:",
            "on_exception goto L1_catch",
            "print 1",
            "goto L1_end",
            "L1_catch:",
            "err = catch \"Exception\"",
            "print 2",
            "L1_end:",
        ]);
    }

    #[test]
    fn test_labels_are_unique_and_targets_resolve() {
        let source = "\
let x: integer = 0;
while (x < 2) { x = x + 1; }
while (x < 4) { x = x + 1; }
if (x == 4) { print(x); }
";
        let (output, _) = generate(source);

        let mut defined = std::collections::HashSet::new();
        let mut referenced = std::collections::HashSet::new();
        for quad in output.tac.quadruples() {
            match quad.op {
                TacOp::Label => {
                    let name = quad.result.as_ref().unwrap().label_name().unwrap().to_string();
                    assert!(defined.insert(name), "duplicate label");
                }
                TacOp::If | TacOp::OnException => {
                    referenced.insert(quad.result.as_ref().unwrap().label_name().unwrap().to_string());
                }
                TacOp::Goto => {
                    referenced.insert(quad.arg1.as_ref().unwrap().label_name().unwrap().to_string());
                }
                _ => {}
            }
        }
        for target in &referenced {
            assert!(defined.contains(target), "undefined branch target {}", target);
        }
    }

    #[test]
    fn test_temporaries_reset_per_function_and_statement() {
        let source = "let x: integer = 1 + 2;\nlet y: integer = 3 + 4;";
        let (output, _) = generate(source);
        assert_eq!(pretty_lines(&output.tac), vec![
            "t1 = 1 + 2",
            "x = t1",
            "t1 = 3 + 4",
            "y = t1",
        ]);
    }

    #[test]
    fn test_frame_offsets_assigned_to_function_locals() {
        let source = "\
function f(a: integer): integer {
    let b: integer = a;
    if (b > 0) { let c: integer = 1; }
    return b;
}";
        let (output, symbols) = generate(source);

        let frame = output.frame_sizes.get("function_f").copied().unwrap();
        let function_scope = symbols.child(ScopeId::global(), "function_f").unwrap();

        let a = symbols.lookup_local(function_scope, "a").unwrap();
        let b = symbols.lookup_local(function_scope, "b").unwrap();
        let if_scope = symbols.child(function_scope, "if_3").unwrap();
        let c = symbols.lookup_local(if_scope, "c").unwrap();

        let mut offsets = vec![a.address, b.address, c.address];
        offsets.sort();
        assert_eq!(offsets, vec![8, 12, 16]);
        assert_eq!(frame, 8 + 3 * 4);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let source = "let x: integer = 1;\nwhile (x < 5) { x = x + 1; }";
        let (first, _) = generate(source);
        let (second, _) = generate(source);
        assert_eq!(first.tac, second.tac);
        assert_eq!(first.frame_sizes, second.frame_sizes);
    }
}
