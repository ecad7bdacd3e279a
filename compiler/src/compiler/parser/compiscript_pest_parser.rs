use crate::pest::Parser;
use crate::pest::iterators::Pair;

use super::{AstParser, SyntaxError};
use super::super::ast::{
    AssignTarget,
    BinaryOperation,
    Expression,
    Literal,
    Parameter,
    Program,
    Statement,
    SwitchCase,
    TypeAnnotation,
    UnaryOperation,
};

/// Pest Compiscript parser parses a string into a series of tokens.
/// These tokens are defined as a Context-Free-Grammar in the
/// src/compiscript.pest file. The tokens generated from this parser are then
/// formalised into the abstract syntax tree.
#[derive(Parser)]
#[grammar = "compiscript.pest"]
struct CompiscriptParser;

/// PestCompiscriptParser is a concrete AstParser.
/// It uses the pest library to generate a token sequence from a source
/// string that is then converted into the Statement/Expression tree.
pub struct PestCompiscriptParser;

impl PestCompiscriptParser {
    /// Source line a token pair starts on
    fn line(pair: &Pair<Rule>) -> usize {
        pair.as_span().start_pos().line_col().0
    }

    fn parse_into_program(&self, source: &str) -> Result<Program, SyntaxError> {
        match CompiscriptParser::parse(Rule::program, source) {
            Ok(mut pairs) => {
                let program = pairs.next().unwrap();
                let mut statements = vec![];
                for pair in program.into_inner() {
                    if pair.as_rule() == Rule::EOI {
                        continue;
                    }
                    statements.push(self.parse_statement(pair)?);
                }
                Ok(Program { statements })
            }
            Err(error) => {
                let line = match error.line_col {
                    pest::error::LineColLocation::Pos((line, _)) => line,
                    pest::error::LineColLocation::Span((line, _), _) => line,
                };
                Err(SyntaxError {
                    line,
                    message: format!("Error de sintaxis: {}", error.variant.message()),
                })
            }
        }
    }

    fn parse_statement(&self, pair: Pair<Rule>) -> Result<Statement, SyntaxError> {
        let line = Self::line(&pair);
        match pair.as_rule() {
            Rule::variable_declaration => {
                let mut inner = pair.into_inner();
                let name = String::from(inner.next().unwrap().as_str());
                let mut declared_type = None;
                let mut initializer = None;
                for pair in inner {
                    match pair.as_rule() {
                        Rule::type_annotation => {
                            declared_type = Some(self.parse_type_annotation(pair));
                        }
                        _ => initializer = Some(self.parse_expression(pair)),
                    }
                }
                Ok(Statement::VariableDeclaration { name, declared_type, initializer, line })
            }
            Rule::constant_declaration => {
                let mut inner = pair.into_inner();
                let name = String::from(inner.next().unwrap().as_str());
                let mut declared_type = None;
                let mut initializer = None;
                for pair in inner {
                    match pair.as_rule() {
                        Rule::type_annotation => {
                            declared_type = Some(self.parse_type_annotation(pair));
                        }
                        _ => initializer = Some(self.parse_expression(pair)),
                    }
                }
                Ok(Statement::ConstantDeclaration {
                    name,
                    declared_type,
                    initializer: initializer.unwrap(),
                    line,
                })
            }
            Rule::assignment | Rule::assign_no_semi => {
                let mut inner = pair.into_inner();
                let target = self.parse_assign_target(inner.next().unwrap())?;
                let value = self.parse_expression(inner.next().unwrap());
                Ok(Statement::Assignment { target, value, line })
            }
            Rule::expression_statement => {
                let expression = self.parse_expression(pair.into_inner().next().unwrap());
                Ok(Statement::ExpressionStatement { expression, line })
            }
            Rule::print_statement => {
                let expression = self.parse_expression(pair.into_inner().next().unwrap());
                Ok(Statement::Print { expression, line })
            }
            Rule::if_statement => {
                let mut inner = pair.into_inner();
                let condition = self.parse_expression(inner.next().unwrap());
                let then_body = self.parse_block(inner.next().unwrap())?;
                let else_body = match inner.next() {
                    Some(block) => Some(self.parse_block(block)?),
                    None => None,
                };
                Ok(Statement::If { condition, then_body, else_body, line })
            }
            Rule::while_statement => {
                let mut inner = pair.into_inner();
                let condition = self.parse_expression(inner.next().unwrap());
                let body = self.parse_block(inner.next().unwrap())?;
                Ok(Statement::While { condition, body, line })
            }
            Rule::do_while_statement => {
                let mut inner = pair.into_inner();
                let body = self.parse_block(inner.next().unwrap())?;
                let condition = self.parse_expression(inner.next().unwrap());
                Ok(Statement::DoWhile { body, condition, line })
            }
            Rule::for_statement => {
                let mut init = None;
                let mut condition = None;
                let mut update = None;
                let mut body = vec![];
                for pair in pair.into_inner() {
                    match pair.as_rule() {
                        Rule::for_init => {
                            if let Some(pair) = pair.into_inner().next() {
                                init = Some(Box::new(self.parse_statement(pair)?));
                            }
                        }
                        Rule::for_update => {
                            let pair = pair.into_inner().next().unwrap();
                            update = Some(Box::new(match pair.as_rule() {
                                Rule::assign_no_semi => self.parse_statement(pair)?,
                                _ => {
                                    let update_line = Self::line(&pair);
                                    Statement::ExpressionStatement {
                                        expression: self.parse_expression(pair),
                                        line: update_line,
                                    }
                                }
                            }));
                        }
                        Rule::block => body = self.parse_block(pair)?,
                        _ => condition = Some(self.parse_expression(pair)),
                    }
                }
                Ok(Statement::For { init, condition, update, body, line })
            }
            Rule::foreach_statement => {
                let mut inner = pair.into_inner();
                let binding = String::from(inner.next().unwrap().as_str());
                let iterable = self.parse_expression(inner.next().unwrap());
                let body = self.parse_block(inner.next().unwrap())?;
                Ok(Statement::Foreach { binding, iterable, body, line })
            }
            Rule::break_statement => Ok(Statement::Break { line }),
            Rule::continue_statement => Ok(Statement::Continue { line }),
            Rule::return_statement => {
                let value = match pair.into_inner().next() {
                    Some(pair) => Some(self.parse_expression(pair)),
                    None => None,
                };
                Ok(Statement::Return { value, line })
            }
            Rule::try_catch_statement => {
                let mut inner = pair.into_inner();
                let try_body = self.parse_block(inner.next().unwrap())?;
                let catch_binding = String::from(inner.next().unwrap().as_str());
                let catch_body = self.parse_block(inner.next().unwrap())?;
                Ok(Statement::TryCatch { try_body, catch_binding, catch_body, line })
            }
            Rule::switch_statement => {
                let mut inner = pair.into_inner();
                let scrutinee = self.parse_expression(inner.next().unwrap());
                let mut cases = vec![];
                let mut default = None;
                for pair in inner {
                    match pair.as_rule() {
                        Rule::switch_case => {
                            let case_line = Self::line(&pair);
                            let mut case_inner = pair.into_inner();
                            let value = self.parse_expression(case_inner.next().unwrap());
                            let mut body = vec![];
                            for statement in case_inner {
                                body.push(self.parse_statement(statement)?);
                            }
                            cases.push(SwitchCase { value, body, line: case_line });
                        }
                        Rule::default_case => {
                            let mut body = vec![];
                            for statement in pair.into_inner() {
                                body.push(self.parse_statement(statement)?);
                            }
                            default = Some(body);
                        }
                        _ => unreachable!(),
                    }
                }
                Ok(Statement::Switch { scrutinee, cases, default, line })
            }
            Rule::function_declaration => {
                let mut inner = pair.into_inner();
                let name = String::from(inner.next().unwrap().as_str());
                let mut parameters = vec![];
                let mut return_type = None;
                let mut body = vec![];
                for pair in inner {
                    match pair.as_rule() {
                        Rule::parameters => {
                            for parameter in pair.into_inner() {
                                parameters.push(self.parse_parameter(parameter));
                            }
                        }
                        Rule::type_spec => return_type = Some(self.parse_type_spec(pair)),
                        Rule::block => body = self.parse_block(pair)?,
                        _ => unreachable!(),
                    }
                }
                Ok(Statement::FunctionDeclaration { name, parameters, return_type, body, line })
            }
            Rule::class_declaration => {
                let mut inner = pair.into_inner();
                let name = String::from(inner.next().unwrap().as_str());
                let mut parent = None;
                let mut members = vec![];
                for pair in inner {
                    match pair.as_rule() {
                        Rule::identifier => parent = Some(String::from(pair.as_str())),
                        _ => members.push(self.parse_statement(pair)?),
                    }
                }
                Ok(Statement::ClassDeclaration { name, parent, members, line })
            }
            Rule::block => {
                let body = self.parse_block(pair)?;
                Ok(Statement::Block { body, line })
            }
            _ => panic!("Whoops! Unprocessed pest rule: {:?}", pair.as_rule()),
        }
    }

    fn parse_block(&self, pair: Pair<Rule>) -> Result<Vec<Statement>, SyntaxError> {
        let mut statements = vec![];
        for pair in pair.into_inner() {
            statements.push(self.parse_statement(pair)?);
        }
        Ok(statements)
    }

    fn parse_parameter(&self, pair: Pair<Rule>) -> Parameter {
        let line = Self::line(&pair);
        let mut inner = pair.into_inner();
        let name = String::from(inner.next().unwrap().as_str());
        let declared_type = inner.next().map(|pair| self.parse_type_spec(pair));
        Parameter { name, declared_type, line }
    }

    fn parse_type_annotation(&self, pair: Pair<Rule>) -> TypeAnnotation {
        self.parse_type_spec(pair.into_inner().next().unwrap())
    }

    fn parse_type_spec(&self, pair: Pair<Rule>) -> TypeAnnotation {
        let mut inner = pair.into_inner();
        let base = String::from(inner.next().unwrap().as_str());
        let rank = inner.filter(|pair| pair.as_rule() == Rule::array_suffix).count();
        TypeAnnotation { base, rank }
    }

    /// Converts the left-hand side of an assignment into a typed target.
    /// The last suffix decides the shape: none means a plain variable, an
    /// index or property suffix selects the slot written. A call suffix in
    /// final position is not assignable.
    fn parse_assign_target(&self, pair: Pair<Rule>) -> Result<AssignTarget, SyntaxError> {
        let line = Self::line(&pair);
        let mut inner: Vec<Pair<Rule>> = pair.into_inner().collect();

        if inner.len() == 1 {
            let primary = inner.remove(0);
            return match primary.as_rule() {
                Rule::identifier => Ok(AssignTarget::Variable {
                    name: String::from(primary.as_str()),
                }),
                _ => Err(SyntaxError {
                    line,
                    message: String::from("El objetivo de una asignación debe ser una variable, un índice o una propiedad"),
                }),
            };
        }

        let last = inner.pop().unwrap();
        let mut base = self.parse_primary(inner.remove(0));
        for suffix in inner {
            base = self.apply_suffix(base, suffix);
        }

        match last.as_rule() {
            Rule::index_suffix => {
                let index = self.parse_expression(last.into_inner().next().unwrap());
                Ok(AssignTarget::Index {
                    array: Box::new(base),
                    index: Box::new(index),
                })
            }
            Rule::property_suffix => Ok(AssignTarget::Property {
                object: Box::new(base),
                property: String::from(last.into_inner().next().unwrap().as_str()),
            }),
            _ => Err(SyntaxError {
                line,
                message: String::from("El objetivo de una asignación debe ser una variable, un índice o una propiedad"),
            }),
        }
    }

    fn parse_expression(&self, pair: Pair<Rule>) -> Expression {
        match pair.as_rule() {
            Rule::logical_or
            | Rule::logical_and
            | Rule::equality
            | Rule::comparison
            | Rule::term
            | Rule::factor => self.parse_binary_chain(pair),
            Rule::unary => self.parse_unary(pair),
            Rule::postfix | Rule::left_hand_side => self.parse_postfix(pair),
            Rule::paren_expression => self.parse_expression(pair.into_inner().next().unwrap()),
            _ => self.parse_primary(pair),
        }
    }

    /// Converts a linear chain of equal-precedence binary operations into a
    /// left-leaning tree, so `a - b - c` folds as `(a - b) - c`.
    fn parse_binary_chain(&self, pair: Pair<Rule>) -> Expression {
        let line = Self::line(&pair);
        let mut inner = pair.into_inner();

        let mut lhs = self.parse_expression(inner.next().unwrap());
        while let Some(op) = inner.next() {
            let op = Self::parse_binary_op(op.as_str());
            let rhs = self.parse_expression(inner.next().unwrap());
            lhs = Expression::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                line,
            };
        }
        lhs
    }

    fn parse_binary_op(op: &str) -> BinaryOperation {
        match op {
            "+" => BinaryOperation::ADD,
            "-" => BinaryOperation::SUB,
            "*" => BinaryOperation::MUL,
            "/" => BinaryOperation::DIV,
            "%" => BinaryOperation::MOD,
            "<" => BinaryOperation::LESS_THAN,
            "<=" => BinaryOperation::LESS_EQUAL,
            ">" => BinaryOperation::GREATER_THAN,
            ">=" => BinaryOperation::GREATER_EQUAL,
            "==" => BinaryOperation::EQUAL,
            "!=" => BinaryOperation::NOT_EQUAL,
            "&&" => BinaryOperation::AND,
            "||" => BinaryOperation::OR,
            _ => panic!("Whoops! Unprocessed binary operator: {}", op),
        }
    }

    fn parse_unary(&self, pair: Pair<Rule>) -> Expression {
        let line = Self::line(&pair);
        let mut inner = pair.into_inner();
        let first = inner.next().unwrap();

        match first.as_rule() {
            Rule::unary_op => {
                let op = match first.as_str() {
                    "!" => UnaryOperation::NOT,
                    "-" => UnaryOperation::NEGATE,
                    "+" => UnaryOperation::PLUS,
                    other => panic!("Whoops! Unprocessed unary operator: {}", other),
                };
                let operand = self.parse_expression(inner.next().unwrap());
                Expression::Unary { op, operand: Box::new(operand), line }
            }
            _ => self.parse_expression(first),
        }
    }

    fn parse_postfix(&self, pair: Pair<Rule>) -> Expression {
        let mut inner = pair.into_inner();
        let mut base = self.parse_primary(inner.next().unwrap());
        for suffix in inner {
            base = self.apply_suffix(base, suffix);
        }
        base
    }

    fn apply_suffix(&self, base: Expression, suffix: Pair<Rule>) -> Expression {
        let line = Self::line(&suffix);
        match suffix.as_rule() {
            Rule::call_suffix => {
                let arguments = match suffix.into_inner().next() {
                    Some(arguments) => arguments
                        .into_inner()
                        .map(|pair| self.parse_expression(pair))
                        .collect(),
                    None => vec![],
                };
                Expression::Call { callee: Box::new(base), arguments, line }
            }
            Rule::index_suffix => {
                let index = self.parse_expression(suffix.into_inner().next().unwrap());
                Expression::Index { base: Box::new(base), index: Box::new(index), line }
            }
            Rule::property_suffix => {
                let property = String::from(suffix.into_inner().next().unwrap().as_str());
                Expression::Property { base: Box::new(base), property, line }
            }
            _ => panic!("Whoops! Unprocessed suffix rule: {:?}", suffix.as_rule()),
        }
    }

    fn parse_primary(&self, pair: Pair<Rule>) -> Expression {
        let line = Self::line(&pair);
        match pair.as_rule() {
            Rule::integer => Expression::Literal {
                value: Literal::INTEGER(pair.as_str().parse().unwrap()),
                line,
            },
            Rule::boolean => Expression::Literal {
                value: Literal::BOOL(pair.as_str() == "true"),
                line,
            },
            Rule::string => {
                let text = pair.as_str();
                Expression::Literal {
                    value: Literal::STRING(String::from(&text[1..text.len() - 1])),
                    line,
                }
            }
            Rule::null => Expression::Literal { value: Literal::NULL, line },
            Rule::identifier => Expression::Identifier {
                name: String::from(pair.as_str()),
                line,
            },
            Rule::this_expression => Expression::This { line },
            Rule::array_literal => Expression::ArrayLiteral {
                items: pair.into_inner().map(|pair| self.parse_expression(pair)).collect(),
                line,
            },
            Rule::new_expression => {
                let mut inner = pair.into_inner();
                let class = String::from(inner.next().unwrap().as_str());
                let arguments = match inner.next() {
                    Some(arguments) => arguments
                        .into_inner()
                        .map(|pair| self.parse_expression(pair))
                        .collect(),
                    None => vec![],
                };
                Expression::New { class, arguments, line }
            }
            Rule::paren_expression => self.parse_expression(pair.into_inner().next().unwrap()),
            _ => self.parse_expression(pair),
        }
    }
}

/// AstParser Trait Concrete Implementation
impl AstParser for PestCompiscriptParser {
    fn default() -> Self {
        Self
    }

    fn parse(&self, source: &str) -> Result<Program, SyntaxError> {
        self.parse_into_program(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        PestCompiscriptParser::default().parse(source).unwrap()
    }

    fn parse_single(source: &str) -> Statement {
        let mut program = parse(source);
        assert_eq!(program.statements.len(), 1);
        program.statements.remove(0)
    }

    #[test]
    fn test_parse_variable_declaration() {
        let statement = parse_single("let x: integer = 4;");
        match statement {
            Statement::VariableDeclaration { name, declared_type, initializer, line } => {
                assert_eq!(name, "x");
                let annotation = declared_type.unwrap();
                assert_eq!(annotation.base, "integer");
                assert_eq!(annotation.rank, 0);
                assert!(matches!(initializer,
                    Some(Expression::Literal { value: Literal::INTEGER(4), .. })));
                assert_eq!(line, 1);
            }
            other => panic!("Expected variable declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_array_type_rank() {
        let statement = parse_single("let m: integer[][] = [[1], [2]];");
        match statement {
            Statement::VariableDeclaration { declared_type, .. } => {
                assert_eq!(declared_type.unwrap().rank, 2);
            }
            other => panic!("Expected variable declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_binary_chain_folds_left() {
        let statement = parse_single("let x: integer = 1 - 2 - 3;");
        let initializer = match statement {
            Statement::VariableDeclaration { initializer, .. } => initializer.unwrap(),
            other => panic!("Expected variable declaration, got {:?}", other),
        };
        // (1 - 2) - 3
        match initializer {
            Expression::Binary { op: BinaryOperation::SUB, lhs, rhs, .. } => {
                assert!(matches!(*rhs, Expression::Literal { value: Literal::INTEGER(3), .. }));
                assert!(matches!(*lhs, Expression::Binary { op: BinaryOperation::SUB, .. }));
            }
            other => panic!("Expected binary expression, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence_mul_binds_tighter_than_add() {
        let statement = parse_single("let x: integer = 1 + 2 * 3;");
        let initializer = match statement {
            Statement::VariableDeclaration { initializer, .. } => initializer.unwrap(),
            other => panic!("Expected variable declaration, got {:?}", other),
        };
        match initializer {
            Expression::Binary { op: BinaryOperation::ADD, rhs, .. } => {
                assert!(matches!(*rhs, Expression::Binary { op: BinaryOperation::MUL, .. }));
            }
            other => panic!("Expected addition at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_assignment_targets() {
        match parse_single("x = 1;") {
            Statement::Assignment { target: AssignTarget::Variable { name }, .. } => {
                assert_eq!(name, "x");
            }
            other => panic!("Expected variable assignment, got {:?}", other),
        }
        match parse_single("arr[0] = 10;") {
            Statement::Assignment { target: AssignTarget::Index { .. }, .. } => {}
            other => panic!("Expected indexed assignment, got {:?}", other),
        }
        match parse_single("this.name = n;") {
            Statement::Assignment { target: AssignTarget::Property { property, .. }, .. } => {
                assert_eq!(property, "name");
            }
            other => panic!("Expected property assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_call_is_not_an_assignment_target() {
        let result = PestCompiscriptParser::default().parse("f() = 1;");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_method_call_chain() {
        match parse_single("let x: integer = dog.speak(1)[0];") {
            Statement::VariableDeclaration { initializer, .. } => match initializer.unwrap() {
                Expression::Index { base, .. } => match *base {
                    Expression::Call { callee, arguments, .. } => {
                        assert_eq!(arguments.len(), 1);
                        assert!(matches!(*callee, Expression::Property { .. }));
                    }
                    other => panic!("Expected call, got {:?}", other),
                },
                other => panic!("Expected index, got {:?}", other),
            },
            other => panic!("Expected variable declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_function_declaration() {
        let source = "function add(a: integer, b: integer): integer { return a + b; }";
        match parse_single(source) {
            Statement::FunctionDeclaration { name, parameters, return_type, body, .. } => {
                assert_eq!(name, "add");
                assert_eq!(parameters.len(), 2);
                assert_eq!(parameters[0].name, "a");
                assert_eq!(return_type.unwrap().base, "integer");
                assert_eq!(body.len(), 1);
            }
            other => panic!("Expected function declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_class_with_inheritance() {
        let source = "class Dog : Animal { let name: string; function constructor(n: string) { this.name = n; } }";
        match parse_single(source) {
            Statement::ClassDeclaration { name, parent, members, .. } => {
                assert_eq!(name, "Dog");
                assert_eq!(parent, Some(String::from("Animal")));
                assert_eq!(members.len(), 2);
            }
            other => panic!("Expected class declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_for_with_declaration_init() {
        let source = "for (let i: integer = 0; i < 3; i = i + 1) { print(i); }";
        match parse_single(source) {
            Statement::For { init, condition, update, body, .. } => {
                assert!(matches!(*init.unwrap(), Statement::VariableDeclaration { .. }));
                assert!(condition.is_some());
                assert!(matches!(*update.unwrap(), Statement::Assignment { .. }));
                assert_eq!(body.len(), 1);
            }
            other => panic!("Expected for statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_switch_cases_and_default() {
        let source = "switch (x) { case 1: { let a: integer = 10; } case 2: { let b: integer = 20; } default: { let c: integer = 30; } }";
        match parse_single(source) {
            Statement::Switch { cases, default, .. } => {
                assert_eq!(cases.len(), 2);
                assert!(default.is_some());
            }
            other => panic!("Expected switch statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_try_catch_binding() {
        let source = "try { risky(); } catch (err) { print(err); }";
        match parse_single(source) {
            Statement::TryCatch { catch_binding, .. } => assert_eq!(catch_binding, "err"),
            other => panic!("Expected try/catch, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_foreach() {
        let source = "foreach (elem in arr) { sum = sum + elem; }";
        match parse_single(source) {
            Statement::Foreach { binding, iterable, .. } => {
                assert_eq!(binding, "elem");
                assert_eq!(iterable.identifier_name(), Some("arr"));
            }
            other => panic!("Expected foreach, got {:?}", other),
        }
    }

    #[test]
    fn test_line_numbers_span_statements() {
        let program = parse("let a: integer = 1;\nlet b: integer = 2;\n\nlet c: integer = 3;\n");
        let lines: Vec<usize> = program.statements.iter().map(|s| s.line()).collect();
        assert_eq!(lines, vec![1, 2, 4]);
    }

    #[test]
    fn test_syntax_error_carries_line() {
        let result = PestCompiscriptParser::default().parse("let x: integer = ;\n");
        let error = result.unwrap_err();
        assert_eq!(error.line, 1);
    }

    #[test]
    fn test_parse_new_and_this() {
        let source = "let d: Dog = new Dog(\"Fido\");";
        match parse_single(source) {
            Statement::VariableDeclaration { initializer, .. } => match initializer.unwrap() {
                Expression::New { class, arguments, .. } => {
                    assert_eq!(class, "Dog");
                    assert_eq!(arguments.len(), 1);
                }
                other => panic!("Expected new expression, got {:?}", other),
            },
            other => panic!("Expected variable declaration, got {:?}", other),
        }
    }
}
