use compiscript_compiler::{
    CompileError,
    Compiler,
    CompilerOutput,
    CompiscriptMipsGenerator,
    CompiscriptSemanticAnalyser,
    CompiscriptTacGenerator,
    PestCompiscriptParser,
};
use compiscript_compiler::compiler::semantic_analyser::SemanticErrorKind;
use compiscript_common::{TacListingParser, TacTextParser};

type TestCompiler = Compiler<
    PestCompiscriptParser,
    CompiscriptSemanticAnalyser,
    CompiscriptTacGenerator,
    CompiscriptMipsGenerator,
>;

fn compile(source: &str) -> CompilerOutput {
    TestCompiler::default().compile_str(source).unwrap()
}

fn compile_err(source: &str) -> CompileError {
    TestCompiler::default().compile_str(source).unwrap_err()
}

fn pretty_lines(output: &CompilerOutput) -> Vec<String> {
    output.tac.quadruples().iter().map(|quad| quad.pretty()).collect()
}

#[test]
fn scenario_arithmetic_folding() {
    let output = compile("let x: integer = (1+3)-(4*(5/2));");
    assert_eq!(pretty_lines(&output), vec![
        "t1 = 1 + 3",
        "t2 = 5 / 2",
        "t3 = 4 * t2",
        "t4 = t1 - t3",
        "x = t4",
    ]);
}

#[test]
fn scenario_strict_or_chain() {
    let output = compile("let b: boolean = 1==2 || 2==1 || 1<3;");
    assert_eq!(pretty_lines(&output), vec![
        "t1 = 1 == 2",
        "t2 = 2 == 1",
        "t3 = t1 || t2",
        "t4 = 1 < 3",
        "t5 = t3 || t4",
        "b = t5",
    ]);
}

#[test]
fn scenario_array_indexed_write() {
    let output = compile("let arr: integer[] = [1,2,3];\narr[0] = 10;");
    assert_eq!(pretty_lines(&output), vec![
        "t1 = alloc 3",
        "t1[0] = 1",
        "t1[1] = 2",
        "t1[2] = 3",
        "arr = t1",
        "arr[0] = 10",
    ]);
}

#[test]
fn scenario_if_else() {
    let output = compile("if (1<2) { let a: integer = 1; } else { let b: integer = 2; }");
    assert_eq!(pretty_lines(&output), vec![
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
fn scenario_function_call_with_block_grouping() {
    let source = "function add(a: integer, b: integer): integer { return a + b; }\nlet c: integer = add(1, 2);";
    let output = compile(source);
    let grouped = output.tac.group_by_blocks();
    let lines: Vec<String> = grouped.quadruples().iter().map(|quad| quad.pretty()).collect();
    assert_eq!(lines, vec![
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
fn scenario_heterogeneous_array_reports_and_keeps_symbol() {
    match compile_err("let h: integer[] = [1, \"x\"];") {
        CompileError::Semantic { symbol_table, errors } => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].line, 1);
            assert_eq!(errors[0].kind, SemanticErrorKind::HeterogeneousArray);
            assert!(errors[0].to_string().starts_with("ERROR L1: "));

            // The symbol is still inserted with the declared base and rank
            let dump = symbol_table.to_string();
            assert!(dump.contains("- h:"));
            assert!(dump.contains("Tipo: integer[]"));
        }
        other => panic!("Expected semantic failure, got {:?}", other.to_string()),
    }
}

#[test]
fn semantic_errors_stop_before_tac() {
    let result = TestCompiler::default().compile_str("let x: integer = true;");
    assert!(matches!(result, Err(CompileError::Semantic { .. })));
}

#[test]
fn syntax_errors_surface_with_line() {
    match compile_err("let x: integer = ;") {
        CompileError::Syntax(error) => assert_eq!(error.line, 1),
        other => panic!("Expected syntax failure, got {:?}", other.to_string()),
    }
}

#[test]
fn full_program_compiles_end_to_end() {
    // The classic exercise program: declarations, control flow, arrays,
    // functions and a foreach, all in one source file.
    let source = r#"
let hola: integer = (1+3)-(4*(5/2));
let adios: boolean = 1 < 2;
let hello: boolean = 1 == 2 || 2 == 1 || 1 < 3;

if (1 < 2) {
    let hoo: integer = 1;
} else {
    let mario: integer = 2;
}

let hi: integer = 1;
adios = true;

let x: integer = 2;
switch (x) {
    case 1: { let a: integer = 10; }
    case 2: { let b: integer = 20; }
    default: { let c: integer = 30; }
}

for (let i: integer = 0; i < 3; i = i + 1) {
    let y: integer = i;
}

let arr: integer[] = [1, 2, 3];
let v: integer = arr[1];
arr[0] = 10;

let sum: integer = 0;
foreach (elem in arr) {
    sum = sum + elem;
}

let j: integer = 0;
do {
    j = j + 1;
} while (j < 2);

function add(a: integer, b: integer): integer {
    return a + b;
}
let total: integer = add(hi, x);
print(total);
"#;
    let output = compile(source);

    // The listing renders in both modes with the fixed header
    let raw = output.tac.clone().to_string();
    assert!(raw.starts_with("=== CÓDIGO INTERMEDIO (TAC / Cuádruplos) ==="));
    let pretty = output.tac.clone().pretty().to_string();
    assert!(pretty.contains("total = t1"));

    // Assembly has both sections, the entry point and the exit syscall
    let assembly = output.assembly.to_string();
    assert!(assembly.contains(".data"));
    assert!(assembly.contains("hola: .word 0"));
    assert!(assembly.contains(".text"));
    assert!(assembly.contains("_start:"));
    assert!(assembly.contains("jal add"));
    assert!(assembly.contains("li $v0, 10"));

    // Frame sizes were recorded for the declared function
    assert!(output.frame_sizes.contains_key("function_add"));
}

#[test]
fn block_grouping_places_global_prefix_first() {
    let source = "let a: integer = 1;\nfunction f() { print(1); }\nlet b: integer = 2;";
    let output = compile(source);
    let grouped = output.tac.group_by_blocks();
    let lines: Vec<String> = grouped.quadruples().iter().map(|quad| quad.pretty()).collect();

    let func_at = lines.iter().position(|line| line.starts_with("func f")).unwrap();
    let a_at = lines.iter().position(|line| line == "a = 1").unwrap();
    let b_at = lines.iter().position(|line| line == "b = 2").unwrap();
    assert!(a_at < b_at && b_at < func_at);
}

#[test]
fn compilation_is_deterministic() {
    let source = "let x: integer = 1;\nwhile (x < 5) { x = x + 1; }\nprint(x);";
    let first = compile(source);
    let second = compile(source);

    assert_eq!(first.tac, second.tac);
    assert_eq!(first.symbol_table, second.symbol_table);
    assert_eq!(first.assembly, second.assembly);
    assert_eq!(first.frame_sizes, second.frame_sizes);
}

#[test]
fn raw_listing_round_trips_through_the_text_parser() {
    let source = "let x: integer = 1 + 2;\nif (x == 3) { print(x); }";
    let output = compile(source);

    let listing = output.tac.to_string();
    let reparsed = TacTextParser::new().parse_str(&listing).unwrap();
    assert_eq!(reparsed, output.tac);
}
