use std::collections::HashMap;
use std::fmt;

use compiscript_common::{Operand, Quadruple, TacOp, TacProgram};

use super::BackEndGenerator;
use super::register_allocator::RegisterAllocator;
use super::super::ast::{ScopeId, SymbolKind, SymbolTable};
use super::super::tac_generator::FrameSizes;

/// The generated assembly listing: a `.data` section of globals and string
/// constants followed by a `.text` section entered at `_start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MipsAssembly {
    pub data: Vec<String>,
    pub text: Vec<String>,
}

impl fmt::Display for MipsAssembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, ".data")?;
        for line in &self.data {
            writeln!(f, "{}", line)?;
        }
        writeln!(f, ".text")?;
        for line in &self.text {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// CompiscriptMipsGenerator is a concrete BackEndGenerator.
/// It walks the block-grouped quadruples once, expanding each into one or
/// more MIPS instructions under the calling convention: arguments 0..3 in
/// $a0..$a3 and the rest on the stack, return value in $v0, a fixed fp/ra
/// save area extended by the locals of the frame.
///
/// Object and array memory operations have no lowering; they surface as
/// `# op no manejada` comments in the listing.
pub struct CompiscriptMipsGenerator {
    registers: RegisterAllocator,
    data_section: Vec<String>,
    text_section: Vec<String>,

    current_function: Option<String>,
    current_scope: ScopeId,
    current_frame: u32,
    in_func_header: bool,
    param_registers: HashMap<String, String>,
    param_stack_offsets: HashMap<String, i64>,
    pending_args: Vec<String>,
    string_counter: u32,
}

impl CompiscriptMipsGenerator {
    fn emit_text<S: Into<String>>(&mut self, line: S) {
        self.text_section.push(line.into());
    }

    fn emit_data<S: Into<String>>(&mut self, line: S) {
        self.data_section.push(line.into());
    }

    /// Function scopes hang off the global scope, or off a class scope for
    /// methods; search the whole tree for the canonical key.
    fn find_function_scope(symbols: &SymbolTable, key: &str) -> Option<ScopeId> {
        symbols.subtree(ScopeId::global())
            .into_iter()
            .find(|id| symbols.scope(*id).name() == key)
    }

    // ------------------------------------------------------------------
    // Operand load/store discipline
    // ------------------------------------------------------------------

    /// Materialise an operand: literals load immediates, string literals
    /// mint a `.data` label (returned instead of a register), temporaries
    /// use their bound register, names resolve through the symbol table.
    fn load_operand(&mut self, operand: &Operand, symbols: &SymbolTable) -> String {
        match operand {
            Operand::Integer(value) => {
                let reg = self.registers.get_reg_for(&format!("const_{}", value));
                self.emit_text(format!("li {}, {}", reg, value));
                String::from(reg)
            }
            Operand::Boolean(value) => {
                let reg = self.registers.get_reg_for(&format!("const_{}", value));
                self.emit_text(format!("li {}, {}", reg, *value as i32));
                String::from(reg)
            }
            Operand::Null => {
                let reg = self.registers.get_reg_for("const_null");
                self.emit_text(format!("li {}, 0", reg));
                String::from(reg)
            }
            Operand::Count(value) => {
                let reg = self.registers.get_reg_for(&format!("const_{}", value));
                self.emit_text(format!("li {}, {}", reg, value));
                String::from(reg)
            }
            Operand::Temporary(_) => {
                String::from(self.registers.get_reg_for(&operand.to_string()))
            }
            Operand::Text(text) => {
                let label = format!("str_{}", self.string_counter);
                self.string_counter += 1;
                self.emit_data(format!("{}: .asciiz \"{}\"", label, text));
                label
            }
            Operand::Label(name) => name.clone(),
            Operand::Name(name) => {
                let name = name.clone();
                self.load_name(&name, symbols)
            }
            Operand::Member { .. } | Operand::Indexed { .. } => {
                let content = operand.to_string();
                let reg = String::from(self.registers.get_reg_for(&content));
                self.emit_text(format!("# WARN: operando {} sin dirección, sólo en registro {}", content, reg));
                reg
            }
        }
    }

    fn load_name(&mut self, name: &str, symbols: &SymbolTable) -> String {
        if self.current_function.is_some() {
            if let Some(reg) = self.param_registers.get(name) {
                return reg.clone();
            }
            if let Some(offset) = self.param_stack_offsets.get(name).copied() {
                let reg = String::from(self.registers.get_reg_for(name));
                self.emit_text(format!("lw {}, {}($sp)", reg, offset));
                return reg;
            }
        }

        match symbols.find_symbol_scope(self.current_scope, name) {
            Some(scope) if scope == ScopeId::global() => {
                let reg = String::from(self.registers.get_reg_for(name));
                self.emit_text(format!("lw {}, {}", reg, name));
                reg
            }
            Some(scope) => {
                let address = symbols.lookup_local(scope, name)
                    .map(|symbol| symbol.address)
                    .unwrap_or(0);
                let reg = String::from(self.registers.get_reg_for(name));
                if address != 0 {
                    self.emit_text(format!("lw {}, {}($fp)", reg, address));
                } else {
                    self.emit_text(format!("# WARN: variable {} usada sólo en registro {}", name, reg));
                }
                reg
            }
            None => {
                let reg = String::from(self.registers.get_reg_for(name));
                self.emit_text(format!("# WARN: variable {} usada sólo en registro {}", name, reg));
                reg
            }
        }
    }

    fn store_operand(&mut self, operand: &Operand, reg: &str, symbols: &SymbolTable) {
        match operand {
            Operand::Temporary(_) => {
                self.registers.bind(reg, &operand.to_string());
            }
            Operand::Name(name) => {
                let name = name.clone();
                self.store_name(&name, reg, symbols);
            }
            other => {
                self.emit_text(format!("# op no manejada: escritura en {}", other));
            }
        }
    }

    fn store_name(&mut self, name: &str, reg: &str, symbols: &SymbolTable) {
        if self.current_function.is_some() {
            if let Some(target) = self.param_registers.get(name).cloned() {
                if target != reg {
                    self.emit_text(format!("move {}, {}", target, reg));
                }
                return;
            }
            if let Some(offset) = self.param_stack_offsets.get(name).copied() {
                self.emit_text(format!("sw {}, {}($sp)", reg, offset));
                return;
            }
        }

        match symbols.find_symbol_scope(self.current_scope, name) {
            Some(scope) if scope == ScopeId::global() => {
                self.emit_text(format!("sw {}, {}", reg, name));
            }
            Some(scope) => {
                let address = symbols.lookup_local(scope, name)
                    .map(|symbol| symbol.address)
                    .unwrap_or(0);
                if address != 0 {
                    self.emit_text(format!("sw {}, {}($fp)", reg, address));
                } else {
                    let fixed = String::from(self.registers.get_reg_for(name));
                    if fixed != reg {
                        self.emit_text(format!("move {}, {}", fixed, reg));
                    }
                    self.emit_text(format!("# WARN: variable {} sólo en registro {} (no se guarda en memoria)", name, fixed));
                }
            }
            None => {
                let fixed = String::from(self.registers.get_reg_for(name));
                if fixed != reg {
                    self.emit_text(format!("move {}, {}", fixed, reg));
                }
                self.emit_text(format!("# WARN: variable {} sólo en registro {} (no se guarda en memoria)", name, fixed));
            }
        }
    }

    /// Move the pending argument registers into place: $a0..$a3 first, the
    /// rest into their stack slots above $sp.
    fn flush_args(&mut self) {
        let pending = std::mem::take(&mut self.pending_args);
        for (index, reg) in pending.iter().enumerate() {
            if index < 4 {
                self.emit_text(format!("move $a{}, {}", index, reg));
            } else {
                self.emit_text(format!("sw {}, {}($sp)", reg, 4 + 4 * (index as i64 - 4)));
            }
        }
    }

    fn emit_epilogue(&mut self) {
        let frame = self.current_frame.max(8);
        self.emit_text("lw $fp, 0($sp)");
        self.emit_text("lw $ra, 4($sp)");
        self.emit_text(format!("addi $sp, $sp, {}", frame));
        self.emit_text("jr $ra");
    }

    // ------------------------------------------------------------------
    // Quadruple expansion
    // ------------------------------------------------------------------

    fn generate_function_entry(&mut self, quad: &Quadruple, symbols: &SymbolTable, frames: &FrameSizes) {
        let name = quad.arg1.as_ref().map(|operand| operand.to_string()).unwrap_or_default();
        let key = format!("function_{}", name);

        self.current_function = Some(name.clone());
        self.in_func_header = true;
        self.param_registers.clear();
        self.param_stack_offsets.clear();
        self.current_scope = Self::find_function_scope(symbols, &key).unwrap_or_else(ScopeId::global);
        self.current_frame = frames.get(&key).copied().unwrap_or(8);

        let frame = self.current_frame.max(8);
        self.emit_text(format!("{}:", name));
        self.emit_text(format!("addi $sp, $sp, -{}", frame));
        self.emit_text("sw $fp, 0($sp)");
        self.emit_text("sw $ra, 4($sp)");
        self.emit_text("move $fp, $sp");
        self.registers.set_spill_base(frame as i64);

        // Map parameters: the first four live in $a registers and are also
        // spilled to their frame slots; the rest stay in the caller's slots.
        let params = symbols.lookup_global(self.current_scope, &name)
            .filter(|symbol| symbol.is_callable())
            .map(|symbol| symbol.params.clone())
            .unwrap_or_default();
        for (index, param) in params.iter().enumerate() {
            if index < 4 {
                let reg = format!("$a{}", index);
                let address = symbols.lookup_local(self.current_scope, &param.name)
                    .map(|symbol| symbol.address)
                    .unwrap_or(0);
                if address != 0 {
                    self.emit_text(format!("sw {}, {}($fp)", reg, address));
                }
                self.param_registers.insert(param.name.clone(), reg);
            } else {
                let offset = frame as i64 + 4 + 4 * (index as i64 - 4);
                self.param_stack_offsets.insert(param.name.clone(), offset);
            }
        }
    }

    fn generate_quadruple(&mut self, quad: &Quadruple, symbols: &SymbolTable, frames: &FrameSizes) {
        if !matches!(quad.op, TacOp::Func | TacOp::Param) {
            self.in_func_header = false;
        }

        match quad.op {
            TacOp::Func => {
                self.generate_function_entry(quad, symbols, frames);
            }
            TacOp::EndFunc => {
                self.emit_text("# endfunc");
                self.emit_epilogue();
                self.current_function = None;
                self.current_scope = ScopeId::global();
                self.current_frame = 8;
                self.in_func_header = false;
                self.param_registers.clear();
                self.param_stack_offsets.clear();
            }
            TacOp::Param => {
                // Formal parameters in the function header carry no code
                if self.in_func_header && self.current_function.is_some() {
                    return;
                }
                let reg = self.load_operand(quad.arg1.as_ref().unwrap(), symbols);
                self.pending_args.push(reg);
            }
            TacOp::Assign => {
                let reg = self.load_operand(quad.arg1.as_ref().unwrap(), symbols);
                self.store_operand(quad.result.as_ref().unwrap(), &reg, symbols);
            }
            TacOp::Add | TacOp::Sub | TacOp::Mul | TacOp::Div | TacOp::Mod
            | TacOp::Lt | TacOp::Le | TacOp::Gt | TacOp::Ge | TacOp::Eq | TacOp::Ne
            | TacOp::And | TacOp::Or => {
                self.generate_binary(quad, symbols);
            }
            TacOp::Not => {
                let operand = self.load_operand(quad.arg1.as_ref().unwrap(), symbols);
                let result = quad.result.as_ref().unwrap();
                let destination = String::from(self.registers.get_reg_for(&result.to_string()));
                self.emit_text(format!("xori {}, {}, 1", destination, operand));
                self.store_operand(result, &destination, symbols);
            }
            TacOp::Neg => {
                let operand = self.load_operand(quad.arg1.as_ref().unwrap(), symbols);
                let result = quad.result.as_ref().unwrap();
                let destination = String::from(self.registers.get_reg_for(&result.to_string()));
                self.emit_text(format!("sub {}, $zero, {}", destination, operand));
                self.store_operand(result, &destination, symbols);
            }
            TacOp::Print => {
                let value = quad.result.as_ref().unwrap();
                if matches!(value, Operand::Text(_)) {
                    let label = self.load_operand(value, symbols);
                    self.emit_text(format!("la $a0, {}", label));
                    self.emit_text("li $v0, 4");
                    self.emit_text("syscall");
                } else {
                    let reg = self.load_operand(value, symbols);
                    self.emit_text(format!("move $a0, {}", reg));
                    self.emit_text("li $v0, 1");
                    self.emit_text("syscall");
                }
                // Trailing newline
                self.emit_text("li $v0, 11");
                self.emit_text("li $a0, 10");
                self.emit_text("syscall");
            }
            TacOp::Label => {
                let label = quad.result.as_ref().unwrap();
                self.emit_text(format!("{}:", label));
            }
            TacOp::If => {
                let condition = self.load_operand(quad.arg1.as_ref().unwrap(), symbols);
                let target = quad.result.as_ref().unwrap();
                self.emit_text(format!("bne {}, $zero, {}", condition, target));
            }
            TacOp::Goto => {
                let target = quad.arg1.as_ref().unwrap();
                self.emit_text(format!("j {}", target));
            }
            TacOp::CallFunc => {
                let name = quad.arg1.as_ref().unwrap().to_string();
                self.flush_args();
                self.emit_text(format!("jal {}", name));
                if let Some(result) = quad.result.clone() {
                    let destination = String::from(self.registers.get_reg_for(&result.to_string()));
                    self.emit_text(format!("move {}, $v0", destination));
                    self.store_operand(&result, &destination, symbols);
                }
            }
            TacOp::Return => {
                if let Some(value) = quad.arg1.clone() {
                    let reg = self.load_operand(&value, symbols);
                    self.emit_text(format!("move $v0, {}", reg));
                }
                self.emit_text("# return epilogue");
                self.emit_epilogue();
            }
            // No lowering for object, array and exception memory operations
            _ => {
                self.emit_text(format!("# op no manejada: {}", quad));
            }
        }
    }

    fn generate_binary(&mut self, quad: &Quadruple, symbols: &SymbolTable) {
        let lhs = self.load_operand(quad.arg1.as_ref().unwrap(), symbols);
        let rhs = self.load_operand(quad.arg2.as_ref().unwrap(), symbols);
        let result = quad.result.as_ref().unwrap();
        let rd = String::from(self.registers.get_reg_for(&result.to_string()));

        match quad.op {
            TacOp::Add => self.emit_text(format!("add {}, {}, {}", rd, lhs, rhs)),
            TacOp::Sub => self.emit_text(format!("sub {}, {}, {}", rd, lhs, rhs)),
            TacOp::Mul => self.emit_text(format!("mul {}, {}, {}", rd, lhs, rhs)),
            TacOp::Div => {
                self.emit_text(format!("div {}, {}", lhs, rhs));
                self.emit_text(format!("mflo {}", rd));
            }
            TacOp::Mod => {
                self.emit_text(format!("div {}, {}", lhs, rhs));
                self.emit_text(format!("mfhi {}", rd));
            }
            TacOp::Lt => self.emit_text(format!("slt {}, {}, {}", rd, lhs, rhs)),
            TacOp::Gt => self.emit_text(format!("slt {}, {}, {}", rd, rhs, lhs)),
            TacOp::Le => {
                self.emit_text(format!("slt {}, {}, {}", rd, rhs, lhs));
                self.emit_text(format!("xori {}, {}, 1", rd, rd));
            }
            TacOp::Ge => {
                self.emit_text(format!("slt {}, {}, {}", rd, lhs, rhs));
                self.emit_text(format!("xori {}, {}, 1", rd, rd));
            }
            TacOp::Eq => {
                self.emit_text(format!("xor {}, {}, {}", rd, lhs, rhs));
                self.emit_text(format!("sltiu {}, {}, 1", rd, rd));
            }
            TacOp::Ne => {
                self.emit_text(format!("xor {}, {}, {}", rd, lhs, rhs));
                self.emit_text(format!("sltu {}, $zero, {}", rd, rd));
            }
            TacOp::And => self.emit_text(format!("and {}, {}, {}", rd, lhs, rhs)),
            TacOp::Or => self.emit_text(format!("or {}, {}, {}", rd, lhs, rhs)),
            _ => unreachable!(),
        }

        self.store_operand(result, &rd, symbols);
    }
}

/// BackEndGenerator Trait Concrete Implementation
impl BackEndGenerator for CompiscriptMipsGenerator {
    fn default() -> Self {
        Self {
            registers: RegisterAllocator::new(),
            data_section: vec![],
            text_section: vec![],
            current_function: None,
            current_scope: ScopeId::global(),
            current_frame: 8,
            in_func_header: false,
            param_registers: HashMap::new(),
            param_stack_offsets: HashMap::new(),
            pending_args: vec![],
            string_counter: 0,
        }
    }

    fn generate(mut self, tac: &TacProgram, symbols: &SymbolTable, frames: &FrameSizes) -> MipsAssembly {
        let grouped = tac.group_by_blocks();
        let quads = grouped.quadruples();

        // Globals become words in .data
        let globals: Vec<String> = symbols.scope(ScopeId::global())
            .symbols()
            .filter(|symbol| symbol.kind == SymbolKind::Variable)
            .map(|symbol| symbol.identifier.clone())
            .collect();
        for name in globals {
            self.emit_data(format!("{}: .word 0", name));
        }

        let has_main = quads.iter().any(|quad| {
            quad.op == TacOp::Func
                && matches!(&quad.arg1, Some(Operand::Name(name)) if name == "main")
        });

        self.emit_text(".globl _start");
        self.emit_text("_start:");
        if has_main {
            self.emit_text("jal main");
            self.emit_text("li $v0, 10");
            self.emit_text("syscall");
        } else {
            // No main(): the global prefix runs inline and exits before the
            // first function body.
            self.emit_text("# No main()");
        }

        let mut exit_emitted = false;
        for quad in quads {
            if quad.op == TacOp::Func && !has_main && !exit_emitted {
                self.emit_text("li $v0, 10");
                self.emit_text("syscall");
                exit_emitted = true;
            }
            self.generate_quadruple(quad, symbols, frames);
        }
        if !has_main && !exit_emitted {
            self.emit_text("li $v0, 10");
            self.emit_text("syscall");
        }

        MipsAssembly {
            data: self.data_section,
            text: self.text_section,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parser::{AstParser, PestCompiscriptParser};
    use crate::compiler::semantic_analyser::{CompiscriptSemanticAnalyser, SemanticAnalyser};
    use crate::compiler::tac_generator::{CompiscriptTacGenerator, TacGenerator};

    fn assemble(source: &str) -> MipsAssembly {
        let root = PestCompiscriptParser::default().parse(source).unwrap();
        let analysed = CompiscriptSemanticAnalyser::default().analyse(root);
        assert!(analysed.is_clean(), "{:?}", analysed.diagnostics);
        let mut symbols = analysed.symbol_table;
        let output = CompiscriptTacGenerator::default().generate(&analysed.root, &mut symbols);
        CompiscriptMipsGenerator::default().generate(&output.tac, &symbols, &output.frame_sizes)
    }

    fn text_of(assembly: &MipsAssembly) -> String {
        assembly.text.join("\n")
    }

    #[test]
    fn test_globals_declared_in_data_section() {
        let assembly = assemble("let x: integer = 1;\nlet y: boolean = true;");
        assert!(assembly.data.contains(&String::from("x: .word 0")));
        assert!(assembly.data.contains(&String::from("y: .word 0")));
    }

    #[test]
    fn test_global_program_runs_inline_and_exits() {
        let assembly = assemble("let x: integer = 1 + 2;");
        let text = text_of(&assembly);
        assert!(text.starts_with(".globl _start\n_start:\n# No main()"));
        assert!(text.contains("add $"));
        assert!(text.contains("sw $"));
        assert!(text.contains("li $v0, 10\nsyscall"));
    }

    #[test]
    fn test_main_gets_trampoline() {
        let assembly = assemble("function main() { print(1); }");
        let text = text_of(&assembly);
        let start = text.find("_start:").unwrap();
        let jal = text.find("jal main").unwrap();
        let main_label = text.find("main:").unwrap();
        assert!(start < jal && jal < main_label);
        assert!(text.contains("li $v0, 10"));
    }

    #[test]
    fn test_function_prologue_and_epilogue() {
        let assembly = assemble("function main() { print(1); }");
        let text = text_of(&assembly);
        assert!(text.contains("main:\naddi $sp, $sp, -8\nsw $fp, 0($sp)\nsw $ra, 4($sp)\nmove $fp, $sp"));
        assert!(text.contains("# endfunc\nlw $fp, 0($sp)\nlw $ra, 4($sp)\naddi $sp, $sp, 8\njr $ra"));
    }

    #[test]
    fn test_locals_live_at_frame_offsets() {
        let assembly = assemble("function main() { let a: integer = 7; print(a); }");
        let text = text_of(&assembly);
        // a gets the first slot above the fp/ra save area
        assert!(text.contains("sw $t0, 8($fp)"), "{}", text);
        assert!(text.contains("lw $t1, 8($fp)") || text.contains("lw $t0, 8($fp)"), "{}", text);
        // Frame is 8 + one local slot
        assert!(text.contains("addi $sp, $sp, -12"), "{}", text);
    }

    #[test]
    fn test_parameters_spill_in_prologue_and_read_from_a_registers() {
        let assembly = assemble("function id(a: integer): integer { return a; }\nlet r: integer = id(3);");
        let text = text_of(&assembly);
        assert!(text.contains("sw $a0, 8($fp)"), "{}", text);
        assert!(text.contains("move $v0, $a0"), "{}", text);
    }

    #[test]
    fn test_call_flushes_arguments_and_captures_v0() {
        let assembly = assemble("function add(a: integer, b: integer): integer { return a + b; }\nlet c: integer = add(1, 2);");
        let text = text_of(&assembly);
        assert!(text.contains("move $a0, $"), "{}", text);
        assert!(text.contains("move $a1, $"), "{}", text);
        assert!(text.contains("jal add"), "{}", text);
        assert!(text.contains(", $v0"), "{}", text);
    }

    #[test]
    fn test_division_uses_mflo_and_mod_uses_mfhi() {
        let assembly = assemble("let a: integer = 7 / 2;\nlet b: integer = 7 % 2;");
        let text = text_of(&assembly);
        assert!(text.contains("mflo $"), "{}", text);
        assert!(text.contains("mfhi $"), "{}", text);
    }

    #[test]
    fn test_comparison_expansion() {
        let assembly = assemble("let a: boolean = 1 == 2;\nlet b: boolean = 1 <= 2;\nlet c: boolean = 1 != 2;");
        let text = text_of(&assembly);
        assert!(text.contains("xor $"), "{}", text);
        assert!(text.contains("sltiu $"), "{}", text);
        assert!(text.contains("slt $"), "{}", text);
        assert!(text.contains("xori $"), "{}", text);
        assert!(text.contains("sltu $zero") || text.contains("sltu $"), "{}", text);
    }

    #[test]
    fn test_branching_expansion() {
        let assembly = assemble("let x: integer = 0;\nwhile (x < 3) { x = x + 1; }");
        let text = text_of(&assembly);
        assert!(text.contains("bne $"), "{}", text);
        assert!(text.contains("j L2_start"), "{}", text);
        assert!(text.contains("L2_after:"), "{}", text);
    }

    #[test]
    fn test_print_integer_and_string() {
        let assembly = assemble("print(42);\nprint(\"hola\");");
        let text = text_of(&assembly);
        assert!(assembly.data.contains(&String::from("str_0: .asciiz \"hola\"")));
        assert!(text.contains("li $v0, 1"), "{}", text);
        assert!(text.contains("la $a0, str_0"), "{}", text);
        assert!(text.contains("li $v0, 4"), "{}", text);
        // Newline after each print
        assert!(text.contains("li $v0, 11\nli $a0, 10\nsyscall"), "{}", text);
    }

    #[test]
    fn test_object_operations_surface_as_unhandled_comments() {
        let source = "\
class Dog { function constructor(n: integer) { } }
let d: Dog = new Dog(1);
";
        let assembly = assemble(source);
        let text = text_of(&assembly);
        assert!(text.contains("# op no manejada: (ALLOC_OBJ"), "{}", text);
        assert!(text.contains("# op no manejada: (CALL_CONSTRUCTOR"), "{}", text);
    }

    #[test]
    fn test_display_renders_both_sections() {
        let assembly = assemble("let x: integer = 1;");
        let listing = assembly.to_string();
        let data_at = listing.find(".data").unwrap();
        let text_at = listing.find(".text").unwrap();
        assert!(data_at < text_at);
        assert!(listing.contains("x: .word 0"));
    }
}
