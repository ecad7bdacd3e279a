pub mod ops;
pub mod operand;

pub use self::ops::TacOp;
pub use self::operand::Operand;

use std::fmt;
use std::str::FromStr;
use simple_error::SimpleError;

/// A single three-address instruction in quadruple form.
/// Slots that an operation does not use stay `None` and render as `_`
/// in the raw listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quadruple {
    pub op: TacOp,
    pub arg1: Option<Operand>,
    pub arg2: Option<Operand>,
    pub result: Option<Operand>,
}

impl Quadruple {
    pub fn new(op: TacOp, arg1: Option<Operand>, arg2: Option<Operand>, result: Option<Operand>) -> Self {
        Quadruple { op, arg1, arg2, result }
    }

    fn slot(operand: &Option<Operand>) -> String {
        match operand {
            Some(operand) => operand.to_string(),
            None => String::from("_")
        }
    }

    /// Reconstructs the operator-style line used by the pretty listing mode.
    pub fn pretty(&self) -> String {
        let a1 = Self::slot(&self.arg1);
        let a2 = Self::slot(&self.arg2);
        let res = Self::slot(&self.result);

        if self.op.is_binary() {
            return format!("{} = {} {} {}", res, a1, self.op, a2);
        }
        if self.op.is_unary() {
            let sign = match self.op { TacOp::Not => "!", _ => "-" };
            return format!("{} = {}{}", res, sign, a1);
        }

        match self.op {
            TacOp::Assign => format!("{} = {}", res, a1),
            TacOp::IndexGet => format!("{} = {}[{}]", res, a1, a2),
            TacOp::IndexSet => format!("{}[{}] = {}", res, a2, a1),
            TacOp::Alloc => format!("{} = alloc {}", res, a1),
            TacOp::Label => format!("{}:", res),
            TacOp::If => format!("if {} goto {}", a1, res),
            TacOp::Goto => format!("goto {}", a1),
            TacOp::Func => format!("func {}, n_params={}, ret_type={}", a1, a2, res),
            TacOp::Param => format!("param {}", a1),
            TacOp::EndFunc => String::from("endfunc"),
            TacOp::Return => match &self.arg1 {
                Some(value) => format!("return {}", value),
                None => String::from("return")
            },
            TacOp::CallFunc => match &self.result {
                Some(result) => format!("{} = call {}, {}", result, a1, a2),
                None => format!("call {}, {}", a1, a2)
            },
            TacOp::CallMethod => format!("{} = call {}, {}", res, a1, a2),
            TacOp::AllocObj => format!("{} = new {}", res, a1),
            TacOp::CallConstructor => format!("{} = constructor {}, {}", res, a1, a2),
            TacOp::GetField => format!("{} = {}.{}", res, a1, a2),
            TacOp::SetField => format!("{}.{} = {}", a1, a2, res),
            TacOp::Class => match &self.result {
                Some(parent) => format!("class {} inherits {}", a1, parent),
                None => format!("class {}", a1)
            },
            TacOp::Inherit => format!("inherits {}", a1),
            TacOp::Field => format!("field {}", res),
            TacOp::FieldConst => format!("const field {}", res),
            TacOp::EndClass => format!("endclass {}", res),
            TacOp::Print => format!("print {}", res),
            TacOp::OnException => format!("on_exception goto {}", res),
            TacOp::ExcAssign => format!("{} = catch {}", res, a1),
            // Binary and unary shapes are handled above
            _ => format!("({}, {}, {}, {})", self.op, a1, a2, res)
        }
    }
}

impl fmt::Display for Quadruple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})",
               self.op,
               Self::slot(&self.arg1),
               Self::slot(&self.arg2),
               Self::slot(&self.result))
    }
}

/// Rendering mode for the intermediate listing.
/// Raw prints numbered quadruple tuples, Pretty reconstructs operator lines.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RenderMode {
    Raw,
    Pretty
}

impl FromStr for RenderMode {
    type Err = SimpleError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_lowercase().trim() {
            "raw" => Ok(RenderMode::Raw),
            "pretty" => Ok(RenderMode::Pretty),
            _ => bail!("El modo de listado debe ser 'raw' o 'pretty'")
        }
    }
}

/// TacProgram is the ordered append-only quadruple table.
/// It owns the fresh-temporary counter (reset at statement boundaries by the
/// generator) and the one structural transform the pipeline applies:
/// block grouping, which makes each FUNC..endfunc span contiguous behind the
/// global `main` prefix so the MIPS backend can walk the list linearly.
#[derive(Debug, Clone)]
pub struct TacProgram {
    quadruples: Vec<Quadruple>,
    temp_counter: u32,
    render_mode: RenderMode,
}

impl TacProgram {
    pub const LISTING_HEADER: &'static str = "=== CÓDIGO INTERMEDIO (TAC / Cuádruplos) ===";

    pub fn new() -> Self {
        Self {
            quadruples: vec![],
            temp_counter: 0,
            render_mode: RenderMode::Raw,
        }
    }

    pub fn from_quadruples(quadruples: Vec<Quadruple>) -> Self {
        Self {
            quadruples,
            temp_counter: 0,
            render_mode: RenderMode::Raw,
        }
    }

    /// Append a quadruple. Quadruples are never removed or edited in place.
    pub fn push(&mut self, quad: Quadruple) {
        self.quadruples.push(quad);
    }

    pub fn emit(&mut self, op: TacOp, arg1: Option<Operand>, arg2: Option<Operand>, result: Option<Operand>) {
        self.push(Quadruple::new(op, arg1, arg2, result));
    }

    /// Mint a fresh temporary. The first temporary of a statement is t1.
    pub fn new_temp(&mut self) -> Operand {
        self.temp_counter += 1;
        Operand::Temporary(self.temp_counter)
    }

    /// Reset the temporary counter. Called at the end of each top-level
    /// declaration, function body and control-flow structure; temporaries
    /// never cross function boundaries.
    pub fn reset_temporaries(&mut self) {
        self.temp_counter = 0;
    }

    pub fn quadruples(&self) -> &[Quadruple] {
        &self.quadruples
    }

    pub fn len(&self) -> usize {
        self.quadruples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quadruples.is_empty()
    }

    /// Replaces self with a version that renders in the given listing mode
    pub fn rendered_as(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    /// Replaces self with a pretty-printing version of the listing
    pub fn pretty(self) -> Self {
        self.rendered_as(RenderMode::Pretty)
    }

    /// Reorders the quadruple list so every span between a FUNC and its
    /// matching endfunc is contiguous, the global-scope prefix (the implicit
    /// `main`) comes first, and function bodies follow in declaration order.
    /// Intra-span order is preserved. Nested FUNC spans (class methods) are
    /// extracted into their own spans the same way.
    pub fn group_by_blocks(&self) -> TacProgram {
        let mut main_span: Vec<Quadruple> = vec![];
        let mut function_spans: Vec<Vec<Quadruple>> = vec![];
        let mut active: Vec<usize> = vec![];

        for quad in &self.quadruples {
            match quad.op {
                TacOp::Func => {
                    function_spans.push(vec![quad.clone()]);
                    active.push(function_spans.len() - 1);
                }
                TacOp::EndFunc => {
                    match active.pop() {
                        Some(span) => function_spans[span].push(quad.clone()),
                        None => main_span.push(quad.clone())
                    }
                }
                _ => {
                    match active.last() {
                        Some(&span) => function_spans[span].push(quad.clone()),
                        None => main_span.push(quad.clone())
                    }
                }
            }
        }

        let mut grouped = main_span;
        for span in function_spans {
            grouped.extend(span);
        }

        TacProgram {
            quadruples: grouped,
            temp_counter: self.temp_counter,
            render_mode: self.render_mode,
        }
    }
}

impl PartialEq for TacProgram {
    fn eq(&self, other: &Self) -> bool {
        self.quadruples == other.quadruples
    }
}
impl Eq for TacProgram {}

impl fmt::Display for TacProgram {
    /// Writes the intermediate listing. One quadruple per line below the
    /// fixed header; the render mode selects raw tuples or operator lines.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", Self::LISTING_HEADER)?;

        for (index, quad) in self.quadruples.iter().enumerate() {
            match self.render_mode {
                RenderMode::Raw => writeln!(f, "{:03}: {}", index, quad)?,
                RenderMode::Pretty => writeln!(f, "{}", quad.pretty())?,
            }
        }

        Ok(())
    }
}
