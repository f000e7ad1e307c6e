//! SSA dialect: LLVM-flavoured textual IR
//!
//! Every expression node materialises its result into a `%t<id>` temporary
//! named after the node, variables are separately declared global cells
//! loaded and stored explicitly, and control flow is labeled basic blocks
//! with an explicit branch at every boundary. Text concatenation goes
//! through fixed-capacity malloc scratch buffers with strcpy/strcat, boolean
//! printing selects between the two preallocated constant strings, and
//! speech shells out through system() with the rendered text quoted into
//! the command.

use crate::ast::{BinOp, Kind, Node, NodeKind, Program, UnOp};
use crate::error::{ProsaError, ProsaResult};
use crate::symbols::SymbolTable;
use crate::types::TypeMap;
use std::fmt;

/// Scratch capacities are fixed and unchecked in the generated program.
const RENDER_BYTES: u32 = 32;
const SCRATCH_BYTES: u32 = 256;
const COMMAND_BYTES: u32 = 512;

/// A NUL-terminated constant string in the module
struct CString {
    name: String,
    bytes: Vec<u8>,
}

impl CString {
    fn new(name: impl Into<String>, text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        Self {
            name: name.into(),
            bytes,
        }
    }

    fn decl(&self) -> String {
        format!(
            "{} = private constant [{} x i8] c\"{}\"",
            self.name,
            self.bytes.len(),
            escape_bytes(&self.bytes)
        )
    }

    /// Constant-expression pointer to the first character.
    fn gep(&self) -> String {
        format!(
            "getelementptr inbounds ([{len} x i8], [{len} x i8]* {name}, i32 0, i32 0)",
            len = self.bytes.len(),
            name = self.name
        )
    }
}

fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::new();
    for &byte in bytes {
        if (0x20..0x7f).contains(&byte) && byte != b'"' && byte != b'\\' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("\\{:02X}", byte));
        }
    }
    out
}

/// The fixed constant strings every module carries
struct Consts {
    fmt_out: CString,
    fmt_str: CString,
    fmt_in: CString,
    true_str: CString,
    false_str: CString,
    say_open: CString,
    say_close: CString,
}

impl Consts {
    fn new() -> Self {
        Self {
            fmt_out: CString::new("@.fmt_out", "%d\n"),
            fmt_str: CString::new("@.fmt_str", "%s\n"),
            fmt_in: CString::new("@.fmt_in", "%d"),
            true_str: CString::new("@.true_str", "true"),
            false_str: CString::new("@.false_str", "false"),
            say_open: CString::new("@.say_open", "espeak \""),
            say_close: CString::new("@.say_close", "\""),
        }
    }

    fn all(&self) -> [&CString; 7] {
        [
            &self.fmt_out,
            &self.fmt_str,
            &self.fmt_in,
            &self.true_str,
            &self.false_str,
            &self.say_open,
            &self.say_close,
        ]
    }
}

fn ir_type(kind: Kind) -> &'static str {
    match kind {
        Kind::Int => "i32",
        Kind::Bool => "i1",
        Kind::Str => "i8*",
    }
}

fn cell_init(kind: Kind) -> &'static str {
    match kind {
        Kind::Int => "0",
        Kind::Bool => "false",
        Kind::Str => "null",
    }
}

/// Assembled module text: constants, cells, externals and one entry function
struct IrModule {
    constants: Vec<String>,
    globals: Vec<String>,
    body: Vec<String>,
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.constants {
            writeln!(f, "{}", line)?;
        }
        writeln!(f)?;
        for line in &self.globals {
            writeln!(f, "{}", line)?;
        }
        writeln!(f)?;
        writeln!(f, "declare i32 @printf(i8*, ...)")?;
        writeln!(f, "declare i32 @scanf(i8*, ...)")?;
        writeln!(f, "declare i32 @sprintf(i8*, i8*, ...)")?;
        writeln!(f, "declare i8* @malloc(i32)")?;
        writeln!(f, "declare i8* @strcpy(i8*, i8*)")?;
        writeln!(f, "declare i8* @strcat(i8*, i8*)")?;
        writeln!(f, "declare i32 @system(i8*)")?;
        writeln!(f)?;
        writeln!(f, "define i32 @main() {{")?;
        writeln!(f, "entry:")?;
        for line in &self.body {
            if line.ends_with(':') {
                writeln!(f, "{}", line)?;
            } else {
                writeln!(f, "  {}", line)?;
            }
        }
        writeln!(f, "  ret i32 0")?;
        writeln!(f, "}}")
    }
}

/// Lower a checked unit into the SSA dialect.
pub fn generate(program: &Program, annotations: &TypeMap) -> ProsaResult<String> {
    let mut generator = Generator {
        table: SymbolTable::new(),
        annotations,
        consts: Consts::new(),
        literals: Vec::new(),
        body: Vec::new(),
    };
    generator.emit_stmt(&program.root)?;

    let mut constants: Vec<String> = generator
        .consts
        .all()
        .iter()
        .map(|c| c.decl())
        .collect();
    constants.extend(generator.literals.iter().map(|c| c.decl()));

    let mut globals: Vec<String> = generator
        .table
        .storages()
        .map(|(name, storage)| {
            format!(
                "@{} = global {} {}",
                name,
                ir_type(storage.kind),
                cell_init(storage.kind)
            )
        })
        .collect();
    globals.push("@.read_cell = global i32 0".to_string());

    Ok(IrModule {
        constants,
        globals,
        body: generator.body,
    }
    .to_string())
}

struct Generator<'a> {
    table: SymbolTable,
    annotations: &'a TypeMap,
    consts: Consts,
    literals: Vec<CString>,
    body: Vec<String>,
}

impl Generator<'_> {
    fn push(&mut self, line: impl Into<String>) {
        self.body.push(line.into());
    }

    fn kind_of(&self, node: &Node) -> ProsaResult<Kind> {
        self.annotations.kind_of(node.id).ok_or_else(|| {
            ProsaError::generation("expression carries no type annotation")
        })
    }

    fn emit_stmt(&mut self, node: &Node) -> ProsaResult<()> {
        match &node.kind {
            NodeKind::Block(statements) => {
                for statement in statements {
                    self.emit_stmt(statement)?;
                }
                Ok(())
            }
            NodeKind::NoOp => Ok(()),
            NodeKind::VarDeclare {
                name,
                declared,
                init,
            } => {
                self.table.allocate(name, *declared)?;
                if let Some(init) = init {
                    let value = self.emit_expr(init)?;
                    let ty = ir_type(*declared);
                    self.push(format!("store {} {}, {}* @{}", ty, value, ty, name));
                }
                Ok(())
            }
            NodeKind::Assign { name, value } => {
                let tmp = self.emit_expr(value)?;
                let storage = self.table.storage(name)?;
                let ty = ir_type(storage.kind);
                self.push(format!("store {} {}, {}* @{}", ty, tmp, ty, name));
                Ok(())
            }
            NodeKind::Print(operand) => {
                let value = self.emit_expr(operand)?;
                let id = node.id;
                match self.kind_of(operand)? {
                    Kind::Int => {
                        let call = format!(
                            "%p{} = call i32 (i8*, ...) @printf(i8* {}, i32 {})",
                            id,
                            self.consts.fmt_out.gep(),
                            value
                        );
                        self.push(call);
                    }
                    Kind::Bool => {
                        let text = format!(
                            "%p{}.text = select i1 {}, i8* {}, i8* {}",
                            id,
                            value,
                            self.consts.true_str.gep(),
                            self.consts.false_str.gep()
                        );
                        self.push(text);
                        let call = format!(
                            "%p{} = call i32 (i8*, ...) @printf(i8* {}, i8* %p{}.text)",
                            id,
                            self.consts.fmt_str.gep(),
                            id
                        );
                        self.push(call);
                    }
                    Kind::Str => {
                        let call = format!(
                            "%p{} = call i32 (i8*, ...) @printf(i8* {}, i8* {})",
                            id,
                            self.consts.fmt_str.gep(),
                            value
                        );
                        self.push(call);
                    }
                }
                Ok(())
            }
            NodeKind::Speak(operand) => {
                let value = self.emit_expr(operand)?;
                let kind = self.kind_of(operand)?;
                let id = node.id;
                let text = self.as_text(value, kind, &format!("%s{}", id));
                self.push(format!(
                    "%s{}.cmd = call i8* @malloc(i32 {})",
                    id, COMMAND_BYTES
                ));
                let open = format!(
                    "%s{}.pre = call i8* @strcpy(i8* %s{}.cmd, i8* {})",
                    id,
                    id,
                    self.consts.say_open.gep()
                );
                self.push(open);
                self.push(format!(
                    "%s{}.msg = call i8* @strcat(i8* %s{}.cmd, i8* {})",
                    id, id, text
                ));
                let close = format!(
                    "%s{}.quote = call i8* @strcat(i8* %s{}.cmd, i8* {})",
                    id,
                    id,
                    self.consts.say_close.gep()
                );
                self.push(close);
                self.push(format!("%s{}.run = call i32 @system(i8* %s{}.cmd)", id, id));
                Ok(())
            }
            NodeKind::If {
                condition,
                then_block,
                else_block,
            } => {
                let id = node.id;
                let cond = self.emit_expr(condition)?;
                match else_block {
                    Some(else_block) => {
                        self.push(format!(
                            "br i1 {}, label %then_{}, label %else_{}",
                            cond, id, id
                        ));
                        self.push(format!("then_{}:", id));
                        self.emit_stmt(then_block)?;
                        self.push(format!("br label %endif_{}", id));
                        self.push(format!("else_{}:", id));
                        self.emit_stmt(else_block)?;
                        self.push(format!("br label %endif_{}", id));
                    }
                    None => {
                        self.push(format!(
                            "br i1 {}, label %then_{}, label %endif_{}",
                            cond, id, id
                        ));
                        self.push(format!("then_{}:", id));
                        self.emit_stmt(then_block)?;
                        self.push(format!("br label %endif_{}", id));
                    }
                }
                self.push(format!("endif_{}:", id));
                Ok(())
            }
            NodeKind::While { condition, body } => {
                let id = node.id;
                self.push(format!("br label %cond_{}", id));
                self.push(format!("cond_{}:", id));
                let cond = self.emit_expr(condition)?;
                self.push(format!(
                    "br i1 {}, label %body_{}, label %exit_{}",
                    cond, id, id
                ));
                self.push(format!("body_{}:", id));
                self.emit_stmt(body)?;
                self.push(format!("br label %cond_{}", id));
                self.push(format!("exit_{}:", id));
                Ok(())
            }
            NodeKind::IntLiteral(_)
            | NodeKind::BoolLiteral(_)
            | NodeKind::TextLiteral(_)
            | NodeKind::Identifier(_)
            | NodeKind::UnaryOp { .. }
            | NodeKind::BinaryOp { .. }
            | NodeKind::Read => Err(ProsaError::generation(
                "expression cannot be lowered as a statement",
            )),
        }
    }

    /// Lower an expression; returns the temporary holding its result.
    fn emit_expr(&mut self, node: &Node) -> ProsaResult<String> {
        let result = format!("%t{}", node.id);
        match &node.kind {
            NodeKind::IntLiteral(value) => {
                self.push(format!("{} = add i32 0, {}", result, value));
            }
            NodeKind::BoolLiteral(value) => {
                self.push(format!("{} = or i1 false, {}", result, value));
            }
            NodeKind::TextLiteral(text) => {
                let constant = CString::new(format!("@.str{}", node.id), text);
                self.push(format!(
                    "{} = getelementptr inbounds [{len} x i8], [{len} x i8]* {name}, i32 0, i32 0",
                    result,
                    len = constant.bytes.len(),
                    name = constant.name
                ));
                self.literals.push(constant);
            }
            NodeKind::Identifier(name) => {
                let storage = self.table.storage(name)?;
                let ty = ir_type(storage.kind);
                self.push(format!("{} = load {}, {}* @{}", result, ty, ty, name));
            }
            NodeKind::UnaryOp { op, operand } => {
                let value = self.emit_expr(operand)?;
                match op {
                    UnOp::Plus => self.push(format!("{} = add i32 {}, 0", result, value)),
                    UnOp::Neg => self.push(format!("{} = sub i32 0, {}", result, value)),
                    UnOp::Not => self.push(format!("{} = xor i1 {}, true", result, value)),
                }
            }
            NodeKind::BinaryOp { op, left, right } => {
                return self.emit_binary(node, *op, left, right);
            }
            NodeKind::Read => {
                let scan = format!(
                    "{}.scan = call i32 (i8*, ...) @scanf(i8* {}, i32* @.read_cell)",
                    result,
                    self.consts.fmt_in.gep()
                );
                self.push(scan);
                self.push(format!("{} = load i32, i32* @.read_cell", result));
            }
            NodeKind::VarDeclare { .. }
            | NodeKind::Assign { .. }
            | NodeKind::Print(_)
            | NodeKind::Speak(_)
            | NodeKind::If { .. }
            | NodeKind::While { .. }
            | NodeKind::Block(_)
            | NodeKind::NoOp => {
                return Err(ProsaError::generation(
                    "statement cannot be lowered as an expression",
                ))
            }
        }
        Ok(result)
    }

    fn emit_binary(
        &mut self,
        node: &Node,
        op: BinOp,
        left: &Node,
        right: &Node,
    ) -> ProsaResult<String> {
        let result = format!("%t{}", node.id);
        let lhs = self.emit_expr(left)?;
        let rhs = self.emit_expr(right)?;

        match op {
            BinOp::Add => self.push(format!("{} = add i32 {}, {}", result, lhs, rhs)),
            BinOp::Sub => self.push(format!("{} = sub i32 {}, {}", result, lhs, rhs)),
            BinOp::Mul => self.push(format!("{} = mul i32 {}, {}", result, lhs, rhs)),
            BinOp::Div => {
                // sdiv truncates; floor by subtracting one whenever the
                // remainder is non-zero and disagrees in sign with the
                // divisor.
                self.push(format!("{}.q = sdiv i32 {}, {}", result, lhs, rhs));
                self.push(format!("{}.rem = srem i32 {}, {}", result, lhs, rhs));
                self.push(format!("{}.nz = icmp ne i32 {}.rem, 0", result, result));
                self.push(format!("{}.sig = xor i32 {}.rem, {}", result, result, rhs));
                self.push(format!("{}.neg = icmp slt i32 {}.sig, 0", result, result));
                self.push(format!(
                    "{}.fix = and i1 {}.nz, {}.neg",
                    result, result, result
                ));
                self.push(format!(
                    "{}.adj = select i1 {}.fix, i32 -1, i32 0",
                    result, result
                ));
                self.push(format!("{} = add i32 {}.q, {}.adj", result, result, result));
            }
            // Operands are materialised above before either is inspected,
            // so the no-short-circuit contract holds here too.
            BinOp::And => self.push(format!("{} = and i1 {}, {}", result, lhs, rhs)),
            BinOp::Or => self.push(format!("{} = or i1 {}, {}", result, lhs, rhs)),
            BinOp::Equal | BinOp::Greater | BinOp::Less => {
                let predicate = match self.kind_of(left)? {
                    Kind::Int => match op {
                        BinOp::Equal => "eq i32",
                        BinOp::Greater => "sgt i32",
                        _ => "slt i32",
                    },
                    Kind::Bool => match op {
                        BinOp::Equal => "eq i1",
                        BinOp::Greater => "ugt i1",
                        _ => "ult i1",
                    },
                    Kind::Str => {
                        return Err(ProsaError::generation(
                            "text comparison has no lowering in the SSA dialect",
                        ))
                    }
                };
                self.push(format!("{} = icmp {} {}, {}", result, predicate, lhs, rhs));
            }
            BinOp::Concat => {
                let left_kind = self.kind_of(left)?;
                let right_kind = self.kind_of(right)?;
                let left_text = self.as_text(lhs, left_kind, &format!("{}.l", result));
                let right_text = self.as_text(rhs, right_kind, &format!("{}.r", result));
                self.push(format!(
                    "{}.buf = call i8* @malloc(i32 {})",
                    result, SCRATCH_BYTES
                ));
                self.push(format!(
                    "{}.cpy = call i8* @strcpy(i8* {}.buf, i8* {})",
                    result, result, left_text
                ));
                self.push(format!(
                    "{} = call i8* @strcat(i8* {}.buf, i8* {})",
                    result, result, right_text
                ));
            }
        }
        Ok(result)
    }

    /// Render a value into an `i8*`, allocating a scratch buffer for
    /// integers and selecting between the boolean constants.
    fn as_text(&mut self, value: String, kind: Kind, prefix: &str) -> String {
        match kind {
            Kind::Str => value,
            Kind::Bool => {
                let name = format!("{}.txt", prefix);
                let select = format!(
                    "{} = select i1 {}, i8* {}, i8* {}",
                    name,
                    value,
                    self.consts.true_str.gep(),
                    self.consts.false_str.gep()
                );
                self.push(select);
                name
            }
            Kind::Int => {
                let buf = format!("{}.buf", prefix);
                self.push(format!("{} = call i8* @malloc(i32 {})", buf, RENDER_BYTES));
                let render = format!(
                    "{}.fmt = call i32 (i8*, i8*, ...) @sprintf(i8* {}, i8* {}, i32 {})",
                    prefix,
                    buf,
                    self.consts.fmt_in.gep(),
                    value
                );
                self.push(render);
                buf
            }
        }
    }
}
