//! Stack-frame dialect: NASM-flavoured 32-bit assembly
//!
//! Variables live at fixed offsets below `ebp`, allocated in 4-byte units.
//! Expression results flow through `eax`; nested operands are pushed and
//! popped around the recursion. Comparisons use the cmp/cmov idiom, logical
//! operators materialise both operands before a test-and-branch combine,
//! and control flow uses labels seeded by node ids. Text has no lowering in
//! this dialect at all.

use crate::ast::{BinOp, Kind, Node, NodeKind, Program, UnOp};
use crate::error::{ProsaError, ProsaResult};
use crate::symbols::SymbolTable;
use crate::types::TypeMap;
use std::fmt;

/// Emitted instruction list wrapped in the fixed module boilerplate
pub struct AsmModule {
    pub instructions: Vec<String>,
}

impl fmt::Display for AsmModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "section .data")?;
        writeln!(f, "   format_out db \"%d\", 10, 0")?;
        writeln!(f, "   format_in db \"%d\", 0")?;
        writeln!(f, "   scan_int dd 0")?;
        writeln!(f)?;
        writeln!(f, "section .text")?;
        writeln!(f)?;
        writeln!(f, "   extern printf")?;
        writeln!(f, "   extern scanf")?;
        writeln!(f, "   extern _ExitProcess@4")?;
        writeln!(f, "   global _start")?;
        writeln!(f)?;
        writeln!(f, "_start:")?;
        writeln!(f, "   push ebp")?;
        writeln!(f, "   mov ebp, esp")?;
        writeln!(f)?;
        for instruction in &self.instructions {
            writeln!(f, "   {}", instruction)?;
        }
        writeln!(f)?;
        writeln!(f, "   mov esp, ebp")?;
        writeln!(f, "   pop ebp")?;
        writeln!(f)?;
        writeln!(f, "   mov eax, 1")?;
        writeln!(f, "   xor ebx, ebx")?;
        writeln!(f, "   int 0x80")
    }
}

/// Lower a checked unit into the stack-frame dialect.
pub fn generate(program: &Program, annotations: &TypeMap) -> ProsaResult<String> {
    let mut generator = Generator {
        table: SymbolTable::new(),
        annotations,
        code: Vec::new(),
    };
    generator.emit_stmt(&program.root)?;
    Ok(AsmModule {
        instructions: generator.code,
    }
    .to_string())
}

struct Generator<'a> {
    table: SymbolTable,
    annotations: &'a TypeMap,
    code: Vec<String>,
}

impl Generator<'_> {
    fn push(&mut self, instruction: impl Into<String>) {
        self.code.push(instruction.into());
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
                if *declared == Kind::Str {
                    return Err(ProsaError::generation(format!(
                        "type 'str' has no storage in the stack-frame dialect (variable '{}')",
                        name
                    )));
                }
                let offset = self.table.allocate(name, *declared)?;
                self.push(format!("sub esp, 4 ; slot for {}", name));
                if let Some(init) = init {
                    self.emit_expr(init)?;
                    self.push(format!("mov [ebp-{}], eax", offset));
                }
                Ok(())
            }
            NodeKind::Assign { name, value } => {
                self.emit_expr(value)?;
                let storage = self.table.storage(name)?;
                self.push(format!("mov [ebp-{}], eax", storage.slot));
                Ok(())
            }
            NodeKind::Print(operand) => {
                if self.kind_of(operand)? == Kind::Str {
                    return Err(ProsaError::generation(
                        "text values cannot be printed in the stack-frame dialect",
                    ));
                }
                self.emit_expr(operand)?;
                self.push("push eax");
                self.push("push format_out");
                self.push("call printf");
                self.push("add esp, 8");
                Ok(())
            }
            NodeKind::Speak(_) => Err(ProsaError::generation(
                "'speak' has no lowering in the stack-frame dialect",
            )),
            NodeKind::If {
                condition,
                then_block,
                else_block,
            } => {
                let id = node.id;
                self.emit_expr(condition)?;
                self.push("cmp eax, 0");
                match else_block {
                    Some(else_block) => {
                        self.push(format!("je else_{}", id));
                        self.emit_stmt(then_block)?;
                        self.push(format!("jmp endif_{}", id));
                        self.push(format!("else_{}:", id));
                        self.emit_stmt(else_block)?;
                    }
                    None => {
                        self.push(format!("je endif_{}", id));
                        self.emit_stmt(then_block)?;
                    }
                }
                self.push(format!("endif_{}:", id));
                Ok(())
            }
            NodeKind::While { condition, body } => {
                let id = node.id;
                self.push(format!("loop_{}:", id));
                self.emit_expr(condition)?;
                self.push("cmp eax, 0");
                self.push(format!("je exit_{}", id));
                self.emit_stmt(body)?;
                self.push(format!("jmp loop_{}", id));
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

    /// Lower an expression; its result ends up in `eax`.
    fn emit_expr(&mut self, node: &Node) -> ProsaResult<()> {
        match &node.kind {
            NodeKind::IntLiteral(value) => {
                self.push(format!("mov eax, {}", value));
                Ok(())
            }
            NodeKind::BoolLiteral(value) => {
                self.push(format!("mov eax, {}", i32::from(*value)));
                Ok(())
            }
            NodeKind::TextLiteral(_) => Err(ProsaError::generation(
                "text literals have no lowering in the stack-frame dialect",
            )),
            NodeKind::Identifier(name) => {
                let storage = self.table.storage(name)?;
                self.push(format!("mov eax, [ebp-{}]", storage.slot));
                Ok(())
            }
            NodeKind::UnaryOp { op, operand } => {
                self.emit_expr(operand)?;
                match op {
                    UnOp::Plus => {}
                    UnOp::Neg => self.push("neg eax"),
                    UnOp::Not => {
                        self.push("cmp eax, 0");
                        self.push("mov eax, 0");
                        self.push("mov ecx, 1");
                        self.push("cmove eax, ecx");
                    }
                }
                Ok(())
            }
            NodeKind::BinaryOp { op, left, right } => self.emit_binary(node, *op, left, right),
            NodeKind::Read => {
                self.push("push scan_int");
                self.push("push format_in");
                self.push("call scanf");
                self.push("add esp, 8");
                self.push("mov eax, [scan_int]");
                Ok(())
            }
            NodeKind::VarDeclare { .. }
            | NodeKind::Assign { .. }
            | NodeKind::Print(_)
            | NodeKind::Speak(_)
            | NodeKind::If { .. }
            | NodeKind::While { .. }
            | NodeKind::Block(_)
            | NodeKind::NoOp => Err(ProsaError::generation(
                "statement cannot be lowered as an expression",
            )),
        }
    }

    fn emit_binary(
        &mut self,
        node: &Node,
        op: BinOp,
        left: &Node,
        right: &Node,
    ) -> ProsaResult<()> {
        if op == BinOp::Concat {
            return Err(ProsaError::generation(
                "text concatenation has no lowering in the stack-frame dialect",
            ));
        }

        // Right operand first onto the stack, left into the accumulator.
        // Both operand instruction sequences run before the combine, so the
        // logical operators keep the interpreter's no-short-circuit contract.
        self.emit_expr(right)?;
        self.push("push eax");
        self.emit_expr(left)?;
        self.push("pop ecx");

        let id = node.id;
        match op {
            BinOp::Add => self.push("add eax, ecx"),
            BinOp::Sub => self.push("sub eax, ecx"),
            BinOp::Mul => self.push("imul ecx"),
            BinOp::Div => {
                // idiv truncates; flooring needs a fixup whenever the
                // remainder is non-zero and disagrees in sign with the
                // divisor.
                self.push("cdq");
                self.push("idiv ecx");
                self.push("test edx, edx");
                self.push(format!("je div_done_{}", id));
                self.push("mov ebx, edx");
                self.push("xor ebx, ecx");
                self.push(format!("jns div_done_{}", id));
                self.push("dec eax");
                self.push(format!("div_done_{}:", id));
            }
            BinOp::Equal | BinOp::Less | BinOp::Greater => {
                self.push("cmp eax, ecx");
                self.push("mov eax, 0");
                self.push("mov ecx, 1");
                match op {
                    BinOp::Equal => self.push("cmove eax, ecx"),
                    BinOp::Less => self.push("cmovl eax, ecx"),
                    BinOp::Greater => self.push("cmovg eax, ecx"),
                    _ => {}
                }
            }
            BinOp::And => {
                self.push("test eax, eax");
                self.push(format!("je and_false_{}", id));
                self.push("test ecx, ecx");
                self.push(format!("je and_false_{}", id));
                self.push("mov eax, 1");
                self.push(format!("jmp and_end_{}", id));
                self.push(format!("and_false_{}:", id));
                self.push("mov eax, 0");
                self.push(format!("and_end_{}:", id));
            }
            BinOp::Or => {
                self.push("test eax, eax");
                self.push(format!("jne or_true_{}", id));
                self.push("test ecx, ecx");
                self.push(format!("jne or_true_{}", id));
                self.push("mov eax, 0");
                self.push(format!("jmp or_end_{}", id));
                self.push(format!("or_true_{}:", id));
                self.push("mov eax, 1");
                self.push(format!("or_end_{}:", id));
            }
            BinOp::Concat => {}
        }
        Ok(())
    }
}
