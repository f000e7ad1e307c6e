//! Static type checking for code generation
//!
//! The generators never evaluate anything to learn a type: this pass walks
//! the AST once, enforces the same typing rules the interpreter applies at
//! run time, and records every expression node's kind in a `TypeMap` keyed
//! by node id. Code generation consults only these annotations.

use crate::ast::{Kind, Node, NodeId, NodeKind, Program, UnOp};
use crate::error::{ProsaError, ProsaResult};
use crate::symbols::SymbolTable;
use std::collections::HashMap;

/// Kind annotations for every expression node of one checked unit
#[derive(Debug, Default)]
pub struct TypeMap {
    kinds: HashMap<NodeId, Kind>,
}

impl TypeMap {
    pub fn kind_of(&self, id: NodeId) -> Option<Kind> {
        self.kinds.get(&id).copied()
    }
}

/// Check a whole unit against a fresh symbol table.
pub fn check(program: &Program) -> ProsaResult<TypeMap> {
    let mut checker = Checker {
        table: SymbolTable::new(),
        map: TypeMap::default(),
    };
    checker.check_stmt(&program.root)?;
    Ok(checker.map)
}

struct Checker {
    table: SymbolTable,
    map: TypeMap,
}

impl Checker {
    fn check_stmt(&mut self, node: &Node) -> ProsaResult<()> {
        match &node.kind {
            NodeKind::Block(statements) => {
                for statement in statements {
                    self.check_stmt(statement)?;
                }
                Ok(())
            }
            NodeKind::NoOp => Ok(()),
            NodeKind::VarDeclare {
                name,
                declared,
                init,
            } => {
                self.table.declare(name, *declared)?;
                if let Some(init) = init {
                    let found = self.check_expr(init)?;
                    if found != *declared {
                        return Err(ProsaError::type_error(format!(
                            "variable '{}' declared as '{}' but initialized with '{}'",
                            name, declared, found
                        )));
                    }
                }
                Ok(())
            }
            NodeKind::Assign { name, value } => {
                let declared = self.table.kind_of(name)?;
                let found = self.check_expr(value)?;
                if found != declared {
                    return Err(ProsaError::type_error(format!(
                        "type mismatch in assignment to '{}': expected '{}', got '{}'",
                        name, declared, found
                    )));
                }
                Ok(())
            }
            NodeKind::Print(operand) | NodeKind::Speak(operand) => {
                self.check_expr(operand)?;
                Ok(())
            }
            NodeKind::If {
                condition,
                then_block,
                else_block,
            } => {
                self.condition(condition, "if")?;
                self.check_stmt(then_block)?;
                if let Some(else_block) = else_block {
                    self.check_stmt(else_block)?;
                }
                Ok(())
            }
            NodeKind::While { condition, body } => {
                self.condition(condition, "while")?;
                self.check_stmt(body)
            }
            NodeKind::IntLiteral(_)
            | NodeKind::BoolLiteral(_)
            | NodeKind::TextLiteral(_)
            | NodeKind::Identifier(_)
            | NodeKind::UnaryOp { .. }
            | NodeKind::BinaryOp { .. }
            | NodeKind::Read => Err(ProsaError::type_error(
                "expression cannot be checked as a statement",
            )),
        }
    }

    fn check_expr(&mut self, node: &Node) -> ProsaResult<Kind> {
        let kind = match &node.kind {
            NodeKind::IntLiteral(_) => Kind::Int,
            NodeKind::BoolLiteral(_) => Kind::Bool,
            NodeKind::TextLiteral(_) => Kind::Str,
            NodeKind::Identifier(name) => self.table.kind_of(name)?,
            NodeKind::UnaryOp { op, operand } => {
                let found = self.check_expr(operand)?;
                match op {
                    UnOp::Not if found == Kind::Bool => Kind::Bool,
                    UnOp::Not => {
                        return Err(ProsaError::type_error(format!(
                            "unary operator '!' requires a 'bool' operand, got '{}'",
                            found
                        )))
                    }
                    UnOp::Plus | UnOp::Neg if found == Kind::Int => Kind::Int,
                    op => {
                        return Err(ProsaError::type_error(format!(
                            "unary operator '{}' requires an 'i32' operand, got '{}'",
                            op, found
                        )))
                    }
                }
            }
            NodeKind::BinaryOp { op, left, right } => {
                let lhs = self.check_expr(left)?;
                let rhs = self.check_expr(right)?;
                if op.is_arithmetic() {
                    if lhs != Kind::Int || rhs != Kind::Int {
                        return Err(ProsaError::type_error(format!(
                            "arithmetic operator '{}' requires 'i32' operands, got '{}' and '{}'",
                            op, lhs, rhs
                        )));
                    }
                    Kind::Int
                } else if op.is_logical() {
                    if lhs != Kind::Bool || rhs != Kind::Bool {
                        return Err(ProsaError::type_error(format!(
                            "logical operator '{}' requires 'bool' operands, got '{}' and '{}'",
                            op, lhs, rhs
                        )));
                    }
                    Kind::Bool
                } else if op.is_relational() {
                    if lhs != rhs {
                        return Err(ProsaError::type_error(format!(
                            "comparison requires operands of the same type, got '{}' and '{}'",
                            lhs, rhs
                        )));
                    }
                    Kind::Bool
                } else {
                    // Concatenation accepts any operand pair.
                    Kind::Str
                }
            }
            // Both dialects lower a read as a formatted integer scan, so
            // its generated result is integral regardless of surface.
            NodeKind::Read => Kind::Int,
            NodeKind::VarDeclare { .. }
            | NodeKind::Assign { .. }
            | NodeKind::Print(_)
            | NodeKind::Speak(_)
            | NodeKind::If { .. }
            | NodeKind::While { .. }
            | NodeKind::Block(_)
            | NodeKind::NoOp => {
                return Err(ProsaError::type_error(
                    "statement cannot be used as an expression",
                ))
            }
        };
        self.map.kinds.insert(node.id, kind);
        Ok(kind)
    }

    fn condition(&mut self, node: &Node, construct: &str) -> ProsaResult<()> {
        let found = self.check_expr(node)?;
        if found != Kind::Bool {
            return Err(ProsaError::type_error(format!(
                "condition of '{}' must be 'bool', got '{}'",
                construct, found
            )));
        }
        Ok(())
    }
}
