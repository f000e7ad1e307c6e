//! Prosa Runtime - tree-walking interpreter
//!
//! The interpreter is the reference semantics of the language: both code
//! generation dialects must agree with what it computes. It walks the AST
//! directly, consulting one `SymbolTable` per run, and does all I/O through
//! injected handles so tests can script stdin/stdout and capture speech.

use crate::ast::{BinOp, Kind, Node, NodeKind, Program, UnOp};
use crate::error::{ProsaError, ProsaResult};
use crate::speech::Speaker;
use crate::symbols::SymbolTable;
use std::fmt;
use std::io::{self, BufRead, Write};

/// Runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(String),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Int(_) => Kind::Int,
            Value::Bool(_) => Kind::Bool,
            Value::Str(_) => Kind::Str,
        }
    }

    /// Canonical textual rendering: booleans become the words `true` and
    /// `false`, integers their decimal form, text stays as-is. Printing,
    /// speaking and concatenation all share this.
    pub fn render(&self) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Str(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// How a `read` result is typed. The script surface insists on integers;
/// the spoken surface classifies by content, so the result type of a read
/// depends on what was typed at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPolicy {
    IntegerOnly,
    Classify,
}

/// Division flooring toward negative infinity, so `7 / -2` is `-4`.
fn floor_div(lhs: i64, rhs: i64) -> i64 {
    let quotient = lhs / rhs;
    if lhs % rhs != 0 && (lhs % rhs < 0) != (rhs < 0) {
        quotient - 1
    } else {
        quotient
    }
}

pub struct Interpreter<'io> {
    table: SymbolTable,
    policy: ReadPolicy,
    input: Box<dyn BufRead + 'io>,
    output: Box<dyn Write + 'io>,
    speaker: Box<dyn Speaker + 'io>,
}

impl<'io> Interpreter<'io> {
    pub fn new(
        policy: ReadPolicy,
        input: Box<dyn BufRead + 'io>,
        output: Box<dyn Write + 'io>,
        speaker: Box<dyn Speaker + 'io>,
    ) -> Self {
        Self {
            table: SymbolTable::new(),
            policy,
            input,
            output,
            speaker,
        }
    }

    /// Execute a whole unit against a fresh symbol table.
    pub fn run(&mut self, program: &Program) -> ProsaResult<()> {
        self.exec(&program.root)
    }

    /// Execute one statement node.
    fn exec(&mut self, node: &Node) -> ProsaResult<()> {
        match &node.kind {
            NodeKind::Block(statements) => {
                for statement in statements {
                    self.exec(statement)?;
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
                    let value = self.eval(init)?;
                    if value.kind() != *declared {
                        return Err(ProsaError::type_error(format!(
                            "variable '{}' declared as '{}' but initialized with '{}'",
                            name,
                            declared,
                            value.kind()
                        )));
                    }
                    self.table.set(name, value)?;
                }
                Ok(())
            }
            NodeKind::Assign { name, value } => {
                let value = self.eval(value)?;
                self.table.set(name, value)
            }
            NodeKind::Print(operand) => {
                let value = self.eval(operand)?;
                writeln!(self.output, "{}", value)?;
                Ok(())
            }
            NodeKind::Speak(operand) => {
                let value = self.eval(operand)?;
                self.speaker.say(&value.render())
            }
            NodeKind::If {
                condition,
                then_block,
                else_block,
            } => {
                let chosen = self.condition(condition, "if")?;
                if chosen {
                    self.exec(then_block)
                } else if let Some(else_block) = else_block {
                    self.exec(else_block)
                } else {
                    Ok(())
                }
            }
            NodeKind::While { condition, body } => {
                while self.condition(condition, "while")? {
                    self.exec(body)?;
                }
                Ok(())
            }
            NodeKind::IntLiteral(_)
            | NodeKind::BoolLiteral(_)
            | NodeKind::TextLiteral(_)
            | NodeKind::Identifier(_)
            | NodeKind::UnaryOp { .. }
            | NodeKind::BinaryOp { .. }
            | NodeKind::Read => {
                // The statement grammar never produces a bare expression.
                Err(ProsaError::type_error(
                    "expression cannot be executed as a statement",
                ))
            }
        }
    }

    /// Evaluate one expression node to a value.
    fn eval(&mut self, node: &Node) -> ProsaResult<Value> {
        match &node.kind {
            NodeKind::IntLiteral(value) => Ok(Value::Int(*value)),
            NodeKind::BoolLiteral(value) => Ok(Value::Bool(*value)),
            NodeKind::TextLiteral(text) => Ok(Value::Str(text.clone())),
            NodeKind::Identifier(name) => {
                let (value, _) = self.table.get(name)?;
                Ok(value)
            }
            NodeKind::UnaryOp { op, operand } => {
                let value = self.eval(operand)?;
                apply_unary(*op, value)
            }
            NodeKind::BinaryOp { op, left, right } => {
                // Both operands are always evaluated, logical operators
                // included: there is no short-circuit skipping.
                let lhs = self.eval(left)?;
                let rhs = self.eval(right)?;
                apply_binary(*op, lhs, rhs)
            }
            NodeKind::Read => self.read_value(),
            NodeKind::VarDeclare { .. }
            | NodeKind::Assign { .. }
            | NodeKind::Print(_)
            | NodeKind::Speak(_)
            | NodeKind::If { .. }
            | NodeKind::While { .. }
            | NodeKind::Block(_)
            | NodeKind::NoOp => Err(ProsaError::type_error(
                "statement cannot be evaluated as an expression",
            )),
        }
    }

    /// Evaluate a condition, requiring a boolean each time it is checked.
    fn condition(&mut self, node: &Node, construct: &str) -> ProsaResult<bool> {
        match self.eval(node)? {
            Value::Bool(value) => Ok(value),
            other => Err(ProsaError::type_error(format!(
                "condition of '{}' must be 'bool', got '{}'",
                construct,
                other.kind()
            ))),
        }
    }

    /// Consume exactly one line of external input and type it according to
    /// the active read policy.
    fn read_value(&mut self) -> ProsaResult<Value> {
        let mut line = String::new();
        let read = self.input.read_line(&mut line)?;
        if read == 0 {
            return Err(
                io::Error::new(io::ErrorKind::UnexpectedEof, "no input left for read").into(),
            );
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        match self.policy {
            ReadPolicy::IntegerOnly => line.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                ProsaError::type_error(format!(
                    "read input '{}' is not an integer",
                    line
                ))
            }),
            ReadPolicy::Classify => {
                if !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit()) {
                    line.parse::<i64>().map(Value::Int).map_err(|_| {
                        ProsaError::type_error(format!(
                            "read input '{}' is out of integer range",
                            line
                        ))
                    })
                } else {
                    Ok(Value::Str(line))
                }
            }
        }
    }
}

fn apply_unary(op: UnOp, value: Value) -> ProsaResult<Value> {
    match (op, value) {
        (UnOp::Plus, Value::Int(n)) => Ok(Value::Int(n)),
        (UnOp::Neg, Value::Int(n)) => Ok(Value::Int(-n)),
        (UnOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnOp::Not, value) => Err(ProsaError::type_error(format!(
            "unary operator '!' requires a 'bool' operand, got '{}'",
            value.kind()
        ))),
        (op, value) => Err(ProsaError::type_error(format!(
            "unary operator '{}' requires an 'i32' operand, got '{}'",
            op,
            value.kind()
        ))),
    }
}

fn apply_binary(op: BinOp, lhs: Value, rhs: Value) -> ProsaResult<Value> {
    if op.is_arithmetic() {
        let (Value::Int(a), Value::Int(b)) = (&lhs, &rhs) else {
            return Err(ProsaError::type_error(format!(
                "arithmetic operator '{}' requires 'i32' operands, got '{}' and '{}'",
                op,
                lhs.kind(),
                rhs.kind()
            )));
        };
        return match op {
            BinOp::Add => Ok(Value::Int(a + b)),
            BinOp::Sub => Ok(Value::Int(a - b)),
            BinOp::Mul => Ok(Value::Int(a * b)),
            BinOp::Div => {
                if *b == 0 {
                    Err(ProsaError::arithmetic("division by zero"))
                } else {
                    Ok(Value::Int(floor_div(*a, *b)))
                }
            }
            _ => unreachable!("is_arithmetic covers exactly these"),
        };
    }

    if op.is_logical() {
        let (Value::Bool(a), Value::Bool(b)) = (&lhs, &rhs) else {
            return Err(ProsaError::type_error(format!(
                "logical operator '{}' requires 'bool' operands, got '{}' and '{}'",
                op,
                lhs.kind(),
                rhs.kind()
            )));
        };
        return Ok(Value::Bool(match op {
            BinOp::And => *a && *b,
            BinOp::Or => *a || *b,
            _ => unreachable!("is_logical covers exactly these"),
        }));
    }

    if op.is_relational() {
        if lhs.kind() != rhs.kind() {
            return Err(ProsaError::type_error(format!(
                "comparison requires operands of the same type, got '{}' and '{}'",
                lhs.kind(),
                rhs.kind()
            )));
        }
        let result = match op {
            BinOp::Equal => lhs == rhs,
            BinOp::Greater => ordering(&lhs, &rhs) == std::cmp::Ordering::Greater,
            BinOp::Less => ordering(&lhs, &rhs) == std::cmp::Ordering::Less,
            _ => unreachable!("is_relational covers exactly these"),
        };
        return Ok(Value::Bool(result));
    }

    // Concatenation accepts any operand pair and stringifies both sides.
    Ok(Value::Str(format!("{}{}", lhs.render(), rhs.render())))
}

fn ordering(lhs: &Value, rhs: &Value) -> std::cmp::Ordering {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => unreachable!("callers compare identical kinds"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{preprocess, Lexer};
    use crate::parser::Parser;
    use crate::speech::NullSpeaker;
    use crate::Surface;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn parse(source: &str, surface: Surface) -> Program {
        let clean = preprocess(source);
        let lexer = Lexer::new(&clean, surface).unwrap();
        Parser::new(lexer).parse().unwrap()
    }

    fn run_capture(
        source: &str,
        policy: ReadPolicy,
        input: &str,
    ) -> (ProsaResult<()>, String) {
        let program = parse(source, Surface::Script);
        let mut out = Vec::new();
        let result = {
            let mut interp = Interpreter::new(
                policy,
                Box::new(Cursor::new(input.to_string())),
                Box::new(&mut out),
                Box::new(NullSpeaker),
            );
            interp.run(&program)
        };
        (result, String::from_utf8(out).unwrap())
    }

    fn run_ok(source: &str, input: &str) -> String {
        let (result, output) = run_capture(source, ReadPolicy::IntegerOnly, input);
        result.unwrap();
        output
    }

    fn run_err(source: &str) -> ProsaError {
        let (result, _) = run_capture(source, ReadPolicy::IntegerOnly, "");
        result.unwrap_err()
    }

    #[test]
    fn test_declare_assign_print() {
        let output = run_ok("{ var x : i32 = 2; x := x + 3; print(x); }", "");
        assert_eq!(output, "5\n");
    }

    #[test]
    fn test_division_floors_toward_negative_infinity() {
        assert_eq!(run_ok("{ print(7 / -2); }", ""), "-4\n");
        assert_eq!(run_ok("{ print(-7 / 2); }", ""), "-4\n");
        assert_eq!(run_ok("{ print(7 / 2); }", ""), "3\n");
    }

    #[test]
    fn test_division_by_zero_prints_nothing() {
        let (result, output) = run_capture("{ print(10 / 0); }", ReadPolicy::IntegerOnly, "");
        assert!(matches!(result.unwrap_err(), ProsaError::Arithmetic { .. }));
        assert_eq!(output, "");
    }

    #[test]
    fn test_logical_operators_evaluate_both_operands() {
        // The read on the right side must still consume its line even
        // though `false &&` already decides the result.
        let source = "{ var a : bool = false && (read() = 1); print(a); print(read()); }";
        let output = run_ok(source, "5\n7\n");
        assert_eq!(output, "false\n7\n");
    }

    #[test]
    fn test_concat_stringification() {
        assert_eq!(run_ok("{ print(true ++ 3); }", ""), "true3\n");
        assert_eq!(run_ok("{ print(false ++ true); }", ""), "falsetrue\n");
        assert_eq!(run_ok("{ print(\"n=\" ++ 41); }", ""), "n=41\n");
    }

    #[test]
    fn test_redeclaration_fails() {
        let err = run_err("{ var x : i32; var x : bool; }");
        assert!(matches!(err, ProsaError::Name { .. }));
    }

    #[test]
    fn test_use_of_undeclared_name_fails() {
        let err = run_err("{ print(ghost); }");
        assert!(matches!(err, ProsaError::Name { .. }));
    }

    #[test]
    fn test_use_before_assignment_fails() {
        let err = run_err("{ var x : i32; print(x); }");
        assert!(err.to_string().contains("before assignment"));
    }

    #[test]
    fn test_initializer_type_mismatch() {
        let err = run_err("{ var x : bool = 5; }");
        assert!(matches!(err, ProsaError::Type { .. }));
    }

    #[test]
    fn test_assignment_type_mismatch() {
        let err = run_err("{ var x : i32 = 1; x := \"text\"; }");
        assert!(matches!(err, ProsaError::Type { .. }));
    }

    #[test]
    fn test_non_boolean_conditions_fail() {
        assert!(matches!(
            run_err("{ if (1) { } }"),
            ProsaError::Type { .. }
        ));
        assert!(matches!(
            run_err("{ while (1) { } }"),
            ProsaError::Type { .. }
        ));
    }

    #[test]
    fn test_while_false_runs_zero_times() {
        let output = run_ok(
            "{ var x : i32 = 1; while (false) { x := x + 1; } print(x); }",
            "",
        );
        assert_eq!(output, "1\n");
    }

    #[test]
    fn test_while_loop_counts() {
        let source = "{
            var i : i32 = 0;
            var sum : i32 = 0;
            while (i < 4) {
                sum := sum + i;
                i := i + 1;
            }
            print(sum);
        }";
        assert_eq!(run_ok(source, ""), "6\n");
    }

    #[test]
    fn test_if_else_selects_one_branch() {
        let source = "{ if (2 > 1) { print(1); } else { print(2); } }";
        assert_eq!(run_ok(source, ""), "1\n");
        let source = "{ if (!(2 > 1)) { print(1); } else { print(2); } }";
        assert_eq!(run_ok(source, ""), "2\n");
    }

    #[test]
    fn test_logical_type_mismatch() {
        let err = run_err("{ var x : bool = 1 && true; }");
        assert!(matches!(err, ProsaError::Type { .. }));
    }

    #[test]
    fn test_comparison_requires_same_kind() {
        let err = run_err("{ var x : bool = 1 = true; }");
        assert!(err.to_string().contains("same type"));
    }

    #[test]
    fn test_read_integer_only_rejects_words() {
        let (result, _) = run_capture(
            "{ print(read()); }",
            ReadPolicy::IntegerOnly,
            "not a number\n",
        );
        assert!(matches!(result.unwrap_err(), ProsaError::Type { .. }));
    }

    #[test]
    fn test_read_classify_types_by_content() {
        let source = "{ var t : str; t := read(); print(t); var n : i32; n := read(); print(n + 1); }";
        let program = parse(source, Surface::Script);
        let mut out = Vec::new();
        {
            let mut interp = Interpreter::new(
                ReadPolicy::Classify,
                Box::new(Cursor::new("hello world\n41\n".to_string())),
                Box::new(&mut out),
                Box::new(NullSpeaker),
            );
            interp.run(&program).unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), "hello world\n42\n");
    }

    #[test]
    fn test_speak_hands_over_rendered_text() {
        struct Recorder<'a>(&'a mut Vec<String>);
        impl Speaker for Recorder<'_> {
            fn say(&mut self, text: &str) -> ProsaResult<()> {
                self.0.push(text.to_string());
                Ok(())
            }
        }

        let program = parse("{ speak(\"n is \" ++ 4); speak(true); }", Surface::Script);
        let mut spoken = Vec::new();
        {
            let mut interp = Interpreter::new(
                ReadPolicy::IntegerOnly,
                Box::new(Cursor::new(String::new())),
                Box::new(Vec::new()),
                Box::new(Recorder(&mut spoken)),
            );
            interp.run(&program).unwrap();
        }
        assert_eq!(spoken, vec!["n is 4".to_string(), "true".to_string()]);
    }

    #[test]
    fn test_spoken_surface_program() {
        let source = "INICIO
            GUARDAR contador COMO NUMERO COM 3 VEZES 4;
            EXIBIR(contador MAIS 1);
        FIM";
        let program = parse(source, Surface::Spoken);
        let mut out = Vec::new();
        {
            let mut interp = Interpreter::new(
                ReadPolicy::Classify,
                Box::new(Cursor::new(String::new())),
                Box::new(&mut out),
                Box::new(NullSpeaker),
            );
            interp.run(&program).unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), "13\n");
    }
}
