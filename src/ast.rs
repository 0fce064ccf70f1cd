use std::{fmt, str::FromStr};

use crate::error::SegmentError;

/// Largest value a Hack A-instruction can load directly.
pub const MAX_CONSTANT: u16 = 0x7FFF;

/// Prefix of every translator-generated label. User symbols may not use it.
pub const RESERVED_PREFIX: &str = "VM$";

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Segment {
    Argument,
    Local,
    Static,
    Constant,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    pub fn keyword(&self) -> &'static str {
        match self {
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::Constant => "constant",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        }
    }
}

impl FromStr for Segment {
    type Err = SegmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "argument" => Ok(Segment::Argument),
            "local" => Ok(Segment::Local),
            "static" => Ok(Segment::Static),
            "constant" => Ok(Segment::Constant),
            "this" => Ok(Segment::This),
            "that" => Ok(Segment::That),
            "pointer" => Ok(Segment::Pointer),
            "temp" => Ok(Segment::Temp),
            _ => Err(SegmentError::Unknown(s.to_string())),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// How an arithmetic op moves the stack.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Arity {
    /// Rewrites the top in place.
    Unary,
    /// Pops one operand and folds it into the new top.
    Binary,
    /// Binary, with a branch to materialize the boolean.
    Comparison,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl ArithmeticOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "add",
            ArithmeticOp::Sub => "sub",
            ArithmeticOp::Neg => "neg",
            ArithmeticOp::Eq => "eq",
            ArithmeticOp::Gt => "gt",
            ArithmeticOp::Lt => "lt",
            ArithmeticOp::And => "and",
            ArithmeticOp::Or => "or",
            ArithmeticOp::Not => "not",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            ArithmeticOp::Neg | ArithmeticOp::Not => Arity::Unary,
            ArithmeticOp::Add | ArithmeticOp::Sub | ArithmeticOp::And | ArithmeticOp::Or => {
                Arity::Binary
            }
            ArithmeticOp::Eq | ArithmeticOp::Gt | ArithmeticOp::Lt => Arity::Comparison,
        }
    }
}

impl FromStr for ArithmeticOp {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(ArithmeticOp::Add),
            "sub" => Ok(ArithmeticOp::Sub),
            "neg" => Ok(ArithmeticOp::Neg),
            "eq" => Ok(ArithmeticOp::Eq),
            "gt" => Ok(ArithmeticOp::Gt),
            "lt" => Ok(ArithmeticOp::Lt),
            "and" => Ok(ArithmeticOp::And),
            "or" => Ok(ArithmeticOp::Or),
            "not" => Ok(ArithmeticOp::Not),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Command {
    // Stack Basics
    Arithmetic(ArithmeticOp),
    Push(Segment, u16),
    Pop(Segment, u16),

    // Control
    Label(String),
    Goto(String),
    IfGoto(String),

    // Functions
    Function(String, u16),
    Call(String, u16),
    Return,

    /// Start of a new source file; carries its name for diagnostics.
    NewUnit(String),
}

impl Command {
    /// Builds a push, rejecting indices the target segment cannot hold.
    pub fn push(segment: Segment, index: u16) -> Result<Command, SegmentError> {
        check_index(segment, index)?;
        Ok(Command::Push(segment, index))
    }

    /// Builds a pop. The constant segment is read-only.
    pub fn pop(segment: Segment, index: u16) -> Result<Command, SegmentError> {
        if segment == Segment::Constant {
            return Err(SegmentError::PopConstant);
        }
        check_index(segment, index)?;
        Ok(Command::Pop(segment, index))
    }
}

fn check_index(segment: Segment, index: u16) -> Result<(), SegmentError> {
    match segment {
        Segment::Pointer if index > 1 => Err(SegmentError::PointerOutOfRange(index)),
        Segment::Temp if index > 7 => Err(SegmentError::TempOutOfRange(index)),
        Segment::Constant if index > MAX_CONSTANT => Err(SegmentError::ConstantOutOfRange(index)),
        Segment::Local | Segment::Argument | Segment::This | Segment::That
            if index > MAX_CONSTANT =>
        {
            Err(SegmentError::OffsetOutOfRange(segment, index))
        }
        _ => Ok(()),
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Arithmetic(op) => write!(f, "{}", op),
            Command::Push(seg, arg) => write!(f, "push {} {}", seg, arg),
            Command::Pop(seg, arg) => write!(f, "pop {} {}", seg, arg),
            Command::Label(sym) => write!(f, "label {}", sym),
            Command::Goto(sym) => write!(f, "goto {}", sym),
            Command::IfGoto(sym) => write!(f, "if-goto {}", sym),
            Command::Function(name, locals) => write!(f, "function {} {}", name, locals),
            Command::Call(name, args) => write!(f, "call {} {}", name, args),
            Command::Return => f.write_str("return"),
            Command::NewUnit(name) => write!(f, "unit {}", name),
        }
    }
}

#[test]
fn test_pop_constant_rejected() {
    assert_eq!(
        Command::pop(Segment::Constant, 0),
        Err(SegmentError::PopConstant)
    );
}

#[test]
fn test_segment_ranges() {
    assert_eq!(
        Command::push(Segment::Pointer, 1),
        Ok(Command::Push(Segment::Pointer, 1))
    );
    assert_eq!(
        Command::pop(Segment::Pointer, 2),
        Err(SegmentError::PointerOutOfRange(2))
    );
    assert_eq!(
        Command::push(Segment::Temp, 8),
        Err(SegmentError::TempOutOfRange(8))
    );
    assert_eq!(
        Command::push(Segment::Constant, 32768),
        Err(SegmentError::ConstantOutOfRange(32768))
    );
    assert!(Command::push(Segment::Static, 240).is_ok());
}

#[test]
fn test_offsets_fit_an_a_instruction() {
    assert!(Command::push(Segment::Local, MAX_CONSTANT).is_ok());
    assert_eq!(
        Command::push(Segment::Local, 40000),
        Err(SegmentError::OffsetOutOfRange(Segment::Local, 40000))
    );
    assert_eq!(
        Command::pop(Segment::That, 32768),
        Err(SegmentError::OffsetOutOfRange(Segment::That, 32768))
    );
}

#[test]
fn test_display_is_source_text() {
    assert_eq!(Command::Push(Segment::Local, 3).to_string(), "push local 3");
    assert_eq!(Command::Arithmetic(ArithmeticOp::Gt).to_string(), "gt");
    assert_eq!(
        Command::IfGoto("LOOP".to_string()).to_string(),
        "if-goto LOOP"
    );
    assert_eq!(
        Command::Call("Math.multiply".to_string(), 2).to_string(),
        "call Math.multiply 2"
    );
}

#[test]
fn test_arity() {
    assert_eq!(ArithmeticOp::Not.arity(), Arity::Unary);
    assert_eq!(ArithmeticOp::Sub.arity(), Arity::Binary);
    assert_eq!(ArithmeticOp::Lt.arity(), Arity::Comparison);
}
