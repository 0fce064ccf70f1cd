use std::fmt::Display;

use log::{debug, trace};

use crate::{
    ast::{ArithmeticOp, Arity, Command, Segment, MAX_CONSTANT, RESERVED_PREFIX},
    error::Error,
};

// TODO: Consider using a static-level string interner for this module
macro_rules! svec {
    ($($x:expr),*) => (vec![$($x.to_string()),*]);
}

const POINTER_BASE: usize = 3;
const TEMP_BASE: usize = 5;
const STATIC_BASE: usize = 16;
const STATIC_LAST: usize = 255;

/// Return address plus the four saved segment pointers.
const SAVED_FRAME: usize = 5;

fn at_c(arg: impl Display) -> String {
    format!("@{arg}", arg = arg)
}

fn at_s(arg: &str) -> String {
    format!("@{arg}", arg = arg)
}

fn decl(label: &str) -> String {
    format!("({})", label)
}

/// Where a segment access lands in machine memory.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum Address {
    /// Not memory at all: load the value itself.
    Immediate(u16),
    /// Fixed RAM cell.
    Direct(usize),
    /// Named base pointer plus offset.
    Indirect(&'static str, u16),
}

fn base_pointer(segment: Segment) -> Option<&'static str> {
    match segment {
        Segment::Local => Some("LCL"),
        Segment::Argument => Some("ARG"),
        Segment::This => Some("THIS"),
        Segment::That => Some("THAT"),
        _ => None,
    }
}

/// Writes D to the stack top and bumps SP.
fn push_d() -> Vec<String> {
    svec![
        "@SP",
        "M=M+1",
        "A=M-1", // Don't need to refetch SP; this is safe
        "M=D"
    ]
}

/// SP--, popped value in D.
fn pop_d() -> Vec<String> {
    svec!["@SP", "AM=M-1", "D=M"]
}

fn simple_un_op(comp: &str) -> Vec<String> {
    svec!["@SP", "A=M-1", format!("M={}", comp)]
}

// i.e. no conditions or jumps, just pop and run
fn simple_bin_op(comp: &str) -> Vec<String> {
    svec![
        "@SP",
        "AM=M-1",             // SP--, looking at top of stack now
        "D=M",                // Right arg in D
        "A=A-1",              // Looking at second arg of stack, will overwrite
        format!("M={}", comp) // Op and overwrite second element
    ]
}

/// Knobs for one translation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Emit the stack setup and jump to `entry` before everything else.
    pub bootstrap: bool,
    /// Echo each command as a `//` comment above its code.
    pub comments: bool,
    /// Initial SP value set by the bootstrap.
    pub stack_base: u16,
    /// Function the bootstrap jumps to.
    pub entry: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            bootstrap: true,
            comments: true,
            stack_base: 256,
            entry: "Sys.init".to_string(),
        }
    }
}

/// Stateful Hack code generator. One per translation run.
pub struct Translator {
    options: Options,
    gen_sym: usize,
    static_base: usize,
    static_high: Option<usize>,
}

impl Default for Translator {
    fn default() -> Self {
        Translator::new(Options::default())
    }
}

impl Translator {
    pub fn new(options: Options) -> Self {
        Translator {
            options,
            gen_sym: 0,
            static_base: 0,
            static_high: None,
        }
    }

    fn next_gen_sym(&mut self) -> usize {
        let tmp = self.gen_sym;
        self.gen_sym += 1;
        tmp
    }

    /// Unique label under [`RESERVED_PREFIX`], e.g. `VM$TRUE.3`.
    fn fresh_label(&mut self, kind: &str) -> String {
        format!("{}{}.{}", RESERVED_PREFIX, kind, self.next_gen_sym())
    }

    /// Machine address of a unit-relative static index.
    fn static_address(&mut self, index: u16) -> Result<usize, Error> {
        let address = STATIC_BASE + self.static_base + index as usize;
        if address > STATIC_LAST {
            return Err(Error::StaticOverflow { index, address });
        }
        let index = index as usize;
        if self.static_high.map_or(true, |high| index > high) {
            self.static_high = Some(index);
        }
        Ok(address)
    }

    fn new_unit(&mut self, name: &str) {
        if let Some(high) = self.static_high.take() {
            self.static_base += high + 1;
        }
        debug!(
            "unit {}: statics start at RAM[{}]",
            name,
            STATIC_BASE + self.static_base
        );
    }

    fn resolve(&mut self, segment: Segment, index: u16) -> Result<Address, Error> {
        let invalid = Error::InvalidSegment { segment, index };
        let address = match segment {
            Segment::Constant if index <= MAX_CONSTANT => Address::Immediate(index),
            Segment::Pointer if index <= 1 => Address::Direct(POINTER_BASE + index as usize),
            Segment::Temp if index <= 7 => Address::Direct(TEMP_BASE + index as usize),
            Segment::Static => Address::Direct(self.static_address(index)?),
            _ => match base_pointer(segment) {
                Some(base) if index <= MAX_CONSTANT => Address::Indirect(base, index),
                _ => return Err(invalid),
            },
        };
        Ok(address)
    }

    fn push(&mut self, segment: Segment, arg: u16) -> Result<Vec<String>, Error> {
        let mut code = match self.resolve(segment, arg)? {
            Address::Immediate(value) => svec![at_c(value), "D=A"],
            Address::Direct(addr) => svec![at_c(addr), "D=M"],
            Address::Indirect(base, 0) => svec![at_s(base), "A=M", "D=M"],
            Address::Indirect(base, offset) => svec![
                at_c(offset),
                "D=A",
                at_s(base),
                "A=D+M", // A = SEG+arg
                "D=M"    // D = value to push
            ],
        };
        code.extend(push_d());
        Ok(code)
    }

    fn pop(&mut self, segment: Segment, arg: u16) -> Result<Vec<String>, Error> {
        let code = match self.resolve(segment, arg)? {
            Address::Immediate(_) => return Err(Error::InvalidSegment { segment, index: arg }),
            Address::Direct(addr) => {
                let mut code = pop_d();
                code.extend(svec![at_c(addr), "M=D"]);
                code
            }
            Address::Indirect(base, 0) => {
                let mut code = pop_d();
                code.extend(svec![at_s(base), "A=M", "M=D"]);
                code
            }
            Address::Indirect(base, offset) => {
                let mut code = svec![
                    at_c(offset),
                    "D=A",
                    at_s(base),
                    "D=D+M", // D = SEG+arg
                    "@R13",
                    "M=D" // Store target addr in R13
                ];
                code.extend(pop_d());
                code.extend(svec![
                    "@R13",
                    "A=M", // At the target address...
                    "M=D"  // ... store the popped val
                ]);
                code
            }
        };
        Ok(code)
    }

    fn compare(&mut self, jump: &str) -> Vec<String> {
        let cmp_sym = self.fresh_label("TRUE");
        let end_sym = self.fresh_label("CONTINUE");
        svec![
            "@SP",
            "AM=M-1", // SP--, looking at top of stack now
            "D=M",    // Right arg in D
            "A=A-1",  // Looking at second arg of stack, will overwrite
            "D=M-D",
            at_s(&cmp_sym),
            format!("D;{}", jump),
            "D=0",
            at_s(&end_sym),
            "0;JMP",
            decl(&cmp_sym),
            "D=-1",
            decl(&end_sym),
            "@SP",
            "A=M-1",
            "M=D"
        ]
    }

    fn arithmetic(&mut self, op: ArithmeticOp) -> Vec<String> {
        let mnemonic = match op {
            ArithmeticOp::Neg => "-M",
            ArithmeticOp::Not => "!M",
            ArithmeticOp::Add => "D+M",
            ArithmeticOp::Sub => "M-D",
            ArithmeticOp::And => "D&M",
            ArithmeticOp::Or => "D|M",
            ArithmeticOp::Eq => "JEQ",
            ArithmeticOp::Gt => "JGT",
            ArithmeticOp::Lt => "JLT",
        };
        match op.arity() {
            Arity::Unary => simple_un_op(mnemonic),
            Arity::Binary => simple_bin_op(mnemonic),
            Arity::Comparison => self.compare(mnemonic),
        }
    }

    fn label(&self, label: &str) -> Vec<String> {
        svec![decl(label)]
    }

    fn goto(&self, label: &str) -> Vec<String> {
        svec![
            at_s(label),
            "0;JMP" // Unconditional jump
        ]
    }

    fn if_goto(&self, label: &str) -> Vec<String> {
        let mut code = pop_d();
        code.extend(svec![
            at_s(label),
            "D;JNE" // False is 0
        ]);
        code
    }

    fn function(&mut self, name: &str, locals: u16) -> Result<Vec<String>, Error> {
        let mut code = svec![decl(name)];
        for _ in 0..locals {
            code.extend(self.push(Segment::Constant, 0)?);
        }
        Ok(code)
    }

    fn call(&mut self, name: &str, args: u16) -> Vec<String> {
        let ret_sym = self.fresh_label("RETURN");
        let mut code = svec![at_s(&ret_sym), "D=A"];
        code.extend(push_d());
        for saved in ["LCL", "ARG", "THIS", "THAT"] {
            code.extend(svec![at_s(saved), "D=M"]);
            code.extend(push_d());
        }
        code.extend(svec![
            "@SP",
            "D=M",
            "@LCL",
            "M=D", // LCL = SP
            at_c(args as usize + SAVED_FRAME),
            "D=D-A",
            "@ARG",
            "M=D", // ARG = SP - args - 5
            at_s(name),
            "0;JMP",
            decl(&ret_sym)
        ]);
        code
    }

    fn ret(&self) -> Vec<String> {
        let mut code = svec![
            "@SP",
            "A=M-1",
            "D=M",
            "@R13",
            "M=D", // R13 = return value
            "@ARG",
            "D=M",
            "@R14",
            "M=D", // R14 = caller's stack top, less the args
            "@LCL",
            "D=M",
            "@SP",
            "M=D" // Drop the callee's working stack
        ];
        for restored in ["THAT", "THIS", "ARG", "LCL"] {
            code.extend(pop_d());
            code.extend(svec![at_s(restored), "M=D"]);
        }
        code.extend(pop_d());
        code.extend(svec![
            "@R15",
            "M=D", // R15 = return address
            "@R14",
            "D=M",
            "@SP",
            "M=D", // Reclaim the whole frame
            "@R13",
            "D=M"
        ]);
        code.extend(push_d());
        code.extend(svec!["@R15", "A=M", "0;JMP"]);
        code
    }

    /// Stack setup and jump to the entry function.
    pub fn bootstrap(&self) -> Vec<String> {
        svec![
            at_c(self.options.stack_base),
            "D=A",
            "@SP",
            "M=D",
            at_s(&self.options.entry),
            "0;JMP"
        ]
    }

    pub fn translate_command(&mut self, command: &Command) -> Result<Vec<String>, Error> {
        trace!("{}", command);
        let translated = match command {
            Command::Push(seg, arg) => self.push(*seg, *arg)?,
            Command::Pop(seg, arg) => self.pop(*seg, *arg)?,
            Command::Arithmetic(op) => self.arithmetic(*op),
            Command::Label(sym) => self.label(sym),
            Command::Goto(sym) => self.goto(sym),
            Command::IfGoto(sym) => self.if_goto(sym),
            Command::Function(name, locals) => self.function(name, *locals)?,
            Command::Call(name, args) => self.call(name, *args),
            Command::Return => self.ret(),
            Command::NewUnit(name) => {
                self.new_unit(name);
                return Ok(vec![]);
            }
        };

        if self.options.comments {
            let mut annotated = vec![format!("// {}", command)];
            annotated.extend(translated);
            Ok(annotated)
        } else {
            Ok(translated)
        }
    }

    /// Translates a whole command stream, stopping at the first error.
    pub fn translate<I>(&mut self, commands: I) -> Result<Vec<String>, Error>
    where
        I: IntoIterator<Item = Result<Command, Error>>,
    {
        let mut instructions: Vec<String> = vec![];

        if self.options.bootstrap {
            if self.options.comments {
                instructions.push("// bootstrap".to_string());
            }
            instructions.extend(self.bootstrap());
        }

        for command in commands {
            let translated = self.translate_command(&command?)?;
            for line in translated {
                instructions.push(line);
            }
        }

        debug!(
            "{} lines emitted, {} labels generated, {} static cells",
            instructions.len(),
            self.gen_sym,
            self.static_base + self.static_high.map_or(0, |high| high + 1)
        );
        Ok(instructions)
    }
}
