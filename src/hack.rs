//! A small Hack assembler and CPU for executing generated code in tests.

use std::collections::HashMap;

pub const SP: usize = 0;
pub const LCL: usize = 1;
pub const ARG: usize = 2;
pub const THIS: usize = 3;
pub const THAT: usize = 4;

const RAM_SIZE: usize = 1 << 15;

#[derive(Debug, Clone)]
enum Instr {
    A(u16),
    C {
        dest: String,
        comp: String,
        jump: String,
    },
}

fn predefined(symbol: &str) -> Option<u16> {
    let addr = match symbol {
        "SP" => 0,
        "LCL" => 1,
        "ARG" => 2,
        "THIS" => 3,
        "THAT" => 4,
        "SCREEN" => 16384,
        "KBD" => 24576,
        _ => return symbol.strip_prefix('R')?.parse().ok().filter(|r| *r < 16),
    };
    Some(addr)
}

fn code_part(line: &str) -> &str {
    line.split_once("//").map(|(s, _)| s).unwrap_or(line).trim()
}

fn assemble(lines: &[String]) -> Vec<Instr> {
    let mut labels: HashMap<String, u16> = HashMap::new();
    let mut count = 0u16;
    for line in lines.iter().map(|l| code_part(l)) {
        if let Some(label) = line.strip_prefix('(').and_then(|l| l.strip_suffix(')')) {
            assert!(
                labels.insert(label.to_string(), count).is_none(),
                "label {} declared twice",
                label
            );
        } else if !line.is_empty() {
            count += 1;
        }
    }

    let mut variables: HashMap<String, u16> = HashMap::new();
    let mut rom = vec![];
    for line in lines.iter().map(|l| code_part(l)) {
        if line.is_empty() || line.starts_with('(') {
            continue;
        }
        if let Some(symbol) = line.strip_prefix('@') {
            let value = symbol
                .parse()
                .ok()
                .or_else(|| predefined(symbol))
                .or_else(|| labels.get(symbol).copied())
                .unwrap_or_else(|| {
                    let next = 16 + variables.len() as u16;
                    *variables.entry(symbol.to_string()).or_insert(next)
                });
            rom.push(Instr::A(value));
        } else {
            let (dest, rest) = line.split_once('=').unwrap_or(("", line));
            let (comp, jump) = rest.split_once(';').unwrap_or((rest, ""));
            rom.push(Instr::C {
                dest: dest.to_string(),
                comp: comp.to_string(),
                jump: jump.to_string(),
            });
        }
    }
    rom
}

pub struct Machine {
    pub ram: Vec<i16>,
    rom: Vec<Instr>,
    a: i16,
    d: i16,
    pc: usize,
}

impl Machine {
    pub fn new(lines: &[String]) -> Self {
        Machine {
            ram: vec![0; RAM_SIZE],
            rom: assemble(lines),
            a: 0,
            d: 0,
            pc: 0,
        }
    }

    fn operand(&self, c: char) -> i16 {
        match c {
            'A' => self.a,
            'D' => self.d,
            'M' => self.ram[self.a as u16 as usize % RAM_SIZE],
            '0' => 0,
            '1' => 1,
            _ => panic!("bad operand {}", c),
        }
    }

    fn eval(&self, comp: &str) -> i16 {
        let chars: Vec<char> = comp.chars().collect();
        match chars.as_slice() {
            ['-', '1'] => -1,
            ['!', x] => !self.operand(*x),
            ['-', x] => self.operand(*x).wrapping_neg(),
            [x] => self.operand(*x),
            [x, op, y] => {
                let (x, y) = (self.operand(*x), self.operand(*y));
                match op {
                    '+' => x.wrapping_add(y),
                    '-' => x.wrapping_sub(y),
                    '&' => x & y,
                    '|' => x | y,
                    _ => panic!("bad comp {}", comp),
                }
            }
            _ => panic!("bad comp {}", comp),
        }
    }

    fn step(&mut self) {
        match self.rom[self.pc].clone() {
            Instr::A(value) => {
                self.a = value as i16;
                self.pc += 1;
            }
            Instr::C { dest, comp, jump } => {
                let value = self.eval(&comp);
                let old_a = self.a;
                if dest.contains('M') {
                    self.ram[old_a as u16 as usize % RAM_SIZE] = value;
                }
                if dest.contains('A') {
                    self.a = value;
                }
                if dest.contains('D') {
                    self.d = value;
                }
                let taken = match jump.as_str() {
                    "" => false,
                    "JGT" => value > 0,
                    "JEQ" => value == 0,
                    "JGE" => value >= 0,
                    "JLT" => value < 0,
                    "JNE" => value != 0,
                    "JLE" => value <= 0,
                    "JMP" => true,
                    _ => panic!("bad jump {}", jump),
                };
                self.pc = if taken {
                    old_a as u16 as usize
                } else {
                    self.pc + 1
                };
            }
        }
    }

    /// Runs until the program counter falls off the end of the program.
    pub fn run(&mut self, max_steps: usize) {
        for _ in 0..max_steps {
            if self.pc >= self.rom.len() {
                return;
            }
            self.step();
        }
        panic!("program did not halt within {} steps", max_steps);
    }

    pub fn sp(&self) -> usize {
        self.ram[SP] as usize
    }

    /// Value `depth` words below the stack top (0 is the top).
    pub fn peek(&self, depth: usize) -> i16 {
        self.ram[self.sp() - 1 - depth]
    }
}

#[test]
fn test_machine_runs_add() {
    let program: Vec<String> = ["@2", "D=A", "@3", "D=D+A", "@0", "M=D"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut machine = Machine::new(&program);
    machine.run(100);
    assert_eq!(machine.ram[0], 5);
}

#[test]
fn test_machine_labels_and_jumps() {
    let program: Vec<String> = [
        "@R1", "M=0", "(LOOP)", "@R1", "M=M+1", "D=M", "@5", "D=D-A", "@LOOP", "D;JLT",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let mut machine = Machine::new(&program);
    machine.run(1000);
    assert_eq!(machine.ram[1], 5);
}
