use std::fmt::{self, Display, Write};

use log::trace;

use crate::ast::{Var, VAR_COUNT};

/// Stack machine instructions. Jump operands are indices into the chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    PushConst(i64),
    FetchVar(Var),
    StoreVar(Var),
    Add,
    Sub,
    LessThan,
    Jump(usize),
    JumpIfZero(usize),
    JumpIfNotZero(usize),
    Pop,
    Halt,
}

impl Instruction {
    pub fn jump_target(&self) -> Option<usize> {
        match *self {
            Instruction::Jump(target)
            | Instruction::JumpIfZero(target)
            | Instruction::JumpIfNotZero(target) => Some(target),
            _ => None,
        }
    }

    fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::PushConst(_) => "OP_PUSH_CONST",
            Instruction::FetchVar(_) => "OP_FETCH",
            Instruction::StoreVar(_) => "OP_STORE",
            Instruction::Add => "OP_ADD",
            Instruction::Sub => "OP_SUB",
            Instruction::LessThan => "OP_LESS",
            Instruction::Jump(_) => "OP_JUMP",
            Instruction::JumpIfZero(_) => "OP_JUMP_IF_ZERO",
            Instruction::JumpIfNotZero(_) => "OP_JUMP_IF_NOT_ZERO",
            Instruction::Pop => "OP_POP",
            Instruction::Halt => "OP_HALT",
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::PushConst(value) => write!(f, "PushConst({value})"),
            Instruction::FetchVar(var) => write!(f, "Fetch({var})"),
            Instruction::StoreVar(var) => write!(f, "Store({var})"),
            Instruction::Add => f.write_str("Add"),
            Instruction::Sub => f.write_str("Sub"),
            Instruction::LessThan => f.write_str("LessThan"),
            Instruction::Jump(target) => write!(f, "Jump({target})"),
            Instruction::JumpIfZero(target) => write!(f, "JumpIfZero({target})"),
            Instruction::JumpIfNotZero(target) => write!(f, "JumpIfNotZero({target})"),
            Instruction::Pop => f.write_str("Pop"),
            Instruction::Halt => f.write_str("Halt"),
        }
    }
}

/// A flat, append-only instruction sequence whose jump targets can be patched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    codes: Vec<Instruction>,
}

impl Chunk {
    pub fn new() -> Self {
        Chunk { codes: Vec::new() }
    }

    /// Appends `instruction` and returns its index.
    pub fn emit(&mut self, instruction: Instruction) -> usize {
        self.codes.push(instruction);
        self.codes.len() - 1
    }

    /// Index the next emitted instruction will get.
    pub fn here(&self) -> usize {
        self.codes.len()
    }

    /// Points the jump at `at` to `target`.
    ///
    /// Panics if `at` does not hold a jump, which would be a code generator bug.
    pub fn patch_jump(&mut self, at: usize, target: usize) {
        match &mut self.codes[at] {
            Instruction::Jump(t) | Instruction::JumpIfZero(t) | Instruction::JumpIfNotZero(t) => {
                *t = target
            }
            other => unreachable!("instruction {at} is {other}, not a jump"),
        }
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.codes.get(index)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.codes
    }

    /// Returns the index of the first jump whose target lies outside the chunk.
    pub fn verify_targets(&self) -> Result<(), usize> {
        match self
            .codes
            .iter()
            .position(|ins| ins.jump_target().is_some_and(|t| t >= self.codes.len()))
        {
            Some(at) => Err(at),
            None => Ok(()),
        }
    }

    pub fn disassemble(&self, name: &str) -> String {
        Disassembly { chunk: self, name }.to_string()
    }
}

/// Offset-per-line listing with a `== name ==` header.
struct Disassembly<'a> {
    chunk: &'a Chunk,
    name: &'a str,
}

impl Display for Disassembly<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.name)?;
        for (offset, ins) in self.chunk.codes.iter().enumerate() {
            let mnemonic = ins.mnemonic();
            match ins {
                Instruction::PushConst(value) => writeln!(f, "{offset:04} {mnemonic:20} {value}")?,
                Instruction::FetchVar(var) | Instruction::StoreVar(var) => {
                    writeln!(f, "{offset:04} {mnemonic:20} {var}")?
                }
                Instruction::Jump(target)
                | Instruction::JumpIfZero(target)
                | Instruction::JumpIfNotZero(target) => {
                    writeln!(f, "{offset:04} {mnemonic:20} -> {target:04}")?
                }
                _ => writeln!(f, "{offset:04} {mnemonic}")?,
            }
        }
        Ok(())
    }
}

/// Compact listing, e.g. `PushConst(1) Store(a) Pop Halt`.
impl Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ins) in self.codes.iter().enumerate() {
            if i > 0 {
                f.write_char(' ')?;
            }
            write!(f, "{ins}")?;
        }
        Ok(())
    }
}

/// The 26 global variables, `a` through `z`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Variables {
    slots: [i64; VAR_COUNT],
}

impl Variables {
    pub fn new() -> Self {
        Variables {
            slots: [0; VAR_COUNT],
        }
    }

    pub fn get(&self, var: Var) -> i64 {
        self.slots[var.index()]
    }

    pub fn set(&mut self, var: Var, value: i64) {
        self.slots[var.index()] = value;
    }

    /// Looks a variable up by its letter, `None` if `name` is not `a`..`z`.
    pub fn by_name(&self, name: char) -> Option<i64> {
        Var::from_char(name).map(|var| self.get(var))
    }

    /// Variables holding a nonzero value, in alphabetical order.
    pub fn nonzero(&self) -> impl Iterator<Item = (Var, i64)> + '_ {
        Var::all()
            .map(|var| (var, self.get(var)))
            .filter(|&(_, value)| value != 0)
    }
}

/// One `<letter> = <value>` line per nonzero variable.
impl Display for Variables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (var, value) in self.nonzero() {
            writeln!(f, "{var} = {value}")?;
        }
        Ok(())
    }
}

pub struct VM {
    ip: usize,
    stack: Vec<i64>,
    globals: Variables,
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}

impl VM {
    pub fn new() -> Self {
        VM {
            ip: 0,
            stack: Vec::with_capacity(64),
            globals: Variables::new(),
        }
    }

    fn push(&mut self, value: i64) {
        self.stack.push(value);
    }

    // An empty stack here means the generated code is broken, not the input.
    fn pop(&mut self) -> i64 {
        match self.stack.pop() {
            Some(value) => value,
            None => unreachable!("operand stack underflow at instruction {}", self.ip - 1),
        }
    }

    fn peek(&self) -> i64 {
        match self.stack.last() {
            Some(&value) => value,
            None => unreachable!("operand stack underflow at instruction {}", self.ip - 1),
        }
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn stack(&self) -> &[i64] {
        &self.stack
    }

    pub fn globals(&self) -> &Variables {
        &self.globals
    }

    /// Runs `chunk` from its first instruction until `Halt` or until the
    /// instruction pointer falls off the end. Every run starts from zeroed
    /// variables and an empty stack.
    pub fn run(&mut self, chunk: &Chunk) -> &Variables {
        self.ip = 0;
        self.stack.clear();
        self.globals = Variables::new();
        while self.step(chunk) {}
        &self.globals
    }

    /// Executes one instruction. Returns `false` once execution has halted.
    pub fn step(&mut self, chunk: &Chunk) -> bool {
        let instruction = match chunk.get(self.ip) {
            Some(&instruction) => instruction,
            None => return false,
        };
        trace!("{:04} {instruction} {:?}", self.ip, self.stack);
        self.ip += 1;

        match instruction {
            Instruction::PushConst(value) => self.push(value),
            Instruction::FetchVar(var) => self.push(self.globals.get(var)),
            Instruction::StoreVar(var) => {
                // The stored value stays on the stack as the assignment's value.
                let value = self.peek();
                self.globals.set(var, value);
            }
            Instruction::Add => {
                let y = self.pop();
                let x = self.pop();
                self.push(x.wrapping_add(y));
            }
            Instruction::Sub => {
                let y = self.pop();
                let x = self.pop();
                self.push(x.wrapping_sub(y));
            }
            Instruction::LessThan => {
                let y = self.pop();
                let x = self.pop();
                self.push(i64::from(x < y));
            }
            Instruction::Jump(target) => self.ip = target,
            Instruction::JumpIfZero(target) => {
                if self.pop() == 0 {
                    self.ip = target;
                }
            }
            Instruction::JumpIfNotZero(target) => {
                if self.pop() != 0 {
                    self.ip = target;
                }
            }
            Instruction::Pop => {
                self.pop();
            }
            Instruction::Halt => return false,
        }
        true
    }
}

/// Runs `chunk` on a fresh machine and returns the final variables.
pub fn execute(chunk: &Chunk) -> Variables {
    *VM::new().run(chunk)
}
