//! Lowers the syntax tree into a flat instruction sequence for the VM.
//!
//! Forward jumps (out of an `if` branch or a `while` loop) are emitted with a
//! placeholder target and patched once the destination index is known.

use crate::ast::{BinOp, Expr, Stmt};
use crate::vm::{Chunk, Instruction};

const JUMP_PLACEHOLDER: usize = usize::MAX;

#[derive(Default)]
pub struct Generator {
    chunk: Chunk,
}

impl Generator {
    pub fn new() -> Self {
        Generator {
            chunk: Chunk::new(),
        }
    }

    /// Generates code for a whole program and terminates it with `Halt`.
    pub fn generate(mut self, program: &Stmt) -> Chunk {
        self.stmt(program);
        self.chunk.emit(Instruction::Halt);
        debug_assert_eq!(self.chunk.verify_targets(), Ok(()));
        self.chunk
    }

    fn emit(&mut self, instruction: Instruction) -> usize {
        self.chunk.emit(instruction)
    }

    /// Patches the jump at `at` to land on the next instruction to be emitted.
    fn patch_here(&mut self, at: usize) {
        let here = self.chunk.here();
        self.chunk.patch_jump(at, here);
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Empty => {}
            Stmt::Sequence(stmts) => {
                for stmt in stmts {
                    self.stmt(stmt);
                }
            }
            Stmt::Expr(expr) => {
                self.expr(expr);
                self.emit(Instruction::Pop);
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch: None,
            } => {
                self.expr(cond);
                let skip_then = self.emit(Instruction::JumpIfZero(JUMP_PLACEHOLDER));
                self.stmt(then_branch);
                self.patch_here(skip_then);
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch: Some(else_branch),
            } => {
                self.expr(cond);
                let to_else = self.emit(Instruction::JumpIfZero(JUMP_PLACEHOLDER));
                self.stmt(then_branch);
                let to_end = self.emit(Instruction::Jump(JUMP_PLACEHOLDER));
                self.patch_here(to_else);
                self.stmt(else_branch);
                self.patch_here(to_end);
            }
            Stmt::While { cond, body } => {
                let top = self.chunk.here();
                self.expr(cond);
                let exit = self.emit(Instruction::JumpIfZero(JUMP_PLACEHOLDER));
                self.stmt(body);
                self.emit(Instruction::Jump(top));
                self.patch_here(exit);
            }
            Stmt::DoWhile { body, cond } => {
                let top = self.chunk.here();
                self.stmt(body);
                self.expr(cond);
                self.emit(Instruction::JumpIfNotZero(top));
            }
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Const(value) => {
                self.emit(Instruction::PushConst(*value));
            }
            Expr::Var(var) => {
                self.emit(Instruction::FetchVar(*var));
            }
            Expr::Assign { target, value } => {
                self.expr(value);
                self.emit(Instruction::StoreVar(*target));
            }
            Expr::BinaryOp { op, left, right } => {
                self.expr(left);
                self.expr(right);
                self.emit(match op {
                    BinOp::Add => Instruction::Add,
                    BinOp::Sub => Instruction::Sub,
                    BinOp::Less => Instruction::LessThan,
                });
            }
        }
    }
}

pub fn generate(program: &Stmt) -> Chunk {
    Generator::new().generate(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    fn assert_bytecode_eq(program: &str, expected: &str) {
        let chunk = generate(&parse(program).unwrap());
        assert_eq!(
            chunk.to_string(),
            expected,
            "\nInput: \t{program}\nBytecode:\n{}",
            chunk.disassemble(program)
        );
    }

    #[test]
    fn test_expression_statements() {
        assert_bytecode_eq("1;", "PushConst(1) Pop Halt");
        assert_bytecode_eq("a-b+1;", "Fetch(a) Fetch(b) Sub PushConst(1) Add Pop Halt");
        assert_bytecode_eq("a<(b+1);", "Fetch(a) Fetch(b) PushConst(1) Add LessThan Pop Halt");
    }

    #[test]
    fn test_chained_assignment() {
        assert_bytecode_eq(
            "a=b=c=2<3;",
            "PushConst(2) PushConst(3) LessThan Store(c) Store(b) Store(a) Pop Halt",
        );
    }

    #[test]
    fn test_empty_and_sequence() {
        assert_bytecode_eq(";", "Halt");
        assert_bytecode_eq("{}", "Halt");
        assert_bytecode_eq(
            "{ a=1; ; b=2; }",
            "PushConst(1) Store(a) Pop PushConst(2) Store(b) Pop Halt",
        );
    }

    #[test]
    fn test_if() {
        assert_bytecode_eq(
            "if (a) b=1;",
            "Fetch(a) JumpIfZero(5) PushConst(1) Store(b) Pop Halt",
        );
        assert_bytecode_eq("if (a) ;", "Fetch(a) JumpIfZero(2) Halt");
    }

    #[test]
    fn test_if_else() {
        assert_bytecode_eq(
            "if (a) b=1; else b=2;",
            "Fetch(a) JumpIfZero(6) PushConst(1) Store(b) Pop Jump(9) PushConst(2) Store(b) Pop Halt",
        );
        assert_bytecode_eq(
            "if (a) ; else ;",
            "Fetch(a) JumpIfZero(3) Jump(3) Halt",
        );
    }

    #[test]
    fn test_while() {
        assert_bytecode_eq(
            "while (i<100) i=i+i;",
            "Fetch(i) PushConst(100) LessThan JumpIfZero(10) Fetch(i) Fetch(i) Add Store(i) Pop Jump(0) Halt",
        );
        assert_bytecode_eq("while (1) ;", "PushConst(1) JumpIfZero(3) Jump(0) Halt");
    }

    #[test]
    fn test_do_while() {
        assert_bytecode_eq(
            "{ i=1; do i=i+10; while (i<50); }",
            "PushConst(1) Store(i) Pop \
             Fetch(i) PushConst(10) Add Store(i) Pop \
             Fetch(i) PushConst(50) LessThan JumpIfNotZero(3) Halt",
        );
    }

    #[test]
    fn test_nested_jumps_are_patched() {
        let chunk = generate(
            &parse("{ i=125; j=100; while (i-j) if (i<j) j=j-i; else i=i-j; }").unwrap(),
        );
        assert_eq!(chunk.verify_targets(), Ok(()));
        assert!(chunk
            .instructions()
            .iter()
            .all(|ins| ins.jump_target() != Some(JUMP_PLACEHOLDER)));
        assert_eq!(chunk.instructions().last(), Some(&Instruction::Halt));
    }
}
