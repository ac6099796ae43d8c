//! Syntax tree produced by the parser and consumed by the code generator.

use std::fmt::{self, Display};

/// Number of predeclared variables, `a` through `z`.
pub const VAR_COUNT: usize = 26;

/// One of the 26 global variables, stored as its index (`letter - 'a'`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(u8);

impl Var {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'a'..='z' => Some(Var(c as u8 - b'a')),
            _ => None,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        if index < VAR_COUNT {
            Some(Var(index as u8))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn name(self) -> char {
        (b'a' + self.0) as char
    }

    /// All variables in alphabetical order.
    pub fn all() -> impl Iterator<Item = Var> {
        (0..VAR_COUNT as u8).map(Var)
    }
}

impl Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Less,
}

impl Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Less => "<",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Const(i64),
    Var(Var),
    Assign {
        target: Var,
        value: Box<Expr>,
    },
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// A bare `;`.
    Empty,
    /// A `{ ... }` block.
    Sequence(Vec<Stmt>),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    /// `expr;`, the value is computed and then dropped.
    Expr(Expr),
}

impl Expr {
    pub fn assign(target: Var, value: Expr) -> Self {
        Expr::Assign {
            target,
            value: Box::new(value),
        }
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn is_atom(&self) -> bool {
        matches!(self, Expr::Const(_) | Expr::Var(_))
    }
}

impl Stmt {
    pub fn if_else(cond: Expr, then_branch: Stmt, else_branch: Option<Stmt>) -> Self {
        Stmt::If {
            cond,
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        }
    }

    pub fn while_loop(cond: Expr, body: Stmt) -> Self {
        Stmt::While {
            cond,
            body: Box::new(body),
        }
    }

    pub fn do_while(body: Stmt, cond: Expr) -> Self {
        Stmt::DoWhile {
            body: Box::new(body),
            cond,
        }
    }
}

// Operands that are not atoms get parentheses so the printed text parses
// back into the same tree.
struct Operand<'a>(&'a Expr);

impl Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_atom() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "({})", self.0)
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Literals are unsigned; a wrapped one lexes back to the same bits.
            Expr::Const(value) => write!(f, "{}", *value as u64),
            Expr::Var(var) => write!(f, "{var}"),
            Expr::Assign { target, value } => write!(f, "{target}={value}"),
            Expr::BinaryOp { op, left, right } => {
                write!(f, "{}{op}{}", Operand(left), Operand(right))
            }
        }
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Empty => f.write_str(";"),
            Stmt::Sequence(stmts) => {
                f.write_str("{")?;
                for stmt in stmts {
                    write!(f, " {stmt}")?;
                }
                f.write_str(" }")
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                write!(f, "if ({cond}) {then_branch}")?;
                if let Some(else_branch) = else_branch {
                    write!(f, " else {else_branch}")?;
                }
                Ok(())
            }
            Stmt::While { cond, body } => write!(f, "while ({cond}) {body}"),
            Stmt::DoWhile { body, cond } => write!(f, "do {body} while ({cond});"),
            Stmt::Expr(expr) => write!(f, "{expr};"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(c: char) -> Var {
        Var::from_char(c).unwrap()
    }

    #[test]
    fn test_var_indices() {
        assert_eq!(var('a').index(), 0);
        assert_eq!(var('z').index(), 25);
        assert_eq!(Var::from_index(7).map(Var::name), Some('h'));
        assert_eq!(Var::from_char('A'), None);
        assert_eq!(Var::from_index(26), None);
        assert_eq!(Var::all().count(), VAR_COUNT);
    }

    #[test]
    fn test_display_expressions() {
        let sum = Expr::binary(
            BinOp::Sub,
            Expr::Var(var('a')),
            Expr::binary(BinOp::Add, Expr::Var(var('b')), Expr::Const(1)),
        );
        assert_eq!(sum.to_string(), "a-(b+1)");

        let chained = Expr::assign(var('a'), Expr::assign(var('b'), Expr::Const(2)));
        assert_eq!(chained.to_string(), "a=b=2");

        let test = Expr::binary(
            BinOp::Less,
            Expr::assign(var('i'), Expr::Const(3)),
            Expr::Const(50),
        );
        assert_eq!(test.to_string(), "(i=3)<50");
    }

    #[test]
    fn test_display_wrapped_constants() {
        let source = "a=9223372036854775808;";
        let program = crate::parse::parse(source).unwrap();
        assert_eq!(
            program,
            Stmt::Expr(Expr::assign(var('a'), Expr::Const(i64::MIN)))
        );
        assert_eq!(program.to_string(), source);
        assert_eq!(crate::parse::parse(&program.to_string()).unwrap(), program);

        assert_eq!(Expr::Const(-1).to_string(), u64::MAX.to_string());
    }

    #[test]
    fn test_display_statements() {
        let program = Stmt::Sequence(vec![
            Stmt::Expr(Expr::assign(var('i'), Expr::Const(1))),
            Stmt::do_while(
                Stmt::Empty,
                Expr::binary(BinOp::Less, Expr::Var(var('i')), Expr::Const(2)),
            ),
            Stmt::if_else(
                Expr::Var(var('i')),
                Stmt::Sequence(vec![]),
                Some(Stmt::Empty),
            ),
        ]);
        assert_eq!(
            program.to_string(),
            "{ i=1; do ; while (i<2); if (i) { } else ; }"
        );
    }
}
