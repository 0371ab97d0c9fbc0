use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(u32),
    Variable(String),
    Binary(char, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    If(Box<Expr>, Box<Expr>, Box<Expr>),
}

/// Function name and parameter names. Duplicate names are not rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct Prototype(pub String, pub Vec<String>);

#[derive(Debug, Clone, PartialEq)]
pub struct Function(pub Prototype, pub Expr);

/// Every node kind the code generator accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Expr(Expr),
    Prototype(Prototype),
    Function(Function),
}

impl Expr {
    pub fn binary(op: char, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn if_(cond: Expr, then: Expr, else_: Expr) -> Expr {
        Expr::If(Box::new(cond), Box::new(then), Box::new(else_))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Variable(name) => write!(f, "{}", name),
            Expr::Binary(op, lhs, rhs) => write!(f, "({} {} {})", lhs, op, rhs),
            Expr::Call(callee, args) => {
                write!(f, "{}(", callee)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::If(cond, then, else_) => {
                write!(f, "(if {} then {} else {})", cond, then, else_)
            }
        }
    }
}

impl fmt::Display for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.0, self.1.join(", "))
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "def {} {}", self.0, self.1)
    }
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ast::Expr(e) => e.fmt(f),
            Ast::Prototype(p) => p.fmt(f),
            Ast::Function(func) => func.fmt(f),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display() {
        let e = Expr::binary(
            '+',
            Expr::Number(1),
            Expr::binary('*', Expr::Number(2), Expr::Variable("x".to_owned())),
        );
        assert_eq!(e.to_string(), "(1 + (2 * x))");

        let func = Function(
            Prototype("f".to_owned(), vec!["a".to_owned(), "b".to_owned()]),
            Expr::if_(
                Expr::Variable("a".to_owned()),
                Expr::Call("g".to_owned(), vec![Expr::Number(1), Expr::Number(2)]),
                Expr::Variable("b".to_owned()),
            ),
        );
        assert_eq!(
            Ast::Function(func).to_string(),
            "def f(a, b) (if a then g(1, 2) else b)"
        );
    }
}
