use super::ast::{Ast, Expr, Function, Prototype};
use super::error::{Error, ErrorKind, Result};
use super::sink::{BinaryOp, IntPredicate, IrSink};
use std::collections::HashMap;

pub const ANON_PREFIX: &str = "__anon_expr";

/// What [`Codegen::generate`] produced for a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Generated<V, F> {
    Value(V),
    Function(F),
}

/// Lowers AST nodes into an [`IrSink`].
///
/// The only state carried between calls is the symbol table, which maps the
/// parameters of the function being generated to their IR values and is
/// reset at every prototype.
pub struct Codegen<S: IrSink> {
    sink: S,
    named_values: HashMap<String, S::Value>,
    anon_count: usize,
}

impl<S: IrSink> Codegen<S> {
    pub fn new(sink: S) -> Self {
        Codegen {
            sink,
            named_values: HashMap::new(),
            anon_count: 0,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn generate(&mut self, node: &Ast) -> Result<Generated<S::Value, S::Function>> {
        match node {
            Ast::Expr(e) => {
                if self.sink.insert_block().is_none() {
                    return Err(Error::from(ErrorKind::Codegen(
                        "expression outside of a function body".to_owned(),
                    )));
                }
                self.codegen_expr(e).map(Generated::Value)
            }
            Ast::Prototype(p) => self.codegen_proto(p).map(Generated::Function),
            Ast::Function(f) => self.codegen_func(f).map(Generated::Function),
        }
    }

    pub fn codegen_expr(&mut self, e: &Expr) -> Result<S::Value> {
        match e {
            Expr::Number(n) => Ok(self.sink.const_int(*n)),
            Expr::Variable(name) => self
                .named_values
                .get(name)
                .cloned()
                .ok_or_else(|| Error::from(ErrorKind::UnboundIdentifier(name.clone()))),
            Expr::Binary(op, lhs, rhs) => {
                let lhs_val = self.codegen_expr(lhs)?;
                let rhs_val = self.codegen_expr(rhs)?;
                let sink = &mut self.sink;
                match op {
                    '+' => Ok(sink.build_binary(BinaryOp::Add, lhs_val, rhs_val, "addtmp")),
                    '-' => Ok(sink.build_binary(BinaryOp::Sub, lhs_val, rhs_val, "subtmp")),
                    '*' => Ok(sink.build_binary(BinaryOp::Mul, lhs_val, rhs_val, "multmp")),
                    '/' => Ok(sink.build_binary(BinaryOp::UDiv, lhs_val, rhs_val, "divtmp")),
                    '<' => {
                        let i = sink.build_icmp(IntPredicate::Ult, lhs_val, rhs_val, "cmptmp");
                        Ok(sink.build_zext(i, "booltmp"))
                    }
                    _ => Err(Error::from(ErrorKind::UnknownOperator(*op))),
                }
            }
            Expr::Call(callee, args) => {
                let mut args_v = Vec::with_capacity(args.len());
                for arg in args {
                    args_v.push(self.codegen_expr(arg)?);
                }
                // Unknown callees get an implicit declaration so that calls may
                // precede the definition.
                let callee_f = match self.sink.get_function(callee) {
                    Some(f) => f,
                    None => self.sink.declare_function(callee, args_v.len()),
                };
                Ok(self.sink.build_call(callee_f, &args_v, "calltmp"))
            }
            Expr::If(cond, then, else_) => self.codegen_if(cond, then, else_),
        }
    }

    fn codegen_if(&mut self, cond: &Expr, then: &Expr, else_: &Expr) -> Result<S::Value> {
        let cond_v = self.codegen_expr(cond)?;
        let zero = self.sink.const_int(0);
        let cond_v = self
            .sink
            .build_icmp(IntPredicate::Ne, cond_v, zero, "ifcond");

        let the_function = match self.sink.insert_block() {
            Some(bb) => self.sink.block_parent(bb),
            None => {
                return Err(Error::from(ErrorKind::Codegen(
                    "conditional outside of a function body".to_owned(),
                )))
            }
        };
        let then_bb = self.sink.append_block(the_function, "then");
        let else_bb = self.sink.append_block(the_function, "else");
        let merge_bb = self.sink.append_block(the_function, "ifcont");

        self.sink.build_cond_br(cond_v, then_bb, else_bb);

        self.sink.position_at_end(then_bb);
        let then_v = self.codegen_expr(then)?;
        self.sink.build_br(merge_bb);
        let then_end = self.current_block()?;

        self.sink.position_at_end(else_bb);
        let else_v = self.codegen_expr(else_)?;
        self.sink.build_br(merge_bb);
        let else_end = self.current_block()?;

        self.sink.position_at_end(merge_bb);
        Ok(self
            .sink
            .build_phi(&[(then_v, then_end), (else_v, else_end)], "iftmp"))
    }

    fn current_block(&self) -> Result<S::Block> {
        self.sink.insert_block().ok_or_else(|| {
            Error::from(ErrorKind::Codegen("no insertion block".to_owned()))
        })
    }

    /// Declares the prototype, or reuses a compatible body-less declaration,
    /// and binds its parameters in a fresh symbol table.
    pub fn codegen_proto(&mut self, proto: &Prototype) -> Result<S::Function> {
        self.declare(proto).map(|(f, _)| f)
    }

    fn declare(&mut self, proto: &Prototype) -> Result<(S::Function, bool)> {
        let Prototype(name, params) = proto;
        self.named_values.clear();

        let (the_function, created) = match self.sink.get_function(name) {
            None => (self.sink.declare_function(name, params.len()), true),
            Some(f) => {
                if self.sink.has_body(f) {
                    return Err(Error::from(ErrorKind::Redefinition(name.clone())));
                }
                let arity = self.sink.arity(f);
                if arity != params.len() {
                    return Err(Error::from(ErrorKind::ArityMismatch {
                        name: name.clone(),
                        expected: arity,
                        found: params.len(),
                    }));
                }
                (f, false)
            }
        };

        for (i, param) in params.iter().enumerate() {
            self.sink.set_param_name(the_function, i, param);
            let v = self.sink.param(the_function, i);
            self.named_values.insert(param.clone(), v);
        }
        Ok((the_function, created))
    }

    pub fn codegen_func(&mut self, func: &Function) -> Result<S::Function> {
        let Function(proto, body) = func;
        self.define(proto, body)
    }

    /// Wraps a top-level expression in a fresh zero-parameter function.
    pub fn codegen_toplevel(&mut self, e: &Expr) -> Result<S::Function> {
        let name = format!("{}.{}", ANON_PREFIX, self.anon_count);
        self.anon_count += 1;
        self.define(&Prototype(name, vec![]), e)
    }

    fn define(&mut self, proto: &Prototype, body: &Expr) -> Result<S::Function> {
        let (the_function, created) = self.declare(proto)?;

        let entry = self.sink.append_block(the_function, "entry");
        self.sink.position_at_end(entry);

        let result = self.codegen_expr(body).and_then(|ret_val| {
            self.sink.build_ret(ret_val);
            self.sink.verify_function(the_function)
        });

        self.sink.clear_insertion_point();
        match result {
            Ok(()) => Ok(the_function),
            Err(e) => {
                if created {
                    self.sink.erase_function(the_function);
                } else {
                    self.sink.clear_body(the_function);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::ir::Module;
    use super::*;

    fn codegen() -> Codegen<Module> {
        Codegen::new(Module::new("test"))
    }

    fn proto(name: &str, params: &[&str]) -> Prototype {
        Prototype(
            name.to_owned(),
            params.iter().map(|p| (*p).to_owned()).collect(),
        )
    }

    fn var(s: &str) -> Expr {
        Expr::Variable(s.to_owned())
    }

    #[test]
    fn test_unbound_variable() {
        let mut cg = codegen();
        let e = cg.codegen_expr(&var("x")).unwrap_err();
        assert_eq!(e.kind(), &ErrorKind::UnboundIdentifier("x".to_owned()));
    }

    #[test]
    fn test_expression_after_definition() {
        let mut cg = codegen();
        let id = cg
            .codegen_func(&Function(proto("id", &["x"]), var("x")))
            .unwrap();
        assert_eq!(cg.sink().insert_block(), None);

        let sum = Expr::binary('+', Expr::Number(1), Expr::Number(2));
        let e = cg.generate(&Ast::Expr(sum)).unwrap_err();
        assert_eq!(
            e.kind(),
            &ErrorKind::Codegen("expression outside of a function body".to_owned())
        );
        assert!(cg.sink().verify_function(id).is_ok());
        assert_eq!(
            cg.sink().print_function(id),
            "define i32 @id(i32 %x) {\nentry:\n  ret i32 %x\n}\n"
        );
    }

    #[test]
    fn test_identity() {
        let mut cg = codegen();
        let f = cg
            .codegen_func(&Function(proto("id", &["x"]), var("x")))
            .unwrap();
        assert_eq!(cg.sink().arity(f), 1);
        assert_eq!(
            cg.sink().print_function(f),
            "define i32 @id(i32 %x) {\nentry:\n  ret i32 %x\n}\n"
        );
    }

    #[test]
    fn test_binary() {
        let mut cg = codegen();
        let body = Expr::binary(
            '/',
            Expr::binary('<', var("a"), var("b")),
            Expr::binary('*', Expr::binary('-', var("a"), Expr::Number(1)), var("b")),
        );
        let f = cg.codegen_func(&Function(proto("f", &["a", "b"]), body)).unwrap();
        assert_eq!(
            cg.sink().print_function(f),
            "define i32 @f(i32 %a, i32 %b) {
entry:
  %cmptmp = icmp ult i32 %a, %b
  %booltmp = zext i1 %cmptmp to i32
  %subtmp = sub i32 %a, 1
  %multmp = mul i32 %subtmp, %b
  %divtmp = udiv i32 %booltmp, %multmp
  ret i32 %divtmp
}
"
        );
    }

    #[test]
    fn test_unknown_operator() {
        let mut cg = codegen();
        let body = Expr::binary('%', Expr::Number(1), Expr::Number(2));
        let e = cg.codegen_func(&Function(proto("f", &[]), body)).unwrap_err();
        assert_eq!(e.kind(), &ErrorKind::UnknownOperator('%'));
        assert!(cg.sink().get_function("f").is_none());
    }

    #[test]
    fn test_forward_reference() {
        let mut cg = codegen();
        let call = Expr::Call("foo".to_owned(), vec![Expr::Number(1), Expr::Number(2)]);
        cg.codegen_func(&Function(proto("g", &[]), call)).unwrap();

        let foo = cg.sink().get_function("foo").unwrap();
        assert_eq!(cg.sink().arity(foo), 2);
        assert!(!cg.sink().has_body(foo));

        // The later definition fills in the implicit declaration.
        let body = Expr::binary('+', var("a"), var("b"));
        let defined = cg.codegen_func(&Function(proto("foo", &["a", "b"]), body)).unwrap();
        assert_eq!(defined, foo);
        assert!(cg.sink().has_body(foo));
    }

    #[test]
    fn test_redefinition() {
        let mut cg = codegen();
        cg.codegen_func(&Function(proto("f", &["x"]), var("x"))).unwrap();
        let e = cg
            .codegen_func(&Function(proto("f", &["y"]), var("y")))
            .unwrap_err();
        assert_eq!(e.kind(), &ErrorKind::Redefinition("f".to_owned()));
    }

    #[test]
    fn test_arity_mismatch() {
        let mut cg = codegen();
        cg.codegen_proto(&proto("f", &["x"])).unwrap();
        let e = cg
            .codegen_func(&Function(proto("f", &["x", "y"]), var("x")))
            .unwrap_err();
        assert_eq!(
            e.kind(),
            &ErrorKind::ArityMismatch {
                name: "f".to_owned(),
                expected: 1,
                found: 2
            }
        );
    }

    #[test]
    fn test_failed_body_is_erased() {
        let mut cg = codegen();
        let body = Expr::binary('+', var("x"), var("nope"));
        let e = cg.codegen_func(&Function(proto("f", &["x"]), body)).unwrap_err();
        assert_eq!(e.kind(), &ErrorKind::UnboundIdentifier("nope".to_owned()));
        assert!(cg.sink().get_function("f").is_none());
        assert_eq!(cg.sink().print_module(), "; ModuleID = 'test'\n");
    }

    #[test]
    fn test_failed_body_keeps_declaration() {
        let mut cg = codegen();
        cg.codegen_func(&Function(
            proto("g", &[]),
            Expr::Call("f".to_owned(), vec![Expr::Number(1)]),
        ))
        .unwrap();
        let f = cg.sink().get_function("f").unwrap();

        let body = Expr::if_(var("x"), Expr::Number(1), var("nope"));
        assert!(cg.codegen_func(&Function(proto("f", &["x"]), body)).is_err());
        assert_eq!(cg.sink().get_function("f"), Some(f));
        assert!(!cg.sink().has_body(f));
    }

    #[test]
    fn test_symbol_table_reset() {
        let mut cg = codegen();
        cg.codegen_func(&Function(proto("f", &["x"]), var("x"))).unwrap();
        let e = cg
            .codegen_func(&Function(proto("g", &["y"]), var("x")))
            .unwrap_err();
        assert_eq!(e.kind(), &ErrorKind::UnboundIdentifier("x".to_owned()));
    }

    #[test]
    fn test_if() {
        let mut cg = codegen();
        let f = cg
            .codegen_toplevel(&Expr::if_(
                Expr::Number(1),
                Expr::Number(2),
                Expr::Number(3),
            ))
            .unwrap();
        assert_eq!(
            cg.sink().print_function(f),
            "define i32 @__anon_expr.0() {
entry:
  %ifcond = icmp ne i32 1, 0
  br i1 %ifcond, label %then, label %else

then:
  br label %ifcont

else:
  br label %ifcont

ifcont:
  %iftmp = phi i32 [ 2, %then ], [ 3, %else ]
  ret i32 %iftmp
}
"
        );
        assert_eq!(cg.sink().run_function(f).unwrap().unwrap(), 2);
    }

    #[test]
    fn test_toplevel_names() {
        let mut cg = codegen();
        let a = cg.codegen_toplevel(&Expr::Number(1)).unwrap();
        let b = cg.codegen_toplevel(&Expr::Number(2)).unwrap();
        assert_ne!(a, b);
        assert!(cg.sink().get_function("__anon_expr.1").is_some());
    }
}
