use super::{FunctionData, FunctionRef, Module, Op, Value};
use crate::error::{Error, ErrorKind, Result};
use crate::sink::{BinaryOp, IntPredicate};

const MAX_CALL_DEPTH: usize = 256;

fn eval_error(message: String) -> Error {
    Error::from(ErrorKind::Eval(message))
}

/// Interprets `f` with wrapping 32-bit arithmetic.
pub fn run_function(module: &Module, f: FunctionRef, args: &[u32]) -> Result<u32> {
    call(module, f, args, 0)
}

fn call(module: &Module, f: FunctionRef, args: &[u32], depth: usize) -> Result<u32> {
    if depth >= MAX_CALL_DEPTH {
        return Err(eval_error(format!(
            "call depth exceeded {} frames",
            MAX_CALL_DEPTH
        )));
    }
    let func = module
        .function(f)
        .ok_or_else(|| eval_error("call to a function not in the module".to_owned()))?;
    if func.is_declaration() {
        return Err(eval_error(format!(
            "call to external function `{}`",
            func.name
        )));
    }
    if func.params.len() != args.len() {
        return Err(eval_error(format!(
            "`{}` takes {} arguments but {} were supplied",
            func.name,
            func.params.len(),
            args.len()
        )));
    }

    let mut values = vec![None; func.insts.len()];
    let mut prev = None;
    let mut block = 0;
    'blocks: loop {
        let bb = func
            .blocks
            .get(block)
            .ok_or_else(|| eval_error(format!("branch to a missing block in `{}`", func.name)))?;
        for &id in &bb.insts {
            let inst = &func.insts[id];
            let result = match &inst.op {
                Op::Binary(op, lhs, rhs) => {
                    let l = read(func, &values, args, *lhs)?;
                    let r = read(func, &values, args, *rhs)?;
                    match op {
                        BinaryOp::Add => l.wrapping_add(r),
                        BinaryOp::Sub => l.wrapping_sub(r),
                        BinaryOp::Mul => l.wrapping_mul(r),
                        BinaryOp::UDiv => match l.checked_div(r) {
                            Some(q) => q,
                            None => {
                                return Err(eval_error(format!(
                                    "division by zero in `{}`",
                                    func.name
                                )))
                            }
                        },
                    }
                }
                Op::ICmp(pred, lhs, rhs) => {
                    let l = read(func, &values, args, *lhs)?;
                    let r = read(func, &values, args, *rhs)?;
                    match pred {
                        IntPredicate::Ne => u32::from(l != r),
                        IntPredicate::Ult => u32::from(l < r),
                    }
                }
                Op::ZExt(v) => read(func, &values, args, *v)?,
                Op::Call(callee, call_args) => {
                    let call_args = call_args
                        .iter()
                        .map(|a| read(func, &values, args, *a))
                        .collect::<Result<Vec<_>>>()?;
                    call(module, *callee, &call_args, depth + 1)?
                }
                Op::Phi(incoming) => {
                    let from = prev.ok_or_else(|| {
                        eval_error(format!("phi reached without a predecessor in `{}`", func.name))
                    })?;
                    match incoming.iter().find(|(_, b)| *b == from) {
                        Some((v, _)) => read(func, &values, args, *v)?,
                        None => {
                            return Err(eval_error(format!(
                                "phi in `{}` has no value for the incoming edge",
                                func.name
                            )))
                        }
                    }
                }
                Op::Br(dest) => {
                    prev = Some(block);
                    block = *dest;
                    continue 'blocks;
                }
                Op::CondBr(cond, then, else_) => {
                    let c = read(func, &values, args, *cond)?;
                    prev = Some(block);
                    block = if c != 0 { *then } else { *else_ };
                    continue 'blocks;
                }
                Op::Ret(v) => return read(func, &values, args, *v),
            };
            values[id] = Some(result);
        }
        return Err(eval_error(format!(
            "block `{}` in `{}` has no terminator",
            bb.name, func.name
        )));
    }
}

fn read(func: &FunctionData, values: &[Option<u32>], args: &[u32], v: Value) -> Result<u32> {
    match v {
        Value::Const(n) => Ok(n),
        Value::Undef => Ok(0),
        Value::Param(i) => args
            .get(i)
            .cloned()
            .ok_or_else(|| eval_error(format!("missing argument #{} in `{}`", i, func.name))),
        Value::Inst(id) => values.get(id).cloned().flatten().ok_or_else(|| {
            eval_error(format!(
                "use of an uncomputed value in `{}`",
                func.name
            ))
        }),
    }
}

#[cfg(test)]
mod test {
    use super::super::{Module, Value};
    use super::run_function;
    use crate::error::ErrorKind;
    use crate::sink::{BinaryOp, IrSink};

    #[test]
    fn test_arithmetic_wraps() {
        let mut m = Module::new("m");
        let f = m.declare_function("f", 2);
        let entry = m.append_block(f, "entry");
        m.position_at_end(entry);
        let v = m.build_binary(BinaryOp::Sub, Value::Param(0), Value::Param(1), "d");
        m.build_ret(v);

        assert_eq!(run_function(&m, f, &[5, 3]).unwrap(), 2);
        assert_eq!(run_function(&m, f, &[0, 1]).unwrap(), u32::max_value());
    }

    #[test]
    fn test_division_by_zero() {
        let mut m = Module::new("m");
        let f = m.declare_function("f", 1);
        let entry = m.append_block(f, "entry");
        m.position_at_end(entry);
        let v = m.build_binary(BinaryOp::UDiv, Value::Const(1), Value::Param(0), "q");
        m.build_ret(v);

        assert_eq!(run_function(&m, f, &[0]).unwrap_err().to_string(), "division by zero in `f`");
        assert_eq!(run_function(&m, f, &[1]).unwrap(), 1);
    }

    #[test]
    fn test_external_call() {
        let mut m = Module::new("m");
        let g = m.declare_function("g", 0);
        let f = m.declare_function("f", 0);
        let entry = m.append_block(f, "entry");
        m.position_at_end(entry);
        let v = m.build_call(g, &[], "calltmp");
        m.build_ret(v);

        let e = run_function(&m, f, &[]).unwrap_err();
        assert_eq!(
            e.kind(),
            &ErrorKind::Eval("call to external function `g`".to_owned())
        );
    }

    #[test]
    fn test_unbounded_recursion() {
        let mut m = Module::new("m");
        let f = m.declare_function("f", 0);
        let entry = m.append_block(f, "entry");
        m.position_at_end(entry);
        let v = m.build_call(f, &[], "calltmp");
        m.build_ret(v);

        assert!(run_function(&m, f, &[]).is_err());
    }
}
