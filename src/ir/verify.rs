use super::{FunctionData, FunctionRef, Module, Op, Type, Value};
use crate::error::{Error, ErrorKind, Result};

/// Structural well-formedness of one function.
///
/// Checks terminators, branch targets, phi placement and incoming edges,
/// operand definitions and types, and call arity. Dominance of definitions
/// over uses is not checked.
pub fn verify_function(module: &Module, f: FunctionRef) -> Result<()> {
    match module.function(f) {
        Some(func) => Verifier { module, func }.run().map_err(|reason| {
            Error::from(ErrorKind::Verify {
                function: func.name.clone(),
                reason,
            })
        }),
        None => Err(Error::from(ErrorKind::Verify {
            function: format!("#{}", f.0),
            reason: "function is not in the module".to_owned(),
        })),
    }
}

struct Verifier<'a> {
    module: &'a Module,
    func: &'a FunctionData,
}

type Check<T> = std::result::Result<T, String>;

impl<'a> Verifier<'a> {
    fn run(&self) -> Check<()> {
        let func = self.func;
        if func.is_declaration() {
            return Ok(());
        }

        let owner = self.placement()?;
        let preds = self.predecessors()?;
        if !preds[0].is_empty() {
            return Err("entry block must not have predecessors".to_owned());
        }

        for (b, bb) in func.blocks.iter().enumerate() {
            let mut past_phis = false;
            for &id in &bb.insts {
                let op = &func.insts[id].op;
                match op {
                    Op::Binary(_, lhs, rhs) | Op::ICmp(_, lhs, rhs) => {
                        self.expect(&owner, *lhs, Type::I32)?;
                        self.expect(&owner, *rhs, Type::I32)?;
                    }
                    Op::ZExt(v) => self.expect(&owner, *v, Type::I1)?,
                    Op::Call(callee, args) => {
                        let callee = self
                            .module
                            .function(*callee)
                            .ok_or_else(|| "call to a function not in the module".to_owned())?;
                        if callee.params.len() != args.len() {
                            return Err(format!(
                                "incorrect number of arguments passed to `{}`: expected {}, found {}",
                                callee.name,
                                callee.params.len(),
                                args.len()
                            ));
                        }
                        for arg in args {
                            self.expect(&owner, *arg, Type::I32)?;
                        }
                    }
                    Op::CondBr(cond, ..) => self.expect(&owner, *cond, Type::I1)?,
                    Op::Br(_) => {}
                    Op::Phi(incoming) => {
                        if past_phis {
                            return Err(format!(
                                "phi nodes must be grouped at the top of block `{}`",
                                bb.name
                            ));
                        }
                        let mut from: Vec<usize> = incoming.iter().map(|(_, b)| *b).collect();
                        from.sort();
                        let mut expected = preds[b].clone();
                        expected.sort();
                        if from != expected {
                            return Err(format!(
                                "phi in block `{}` must have one entry per predecessor",
                                bb.name
                            ));
                        }
                        for (v, _) in incoming {
                            self.expect(&owner, *v, Type::I32)?;
                        }
                    }
                    Op::Ret(v) => self.expect(&owner, *v, Type::I32)?,
                }
                past_phis |= !matches!(op, Op::Phi(_));
            }
        }
        Ok(())
    }

    /// Maps each instruction to the block holding it and checks that every
    /// block ends in exactly one terminator.
    fn placement(&self) -> Check<Vec<Option<usize>>> {
        let func = self.func;
        let mut owner = vec![None; func.insts.len()];
        for (b, bb) in func.blocks.iter().enumerate() {
            if bb.insts.is_empty() {
                return Err(format!("block `{}` is empty", bb.name));
            }
            for (pos, &id) in bb.insts.iter().enumerate() {
                let inst = func
                    .insts
                    .get(id)
                    .ok_or_else(|| format!("block `{}` refers to a missing instruction", bb.name))?;
                if owner[id].is_some() {
                    return Err(format!("instruction #{} is placed twice", id));
                }
                owner[id] = Some(b);

                let last = pos + 1 == bb.insts.len();
                if last && !inst.op.is_terminator() {
                    return Err(format!("block `{}` does not end with a terminator", bb.name));
                }
                if !last && inst.op.is_terminator() {
                    return Err(format!("terminator in the middle of block `{}`", bb.name));
                }
            }
        }
        Ok(owner)
    }

    fn predecessors(&self) -> Check<Vec<Vec<usize>>> {
        let func = self.func;
        let mut preds = vec![Vec::new(); func.blocks.len()];
        for (b, bb) in func.blocks.iter().enumerate() {
            let targets = match bb.insts.last().map(|&id| &func.insts[id].op) {
                Some(Op::Br(dest)) => vec![*dest],
                Some(Op::CondBr(_, then, else_)) => vec![*then, *else_],
                _ => vec![],
            };
            for t in targets {
                match preds.get_mut(t) {
                    Some(p) => p.push(b),
                    None => return Err(format!("block `{}` branches to a missing block", bb.name)),
                }
            }
        }
        Ok(preds)
    }

    fn expect(&self, owner: &[Option<usize>], v: Value, ty: Type) -> Check<()> {
        let found = match v {
            Value::Const(_) => Type::I32,
            Value::Undef => return Ok(()),
            Value::Param(i) => {
                if i >= self.func.params.len() {
                    return Err(format!("use of missing parameter #{}", i));
                }
                Type::I32
            }
            Value::Inst(id) => {
                if owner.get(id).cloned().flatten().is_none() {
                    return Err(format!("use of instruction #{} outside any block", id));
                }
                match self.func.insts[id].op.result_type() {
                    Some(t) => t,
                    None => return Err(format!("use of instruction #{} that has no value", id)),
                }
            }
        };
        if found != ty {
            return Err(format!("operand has type {:?}, expected {:?}", found, ty));
        }
        Ok(())
    }
}
