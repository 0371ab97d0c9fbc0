use super::{FunctionData, Instruction, Module, Op, Value};
use crate::sink::IntPredicate;
use std::fmt;

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        for (_, func) in self.functions() {
            writeln!(f)?;
            DisplayFunction::new(self, func).fmt(f)?;
        }
        Ok(())
    }
}

pub(crate) struct DisplayFunction<'a> {
    module: &'a Module,
    func: &'a FunctionData,
}

impl<'a> DisplayFunction<'a> {
    pub(crate) fn new(module: &'a Module, func: &'a FunctionData) -> Self {
        DisplayFunction { module, func }
    }

    fn value(&self, v: Value) -> String {
        match v {
            Value::Const(n) => (n as i32).to_string(),
            Value::Param(i) => match self.func.params.get(i) {
                Some(name) if !name.is_empty() => format!("%{}", name),
                _ => format!("%{}", i),
            },
            Value::Inst(id) => match self.func.insts.get(id) {
                Some(inst) if !inst.name.is_empty() => format!("%{}", inst.name),
                _ => format!("%{}", id),
            },
            Value::Undef => "undef".to_owned(),
        }
    }

    fn block(&self, index: usize) -> String {
        match self.func.blocks.get(index) {
            Some(bb) => format!("%{}", bb.name),
            None => "<badref>".to_owned(),
        }
    }

    fn instruction(&self, id: usize, inst: &Instruction) -> String {
        let body = match &inst.op {
            Op::Binary(_, lhs, rhs) => format!(
                "{} i32 {}, {}",
                inst.op.opcode(),
                self.value(*lhs),
                self.value(*rhs)
            ),
            Op::ICmp(pred, lhs, rhs) => {
                let pred = match pred {
                    IntPredicate::Ne => "ne",
                    IntPredicate::Ult => "ult",
                };
                format!(
                    "icmp {} i32 {}, {}",
                    pred,
                    self.value(*lhs),
                    self.value(*rhs)
                )
            }
            Op::ZExt(v) => format!("zext i1 {} to i32", self.value(*v)),
            Op::Call(callee, args) => {
                let callee = self
                    .module
                    .function(*callee)
                    .map_or("<badref>", |f| f.name.as_str());
                let args: Vec<String> = args
                    .iter()
                    .map(|a| format!("i32 {}", self.value(*a)))
                    .collect();
                format!("call i32 @{}({})", callee, args.join(", "))
            }
            Op::Br(dest) => format!("br label {}", self.block(*dest)),
            Op::CondBr(cond, then, else_) => format!(
                "br i1 {}, label {}, label {}",
                self.value(*cond),
                self.block(*then),
                self.block(*else_)
            ),
            Op::Phi(incoming) => {
                let incoming: Vec<String> = incoming
                    .iter()
                    .map(|(v, b)| format!("[ {}, {} ]", self.value(*v), self.block(*b)))
                    .collect();
                format!("phi i32 {}", incoming.join(", "))
            }
            Op::Ret(v) => format!("ret i32 {}", self.value(*v)),
        };

        if inst.op.result_type().is_some() {
            format!("{} = {}", self.value(Value::Inst(id)), body)
        } else {
            body
        }
    }
}

impl<'a> fmt::Display for DisplayFunction<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let func = self.func;
        if func.is_declaration() {
            let params = vec!["i32"; func.params.len()];
            return writeln!(f, "declare i32 @{}({})", func.name, params.join(", "));
        }

        let params: Vec<String> = (0..func.params.len())
            .map(|i| format!("i32 {}", self.value(Value::Param(i))))
            .collect();
        writeln!(f, "define i32 @{}({}) {{", func.name, params.join(", "))?;
        for (i, bb) in func.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}:", bb.name)?;
            for &id in &bb.insts {
                if let Some(inst) = func.insts.get(id) {
                    writeln!(f, "  {}", self.instruction(id, inst))?;
                }
            }
        }
        writeln!(f, "}}")
    }
}
