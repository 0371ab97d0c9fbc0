//! A small in-memory IR in the shape of LLVM's: functions made of basic
//! blocks of instructions over 32-bit integers.

mod exec;
mod printer;
mod verify;

pub use self::exec::run_function;
pub use self::verify::verify_function;

use super::error::Result;
use super::sink::{BinaryOp, IntPredicate, IrSink};
use std::collections::HashSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FunctionRef(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockRef {
    function: FunctionRef,
    index: usize,
}

/// An operand. `Inst` indexes the instruction arena of the enclosing function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Value {
    Const(u32),
    Param(usize),
    Inst(usize),
    Undef,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Type {
    I1,
    I32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    Binary(BinaryOp, Value, Value),
    ICmp(IntPredicate, Value, Value),
    ZExt(Value),
    Call(FunctionRef, Vec<Value>),
    Br(usize),
    CondBr(Value, usize, usize),
    Phi(Vec<(Value, usize)>),
    Ret(Value),
}

impl Op {
    pub fn is_terminator(&self) -> bool {
        match self {
            Op::Br(_) | Op::CondBr(..) | Op::Ret(_) => true,
            _ => false,
        }
    }

    pub fn opcode(&self) -> &'static str {
        match self {
            Op::Binary(BinaryOp::Add, ..) => "add",
            Op::Binary(BinaryOp::Sub, ..) => "sub",
            Op::Binary(BinaryOp::Mul, ..) => "mul",
            Op::Binary(BinaryOp::UDiv, ..) => "udiv",
            Op::ICmp(..) => "icmp",
            Op::ZExt(_) => "zext",
            Op::Call(..) => "call",
            Op::Br(_) | Op::CondBr(..) => "br",
            Op::Phi(_) => "phi",
            Op::Ret(_) => "ret",
        }
    }

    /// `None` for instructions that produce no value.
    pub fn result_type(&self) -> Option<Type> {
        match self {
            Op::ICmp(..) => Some(Type::I1),
            Op::Br(_) | Op::CondBr(..) | Op::Ret(_) => None,
            _ => Some(Type::I32),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Instruction {
    pub name: String,
    pub op: Op,
}

#[derive(Clone, Debug)]
pub struct BasicBlock {
    pub name: String,
    pub insts: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct FunctionData {
    pub name: String,
    pub params: Vec<String>,
    pub blocks: Vec<BasicBlock>,
    pub insts: Vec<Instruction>,
    names: HashSet<String>,
    last_unique: usize,
}

impl FunctionData {
    fn new(name: &str, arity: usize) -> Self {
        FunctionData {
            name: name.to_owned(),
            params: vec![String::new(); arity],
            blocks: Vec::new(),
            insts: Vec::new(),
            names: HashSet::new(),
            last_unique: 0,
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Local names are unique per function: `addtmp`, `addtmp1`, ...
    fn unique_name(&mut self, base: &str) -> String {
        if base.is_empty() {
            return String::new();
        }
        if self.names.insert(base.to_owned()) {
            return base.to_owned();
        }
        loop {
            self.last_unique += 1;
            let candidate = format!("{}{}", base, self.last_unique);
            if self.names.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

pub struct Module {
    name: String,
    functions: Vec<Option<FunctionData>>,
    insert_point: Option<BlockRef>,
}

impl Module {
    pub fn new(name: &str) -> Self {
        Module {
            name: name.to_owned(),
            functions: Vec::new(),
            insert_point: None,
        }
    }

    pub fn function(&self, f: FunctionRef) -> Option<&FunctionData> {
        self.functions.get(f.0).and_then(Option::as_ref)
    }

    fn function_mut(&mut self, f: FunctionRef) -> Option<&mut FunctionData> {
        self.functions.get_mut(f.0).and_then(Option::as_mut)
    }

    /// Live functions in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = (FunctionRef, &FunctionData)> {
        self.functions
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.as_ref().map(|f| (FunctionRef(i), f)))
    }

    fn push(&mut self, name: &str, op: Op) -> Value {
        let point = match self.insert_point {
            Some(point) => point,
            None => return Value::Undef,
        };
        let produces_value = op.result_type().is_some();
        let func = match self.function_mut(point.function) {
            Some(func) => func,
            None => return Value::Undef,
        };
        let name = if produces_value {
            func.unique_name(name)
        } else {
            String::new()
        };
        let id = func.insts.len();
        func.insts.push(Instruction { name, op });
        if let Some(bb) = func.blocks.get_mut(point.index) {
            bb.insts.push(id);
        }
        if produces_value {
            Value::Inst(id)
        } else {
            Value::Undef
        }
    }

    fn forget_insert_point(&mut self, f: FunctionRef) {
        if self.insert_point.map(|p| p.function) == Some(f) {
            self.insert_point = None;
        }
    }
}

impl IrSink for Module {
    type Value = Value;
    type Function = FunctionRef;
    type Block = BlockRef;

    fn const_int(&mut self, n: u32) -> Value {
        Value::Const(n)
    }

    fn get_function(&self, name: &str) -> Option<FunctionRef> {
        self.functions()
            .find(|(_, f)| f.name == name)
            .map(|(r, _)| r)
    }

    fn declare_function(&mut self, name: &str, arity: usize) -> FunctionRef {
        self.functions.push(Some(FunctionData::new(name, arity)));
        FunctionRef(self.functions.len() - 1)
    }

    fn arity(&self, f: FunctionRef) -> usize {
        self.function(f).map_or(0, |f| f.params.len())
    }

    fn has_body(&self, f: FunctionRef) -> bool {
        self.function(f).map_or(false, |f| !f.is_declaration())
    }

    fn param(&self, _f: FunctionRef, index: usize) -> Value {
        Value::Param(index)
    }

    fn set_param_name(&mut self, f: FunctionRef, index: usize, name: &str) {
        if let Some(func) = self.function_mut(f) {
            if index < func.params.len() {
                let name = func.unique_name(name);
                func.params[index] = name;
            }
        }
    }

    fn append_block(&mut self, f: FunctionRef, name: &str) -> BlockRef {
        let index = match self.function_mut(f) {
            Some(func) => {
                let name = func.unique_name(name);
                func.blocks.push(BasicBlock {
                    name,
                    insts: Vec::new(),
                });
                func.blocks.len() - 1
            }
            None => 0,
        };
        BlockRef { function: f, index }
    }

    fn position_at_end(&mut self, block: BlockRef) {
        self.insert_point = Some(block);
    }

    fn insert_block(&self) -> Option<BlockRef> {
        self.insert_point
    }

    fn clear_insertion_point(&mut self) {
        self.insert_point = None;
    }

    fn block_parent(&self, block: BlockRef) -> FunctionRef {
        block.function
    }

    fn build_binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value, name: &str) -> Value {
        self.push(name, Op::Binary(op, lhs, rhs))
    }

    fn build_icmp(&mut self, pred: IntPredicate, lhs: Value, rhs: Value, name: &str) -> Value {
        self.push(name, Op::ICmp(pred, lhs, rhs))
    }

    fn build_zext(&mut self, value: Value, name: &str) -> Value {
        self.push(name, Op::ZExt(value))
    }

    fn build_call(&mut self, callee: FunctionRef, args: &[Value], name: &str) -> Value {
        self.push(name, Op::Call(callee, args.to_vec()))
    }

    fn build_br(&mut self, dest: BlockRef) {
        self.push("", Op::Br(dest.index));
    }

    fn build_cond_br(&mut self, cond: Value, then: BlockRef, else_: BlockRef) {
        self.push("", Op::CondBr(cond, then.index, else_.index));
    }

    fn build_phi(&mut self, incoming: &[(Value, BlockRef)], name: &str) -> Value {
        let incoming = incoming.iter().map(|(v, b)| (*v, b.index)).collect();
        self.push(name, Op::Phi(incoming))
    }

    fn build_ret(&mut self, value: Value) {
        self.push("", Op::Ret(value));
    }

    fn erase_function(&mut self, f: FunctionRef) {
        self.forget_insert_point(f);
        if let Some(slot) = self.functions.get_mut(f.0) {
            *slot = None;
        }
    }

    fn clear_body(&mut self, f: FunctionRef) {
        self.forget_insert_point(f);
        if let Some(func) = self.function_mut(f) {
            func.blocks.clear();
            func.insts.clear();
            func.names = func
                .params
                .iter()
                .filter(|p| !p.is_empty())
                .cloned()
                .collect();
        }
    }

    fn verify_function(&self, f: FunctionRef) -> Result<()> {
        verify_function(self, f)
    }

    fn print_function(&self, f: FunctionRef) -> String {
        match self.function(f) {
            Some(func) => printer::DisplayFunction::new(self, func).to_string(),
            None => String::new(),
        }
    }

    fn print_module(&self) -> String {
        self.to_string()
    }

    fn run_function(&self, f: FunctionRef) -> Option<Result<u32>> {
        Some(run_function(self, f, &[]))
    }
}
