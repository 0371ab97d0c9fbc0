//! The narrow interface the code generator emits through.
//!
//! Every value is a 32-bit integer; comparisons produce a 1-bit value that
//! must be widened with [`IrSink::build_zext`] before it is used as an
//! integer again.

use super::error::Result;
use std::fmt::Debug;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    UDiv,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum IntPredicate {
    Ne,
    Ult,
}

pub trait IrSink {
    type Value: Copy + Debug;
    type Function: Copy + Debug + PartialEq;
    type Block: Copy + Debug;

    fn const_int(&mut self, n: u32) -> Self::Value;

    fn get_function(&self, name: &str) -> Option<Self::Function>;
    /// Adds an external declaration `i32 name(i32 x arity)`.
    fn declare_function(&mut self, name: &str, arity: usize) -> Self::Function;
    fn arity(&self, function: Self::Function) -> usize;
    fn has_body(&self, function: Self::Function) -> bool;
    fn param(&self, function: Self::Function, index: usize) -> Self::Value;
    fn set_param_name(&mut self, function: Self::Function, index: usize, name: &str);

    fn append_block(&mut self, function: Self::Function, name: &str) -> Self::Block;
    fn position_at_end(&mut self, block: Self::Block);
    fn insert_block(&self) -> Option<Self::Block>;
    fn clear_insertion_point(&mut self);
    fn block_parent(&self, block: Self::Block) -> Self::Function;

    fn build_binary(
        &mut self,
        op: BinaryOp,
        lhs: Self::Value,
        rhs: Self::Value,
        name: &str,
    ) -> Self::Value;
    fn build_icmp(
        &mut self,
        pred: IntPredicate,
        lhs: Self::Value,
        rhs: Self::Value,
        name: &str,
    ) -> Self::Value;
    fn build_zext(&mut self, value: Self::Value, name: &str) -> Self::Value;
    fn build_call(
        &mut self,
        callee: Self::Function,
        args: &[Self::Value],
        name: &str,
    ) -> Self::Value;
    fn build_br(&mut self, dest: Self::Block);
    fn build_cond_br(&mut self, cond: Self::Value, then: Self::Block, else_: Self::Block);
    fn build_phi(&mut self, incoming: &[(Self::Value, Self::Block)], name: &str) -> Self::Value;
    fn build_ret(&mut self, value: Self::Value);

    /// Removes the function together with all of its blocks.
    fn erase_function(&mut self, function: Self::Function);
    /// Drops every block, turning a definition back into a declaration.
    fn clear_body(&mut self, function: Self::Function);
    fn verify_function(&self, function: Self::Function) -> Result<()>;

    fn print_function(&self, function: Self::Function) -> String;
    fn print_module(&self) -> String;

    /// Runs a zero-argument function, when the sink can execute code.
    fn run_function(&self, _function: Self::Function) -> Option<Result<u32>> {
        None
    }
}
