//! [`IrSink`] backed by an LLVM module, available with the `llvm` feature.

use super::error::{Error, ErrorKind, Result};
use super::sink::{BinaryOp, IntPredicate, IrSink};
use libc::c_char;
use llvm_sys::analysis::{LLVMVerifierFailureAction, LLVMVerifyFunction};
use llvm_sys::core;
use llvm_sys::prelude::*;
use llvm_sys::{LLVMIntPredicate, LLVMTypeKind};
use std::ffi::{CStr, CString};

pub struct LlvmSink {
    context: LLVMContextRef,
    module: LLVMModuleRef,
    builder: LLVMBuilderRef,
    int_type: LLVMTypeRef,
}

fn c_name(name: &str) -> CString {
    CString::new(name).unwrap_or_default()
}

unsafe fn take_message(message: *mut c_char) -> String {
    if message.is_null() {
        return String::new();
    }
    let s = CStr::from_ptr(message).to_string_lossy().into_owned();
    core::LLVMDisposeMessage(message);
    s
}

impl LlvmSink {
    pub fn new(module_name: &str) -> Self {
        let name = c_name(module_name);
        unsafe {
            let context = core::LLVMContextCreate();
            let module = core::LLVMModuleCreateWithNameInContext(name.as_ptr(), context);
            let builder = core::LLVMCreateBuilderInContext(context);
            let int_type = core::LLVMInt32TypeInContext(context);
            LlvmSink {
                context,
                module,
                builder,
                int_type,
            }
        }
    }

    fn name_of(&self, value: LLVMValueRef) -> String {
        unsafe {
            let name = core::LLVMGetValueName(value);
            if name.is_null() {
                return String::new();
            }
            CStr::from_ptr(name).to_string_lossy().into_owned()
        }
    }
}

impl Drop for LlvmSink {
    fn drop(&mut self) {
        unsafe {
            core::LLVMDisposeBuilder(self.builder);
            core::LLVMDisposeModule(self.module);
            core::LLVMContextDispose(self.context);
        }
    }
}

impl IrSink for LlvmSink {
    type Value = LLVMValueRef;
    type Function = LLVMValueRef;
    type Block = LLVMBasicBlockRef;

    fn const_int(&mut self, n: u32) -> LLVMValueRef {
        unsafe { core::LLVMConstInt(self.int_type, u64::from(n), 0) }
    }

    fn get_function(&self, name: &str) -> Option<LLVMValueRef> {
        let name = c_name(name);
        let f = unsafe { core::LLVMGetNamedFunction(self.module, name.as_ptr()) };
        if f.is_null() {
            None
        } else {
            Some(f)
        }
    }

    fn declare_function(&mut self, name: &str, arity: usize) -> LLVMValueRef {
        let name = c_name(name);
        let mut params = vec![self.int_type; arity];
        unsafe {
            let fn_type =
                core::LLVMFunctionType(self.int_type, params.as_mut_ptr(), arity as u32, 0);
            core::LLVMAddFunction(self.module, name.as_ptr(), fn_type)
        }
    }

    fn arity(&self, f: LLVMValueRef) -> usize {
        unsafe { core::LLVMCountParams(f) as usize }
    }

    fn has_body(&self, f: LLVMValueRef) -> bool {
        unsafe { core::LLVMCountBasicBlocks(f) > 0 }
    }

    fn param(&self, f: LLVMValueRef, index: usize) -> LLVMValueRef {
        unsafe { core::LLVMGetParam(f, index as u32) }
    }

    fn set_param_name(&mut self, f: LLVMValueRef, index: usize, name: &str) {
        let name = c_name(name);
        unsafe { core::LLVMSetValueName(core::LLVMGetParam(f, index as u32), name.as_ptr()) }
    }

    fn append_block(&mut self, f: LLVMValueRef, name: &str) -> LLVMBasicBlockRef {
        let name = c_name(name);
        unsafe { core::LLVMAppendBasicBlockInContext(self.context, f, name.as_ptr()) }
    }

    fn position_at_end(&mut self, block: LLVMBasicBlockRef) {
        unsafe { core::LLVMPositionBuilderAtEnd(self.builder, block) }
    }

    fn insert_block(&self) -> Option<LLVMBasicBlockRef> {
        let bb = unsafe { core::LLVMGetInsertBlock(self.builder) };
        if bb.is_null() {
            None
        } else {
            Some(bb)
        }
    }

    fn clear_insertion_point(&mut self) {
        unsafe { core::LLVMClearInsertionPosition(self.builder) }
    }

    fn block_parent(&self, block: LLVMBasicBlockRef) -> LLVMValueRef {
        unsafe { core::LLVMGetBasicBlockParent(block) }
    }

    fn build_binary(
        &mut self,
        op: BinaryOp,
        lhs: LLVMValueRef,
        rhs: LLVMValueRef,
        name: &str,
    ) -> LLVMValueRef {
        let name = c_name(name);
        unsafe {
            match op {
                BinaryOp::Add => core::LLVMBuildAdd(self.builder, lhs, rhs, name.as_ptr()),
                BinaryOp::Sub => core::LLVMBuildSub(self.builder, lhs, rhs, name.as_ptr()),
                BinaryOp::Mul => core::LLVMBuildMul(self.builder, lhs, rhs, name.as_ptr()),
                BinaryOp::UDiv => core::LLVMBuildUDiv(self.builder, lhs, rhs, name.as_ptr()),
            }
        }
    }

    fn build_icmp(
        &mut self,
        pred: IntPredicate,
        lhs: LLVMValueRef,
        rhs: LLVMValueRef,
        name: &str,
    ) -> LLVMValueRef {
        let name = c_name(name);
        let pred = match pred {
            IntPredicate::Ne => LLVMIntPredicate::LLVMIntNE,
            IntPredicate::Ult => LLVMIntPredicate::LLVMIntULT,
        };
        unsafe { core::LLVMBuildICmp(self.builder, pred, lhs, rhs, name.as_ptr()) }
    }

    fn build_zext(&mut self, value: LLVMValueRef, name: &str) -> LLVMValueRef {
        let name = c_name(name);
        unsafe { core::LLVMBuildZExt(self.builder, value, self.int_type, name.as_ptr()) }
    }

    fn build_call(
        &mut self,
        callee: LLVMValueRef,
        args: &[LLVMValueRef],
        name: &str,
    ) -> LLVMValueRef {
        let name = c_name(name);
        let mut args = args.to_vec();
        unsafe {
            core::LLVMBuildCall(
                self.builder,
                callee,
                args.as_mut_ptr(),
                args.len() as u32,
                name.as_ptr(),
            )
        }
    }

    fn build_br(&mut self, dest: LLVMBasicBlockRef) {
        unsafe {
            core::LLVMBuildBr(self.builder, dest);
        }
    }

    fn build_cond_br(
        &mut self,
        cond: LLVMValueRef,
        then: LLVMBasicBlockRef,
        else_: LLVMBasicBlockRef,
    ) {
        unsafe {
            core::LLVMBuildCondBr(self.builder, cond, then, else_);
        }
    }

    fn build_phi(
        &mut self,
        incoming: &[(LLVMValueRef, LLVMBasicBlockRef)],
        name: &str,
    ) -> LLVMValueRef {
        let name = c_name(name);
        let mut values: Vec<_> = incoming.iter().map(|(v, _)| *v).collect();
        let mut blocks: Vec<_> = incoming.iter().map(|(_, b)| *b).collect();
        unsafe {
            let phi = core::LLVMBuildPhi(self.builder, self.int_type, name.as_ptr());
            core::LLVMAddIncoming(
                phi,
                values.as_mut_ptr(),
                blocks.as_mut_ptr(),
                values.len() as u32,
            );
            phi
        }
    }

    fn build_ret(&mut self, value: LLVMValueRef) {
        unsafe {
            core::LLVMBuildRet(self.builder, value);
        }
    }

    fn erase_function(&mut self, f: LLVMValueRef) {
        self.clear_body(f);
        unsafe { core::LLVMDeleteFunction(f) }
    }

    fn clear_body(&mut self, f: LLVMValueRef) {
        unsafe {
            if let Some(bb) = self.insert_block() {
                if core::LLVMGetBasicBlockParent(bb) == f {
                    core::LLVMClearInsertionPosition(self.builder);
                }
            }

            // Detach every use first so instructions can go in any order.
            let mut bb = core::LLVMGetFirstBasicBlock(f);
            while !bb.is_null() {
                let mut inst = core::LLVMGetFirstInstruction(bb);
                while !inst.is_null() {
                    let ty = core::LLVMTypeOf(inst);
                    if core::LLVMGetTypeKind(ty) != LLVMTypeKind::LLVMVoidTypeKind {
                        core::LLVMReplaceAllUsesWith(inst, core::LLVMGetUndef(ty));
                    }
                    inst = core::LLVMGetNextInstruction(inst);
                }
                bb = core::LLVMGetNextBasicBlock(bb);
            }

            let mut bb = core::LLVMGetFirstBasicBlock(f);
            while !bb.is_null() {
                let mut inst = core::LLVMGetFirstInstruction(bb);
                while !inst.is_null() {
                    let next = core::LLVMGetNextInstruction(inst);
                    core::LLVMInstructionEraseFromParent(inst);
                    inst = next;
                }
                bb = core::LLVMGetNextBasicBlock(bb);
            }

            loop {
                let bb = core::LLVMGetFirstBasicBlock(f);
                if bb.is_null() {
                    break;
                }
                core::LLVMDeleteBasicBlock(bb);
            }
        }
    }

    fn verify_function(&self, f: LLVMValueRef) -> Result<()> {
        let broken = unsafe {
            LLVMVerifyFunction(f, LLVMVerifierFailureAction::LLVMReturnStatusAction) != 0
        };
        if broken {
            return Err(Error::from(ErrorKind::Verify {
                function: self.name_of(f),
                reason: "rejected by the LLVM verifier".to_owned(),
            }));
        }
        Ok(())
    }

    fn print_function(&self, f: LLVMValueRef) -> String {
        unsafe { take_message(core::LLVMPrintValueToString(f)) }
    }

    fn print_module(&self) -> String {
        unsafe { take_message(core::LLVMPrintModuleToString(self.module)) }
    }
}
