//! Read-only statistics over a generated module.

use super::ir::Module;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionStats {
    pub name: String,
    pub declaration: bool,
    pub blocks: usize,
    pub instructions: usize,
    pub opcodes: BTreeMap<&'static str, usize>,
}

pub fn function_stats(module: &Module) -> Vec<FunctionStats> {
    module
        .functions()
        .map(|(_, func)| {
            let mut opcodes = BTreeMap::new();
            let mut instructions = 0;
            for bb in &func.blocks {
                for &id in &bb.insts {
                    *opcodes.entry(func.insts[id].op.opcode()).or_insert(0) += 1;
                    instructions += 1;
                }
            }
            FunctionStats {
                name: func.name.clone(),
                declaration: func.is_declaration(),
                blocks: func.blocks.len(),
                instructions,
                opcodes,
            }
        })
        .collect()
}

impl fmt::Display for FunctionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function: {}", self.name)?;
        if self.declaration {
            return write!(f, " (declaration)");
        }
        write!(
            f,
            " ({} blocks, {} instructions)",
            self.blocks, self.instructions
        )?;
        for (opcode, count) in &self.opcodes {
            write!(f, " {}={}", opcode, count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::{Expr, Function, Prototype};
    use crate::codegen::Codegen;

    #[test]
    fn test_function_stats() {
        let mut cg = Codegen::new(Module::new("m"));
        cg.codegen_func(&Function(
            Prototype("f".to_owned(), vec!["x".to_owned()]),
            Expr::if_(
                Expr::Variable("x".to_owned()),
                Expr::Call("g".to_owned(), vec![Expr::Variable("x".to_owned())]),
                Expr::Number(0),
            ),
        ))
        .unwrap();

        let stats = function_stats(cg.sink());
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].name, "f");
        assert_eq!(stats[0].blocks, 4);
        assert_eq!(stats[0].instructions, 7);
        assert_eq!(stats[0].opcodes["br"], 3);
        assert_eq!(stats[1].name, "g");
        assert!(stats[1].declaration);
        assert_eq!(stats[1].to_string(), "Function: g (declaration)");
        assert_eq!(
            stats[0].to_string(),
            "Function: f (4 blocks, 7 instructions) br=3 call=1 icmp=1 phi=1 ret=1"
        );
    }
}
