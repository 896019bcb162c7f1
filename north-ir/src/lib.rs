//! Typed SSA intermediate representation for the North compiler.
//!
//! The shape matches what a retargetable back end needs from the front end:
//! named functions with linkage and variadic flags, basic blocks with
//! explicit control-flow edges, struct types whose bodies may be attached
//! after first use, global string constants, stack slots, loads and stores,
//! GEPs, arithmetic and comparisons, phi nodes and calls.

mod module;
mod printer;
mod types;
mod verify;

pub use module::{
    BasicBlock, BinOp, BlockId, FuncId, Function, Inst, InstId, InstKind, IrError, Linkage,
    Module, Param, Predicate, Value,
};
pub use types::Type;
pub use verify::VerifyError;
