//! Brief: a concatenative, stack-based virtual machine that runs one step at
//! a time, so execution can be paused, inspected, saved and resumed.

pub mod debugger;
pub mod diagnostic;
pub mod image;
pub mod interpreter;
pub mod lexer;
pub mod machine;
pub mod parser;
pub mod primitives;
pub mod scope;
pub mod source;
pub mod value;

pub use interpreter::{Fault, Halt, RuntimeError, interpret, run, run_with_limit, step};
pub use machine::{Machine, Status};
pub use primitives::Registry;
pub use scope::Scope;
pub use value::{Value, Word};
