//! procscope CLI library: argument parsing, input and schema loading,
//! report formatting. The binary in `main.rs` is a thin wrapper.

pub mod cli;
pub mod input;
pub mod output;
pub mod schema;
