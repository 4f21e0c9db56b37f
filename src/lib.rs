pub mod cli;
pub mod environment;
pub mod error;
pub mod extensions;
pub mod parser;
pub mod repl;
pub mod runtime;
pub mod stdlib;
pub mod tokenizer;
