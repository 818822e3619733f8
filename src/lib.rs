pub mod assembly;
pub mod ast;
pub mod codegen;
pub mod driver;
pub mod emit;
pub mod lexer;
pub mod parser;
