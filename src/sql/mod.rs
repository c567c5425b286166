//! SQL intermediate representation and text generation.

mod ast;
mod generator;

pub use ast::*;
pub use generator::{ParamTemplate, SqlGenerator, ToSql};
