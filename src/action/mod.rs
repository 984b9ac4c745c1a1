pub mod literal;
pub mod parser;
pub mod types;

pub use literal::{parse_literal, Literal};
pub use parser::parse_action;
pub use types::{Action, ActionKind, ActionResult, METADATA_KEY};
