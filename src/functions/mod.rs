pub mod formatting;
pub mod template;
