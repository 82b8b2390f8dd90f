pub mod prompt;

pub use prompt::{parse_yes_or_no, prompt_yes_or_no};
