pub mod generate;
pub mod prompt_builder;
pub mod record_formatter;
