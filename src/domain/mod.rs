pub mod error;
pub mod generation;
pub mod history;
pub mod llm_config;
pub mod test_case;
