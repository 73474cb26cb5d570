pub mod llm;
pub mod providers;
