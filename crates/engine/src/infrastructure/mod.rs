pub mod ollama;
pub mod persistence;
pub mod ports;
pub mod resilient_llm;
