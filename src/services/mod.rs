pub mod assist;
pub mod export;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod retry;
pub mod session;
