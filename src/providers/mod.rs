pub mod deepseek;
pub mod gemini;
pub mod huggingface;
pub mod openai;
pub mod openrouter;
pub mod traits;
pub mod utils;
