pub mod art;
pub mod converter;
pub mod gemini_client;
pub mod types;
