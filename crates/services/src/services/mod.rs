pub mod affirmations;
pub mod auth_provider;
pub mod database_validator;
pub mod gemini_api;
pub mod problems;
pub mod session_stats;

#[cfg(test)]
pub(crate) mod stub_http;
