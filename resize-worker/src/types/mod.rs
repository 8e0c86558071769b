/// Environment configuration
pub mod environment;
