pub mod error;
pub mod format;
pub mod logger;
pub mod parse;
pub mod validation;
