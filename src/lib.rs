pub mod catalog;
pub mod compiler;
pub mod expression;
pub mod query;
pub mod request;
pub mod types;
