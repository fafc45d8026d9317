#![recursion_limit = "256"]
pub mod attachments;
pub mod config;
pub mod fonts;
pub mod host;
pub mod input;
pub mod mcp;
pub mod render;
pub mod schema;
pub mod tools;
pub mod upload;
