pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod mcp;
pub mod model;
pub mod normalize;
pub mod payloads;
pub mod render;
pub mod server;
pub mod tools;
pub mod types;
