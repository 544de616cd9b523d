pub mod cli;
pub mod clipboard;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod generator;
pub mod service;
pub mod session;
pub mod vault;
