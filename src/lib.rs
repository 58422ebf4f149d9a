pub mod cli;
pub mod commands;
pub mod lock;
pub mod platform;
pub mod store;
