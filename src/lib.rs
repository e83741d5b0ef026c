pub mod api;
pub mod cache;
pub mod commands;
pub mod config;
pub mod controllers;
pub mod coordinator;
pub mod fetch;
pub mod gate;
pub mod logging;
pub mod shell;
