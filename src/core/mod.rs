//! Core translation improvement module

pub mod config;
pub mod engine;
pub mod errors;
pub mod improver;
pub mod models;
pub mod service;
