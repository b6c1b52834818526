pub mod analysis;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod service;
pub mod store;

pub use error::{AppError, Result};
