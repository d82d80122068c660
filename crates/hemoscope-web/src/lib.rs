//! # HemoScope Web模块
//!
//! 单页表单、健康检查和分析接口

pub mod handlers;
pub mod server;
pub mod static_files;

pub use handlers::{ApiError, AppState};
pub use server::{create_app, WebServer};
