//! 原生 Web API 封装模块
//!
//! 对浏览器原生 API 的轻量级封装，不引入 gloo-* 系列 crate，
//! 以减小 WASM 二进制体积。

pub mod dialog;
pub mod file;
mod http;
mod storage;
mod timer;

pub use http::FetchHttpClient;
pub use storage::{BrowserSessionStore, StorageListener};
pub use timer::Interval;
