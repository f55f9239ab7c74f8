pub mod api;
pub mod auth;
pub mod config;
pub mod state;
pub mod storage;
pub mod utils;

// Backend adapters live at the project root / 存储后端适配器
#[path = "../drivers/mod.rs"]
pub mod drivers;
