//! UpYun USS adapter / 又拍云存储适配器
//!
//! Uses the REST API at `v0.api.upyun.com`. Folder listings are paged with the
//! `x-list-iter` cursor; pages are produced by a background task into a bounded
//! channel and drained by the request.

mod driver;
mod sign;

pub use driver::UpyunAdapter;
