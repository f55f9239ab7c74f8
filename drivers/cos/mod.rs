//! Tencent Cloud COS adapter / 腾讯云COS适配器
//!
//! Lists with `GET Bucket` (delimiter `/`, marker pagination), writes with `PUT Object`
//! and signs every request with the COS q-sign HMAC-SHA1 scheme.

mod driver;
mod sign;

pub use driver::CosAdapter;
