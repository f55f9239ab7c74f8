//! Aliyun OSS adapter / 阿里云OSS适配器
//!
//! `GetBucket` listing follows `NextMarker` until `IsTruncated` is false. Requests are
//! signed with the OSS V1 header signature.

mod driver;
mod sign;

pub use driver::OssAdapter;
