use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Lower-case hex MD5 of the operator password, the HMAC key / 操作员密码MD5
pub fn password_digest(password: &str) -> String {
    format!("{:x}", md5::compute(password.as_bytes()))
}

/// `UPYUN <operator>:<base64(hmac-sha1(md5(password), METHOD&URI&DATE))>` / 生成签名头
pub fn authorization(operator: &str, password_md5: &str, method: &str, uri: &str, date: &str) -> String {
    let string_to_sign = format!("{}&{}&{}", method, uri, date);
    let mut mac = HmacSha1::new_from_slice(password_md5.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(string_to_sign.as_bytes());
    format!("UPYUN {}:{}", operator, BASE64.encode(mac.finalize().into_bytes()))
}
