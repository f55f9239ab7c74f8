use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// StringToSign = VERB\nContent-MD5\nContent-Type\nDate\nCanonicalizedResource
pub fn string_to_sign(method: &str, content_md5: &str, content_type: &str, date: &str, resource: &str) -> String {
    format!("{}\n{}\n{}\n{}\n{}", method, content_md5, content_type, date, resource)
}

/// `OSS <AccessKeyId>:<base64(hmac-sha1(AccessKeySecret, StringToSign))>` / 生成OSS签名头
pub fn authorization(access_key_id: &str, access_key_secret: &str, string_to_sign: &str) -> String {
    let mut mac = HmacSha1::new_from_slice(access_key_secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(string_to_sign.as_bytes());
    format!("OSS {}:{}", access_key_id, BASE64.encode(mac.finalize().into_bytes()))
}
