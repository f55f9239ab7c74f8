//! COS request signature (q-sign-algorithm=sha1) / COS请求签名

use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};

type HmacSha1 = Hmac<Sha1>;

/// Seconds before now the signature becomes valid, absorbs clock skew
pub const SIGN_SKEW_SECS: i64 = 60;
/// Signature lifetime / 签名有效期
pub const SIGN_EXPIRE_SECS: i64 = 600;

fn hmac_sha1_hex(key: &[u8], data: &str) -> String {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Canonical form of params or headers: (`a;b` key list, `a=1&b=2` string)
///
/// Keys are url-encoded then lower-cased, values url-encoded, pairs sorted by key.
pub fn canonicalize(pairs: &[(&str, &str)]) -> (String, String) {
    let mut encoded: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| {
            (
                urlencoding::encode(k).to_lowercase(),
                urlencoding::encode(v).into_owned(),
            )
        })
        .collect();
    encoded.sort();

    let key_list = encoded.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>().join(";");
    let joined = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    (key_list, joined)
}

/// Build the `Authorization` header value / 生成Authorization头
pub fn authorization(
    secret_id: &str,
    secret_key: &str,
    method: &str,
    path: &str,
    params: &[(&str, &str)],
    headers: &[(&str, &str)],
    start: i64,
    end: i64,
) -> String {
    let key_time = format!("{};{}", start, end);
    let sign_key = hmac_sha1_hex(secret_key.as_bytes(), &key_time);

    let (param_list, http_params) = canonicalize(params);
    let (header_list, http_headers) = canonicalize(headers);

    let http_string = format!(
        "{}\n{}\n{}\n{}\n",
        method.to_lowercase(),
        path,
        http_params,
        http_headers
    );
    let string_to_sign = format!(
        "sha1\n{}\n{}\n",
        key_time,
        hex::encode(Sha1::digest(http_string.as_bytes()))
    );
    let signature = hmac_sha1_hex(sign_key.as_bytes(), &string_to_sign);

    format!(
        "q-sign-algorithm=sha1&q-ak={}&q-sign-time={}&q-key-time={}&q-header-list={}&q-url-param-list={}&q-signature={}",
        secret_id, key_time, key_time, header_list, param_list, signature
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_sorts_and_encodes() {
        let (list, joined) = canonicalize(&[("prefix", "a b/"), ("Delimiter", "/"), ("marker", "")]);
        assert_eq!(list, "delimiter;marker;prefix");
        assert_eq!(joined, "delimiter=%2F&marker=&prefix=a%20b%2F");
    }

    #[test]
    fn test_authorization_shape() {
        let auth = authorization(
            "AKIDexample",
            "secret",
            "GET",
            "/",
            &[("prefix", "photos/"), ("delimiter", "/")],
            &[("host", "b-125.cos.ap-nanjing.myqcloud.com")],
            1_700_000_000,
            1_700_000_600,
        );
        assert!(auth.starts_with("q-sign-algorithm=sha1&q-ak=AKIDexample&q-sign-time=1700000000;1700000600&q-key-time=1700000000;1700000600"));
        assert!(auth.contains("&q-header-list=host&q-url-param-list=delimiter;prefix&q-signature="));
        let signature = auth.rsplit("q-signature=").next().unwrap();
        assert_eq!(signature.len(), 40);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_authorization_depends_on_inputs() {
        let sign = |method: &str, path: &str| {
            authorization("id", "key", method, path, &[], &[("host", "h")], 1, 2)
        };
        assert_eq!(sign("PUT", "/a.txt"), sign("put", "/a.txt"));
        assert_ne!(sign("PUT", "/a.txt"), sign("PUT", "/b.txt"));
        assert_ne!(sign("PUT", "/a.txt"), sign("DELETE", "/a.txt"));
    }
}
