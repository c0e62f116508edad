//! 酷狗安卓客户端的请求签名。

use std::collections::BTreeMap;

use md5::{Digest, Md5};

const ANDROID_SALT: &str = "OIlwieks28dk2k092lksi2UIkp";

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// 业务接口的签名：`md5(salt + 按键排序的 k=v 拼接 + body + salt)`。
///
/// `BTreeMap` 保证了键的顺序。
pub fn signature_android_params(params: &BTreeMap<String, String>, body: &str) -> String {
    let joined: String = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
    md5_hex(&format!("{ANDROID_SALT}{joined}{body}{ANDROID_SALT}"))
}

/// 设备注册接口的签名：所有参数值排序后拼接，两侧包上注册用的 appid。
pub fn signature_register_params(params: &BTreeMap<String, String>, app_id: &str) -> String {
    let mut values: Vec<&str> = params.values().map(String::as_str).collect();
    values.sort_unstable();
    md5_hex(&format!("{app_id}{}{app_id}", values.concat()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_android_signature_is_order_independent() {
        let mut a = BTreeMap::new();
        a.insert("keyword".to_string(), "晴天".to_string());
        a.insert("appid".to_string(), "1005".to_string());
        let mut b = BTreeMap::new();
        b.insert("appid".to_string(), "1005".to_string());
        b.insert("keyword".to_string(), "晴天".to_string());

        let sig = signature_android_params(&a, "");
        assert_eq!(sig, signature_android_params(&b, ""));
        assert_eq!(sig.len(), 32);
        assert_eq!(
            sig,
            md5_hex("OIlwieks28dk2k092lksi2UIkpappid=1005keyword=晴天OIlwieks28dk2k092lksi2UIkp")
        );
        assert_ne!(sig, signature_android_params(&a, "{}"));
    }

    #[test]
    fn test_register_signature_sorts_values() {
        let mut params = BTreeMap::new();
        params.insert("a".to_string(), "b".to_string());
        params.insert("z".to_string(), "a".to_string());
        assert_eq!(
            signature_register_params(&params, "1014"),
            md5_hex("1014ab1014")
        );
    }
}
