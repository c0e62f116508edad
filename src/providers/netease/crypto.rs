//! 网易云音乐 EAPI 的加解密与匿名设备标识。

use aes::Aes128;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use block_padding::Pkcs7;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit, generic_array::GenericArray};
use md5::{Digest, Md5};
use serde::Serialize;

use crate::error::{LyricsError, Result};

type EcbEncryptor = ecb::Encryptor<Aes128>;
type EcbDecryptor = ecb::Decryptor<Aes128>;

/// EAPI 使用的 AES-128-ECB 密钥。
const EAPI_KEY: &[u8; 16] = b"e82ckenh8dichen8";
const EAPI_SEPARATOR: &str = "-36cd479b6b5-";
/// 生成匿名用户名时与设备 ID 异或的密钥。
const DEVICE_ID_XOR_KEY: &[u8] = b"3go8&$8*3*3h0k(2)2";

const AES_BLOCK_SIZE: usize = 16;

fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// AES-128-ECB + PKCS#7 加密，返回大写十六进制。
fn aes_ecb_encrypt(plaintext: &[u8]) -> Result<String> {
    let cipher = EcbEncryptor::new(GenericArray::from_slice(EAPI_KEY));
    let msg_len = plaintext.len();
    let mut buffer = plaintext.to_vec();
    buffer.resize((msg_len / AES_BLOCK_SIZE + 1) * AES_BLOCK_SIZE, 0);

    let encrypted = cipher
        .encrypt_padded_mut::<Pkcs7>(&mut buffer, msg_len)
        .map_err(|e| LyricsError::Internal(format!("EAPI 加密失败: {e:?}")))?;
    Ok(hex::encode_upper(encrypted))
}

/// 生成 EAPI 请求的 `params` 字段。
///
/// # 参数
/// * `url_path` - 接口路径，例如 `/api/song/lyric/v1`，注意不是 `/eapi/...`。
/// * `payload` - 请求参数，序列化为紧凑 JSON；字段顺序由结构体定义决定。
pub fn prepare_eapi_params<T: Serialize>(url_path: &str, payload: &T) -> Result<String> {
    let json = serde_json::to_string(payload)?;
    let digest = md5_hex(format!("nobody{url_path}use{json}md5forencrypt").as_bytes());
    let data = format!("{url_path}{EAPI_SEPARATOR}{json}{EAPI_SEPARATOR}{digest}");
    aes_ecb_encrypt(data.as_bytes())
}

/// 解密 EAPI 响应体。
pub fn eapi_decrypt(encrypted: &[u8]) -> Result<String> {
    if encrypted.is_empty() || encrypted.len() % AES_BLOCK_SIZE != 0 {
        return Err(LyricsError::Decryption(format!(
            "EAPI 响应长度 {} 不是 {AES_BLOCK_SIZE} 的倍数",
            encrypted.len()
        )));
    }

    let mut buffer = encrypted.to_vec();
    let decrypted = EcbDecryptor::new(GenericArray::from_slice(EAPI_KEY))
        .decrypt_padded_mut::<Pkcs7>(&mut buffer)
        .map_err(|e| LyricsError::Decryption(format!("EAPI 解密失败: {e:?}")))?;

    String::from_utf8(decrypted.to_vec())
        .map_err(|e| LyricsError::Decryption(format!("EAPI 响应不是有效的 UTF-8: {e}")))
}

/// 根据设备 ID 生成匿名登录使用的用户名。
pub fn anonymous_username(device_id: &str) -> String {
    let xored: Vec<u8> = device_id
        .bytes()
        .zip(DEVICE_ID_XOR_KEY.iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect();
    let digest = BASE64.encode(Md5::digest(&xored));
    BASE64.encode(format!("{device_id} {digest}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_params_decrypt_back_to_signed_message() {
        let payload = json!({"id": "186016", "lv": "0"});
        let params = prepare_eapi_params("/api/song/lyric/v1", &payload).unwrap();
        assert!(params.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()));

        let decrypted = eapi_decrypt(&hex::decode(&params).unwrap()).unwrap();
        let parts: Vec<&str> = decrypted.split(EAPI_SEPARATOR).collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "/api/song/lyric/v1");
        assert_eq!(parts[1], r#"{"id":"186016","lv":"0"}"#);
        assert_eq!(
            parts[2],
            md5_hex(br#"nobody/api/song/lyric/v1use{"id":"186016","lv":"0"}md5forencrypt"#)
        );
    }

    #[test]
    fn test_block_aligned_input_gets_full_padding_block() {
        let encrypted = aes_ecb_encrypt(&[b'a'; 16]).unwrap();
        assert_eq!(encrypted.len(), 64);
    }

    #[test]
    fn test_decrypt_rejects_partial_block() {
        assert!(matches!(
            eapi_decrypt(&[1, 2, 3]),
            Err(LyricsError::Decryption(_))
        ));
    }

    #[test]
    fn test_anonymous_username_layout() {
        let username = anonymous_username("ABCDEF");
        let decoded = String::from_utf8(BASE64.decode(username).unwrap()).unwrap();
        let (device, digest) = decoded.split_once(' ').unwrap();
        assert_eq!(device, "ABCDEF");
        assert_eq!(BASE64.decode(digest).unwrap().len(), 16);
        assert_eq!(anonymous_username("ABCDEF"), anonymous_username("ABCDEF"));
    }
}
