//! QQ 音乐 `musicu.fcg` 请求的 `zzc` 签名。

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};

use crate::error::Result;

const HEAD_INDEXES: [usize; 7] = [23, 14, 6, 36, 16, 7, 19];
const TAIL_INDEXES: [usize; 8] = [16, 1, 32, 12, 19, 27, 8, 5];
const MIDDLE_XOR: [u8; 20] = [
    89, 39, 179, 150, 218, 82, 58, 252, 177, 52, 186, 123, 120, 64, 242, 133, 143, 161, 121, 179,
];

/// 对请求体计算签名。请求体按序列化后的紧凑 JSON 参与哈希。
pub fn sign(request: &serde_json::Value) -> Result<String> {
    let body = serde_json::to_string(request)?;
    let digest = Sha1::digest(body.as_bytes());
    let digest_hex = hex::encode_upper(digest);
    let hex_bytes = digest_hex.as_bytes();

    let pick = |indexes: &[usize]| -> String {
        indexes.iter().map(|&i| char::from(hex_bytes[i])).collect()
    };

    let middle: Vec<u8> = digest
        .iter()
        .zip(MIDDLE_XOR.iter())
        .map(|(byte, mask)| byte ^ mask)
        .collect();
    let middle = BASE64.encode(middle).replace(['/', '+', '='], "");

    Ok(format!("zzc{}{middle}{}", pick(&HEAD_INDEXES), pick(&TAIL_INDEXES)).to_lowercase())
}
