//! 酷狗 KRC 歌词的加解密。
//!
//! 密文格式为 `krc1` 头部 + 与固定 16 字节密钥循环异或后的 zlib 数据。
//! 密钥来自 `LyricDecoder` 项目（Copyright (c) `SuJiKiNen`，MIT License）。

use std::io::{Read, Write};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use flate2::{Compression, read::ZlibDecoder, write::ZlibEncoder};

use crate::error::{LyricsError, Result};

const KRC_HEADER: &[u8; 4] = b"krc1";

const KRC_KEY: [u8; 16] = [
    0x40, 0x47, 0x61, 0x77, 0x5E, 0x32, 0x74, 0x47, 0x51, 0x36, 0x31, 0x2D, 0xCE, 0xD2, 0x6E, 0x69,
];

fn xor_with_key(data: &mut [u8]) {
    for (byte, key) in data.iter_mut().zip(KRC_KEY.iter().cycle()) {
        *byte ^= key;
    }
}

/// 解密 KRC 二进制数据，例如本地保存的 `.krc` 文件。
///
/// # 错误
///
/// 数据不足 4 字节、解压失败或结果不是 UTF-8 时返回 `LyricsError::Decryption`。
pub fn decrypt_krc_from_bytes(encrypted: &[u8]) -> Result<String> {
    let Some(body) = encrypted.get(KRC_HEADER.len()..) else {
        return Err(LyricsError::Decryption(
            "KRC 数据过短，缺少 4 字节头部".to_string(),
        ));
    };

    let mut body = body.to_vec();
    xor_with_key(&mut body);

    let mut inflated = Vec::new();
    ZlibDecoder::new(body.as_slice())
        .read_to_end(&mut inflated)
        .map_err(|e| LyricsError::Decryption(format!("KRC 解压失败: {e}")))?;

    String::from_utf8(inflated).map_err(|e| LyricsError::Decryption(format!("KRC 不是有效的 UTF-8: {e}")))
}

/// 解密接口返回的 Base64 KRC 文本。
pub fn decrypt_krc(encrypted_base64: &str) -> Result<String> {
    let data = BASE64
        .decode(encrypted_base64.trim())
        .map_err(|e| LyricsError::Decryption(format!("KRC Base64 解码失败: {e}")))?;
    decrypt_krc_from_bytes(&data)
}

/// 把 KRC 明文加密成接口返回的 Base64 形式。
pub fn encrypt_krc(plaintext: &str) -> Result<String> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(plaintext.as_bytes())?;
    let mut body = encoder.finish()?;
    xor_with_key(&mut body);

    let mut data = Vec::with_capacity(KRC_HEADER.len() + body.len());
    data.extend_from_slice(KRC_HEADER);
    data.extend_from_slice(&body);
    Ok(BASE64.encode(data))
}
