//! QQ 音乐 QRC 歌词的加解密。
//!
//! **注意**：这里的 DES 并不是标准实现，而是一个结构类似 DES 的私有分组密码，
//! 只能用于 QRC 歌词，不要用在任何需要安全性的地方。
//!
//! 置换表与密钥来自 `LyricDecoder` 项目（Copyright (c) `SuJiKiNen`，MIT License）
//! 以及 Brad Conte 的 DES 实现。
//!
//! <https://github.com/SuJiKiNen/LyricDecoder>

use std::io::{Read, Write};
use std::sync::LazyLock;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use flate2::{
    Compression,
    read::{DeflateDecoder, ZlibDecoder},
    write::ZlibEncoder,
};
use rayon::prelude::*;
use tracing::debug;

use crate::error::{LyricsError, Result};

const BLOCK_SIZE: usize = 8;
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

static CODEC: LazyLock<TripleDes> = LazyLock::new(TripleDes::new);

/// 解密十六进制形式的 QRC 密文。
///
/// 流程：十六进制解码 → 三重 DES 解密 → zlib 解压（失败时按裸 deflate 重试）
/// → 去掉 BOM → UTF-8 解码。
pub fn decrypt_qrc(encrypted_hex: &str) -> Result<String> {
    let encrypted = hex::decode(encrypted_hex.trim())
        .map_err(|e| LyricsError::Decryption(format!("无效的十六进制字符串: {e}")))?;

    if encrypted.is_empty() || encrypted.len() % BLOCK_SIZE != 0 {
        return Err(LyricsError::Decryption(format!(
            "密文长度 {} 不是 {BLOCK_SIZE} 的倍数",
            encrypted.len()
        )));
    }

    let mut decrypted = vec![0u8; encrypted.len()];
    decrypted
        .par_chunks_mut(BLOCK_SIZE)
        .zip(encrypted.par_chunks(BLOCK_SIZE))
        .for_each(|(out, block)| CODEC.decrypt_block(block, out));

    let inflated = inflate(&decrypted)?;
    String::from_utf8(inflated)
        .map_err(|e| LyricsError::Decryption(format!("UTF-8 解码失败: {e}")))
}

/// 加密明文歌词，返回大写十六进制密文。
pub fn encrypt_qrc(plaintext: &str) -> Result<String> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(plaintext.as_bytes())
        .map_err(|e| LyricsError::Decryption(format!("zlib 压缩失败: {e}")))?;
    let compressed = encoder
        .finish()
        .map_err(|e| LyricsError::Decryption(format!("zlib 压缩失败: {e}")))?;

    let padded = zero_pad(compressed);
    let mut encrypted = vec![0u8; padded.len()];
    encrypted
        .par_chunks_mut(BLOCK_SIZE)
        .zip(padded.par_chunks(BLOCK_SIZE))
        .for_each(|(out, block)| CODEC.encrypt_block(block, out));

    Ok(hex::encode_upper(encrypted))
}

/// 解密 QQ 音乐歌词接口返回的载荷。
///
/// 新接口有时直接返回 Base64 编码的明文，所以先尝试 Base64，
/// 解不出有效的 UTF-8 文本时再按 QRC 密文处理。纯十六进制的文本直接按 QRC 处理。
pub fn decrypt_with_fallback(payload: &str) -> Result<String> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(String::new());
    }

    let looks_like_hex = payload.bytes().all(|b| b.is_ascii_hexdigit());
    if !looks_like_hex
        && let Ok(bytes) = BASE64.decode(payload)
        && let Ok(text) = String::from_utf8(bytes)
    {
        debug!("QQ 音乐歌词载荷为 Base64 明文");
        return Ok(text);
    }

    decrypt_qrc(payload)
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    if ZlibDecoder::new(data).read_to_end(&mut output).is_err() {
        output.clear();
        DeflateDecoder::new(data)
            .read_to_end(&mut output)
            .map_err(|e| LyricsError::Decryption(format!("解压缩失败: {e}")))?;
    }

    if output.starts_with(&UTF8_BOM) {
        output.drain(..UTF8_BOM.len());
    }
    Ok(output)
}

fn zero_pad(mut data: Vec<u8>) -> Vec<u8> {
    let remainder = data.len() % BLOCK_SIZE;
    if remainder != 0 {
        data.resize(data.len() + BLOCK_SIZE - remainder, 0);
    }
    data
}

type RoundKeys = [[u8; des::SUB_KEY_SIZE]; des::ROUNDS];

/// 三次 DES 串联：加密为 K1 加密、K2 解密、K3 加密，解密反过来。
struct TripleDes {
    encrypt_keys: [RoundKeys; 3],
    decrypt_keys: [RoundKeys; 3],
}

impl TripleDes {
    fn new() -> Self {
        use des::Direction::{Decrypt, Encrypt};

        let schedule = |steps: [(&[u8; 8], des::Direction); 3]| -> [RoundKeys; 3] {
            steps.map(|(key, direction)| des::key_schedule(key, direction))
        };

        Self {
            encrypt_keys: schedule([
                (des::KEY_1, Encrypt),
                (des::KEY_2, Decrypt),
                (des::KEY_3, Encrypt),
            ]),
            decrypt_keys: schedule([
                (des::KEY_3, Decrypt),
                (des::KEY_2, Encrypt),
                (des::KEY_1, Decrypt),
            ]),
        }
    }

    fn encrypt_block(&self, input: &[u8], output: &mut [u8]) {
        Self::run(&self.encrypt_keys, input, output);
    }

    fn decrypt_block(&self, input: &[u8], output: &mut [u8]) {
        Self::run(&self.decrypt_keys, input, output);
    }

    fn run(keys: &[RoundKeys; 3], input: &[u8], output: &mut [u8]) {
        let mut first = [0u8; BLOCK_SIZE];
        let mut second = [0u8; BLOCK_SIZE];
        des::crypt_block(input, &mut first, &keys[0]);
        des::crypt_block(&first, &mut second, &keys[1]);
        des::crypt_block(&second, output, &keys[2]);
    }
}

/// 私有 DES 变体的全部细节。
pub(crate) mod des {
    use std::sync::LazyLock;

    pub(crate) const ROUNDS: usize = 16;
    pub(crate) const SUB_KEY_SIZE: usize = 6;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) enum Direction {
        Encrypt,
        Decrypt,
    }

    pub(crate) const KEY_1: &[u8; 8] = b"!@#)(*$%";
    pub(crate) const KEY_2: &[u8; 8] = b"123ZXC!@";
    pub(crate) const KEY_3: &[u8; 8] = b"!@#)(NHL";

    #[rustfmt::skip]
    const S_BOXES: [[u8; 64]; 8] = [
        [
            14,  4, 13,  1,  2, 15, 11,  8,  3, 10,  6, 12,  5,  9,  0,  7,
             0, 15,  7,  4, 14,  2, 13,  1, 10,  6, 12, 11,  9,  5,  3,  8,
             4,  1, 14,  8, 13,  6,  2, 11, 15, 12,  9,  7,  3, 10,  5,  0,
            15, 12,  8,  2,  4,  9,  1,  7,  5, 11,  3, 14, 10,  0,  6, 13,
        ],
        [
            15,  1,  8, 14,  6, 11,  3,  4,  9,  7,  2, 13, 12,  0,  5, 10,
             3, 13,  4,  7, 15,  2,  8, 15, 12,  0,  1, 10,  6,  9, 11,  5,
             0, 14,  7, 11, 10,  4, 13,  1,  5,  8, 12,  6,  9,  3,  2, 15,
            13,  8, 10,  1,  3, 15,  4,  2, 11,  6,  7, 12,  0,  5, 14,  9,
        ],
        [
            10,  0,  9, 14,  6,  3, 15,  5,  1, 13, 12,  7, 11,  4,  2,  8,
            13,  7,  0,  9,  3,  4,  6, 10,  2,  8,  5, 14, 12, 11, 15,  1,
            13,  6,  4,  9,  8, 15,  3,  0, 11,  1,  2, 12,  5, 10, 14,  7,
             1, 10, 13,  0,  6,  9,  8,  7,  4, 15, 14,  3, 11,  5,  2, 12,
        ],
        [
             7, 13, 14,  3,  0,  6,  9, 10,  1,  2,  8,  5, 11, 12,  4, 15,
            13,  8, 11,  5,  6, 15,  0,  3,  4,  7,  2, 12,  1, 10, 14,  9,
            10,  6,  9,  0, 12, 11,  7, 13, 15,  1,  3, 14,  5,  2,  8,  4,
             3, 15,  0,  6, 10, 10, 13,  8,  9,  4,  5, 11, 12,  7,  2, 14,
        ],
        [
             2, 12,  4,  1,  7, 10, 11,  6,  8,  5,  3, 15, 13,  0, 14,  9,
            14, 11,  2, 12,  4,  7, 13,  1,  5,  0, 15, 10,  3,  9,  8,  6,
             4,  2,  1, 11, 10, 13,  7,  8, 15,  9, 12,  5,  6,  3,  0, 14,
            11,  8, 12,  7,  1, 14,  2, 13,  6, 15,  0,  9, 10,  4,  5,  3,
        ],
        [
            12,  1, 10, 15,  9,  2,  6,  8,  0, 13,  3,  4, 14,  7,  5, 11,
            10, 15,  4,  2,  7, 12,  9,  5,  6,  1, 13, 14,  0, 11,  3,  8,
             9, 14, 15,  5,  2,  8, 12,  3,  7,  0,  4, 10,  1, 13, 11,  6,
             4,  3,  2, 12,  9,  5, 15, 10, 11, 14,  1,  7,  6,  0,  8, 13,
        ],
        [
             4, 11,  2, 14, 15,  0,  8, 13,  3, 12,  9,  7,  5, 10,  6,  1,
            13,  0, 11,  7,  4,  9,  1, 10, 14,  3,  5, 12,  2, 15,  8,  6,
             1,  4, 11, 13, 12,  3,  7, 14, 10, 15,  6,  8,  0,  5,  9,  2,
             6, 11, 13,  8,  1,  4, 10,  7,  9,  5,  0, 15, 14,  2,  3, 12,
        ],
        [
            13,  2,  8,  4,  6, 15, 11,  1, 10,  9,  3, 14,  5,  0, 12,  7,
             1, 15, 13,  8, 10,  3,  7,  4, 12,  5,  6, 11,  0, 14,  9,  2,
             7, 11,  4,  1,  9, 12, 14,  2,  0,  6, 10, 13, 15,  3,  5,  8,
             2,  1, 14,  7,  4, 10,  8, 13, 15, 12,  9,  0,  3,  5,  6, 11,
        ],
    ];

    #[rustfmt::skip]
    const P_BOX: [u8; 32] = [
        16,  7, 20, 21, 29, 12, 28, 17,
         1, 15, 23, 26,  5, 18, 31, 10,
         2,  8, 24, 14, 32, 27,  3,  9,
        19, 13, 30,  6, 22, 11,  4, 25,
    ];

    #[rustfmt::skip]
    const E_BOX: [u8; 48] = [
        32,  1,  2,  3,  4,  5,
         4,  5,  6,  7,  8,  9,
         8,  9, 10, 11, 12, 13,
        12, 13, 14, 15, 16, 17,
        16, 17, 18, 19, 20, 21,
        20, 21, 22, 23, 24, 25,
        24, 25, 26, 27, 28, 29,
        28, 29, 30, 31, 32,  1,
    ];

    #[rustfmt::skip]
    const KEY_SHIFTS: [u32; ROUNDS] = [1, 1, 2, 2, 2, 2, 2, 2, 1, 2, 2, 2, 2, 2, 2, 1];

    #[rustfmt::skip]
    const PC1_C: [usize; 28] = [
        56, 48, 40, 32, 24, 16,  8,
         0, 57, 49, 41, 33, 25, 17,
         9,  1, 58, 50, 42, 34, 26,
        18, 10,  2, 59, 51, 43, 35,
    ];

    #[rustfmt::skip]
    const PC1_D: [usize; 28] = [
        62, 54, 46, 38, 30, 22, 14,
         6, 61, 53, 45, 37, 29, 21,
        13,  5, 60, 52, 44, 36, 28,
        20, 12,  4, 27, 19, 11,  3,
    ];

    #[rustfmt::skip]
    const PC2: [usize; 48] = [
        13, 16, 10, 23,  0,  4,  2, 27,
        14,  5, 20,  9, 22, 18, 11,  3,
        25,  7, 15,  6, 26, 19, 12,  1,
        40, 51, 30, 36, 46, 54, 29, 39,
        50, 44, 32, 47, 43, 48, 38, 55,
        33, 52, 45, 41, 49, 35, 28, 31,
    ];

    #[rustfmt::skip]
    const IP: [u8; 64] = [
        34, 42, 50, 58, 2, 10, 18, 26,
        36, 44, 52, 60, 4, 12, 20, 28,
        38, 46, 54, 62, 6, 14, 22, 30,
        40, 48, 56, 64, 8, 16, 24, 32,
        33, 41, 49, 57, 1,  9, 17, 25,
        35, 43, 51, 59, 3, 11, 19, 27,
        37, 45, 53, 61, 5, 13, 21, 29,
        39, 47, 55, 63, 7, 15, 23, 31,
    ];

    #[rustfmt::skip]
    const INV_IP: [u8; 64] = [
        37, 5, 45, 13, 53, 21, 61, 29,
        38, 6, 46, 14, 54, 22, 62, 30,
        39, 7, 47, 15, 55, 23, 63, 31,
        40, 8, 48, 16, 56, 24, 64, 32,
        33, 1, 41,  9, 49, 17, 57, 25,
        34, 2, 42, 10, 50, 18, 58, 26,
        35, 3, 43, 11, 51, 19, 59, 27,
        36, 4, 44, 12, 52, 20, 60, 28,
    ];

    /// S 盒与 P 盒合并后的查找表。
    static SP_TABLES: LazyLock<[[u32; 64]; 8]> = LazyLock::new(build_sp_tables);

    /// 按字节预先计算好的 IP 与逆 IP 结果。
    static PERMUTATIONS: LazyLock<PermutationTables> = LazyLock::new(PermutationTables::build);

    #[allow(clippy::cast_possible_truncation)]
    fn build_sp_tables() -> [[u32; 64]; 8] {
        let mut tables = [[0u32; 64]; 8];
        for (box_idx, table) in tables.iter_mut().enumerate() {
            for (input, slot) in table.iter_mut().enumerate() {
                let value = S_BOXES[box_idx][sbox_index(input as u8)];
                *slot = permute_p(u32::from(value) << (28 - box_idx * 4));
            }
        }
        tables
    }

    /// 6 位输入在 S 盒中的下标：首尾两位选行，中间四位选列。
    const fn sbox_index(a: u8) -> usize {
        ((a & 0x20) | ((a & 0x1f) >> 1) | ((a & 0x01) << 4)) as usize
    }

    fn permute_p(input: u32) -> u32 {
        P_BOX.iter().enumerate().fold(0u32, |acc, (i, &src)| {
            let bit = (input >> (32 - u32::from(src))) & 1;
            acc | (bit << (31 - i))
        })
    }

    fn expand(input: u32) -> u64 {
        E_BOX.iter().enumerate().fold(0u64, |acc, (i, &src)| {
            let bit = (input >> (32 - u32::from(src))) & 1;
            acc | (u64::from(bit) << (47 - i))
        })
    }

    /// 28 位的值存放在 u32 的高 28 位中，循环左移后低 4 位清零。
    const fn rotate_28(value: u32, amount: u32) -> u32 {
        ((value << amount) | (value >> (28 - amount))) & 0xFFFF_FFF0
    }

    /// 密钥按两个小端 u32 拼接后再按表取位，这是该变体与标准 DES 的区别之一。
    fn select_key_bits(key: &[u8; 8], table: &[usize]) -> u64 {
        let low = u32::from_le_bytes([key[0], key[1], key[2], key[3]]);
        let high = u32::from_le_bytes([key[4], key[5], key[6], key[7]]);
        let packed = (u64::from(low) << 32) | u64::from(high);
        let width = table.len();
        table.iter().enumerate().fold(0u64, |acc, (i, &pos)| {
            acc | (((packed >> (63 - pos)) & 1) << (width - 1 - i))
        })
    }

    /// 生成 16 个 48 位轮密钥。解密方向的轮密钥顺序相反。
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn key_schedule(key: &[u8; 8], direction: Direction) -> [[u8; SUB_KEY_SIZE]; ROUNDS] {
        let mut schedule = [[0u8; SUB_KEY_SIZE]; ROUNDS];
        let mut c = (select_key_bits(key, &PC1_C) as u32) << 4;
        let mut d = (select_key_bits(key, &PC1_D) as u32) << 4;

        for (round, &shift) in KEY_SHIFTS.iter().enumerate() {
            c = rotate_28(c, shift);
            d = rotate_28(d, shift);

            let subkey = PC2.iter().enumerate().fold(0u64, |acc, (k, &pos)| {
                // D 部分的下标偏移是 27 而不是 28
                let bit = if pos < 28 {
                    (c >> (31 - pos)) & 1
                } else {
                    (d >> (31 - (pos - 27))) & 1
                };
                acc | (u64::from(bit) << (47 - k))
            });

            let slot = match direction {
                Direction::Encrypt => round,
                Direction::Decrypt => ROUNDS - 1 - round,
            };
            schedule[slot].copy_from_slice(&subkey.to_be_bytes()[2..]);
        }
        schedule
    }

    struct PermutationTables {
        initial: [[(u32, u32); 256]; 8],
        inverse: [[u64; 256]; 8],
    }

    impl PermutationTables {
        #[allow(clippy::cast_possible_truncation)]
        fn build() -> Self {
            fn permute(input: u64, rule: &[u8; 64]) -> u64 {
                rule.iter().enumerate().fold(0u64, |acc, (i, &src)| {
                    acc | (((input >> (64 - u32::from(src))) & 1) << (63 - i))
                })
            }

            let mut initial = [[(0u32, 0u32); 256]; 8];
            let mut inverse = [[0u64; 256]; 8];
            for byte_pos in 0..8 {
                for value in 0..256usize {
                    let shifted = (value as u64) << (56 - byte_pos * 8);
                    let ip = permute(shifted, &IP);
                    initial[byte_pos][value] = ((ip >> 32) as u32, ip as u32);
                    inverse[byte_pos][value] = permute(shifted, &INV_IP);
                }
            }
            Self { initial, inverse }
        }
    }

    fn feistel(state: u32, key: &[u8; SUB_KEY_SIZE]) -> u32 {
        let key = u64::from_be_bytes([0, 0, key[0], key[1], key[2], key[3], key[4], key[5]]);
        let x = expand(state) ^ key;
        let sp = &*SP_TABLES;
        (0..8).fold(0u32, |acc, i| {
            acc | sp[i][((x >> (42 - i * 6)) & 0x3F) as usize]
        })
    }

    /// 处理单个 8 字节分组。
    pub(crate) fn crypt_block(input: &[u8], output: &mut [u8], keys: &[[u8; SUB_KEY_SIZE]; ROUNDS]) {
        let tables = &*PERMUTATIONS;
        let (mut left, mut right) = input
            .iter()
            .zip(tables.initial.iter())
            .fold((0u32, 0u32), |(l, r), (&byte, row)| {
                let (hi, lo) = row[byte as usize];
                (l | hi, r | lo)
            });

        for key in keys.iter().take(ROUNDS - 1) {
            let next_right = left ^ feistel(right, key);
            left = right;
            right = next_right;
        }
        // 最后一轮不交换左右两半
        left ^= feistel(right, &keys[ROUNDS - 1]);

        let merged = (u64::from(left) << 32) | u64::from(right);
        let result = merged
            .to_be_bytes()
            .iter()
            .zip(tables.inverse.iter())
            .fold(0u64, |acc, (&byte, row)| acc | row[byte as usize]);
        output.copy_from_slice(&result.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<QrcInfos>
<LyricInfo LyricCount="1">
<Lyric_1 LyricType="1" LyricContent="[ti:晴天]
[0,1500]故(0,300)事(300,400)的(700,300)小(1000,250)黄(1250,250)
"/>
</LyricInfo>
</QrcInfos>"#;

    #[test]
    fn test_key_schedule_matches_reference() {
        let schedule = des::key_schedule(des::KEY_1, des::Direction::Encrypt);
        assert_eq!(schedule[0], [0x40, 0x0C, 0x26, 0x10, 0x28, 0x08]);
        assert_eq!(schedule[1], [0x40, 0xA6, 0x20, 0x14, 0x04, 0x15]);
        assert_eq!(schedule[7], [0x07, 0x51, 0x10, 0x72, 0x10, 0x40]);
        assert_eq!(schedule[15], [0xD0, 0x2C, 0x04, 0x00, 0xCA, 0x82]);

        let reversed = des::key_schedule(des::KEY_1, des::Direction::Decrypt);
        assert_eq!(reversed[0], schedule[15]);
        assert_eq!(reversed[15], schedule[0]);
    }

    #[test]
    fn test_round_trip() {
        let encrypted = encrypt_qrc(SAMPLE).unwrap();
        assert_eq!(encrypted.len() % 16, 0);
        assert_eq!(decrypt_qrc(&encrypted).unwrap(), SAMPLE);
        assert_eq!(decrypt_qrc(&encrypted.to_lowercase()).unwrap(), SAMPLE);
    }

    #[test]
    fn test_bad_length_is_rejected() {
        assert!(matches!(
            decrypt_qrc("ABCDEF"),
            Err(LyricsError::Decryption(_))
        ));
        assert!(matches!(decrypt_qrc("zz"), Err(LyricsError::Decryption(_))));
    }

    #[test]
    fn test_fallback_accepts_base64_and_hex() {
        let base64_payload = BASE64.encode("[00:01.00]hello");
        assert_eq!(
            decrypt_with_fallback(&base64_payload).unwrap(),
            "[00:01.00]hello"
        );

        let encrypted = encrypt_qrc("[00:01.00]hello").unwrap();
        assert_eq!(
            decrypt_with_fallback(&encrypted).unwrap(),
            "[00:01.00]hello"
        );
        assert_eq!(decrypt_with_fallback("  ").unwrap(), "");
    }
}
