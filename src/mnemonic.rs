//! BIP39 助记词生成与管理
//!
//! 词表来自 bip39 crate 的英文标准词表 (2048个单词)，
//! 熵到单词索引的切分与种子派生在本模块完成。

use byteorder::{BigEndian, ByteOrder};
use rand::RngCore;
use sha2::{Digest, Sha256, Sha512};

/// BIP39 助记词 (24个单词 = 256位熵 + 8位校验和)
#[derive(Debug, Clone)]
pub struct Mnemonic {
    /// 24个单词的索引 (每个索引 0-2047)
    pub words: [u16; 24],
}

impl Mnemonic {
    /// 生成随机助记词
    pub fn generate_random() -> anyhow::Result<Self> {
        let mut entropy = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut entropy);
        Self::from_entropy(&entropy)
    }

    /// 从 32 字节熵生成助记词
    pub fn from_entropy(entropy: &[u8; 32]) -> anyhow::Result<Self> {
        // 校验和: SHA256 前8位 (1字节)
        let hash = Sha256::digest(entropy);

        // 256位熵 + 8位校验和 = 264位 = 24 x 11位
        // 末尾补一个零字节，使任意 11 位窗口都能按 24 位读取
        let mut data = [0u8; 34];
        data[..32].copy_from_slice(entropy);
        data[32] = hash[0];

        let mut words = [0u16; 24];
        for (i, word) in words.iter_mut().enumerate() {
            let bit_offset = i * 11;
            let byte_offset = bit_offset / 8;
            let shift = 24 - 11 - (bit_offset % 8);

            let window = BigEndian::read_u24(&data[byte_offset..byte_offset + 3]);
            *word = ((window >> shift) & 0x7FF) as u16;
        }

        Ok(Self { words })
    }

    /// 转换为 BIP39 种子 (PBKDF2-HMAC-SHA512, 2048 轮)
    pub fn to_seed(&self, passphrase: &str) -> [u8; 64] {
        let phrase = self.to_string();
        let salt = format!("mnemonic{}", passphrase);

        let mut seed = [0u8; 64];
        pbkdf2::pbkdf2_hmac::<Sha512>(phrase.as_bytes(), salt.as_bytes(), 2048, &mut seed);
        seed
    }

    /// 从助记词字符串解析
    pub fn from_string(s: &str) -> anyhow::Result<Self> {
        let wordlist = wordlist();
        let word_strs: Vec<&str> = s.split_whitespace().collect();

        if word_strs.len() != 24 {
            anyhow::bail!("Expected 24 words, got {}", word_strs.len());
        }

        let mut words = [0u16; 24];
        for (i, word) in word_strs.iter().enumerate() {
            match wordlist.iter().position(|w| w == word) {
                Some(idx) => words[i] = idx as u16,
                None => anyhow::bail!("Unknown word: {}", word),
            }
        }

        Ok(Self { words })
    }
}

impl std::fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let wordlist = wordlist();
        for (i, &idx) in self.words.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(wordlist[idx as usize])?;
        }
        Ok(())
    }
}

/// BIP39 英文标准词表
fn wordlist() -> &'static [&'static str] {
    bip39::Language::English.word_list()
}
