//! 密钥派生: 采样种子 -> 私钥 -> 公钥 -> 以太坊地址
//!
//! 派生后端在启动时按 [`SourceMode`] 选定一次，搜索循环只面对统一的
//! [`Deriver::try_derive`] 接口。无效标量 (0 或 >= 曲线阶) 返回 `Ok(None)`，
//! 由调用方静默重采样，不计入尝试数，也不作为错误上报。

use hmac::{Hmac, Mac};
use secp256k1::{All, PublicKey, Scalar, Secp256k1, SecretKey};
use sha2::Sha512;
use sha3::{Digest, Keccak256};

use crate::config::SourceMode;
use crate::mnemonic::Mnemonic;

const HARDENED: u32 = 0x8000_0000;

/// BIP44 以太坊派生路径 m/44'/60'/0'/0/0
const BIP44_ETH_PATH: [u32; 5] = [HARDENED | 44, HARDENED | 60, HARDENED, 0, 0];

/// 一次成功派生的产物
#[derive(Debug, Clone, Copy)]
pub struct Derived {
    /// 以太坊地址 (20字节)
    pub address: [u8; 20],
    /// 最终私钥 (32字节)
    pub private_key: [u8; 32],
}

/// 派生器，每个工作线程持有一个
pub struct Deriver {
    secp: Secp256k1<All>,
    mode: SourceMode,
}

impl Deriver {
    pub fn new(mode: SourceMode) -> Self {
        Self {
            secp: Secp256k1::new(),
            mode,
        }
    }

    /// 从 32 字节随机种子派生地址
    ///
    /// `Ok(None)` 表示种子落在无效标量范围，属于预期事件；
    /// `Err` 表示派生过程中的意外失败，由工作线程边界捕获上报。
    pub fn try_derive(&self, seed: &[u8; 32]) -> anyhow::Result<Option<Derived>> {
        let secret = match self.mode {
            SourceMode::PrivateKey => match SecretKey::from_slice(seed) {
                Ok(key) => key,
                Err(_) => return Ok(None),
            },
            SourceMode::MnemonicEntropy => match self.derive_bip44(seed)? {
                Some(key) => key,
                None => return Ok(None),
            },
        };

        Ok(Some(Derived {
            address: self.address_of(&secret),
            private_key: secret.secret_bytes(),
        }))
    }

    /// 熵 -> 助记词 -> 种子 -> m/44'/60'/0'/0/0 子私钥
    fn derive_bip44(&self, entropy: &[u8; 32]) -> anyhow::Result<Option<SecretKey>> {
        let mnemonic = Mnemonic::from_entropy(entropy)?;
        let seed = mnemonic.to_seed("");

        let master = hmac_sha512(b"Bitcoin seed", &seed)?;
        let mut secret = match SecretKey::from_slice(&master[..32]) {
            Ok(key) => key,
            Err(_) => return Ok(None),
        };
        let mut chain = [0u8; 32];
        chain.copy_from_slice(&master[32..]);

        for &index in &BIP44_ETH_PATH {
            let mut data = Vec::with_capacity(37);
            if index >= HARDENED {
                data.push(0x00);
                data.extend_from_slice(&secret.secret_bytes());
            } else {
                let public = PublicKey::from_secret_key(&self.secp, &secret);
                data.extend_from_slice(&public.serialize());
            }
            data.extend_from_slice(&index.to_be_bytes());

            let step = hmac_sha512(&chain, &data)?;
            let mut left = [0u8; 32];
            left.copy_from_slice(&step[..32]);

            let tweak = match Scalar::from_be_bytes(left) {
                Ok(tweak) => tweak,
                Err(_) => return Ok(None),
            };
            secret = match secret.add_tweak(&tweak) {
                Ok(key) => key,
                Err(_) => return Ok(None),
            };
            chain.copy_from_slice(&step[32..]);
        }

        Ok(Some(secret))
    }

    /// Keccak-256(未压缩公钥[1..65]) 的后 20 字节
    fn address_of(&self, secret: &SecretKey) -> [u8; 20] {
        let public = PublicKey::from_secret_key(&self.secp, secret);
        let uncompressed = public.serialize_uncompressed();

        let mut hasher = Keccak256::new();
        hasher.update(&uncompressed[1..]); // 跳过 0x04 前缀
        let hash = hasher.finalize();

        let mut address = [0u8; 20];
        address.copy_from_slice(&hash[12..]);
        address
    }
}

/// EIP-55 大小写校验格式，用于展示和结果文件
pub fn checksum_address(address: &[u8; 20]) -> String {
    ethers_core::utils::to_checksum(&ethers_core::types::Address::from_slice(address), None)
}

fn hmac_sha512(key: &[u8], data: &[u8]) -> anyhow::Result<[u8; 64]> {
    let mut mac = Hmac::<Sha512>::new_from_slice(key)
        .map_err(|e| anyhow::anyhow!("HMAC 初始化失败: {}", e))?;
    mac.update(data);

    let mut out = [0u8; 64];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}
