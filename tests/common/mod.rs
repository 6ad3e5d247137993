//! 测试公共模块
//!
//! 提供独立于被测实现的参考派生函数，用于交叉验证。

use bip32::XPrv;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use sha3::{Digest, Keccak256};

/// 从私钥字节生成以太坊地址 (标准参考实现)
pub fn address_from_private_key(private_key: &[u8; 32]) -> anyhow::Result<[u8; 20]> {
    let secp = Secp256k1::new();
    let secret_key = SecretKey::from_slice(private_key)
        .map_err(|e| anyhow::anyhow!("无效的私钥: {}", e))?;
    let public_key = PublicKey::from_secret_key(&secp, &secret_key);

    let uncompressed = public_key.serialize_uncompressed();
    let mut hasher = Keccak256::new();
    hasher.update(&uncompressed[1..]); // 跳过 0x04 前缀
    let hash = hasher.finalize();

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Ok(address)
}

/// 从助记词生成以太坊地址 (使用 bip32 crate)
///
/// # Arguments
/// * `mnemonic_str` - BIP39 助记词字符串
/// * `path` - 派生路径，如 "m/44'/60'/0'/0/0"
///
/// # Returns
/// 返回以太坊地址 (20字节) 和对应的私钥 (32字节)
pub fn ethereum_address_from_mnemonic(
    mnemonic_str: &str,
    path: &str,
) -> anyhow::Result<([u8; 20], [u8; 32])> {
    let bip39_mnemonic = bip39::Mnemonic::parse_in(bip39::Language::English, mnemonic_str)
        .map_err(|e| anyhow::anyhow!("解析助记词失败: {}", e))?;

    let seed = bip39_mnemonic.to_seed("");

    let xprv = XPrv::new(&seed).map_err(|e| anyhow::anyhow!("创建主密钥失败: {}", e))?;
    let child_xprv = derive_path(&xprv, path)?;

    let private_key: [u8; 32] = child_xprv.private_key().to_bytes().into();
    let address = address_from_private_key(&private_key)?;

    Ok((address, private_key))
}

/// 解析派生路径并派生子密钥
fn derive_path(xprv: &XPrv, path: &str) -> anyhow::Result<XPrv> {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.is_empty() || parts[0] != "m" {
        anyhow::bail!("Invalid derivation path: must start with 'm'");
    }

    let mut current = xprv.clone();

    for part in &parts[1..] {
        let (index, hardened) = if let Some(stripped) = part.strip_suffix('\'') {
            let num: u32 = stripped
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid path component: {}", e))?;
            (num, true)
        } else {
            let num: u32 = part
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid path component: {}", e))?;
            (num, false)
        };

        current = current
            .derive_child(
                bip32::ChildNumber::new(index, hardened)
                    .map_err(|e| anyhow::anyhow!("派生失败: {}", e))?,
            )
            .map_err(|e| anyhow::anyhow!("派生失败: {}", e))?;
    }

    Ok(current)
}
