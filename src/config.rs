//! 搜索配置和数据结构定义

use std::time::Duration;

/// 工作线程数量上限
pub const MAX_WORKERS: usize = 128;

/// 每批候选私钥数量的默认值
///
/// 工作线程每处理完一批才检查停止标志，批越大吞吐越高、
/// 停止延迟越长。默认值保证亚秒级的停止延迟。
pub const DEFAULT_BATCH_SIZE: usize = 1_000;

/// 协调器渲染/轮询间隔的默认值 (毫秒)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// 停止指令发出后等待工作线程退出的宽限期
pub const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// 以太坊地址的十六进制字符数 (20字节)
pub const ADDRESS_NIBBLES: usize = 40;

/// 超过该长度时提示搜索难度警告 (期望尝试数为 16^n)
pub const DIFFICULTY_WARN_NIBBLES: usize = 10;

/// 搜索条件校验错误
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    /// 前缀和后缀都为空
    #[error("prefix and suffix are both empty, specify at least one of them")]
    EmptyPattern,

    /// 包含非十六进制字符
    #[error("{field} contains non-hex character: {value:?} (use 0-9, a-f)")]
    InvalidHex { field: &'static str, value: String },

    /// 前缀加后缀超过地址长度
    #[error("prefix + suffix is {got} hex chars, address only has {ADDRESS_NIBBLES}")]
    PatternTooLong { got: usize },
}

/// 搜索条件 (不可变，所有工作线程共享只读)
///
/// 前缀/后缀均为小写十六进制，可以为空，但不能同时为空。
/// 期望尝试数按每个半字节独立 1/16 的概率模型计算:
/// `expected_tries = 16^(len(prefix) + len(suffix))`
#[derive(Debug, Clone)]
pub struct SearchSpec {
    /// 地址前缀 (不含 0x)
    pub prefix: String,
    /// 地址后缀
    pub suffix: String,
    /// 期望尝试数
    ///
    /// 使用 f64: 对 16 的幂在可用范围内精确，且 40+40 个半字节的
    /// 模式会溢出任何定长整数。
    pub expected_tries: f64,
}

impl SearchSpec {
    /// 校验并构建搜索条件，只在启动时调用一次
    pub fn new(prefix: &str, suffix: &str) -> Result<Self, SpecError> {
        check_hex("prefix", prefix)?;
        check_hex("suffix", suffix)?;

        if prefix.is_empty() && suffix.is_empty() {
            return Err(SpecError::EmptyPattern);
        }

        let nibbles = prefix.len() + suffix.len();
        if nibbles > ADDRESS_NIBBLES {
            return Err(SpecError::PatternTooLong { got: nibbles });
        }
        if nibbles > DIFFICULTY_WARN_NIBBLES {
            log::warn!(
                "模式共 {} 个字符，期望尝试数约 {:.2e}，搜索可能需要非常长的时间",
                nibbles,
                expected_tries(prefix.len(), suffix.len())
            );
        }

        Ok(Self {
            prefix: prefix.to_lowercase(),
            suffix: suffix.to_lowercase(),
            expected_tries: expected_tries(prefix.len(), suffix.len()),
        })
    }

    /// 模式中需要匹配的半字节总数
    pub fn nibbles(&self) -> usize {
        self.prefix.len() + self.suffix.len()
    }

    /// 完整模式展示，如 `0x8888********************************dead`
    pub fn pattern_display(&self) -> String {
        let wildcards = ADDRESS_NIBBLES - self.nibbles();
        format!("0x{}{}{}", self.prefix, "*".repeat(wildcards), self.suffix)
    }
}

/// 期望尝试数: 每个十六进制字符独立命中概率 1/16，联合概率取乘积
pub fn expected_tries(prefix_len: usize, suffix_len: usize) -> f64 {
    16f64.powi((prefix_len + suffix_len) as i32)
}

fn check_hex(field: &'static str, value: &str) -> Result<(), SpecError> {
    if value.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(SpecError::InvalidHex {
            field,
            value: value.to_string(),
        })
    }
}

/// 私钥来源模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// 直接将采样的 32 字节作为私钥
    PrivateKey,
    /// 将采样的 32 字节作为 BIP39 熵，经助记词和 m/44'/60'/0'/0/0 派生私钥
    MnemonicEntropy,
}

impl SourceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceMode::PrivateKey => "private-key",
            SourceMode::MnemonicEntropy => "mnemonic",
        }
    }
}
