//! 命中结果持久化
//!
//! 结果文件只由协调器追加 (单一写入方)，工作线程永远不直接碰文件，
//! 避免交错写入。文件名带时间戳，跨运行不冲突。

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::{SearchSpec, SourceMode};
use crate::derive::checksum_address;
use crate::mnemonic::Mnemonic;
use crate::worker::MatchResult;

/// 追加式结果文件
pub struct ResultSink {
    path: PathBuf,
    file: File,
}

impl ResultSink {
    /// 在指定目录创建 `vanity-found-<时间戳>.txt`
    pub fn create(dir: &Path) -> anyhow::Result<Self> {
        let name = format!(
            "vanity-found-{}.txt",
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        );
        let path = dir.join(name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("无法创建结果文件 {}", path.display()))?;

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一个结果块并立即刷盘
    pub fn append(
        &mut self,
        seq: usize,
        result: &MatchResult,
        spec: &SearchSpec,
        mode: SourceMode,
    ) -> anyhow::Result<()> {
        writeln!(self.file, "# {}", seq)?;
        writeln!(
            self.file,
            "时间: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(self.file, "模式: {}", spec.pattern_display())?;
        writeln!(self.file, "来源: {}", mode.as_str())?;
        writeln!(
            self.file,
            "线程: {} | 尝试: {} | 用时: {:.2} 秒 | 速度: {:.0} 地址/秒",
            result.worker_id, result.tries, result.elapsed_secs, result.rate
        )?;
        writeln!(self.file, "地址: {}", checksum_address(&result.address))?;
        writeln!(self.file, "私钥: 0x{}", hex::encode(result.private_key))?;
        if mode == SourceMode::MnemonicEntropy {
            let mnemonic = Mnemonic::from_entropy(&result.seed)?;
            writeln!(self.file, "助记词: {}", mnemonic)?;
        }
        writeln!(self.file, "----------------------------------------")?;
        self.file.flush()?;
        Ok(())
    }
}
