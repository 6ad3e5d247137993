//! 对外提供的 Rust 调用接口

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use anyhow::bail;

use crate::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_POLL_INTERVAL_MS, DRAIN_GRACE, MAX_WORKERS, SearchSpec, SourceMode,
};
use crate::coordinator::{Coordinator, PoolOptions, SearchOutcome};
use crate::derive::checksum_address;
use crate::mnemonic::Mnemonic;
use crate::sink::ResultSink;

/// 搜索请求
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub spec: SearchSpec,
    /// 请求的目标地址数量
    pub count: usize,
    /// 工作线程数
    pub workers: usize,
    /// 每批候选数
    pub batch_size: usize,
    /// 渲染/轮询间隔
    pub poll_interval: Duration,
    pub source_mode: SourceMode,
    /// 结果文件所在目录，None 表示不落盘
    pub results_dir: Option<PathBuf>,
    /// 外部取消标志 (如 Ctrl-C 处理器写入)，None 则内部创建
    pub cancel: Option<Arc<AtomicBool>>,
}

impl SearchRequest {
    pub fn new(spec: SearchSpec) -> Self {
        Self {
            spec,
            count: 1,
            workers: default_workers(),
            batch_size: DEFAULT_BATCH_SIZE,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            source_mode: SourceMode::PrivateKey,
            results_dir: Some(PathBuf::from(".")),
            cancel: None,
        }
    }
}

/// 默认工作线程数 = 可用并行度，封顶 [`MAX_WORKERS`]
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(MAX_WORKERS)
}

/// 展示用的命中结果
#[derive(Debug, Clone)]
pub struct FoundWallet {
    pub seq: usize,
    pub worker_id: usize,
    pub tries: u64,
    pub elapsed_secs: f64,
    pub rate: f64,
    /// EIP-55 校验格式地址
    pub address: String,
    /// 0x 前缀的私钥十六进制
    pub private_key: String,
    /// mnemonic 模式下的助记词
    pub mnemonic: Option<String>,
}

/// 搜索响应
#[derive(Debug)]
pub struct SearchResponse {
    pub wallets: Vec<FoundWallet>,
    pub cancelled: bool,
    pub total_tries: u64,
    pub elapsed: Duration,
    pub speed: f64,
    pub results_path: Option<PathBuf>,
}

/// 运行一次完整搜索，阻塞到线程池终止
pub fn search(request: SearchRequest) -> anyhow::Result<SearchResponse> {
    if request.count == 0 {
        bail!("count must be greater than 0");
    }
    if request.workers == 0 || request.workers > MAX_WORKERS {
        bail!("workers must be within [1, {}]", MAX_WORKERS);
    }
    if request.batch_size == 0 {
        bail!("batch size must be greater than 0");
    }

    let sink = match &request.results_dir {
        Some(dir) => Some(ResultSink::create(dir)?),
        None => None,
    };
    let results_path = sink.as_ref().map(|s| s.path().to_path_buf());
    let cancel = request
        .cancel
        .clone()
        .unwrap_or_else(|| Arc::new(AtomicBool::new(false)));

    let coordinator = Coordinator::new(
        Arc::new(request.spec.clone()),
        request.source_mode,
        PoolOptions {
            requested: request.count,
            workers: request.workers,
            batch_size: request.batch_size,
            poll_interval: request.poll_interval,
            grace: DRAIN_GRACE,
        },
        sink,
        cancel,
    );

    let outcome = coordinator.run()?;
    Ok(into_response(outcome, request.source_mode, results_path))
}

fn into_response(
    outcome: SearchOutcome,
    mode: SourceMode,
    results_path: Option<PathBuf>,
) -> SearchResponse {
    let wallets = outcome
        .wallets
        .iter()
        .enumerate()
        .map(|(i, result)| FoundWallet {
            seq: i + 1,
            worker_id: result.worker_id,
            tries: result.tries,
            elapsed_secs: result.elapsed_secs,
            rate: result.rate,
            address: checksum_address(&result.address),
            private_key: format!("0x{}", hex::encode(result.private_key)),
            mnemonic: match mode {
                SourceMode::MnemonicEntropy => Mnemonic::from_entropy(&result.seed)
                    .ok()
                    .map(|m| m.to_string()),
                SourceMode::PrivateKey => None,
            },
        })
        .collect();

    SearchResponse {
        wallets,
        cancelled: outcome.cancelled,
        total_tries: outcome.total_tries,
        elapsed: outcome.elapsed,
        speed: outcome.speed,
        results_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req = SearchRequest::new(SearchSpec::new("00", "").unwrap());
        assert_eq!(req.count, 1);
        assert_eq!(req.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(req.poll_interval, Duration::from_millis(250));
        assert_eq!(req.source_mode, SourceMode::PrivateKey);
        assert!(req.workers >= 1 && req.workers <= MAX_WORKERS);
        assert!(req.cancel.is_none());
    }

    #[test]
    fn test_search_rejects_zero_count() {
        let mut req = SearchRequest::new(SearchSpec::new("00", "").unwrap());
        req.count = 0;
        let err = search(req).unwrap_err();
        assert!(err.to_string().contains("count"));
    }

    #[test]
    fn test_search_rejects_worker_count_outside_cap() {
        let mut req = SearchRequest::new(SearchSpec::new("00", "").unwrap());
        req.workers = MAX_WORKERS + 1;
        let err = search(req).unwrap_err();
        assert!(err.to_string().contains("workers"));
    }
}
