//! 多线程CPU以太坊靓号地址搜索系统 - 主程序
//!
//! 使用方式:
//!   cargo run --release -- --prefix 8888
//!   cargo run --release -- --prefix dead --suffix beef --count 3
//!   cargo run --release -- --suffix 8888 --source-mode mnemonic --workers 8

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use log::info;

use rust_vanity::config::{DEFAULT_BATCH_SIZE, DEFAULT_POLL_INTERVAL_MS, MAX_WORKERS};
use rust_vanity::{SearchRequest, SearchSpec, SourceMode, default_workers, search};

/// 校验失败的退出码 (搜索尚未开始)
const EXIT_VALIDATION: i32 = 2;
/// 用户取消的退出码
const EXIT_CANCELLED: i32 = 130;

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum SourceModeArg {
    PrivateKey,
    Mnemonic,
}

impl From<SourceModeArg> for SourceMode {
    fn from(value: SourceModeArg) -> Self {
        match value {
            SourceModeArg::PrivateKey => SourceMode::PrivateKey,
            SourceModeArg::Mnemonic => SourceMode::MnemonicEntropy,
        }
    }
}

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "rust-vanity")]
#[command(about = "多线程CPU以太坊靓号地址搜索系统")]
#[command(version = "0.1.0")]
struct Args {
    /// 地址前缀 (十六进制，如 8888；前后缀至少给一个)
    #[arg(long, default_value = "")]
    prefix: String,

    /// 地址后缀 (十六进制，如 dead)
    #[arg(long, default_value = "")]
    suffix: String,

    /// 需要找到的地址数量
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,

    /// 工作线程数 (默认为可用并行度)
    #[arg(short = 'w', long)]
    workers: Option<usize>,

    /// 每批候选数，停止延迟与吞吐之间的权衡
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// 轮询间隔 (毫秒)
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    poll_interval: u64,

    /// 私钥来源模式: private-key(直接私钥) / mnemonic(助记词熵)
    #[arg(long, value_enum, default_value = "private-key")]
    source_mode: SourceModeArg,

    /// 结果文件所在目录
    #[arg(long, default_value = ".")]
    results_dir: PathBuf,

    /// 不写结果文件
    #[arg(long, default_value_t = false)]
    no_file: bool,
}

/// 校验参数并组装搜索请求
fn build_request(args: &Args) -> anyhow::Result<SearchRequest> {
    let spec = SearchSpec::new(&args.prefix, &args.suffix)?;

    if args.count == 0 {
        anyhow::bail!("--count 必须大于 0");
    }

    let workers = args.workers.unwrap_or_else(default_workers);
    if workers == 0 || workers > MAX_WORKERS {
        anyhow::bail!("--workers 必须在 [1, {}] 范围内，实际为 {}", MAX_WORKERS, workers);
    }

    if args.batch_size == 0 {
        anyhow::bail!("--batch-size 必须大于 0");
    }

    let mut request = SearchRequest::new(spec);
    request.count = args.count;
    request.workers = workers;
    request.batch_size = args.batch_size;
    request.poll_interval = Duration::from_millis(args.poll_interval);
    request.source_mode = args.source_mode.into();
    request.results_dir = if args.no_file {
        None
    } else {
        Some(args.results_dir.clone())
    };

    Ok(request)
}

/// 主函数
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    info!("启动 多线程CPU以太坊靓号地址搜索系统");

    let mut request = match build_request(&args) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("参数错误: {e}");
            eprintln!("用法示例: rust-vanity --prefix 8888 --suffix dead --count 1");
            std::process::exit(EXIT_VALIDATION);
        }
    };

    info!("搜索模式: {}", request.spec.pattern_display());
    info!(
        "期望尝试数: {:.0} (概率模型 16^{})",
        request.spec.expected_tries,
        request.spec.nibbles()
    );
    info!(
        "工作线程: {} | 批大小: {} | 来源模式: {}",
        request.workers,
        request.batch_size,
        request.source_mode.as_str()
    );
    info!("剩余时间估算将在工作线程首次汇报后显示");

    // Ctrl-C 只置位取消标志，排空由协调器统一执行
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            cancel.store(true, Ordering::SeqCst);
        })?;
    }
    request.cancel = Some(cancel);

    let response = search(request)?;

    println!();
    println!("========================================");
    if response.cancelled {
        println!("✗ 搜索已取消，找到 {} 个地址", response.wallets.len());
    } else {
        println!("✓ 搜索完成，共找到 {} 个地址", response.wallets.len());
    }
    if let Some(path) = &response.results_path {
        println!("结果文件: {}", path.display());
    }
    println!("搜索时间: {:.2} 秒", response.elapsed.as_secs_f64());
    println!(
        "检查地址数: {} | 平均速度: {:.0} 地址/秒",
        response.total_tries, response.speed
    );
    println!("========================================");

    if response.cancelled {
        std::process::exit(EXIT_CANCELLED);
    }

    Ok(())
}
