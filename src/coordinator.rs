//! 线程池协调器
//!
//! 状态机: Idle -> Spawning -> Running -> Draining -> Terminated。
//! 协调器是聚合状态、命中计数和结果文件的唯一写入方，所有工作线程的
//! 消息经同一条通道逐条处理，线程间无锁。
//!
//! 策略说明 (全程统一):
//! - 工作线程命中一次后永久停止；只要还未集齐目标数，协调器就补充
//!   一个新线程保持搜索容量。
//! - 超出请求数的并发命中照常入档和展示 (审计)，但只有第一次达到
//!   阈值会触发一次排空，不会重复宣布完成。

use std::io::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::bail;
use log::{debug, info, warn};

use crate::config::{SearchSpec, SourceMode};
use crate::derive::checksum_address;
use crate::mnemonic::Mnemonic;
use crate::progress::ProgressAggregator;
use crate::sink::ResultSink;
use crate::worker::{MatchResult, ProgressSnapshot, SearchWorker, WorkerEvent};

/// 线程池生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Idle,
    Spawning,
    Running,
    Draining,
    Terminated,
}

/// 停止原因，决定进程退出码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// 达到请求的目标数
    Completed,
    /// 用户取消 (Ctrl-C)
    Cancelled,
}

/// 线程池参数
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// 请求的目标地址数量
    pub requested: usize,
    /// 工作线程数
    pub workers: usize,
    /// 每批候选数 (停止延迟的上界)
    pub batch_size: usize,
    /// 消息等待/渲染间隔
    pub poll_interval: Duration,
    /// 排空宽限期
    pub grace: Duration,
}

/// 一次搜索的最终结果
#[derive(Debug)]
pub struct SearchOutcome {
    /// 全部入档的命中 (可能多于请求数，见模块注释)
    pub wallets: Vec<MatchResult>,
    pub cancelled: bool,
    pub total_tries: u64,
    pub elapsed: Duration,
    /// 全程平均速度 (次/秒)
    pub speed: f64,
}

pub struct Coordinator {
    spec: Arc<SearchSpec>,
    mode: SourceMode,
    options: PoolOptions,
    state: PoolState,
    stop: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    aggregator: ProgressAggregator,
    sink: Option<ResultSink>,
    wallets: Vec<MatchResult>,
    stop_cause: Option<StopCause>,
    drain_deadline: Option<Instant>,
    events_tx: Option<Sender<WorkerEvent>>,
    handles: Vec<JoinHandle<()>>,
    next_worker_id: usize,
    active_workers: usize,
    started: Instant,
}

impl Coordinator {
    pub fn new(
        spec: Arc<SearchSpec>,
        mode: SourceMode,
        options: PoolOptions,
        sink: Option<ResultSink>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        let aggregator = ProgressAggregator::new(spec.expected_tries, options.requested);
        Self {
            spec,
            mode,
            options,
            state: PoolState::Idle,
            stop: Arc::new(AtomicBool::new(false)),
            cancel,
            aggregator,
            sink,
            wallets: Vec::new(),
            stop_cause: None,
            drain_deadline: None,
            events_tx: None,
            handles: Vec::new(),
            next_worker_id: 0,
            active_workers: 0,
            started: Instant::now(),
        }
    }

    /// 运行到线程池终止，返回最终结果
    pub fn run(mut self) -> anyhow::Result<SearchOutcome> {
        self.started = Instant::now();
        self.state = PoolState::Spawning;
        info!("启动 {} 个工作线程", self.options.workers);

        let (tx, rx) = mpsc::channel();
        self.events_tx = Some(tx);
        for _ in 0..self.options.workers {
            self.spawn_worker()?;
        }
        self.state = PoolState::Running;

        self.event_loop(&rx)?;

        self.reap_workers();
        self.state = PoolState::Terminated;

        let elapsed = self.started.elapsed();
        let total_tries = self.aggregator.total_tries();
        let speed = if elapsed.as_secs_f64() > 0.0 {
            total_tries as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        Ok(SearchOutcome {
            wallets: std::mem::take(&mut self.wallets),
            cancelled: self.stop_cause == Some(StopCause::Cancelled),
            total_tries,
            elapsed,
            speed,
        })
    }

    fn event_loop(&mut self, rx: &Receiver<WorkerEvent>) -> anyhow::Result<()> {
        loop {
            if self.cancel.load(Ordering::Relaxed) && self.state == PoolState::Running {
                println!();
                info!("收到取消请求，停止线程池");
                self.begin_drain(StopCause::Cancelled);
            }

            match rx.recv_timeout(self.options.poll_interval) {
                Ok(WorkerEvent::Progress(snapshot)) => {
                    self.aggregator.update(snapshot);
                    if self.state == PoolState::Running {
                        self.render_progress();
                    }
                }
                Ok(WorkerEvent::Found(result)) => {
                    self.active_workers -= 1;
                    self.on_match(*result);
                }
                Ok(WorkerEvent::Failed { worker_id, message }) => {
                    self.active_workers -= 1;
                    warn!("工作线程 {} 异常终止: {}", worker_id, message);
                    if self.active_workers == 0 && self.state == PoolState::Running {
                        bail!("all workers failed before reaching the requested count");
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.state == PoolState::Running {
                        self.render_progress();
                    }
                }
                // 发送端全部消失 = 所有工作线程已退出
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            }

            if let Some(deadline) = self.drain_deadline {
                if Instant::now() >= deadline {
                    return Ok(());
                }
            }
        }
    }

    /// 处理一次命中。所有命中都入档；只有第一次达到阈值触发排空。
    fn on_match(&mut self, result: MatchResult) {
        // 命中线程的最终数字也计入聚合
        self.aggregator.update(ProgressSnapshot {
            worker_id: result.worker_id,
            tries: result.tries,
            elapsed_secs: result.elapsed_secs,
            rate: result.rate,
        });

        let seq = self.wallets.len() + 1;
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.append(seq, &result, &self.spec, self.mode) {
                warn!("结果写入失败: {:#}", e);
            }
        }
        self.print_found(seq, &result);
        self.wallets.push(result);

        if self.wallets.len() >= self.options.requested {
            if self.state == PoolState::Running {
                info!(
                    "已找到 {}/{} 个目标地址，停止线程池",
                    self.wallets.len(),
                    self.options.requested
                );
                self.begin_drain(StopCause::Completed);
            }
        } else if self.state == PoolState::Running {
            // 命中的线程已停止，补充一个保持容量
            if let Err(e) = self.spawn_worker() {
                warn!("补充工作线程失败: {:#}", e);
            }
        }
    }

    /// 进入排空态。只能从 Running 进入一次，重复调用无效果。
    fn begin_drain(&mut self, cause: StopCause) {
        if self.state != PoolState::Running {
            return;
        }
        self.state = PoolState::Draining;
        self.stop_cause = Some(cause);
        self.stop.store(true, Ordering::Relaxed);
        self.drain_deadline = Some(Instant::now() + self.options.grace);
        // 释放协调器手里的发送端，之后通道随最后一个工作线程关闭
        self.events_tx = None;
    }

    fn spawn_worker(&mut self) -> anyhow::Result<()> {
        let Some(tx) = self.events_tx.as_ref() else {
            bail!("worker pool is already draining");
        };
        let id = self.next_worker_id;
        self.next_worker_id += 1;

        let worker = SearchWorker::new(
            id,
            self.spec.clone(),
            self.mode,
            self.options.batch_size,
            self.stop.clone(),
            tx.clone(),
        );
        self.handles.push(worker.spawn()?);
        self.active_workers += 1;
        debug!("工作线程 {} 已就位", id);
        Ok(())
    }

    /// 宽限期内等待线程退出，到期后放弃仍未退出的线程
    fn reap_workers(&mut self) {
        let deadline = Instant::now() + self.options.grace;
        let mut pending = std::mem::take(&mut self.handles);

        while Instant::now() < deadline {
            pending.retain(|handle| !handle.is_finished());
            if pending.is_empty() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        for handle in pending {
            warn!(
                "工作线程 {} 未在宽限期内退出，放弃等待",
                handle.thread().name().unwrap_or("<unnamed>")
            );
        }
    }

    fn render_progress(&self) {
        let tries = self.aggregator.total_tries();
        if tries == 0 {
            return;
        }
        let eta = match self.aggregator.eta_secs(self.wallets.len()) {
            Some(secs) => format_eta(secs),
            None => String::from("--"),
        };
        print!(
            "\r尝试 {} | 用时 {:.1} 秒 | 速度 {:.0} 地址/秒 | 命中概率 {:.2}% | 预计剩余 {}   ",
            tries,
            self.started.elapsed().as_secs_f64(),
            self.aggregator.total_rate(),
            self.aggregator.hit_probability() * 100.0,
            eta
        );
        let _ = std::io::stdout().flush();
    }

    fn print_found(&self, seq: usize, result: &MatchResult) {
        println!();
        println!("========================================");
        println!(
            "✓ 找到第 {} 个符合条件的地址! (线程 {})",
            seq, result.worker_id
        );
        println!("地址: {}", checksum_address(&result.address));
        println!("私钥: 0x{}", hex::encode(result.private_key));
        if self.mode == SourceMode::MnemonicEntropy {
            match Mnemonic::from_entropy(&result.seed) {
                Ok(mnemonic) => println!("助记词: {}", mnemonic),
                Err(e) => warn!("助记词重建失败: {:#}", e),
            }
        }
        println!(
            "尝试: {} | 用时: {:.2} 秒 | 速度: {:.0} 地址/秒",
            result.tries, result.elapsed_secs, result.rate
        );
        println!("========================================");
    }
}

/// 估算秒数的人类可读格式
fn format_eta(secs: f64) -> String {
    if secs < 60.0 {
        format!("{:.0} 秒", secs)
    } else if secs < 3600.0 {
        format!("{:.1} 分钟", secs / 60.0)
    } else if secs < 86400.0 {
        format!("{:.1} 小时", secs / 3600.0)
    } else {
        format!("{:.1} 天", secs / 86400.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_coordinator(requested: usize) -> Coordinator {
        let spec = Arc::new(SearchSpec::new("ab", "").unwrap());
        Coordinator::new(
            spec,
            SourceMode::PrivateKey,
            PoolOptions {
                requested,
                workers: 2,
                batch_size: 64,
                poll_interval: Duration::from_millis(50),
                grace: Duration::from_secs(2),
            },
            None,
            Arc::new(AtomicBool::new(false)),
        )
    }

    fn match_from(worker_id: usize) -> MatchResult {
        MatchResult {
            worker_id,
            tries: 100,
            elapsed_secs: 1.0,
            rate: 100.0,
            address: [0xab; 20],
            private_key: [0x01; 32],
            seed: [0x01; 32],
        }
    }

    #[test]
    fn test_first_threshold_crossing_drains_once() {
        let mut coord = test_coordinator(1);
        coord.state = PoolState::Running;

        coord.on_match(match_from(0));
        assert_eq!(coord.state, PoolState::Draining);
        assert_eq!(coord.stop_cause, Some(StopCause::Completed));
        assert!(coord.stop.load(Ordering::Relaxed));
        let first_deadline = coord.drain_deadline.unwrap();

        // 并发迟到的第二个命中: 入档但不重新触发排空
        coord.on_match(match_from(1));
        assert_eq!(coord.wallets.len(), 2);
        assert_eq!(coord.state, PoolState::Draining);
        assert_eq!(coord.stop_cause, Some(StopCause::Completed));
        assert_eq!(coord.drain_deadline.unwrap(), first_deadline);
    }

    #[test]
    fn test_cancel_cause_is_not_overwritten_by_late_match() {
        let mut coord = test_coordinator(1);
        coord.state = PoolState::Running;

        coord.begin_drain(StopCause::Cancelled);
        assert_eq!(coord.state, PoolState::Draining);

        coord.on_match(match_from(0));
        assert_eq!(coord.stop_cause, Some(StopCause::Cancelled));
        assert_eq!(coord.wallets.len(), 1);
    }

    #[test]
    fn test_matches_feed_the_aggregator() {
        let mut coord = test_coordinator(2);
        coord.state = PoolState::Running;
        coord.events_tx = Some(mpsc::channel().0);

        coord.on_match(match_from(0));
        assert_eq!(coord.aggregator.total_tries(), 100);
        assert_eq!(coord.state, PoolState::Running);
    }

    #[test]
    fn test_begin_drain_is_idempotent() {
        let mut coord = test_coordinator(1);
        coord.state = PoolState::Running;

        coord.begin_drain(StopCause::Completed);
        let deadline = coord.drain_deadline.unwrap();
        coord.begin_drain(StopCause::Cancelled);

        assert_eq!(coord.stop_cause, Some(StopCause::Completed));
        assert_eq!(coord.drain_deadline.unwrap(), deadline);
    }
}
