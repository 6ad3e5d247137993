//! 搜索工作线程
//!
//! 每个工作线程独享随机源、计数器和计时器，与其他线程零共享可变状态，
//! 只通过消息通道向协调器汇报进度与命中。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;
use std::time::Instant;

use log::{debug, trace};
use rand::RngCore;

use crate::config::{SearchSpec, SourceMode};
use crate::derive::Deriver;
use crate::matcher::Matcher;

/// 单个工作线程的最新进度快照，后到的覆盖先到的
#[derive(Debug, Clone, Copy)]
pub struct ProgressSnapshot {
    pub worker_id: usize,
    /// 该线程累计的有效尝试数
    pub tries: u64,
    pub elapsed_secs: f64,
    /// 尝试速度 (次/秒)，elapsed 为零时取 0
    pub rate: f64,
}

/// 命中结果，每个工作线程一生至多产生一次
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub worker_id: usize,
    pub tries: u64,
    pub elapsed_secs: f64,
    pub rate: f64,
    /// 命中的地址 (20字节)
    pub address: [u8; 20],
    /// 最终私钥
    pub private_key: [u8; 32],
    /// 采样的原始种子: private-key 模式下等于私钥，mnemonic 模式下是熵
    pub seed: [u8; 32],
}

/// 工作线程 -> 协调器的消息
#[derive(Debug)]
pub enum WorkerEvent {
    Progress(ProgressSnapshot),
    Found(Box<MatchResult>),
    /// 派生过程的意外失败，该线程随即终止，不影响其余线程
    Failed { worker_id: usize, message: String },
}

/// 分级上报间隔: 早期上报更勤以尽快给出 ETA，后期放缓摊薄消息开销
pub fn report_interval(tries: u64) -> u64 {
    if tries < 10_000 {
        2_000
    } else if tries < 100_000 {
        10_000
    } else {
        25_000
    }
}

/// 搜索工作线程
pub struct SearchWorker {
    id: usize,
    spec: Arc<SearchSpec>,
    mode: SourceMode,
    batch_size: usize,
    stop: Arc<AtomicBool>,
    events: Sender<WorkerEvent>,
}

impl SearchWorker {
    pub fn new(
        id: usize,
        spec: Arc<SearchSpec>,
        mode: SourceMode,
        batch_size: usize,
        stop: Arc<AtomicBool>,
        events: Sender<WorkerEvent>,
    ) -> Self {
        Self {
            id,
            spec,
            mode,
            batch_size,
            stop,
            events,
        }
    }

    /// 在独立线程上启动采样循环
    pub fn spawn(self) -> anyhow::Result<JoinHandle<()>> {
        let name = format!("search-worker-{}", self.id);
        let handle = std::thread::Builder::new()
            .name(name)
            .spawn(move || self.run())?;
        Ok(handle)
    }

    fn run(self) {
        debug!("工作线程 {} 启动, 批大小 {}", self.id, self.batch_size);

        let matcher = Matcher::new(&self.spec);
        let deriver = Deriver::new(self.mode);
        let start = Instant::now();
        let mut tries: u64 = 0;

        // 停止标志每批检查一次，停止延迟以一批为上界
        while !self.stop.load(Ordering::Relaxed) {
            for _ in 0..self.batch_size {
                let mut seed = [0u8; 32];
                rand::rngs::OsRng.fill_bytes(&mut seed);

                let derived = match deriver.try_derive(&seed) {
                    Ok(Some(derived)) => derived,
                    // 无效标量: 静默重采样，不计入尝试数
                    Ok(None) => continue,
                    Err(e) => {
                        let _ = self.events.send(WorkerEvent::Failed {
                            worker_id: self.id,
                            message: e.to_string(),
                        });
                        return;
                    }
                };

                tries += 1;
                let address_hex = hex::encode(derived.address);

                if matcher.matches(&address_hex) {
                    let elapsed = start.elapsed().as_secs_f64();
                    let _ = self.events.send(WorkerEvent::Found(Box::new(MatchResult {
                        worker_id: self.id,
                        tries,
                        elapsed_secs: elapsed,
                        rate: safe_rate(tries, elapsed),
                        address: derived.address,
                        private_key: derived.private_key,
                        seed,
                    })));
                    // 命中后该线程永久停止，不再继续搜索
                    return;
                }

                if tries % report_interval(tries) == 0 {
                    let elapsed = start.elapsed().as_secs_f64();
                    if self
                        .events
                        .send(WorkerEvent::Progress(ProgressSnapshot {
                            worker_id: self.id,
                            tries,
                            elapsed_secs: elapsed,
                            rate: safe_rate(tries, elapsed),
                        }))
                        .is_err()
                    {
                        // 协调器已不在，没有继续的意义
                        return;
                    }
                }
            }
        }

        trace!("工作线程 {} 收到停止信号退出, 共 {} 次尝试", self.id, tries);
    }
}

fn safe_rate(tries: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs > 0.0 {
        tries as f64 / elapsed_secs
    } else {
        0.0
    }
}
