//! 多线程CPU以太坊靓号地址搜索系统
//!
//! 本库在 CPU 上并行搜索符合前缀/后缀条件的以太坊地址。
//! N 个工作线程独立随机采样私钥，协调器聚合进度、记录命中并
//! 负责整个线程池的有序停止。

pub mod api;
pub mod config;
pub mod coordinator;
pub mod derive;
pub mod matcher;
pub mod mnemonic;
pub mod progress;
pub mod sink;
pub mod worker;

pub use api::{FoundWallet, SearchRequest, SearchResponse, default_workers, search};
pub use config::{SearchSpec, SourceMode, SpecError, expected_tries};
pub use coordinator::{Coordinator, PoolOptions, PoolState, SearchOutcome, StopCause};
pub use derive::{Derived, Deriver, checksum_address};
pub use matcher::Matcher;
pub use mnemonic::Mnemonic;
pub use progress::ProgressAggregator;
pub use sink::ResultSink;
pub use worker::{MatchResult, ProgressSnapshot, SearchWorker, WorkerEvent};
