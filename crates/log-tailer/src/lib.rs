#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`rule`]: YAML 규칙 로딩, 정규식 컴파일, 라인 매칭
//! - [`watcher`]: 파일별 증분 읽기 및 감시 집합 관리
//! - [`bus`]: 감시자와 소비자를 잇는 용량 제한 알림 큐
//! - [`distributor`]: 알림 이력 및 구독자 팬아웃
//! - [`analyzer`]: 파일 일괄 분석
//! - [`parser`]: 라인 요약 및 타임스탬프 휴리스틱
//! - [`config`]: 테일러 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! RuleEngine <- FileWatcher x N (WatchSet) -> AlertBus -> AlertDistributor -> subscribers
//!                     |                          |
//!              poll + resync              drop-newest on full
//! ```

pub mod analyzer;
pub mod bus;
pub mod config;
pub mod distributor;
pub mod error;
pub mod parser;
pub mod rule;
pub mod watcher;

// --- 주요 타입 re-export ---

// 설정
pub use config::{TailerConfig, TailerConfigBuilder};

// 에러
pub use error::TailerError;

// 규칙 엔진
pub use rule::{LogFileSpec, Rule, RuleEngine, RuleLoader, RuleSetConfig};

// 감시
pub use watcher::{FileWatcher, WatchSet, WatchSetStats, WatcherStats};

// 알림 큐 / 배포
pub use bus::{AlertBus, AlertStream, BusStats};
pub use distributor::{AlertDistributor, AlertRecord, DistributorConfig, Subscription};

// 일괄 분석
pub use analyzer::{AnalysisEntry, Analyzer};
