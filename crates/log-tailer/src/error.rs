//! 로그 테일러 에러 타입
//!
//! [`TailerError`]는 규칙 로딩, 파일 감시, 일괄 분석 중 발생하는 에러를 표현합니다.
//! `From<TailerError> for LogwatchError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use logwatch_core::error::LogwatchError;

/// 로그 테일러 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum TailerError {
    /// 규칙 파일 로딩 실패
    #[error("rule load error: {path}: {reason}")]
    RuleLoad {
        /// 규칙 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 규칙 유효성 검증 실패 (정규식 컴파일 실패 포함)
    #[error("rule validation error: rule '{rule}': {reason}")]
    RuleValidation {
        /// 문제가 된 규칙 이름
        rule: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 이미 감시 중인 경로
    #[error("already watching: {path}")]
    AlreadyWatching {
        /// 감시 경로
        path: String,
    },

    /// 파일 열기/생성 실패
    #[error("watch error: {path}: {reason}")]
    Watch {
        /// 감시 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 종료된 감시 집합 사용
    #[error("watch set has been stopped")]
    Stopped,

    /// 일괄 분석 실패
    #[error("analyze error: {path}: {reason}")]
    Analyze {
        /// 분석 대상 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TailerError> for LogwatchError {
    fn from(err: TailerError) -> Self {
        match err {
            TailerError::Io(e) => LogwatchError::Io(e),
            other => LogwatchError::Tailer(other.to_string()),
        }
    }
}
