//! 라인 휴리스틱 -- 요약 추출 및 타임스탬프 추정
//!
//! 정식 로그 파서가 아닌 최선 노력(best-effort) 추출입니다.
//!
//! - [`summary`]: 프로세스/PID 접두어를 걷어낸 사람이 읽을 요약
//! - [`timestamp`]: 라인 앞부분에서 타임스탬프 텍스트를 찾아 해석

pub mod summary;
pub mod timestamp;

pub use summary::summarize_line;
pub use timestamp::{extract_timestamp, resolve_timestamp};
