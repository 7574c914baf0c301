//! Pipeline and request-gate configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the request gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Queries longer than this many characters are refused.
    pub max_query_chars: usize,

    /// Queries shorter than this many characters (after trimming) are
    /// refused.
    pub min_query_chars: usize,

    /// Requests admitted per user within one window.
    pub max_requests: usize,

    /// Length of the sliding rate window, in seconds.
    pub window_seconds: u64,

    /// Blacklist patterns matched (case-insensitively) against the query;
    /// any match refuses the request. Defaults cover instruction-override,
    /// role-play, secret-probing, and SQL/XSS probes in both Vietnamese
    /// and English.
    pub blacklist_patterns: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_query_chars: 500,
            min_query_chars: 3,
            max_requests: 10,
            window_seconds: 60,
            blacklist_patterns: vec![
                r"(ignore|bỏ qua|forget|quên).+(instruction|hướng dẫn)".to_string(),
                r"(ignore|bỏ qua|forget).+(previous|trước|all|toàn bộ)".to_string(),
                r"(you are|bạn là|act as|đóng vai|giả sử|từ bây giờ).+(admin|god|developer|quản trị|hệ thống|trợ lý)".to_string(),
                r"(show|reveal|hiển thị|in ra|cho xem|tiết lộ|cho.+biết).+(prompt|source code|api key|database|cấu hình|config)".to_string(),
                r"api\s*key".to_string(),
                r"(SELECT|INSERT|UPDATE|DELETE|DROP)\s+".to_string(),
                r"<script|javascript:|<%|\$\{".to_string(),
                r"(system prompt|system instruction|hướng dẫn hệ thống)".to_string(),
                r"(toàn bộ prompt|full prompt|entire prompt)".to_string(),
                r"(không bị ràng buộc|không giới hạn|unrestricted)".to_string(),
            ],
        }
    }
}

/// Configuration for the pipeline orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Generic citation label used when a chunk has neither a title nor a
    /// usable identifier.
    pub generic_source_title: String,

    /// User-facing answer when every model in the pool fails.
    pub overloaded_message: String,

    /// User-facing answer when decomposition flags the query as carrying
    /// too many intents.
    pub too_complex_message: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            generic_source_title: "Tài liệu tuyển sinh".to_string(),
            overloaded_message: "Xin lỗi, hệ thống đang quá tải. Vui lòng thử lại sau.".to_string(),
            too_complex_message: "Xin lỗi, câu hỏi của bạn có quá nhiều ý. Để tôi có thể trả lời chính xác hơn, bạn vui lòng chia thành các câu hỏi nhỏ hơn nhé!".to_string(),
        }
    }
}
