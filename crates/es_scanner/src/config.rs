use std::path::Path;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use es_core::{Error, Result};

/// Vietnamese health-section feeds polled by every scan, in order.
pub const DEFAULT_FEEDS: &[&str] = &[
    "https://vnexpress.net/rss/suc-khoe.rss",
    "https://dantri.com.vn/rss/suc-khoe.rss",
    "https://tuoitre.vn/rss/suc-khoe.rss",
    "https://thanhnien.vn/rss/suc-khoe.rss",
    "https://suckhoedoisong.vn/rss/suc-khoe.rss",
    "https://vov.vn/rss/suc-khoe.rss",
    "https://tienphong.vn/rss/suc-khoe-210.rss",
    "https://laodong.vn/rss/suc-khoe.rss",
    "https://vietnamnet.vn/rss/suc-khoe.rss",
    "https://nhandan.vn/rss/y-te.rss",
    "http://cand.com.vn/rss/suc-khoe-c-5",
];

/// Advice, Q&A and lifestyle phrasing. A title containing any of these is
/// never relevant, whatever keywords it also contains.
pub const EXCLUDED_PHRASES: &[&str] = &[
    "tư vấn",
    "hỏi đáp",
    "lời khuyên",
    "có nên",
    "thực phẩm chức năng",
    "giảm cân",
    "làm đẹp",
    "bí quyết",
    "mẹo",
    "ăn gì",
    "uống gì",
];

pub const ALERT_PHRASES: &[&str] = &[
    "bùng phát",
    "ổ dịch",
    "khẩn cấp",
    "tử vong",
    "nguy kịch",
    "lây lan nhanh",
];

/// Tried in order against the lower-cased title and summary; first match wins.
pub const CASE_COUNT_PATTERNS: &[&str] = &[
    r"(\d+)\s+(ca\s+mắc|trường\s+hợp|người\s+nhiễm|ca\s+dương\s+tính)",
    r"(phát\s+hiện|ghi\s+nhận)\s+(\d+)\s+(ca|trường\s+hợp)",
];

/// Trusted outlets used when no whitelist is configured.
pub const DEFAULT_WHITELIST: &[&str] = &[
    "vnexpress.net",
    "dantri.com.vn",
    "tuoitre.vn",
    "thanhnien.vn",
    "suckhoedoisong.vn",
    "tienphong.vn",
    "laodong.vn",
    "vietnamnet.vn",
    "nhandan.vn",
    "cand.com.vn",
];

/// Notifiable-disease and outbreak terms offered by `keywords seed`.
pub const SUGGESTED_KEYWORDS: &[&str] = &[
    "Bại liệt", "cúm gia cầm", "dịch hạch", "đậu mùa", "bệnh tả", "tay chân miệng",
    "sốt phát ban", "sởi", "sốt xuất huyết", "bạch hầu", "ho gà", "viêm não nhật bản",
    "viêm não vi rút", "thủy đậu", "cúm A", "cúm B", "cúm mùa", "não mô cầu",
    "bệnh lạ", "viêm phổi nặng", "bệnh mới nổi", "chưa rõ tác nhân gây bệnh",
    "bùng phát ca bệnh", "gia tăng số ca bệnh", "gia tăng số lượng người nhập viện",
    "hàng loạt ca bệnh", "ổ dịch", "vụ dịch", "phản ứng nặng sau tiêm vắc xin",
    "tử vong do bệnh truyền nhiễm", "tử vong không rõ nguyên nhân", "tử vong sau tiêm vắc xin",
    "động vật ốm chết hàng loạt", "gia cầm ốm chết", "unknown disease", "emerging disease",
    "re-emerging disease", "avian influenza", "H5N1", "Bird Flu", "Ebola", "MERS",
    "public health emergency", "pandemic threat",
];

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Heuristic pattern lists and limits injected into the pipeline components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Heuristics {
    pub excluded_phrases: Vec<String>,
    pub alert_phrases: Vec<String>,
    pub case_count_patterns: Vec<String>,
    pub default_whitelist: Vec<String>,
    pub recent_window_hours: i64,
    pub summary_max_chars: usize,
    pub truncation_marker: String,
    pub default_location: String,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            excluded_phrases: to_strings(EXCLUDED_PHRASES),
            alert_phrases: to_strings(ALERT_PHRASES),
            case_count_patterns: to_strings(CASE_COUNT_PATTERNS),
            default_whitelist: to_strings(DEFAULT_WHITELIST),
            recent_window_hours: 5,
            summary_max_chars: 500,
            truncation_marker: "...".to_string(),
            default_location: "Việt Nam".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub feeds: Vec<String>,
    pub heuristics: Heuristics,
    pub http_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            feeds: to_strings(DEFAULT_FEEDS),
            heuristics: Heuristics::default(),
            http_timeout_secs: 15,
            user_agent: concat!("episcout/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ScannerConfig {
    /// Load a JSON config; missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.heuristics.summary_max_chars == 0 {
            return Err(Error::Config("summary_max_chars must be positive".to_string()));
        }
        if Duration::try_hours(self.heuristics.recent_window_hours).is_none() {
            return Err(Error::Config("recent_window_hours out of range".to_string()));
        }
        if self.feeds.iter().any(|f| f.trim().is_empty()) {
            return Err(Error::Config("feed URLs must not be empty".to_string()));
        }
        Ok(())
    }
}
