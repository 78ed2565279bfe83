/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 是否启用自动答题（外部开关）
    pub enabled: bool,
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 目标页面 URL 特征（用于在已打开的标签页中查找表单）
    pub target_url_pattern: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 持久化状态文件（限流窗口、最近错误等）
    pub state_file: String,
    /// 两次扫描之间的退避时间（毫秒）
    pub scan_backoff_ms: u64,
    // --- Gemini 配置 ---
    pub gemini_api_key: String,
    pub gemini_api_base_url: String,
    pub gemini_model_name: String,
    // --- 限流配置 ---
    /// 每分钟最大请求数
    pub rate_limit_per_minute: usize,
    /// 每小时最大请求数
    pub rate_limit_per_hour: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            browser_debug_port: 9222,
            target_url_pattern: "docs.google.com/forms".to_string(),
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            state_file: "answer_state.json".to_string(),
            scan_backoff_ms: 2000,
            gemini_api_key: String::new(),
            gemini_api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            gemini_model_name: "gemini-2.0-flash".to_string(),
            rate_limit_per_minute: 10,
            rate_limit_per_hour: 100,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            enabled: std::env::var("AUTO_ANSWER_ENABLED").ok().and_then(|v| v.parse().ok()).unwrap_or(default.enabled),
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_debug_port),
            target_url_pattern: std::env::var("TARGET_URL_PATTERN").unwrap_or(default.target_url_pattern),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            state_file: std::env::var("STATE_FILE").unwrap_or(default.state_file),
            scan_backoff_ms: std::env::var("SCAN_BACKOFF_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.scan_backoff_ms),
            gemini_api_key: std::env::var("GEMINI_API_KEY").unwrap_or(default.gemini_api_key),
            gemini_api_base_url: std::env::var("GEMINI_API_BASE_URL").unwrap_or(default.gemini_api_base_url),
            gemini_model_name: std::env::var("GEMINI_MODEL_NAME").unwrap_or(default.gemini_model_name),
            rate_limit_per_minute: std::env::var("RATE_LIMIT_PER_MINUTE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.rate_limit_per_minute),
            rate_limit_per_hour: std::env::var("RATE_LIMIT_PER_HOUR").ok().and_then(|v| v.parse().ok()).unwrap_or(default.rate_limit_per_hour),
        }
    }
}
