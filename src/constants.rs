pub const MAX_INFO_CHARS: usize = 100;
pub const TRUNCATION_MARKER: &str = "...";

pub const UPDATE_INFO_GAS_LIMIT: u64 = 200_000;
pub const RECEIPT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_RECEIPT_TIMEOUT_SEC: u64 = 120;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const DEFAULT_PROMPT: &str =
    "Summarize the main benefits of blockchain technology in one sentence.";
