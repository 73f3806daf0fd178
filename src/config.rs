use clap::Parser;

use crate::retry::RetryPolicy;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "supervision-gateway")]
#[command(about = "Session supervision API with rate-limited LLM scoring")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 3000)]
    pub port: u16,

    // OpenAI-compatible API base url
    #[arg(long, default_value = "https://api.openai.com/v1")]
    pub llm_url: String,

    #[arg(long, default_value = "gpt-4o-mini")]
    pub llm_model: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    // Rate limit max requests per window
    #[arg(long, default_value_t = 10)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 60)]
    pub rate_window: u64,

    // Seconds between sweeps of expired rate limit entries, 0 disables
    #[arg(long, default_value_t = 300)]
    pub sweep_interval: u64,

    // Retries after a throttled LLM call
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    #[arg(long, default_value_t = 1000)]
    pub retry_base_ms: u64,

    // Backoff cap in ms, 0 means uncapped
    #[arg(long, default_value_t = 30_000)]
    pub retry_max_ms: u64,

    // Jitter as a fraction of the delay, 0 disables
    #[arg(long, default_value_t = 0.25)]
    pub retry_jitter: f64,

    #[arg(long, env = "SUPERVISOR_TOKEN", hide_env_values = true)]
    pub supervisor_token: Option<String>,

    #[arg(long, env = "ADMIN_TOKEN", hide_env_values = true)]
    pub admin_token: Option<String>,

    // Load default fellows and supervisor on startup
    #[arg(long, default_value_t = false)]
    pub seed: bool,
}

impl Args {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay_ms: self.retry_base_ms,
            max_delay_ms: (self.retry_max_ms > 0).then_some(self.retry_max_ms),
            jitter_fraction: self.retry_jitter.clamp(0.0, 1.0),
            max_retries: self.max_retries,
        }
    }
}
