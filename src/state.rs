use std::sync::Arc;

use crate::auth::Authenticator;
use crate::llm::LlmProvider;
use crate::rate_limit::RateLimiter;
use crate::retry::RetryPolicy;
use crate::store::Store;

// app's shared state
pub struct AppState {
    pub store: Store,
    pub rate_limiter: Arc<RateLimiter>, // shared with the sweeper task
    pub llm: Arc<dyn LlmProvider>,
    pub retry_policy: RetryPolicy,
    pub auth: Authenticator,
}
