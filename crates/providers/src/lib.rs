//! Language model clients and the provider router used by the pipeline.

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod router;

pub use router::ProviderRouter;

use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;

// Report generation over ~80k characters of input can take minutes
pub(crate) static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(300))
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
});
