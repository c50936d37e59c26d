use ideascout_core::{Error, Result};
use std::time::Duration;

pub mod chunk;
pub mod convex;
pub mod extract;
pub mod firecrawl;
pub mod jsonl_store;
pub mod openai_compat;
pub mod research;
pub mod retry;
pub mod textprep;

/// First non-blank value among `keys`, trimmed. Blank values count as unset.
pub fn env_any(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| {
        std::env::var(k)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Shared HTTP client for every provider and store.
///
/// Completions over 8k-char chunks can take a while, so the overall timeout is generous;
/// the connect timeout keeps dead hosts from stalling a request.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("ideascout/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(120))
        .build()
        .map_err(|e| Error::NotConfigured(format!("http client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Run `f` with `vars` set, removing them afterwards. Keys must be unique to the test.
    fn with_vars<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        for (k, v) in vars {
            std::env::set_var(k, v);
        }
        let out = f();
        for (k, _) in vars {
            std::env::remove_var(k);
        }
        out
    }

    #[test]
    fn blank_values_are_skipped_in_favor_of_later_keys() {
        let found = with_vars(
            &[
                ("IDEASCOUT_TEST_ENV_ANY_A", "  "),
                ("IDEASCOUT_TEST_ENV_ANY_B", " value "),
            ],
            || env_any(&["IDEASCOUT_TEST_ENV_ANY_A", "IDEASCOUT_TEST_ENV_ANY_B"]),
        );
        assert_eq!(found, Some("value".to_string()));
        assert_eq!(env_any(&["IDEASCOUT_TEST_ENV_ANY_MISSING"]), None);
    }

    #[test]
    fn http_client_builds() {
        assert!(http_client().is_ok());
    }
}
