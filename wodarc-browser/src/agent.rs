use rand::prelude::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Snapshot of user agent, viewport, and locale characteristics.
pub struct AgentProfile {
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub platform: String,
    pub languages: Vec<String>,
}

#[derive(Debug, Clone)]
/// Small pool of plausible desktop fingerprints; one is picked per session
/// and reused for its whole lifetime so the fingerprint stays coherent.
pub struct AgentPool {
    desktop_profiles: Vec<AgentProfile>,
    current_session_profile: Option<AgentProfile>,
}

impl Default for AgentPool {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentPool {
    /// Create a pool with built-in desktop profiles.
    pub fn new() -> Self {
        Self {
            desktop_profiles: vec![
                AgentProfile {
                    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                    viewport: (1920, 1080),
                    platform: "Win32".to_string(),
                    languages: vec!["en-US".to_string(), "en".to_string()],
                },
                AgentProfile {
                    user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                    viewport: (1440, 900),
                    platform: "MacIntel".to_string(),
                    languages: vec!["en-US".to_string(), "en".to_string()],
                },
                AgentProfile {
                    user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                    viewport: (1920, 1080),
                    platform: "Linux x86_64".to_string(),
                    languages: vec!["en-US".to_string(), "en".to_string()],
                },
                AgentProfile {
                    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0".to_string(),
                    viewport: (1536, 864),
                    platform: "Win32".to_string(),
                    languages: vec!["en-US".to_string(), "en".to_string()],
                },
            ],
            current_session_profile: None,
        }
    }

    /// Get (or lazily select) the current session profile.
    pub fn session_profile(&mut self) -> &AgentProfile {
        if self.current_session_profile.is_none() {
            let mut rng = rand::thread_rng();
            let p = self.desktop_profiles.choose(&mut rng).unwrap().clone();
            self.current_session_profile = Some(p);
        }
        self.current_session_profile.as_ref().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_profile_is_sticky() {
        let mut pool = AgentPool::new();
        let first = pool.session_profile().user_agent.clone();
        for _ in 0..10 {
            assert_eq!(pool.session_profile().user_agent, first);
        }
    }
}
