use crate::agent::AgentProfile;

/// Construct Chrome command-line arguments for a session.
///
/// `proxy` is threaded through here because Chrome only accepts it as a
/// launch argument, not a capability.
pub fn chrome_arguments(
    agent: &AgentProfile,
    headless: bool,
    proxy: Option<&str>,
) -> Vec<String> {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
        "--disable-extensions".to_string(),
        "--disable-plugins-discovery".to_string(),
        format!("--user-agent={}", agent.user_agent),
        format!("--window-size={},{}", agent.viewport.0, agent.viewport.1),
        format!("--lang={}", agent.languages.join(",")),
    ];
    if headless {
        args.push("--headless".to_string());
        args.push("--disable-gpu".to_string());
    }
    if let Some(proxy) = proxy {
        args.push(format!("--proxy-server={proxy}"));
    }
    args
}

/// JavaScript evasions applied at page load to reduce automation signals.
pub struct Evasions;

impl Evasions {
    pub fn core() -> &'static str {
        r#"
            Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
            Object.defineProperty(navigator, 'plugins', { get: () => [1,2,3] });
            Object.defineProperty(navigator, 'languages', {
                get: () => ['en-US', 'en']
            });
            if (!window.chrome) window.chrome = { runtime: {} };
        "#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentPool;

    #[test]
    fn headless_and_proxy_flags_are_conditional() {
        let mut pool = AgentPool::new();
        let agent = pool.session_profile().clone();

        let plain = chrome_arguments(&agent, false, None);
        assert!(!plain.iter().any(|a| a == "--headless"));
        assert!(!plain.iter().any(|a| a.starts_with("--proxy-server=")));

        let full = chrome_arguments(&agent, true, Some("http://proxy:8080"));
        assert!(full.iter().any(|a| a == "--headless"));
        assert!(full.iter().any(|a| a == "--proxy-server=http://proxy:8080"));
        assert!(full
            .iter()
            .any(|a| a.starts_with("--user-agent=Mozilla/5.0")));
    }
}
