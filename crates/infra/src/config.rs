//! Workflow configuration.

use globalsourcing_core::PageRequest;

/// Tunables of the workflow services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// How many times an operation is run against a fresh snapshot before a
    /// version conflict is reported to the caller.
    pub commit_attempts: u32,
    /// Page size used when a request asks for 0 items.
    pub default_page_size: usize,
    /// Upper bound on any requested page size.
    pub max_page_size: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            commit_attempts: 3,
            default_page_size: 20,
            max_page_size: 200,
        }
    }
}

impl WorkflowConfig {
    /// Read `GLOBALSOURCING_*` variables; missing or unparseable values keep
    /// their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            commit_attempts: env_or("GLOBALSOURCING_COMMIT_ATTEMPTS", defaults.commit_attempts),
            default_page_size: env_or(
                "GLOBALSOURCING_DEFAULT_PAGE_SIZE",
                defaults.default_page_size,
            ),
            max_page_size: env_or("GLOBALSOURCING_MAX_PAGE_SIZE", defaults.max_page_size),
        }
    }

    pub fn with_commit_attempts(mut self, attempts: u32) -> Self {
        self.commit_attempts = attempts;
        self
    }

    pub fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    pub fn with_max_page_size(mut self, size: usize) -> Self {
        self.max_page_size = size;
        self
    }

    /// Apply the page-size policy to a caller's request.
    pub fn page(&self, request: PageRequest) -> PageRequest {
        let size = if request.size == 0 {
            self.default_page_size
        } else {
            request.size
        };
        PageRequest::new(request.page, size.min(self.max_page_size.max(1)))
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_uses_default_and_large_sizes_are_clamped() {
        let config = WorkflowConfig::default()
            .with_default_page_size(10)
            .with_max_page_size(50);

        assert_eq!(config.page(PageRequest::new(2, 0)), PageRequest::new(2, 10));
        assert_eq!(config.page(PageRequest::new(0, 500)), PageRequest::new(0, 50));
        assert_eq!(config.page(PageRequest::new(1, 7)), PageRequest::new(1, 7));
    }

    #[test]
    fn unparseable_env_value_falls_back() {
        assert_eq!(env_or("GLOBALSOURCING_TEST_UNSET_VARIABLE", 3u32), 3);
    }
}
