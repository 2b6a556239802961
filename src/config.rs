//! Generator configuration
//!
//! Settings are plain data; `from_env` lets drivers and tests flip the debug
//! switches without threading flags through every call site.

/// Code generation configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Dump a symbolic instruction listing for every finished method
    pub debug_code: bool,
    /// Record a local variable table (name, slot, live range) per method
    pub var_debug_info: bool,
    /// Emit `hasNext`/`next`/`iterator` members on iterator state classes
    pub iterator_protocol: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug_code: false,
            var_debug_info: true,
            iterator_protocol: true,
        }
    }
}

impl Config {
    /// Build a configuration from `TOLGEN_*` environment variables.
    ///
    /// `TOLGEN_DEBUG` enables listings, `TOLGEN_VAR_DEBUG=0` drops the local
    /// variable table.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if std::env::var("TOLGEN_DEBUG").is_ok() {
            config.debug_code = true;
        }
        if let Ok(v) = std::env::var("TOLGEN_VAR_DEBUG") {
            config.var_debug_info = !matches!(v.as_str(), "0" | "false" | "off");
        }
        config
    }

    pub fn with_debug_code(mut self, on: bool) -> Self {
        self.debug_code = on;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.debug_code);
        assert!(config.var_debug_info);
        assert!(config.iterator_protocol);
    }

    #[test]
    fn test_with_debug_code() {
        assert!(Config::default().with_debug_code(true).debug_code);
    }
}
