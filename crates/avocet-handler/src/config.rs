//! 处理器配置
//!
//! 源代码行为有歧义的两处（重复 stop、运行中重载布局）在这里
//! 做成显式配置，默认值取保守一侧。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 对已停止会话再次调用 `stop` 的策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    /// 幂等空操作（默认）
    #[default]
    NoOp,
    /// 返回 AlreadyStopped 错误
    Error,
}

/// 处理器配置
///
/// 支持从 TOML 文件加载；所有字段都有默认值，配置文件可以只写差异项。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// 对已停止/空闲会话调用 `stop` 时的策略
    pub stop_when_stopped: StopPolicy,

    /// 允许会话运行中重载布局（默认关闭；打开以兼容旧行为）
    pub allow_load_while_running: bool,

    /// 允许放回仍含液体的吸头（默认关闭）
    pub allow_nonzero_tip_volume: bool,
}

/// 配置解析错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// TOML 解析失败
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl HandlerConfig {
    /// 从 TOML 字符串解析
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_conservative() {
        let config = HandlerConfig::default();
        assert_eq!(config.stop_when_stopped, StopPolicy::NoOp);
        assert!(!config.allow_load_while_running);
        assert!(!config.allow_nonzero_tip_volume);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = HandlerConfig::from_toml_str("allow_load_while_running = true\n").unwrap();
        assert!(config.allow_load_while_running);
        // 未写的字段取默认值
        assert_eq!(config.stop_when_stopped, StopPolicy::NoOp);
    }

    #[test]
    fn test_from_toml_full() {
        let input = r#"
stop_when_stopped = "error"
allow_load_while_running = true
allow_nonzero_tip_volume = true
"#;
        let config = HandlerConfig::from_toml_str(input).unwrap();
        assert_eq!(config.stop_when_stopped, StopPolicy::Error);
        assert!(config.allow_load_while_running);
        assert!(config.allow_nonzero_tip_volume);
    }

    #[test]
    fn test_from_toml_invalid() {
        assert!(HandlerConfig::from_toml_str("stop_when_stopped = 42").is_err());
        assert!(HandlerConfig::from_toml_str("not toml [[").is_err());
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = HandlerConfig {
            stop_when_stopped: StopPolicy::Error,
            allow_load_while_running: true,
            allow_nonzero_tip_volume: false,
        };
        let text = toml::to_string(&config).unwrap();
        let back = HandlerConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
