use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimforgeConfig {
    pub log_level: Option<String>,
    pub llm: LlmConfig,
    pub sandbox: SandboxConfig,
    pub codegen: CodegenConfig,
    pub agent: AgentConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    pub api_key_env: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_tokens: 4096,
            timeout_ms: 120000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub interpreter: String,
    pub artifact_dir: PathBuf,
    pub timeout_ms: u64,
    pub max_output_bytes: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            artifact_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("simforge")
                .join("artifacts"),
            timeout_ms: 30000,
            max_output_bytes: 100000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    pub max_attempts: u32,
    pub smoke_timeout_ms: u64,
    pub context_lines: usize,
    pub traceback_tail_lines: usize,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            smoke_timeout_ms: 30000,
            context_lines: 2,
            traceback_tail_lines: 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_steps: u32,
    pub tool_timeout_ms: u64,
    pub transcript_window: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 20,
            tool_timeout_ms: 30000,
            transcript_window: 40,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("simforge")
                .join("simforge.db"),
        }
    }
}

impl Default for SimforgeConfig {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            llm: LlmConfig::default(),
            sandbox: SandboxConfig::default(),
            codegen: CodegenConfig::default(),
            agent: AgentConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl SimforgeConfig {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path)
                .context(format!("Failed to load config from {}", path.display()));
        }

        let project_name = env!("CARGO_PKG_NAME");

        // Try primary location: ./<project>.yml
        let primary_config = PathBuf::from(format!("{}.yml", project_name));
        if primary_config.exists() {
            match Self::load_from_file(&primary_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                }
            }
        }

        // Try fallback location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let fallback_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if fallback_config.exists() {
                match Self::load_from_file(&fallback_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimforgeConfig::default();
        assert_eq!(config.codegen.max_attempts, 4);
        assert_eq!(config.codegen.smoke_timeout_ms, 30000);
        assert_eq!(config.agent.max_steps, 20);
        assert_eq!(config.sandbox.interpreter, "python3");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
agent:
  max_steps: 5
"#;
        let config: SimforgeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.agent.max_steps, 5);
        // Untouched sections fall back to defaults
        assert_eq!(config.codegen.max_attempts, 4);
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simforge.yml");
        fs::write(&path, "codegen:\n  max_attempts: 2\n").unwrap();
        let config = SimforgeConfig::load(Some(&path)).unwrap();
        assert_eq!(config.codegen.max_attempts, 2);
    }
}
