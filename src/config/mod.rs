//! Layered configuration: compiled defaults, then `schedserver.toml`,
//! then `SCHEDSERVER_*` environment variables, later layers winning.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// WhatsApp Cloud API credentials. Notifications are silently dropped
/// unless `enabled` is set and the credentials are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub enabled: bool,
    pub api_url: String,
    pub phone_number_id: String,
    pub access_token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("schedserver.toml"))
            .merge(Env::prefixed("SCHEDSERVER_").split("__"))
            .extract()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert!(!config.gateway.enabled);
    }

    #[test]
    fn test_toml_layer_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "schedserver.toml",
                r#"
                [server]
                host = "127.0.0.1"
                port = 9090
            "#,
            )?;
            let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
                .merge(Toml::file("schedserver.toml"))
                .extract()?;
            assert_eq!(config.bind_addr(), "127.0.0.1:9090");
            Ok(())
        });
    }
}
