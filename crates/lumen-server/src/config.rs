use std::net::SocketAddr;

use anyhow::{Context, bail};
use tracing::warn;

const DEV_SECRET: &str = "dev-secret-change-me";
const PLACEHOLDER_SECRETS: &[&str] = &["", DEV_SECRET, "change-me", "changeme", "secret"];

/// Process settings read from `LUMEN_*` variables. Storage paths are read
/// separately by `lumen_db::StorageConfig::from_env`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub jwt_secret: String,
    pub production: bool,
    pub admin: Option<(String, String)>,
    pub default_currency: String,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let production = get("LUMEN_ENV").is_some_and(|env| env.eq_ignore_ascii_case("production"));

        let jwt_secret = get("LUMEN_JWT_SECRET").unwrap_or_default();
        let jwt_secret = if PLACEHOLDER_SECRETS.contains(&jwt_secret.trim()) {
            if production {
                bail!("LUMEN_JWT_SECRET must be set to a real secret in production");
            }
            warn!("LUMEN_JWT_SECRET not set; using the development secret");
            DEV_SECRET.to_string()
        } else {
            jwt_secret
        };

        let host = get("LUMEN_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("LUMEN_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("LUMEN_PORT is not a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let admin = match (get("LUMEN_ADMIN_USERNAME"), get("LUMEN_ADMIN_PASSWORD")) {
            (Some(user), Some(pass)) if !user.trim().is_empty() && !pass.is_empty() => {
                Some((user.trim().to_string(), pass))
            }
            (Some(_), _) | (_, Some(_)) => {
                warn!("Both LUMEN_ADMIN_USERNAME and LUMEN_ADMIN_PASSWORD are needed to provision an admin");
                None
            }
            _ => None,
        };

        let default_currency = get("LUMEN_DEFAULT_CURRENCY")
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| lumen_db::repo::DEFAULT_CURRENCY.to_string());

        Ok(Self {
            addr,
            jwt_secret,
            production,
            admin,
            default_currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.addr.to_string(), "0.0.0.0:3000");
        assert_eq!(cfg.jwt_secret, DEV_SECRET);
        assert!(!cfg.production);
        assert!(cfg.admin.is_none());
        assert_eq!(cfg.default_currency, "EUR");
    }

    #[test]
    fn production_rejects_placeholder_secret() {
        assert!(config(&[("LUMEN_ENV", "production")]).is_err());
        assert!(config(&[("LUMEN_ENV", "production"), ("LUMEN_JWT_SECRET", "change-me")]).is_err());

        let cfg = config(&[("LUMEN_ENV", "Production"), ("LUMEN_JWT_SECRET", "a-long-random-value")]).unwrap();
        assert!(cfg.production);
        assert_eq!(cfg.jwt_secret, "a-long-random-value");
    }

    #[test]
    fn admin_needs_both_credentials() {
        assert!(config(&[("LUMEN_ADMIN_USERNAME", "admin")]).unwrap().admin.is_none());

        let cfg = config(&[("LUMEN_ADMIN_USERNAME", " admin "), ("LUMEN_ADMIN_PASSWORD", "pw")]).unwrap();
        assert_eq!(cfg.admin, Some(("admin".to_string(), "pw".to_string())));
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(config(&[("LUMEN_PORT", "http")]).is_err());
        assert_eq!(config(&[("LUMEN_PORT", "8080")]).unwrap().addr.port(), 8080);
    }
}
