use crate::error::{AcademyError, Result};
use crate::infrastructure::paystack::PAYSTACK_API_BASE;
use clap::ValueEnum;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderChoice {
    Paystack,
    Sandbox,
}

/// Runtime settings, read from the environment (after `.env` is loaded).
#[derive(Clone)]
pub struct Settings {
    pub host: IpAddr,
    pub port: u16,
    pub app_url: String,
    pub provider: ProviderChoice,
    pub paystack_secret_key: String,
    pub paystack_base_url: String,
    pub jwt_access_secret: String,
    pub jwt_refresh_secret: String,
    pub db_path: Option<PathBuf>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("app_url", &self.app_url)
            .field("provider", &self.provider)
            .field("paystack_base_url", &self.paystack_base_url)
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            app_url: "https://academy.uricreative.com".to_string(),
            provider: ProviderChoice::Paystack,
            paystack_secret_key: "psk".to_string(),
            paystack_base_url: PAYSTACK_API_BASE.to_string(),
            jwt_access_secret: "accessdevsecret".to_string(),
            jwt_refresh_secret: "refreshdevsecret".to_string(),
            db_path: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Builds settings from an explicit variable map; unset keys keep their defaults.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let mut s = Settings::default();
        let get = |key: &str| vars.get(key).filter(|v| !v.trim().is_empty()).cloned();

        if let Some(v) = get("HOST") {
            s.host = v.parse().map_err(|_| invalid("HOST", &v))?;
        }
        if let Some(v) = get("PORT") {
            s.port = v.parse().map_err(|_| invalid("PORT", &v))?;
        }
        if let Some(v) = get("APP_URL") {
            s.app_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("PAYMENT_PROVIDER") {
            s.provider = <ProviderChoice as ValueEnum>::from_str(&v, true)
                .map_err(|_| invalid("PAYMENT_PROVIDER", &v))?;
        }
        if let Some(v) = get("PAYSTACK_SECRET_KEY") {
            s.paystack_secret_key = v;
        }
        if let Some(v) = get("PAYSTACK_BASE_URL") {
            s.paystack_base_url = v;
        }
        if let Some(v) = get("JWT_ACCESS_SECRET") {
            s.jwt_access_secret = v;
        }
        if let Some(v) = get("JWT_REFRESH_SECRET") {
            s.jwt_refresh_secret = v;
        }
        if let Some(v) = get("DB_PATH") {
            s.db_path = Some(PathBuf::from(v));
        }
        Ok(s)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Where the provider sends the payer after checkout.
    pub fn default_callback_url(&self) -> String {
        format!("{}/dashboard", self.app_url)
    }
}

fn invalid(key: &str, value: &str) -> AcademyError {
    AcademyError::ValidationError(format!("Invalid value for {key}: {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_vars(HashMap::new()).unwrap();
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.provider, ProviderChoice::Paystack);
        assert_eq!(settings.paystack_base_url, "https://api.paystack.co");
        assert_eq!(
            settings.default_callback_url(),
            "https://academy.uricreative.com/dashboard"
        );
        assert!(settings.db_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_vars(vars(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("APP_URL", "http://localhost:5173/"),
            ("PAYMENT_PROVIDER", "SANDBOX"),
            ("DB_PATH", "/tmp/academy"),
        ]))
        .unwrap();
        assert_eq!(settings.bind_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(settings.provider, ProviderChoice::Sandbox);
        assert_eq!(
            settings.default_callback_url(),
            "http://localhost:5173/dashboard"
        );
        assert_eq!(settings.db_path, Some(PathBuf::from("/tmp/academy")));
    }

    #[test]
    fn test_invalid_values_fail() {
        assert!(Settings::from_vars(vars(&[("PORT", "eighty")])).is_err());
        assert!(Settings::from_vars(vars(&[("PAYMENT_PROVIDER", "stripe")])).is_err());
        assert!(Settings::from_vars(vars(&[("HOST", "nowhere")])).is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let settings = Settings::from_vars(vars(&[("PAYSTACK_SECRET_KEY", "sk_live_123")])).unwrap();
        assert!(!format!("{settings:?}").contains("sk_live_123"));
    }
}
