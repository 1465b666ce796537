use anyhow::{anyhow, Context};
use std::str::FromStr;

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct Config {
    pub host: String,
    pub port: String,

    pub postgres_host: String,
    pub postgres_port: u16,
    pub postgres_password: String,
    pub postgres_user: String,
    pub postgres_db: String,
    pub enable_auto_migrate: bool,

    pub redis_url: String,
    /// Base url of the frontend, used for the links embedded in emails.
    pub client_origin: String,

    pub access_token_private_key: String,
    pub access_token_public_key: String,
    pub access_token_max_age: i64,

    pub refresh_token_private_key: String,
    pub refresh_token_public_key: String,
    pub refresh_token_max_age: i64,

    // secrets lifetime, in minutes
    pub otp_ttl_minutes: i64,
    pub reset_token_ttl_minutes: i64,
    pub verification_token_ttl_minutes: i64,

    // email stuff
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_pass: String,
    pub smtp_from: String,
    pub email_from_name: String,
    pub support_email: String,
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn required(&self, var_name: &str) -> anyhow::Result<String> {
        (self.lookup)(var_name).ok_or_else(|| anyhow!("{} must be set", var_name))
    }

    fn or(&self, var_name: &str, default: &str) -> String {
        (self.lookup)(var_name).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, var_name: &str, default: Option<&str>) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let raw = match default {
            Some(default) => self.or(var_name, default),
            None => self.required(var_name)?,
        };
        raw.parse::<T>()
            .with_context(|| format!("{} has an invalid value: {:?}", var_name, raw))
    }
}

impl Config {
    pub fn init() -> anyhow::Result<Config> {
        Config::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };

        let smtp_user = env.required("SMTP_USER")?;
        let smtp_from = env.or("SMTP_FROM", &smtp_user);

        Ok(Config {
            host: env.or("HOST", "0.0.0.0"),
            port: env.or("PORT", "8000"),

            postgres_host: env.required("POSTGRES_HOST")?,
            postgres_port: env.parsed("POSTGRES_PORT", None)?,
            postgres_password: env.required("POSTGRES_PASSWORD")?,
            postgres_user: env.required("POSTGRES_USER")?,
            postgres_db: env.required("POSTGRES_DB")?,
            enable_auto_migrate: env.parsed("ENABLE_AUTO_MIGRATE", Some("true"))?,

            redis_url: env.required("REDIS_URL")?,
            client_origin: env.required("CLIENT_ORIGIN")?,

            access_token_private_key: env.required("ACCESS_TOKEN_PRIVATE_KEY")?,
            access_token_public_key: env.required("ACCESS_TOKEN_PUBLIC_KEY")?,
            access_token_max_age: env.parsed("ACCESS_TOKEN_MAXAGE", None)?,

            refresh_token_private_key: env.required("REFRESH_TOKEN_PRIVATE_KEY")?,
            refresh_token_public_key: env.required("REFRESH_TOKEN_PUBLIC_KEY")?,
            refresh_token_max_age: env.parsed("REFRESH_TOKEN_MAXAGE", None)?,

            otp_ttl_minutes: env.parsed("OTP_TTL_MINUTES", Some("15"))?,
            reset_token_ttl_minutes: env.parsed("RESET_TOKEN_TTL_MINUTES", Some("15"))?,
            verification_token_ttl_minutes: env
                .parsed("VERIFICATION_TOKEN_TTL_MINUTES", Some("15"))?,

            smtp_host: env.required("SMTP_HOST")?,
            smtp_port: env.parsed("SMTP_PORT", None)?,
            smtp_pass: env.required("SMTP_PASS")?,
            smtp_user,
            smtp_from,
            email_from_name: env.or("EMAIL_FROM_NAME", "AnimateHub"),
            support_email: env.required("SUPPORT_EMAIL")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("POSTGRES_HOST", "localhost"),
            ("POSTGRES_PORT", "5432"),
            ("POSTGRES_PASSWORD", "secret"),
            ("POSTGRES_USER", "postgres"),
            ("POSTGRES_DB", "auth"),
            ("REDIS_URL", "redis://127.0.0.1:6379"),
            ("CLIENT_ORIGIN", "http://localhost:3000"),
            ("ACCESS_TOKEN_PRIVATE_KEY", "a"),
            ("ACCESS_TOKEN_PUBLIC_KEY", "b"),
            ("ACCESS_TOKEN_MAXAGE", "15"),
            ("REFRESH_TOKEN_PRIVATE_KEY", "c"),
            ("REFRESH_TOKEN_PUBLIC_KEY", "d"),
            ("REFRESH_TOKEN_MAXAGE", "60"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "587"),
            ("SMTP_USER", "mailer@example.com"),
            ("SMTP_PASS", "pass"),
            ("SUPPORT_EMAIL", "support@example.com"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> anyhow::Result<Config> {
        Config::from_lookup(|name| env.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn applies_defaults_for_optional_values() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, "8000");
        assert!(config.enable_auto_migrate);
        assert_eq!(config.otp_ttl_minutes, 15);
        assert_eq!(config.reset_token_ttl_minutes, 15);
        assert_eq!(config.smtp_from, "mailer@example.com");
        assert_eq!(config.email_from_name, "AnimateHub");
    }

    #[test]
    fn reports_the_missing_variable() {
        let mut env = base_env();
        env.remove("SUPPORT_EMAIL");
        let err = load(&env).unwrap_err();
        assert_eq!(err.to_string(), "SUPPORT_EMAIL must be set");
    }

    #[test]
    fn rejects_unparsable_numbers() {
        let mut env = base_env();
        env.insert("SMTP_PORT", "not-a-port");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().starts_with("SMTP_PORT has an invalid value"));
    }

    #[test]
    fn overrides_ttls_from_env() {
        let mut env = base_env();
        env.insert("OTP_TTL_MINUTES", "5");
        let config = load(&env).unwrap();
        assert_eq!(config.otp_ttl_minutes, 5);
    }
}
