// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Settings come from a JSON configuration file, then command-line flags
//! override individual values. The file layout is:
//!
//! ```json
//! {
//!   "coap": { "port": 5555 },
//!   "http": {
//!     "port": 8888,
//!     "security": {
//!       "private_key": "private.key",
//!       "certificate": "certificate.pem",
//!       "jwt": {
//!         "algorithm": "HS512",
//!         "method": "header",
//!         "decode_key": "some-very-secret-key",
//!         "expiration_time": 3600,
//!         "users": [
//!           { "name": "admin", "secret": "not-same-as-name", "scope": [".*"] }
//!         ]
//!       }
//!     }
//!   },
//!   "logging": { "level": 3 }
//! }
//! ```
//!
//! Unrecognized sections and keys are reported as warnings and ignored.
//! Keys inside `http.security` and `http.security.jwt` match
//! case-insensitively.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log filter, overrides `logging.level` | unset |

use std::path::Path;

use serde_json::{Map, Value};
use zeroize::Zeroize;

use crate::auth::{TokenError, TokenTransport, UserStoreError};

/// Environment variable name for the server bind address.
pub const HOST_ENV: &str = "HOST";

/// Environment variable name selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_COAP_PORT: u16 = 5555;
pub const DEFAULT_HTTP_PORT: u16 = 8888;
pub const DEFAULT_ALGORITHM: &str = "HS512";
pub const DEFAULT_LOGGING_LEVEL: u8 = 2;

/// Highest meaningful logging level (trace).
pub const MAX_LOGGING_LEVEL: u8 = 5;

/// Errors raised while loading settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}:{line}:{column} error: {message}")]
    Parse {
        path: String,
        line: usize,
        column: usize,
        message: String,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("invalid user configuration: {0}")]
    User(#[from] UserStoreError),
    #[error("invalid token configuration: {0}")]
    Token(#[from] TokenError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoapSettings {
    pub port: u16,
}

impl Default for CoapSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_COAP_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpSettings {
    pub port: u16,
    pub security: SecuritySettings,
}

/// `http.security`: TLS file paths and token settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SecuritySettings {
    pub private_key: Option<String>,
    pub certificate: Option<String>,
    pub jwt: JwtSettings,
}

/// `http.security.jwt`.
#[derive(Clone, PartialEq, Eq)]
pub struct JwtSettings {
    pub algorithm: String,
    pub method: TokenTransport,
    /// HMAC secret, or private key PEM for asymmetric algorithms
    pub decode_key: Option<String>,
    /// Public key PEM for asymmetric algorithms
    pub public_key: Option<String>,
    pub expiration_time: i64,
    pub users: Vec<UserSettings>,
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            algorithm: DEFAULT_ALGORITHM.to_string(),
            method: TokenTransport::Header,
            decode_key: None,
            public_key: None,
            expiration_time: crate::auth::context::DEFAULT_EXPIRATION_TIME,
            users: Vec::new(),
        }
    }
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("algorithm", &self.algorithm)
            .field("method", &self.method)
            .field("decode_key", &self.decode_key.as_ref().map(|_| "<redacted>"))
            .field("public_key", &self.public_key.is_some())
            .field("expiration_time", &self.expiration_time)
            .field("users", &self.users)
            .finish()
    }
}

/// One entry of `http.security.jwt.users`.
#[derive(Clone, PartialEq, Eq)]
pub struct UserSettings {
    pub name: String,
    pub secret: String,
    pub scope: Vec<String>,
}

impl std::fmt::Debug for UserSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSettings")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// 0 fatal, 1 error, 2 warn, 3 info, 4 debug, 5 trace
    pub level: u8,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOGGING_LEVEL,
        }
    }
}

impl LoggingSettings {
    /// `tracing` filter directive for the configured level.
    pub fn filter_directive(&self) -> &'static str {
        match self.level {
            0 | 1 => "error",
            2 => "warn",
            3 => "info",
            4 => "debug",
            _ => "trace",
        }
    }
}

/// Complete server settings.
///
/// Secrets held here (signing key, user secrets, TLS paths) are wiped when
/// the settings are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub coap: CoapSettings,
    pub http: HttpSettings,
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            coap: CoapSettings::default(),
            http: HttpSettings {
                port: DEFAULT_HTTP_PORT,
                security: SecuritySettings::default(),
            },
            logging: LoggingSettings::default(),
        }
    }
}

impl Drop for Settings {
    fn drop(&mut self) {
        let security = &mut self.http.security;
        security.private_key.zeroize();
        security.certificate.zeroize();
        security.jwt.decode_key.zeroize();
        for user in security.jwt.users.iter_mut() {
            user.name.zeroize();
            user.secret.zeroize();
        }
    }
}

/// Settings together with the diagnostics produced while reading them.
#[derive(Debug)]
pub struct ConfigReport {
    pub settings: Settings,
    /// Unrecognized keys and ignored values, for the operator
    pub warnings: Vec<String>,
}

impl Settings {
    /// Read a JSON configuration file on top of the defaults.
    pub fn load_file(path: impl AsRef<Path>) -> Result<ConfigReport, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: display,
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        })?;

        Self::from_json(&value)
    }

    /// Build settings from an already-parsed configuration document.
    pub fn from_json(value: &Value) -> Result<ConfigReport, ConfigError> {
        let mut settings = Settings::default();
        let mut reader = Reader::default();

        let root = value
            .as_object()
            .ok_or_else(|| ConfigError::Invalid("configuration root must be an object".into()))?;

        for (section, value) in root {
            match section.as_str() {
                "coap" => reader.coap(value, &mut settings.coap),
                "http" => reader.http(value, &mut settings.http)?,
                "logging" => reader.logging(value, &mut settings.logging),
                _ => reader.warn(format!("Unrecognised configuration file section: {section}")),
            }
        }

        Ok(ConfigReport {
            settings,
            warnings: reader.warnings,
        })
    }

    /// Apply command-line overrides.
    pub fn apply_overrides(
        &mut self,
        level: Option<u8>,
        private_key: Option<String>,
        certificate: Option<String>,
    ) {
        if let Some(level) = level {
            self.logging.level = level;
        }
        if private_key.is_some() {
            self.http.security.private_key = private_key;
        }
        if certificate.is_some() {
            self.http.security.certificate = certificate;
        }
    }
}

#[derive(Default)]
struct Reader {
    warnings: Vec<String>,
}

impl Reader {
    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    fn object<'a>(&mut self, value: &'a Value, section: &str) -> Option<&'a Map<String, Value>> {
        let object = value.as_object();
        if object.is_none() {
            self.warn(format!("Configuration section {section} must be an object"));
        }
        object
    }

    fn port(&mut self, value: &Value, key: &str) -> Option<u16> {
        let port = value.as_u64().and_then(|port| u16::try_from(port).ok());
        if port.is_none() {
            self.warn(format!("{key} must be an integer between 0 and 65535"));
        }
        port
    }

    fn string(&mut self, value: &Value, key: &str) -> Option<String> {
        let string = value.as_str().map(str::to_string);
        if string.is_none() {
            self.warn(format!("{key} must be a string"));
        }
        string
    }

    fn coap(&mut self, value: &Value, settings: &mut CoapSettings) {
        let Some(section) = self.object(value, "coap") else {
            return;
        };
        for (key, value) in section {
            match key.as_str() {
                "port" => {
                    if let Some(port) = self.port(value, "coap.port") {
                        settings.port = port;
                    }
                }
                _ => self.warn(format!("Unrecognised configuration file key: coap.{key}")),
            }
        }
    }

    fn http(&mut self, value: &Value, settings: &mut HttpSettings) -> Result<(), ConfigError> {
        let Some(section) = self.object(value, "http") else {
            return Ok(());
        };
        for (key, value) in section {
            match key.as_str() {
                "port" => {
                    if let Some(port) = self.port(value, "http.port") {
                        settings.port = port;
                    }
                }
                "security" => self.security(value, &mut settings.security)?,
                _ => self.warn(format!("Unrecognised configuration file key: http.{key}")),
            }
        }
        Ok(())
    }

    fn security(
        &mut self,
        value: &Value,
        settings: &mut SecuritySettings,
    ) -> Result<(), ConfigError> {
        let Some(section) = self.object(value, "http.security") else {
            return Ok(());
        };
        for (key, value) in section {
            match key.to_ascii_lowercase().as_str() {
                "private_key" => {
                    if let Some(path) = self.string(value, "http.security.private_key") {
                        settings.private_key = Some(path);
                    }
                }
                "certificate" => {
                    if let Some(path) = self.string(value, "http.security.certificate") {
                        settings.certificate = Some(path);
                    }
                }
                "jwt" => self.jwt(value, &mut settings.jwt)?,
                _ => self.warn(format!(
                    "Unrecognised configuration file key: http.security.{key}"
                )),
            }
        }
        Ok(())
    }

    fn jwt(&mut self, value: &Value, settings: &mut JwtSettings) -> Result<(), ConfigError> {
        let Some(section) = self.object(value, "http.security.jwt") else {
            return Ok(());
        };
        for (key, value) in section {
            match key.to_ascii_lowercase().as_str() {
                "algorithm" => {
                    if let Some(algorithm) = self.string(value, "Token algorithm") {
                        settings.algorithm = algorithm;
                    }
                }
                "expiration_time" => match value.as_i64() {
                    Some(seconds) => settings.expiration_time = seconds,
                    None => self.warn(format!("Token {key} must be an integer")),
                },
                "method" => match value.as_str().and_then(TokenTransport::from_str) {
                    Some(method) => settings.method = method,
                    None => self.warn(format!(
                        "Unrecognised http.security.jwt.{key} value: {value}"
                    )),
                },
                "decode_key" => match value.as_str() {
                    Some(secret) => settings.decode_key = Some(secret.to_string()),
                    None => self.warn(format!("Token {key} must be a string")),
                },
                "public_key" => match value.as_str() {
                    Some(pem) => settings.public_key = Some(pem.to_string()),
                    None => self.warn(format!("Token {key} must be a string")),
                },
                "users" => {
                    let Some(users) = value.as_array() else {
                        self.warn("http.security.jwt.users must be an array".into());
                        continue;
                    };
                    for user in users {
                        let user = self.user(user, &settings.users)?;
                        settings.users.push(user);
                    }
                }
                _ => self.warn(format!(
                    "Unrecognised configuration file key: http.security.jwt.{key}"
                )),
            }
        }
        Ok(())
    }

    fn user(
        &mut self,
        value: &Value,
        existing: &[UserSettings],
    ) -> Result<UserSettings, ConfigError> {
        let name = match value.get("name").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => name,
            _ => return Err(UserStoreError::EmptyName.into()),
        };

        if existing.iter().any(|user| user.name == name) {
            return Err(UserStoreError::DuplicateName(name.to_string()).into());
        }

        let secret = match value.get("secret").and_then(Value::as_str) {
            Some(secret) if !secret.is_empty() => secret,
            _ => return Err(UserStoreError::EmptySecret(name.to_string()).into()),
        };

        let scope = match value.get("scope").and_then(Value::as_array) {
            Some(patterns) => {
                let mut scope = Vec::with_capacity(patterns.len());
                for pattern in patterns {
                    match pattern.as_str() {
                        Some(pattern) => scope.push(pattern.to_string()),
                        None => self.warn(format!(
                            "User \"{name}\" has a non-string scope entry {pattern}, ignoring it"
                        )),
                    }
                }
                scope
            }
            None => {
                self.warn(format!(
                    "User \"{name}\" configured without valid scope. Setting default scope."
                ));
                Vec::new()
            }
        };

        Ok(UserSettings {
            name: name.to_string(),
            secret: secret.to_string(),
            scope,
        })
    }

    fn logging(&mut self, value: &Value, settings: &mut LoggingSettings) {
        let Some(section) = self.object(value, "logging") else {
            return;
        };
        for (key, value) in section {
            match key.as_str() {
                "level" => match value.as_u64().and_then(|level| u8::try_from(level).ok()) {
                    Some(level) => settings.level = level,
                    None => self.warn("logging.level must be an integer between 0 and 5".into()),
                },
                _ => self.warn(format!("Unrecognised configuration file key: logging.{key}")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn full_config() -> Value {
        json!({
            "coap": { "port": 5683 },
            "http": {
                "port": 8889,
                "security": {
                    "private_key": "private.key",
                    "Certificate": "certificate.pem",
                    "jwt": {
                        "Algorithm": "HS256",
                        "method": "BODY",
                        "decode_key": "some-very-secret-key",
                        "expiration_time": 600,
                        "users": [
                            { "name": "admin", "secret": "not-same-as-name", "scope": [".*"] },
                            {
                                "name": "put-all",
                                "secret": "restricted-user",
                                "scope": ["^PUT .*$"]
                            }
                        ]
                    }
                }
            },
            "logging": { "level": 5 }
        })
    }

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.coap.port, 5555);
        assert_eq!(settings.http.port, 8888);
        assert_eq!(settings.http.security.jwt.algorithm, "HS512");
        assert_eq!(settings.http.security.jwt.method, TokenTransport::Header);
        assert_eq!(settings.http.security.jwt.expiration_time, 3600);
        assert_eq!(settings.logging.level, 2);
    }

    #[test]
    fn from_json_reads_every_section() {
        let report = Settings::from_json(&full_config()).unwrap();
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);

        let s = &report.settings;
        assert_eq!(s.coap.port, 5683);
        assert_eq!(s.http.port, 8889);
        assert_eq!(s.http.security.private_key.as_deref(), Some("private.key"));
        assert_eq!(s.http.security.certificate.as_deref(), Some("certificate.pem"));

        let jwt = &s.http.security.jwt;
        assert_eq!(jwt.algorithm, "HS256");
        assert_eq!(jwt.method, TokenTransport::Body);
        assert_eq!(jwt.decode_key.as_deref(), Some("some-very-secret-key"));
        assert_eq!(jwt.expiration_time, 600);
        assert_eq!(jwt.users.len(), 2);
        assert_eq!(jwt.users[1].scope, vec!["^PUT .*$".to_string()]);
        assert_eq!(s.logging.level, 5);
    }

    #[test]
    fn unknown_keys_are_reported_and_ignored() {
        let report = Settings::from_json(&json!({
            "coap": { "port": 5555, "address": "::" },
            "database": {},
            "http": { "security": { "jwt": { "refresh": true } } }
        }))
        .unwrap();

        assert_eq!(report.warnings.len(), 3);
        assert!(report.warnings.iter().any(|w| w.contains("coap.address")));
        assert!(report.warnings.iter().any(|w| w.contains("database")));
        assert!(report.warnings.iter().any(|w| w.contains("http.security.jwt.refresh")));
    }

    #[test]
    fn wrong_types_are_reported_and_ignored() {
        let report = Settings::from_json(&json!({
            "http": { "port": "eighty", "security": { "jwt": {
                "expiration_time": "soon",
                "method": "cookie",
                "decode_key": 42
            } } }
        }))
        .unwrap();

        assert_eq!(report.warnings.len(), 4);
        let jwt = &report.settings.http.security.jwt;
        assert_eq!(report.settings.http.port, DEFAULT_HTTP_PORT);
        assert_eq!(jwt.expiration_time, 3600);
        assert_eq!(jwt.method, TokenTransport::Header);
        assert!(jwt.decode_key.is_none());
    }

    #[test]
    fn duplicate_user_aborts_loading() {
        let err = Settings::from_json(&json!({
            "http": { "security": { "jwt": { "users": [
                { "name": "admin", "secret": "a", "scope": [] },
                { "name": "admin", "secret": "b", "scope": [] }
            ] } } }
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::User(UserStoreError::DuplicateName(ref n)) if n == "admin"
        ));
    }

    #[test]
    fn user_without_name_or_secret_aborts_loading() {
        for user in [
            json!({ "secret": "a" }),
            json!({ "name": "", "secret": "a" }),
            json!({ "name": "admin" }),
            json!({ "name": "admin", "secret": "" }),
        ] {
            let config = json!({ "http": { "security": { "jwt": { "users": [user] } } } });
            assert!(matches!(
                Settings::from_json(&config),
                Err(ConfigError::User(_))
            ));
        }
    }

    #[test]
    fn user_without_scope_gets_empty_scope() {
        let report = Settings::from_json(&json!({
            "http": { "security": { "jwt": { "users": [ { "name": "a", "secret": "b" } ] } } }
        }))
        .unwrap();
        assert!(report.settings.http.security.jwt.users[0].scope.is_empty());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn load_file_reports_parse_position() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\n  \"coap\": \n}}").unwrap();

        let err = Settings::load_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 3, .. }), "{err}");
    }

    #[test]
    fn load_file_reads_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", full_config()).unwrap();

        let report = Settings::load_file(file.path()).unwrap();
        assert_eq!(report.settings.http.port, 8889);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            Settings::load_file("/nonexistent/restserver.json"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut settings = Settings::from_json(&full_config()).unwrap().settings;
        settings.apply_overrides(Some(1), Some("other.key".into()), None);
        assert_eq!(settings.logging.level, 1);
        assert_eq!(settings.http.security.private_key.as_deref(), Some("other.key"));
        assert_eq!(settings.http.security.certificate.as_deref(), Some("certificate.pem"));
    }

    #[test]
    fn logging_level_maps_to_filter() {
        let level = |level| LoggingSettings { level }.filter_directive();
        assert_eq!(level(0), "error");
        assert_eq!(level(2), "warn");
        assert_eq!(level(3), "info");
        assert_eq!(level(5), "trace");
        assert_eq!(level(9), "trace");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let settings = Settings::from_json(&full_config()).unwrap().settings;
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("some-very-secret-key"));
        assert!(!rendered.contains("not-same-as-name"));
        assert!(rendered.contains("put-all"));
    }
}
