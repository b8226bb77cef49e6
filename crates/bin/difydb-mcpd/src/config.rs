use clap::{Parser, builder::BoolishValueParser};
use difydb_core::control::SummaryLocale;
use difydb_core::store::PgSettings;
use difydb_core::store::postgres::{
    DEFAULT_ACQUIRE_TIMEOUT,
    DEFAULT_MAX_CONNECTIONS,
    DEFAULT_MIN_CONNECTIONS,
};
use std::error::Error;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_DB_USER: &str = "postgres";
const DEFAULT_DB_DATABASE: &str = "dify";
const DEFAULT_MCP_HTTP_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SUMMARY_LANG: &str = "zh";

#[derive(Parser, Debug)]
#[command(name = "difydb-mcpd", version, about = "Dify database search MCP daemon.")]
struct CliArgs {
    #[arg(long, env = "DB_HOST", default_value = DEFAULT_DB_HOST)]
    db_host: String,

    #[arg(long, env = "DB_PORT", default_value_t = DEFAULT_DB_PORT)]
    db_port: u16,

    #[arg(long, env = "DB_USER", default_value = DEFAULT_DB_USER)]
    db_user: String,

    #[arg(long, env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    db_password: String,

    #[arg(long, env = "DB_DATABASE", default_value = DEFAULT_DB_DATABASE)]
    db_database: String,

    #[arg(long, env = "DB_POOL_MIN", default_value_t = DEFAULT_MIN_CONNECTIONS)]
    pool_min: u32,

    #[arg(long, env = "DB_POOL_MAX", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pool_max: u32,

    #[arg(
        long,
        env = "DB_ACQUIRE_TIMEOUT_SECS",
        default_value_t = DEFAULT_ACQUIRE_TIMEOUT.as_secs()
    )]
    acquire_timeout_secs: u64,

    #[arg(
        long,
        env = "MCP_QUERY_TIMEOUT_SECS",
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS
    )]
    query_timeout_secs: u64,

    #[arg(long, env = "MCP_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "MCP_HTTP_ADDR", default_value = DEFAULT_MCP_HTTP_ADDR)]
    http_addr: SocketAddr,

    #[arg(
        long = "stdio",
        env = "MCP_ENABLE_STDIO",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    enable_stdio: bool,

    #[arg(long, env = "MCP_SUMMARY_LANG", default_value = DEFAULT_SUMMARY_LANG)]
    summary_lang: String,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Clone, Debug)]
pub struct DifyDbConfig {
    pub database: PgSettings,
    pub query_timeout: Duration,
    pub api_key: Option<String>,
    pub http_addr: SocketAddr,
    pub enable_stdio: bool,
    pub summary_locale: SummaryLocale,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
        }
    }
}

impl Error for ConfigError {}

impl DifyDbConfig {
    /// Parses flags, falling back to environment variables.
    ///
    /// # Errors
    /// Returns `ConfigError` when a setting is out of range.
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }
}

fn non_zero_secs(name: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::InvalidSetting {
            name,
            value: secs.to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

impl TryFrom<CliArgs> for DifyDbConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.pool_max == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "DB_POOL_MAX",
                value: args.pool_max.to_string(),
            });
        }
        if args.pool_min > args.pool_max {
            return Err(ConfigError::InvalidSetting {
                name: "DB_POOL_MIN",
                value: format!("{} (exceeds DB_POOL_MAX {})", args.pool_min, args.pool_max),
            });
        }
        let acquire_timeout = non_zero_secs("DB_ACQUIRE_TIMEOUT_SECS", args.acquire_timeout_secs)?;
        let query_timeout = non_zero_secs("MCP_QUERY_TIMEOUT_SECS", args.query_timeout_secs)?;

        let summary_locale = args
            .summary_lang
            .parse::<SummaryLocale>()
            .map_err(|err| ConfigError::InvalidSetting {
                name: "MCP_SUMMARY_LANG",
                value: err.0,
            })?;

        let database = PgSettings::new(
            args.db_host,
            args.db_port,
            args.db_user,
            args.db_password,
            args.db_database,
        )
        .with_pool_size(args.pool_min, args.pool_max)
        .with_acquire_timeout(acquire_timeout);

        Ok(Self {
            database,
            query_timeout,
            api_key: args.api_key.filter(|value| !value.is_empty()),
            http_addr: args.http_addr,
            enable_stdio: args.enable_stdio,
            summary_locale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::builder::TypedValueParser;
    use clap::{ArgAction, CommandFactory};
    use std::ffi::OsStr;

    fn base_args() -> CliArgs {
        CliArgs {
            db_host: DEFAULT_DB_HOST.to_string(),
            db_port: DEFAULT_DB_PORT,
            db_user: DEFAULT_DB_USER.to_string(),
            db_password: String::new(),
            db_database: DEFAULT_DB_DATABASE.to_string(),
            pool_min: DEFAULT_MIN_CONNECTIONS,
            pool_max: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT.as_secs(),
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
            api_key: None,
            http_addr: DEFAULT_MCP_HTTP_ADDR.parse().expect("valid MCP addr"),
            enable_stdio: false,
            summary_lang: DEFAULT_SUMMARY_LANG.to_string(),
        }
    }

    #[test]
    fn defaults_match_dify_docker_setup() {
        let config = DifyDbConfig::try_from(base_args()).expect("config should parse");

        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.user, "postgres");
        assert_eq!(config.database.password, "");
        assert_eq!(config.database.database, "dify");
        assert_eq!(config.database.min_connections, 1);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.query_timeout, Duration::from_secs(30));
        assert_eq!(config.summary_locale, SummaryLocale::Zh);
        assert_eq!(config.http_addr.to_string(), "0.0.0.0:8000");
        assert!(config.api_key.is_none());
        assert!(!config.enable_stdio);
    }

    #[test]
    fn explicit_settings_flow_into_config() {
        let mut args = base_args();
        args.db_host = "db.internal".to_string();
        args.db_port = 15432;
        args.pool_min = 2;
        args.pool_max = 8;
        args.query_timeout_secs = 12;
        args.api_key = Some("k".to_string());
        args.enable_stdio = true;
        args.summary_lang = "en".to_string();

        let config = DifyDbConfig::try_from(args).expect("config should parse");

        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 15432);
        assert_eq!(config.database.min_connections, 2);
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.query_timeout, Duration::from_secs(12));
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.summary_locale, SummaryLocale::En);
        assert!(config.enable_stdio);
    }

    #[test]
    fn stdio_is_a_bare_flag() {
        let mut command = CliArgs::command();
        command.build();
        let stdio = command
            .get_arguments()
            .find(|arg| arg.get_id() == "enable_stdio")
            .expect("stdio argument");

        assert_eq!(stdio.get_long(), Some("stdio"));
        assert_eq!(stdio.get_env(), Some(OsStr::new("MCP_ENABLE_STDIO")));
        assert!(matches!(stdio.get_action(), ArgAction::SetTrue));
    }

    #[test]
    fn stdio_env_accepts_boolish_values() {
        let command = CliArgs::command();
        let parser = BoolishValueParser::new();
        for (raw, expected) in [("1", true), ("true", true), ("yes", true), ("0", false), ("false", false)] {
            let parsed = parser
                .parse_ref(&command, None, OsStr::new(raw))
                .expect("boolish value");
            assert_eq!(parsed, expected, "{raw}");
        }
        assert!(parser.parse_ref(&command, None, OsStr::new("maybe")).is_err());
    }

    #[test]
    fn non_numeric_port_is_rejected() {
        let result = CliArgs::try_parse_from(["difydb-mcpd", "--db-port", "postgres"]);
        assert!(result.is_err());
    }

    #[test]
    fn pool_bounds_are_validated() {
        let mut args = base_args();
        args.pool_max = 0;
        assert!(matches!(
            DifyDbConfig::try_from(args),
            Err(ConfigError::InvalidSetting { name: "DB_POOL_MAX", .. })
        ));

        let mut args = base_args();
        args.pool_min = 6;
        assert!(matches!(
            DifyDbConfig::try_from(args),
            Err(ConfigError::InvalidSetting { name: "DB_POOL_MIN", .. })
        ));
    }

    #[test]
    fn blank_api_key_disables_auth() {
        let mut args = base_args();
        args.api_key = Some(String::new());
        let config = DifyDbConfig::try_from(args).expect("config should parse");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn unknown_summary_language_is_rejected() {
        let mut args = base_args();
        args.summary_lang = "fr".to_string();
        let err = DifyDbConfig::try_from(args).expect_err("fr is not supported");
        assert_eq!(err.to_string(), "invalid MCP_SUMMARY_LANG value: fr");
    }
}
