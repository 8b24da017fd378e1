//! Server configuration from environment variables.
//!
//! | Variable               | Default          |
//! |------------------------|------------------|
//! | `MAFIA_BIND_ADDR`      | `127.0.0.1:9000` |
//! | `MAFIA_MAFIA_QUOTA`    | `1`              |
//! | `MAFIA_SHERIFF_QUOTA`  | `1`              |
//! | `MAFIA_CIVILIAN_QUOTA` | `2`              |
//!
//! A value that doesn't parse is logged and replaced by its default.
//! Whether the quotas make a playable game is checked when the server is
//! built, not here.

use std::env;
use std::str::FromStr;

use mafia::prelude::*;
use tracing::warn;

const BIND_ADDR_ENV: &str = "MAFIA_BIND_ADDR";
const MAFIA_QUOTA_ENV: &str = "MAFIA_MAFIA_QUOTA";
const SHERIFF_QUOTA_ENV: &str = "MAFIA_SHERIFF_QUOTA";
const CIVILIAN_QUOTA_ENV: &str = "MAFIA_CIVILIAN_QUOTA";

/// Reads the configuration from the process environment.
pub fn from_env() -> ServerConfig {
    from_lookup(|key| env::var(key).ok())
}

fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ServerConfig {
    let defaults = ServerConfig::default();
    let bind_addr = lookup(BIND_ADDR_ENV)
        .map(|addr| addr.trim().to_string())
        .filter(|addr| !addr.is_empty())
        .unwrap_or(defaults.bind_addr);

    ServerConfig {
        bind_addr,
        quotas: RoleQuotas {
            mafia: parse_or(&lookup, MAFIA_QUOTA_ENV, defaults.quotas.mafia),
            sheriff: parse_or(&lookup, SHERIFF_QUOTA_ENV, defaults.quotas.sheriff),
            civilian: parse_or(&lookup, CIVILIAN_QUOTA_ENV, defaults.quotas.civilian),
        },
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(err) => {
            warn!(
                key,
                value = %raw,
                error = %err,
                %default,
                "invalid value; falling back to default"
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_empty_env_uses_defaults() {
        assert_eq!(from_lookup(lookup(&[])), ServerConfig::default());
    }

    #[test]
    fn test_from_lookup_reads_every_variable() {
        let config = from_lookup(lookup(&[
            (BIND_ADDR_ENV, "0.0.0.0:7000"),
            (MAFIA_QUOTA_ENV, "2"),
            (SHERIFF_QUOTA_ENV, "1"),
            (CIVILIAN_QUOTA_ENV, " 5 "),
        ]));
        assert_eq!(config.bind_addr, "0.0.0.0:7000");
        assert_eq!(
            config.quotas,
            RoleQuotas {
                mafia: 2,
                sheriff: 1,
                civilian: 5,
            }
        );
    }

    #[test]
    fn test_from_lookup_bad_number_falls_back() {
        let config = from_lookup(lookup(&[
            (MAFIA_QUOTA_ENV, "many"),
            (CIVILIAN_QUOTA_ENV, "-1"),
        ]));
        assert_eq!(config.quotas, RoleQuotas::default());
    }

    #[test]
    fn test_from_lookup_blank_addr_falls_back() {
        let config = from_lookup(lookup(&[(BIND_ADDR_ENV, "  ")]));
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
    }
}
