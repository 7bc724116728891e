use likeboard_common::snowflake::{ProcessId, WorkerId};
use serde::Deserialize;
use std::net::IpAddr;
use tracing::debug;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct Env {
    pub server_address: IpAddr,
    pub server_port: u16,
    pub database_url: String,
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,
    #[serde(default)]
    pub worker_id: WorkerId,
    #[serde(default)]
    pub process_id: ProcessId,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_app_url")]
    pub app_url: String,
    #[serde(default = "default_mail_from")]
    pub mail_from: String,
}

fn default_database_max_connections() -> u32 {
    10
}

fn default_app_name() -> String {
    "Likeboard".to_owned()
}

fn default_app_url() -> String {
    "http://localhost:8080".to_owned()
}

fn default_mail_from() -> String {
    "likeboard@localhost".to_owned()
}

/// Reads `.env` if there is one, then the process environment.
pub(crate) fn get_env() -> Result<Env, crate::InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .env file found");
        } else {
            return Err(e.into());
        }
    }

    Ok(envy::from_env()?)
}

#[cfg(test)]
mod tests {
    use crate::config::Env;
    use likeboard_common::snowflake::WorkerId;

    fn vars(extra: &[(&str, &str)]) -> Vec<(String, String)> {
        [
            ("SERVER_ADDRESS", "127.0.0.1"),
            ("SERVER_PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/likeboard"),
        ]
        .iter()
        .chain(extra)
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect()
    }

    #[test]
    fn defaults() {
        let env: Env = envy::from_iter(vars(&[])).unwrap();

        assert_eq!(env.server_port, 8080);
        assert_eq!(env.database_max_connections, 10);
        assert_eq!(env.worker_id, WorkerId::default());
        assert_eq!(env.app_name, "Likeboard");
        assert_eq!(env.app_url, "http://localhost:8080");
    }

    #[test]
    fn overrides() {
        let env: Env = envy::from_iter(vars(&[
            ("WORKER_ID", "3"),
            ("APP_URL", "https://likeboard.example"),
        ]))
        .unwrap();

        assert_eq!(env.worker_id, WorkerId::new(3).unwrap());
        assert_eq!(env.app_url, "https://likeboard.example");
    }

    #[test]
    fn out_of_range_worker_id_is_rejected() {
        assert!(envy::from_iter::<_, Env>(vars(&[("WORKER_ID", "32")])).is_err());
    }

    #[test]
    fn missing_database_url_is_rejected() {
        let vars = vec![
            ("SERVER_ADDRESS".to_owned(), "127.0.0.1".to_owned()),
            ("SERVER_PORT".to_owned(), "8080".to_owned()),
        ];
        assert!(envy::from_iter::<_, Env>(vars).is_err());
    }
}
