use super::parsing::{
    env_optional, env_or_default, parse_algorithm_endpoints, parse_bool, parse_environment,
    parse_u16, parse_u64, parse_usize,
};
use super::types::{
    AlgorithmSettings, ApiSettings, ConfigError, DatabaseSettings, QueueSettings, RedisSettings,
    RuntimeSettings, ServerHost, ServerPort, ServerSettings, Settings, TelemetrySettings,
    WorkerSettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("GRADER_HOST", "0.0.0.0");
        let port = env_or_default("GRADER_PORT", "8000");

        let environment =
            parse_environment(env_optional("GRADER_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("GRADER_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Essay Grader API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "grader");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "essay_grader");
        let database_url = env_optional("DATABASE_URL");

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let queue_name = env_or_default("QUEUE_NAME", "essay-grader:tasks");
        let queue_poll_timeout_seconds = parse_u64(
            "QUEUE_POLL_TIMEOUT_SECONDS",
            env_or_default("QUEUE_POLL_TIMEOUT_SECONDS", "2"),
        )?;

        let worker_id = env_or_default("WORKER_ID", "worker-1");
        let worker_concurrency =
            parse_usize("WORKER_CONCURRENCY", env_or_default("WORKER_CONCURRENCY", "4"))?;
        let reschedule_interval_seconds = parse_u64(
            "RESCHEDULE_INTERVAL_SECONDS",
            env_or_default("RESCHEDULE_INTERVAL_SECONDS", "900"),
        )?;

        let algorithm_endpoints = parse_algorithm_endpoints(env_optional("ALGORITHM_ENDPOINTS"))?;
        let algorithm_request_timeout = parse_u64(
            "ALGORITHM_REQUEST_TIMEOUT",
            env_or_default("ALGORITHM_REQUEST_TIMEOUT", "300"),
        )?;

        let log_level = env_or_default("GRADER_LOG_LEVEL", "info");
        let json = env_optional("GRADER_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            queue: QueueSettings {
                name: queue_name,
                poll_timeout_seconds: queue_poll_timeout_seconds,
            },
            worker: WorkerSettings {
                id: worker_id,
                concurrency: worker_concurrency,
                reschedule_interval_seconds,
            },
            algorithms: AlgorithmSettings {
                endpoints: algorithm_endpoints,
                request_timeout_seconds: algorithm_request_timeout,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn queue(&self) -> &QueueSettings {
        &self.queue
    }

    pub(crate) fn worker(&self) -> &WorkerSettings {
        &self.worker
    }

    pub(crate) fn algorithms(&self) -> &AlgorithmSettings {
        &self.algorithms
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "QUEUE_NAME",
                value: String::from("<empty>"),
            });
        }

        if self.queue.poll_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "QUEUE_POLL_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.worker.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "WORKER_CONCURRENCY",
                value: "0".to_string(),
            });
        }

        if self.worker.reschedule_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "RESCHEDULE_INTERVAL_SECONDS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.algorithms.endpoints.is_empty() {
            return Err(ConfigError::MissingSecret("ALGORITHM_ENDPOINTS"));
        }

        Ok(())
    }
}
