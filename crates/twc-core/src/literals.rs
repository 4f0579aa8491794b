//! Literals used across the Temporal worker operator

/// Name of the workload container and of the Pebble service inside it
pub const WORKLOAD_NAME: &str = "temporal-worker";

/// Command Pebble runs to start the worker
pub const WORKER_COMMAND: &str = "./app/scripts/start-worker.sh";

/// Name of the Pebble health check attached to the worker service
pub const WORKER_CHECK_NAME: &str = "temporal-worker-check";

/// Command the health check runs inside the workload container
pub const WORKER_CHECK_COMMAND: &str = "twc check-status";

/// Directory in the workload container the workflows wheel is unpacked into
pub const USER_PROVIDED_DIR: &str = "/user_provided";

/// Name the wheel is pushed under when the resource path has none
pub const DEFAULT_WHEEL_FILE_NAME: &str = "wheel_file.whl";

/// Status file written by the worker process
pub const WORKER_STATUS_FILE: &str = "worker_status.txt";

/// Marker the worker writes to its status file once it is polling
pub const WORKER_STATUS_SUCCESS: &str = "Success";

pub const VALID_LOG_LEVELS: &[&str] = &["info", "debug", "warning", "error", "critical"];

pub const REQUIRED_CHARM_CONFIG: &[&str] = &["host", "namespace", "queue"];

pub const REQUIRED_CANDID_CONFIG: &[&str] = &[
    "candid-url",
    "candid-username",
    "candid-public-key",
    "candid-private-key",
];

pub const REQUIRED_OIDC_CONFIG: &[&str] = &[
    "oidc-auth-type",
    "oidc-project-id",
    "oidc-private-key-id",
    "oidc-private-key",
    "oidc-client-email",
    "oidc-client-id",
    "oidc-auth-uri",
    "oidc-token-uri",
    "oidc-auth-cert-url",
    "oidc-client-cert-url",
];

pub const SUPPORTED_AUTH_PROVIDERS: &[&str] = &["candid", "google"];

/// Environment variable prefixes owned by the worker process.
///
/// Every charm-derived variable is published under both prefixes; the
/// `TEMPORAL_` form is kept for workers built before the `TWC_` rename.
pub const ENV_PREFIXES: &[&str] = &["TEMPORAL_", "TWC_"];

/// Config options that never reach the worker environment directly
pub const UNFORWARDED_CONFIG: &[&str] = &["environment", "secrets", "auth-secret-id", "health-check"];

/// Proxy settings Juju exposes to the charm, mapped to the names the worker reads
pub const PROXY_ENV_VARS: &[(&str, &str)] = &[
    ("JUJU_CHARM_HTTP_PROXY", "HTTP_PROXY"),
    ("JUJU_CHARM_HTTPS_PROXY", "HTTPS_PROXY"),
    ("JUJU_CHARM_NO_PROXY", "NO_PROXY"),
];

/// Label of the unit secret holding the vault nonce
pub const VAULT_NONCE_SECRET_LABEL: &str = "nonce";

/// Where the vault CA certificate is written before the client connects
pub const VAULT_CERT_PATH: &str = "/vault/cert.pem";

/// Name of the AppRole auth mount on the vault server
pub const VAULT_APPROLE_MOUNT: &str = "approle";

/// Suffix requested for this application's KV mount
pub const VAULT_MOUNT_SUFFIX: &str = "temporal-worker-k8s";

pub const VAULT_RELATION: &str = "vault";
