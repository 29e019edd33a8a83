//! Configuration for topolab.
//!
//! One TOML file plus `TOPOLAB_` environment overrides, merged with
//! figment. Holds the inventory connection, traversal filters, role
//! classification, per-device transit peers and the upstream prepend
//! policy, and translates them into the plain `topolab_core` settings.
//! Token lookup follows env var → keyring → plaintext; the CLI adds the
//! flag override and interactive prompt on top.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use topolab_api::{TlsMode, TransportConfig};
use topolab_core::{
    Classification, CoreError, FetchConfig, PrependPolicy, ResolveConfig, TransitTable,
};

/// Environment variable consulted after `token_env`.
pub const TOKEN_ENV: &str = "TOPOLAB_TOKEN";

const KEYRING_SERVICE: &str = "topolab";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file {} does not exist", .0.display())]
    MissingFile(PathBuf),

    #[error("no inventory token configured for {host}")]
    NoCredentials { host: String },

    /// The transit table failed validation; fatal before any traversal.
    #[error(transparent)]
    Transit(#[from] CoreError),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub inventory: InventorySection,

    #[serde(default)]
    pub resolve: ResolveSection,

    #[serde(default)]
    pub classification: Classification,

    /// Per-device settings keyed by FQDN.
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceSection>,

    /// Transit providers keyed by the name used in `devices.*.transits`.
    #[serde(default)]
    pub transit_providers: BTreeMap<String, ProviderSection>,

    #[serde(default)]
    pub upstream: UpstreamSection,

    #[serde(default)]
    pub topology: TopologySection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InventorySection {
    /// Inventory root URL (e.g., "https://netbox.example.org").
    pub url: Option<String>,

    /// API token (plaintext, prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the API token.
    pub token_env: Option<String>,

    #[serde(default)]
    pub insecure: bool,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_max_waves")]
    pub max_waves: usize,
}

impl Default for InventorySection {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            token_env: None,
            insecure: false,
            ca_cert: None,
            timeout: default_timeout(),
            page_size: default_page_size(),
            concurrency: default_concurrency(),
            max_waves: default_max_waves(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_page_size() -> u32 {
    500
}
fn default_concurrency() -> usize {
    8
}
fn default_max_waves() -> usize {
    3
}

/// Traversal filters and naming conventions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolveSection {
    /// Lab name, used for the topology descriptor.
    pub name: String,
    pub roles: Vec<String>,
    pub statuses: Vec<String>,
    pub hosts: Vec<String>,
    pub isp_device: String,
    pub switch_facing_prefix: String,
    pub mgmt_prefixes: Vec<String>,
    pub tunnel_prefixes: Vec<String>,
}

impl Default for ResolveSection {
    fn default() -> Self {
        let core = ResolveConfig::default();
        Self {
            name: "topolab".into(),
            roles: core.roles,
            statuses: core.statuses,
            hosts: core.hosts,
            isp_device: core.isp_device,
            switch_facing_prefix: core.switch_facing_prefix,
            mgmt_prefixes: core.mgmt_prefixes,
            tunnel_prefixes: core.tunnel_prefixes,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceSection {
    /// Access switch that routes and is emulated as a routing node.
    pub l3_switch: bool,
    /// Transit peer IP → provider name.
    pub transits: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderSection {
    pub asn: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamSection {
    pub seed: u64,
    pub max_prepends: u32,
    /// AS paths announced by every provider, origin last.
    pub paths: Vec<Vec<u32>>,
}

impl Default for UpstreamSection {
    fn default() -> Self {
        let policy = PrependPolicy::default();
        Self {
            seed: policy.seed,
            max_prepends: policy.max_prepends,
            paths: Vec::new(),
        }
    }
}

/// Settings for the emitted lab topology descriptor.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TopologySection {
    pub mgmt_network: String,
    pub routing_image: String,
    pub linux_image: String,
    /// License file handed to routing nodes.
    pub license: Option<PathBuf>,
    pub binds: Vec<String>,
}

impl Default for TopologySection {
    fn default() -> Self {
        Self {
            mgmt_network: "topolab".into(),
            routing_image: "crpd".into(),
            linux_image: "debian:latest".into(),
            license: None,
            binds: Vec::new(),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "topolab", "topolab").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("topolab");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// The merged provider chain: defaults, then the TOML file, then
/// `TOPOLAB_SECTION__KEY` environment variables.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(
            Env::prefixed("TOPOLAB_")
                .ignore(&["token", "config"])
                .split("__"),
        )
}

/// Load the full Config. An explicit path must exist; the default path
/// may be absent.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(explicit) if !explicit.exists() => {
            return Err(ConfigError::MissingFile(explicit.to_path_buf()));
        }
        Some(explicit) => explicit.to_path_buf(),
        None => config_path(),
    };
    tracing::debug!(path = %path.display(), "loading config");
    load_from(&figment(&path))
}

/// Extract and validate a Config from any figment.
pub fn load_from(figment: &Figment) -> Result<Config, ConfigError> {
    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Validation & translation ────────────────────────────────────────

impl Config {
    /// Checks that run at load time, before anything touches the network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref url) = self.inventory.url {
            parse_url(url)?;
        }
        if self.inventory.concurrency == 0 {
            return Err(ConfigError::Validation {
                field: "inventory.concurrency".into(),
                reason: "must be at least 1".into(),
            });
        }
        self.transit_table()?;
        Ok(())
    }

    /// The inventory URL, required for any live fetch.
    pub fn inventory_url(&self) -> Result<url::Url, ConfigError> {
        let raw = self
            .inventory
            .url
            .as_deref()
            .ok_or_else(|| ConfigError::Validation {
                field: "inventory.url".into(),
                reason: "not set (use --url or [inventory] url)".into(),
            })?;
        parse_url(raw)
    }

    /// Validated transit table; a peer without a provider ASN is fatal.
    pub fn transit_table(&self) -> Result<TransitTable, ConfigError> {
        let asns: BTreeMap<String, u32> = self
            .transit_providers
            .iter()
            .map(|(name, provider)| (name.clone(), provider.asn))
            .collect();
        let devices = self.devices.iter().map(|(fqdn, device)| {
            (
                fqdn.as_str(),
                device
                    .transits
                    .iter()
                    .map(|(ip, provider)| (ip.as_str(), provider.as_str())),
            )
        });
        Ok(TransitTable::build(devices, &asns)?)
    }

    pub fn resolve_config(&self) -> Result<ResolveConfig, ConfigError> {
        let l3_switches: BTreeSet<String> = self
            .devices
            .iter()
            .filter(|(_, device)| device.l3_switch)
            .map(|(fqdn, _)| fqdn.clone())
            .collect();

        let section = &self.resolve;
        Ok(ResolveConfig {
            roles: section.roles.clone(),
            statuses: section.statuses.clone(),
            hosts: section.hosts.clone(),
            isp_device: section.isp_device.clone(),
            switch_facing_prefix: section.switch_facing_prefix.clone(),
            mgmt_prefixes: section.mgmt_prefixes.clone(),
            tunnel_prefixes: section.tunnel_prefixes.clone(),
            classification: self.classification.clone(),
            l3_switches,
            transits: self.transit_table()?,
        })
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            roles: self.resolve.roles.clone(),
            statuses: self.resolve.statuses.clone(),
            hosts: self.resolve.hosts.clone(),
            concurrency: self.inventory.concurrency,
            max_waves: self.inventory.max_waves,
        }
    }

    pub fn prepend_policy(&self) -> PrependPolicy {
        PrependPolicy {
            seed: self.upstream.seed,
            max_prepends: self.upstream.max_prepends,
        }
    }

    pub fn transport_config(&self) -> TransportConfig {
        let tls = if self.inventory.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.inventory.ca_cert {
            TlsMode::CustomCa(ca_path.clone())
        } else {
            TlsMode::System
        };
        TransportConfig {
            tls,
            timeout: Duration::from_secs(self.inventory.timeout),
        }
    }

    // ── Credential resolution (without CLI flags) ───────────────────

    /// Resolve the API token from the credential chain (no CLI flag step).
    pub fn resolve_token(&self) -> Result<SecretString, ConfigError> {
        // 1. Configured env var name → env var lookup
        if let Some(ref env_name) = self.inventory.token_env {
            if let Ok(val) = std::env::var(env_name) {
                return Ok(SecretString::from(val));
            }
        }

        // 2. Well-known env var
        if let Ok(val) = std::env::var(TOKEN_ENV) {
            return Ok(SecretString::from(val));
        }

        // 3. System keyring
        let account = self.keyring_account();
        if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &account) {
            if let Ok(secret) = entry.get_password() {
                return Ok(SecretString::from(secret));
            }
        }

        // 4. Plaintext in config
        if let Some(ref token) = self.inventory.token {
            return Ok(SecretString::from(token.clone()));
        }

        Err(ConfigError::NoCredentials {
            host: self.inventory_host(),
        })
    }

    /// Store a token in the system keyring for this inventory host.
    pub fn store_token(&self, token: &SecretString) -> Result<(), ConfigError> {
        use secrecy::ExposeSecret;

        let entry = keyring::Entry::new(KEYRING_SERVICE, &self.keyring_account())?;
        entry.set_password(token.expose_secret())?;
        Ok(())
    }

    fn keyring_account(&self) -> String {
        format!("{}/token", self.inventory_host())
    }

    fn inventory_host(&self) -> String {
        self.inventory
            .url
            .as_deref()
            .and_then(|raw| url::Url::parse(raw).ok())
            .and_then(|url| url.host_str().map(str::to_owned))
            .unwrap_or_else(|| "default".into())
    }
}

fn parse_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url = url::Url::parse(raw).map_err(|e| ConfigError::Validation {
        field: "inventory.url".into(),
        reason: format!("invalid URL {raw:?}: {e}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "inventory.url".into(),
            reason: format!("unsupported scheme {:?}", url.scheme()),
        });
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    const SAMPLE: &str = r#"
        [inventory]
        url = "https://netbox.example.org"
        timeout = 10

        [resolve]
        name = "eqiad-lab"
        roles = ["cr", "cloudsw", "asw"]
        hosts = ["lvs1013"]

        [classification]
        access_switch_roles = ["asw", "tor"]

        [devices."asw1-b12-eqiad.mgmt.eqiad.wmnet"]
        l3_switch = true

        [devices."cr1-eqiad.wikimedia.org".transits]
        "80.239.192.101" = "telia"
        "2001:2000:3080:ebc::1" = "telia"

        [transit_providers.telia]
        asn = 1299

        [upstream]
        seed = 42
        paths = [[3356, 64496], [174, 64497]]
    "#;

    fn from_toml(text: &str) -> Result<Config, ConfigError> {
        load_from(&Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(text)))
    }

    #[test]
    fn defaults_match_engine_defaults() {
        let cfg = from_toml("").unwrap();
        assert_eq!(cfg.resolve_config().unwrap(), ResolveConfig::default());
        assert_eq!(cfg.fetch_config(), FetchConfig::default());
        assert_eq!(cfg.prepend_policy(), PrependPolicy::default());
        assert_eq!(cfg.inventory.page_size, 500);
    }

    #[test]
    fn sample_translates_to_engine_settings() {
        let cfg = from_toml(SAMPLE).unwrap();
        let resolve = cfg.resolve_config().unwrap();

        assert_eq!(resolve.roles, vec!["cr", "cloudsw", "asw"]);
        assert_eq!(resolve.hosts, vec!["lvs1013"]);
        assert_eq!(
            resolve.classification.access_switch_roles,
            vec!["asw", "tor"]
        );
        assert!(resolve.l3_switches.contains("asw1-b12-eqiad.mgmt.eqiad.wmnet"));

        let peers = resolve.transits.peers_for("cr1-eqiad");
        assert_eq!(peers.len(), 2);
        assert!(peers.iter().all(|p| p.asn == 1299 && p.provider == "telia"));

        assert_eq!(cfg.prepend_policy().seed, 42);
        assert_eq!(cfg.upstream.paths.len(), 2);
        assert_eq!(cfg.transport_config().timeout, Duration::from_secs(10));
        assert_eq!(cfg.inventory_url().unwrap().host_str(), Some("netbox.example.org"));
    }

    #[test]
    fn provider_without_asn_fails_at_load() {
        let err = from_toml(
            r#"
            [devices."cr2-codfw.wikimedia.org".transits]
            "206.126.236.1" = "ntt"
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Transit(CoreError::MalformedTransitTable { .. })
        ));
    }

    #[test]
    fn bad_url_fails_at_load() {
        let err = from_toml("[inventory]\nurl = \"ftp://netbox\"").unwrap_err();
        assert!(err.to_string().contains("scheme"));
    }

    #[test]
    fn missing_url_is_a_validation_error() {
        let cfg = from_toml("").unwrap();
        assert!(matches!(
            cfg.inventory_url(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn tls_mode_follows_insecure_then_ca() {
        let cfg = from_toml("[inventory]\ninsecure = true\nca_cert = \"/etc/ca.pem\"").unwrap();
        assert!(matches!(
            cfg.transport_config().tls,
            TlsMode::DangerAcceptInvalid
        ));
        let cfg = from_toml("[inventory]\nca_cert = \"/etc/ca.pem\"").unwrap();
        assert!(matches!(cfg.transport_config().tls, TlsMode::CustomCa(_)));
    }

    #[test]
    fn file_and_env_are_merged() {
        Jail::expect_with(|jail| {
            jail.create_file("topolab.toml", SAMPLE)?;
            jail.set_env("TOPOLAB_INVENTORY__CONCURRENCY", "2");
            jail.set_env("TOPOLAB_UPSTREAM__MAX_PREPENDS", "4");
            jail.set_env("TOPOLAB_TOKEN", "ignored-by-figment");

            let cfg = load_config(Some(Path::new("topolab.toml"))).map_err(|e| e.to_string())?;
            assert_eq!(cfg.inventory.concurrency, 2);
            assert_eq!(cfg.prepend_policy().max_prepends, 4);
            assert_eq!(cfg.resolve.name, "eqiad-lab");
            assert_eq!(cfg.inventory.token, None);
            Ok(())
        });
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/topolab.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(_)));
    }

    #[test]
    fn token_env_wins_over_plaintext() {
        Jail::expect_with(|jail| {
            jail.set_env("LAB_NETBOX_TOKEN", "from-env");
            let cfg = from_toml(
                "[inventory]\ntoken = \"plaintext\"\ntoken_env = \"LAB_NETBOX_TOKEN\"",
            )
            .map_err(|e| e.to_string())?;
            let token = cfg.resolve_token().map_err(|e| e.to_string())?;
            assert_eq!(token.expose_secret(), "from-env");
            Ok(())
        });
    }

    #[test]
    fn save_then_load_keeps_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = from_toml(SAMPLE).unwrap();
        save_config(&cfg, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let reloaded = from_toml(&text).unwrap();
        assert_eq!(reloaded.resolve.name, "eqiad-lab");
        assert_eq!(reloaded.transit_providers["telia"].asn, 1299);
        assert_eq!(reloaded.devices.len(), 2);
    }
}
