//! Runtime configuration.
//!
//! Follows the host crate's own `config.rs`: a hand-rolled `Config` struct
//! with a `Default` impl, optionally overlaid with a TOML file read from an
//! environment-variable-named path. No reliance on the `config` crate.

use std::{env, fs, path::Path};

/// Tunables for a [`crate::scheduler::Scheduler`] and the [`crate::host::Host`]
/// that owns it.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of messages drained from a `HostService` inbound
    /// queue per drain cycle (§4.1 K).
    pub drain_batch: usize,
    /// Soft bound on a `HostService` inbound queue (`MSG_BUFFER_SIZE`).
    /// `remoteroutes` returns a routing error once this is reached.
    pub msg_buffer_size: usize,
    /// Infoton attraction radius below which a positive-energy infoton is
    /// a no-op (§4.4 `TARGET_DISTANCE`).
    pub target_distance: f32,
    /// Coupling constant `I` applied to every infoton (§4.4).
    pub infoton_coupling: f32,
    /// Coefficient in the default scheduler-infoton policy: energy =
    /// (target - current) * coefficient.
    pub scheduler_infoton_coefficient: f32,
    /// Distance beyond which `check_migration` looks for a nearer peer.
    pub migration_distance: f32,
    /// Half-width of the uniform cube used to jitter scheduler and actor
    /// positions (the spec's "view size").
    pub view_size: f32,
    /// Target number of resident actors per scheduler, used by the default
    /// scheduler-infoton policy.
    pub target_actor_count: usize,
    /// Whether the host staggers scheduler-thread startup (§4.3 step 3).
    /// Disabled by default; race-free startup does not need it.
    pub startup_stagger: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            drain_batch: 30,
            msg_buffer_size: 100_000,
            target_distance: 4.0,
            infoton_coupling: 1.0,
            scheduler_infoton_coefficient: 0.002,
            migration_distance: 700.0,
            view_size: 1000.0,
            target_actor_count: 1_000,
            startup_stagger: false,
        }
    }
}

impl Config {
    /// Merge in values present in a parsed TOML table; absent keys are left
    /// at their current value. Mirrors the host crate's `Config::merge`,
    /// which uses `Option<()>` plus `?` purely to short-circuit on missing
    /// keys.
    fn merge(&mut self, v: &toml::Value) -> Option<()> {
        let v = v.as_table()?;

        if let Some(n) = v.get("drain_batch").and_then(toml::Value::as_integer) {
            self.drain_batch = n as usize;
        }
        if let Some(n) = v.get("msg_buffer_size").and_then(toml::Value::as_integer) {
            self.msg_buffer_size = n as usize;
        }
        if let Some(n) = v.get("target_distance").and_then(toml::Value::as_float) {
            self.target_distance = n as f32;
        }
        if let Some(n) = v.get("infoton_coupling").and_then(toml::Value::as_float) {
            self.infoton_coupling = n as f32;
        }
        if let Some(n) = v
            .get("scheduler_infoton_coefficient")
            .and_then(toml::Value::as_float)
        {
            self.scheduler_infoton_coefficient = n as f32;
        }
        if let Some(n) = v.get("migration_distance").and_then(toml::Value::as_float) {
            self.migration_distance = n as f32;
        }
        if let Some(n) = v.get("view_size").and_then(toml::Value::as_float) {
            self.view_size = n as f32;
        }
        if let Some(n) = v.get("target_actor_count").and_then(toml::Value::as_integer) {
            self.target_actor_count = n as usize;
        }
        if let Some(b) = v.get("startup_stagger").and_then(toml::Value::as_bool) {
            self.startup_stagger = b;
        }
        Some(())
    }
}

/// Load configuration from the path named by `MESHACTOR_CONF`
/// (default `config/meshactor.toml`), falling back to [`Config::default`]
/// when the file is absent or unparsable. Mirrors the host crate's
/// `load_config`.
pub fn load_config() -> Config {
    let mut cfg = Config::default();

    let path = env::var("MESHACTOR_CONF").unwrap_or_else(|_| "config/meshactor.toml".into());
    if let Some(overlay) = read_toml(Path::new(&path)) {
        cfg.merge(&overlay);
    }

    cfg
}

fn read_toml(path: &Path) -> Option<toml::Value> {
    let contents = fs::read_to_string(path).ok()?;
    toml::from_str(&contents).ok()
}
