//! Configuration loading from benchsweep.toml
//!
//! Every field has a default matching the driver repository layout, so the
//! file is optional. When no path is given, `benchsweep.toml` is discovered by
//! walking up from the current directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::SweepError;
use crate::types::{COMPILED_LABEL, Implementation};

pub const CONFIG_FILE_NAME: &str = "benchsweep.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Scripting-language client libraries compared against the compiled driver
    #[serde(default = "default_libs")]
    pub libs: Vec<String>,
    #[serde(default)]
    pub sweep: SweepSettings,
    #[serde(default)]
    pub commands: CommandSettings,
    #[serde(default)]
    pub notify: NotifySettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default = "default_benchmarks")]
    pub benchmarks: Vec<BenchmarkDef>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            libs: default_libs(),
            sweep: SweepSettings::default(),
            commands: CommandSettings::default(),
            notify: NotifySettings::default(),
            output: OutputSettings::default(),
            benchmarks: default_benchmarks(),
        }
    }
}

/// What to do when a single benchmark run fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop the whole sweep on the first failure
    #[default]
    Abort,
    /// Record the trial as missing and carry on
    Skip,
    /// Re-run up to `retries` more times, then abort
    Retry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSettings {
    /// Trials per (benchmark, size, implementation)
    #[serde(default = "default_repeat")]
    pub repeat: usize,
    /// Number of geometric size steps
    #[serde(default = "default_steps")]
    pub steps: usize,
    /// Ratio between consecutive size steps
    #[serde(default = "default_step_factor")]
    pub step_factor: f64,
    #[serde(default)]
    pub on_failure: FailurePolicy,
    /// Extra attempts per trial under `on_failure = "retry"`
    #[serde(default = "default_retries")]
    pub retries: usize,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            repeat: default_repeat(),
            steps: default_steps(),
            step_factor: default_step_factor(),
            on_failure: FailurePolicy::default(),
            retries: default_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSettings {
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Prefix that produces the verbose timing report on stderr
    #[serde(default = "default_time_wrapper")]
    pub time_wrapper: String,
    #[serde(default = "default_cargo")]
    pub cargo: String,
    /// Cargo package holding the compiled benchmark binaries
    #[serde(default = "default_cargo_package")]
    pub cargo_package: String,
    /// Environment variable carrying the size to the compiled binaries
    #[serde(default = "default_size_env")]
    pub size_env: String,
    #[serde(default = "default_node")]
    pub node: String,
    #[serde(default = "default_script_dir")]
    pub script_dir: String,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            time_wrapper: default_time_wrapper(),
            cargo: default_cargo(),
            cargo_package: default_cargo_package(),
            size_env: default_size_env(),
            node: default_node(),
            script_dir: default_script_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifySettings {
    /// Environment variable holding the webhook URL
    #[serde(default = "default_webhook_env")]
    pub webhook_env: String,
    #[serde(default = "default_commit_url_base")]
    pub commit_url_base: String,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            webhook_env: default_webhook_env(),
            commit_url_base: default_commit_url_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_chart_path")]
    pub chart: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            chart: default_chart_path(),
        }
    }
}

/// One workload in the sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkDef {
    pub name: String,
    /// First size step
    pub min_size: f64,
    /// Compiled binary name; defaults to `<name>_benchmark`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
    /// Script file under `script_dir`; defaults to `<name>.js`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl BenchmarkDef {
    pub fn new(name: &str, min_size: f64) -> Self {
        Self {
            name: name.to_string(),
            min_size,
            binary: None,
            script: None,
        }
    }

    pub fn binary_name(&self) -> String {
        self.binary
            .clone()
            .unwrap_or_else(|| format!("{}_benchmark", self.name))
    }

    pub fn script_name(&self) -> String {
        self.script
            .clone()
            .unwrap_or_else(|| format!("{}.js", self.name))
    }

    /// Geometric size sequence `min_size * factor^i` for `i in 0..count`.
    pub fn steps(&self, count: usize, factor: f64) -> Vec<f64> {
        (0..count)
            .map(|i| self.min_size * factor.powi(i as i32))
            .collect()
    }

    fn matches(&self, name: &str) -> bool {
        self.name == name || self.script_name() == name || self.binary_name() == name
    }
}

fn default_libs() -> Vec<String> {
    vec!["scylladb-driver-alpha".to_string(), "cassandra-driver".to_string()]
}
fn default_repeat() -> usize {
    3
}
fn default_steps() -> usize {
    4
}
fn default_step_factor() -> f64 {
    4.0
}
fn default_retries() -> usize {
    2
}
fn default_shell() -> String {
    "/bin/bash".to_string()
}
fn default_time_wrapper() -> String {
    "/usr/bin/time -v".to_string()
}
fn default_cargo() -> String {
    "cargo".to_string()
}
fn default_cargo_package() -> String {
    "benchmark".to_string()
}
fn default_size_env() -> String {
    "CNT".to_string()
}
fn default_node() -> String {
    "node".to_string()
}
fn default_script_dir() -> String {
    "benchmark/logic".to_string()
}
fn default_webhook_env() -> String {
    "DISCORD_BENCHMARKS_WEBHOOK".to_string()
}
fn default_commit_url_base() -> String {
    "https://github.com/scylladb/nodejs-rs-driver/commit".to_string()
}
fn default_chart_path() -> PathBuf {
    PathBuf::from("graph.png")
}

fn is_positive_finite(x: f64) -> bool {
    x.is_finite() && x > 0.0
}

fn default_benchmarks() -> Vec<BenchmarkDef> {
    vec![
        BenchmarkDef::new("concurrent_insert", 4_000_000.0 / 64.0),
        BenchmarkDef::new("insert", 400_000.0 / 64.0),
        BenchmarkDef::new("select", 100_000.0 / 64.0),
        BenchmarkDef::new("concurrent_select", 400_000.0 / 64.0),
        BenchmarkDef::new("batch", 3_000_000.0 / 64.0),
        BenchmarkDef::new("paging", 4_000.0 / 64.0),
        BenchmarkDef::new("concurrent_paging", 1_280.0 / 64.0),
        BenchmarkDef::new("large_select", 4_000.0 / 64.0),
        BenchmarkDef::new("deser", 2_000.0 / 64.0),
        BenchmarkDef::new("concurrent_deser", 2_000.0 / 64.0),
    ]
}

impl SweepConfig {
    /// Load from an explicit path, else a discovered `benchsweep.toml`, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, SweepError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_from(&cwd))
        {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Walk up from `start` looking for `benchsweep.toml`.
    pub fn discover_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    pub fn load(path: &Path) -> Result<Self, SweepError> {
        let content = std::fs::read_to_string(path).map_err(|source| SweepError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|detail| SweepError::ConfigParse {
            path: path.to_path_buf(),
            detail,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.sweep.repeat == 0 {
            return Err("sweep.repeat must be at least 1".to_string());
        }
        if self.sweep.steps == 0 {
            return Err("sweep.steps must be at least 1".to_string());
        }
        if !is_positive_finite(self.sweep.step_factor) {
            return Err("sweep.step_factor must be positive and finite".to_string());
        }
        if let Some(bench) = self.benchmarks.iter().find(|b| !is_positive_finite(b.min_size)) {
            return Err(format!("benchmark '{}' needs a positive finite min_size", bench.name));
        }
        for (i, lib) in self.libs.iter().enumerate() {
            if lib == COMPILED_LABEL {
                return Err(format!("lib name '{lib}' is reserved for the compiled driver"));
            }
            if self.libs[..i].contains(lib) {
                return Err(format!("lib '{lib}' is listed more than once"));
            }
        }
        Ok(())
    }

    /// Table columns shared by every benchmark: the libraries in order, then
    /// the compiled driver.
    pub fn implementations(&self) -> Vec<Implementation> {
        self.libs
            .iter()
            .cloned()
            .map(Implementation::Scripted)
            .chain(std::iter::once(Implementation::Compiled))
            .collect()
    }

    /// Benchmarks to run, in configured order. An empty filter selects all.
    /// Names may be given bare, with the script extension, or as the binary name.
    pub fn select_benchmarks(&self, filter: &[String]) -> Result<Vec<&BenchmarkDef>, SweepError> {
        if filter.is_empty() {
            return Ok(self.benchmarks.iter().collect());
        }

        for name in filter {
            if !self.benchmarks.iter().any(|b| b.matches(name)) {
                return Err(SweepError::UnknownBenchmark { name: name.clone() });
            }
        }

        Ok(self
            .benchmarks
            .iter()
            .filter(|b| filter.iter().any(|name| b.matches(name)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_driver_layout() {
        let config = SweepConfig::default();
        assert_eq!(config.sweep.repeat, 3);
        assert_eq!(config.sweep.steps, 4);
        assert_eq!(config.sweep.on_failure, FailurePolicy::Abort);
        assert_eq!(config.libs, vec!["scylladb-driver-alpha", "cassandra-driver"]);
        assert_eq!(config.benchmarks.len(), 10);
        assert_eq!(config.notify.webhook_env, "DISCORD_BENCHMARKS_WEBHOOK");
        assert_eq!(config.commands.time_wrapper, "/usr/bin/time -v");
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = SweepConfig::from_toml("").unwrap();
        assert_eq!(config.benchmarks, SweepConfig::default().benchmarks);
        assert_eq!(config.output.chart, PathBuf::from("graph.png"));
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = SweepConfig::from_toml(
            r#"
libs = ["only-lib"]

[sweep]
repeat = 5
on_failure = "retry"
retries = 1

[[benchmarks]]
name = "insert"
min_size = 100
binary = "custom_insert"
"#,
        )
        .unwrap();
        assert_eq!(config.libs, vec!["only-lib"]);
        assert_eq!(config.sweep.repeat, 5);
        assert_eq!(config.sweep.steps, 4);
        assert_eq!(config.sweep.on_failure, FailurePolicy::Retry);
        assert_eq!(config.sweep.retries, 1);
        assert_eq!(config.benchmarks.len(), 1);
        assert_eq!(config.benchmarks[0].binary_name(), "custom_insert");
        assert_eq!(config.benchmarks[0].script_name(), "insert.js");
    }

    #[test]
    fn invalid_policy_rejected() {
        let err = SweepConfig::from_toml("[sweep]\non_failure = \"ignore\"\n").unwrap_err();
        assert!(err.contains("on_failure") || err.contains("ignore"), "{err}");
    }

    #[test]
    fn zero_repeat_rejected() {
        assert!(SweepConfig::from_toml("[sweep]\nrepeat = 0\n").is_err());
    }

    #[test]
    fn non_positive_min_size_rejected() {
        let err = SweepConfig::from_toml("[[benchmarks]]\nname = \"x\"\nmin_size = 0\n").unwrap_err();
        assert!(err.contains("'x'"), "{err}");
    }

    #[test]
    fn infinite_sizes_rejected() {
        let err = SweepConfig::from_toml("[sweep]\nstep_factor = inf\n").unwrap_err();
        assert!(err.contains("step_factor"), "{err}");

        let err = SweepConfig::from_toml("[[benchmarks]]\nname = \"x\"\nmin_size = inf\n").unwrap_err();
        assert!(err.contains("'x'"), "{err}");
    }

    #[test]
    fn duplicate_lib_rejected() {
        let err = SweepConfig::from_toml("libs = [\"lib-a\", \"lib-b\", \"lib-a\"]\n").unwrap_err();
        assert!(err.contains("'lib-a'"), "{err}");
        assert!(err.contains("more than once"), "{err}");
    }

    #[test]
    fn compiled_label_is_reserved() {
        let err = SweepConfig::from_toml("libs = [\"rust-driver\"]\n").unwrap_err();
        assert!(err.contains("reserved"), "{err}");
    }

    #[test]
    fn distinct_libs_accepted() {
        let config = SweepConfig::from_toml("libs = [\"lib-a\", \"lib-b\"]\n").unwrap();
        assert_eq!(config.implementations().len(), 3);
    }

    #[test]
    fn steps_are_geometric() {
        let bench = BenchmarkDef::new("insert", 10.0);
        assert_eq!(bench.steps(4, 4.0), vec![10.0, 40.0, 160.0, 640.0]);
    }

    #[test]
    fn steps_keep_fractional_min_size() {
        let bench = BenchmarkDef::new("deser", 2_000.0 / 64.0);
        assert_eq!(bench.steps(2, 4.0), vec![31.25, 125.0]);
    }

    #[test]
    fn default_names_derive_from_benchmark() {
        let bench = BenchmarkDef::new("concurrent_select", 1.0);
        assert_eq!(bench.binary_name(), "concurrent_select_benchmark");
        assert_eq!(bench.script_name(), "concurrent_select.js");
    }

    #[test]
    fn implementations_put_compiled_last() {
        let config = SweepConfig::default();
        assert_eq!(
            config.implementations(),
            vec![
                Implementation::Scripted("scylladb-driver-alpha".into()),
                Implementation::Scripted("cassandra-driver".into()),
                Implementation::Compiled,
            ]
        );
    }

    #[test]
    fn select_all_when_filter_empty() {
        let config = SweepConfig::default();
        assert_eq!(config.select_benchmarks(&[]).unwrap().len(), 10);
    }

    #[test]
    fn select_accepts_script_and_binary_names() {
        let config = SweepConfig::default();
        let picked = config
            .select_benchmarks(&["insert.js".to_string(), "paging_benchmark".to_string()])
            .unwrap();
        let names: Vec<_> = picked.iter().map(|b| b.name.as_str()).collect();
        // Configured order, not filter order.
        assert_eq!(names, vec!["insert", "paging"]);
    }

    #[test]
    fn select_unknown_is_error() {
        let config = SweepConfig::default();
        let err = config.select_benchmarks(&["nope".to_string()]).unwrap_err();
        assert!(matches!(err, SweepError::UnknownBenchmark { .. }));
    }

    #[test]
    fn discover_walks_up() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "").unwrap();

        let found = SweepConfig::discover_from(&nested).unwrap();
        assert_eq!(found, tmp.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn load_reports_path_on_parse_error() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "libs = 3").unwrap();

        let err = SweepConfig::load(&path).unwrap_err();
        assert!(matches!(err, SweepError::ConfigParse { .. }));
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let err = SweepConfig::load(Path::new("/nonexistent/benchsweep.toml")).unwrap_err();
        assert!(matches!(err, SweepError::ConfigRead { .. }));
    }
}
