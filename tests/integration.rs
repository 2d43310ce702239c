use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

const FAKE_CARGO: &str = r#"#!/bin/bash
if [ "$1" = "build" ]; then
    if [ -n "$FAIL_BUILD" ]; then
        echo "error: could not compile" >&2
        exit 101
    fi
    exit 0
fi
echo "    Finished \`release\` profile [optimized] target(s) in 0.50s" >&2
echo "     Running \`target/release/bench\`" >&2
echo "	Elapsed (wall clock) time (h:mm:ss or m:ss): 0:02.50" >&2
echo "	Maximum resident set size (kbytes): 10240" >&2
"#;

const FAKE_NODE: &str = r#"#!/bin/bash
# $1 = script, $2 = lib, $3 = size
if [ "$2" = "lib-a" ]; then
    echo "	Elapsed (wall clock) time (h:mm:ss or m:ss): 0:01.00" >&2
else
    echo "	Elapsed (wall clock) time (h:mm:ss or m:ss): 0:03.00" >&2
fi
echo "	Maximum resident set size (kbytes): 20480" >&2
"#;

fn write_executable(path: &Path, content: &str) {
    fs::write(path, content).unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

/// Sets up a temp dir with fake `cargo`/`node` scripts and a config that
/// points at them. Returns the temp dir (must be kept alive).
fn setup_fake_tools() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let cargo = tmp.path().join("fake-cargo");
    let node = tmp.path().join("fake-node");
    write_executable(&cargo, FAKE_CARGO);
    write_executable(&node, FAKE_NODE);

    let config = format!(
        r#"libs = ["lib-a", "lib-b"]

[sweep]
repeat = 2
steps = 2

[commands]
time_wrapper = ""
cargo = "{}"
node = "{}"
script_dir = "logic"

[[benchmarks]]
name = "insert"
min_size = 10

[[benchmarks]]
name = "select"
min_size = 5
"#,
        cargo.display(),
        node.display()
    );
    fs::write(tmp.path().join("benchsweep.toml"), config).unwrap();
    tmp
}

fn benchsweep_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("benchsweep").unwrap();
    cmd.current_dir(dir);
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("RUST_LOG");
    cmd
}

// ---- Dry run ----

#[test]
fn dry_run_lists_default_commands() {
    let tmp = TempDir::new().unwrap();

    benchsweep_cmd(tmp.path())
        .args(["--dry-run", "--bench", "insert"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "cargo build -p benchmark --bin insert_benchmark -r",
        ))
        .stdout(predicate::str::contains(
            "CNT=6250 /usr/bin/time -v cargo run -p benchmark --bin insert_benchmark -r",
        ))
        .stdout(predicate::str::contains(
            "/usr/bin/time -v node benchmark/logic/insert.js cassandra-driver 6250",
        ))
        .stdout(predicate::str::contains(
            "/usr/bin/time -v node benchmark/logic/insert.js scylladb-driver-alpha 400000",
        ))
        // 1 build + 4 steps * 3 implementations * 3 repeats
        .stdout(predicate::str::contains("37 process invocations"));
}

#[test]
fn dry_run_respects_repeat_override() {
    let tmp = TempDir::new().unwrap();

    benchsweep_cmd(tmp.path())
        .args(["--dry-run", "--bench", "paging", "--repeat", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("13 process invocations"));
}

#[test]
fn zero_repeat_is_rejected() {
    let tmp = TempDir::new().unwrap();

    benchsweep_cmd(tmp.path())
        .args(["--dry-run", "--repeat", "0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("--repeat must be at least 1"));
}

#[test]
fn unknown_benchmark_fails() {
    let tmp = TempDir::new().unwrap();

    benchsweep_cmd(tmp.path())
        .args(["--dry-run", "--bench", "nope"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unknown benchmark 'nope'"));
}

#[test]
fn config_is_discovered_from_parent_directory() {
    let tmp = setup_fake_tools();
    let nested = tmp.path().join("nested");
    fs::create_dir_all(&nested).unwrap();

    benchsweep_cmd(&nested)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("logic/insert.js lib-a 10"))
        .stdout(predicate::str::contains("logic/select.js lib-b 20"))
        // 2 benchmarks * (1 build + 2 steps * 3 implementations * 2 repeats)
        .stdout(predicate::str::contains("26 process invocations"));
}

#[test]
fn explicit_config_missing_fails() {
    let tmp = TempDir::new().unwrap();

    benchsweep_cmd(tmp.path())
        .args(["--dry-run", "--config", "missing.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

// ---- Full sweep against fake tools ----

#[test]
fn sweep_writes_png_chart_and_json() {
    let tmp = setup_fake_tools();

    benchsweep_cmd(tmp.path())
        .args(["--no-notify", "--json", "results.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Benchmark - insert"))
        .stdout(predicate::str::contains("Benchmark - select"))
        .stdout(predicate::str::contains("2.00 ± 0.00s"));

    // Default output is graph.png in the working directory.
    let png = fs::read(tmp.path().join("graph.png")).unwrap();
    assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));

    let json = fs::read_to_string(tmp.path().join("results.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
    let benches = parsed["benchmarks"].as_array().unwrap();
    assert_eq!(benches.len(), 2);

    let insert = &benches[0];
    assert_eq!(insert["name"], "insert");
    let time = &insert["results"]["time"];
    assert_eq!(
        time["columns"],
        serde_json::json!(["lib-a", "lib-b", "rust-driver"])
    );
    let rows = time["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["size"], 10.0);
    assert_eq!(rows[1]["size"], 40.0);

    let summary = &insert["summary"]["time"]["rows"][0]["cells"];
    // lib-a 1s, lib-b 3s, compiled 2.5s minus 0.5s build
    assert_eq!(summary[0]["mean"], 1.0);
    assert_eq!(summary[1]["mean"], 3.0);
    assert_eq!(summary[2]["mean"], 2.0);
    assert_eq!(summary[2]["count"], 2);

    let memory = &insert["summary"]["memory"]["rows"][0]["cells"];
    assert_eq!(memory[0]["mean"], 20.0);
    assert_eq!(memory[2]["mean"], 10.0);
}

#[test]
fn svg_output_path_keeps_chart_source() {
    let tmp = setup_fake_tools();

    benchsweep_cmd(tmp.path())
        .args(["--no-notify", "-o", "chart.svg"])
        .assert()
        .success();

    let svg = fs::read_to_string(tmp.path().join("chart.svg")).unwrap();
    assert!(svg.contains("<svg"));
    assert_eq!(svg.matches("Benchmark - insert").count(), 2);
    assert_eq!(svg.matches("Benchmark - select").count(), 2);
    assert!(!tmp.path().join("graph.png").exists());
}

#[test]
fn build_failure_aborts_with_exit_code_1() {
    let tmp = setup_fake_tools();

    benchsweep_cmd(tmp.path())
        .args(["--no-notify", "-o", "chart.png"])
        .env("FAIL_BUILD", "1")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Build error: insert_benchmark"));

    assert!(!tmp.path().join("chart.png").exists());
}

#[test]
fn notify_failure_happens_after_chart_is_written() {
    let tmp = setup_fake_tools();

    // The temp dir is not a git checkout and no webhook is configured.
    benchsweep_cmd(tmp.path())
        .args(["-o", "chart.png", "--bench", "select"])
        .env_remove("DISCORD_BENCHMARKS_WEBHOOK")
        .env("GIT_CEILING_DIRECTORIES", tmp.path())
        .assert()
        .failure()
        .code(1);

    assert!(tmp.path().join("chart.png").exists());
}
