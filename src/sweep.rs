//! The benchmark sweep: build each compiled binary, then run every
//! implementation `repeat` times per size step under the timing wrapper.
//!
//! Results are returned as values; nothing is kept in shared state.

use tracing::{debug, info, warn};

use crate::config::{BenchmarkDef, CommandSettings, FailurePolicy, SweepConfig};
use crate::errors::SweepError;
use crate::parse::{extract_build_time, parse_time_report};
use crate::process::CommandRunner;
use crate::types::{BenchmarkResults, Implementation, PlannedCommand, ResultTable, Sample, shell_quote};

/// Size as handed to the benchmark processes.
pub fn size_arg(size: f64) -> u64 {
    size as u64
}

fn join_parts(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `cargo build -p <package> --bin <binary> -r`
pub fn build_command(commands: &CommandSettings, bench: &BenchmarkDef) -> String {
    join_parts(&[
        &commands.cargo,
        "build -p",
        &shell_quote(&commands.cargo_package),
        "--bin",
        &shell_quote(&bench.binary_name()),
        "-r",
    ])
}

/// `CNT=<n> /usr/bin/time -v cargo run -p <package> --bin <binary> -r`
pub fn compiled_run_command(commands: &CommandSettings, bench: &BenchmarkDef, size: f64) -> String {
    let env = format!("{}={}", commands.size_env, size_arg(size));
    join_parts(&[
        &env,
        &commands.time_wrapper,
        &commands.cargo,
        "run -p",
        &shell_quote(&commands.cargo_package),
        "--bin",
        &shell_quote(&bench.binary_name()),
        "-r",
    ])
}

/// `/usr/bin/time -v node <script_dir>/<script> <lib> <n>`
pub fn scripted_run_command(
    commands: &CommandSettings,
    bench: &BenchmarkDef,
    lib: &str,
    size: f64,
) -> String {
    let script = format!(
        "{}/{}",
        commands.script_dir.trim_end_matches('/'),
        bench.script_name()
    );
    join_parts(&[
        &commands.time_wrapper,
        &commands.node,
        &shell_quote(&script),
        &shell_quote(lib),
        &size_arg(size).to_string(),
    ])
}

/// Every command the sweep would run for `benchmarks`, in execution order.
pub fn plan_commands(config: &SweepConfig, benchmarks: &[&BenchmarkDef]) -> Vec<PlannedCommand> {
    let repeat = config.sweep.repeat;
    let mut plan = Vec::new();

    for bench in benchmarks {
        plan.push(PlannedCommand {
            command: build_command(&config.commands, bench),
            times: 1,
        });
        for size in bench.steps(config.sweep.steps, config.sweep.step_factor) {
            plan.push(PlannedCommand {
                command: compiled_run_command(&config.commands, bench, size),
                times: repeat,
            });
            for lib in &config.libs {
                plan.push(PlannedCommand {
                    command: scripted_run_command(&config.commands, bench, lib, size),
                    times: repeat,
                });
            }
        }
    }

    plan
}

/// Run the full sweep over `benchmarks`, returning one pair of tables per
/// benchmark in the order given.
pub fn run_sweep<R: CommandRunner + ?Sized>(
    config: &SweepConfig,
    benchmarks: &[&BenchmarkDef],
    runner: &mut R,
) -> Result<Vec<BenchmarkResults>, SweepError> {
    let mut sweep = Sweep { config, runner };
    benchmarks
        .iter()
        .map(|bench| sweep.run_benchmark(bench))
        .collect()
}

struct Sweep<'a, R: ?Sized> {
    config: &'a SweepConfig,
    runner: &'a mut R,
}

impl<R: CommandRunner + ?Sized> Sweep<'_, R> {
    fn run_benchmark(&mut self, bench: &BenchmarkDef) -> Result<BenchmarkResults, SweepError> {
        let config = self.config;
        let steps = bench.steps(config.sweep.steps, config.sweep.step_factor);
        let columns = config.implementations();

        self.build(bench)?;

        let mut time = ResultTable::new(columns.clone());
        let mut memory = ResultTable::new(columns.clone());

        for &size in &steps {
            // Compiled driver first, then each library; stored in column order.
            let mut by_column: Vec<Vec<Sample>> = vec![Vec::new(); columns.len()];
            let order = std::iter::once(Implementation::Compiled)
                .chain(config.libs.iter().cloned().map(Implementation::Scripted));
            for implementation in order {
                let samples = self.collect(bench, &implementation, size)?;
                if let Some(idx) = time.column_index(&implementation) {
                    by_column[idx] = samples;
                }
            }

            let time_cells: Vec<Vec<Option<f64>>> = by_column
                .iter()
                .map(|s| s.iter().map(|x| x.elapsed_secs).collect())
                .collect();
            let memory_cells: Vec<Vec<Option<f64>>> = by_column
                .iter()
                .map(|s| s.iter().map(|x| x.memory_mb).collect())
                .collect();

            info!(
                benchmark = %bench.name,
                n = size_arg(size),
                time = ?time_cells,
                memory = ?memory_cells,
                "step complete"
            );

            time.push_row(size, time_cells);
            memory.push_row(size, memory_cells);
        }

        Ok(BenchmarkResults {
            name: bench.name.clone(),
            time,
            memory,
        })
    }

    fn build(&mut self, bench: &BenchmarkDef) -> Result<(), SweepError> {
        let binary = bench.binary_name();
        let output = self
            .runner
            .run(&build_command(&self.config.commands, bench))?;
        if !output.success() {
            return Err(SweepError::BuildFailed {
                binary,
                stderr: output.stderr,
            });
        }
        info!(%binary, "built");
        Ok(())
    }

    /// `repeat` trials of one implementation at one size, applying the failure policy.
    fn collect(
        &mut self,
        bench: &BenchmarkDef,
        implementation: &Implementation,
        size: f64,
    ) -> Result<Vec<Sample>, SweepError> {
        let config = self.config;
        let settings = &config.sweep;
        let policy = settings.on_failure;
        let attempts = match policy {
            FailurePolicy::Retry => 1 + settings.retries,
            FailurePolicy::Abort | FailurePolicy::Skip => 1,
        };

        let mut samples = Vec::with_capacity(settings.repeat);
        for _ in 0..settings.repeat {
            let sample = match self.attempt(bench, implementation, size, attempts) {
                Ok(sample) => sample,
                Err(err) if policy == FailurePolicy::Skip => {
                    warn!(
                        benchmark = %bench.name,
                        %implementation,
                        n = size_arg(size),
                        error = %err,
                        "trial failed, recording as missing"
                    );
                    Sample::missing()
                }
                Err(err) => return Err(err),
            };
            samples.push(sample);
        }
        Ok(samples)
    }

    fn attempt(
        &mut self,
        bench: &BenchmarkDef,
        implementation: &Implementation,
        size: f64,
        attempts: usize,
    ) -> Result<Sample, SweepError> {
        let mut remaining = attempts;
        loop {
            remaining -= 1;
            match self.trial(bench, implementation, size) {
                Ok(sample) => return Ok(sample),
                Err(err) if remaining > 0 => {
                    warn!(
                        benchmark = %bench.name,
                        %implementation,
                        n = size_arg(size),
                        error = %err,
                        remaining,
                        "trial failed, retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One timed process run.
    fn trial(
        &mut self,
        bench: &BenchmarkDef,
        implementation: &Implementation,
        size: f64,
    ) -> Result<Sample, SweepError> {
        let config = self.config;
        let commands = &config.commands;
        let command = match implementation {
            Implementation::Compiled => compiled_run_command(commands, bench, size),
            Implementation::Scripted(lib) => scripted_run_command(commands, bench, lib, size),
        };

        let output = self.runner.run(&command)?;
        if !output.success() {
            return Err(SweepError::RunFailed {
                implementation: implementation.to_string(),
                benchmark: bench.name.clone(),
                size: size_arg(size),
                stderr: output.stderr,
            });
        }

        let mut sample = parse_time_report(&output.stderr);
        if *implementation == Implementation::Compiled {
            let offset = extract_build_time(&output.stderr)?;
            sample.elapsed_secs = sample.elapsed_secs.map(|secs| secs - offset);
            if let Some(corrected) = sample.elapsed_secs.filter(|secs| *secs <= 0.0) {
                warn!(
                    benchmark = %bench.name,
                    n = size_arg(size),
                    offset,
                    corrected,
                    "build offset exceeds elapsed time; point will not be charted"
                );
            }
        }

        if sample.elapsed_secs.is_none() {
            warn!(benchmark = %bench.name, %implementation, "no elapsed time in timing report");
        }
        if sample.memory_mb.is_none() {
            warn!(benchmark = %bench.name, %implementation, "no peak memory in timing report");
        }
        debug!(?sample, "sample");

        Ok(sample)
    }
}
