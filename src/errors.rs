use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum SweepError {
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("Build error: {binary}\n{stderr}")]
    BuildFailed { binary: String, stderr: String },

    #[error("Run error: {implementation} on {benchmark} (n = {size})\n{stderr}")]
    RunFailed {
        implementation: String,
        benchmark: String,
        size: u64,
        stderr: String,
    },

    #[error("Build time not found in the provided output:\n{output}")]
    BuildTimeNotFound { output: String },

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {detail}")]
    ConfigParse { path: PathBuf, detail: String },

    #[error("Unknown benchmark '{name}'")]
    UnknownBenchmark { name: String },

    #[error("Failed to write chart to {path}: {source}")]
    ChartWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to render chart: {detail}")]
    ChartRender { detail: String },

    #[error("Failed to attach {path}: {source}")]
    AttachmentRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("`git {query}` failed: {stderr}")]
    GitQueryFailed { query: String, stderr: String },

    #[error("Webhook URL not set. Is ${env} exported?")]
    WebhookNotConfigured { env: String },

    #[error("Webhook upload failed: {0}")]
    Upload(#[from] reqwest::Error),

    #[error("Webhook rejected upload with status {status}: {body}")]
    UploadFailed { status: u16, body: String },
}
