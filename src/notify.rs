use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, multipart};
use tracing::info;

use crate::config::NotifySettings;
use crate::errors::SweepError;
use crate::process::CommandRunner;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct GitInfo {
    pub branch: String,
    pub commit: String,
}

fn git_query<R: CommandRunner + ?Sized>(runner: &mut R, query: &str) -> Result<String, SweepError> {
    let output = runner.run(&format!("git {query}"))?;
    if !output.success() {
        return Err(SweepError::GitQueryFailed {
            query: query.to_string(),
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(output.stdout.replace('\n', ""))
}

/// Current branch name and commit hash of the working directory.
pub fn git_info<R: CommandRunner + ?Sized>(runner: &mut R) -> Result<GitInfo, SweepError> {
    Ok(GitInfo {
        branch: git_query(runner, "rev-parse --abbrev-ref HEAD")?,
        commit: git_query(runner, "rev-parse HEAD")?,
    })
}

pub fn compose_message(git: &GitInfo, commit_url_base: &str) -> String {
    format!(
        "Branch: {} commit: {}/{}",
        git.branch,
        commit_url_base.trim_end_matches('/'),
        git.commit
    )
}

/// Webhook URL from the configured environment variable.
pub fn webhook_url(env: &str) -> Result<String, SweepError> {
    match std::env::var(env) {
        Ok(url) if !url.trim().is_empty() => Ok(url),
        _ => Err(SweepError::WebhookNotConfigured {
            env: env.to_string(),
        }),
    }
}

/// POST `message` and the file at `attachment` as a multipart form.
pub fn upload(url: &str, message: &str, attachment: &Path) -> Result<(), SweepError> {
    let form = multipart::Form::new()
        .text("content", message.to_string())
        .file("file", attachment)
        .map_err(|source| SweepError::AttachmentRead {
            path: attachment.to_path_buf(),
            source,
        })?;

    let client = Client::builder().timeout(UPLOAD_TIMEOUT).build()?;
    let response = client.post(url).multipart(form).send()?;

    let status = response.status();
    if !status.is_success() {
        return Err(SweepError::UploadFailed {
            status: status.as_u16(),
            body: response.text().unwrap_or_default(),
        });
    }
    Ok(())
}

/// Post the chart at `chart` with the current branch and commit.
pub fn notify<R: CommandRunner + ?Sized>(
    runner: &mut R,
    settings: &NotifySettings,
    chart: &Path,
) -> Result<(), SweepError> {
    let git = git_info(runner)?;
    let message = compose_message(&git, &settings.commit_url_base);
    let url = webhook_url(&settings.webhook_env)?;

    upload(&url, &message, chart)?;
    info!(branch = %git.branch, commit = %git.commit, "posted results");
    Ok(())
}
