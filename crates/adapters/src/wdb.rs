// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `WDBDriver`: runs load and cache/analyze commands against the WDB host (§4.4).

use std::process::Output;

use sy_core::{DataInstance, ModelConfig, ProductInstance};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::error::WdbError;

/// Load exit codes that indicate a partial or duplicate load: logged at
/// error level but not raised, because the instance may have loaded
/// successfully in a prior attempt (§6, §9 Open Questions).
const EXIT_PARTIAL_LOAD: i32 = 13;
const EXIT_DUPLICATE_LOAD: i32 = 100;

/// Runs `load_program` and `psql` against a WDB host, locally when the host
/// is `localhost`/`127.0.0.1` and over `ssh user@host` otherwise.
pub struct WdbDriver {
    host: String,
    user: String,
}

impl WdbDriver {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self { host: host.into(), user: user.into() }
    }

    fn is_local(&self) -> bool {
        self.host == "localhost" || self.host == "127.0.0.1"
    }

    /// Strip a `file://` prefix and rewrite `opdata:///<path>` to
    /// `/opdata/<path>`; otherwise pass the URL through unchanged (§4.4).
    pub fn clean_url(url: &str) -> String {
        if let Some(rest) = url.strip_prefix("file://") {
            rest.to_string()
        } else if let Some(rest) = url.strip_prefix("opdata:///") {
            format!("/opdata/{rest}")
        } else {
            url.to_string()
        }
    }

    fn load_argv(&self, di: &DataInstance, model: &ModelConfig) -> Vec<String> {
        let mut argv = vec![
            model.load_program.clone(),
            "--loadPlaceDefinition".to_string(),
            "--dataprovider".to_string(),
            model.data_provider.clone(),
        ];
        if !self.user.is_empty() {
            argv.push("--user".to_string());
            argv.push(self.user.clone());
        }
        if let Some(version) = di.version {
            argv.push("--dataversion".to_string());
            argv.push(version.to_string());
        }
        if let Some(load_config) = &model.load_config {
            argv.push("--configuration".to_string());
            argv.push(load_config.clone());
        }
        argv.push(Self::clean_url(&di.url));
        argv
    }

    /// Single-quote any argv element containing whitespace, escaping
    /// embedded single quotes, then join with spaces into one remote
    /// command string (§4.4).
    fn quote_for_remote_shell(argv: &[String]) -> String {
        argv.iter()
            .map(|element| {
                if element.chars().any(char::is_whitespace) {
                    format!("'{}'", element.replace('\'', "\\'"))
                } else {
                    element.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn build_command(&self, argv: Vec<String>) -> Command {
        if self.is_local() {
            let mut cmd = Command::new(&argv[0]);
            cmd.args(&argv[1..]);
            cmd
        } else {
            let mut cmd = Command::new("ssh");
            cmd.arg(format!("{}@{}", self.user, self.host));
            cmd.arg(Self::quote_for_remote_shell(&argv));
            cmd
        }
    }

    async fn run(&self, argv: Vec<String>) -> Result<Output, WdbError> {
        debug!(command = %argv.join(" "), "executing WDB command");
        self.build_command(argv).output().await.map_err(WdbError::Spawn)
    }

    /// Load a single data instance's file into WDB (§4.4).
    pub async fn load_model_file(
        &self,
        di: &DataInstance,
        model: &ModelConfig,
    ) -> Result<(), WdbError> {
        info!(url = %di.url, "loading file into WDB");
        let argv = self.load_argv(di, model);
        let output = self.run(argv).await?;
        let exit_code = output.status.code().unwrap_or(-1);

        match exit_code {
            0 => {
                info!("WDB load completed");
                Ok(())
            }
            EXIT_PARTIAL_LOAD | EXIT_DUPLICATE_LOAD => {
                error!(exit_code, "WDB load reported partial/duplicate fields; continuing");
                Ok(())
            }
            _ => {
                for line in String::from_utf8_lossy(&output.stderr).lines() {
                    warn!(%line, "WDB load stderr");
                }
                Err(WdbError::LoadFailed { exit_code })
            }
        }
    }

    fn cache_sql(&self, model: &ModelConfig, pi: &ProductInstance) -> String {
        format!(
            "SELECT wci.begin('{user}'); SELECT wci.cacheQuery(array['{data_provider}'], NULL, 'exact {reference_time}', NULL, NULL, NULL, array[-1]); ANALYZE;",
            user = self.user,
            data_provider = model.data_provider,
            reference_time = pi.reference_time.to_rfc3339(),
        )
    }

    /// Cache and analyze a model run on the WDB host (§4.4).
    pub async fn cache_model_run(
        &self,
        pi: &ProductInstance,
        model: &ModelConfig,
    ) -> Result<(), WdbError> {
        use tokio::io::AsyncWriteExt;

        info!(data_provider = %model.data_provider, "updating WDB cache");
        let sql = self.cache_sql(model, pi);
        let argv = vec!["psql".to_string(), "wdb".to_string(), "-U".to_string(), self.user.clone()];
        let mut cmd = self.build_command(argv);
        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());

        let mut child = cmd.spawn().map_err(WdbError::Spawn)?;
        let mut stdin = child.stdin.take().ok_or_else(|| {
            WdbError::Spawn(std::io::Error::other("psql child process has no stdin handle"))
        })?;
        stdin.write_all(sql.as_bytes()).await.map_err(WdbError::Spawn)?;
        drop(stdin);

        let output = child.wait_with_output().await.map_err(WdbError::Spawn)?;
        let exit_code = output.status.code().unwrap_or(-1);
        if exit_code != 0 {
            error!(exit_code, "WDB cache update failed");
            return Err(WdbError::CacheFailed { exit_code });
        }
        info!("WDB cache updated");
        Ok(())
    }
}

#[cfg(test)]
#[path = "wdb_tests.rs"]
mod tests;
