//! BabelDOC command-line pipeline.
//!
//! Each job runs one `babeldoc` process. Both supported providers speak the
//! OpenAI-compatible protocol, so they are passed through BabelDOC's
//! `--openai*` options with the resolved endpoint and model; the key is
//! handed over in the child's environment.
//!
//! The process runs in its own process group so that workers it starts are
//! terminated with it.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use super::{tail, Pipeline, PipelineError, PipelineRun};
use crate::config::PipelineConfig;
use crate::models::TranslationJob;

const CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to keep reading output once the process has exited or been killed
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Environment variable BabelDOC's OpenAI-compatible client reads the key from
const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Runs the `babeldoc` executable as a child process
#[derive(Debug, Clone)]
pub struct BabeldocCli {
    executable: PathBuf,
    extra_args: Vec<String>,
    job_timeout: Option<Duration>,
    diagnostics_max_bytes: usize,
    key_on_command_line: bool,
}

impl BabeldocCli {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            extra_args: config.extra_args.clone(),
            job_timeout: config.job_timeout(),
            diagnostics_max_bytes: config.diagnostics_max_bytes,
            key_on_command_line: config.key_on_command_line,
        }
    }

    /// Path or name of the executable
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Command-line arguments for a job
    pub fn build_args(&self, job: &TranslationJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.extra_args.iter().map(OsString::from).collect();

        args.push("--files".into());
        args.push(job.input_file.clone().into_os_string());
        args.push("--output".into());
        args.push(job.output_dir.clone().into_os_string());
        args.push("--lang-in".into());
        args.push(job.lang_in.clone().into());
        args.push("--lang-out".into());
        args.push(job.lang_out.clone().into());
        args.push("--qps".into());
        args.push(job.qps.to_string().into());

        args.push("--openai".into());
        args.push("--openai-model".into());
        args.push(job.provider.model.clone().into());
        args.push("--openai-base-url".into());
        args.push(job.provider.base_url.clone().into());
        if self.key_on_command_line {
            args.push("--openai-api-key".into());
            args.push(job.provider.api_key().into());
        }

        if !job.pages.is_all() {
            args.push("--pages".into());
            args.push(job.pages.to_string().into());
        }
        if !job.outputs.contains(crate::models::OutputModes::DUAL) {
            args.push("--no-dual".into());
        }
        if !job.outputs.contains(crate::models::OutputModes::MONO) {
            args.push("--no-mono".into());
        }

        let watermark_mode = if job.watermark {
            "watermarked"
        } else {
            "no_watermark"
        };
        args.push("--watermark-output-mode".into());
        args.push(watermark_mode.into());

        args
    }

    /// Arguments rendered for logging, with the credential masked
    fn describe_args(args: &[OsString]) -> String {
        let mut out = Vec::with_capacity(args.len());
        let mut mask_next = false;
        for arg in args {
            if mask_next {
                out.push("***".to_string());
                mask_next = false;
                continue;
            }
            let arg = arg.to_string_lossy();
            mask_next = arg == "--openai-api-key";
            out.push(arg.into_owned());
        }
        out.join(" ")
    }

    fn command(&self, args: &[OsString]) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    fn spawn(&self, mut cmd: Command) -> Result<Child, PipelineError> {
        cmd.spawn().map_err(|e| {
            PipelineError::Launch(format!("{}: {}", self.executable.display(), e))
        })
    }

    fn diagnostics(&self, stdout: &[u8], stderr: &[u8]) -> String {
        let stdout = String::from_utf8_lossy(stdout);
        let stderr = String::from_utf8_lossy(stderr);
        let combined = [stderr.trim(), stdout.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        tail(&combined, self.diagnostics_max_bytes)
    }
}

#[async_trait]
impl Pipeline for BabeldocCli {
    fn name(&self) -> &str {
        "babeldoc"
    }

    async fn probe_page_count(&self, input: &Path) -> Result<u32, PipelineError> {
        let path = input.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || {
            lopdf::Document::load(&path).map(|doc| doc.get_pages().len())
        })
        .await
        .map_err(|e| PipelineError::Probe(format!("probe task failed: {}", e)))?
        .map_err(|e| PipelineError::Probe(e.to_string()))?;

        if pages == 0 {
            return Err(PipelineError::Probe("document has no pages".to_string()));
        }
        u32::try_from(pages).map_err(|_| PipelineError::Probe(format!("{} pages", pages)))
    }

    async fn run(&self, job: &TranslationJob) -> Result<PipelineRun, PipelineError> {
        let args = self.build_args(job);
        tracing::info!(
            executable = %self.executable.display(),
            args = %Self::describe_args(&args),
            "Launching translation pipeline"
        );

        let mut cmd = self.command(&args);
        cmd.env(API_KEY_ENV, job.provider.api_key());
        let mut child = self.spawn(cmd)?;
        let pid = child.id();
        let stdout = Capture::start(child.stdout.take());
        let stderr = Capture::start(child.stderr.take());

        let status = match self.job_timeout {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, child.wait()).await;
                match waited {
                    Ok(status) => Some(status),
                    Err(_) => {
                        tracing::warn!("Translation pipeline timed out after {:?}", limit);
                        kill_process_group(pid);
                        if let Err(e) = child.kill().await {
                            tracing::warn!("Failed to kill timed-out pipeline: {}", e);
                        }
                        None
                    }
                }
            }
            None => Some(child.wait().await),
        };
        // Leftover workers would keep the output pipes open
        kill_process_group(pid);

        let stdout = stdout.finish().await;
        let stderr = stderr.finish().await;
        let diagnostics = self.diagnostics(&stdout, &stderr);

        let status: ExitStatus = match status {
            Some(status) => status.map_err(|e| {
                PipelineError::Launch(format!("waiting for pipeline failed: {}", e))
            })?,
            None => {
                return Err(PipelineError::TimedOut {
                    after: self.job_timeout.unwrap_or_default(),
                    diagnostics,
                })
            }
        };

        if !status.success() {
            tracing::warn!(%status, "Translation pipeline failed");
            return Err(PipelineError::Failed {
                status: status.to_string(),
                diagnostics,
            });
        }

        tracing::debug!("Translation pipeline exited successfully");
        Ok(PipelineRun { diagnostics })
    }

    async fn check(&self) -> Result<String, PipelineError> {
        let mut child = self.spawn(self.command(&["--version".into()]))?;
        let pid = child.id();
        let stdout = Capture::start(child.stdout.take());
        let stderr = Capture::start(child.stderr.take());

        let waited = tokio::time::timeout(CHECK_TIMEOUT, child.wait()).await;
        kill_process_group(pid);
        let status = waited
            .map_err(|_| PipelineError::TimedOut {
                after: CHECK_TIMEOUT,
                diagnostics: String::new(),
            })?
            .map_err(|e| PipelineError::Launch(e.to_string()))?;

        let stdout = stdout.finish().await;
        let stderr = stderr.finish().await;
        if !status.success() {
            return Err(PipelineError::Failed {
                status: status.to_string(),
                diagnostics: self.diagnostics(&stdout, &stderr),
            });
        }

        let version = String::from_utf8_lossy(&stdout).trim().to_string();
        if version.is_empty() {
            Ok(String::from_utf8_lossy(&stderr).trim().to_string())
        } else {
            Ok(version)
        }
    }
}

/// Output of one child pipe, read on a separate task so a chatty process
/// cannot block on a full pipe buffer.
struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl Capture {
    fn start<R>(reader: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = buf.clone();
        let task = tokio::spawn(async move {
            let Some(mut reader) = reader else {
                return;
            };
            let mut chunk = [0u8; 8192];
            loop {
                match reader.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if let Ok(mut buf) = sink.lock() {
                            buf.extend_from_slice(&chunk[..n]);
                        }
                    }
                    Err(e) => {
                        tracing::debug!("Error reading pipeline output: {}", e);
                        break;
                    }
                }
            }
        });
        Self { buf, task }
    }

    /// Wait briefly for end of output, then keep whatever was read
    async fn finish(self) -> Vec<u8> {
        let Self { buf, mut task } = self;
        if tokio::time::timeout(DRAIN_GRACE, &mut task).await.is_err() {
            tracing::debug!("Pipeline output still open after exit; abandoning the rest");
            task.abort();
        }
        buf.lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }
}

/// Kill every process left in the pipeline's process group
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::debug!("Failed to kill pipeline process group {}: {}", pid, e),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OutputModes, PageSelector};
    use crate::providers::{ProviderConfig, ProviderKind};

    fn job(outputs: OutputModes, pages: PageSelector, watermark: bool) -> TranslationJob {
        TranslationJob {
            input_file: PathBuf::from("/docs/paper.pdf"),
            output_dir: PathBuf::from("/docs/out"),
            lang_in: "en".to_string(),
            lang_out: "zh".to_string(),
            pages,
            page_count: 12,
            provider: ProviderConfig::new(
                ProviderKind::OpenRouter,
                "sk-secret",
                "https://openrouter.ai/api/v1",
                "google/gemini-2.5-flash",
                4,
            )
            .unwrap(),
            outputs,
            watermark,
            qps: 6,
            admission_timeout: None,
        }
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_build_args_full_job() {
        let cli = BabeldocCli::new(&PipelineConfig::default());
        let args = strings(&cli.build_args(&job(OutputModes::all(), PageSelector::All, true)));

        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("--files") + 1], "/docs/paper.pdf");
        assert_eq!(args[pos("--output") + 1], "/docs/out");
        assert_eq!(args[pos("--lang-out") + 1], "zh");
        assert_eq!(args[pos("--qps") + 1], "6");
        assert_eq!(args[pos("--openai-model") + 1], "google/gemini-2.5-flash");
        assert_eq!(args[pos("--watermark-output-mode") + 1], "watermarked");
        assert!(!args.contains(&"--pages".to_string()));
        assert!(!args.contains(&"--no-dual".to_string()));
        assert!(!args.contains(&"--no-mono".to_string()));
    }

    #[test]
    fn test_build_args_selected_pages_single_output() {
        let config = PipelineConfig {
            extra_args: vec!["--debug".to_string()],
            ..Default::default()
        };
        let cli = BabeldocCli::new(&config);
        let pages = PageSelector::parse("1-3", 12).unwrap();
        let args = strings(&cli.build_args(&job(OutputModes::DUAL, pages, false)));

        assert_eq!(args[0], "--debug");
        let pos = args.iter().position(|a| a == "--pages").unwrap();
        assert_eq!(args[pos + 1], "1-3");
        assert!(args.contains(&"--no-mono".to_string()));
        assert!(!args.contains(&"--no-dual".to_string()));
        assert!(args.contains(&"no_watermark".to_string()));
    }

    #[test]
    fn test_key_kept_off_command_line() {
        let cli = BabeldocCli::new(&PipelineConfig::default());
        let args = strings(&cli.build_args(&job(OutputModes::all(), PageSelector::All, true)));
        assert!(!args.contains(&"--openai-api-key".to_string()));
        assert!(!args.iter().any(|a| a.contains("sk-secret")));
    }

    #[test]
    fn test_describe_args_masks_key() {
        let config = PipelineConfig {
            key_on_command_line: true,
            ..Default::default()
        };
        let cli = BabeldocCli::new(&config);
        let args = cli.build_args(&job(OutputModes::all(), PageSelector::All, true));
        let described = BabeldocCli::describe_args(&args);
        assert!(!described.contains("sk-secret"));
        assert!(described.contains("--openai-api-key ***"));
    }

    #[cfg(unix)]
    fn shell(script: &str, job_timeout_seconds: u64) -> BabeldocCli {
        BabeldocCli::new(&PipelineConfig {
            executable: PathBuf::from("/bin/sh"),
            extra_args: vec!["-c".to_string(), script.to_string()],
            job_timeout_seconds,
            ..Default::default()
        })
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_key_passed_in_environment() {
        let cli = shell(r#"printf %s "$OPENAI_API_KEY""#, 0);
        let run = cli
            .run(&job(OutputModes::all(), PageSelector::All, true))
            .await
            .unwrap();
        assert_eq!(run.diagnostics, "sk-secret");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_background_workers() {
        let cli = shell("echo started; sleep 20 & sleep 20", 1);
        let started = std::time::Instant::now();
        let result = tokio::time::timeout(
            Duration::from_secs(6),
            cli.run(&job(OutputModes::all(), PageSelector::All, true)),
        )
        .await
        .expect("run should return soon after the job timeout");

        match result {
            Err(PipelineError::TimedOut { after, diagnostics }) => {
                assert_eq!(after, Duration::from_secs(1));
                assert!(diagnostics.contains("started"));
            }
            other => panic!("expected a timeout, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(6));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_not_held_up_by_background_workers() {
        let cli = shell("echo done; sleep 20 &", 0);
        let run = tokio::time::timeout(
            Duration::from_secs(6),
            cli.run(&job(OutputModes::all(), PageSelector::All, true)),
        )
        .await
        .expect("run should return once the pipeline exits")
        .unwrap();
        assert_eq!(run.diagnostics, "done");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_exit_keeps_diagnostics() {
        let cli = shell("echo 'quota exceeded' >&2; exit 3", 0);
        let err = cli
            .run(&job(OutputModes::all(), PageSelector::All, true))
            .await
            .unwrap_err();
        match err {
            PipelineError::Failed { diagnostics, .. } => {
                assert!(diagnostics.contains("quota exceeded"))
            }
            other => panic!("expected a failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_executable_is_launch_error() {
        let config = PipelineConfig {
            executable: PathBuf::from("/nonexistent/babeldoc-for-tests"),
            ..Default::default()
        };
        let cli = BabeldocCli::new(&config);
        let err = cli
            .run(&job(OutputModes::all(), PageSelector::All, true))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Launch(_)));
        assert_eq!(err.into_bridge_error().kind(), "DispatchError");

        assert!(matches!(cli.check().await, Err(PipelineError::Launch(_))));
    }

    #[tokio::test]
    async fn test_probe_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();

        let cli = BabeldocCli::new(&PipelineConfig::default());
        let err = cli.probe_page_count(&path).await.unwrap_err();
        assert!(matches!(err, PipelineError::Probe(_)));
    }
}
