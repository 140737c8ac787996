use std::ffi::OsStr;
use std::process::Stdio;
use std::sync::LazyLock;

use futures::{stream::BoxStream, StreamExt};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout};

use crate::domain::{AppError, DownloadJob};

static PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[download\]\s+([0-9.]+)%").expect("progress pattern is valid")
});

/// Percentage reported by a yt-dlp `[download]` line, if any.
pub fn parse_progress(line: &str) -> Option<f32> {
    PROGRESS_RE
        .captures(line)?
        .get(1)?
        .as_str()
        .parse::<f32>()
        .ok()
}

/// Command with console windows suppressed on Windows and UTF-8 forced for
/// Python based tools.
pub fn command<S: AsRef<OsStr>>(program: S) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    #[cfg(target_os = "windows")]
    cmd.creation_flags(0x08000000);
    cmd.env("PYTHONIOENCODING", "utf-8");
    cmd.env("PYTHONUTF8", "1");
    cmd
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    /// One line of merged stdout/stderr output.
    Line { text: String, progress: Option<f32> },
    /// Terminal event; nothing follows it.
    Exited(Result<(), AppError>),
}

/// Run `job` and stream its output line by line, stderr merged into stdout.
pub fn run_streaming(job: DownloadJob) -> BoxStream<'static, ProcessEvent> {
    futures::stream::unfold(RunnerState::Start(job), |state| async move {
        match state {
            RunnerState::Start(job) => {
                let program = job.program.display().to_string();
                let mut cmd = command(&job.program);
                cmd.args(&job.args)
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .kill_on_drop(true);
                if let Some(dir) = &job.working_dir {
                    cmd.current_dir(dir);
                }

                tracing::debug!("spawning {} {:?}", program, job.args);
                match cmd.spawn() {
                    Ok(mut child) => {
                        let stdout = child.stdout.take().map(LineSource::new);
                        let stderr = child.stderr.take().map(LineSource::new);
                        next_event(child, stdout, stderr).await
                    }
                    Err(e) => {
                        tracing::warn!("failed to spawn {}: {}", program, e);
                        Some((
                            ProcessEvent::Exited(Err(AppError::Spawn {
                                program,
                                reason: e.to_string(),
                            })),
                            RunnerState::Finished,
                        ))
                    }
                }
            }
            RunnerState::Running {
                child,
                stdout,
                stderr,
            } => next_event(child, stdout, stderr).await,
            RunnerState::Finished => None,
        }
    })
    .boxed()
}

enum RunnerState {
    Start(DownloadJob),
    Running {
        child: Child,
        stdout: Option<LineSource<ChildStdout>>,
        stderr: Option<LineSource<ChildStderr>>,
    },
    Finished,
}

async fn next_event(
    mut child: Child,
    mut stdout: Option<LineSource<ChildStdout>>,
    mut stderr: Option<LineSource<ChildStderr>>,
) -> Option<(ProcessEvent, RunnerState)> {
    match next_merged_line(&mut stdout, &mut stderr).await {
        Some(Ok(text)) => {
            let progress = parse_progress(&text);
            Some((
                ProcessEvent::Line { text, progress },
                RunnerState::Running {
                    child,
                    stdout,
                    stderr,
                },
            ))
        }
        Some(Err(e)) => {
            let _ = child.kill().await;
            Some((
                ProcessEvent::Exited(Err(AppError::Io(format!("Read error: {}", e)))),
                RunnerState::Finished,
            ))
        }
        None => {
            let result = match child.wait().await {
                Ok(status) if status.success() => Ok(()),
                Ok(status) => {
                    tracing::info!("child exited with {}", status);
                    Err(AppError::ProcessFailed(status.code()))
                }
                Err(e) => Err(AppError::Io(e.to_string())),
            };
            Some((ProcessEvent::Exited(result), RunnerState::Finished))
        }
    }
}

/// Next line from whichever stream has one ready; `None` once both hit EOF.
async fn next_merged_line(
    stdout: &mut Option<LineSource<ChildStdout>>,
    stderr: &mut Option<LineSource<ChildStderr>>,
) -> Option<std::io::Result<String>> {
    loop {
        let (from_stdout, line) = match (stdout.as_mut(), stderr.as_mut()) {
            (None, None) => return None,
            (Some(out), None) => (true, out.next_line().await),
            (None, Some(err)) => (false, err.next_line().await),
            (Some(out), Some(err)) => tokio::select! {
                line = out.next_line() => (true, line),
                line = err.next_line() => (false, line),
            },
        };

        match line {
            Ok(Some(line)) => return Some(Ok(line)),
            Ok(None) if from_stdout => *stdout = None,
            Ok(None) => *stderr = None,
            Err(e) => return Some(Err(e)),
        }
    }
}

/// Line reader that tolerates invalid UTF-8 and keeps partial reads across
/// `select!` cancellation.
struct LineSource<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineSource<R> {
    fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            buf: Vec::new(),
        }
    }

    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let read = self.reader.read_until(b'\n', &mut self.buf).await?;
        if read == 0 && self.buf.is_empty() {
            return Ok(None);
        }

        let line = String::from_utf8_lossy(&self.buf)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        self.buf.clear();
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::path::PathBuf;

    #[test]
    fn test_parse_progress() {
        assert_eq!(
            parse_progress("[download]  42.5% of ~10.50MiB at 1.23MiB/s ETA 00:05"),
            Some(42.5)
        );
        assert_eq!(parse_progress("[download] 100% of 3.00MiB"), Some(100.0));
        assert_eq!(
            parse_progress("[download] Destination: clip.mp4"),
            None
        );
        assert_eq!(parse_progress("[Merger] Merging formats"), None);
    }

    #[cfg(unix)]
    fn shell_job(script: &str) -> DownloadJob {
        DownloadJob {
            program: PathBuf::from("sh"),
            args: vec![OsString::from("-c"), OsString::from(script)],
            working_dir: None,
            output: PathBuf::from("unused"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_streaming_merges_output() {
        let events: Vec<ProcessEvent> = run_streaming(shell_job(
            "echo '[download]  42.5% of 1MiB'; echo warning 1>&2; printf tail",
        ))
        .collect()
        .await;

        let lines: Vec<&ProcessEvent> = events
            .iter()
            .filter(|e| matches!(e, ProcessEvent::Line { .. }))
            .collect();
        assert_eq!(lines.len(), 3);
        assert!(events.contains(&ProcessEvent::Line {
            text: "[download]  42.5% of 1MiB".to_string(),
            progress: Some(42.5),
        }));
        assert!(events.contains(&ProcessEvent::Line {
            text: "warning".to_string(),
            progress: None,
        }));
        assert!(events.contains(&ProcessEvent::Line {
            text: "tail".to_string(),
            progress: None,
        }));
        assert_eq!(events.last(), Some(&ProcessEvent::Exited(Ok(()))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_streaming_reports_exit_code() {
        let events: Vec<ProcessEvent> = run_streaming(shell_job("exit 3")).collect().await;
        assert_eq!(
            events,
            vec![ProcessEvent::Exited(Err(AppError::ProcessFailed(Some(3))))]
        );
    }

    #[tokio::test]
    async fn test_run_streaming_spawn_failure() {
        let job = DownloadJob {
            program: PathBuf::from("definitely-not-a-real-binary-4f2a"),
            args: Vec::new(),
            working_dir: None,
            output: PathBuf::from("unused"),
        };
        let events: Vec<ProcessEvent> = run_streaming(job).collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            ProcessEvent::Exited(Err(AppError::Spawn { .. }))
        ));
    }
}
