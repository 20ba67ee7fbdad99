//! `yt-dlp` subprocess fetcher.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::thread;

use tracing::{debug, info, warn};

use super::{FetchError, FetchRequest, Fetcher, HookStatus};

/// Marker prefixed to every progress line so it can be told apart from the
/// program's regular output.
const PROGRESS_MARKER: &str = "[fetchcast]";
const PROGRESS_TEMPLATE: &str = "download:[fetchcast] %(progress.status)s|%(progress._percent_str)s|%(progress._speed_str)s|%(progress._eta_str)s";
const STDERR_TAIL_LINES: usize = 5;

pub struct YtDlpFetcher {
    program: String,
}

impl YtDlpFetcher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn build_args(request: &FetchRequest) -> Vec<OsString> {
        let options = &request.options;
        let mut args: Vec<OsString> = vec![
            "--newline".into(),
            "--progress-template".into(),
            PROGRESS_TEMPLATE.into(),
            "-o".into(),
            request.output_template.clone().into_os_string(),
            "--retries".into(),
            options.retries.to_string().into(),
            "--fragment-retries".into(),
            options.fragment_retries.to_string().into(),
            "--socket-timeout".into(),
            options.socket_timeout.as_secs().to_string().into(),
        ];
        if !options.format.is_empty() {
            args.push("-f".into());
            args.push(options.format.clone().into());
        }
        args.push("--".into());
        args.push(request.url.clone().into());
        args
    }
}

/// Parse one stdout line written with [`PROGRESS_TEMPLATE`].
pub fn parse_progress_line(line: &str) -> Option<HookStatus> {
    let rest = line.trim().strip_prefix(PROGRESS_MARKER)?.trim_start();
    let mut fields = rest.split('|').map(str::trim);
    let status = fields.next()?;

    match status {
        "downloading" => {
            let percent = fields.next()?.to_string();
            let speed = fields.next()?.to_string();
            let eta = fields.next()?.to_string();
            Some(HookStatus::Downloading {
                percent,
                speed,
                eta,
            })
        }
        "finished" => Some(HookStatus::Finished),
        _ => None,
    }
}

impl Fetcher for YtDlpFetcher {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn fetch(
        &self,
        request: &FetchRequest,
        hook: &mut dyn FnMut(HookStatus),
    ) -> Result<(), FetchError> {
        info!(url = %request.url, output = %request.output_template.display(), "Starting yt-dlp");

        let mut child = Command::new(&self.program)
            .args(Self::build_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FetchError::Spawn(format!("{}: {e}", self.program)))?;

        // Drain stderr on its own thread so a chatty child cannot block on a
        // full pipe while stdout is being read here.
        let stderr_reader = child.stderr.take().map(|stderr| {
            thread::spawn(move || collect_tail(stderr, STDERR_TAIL_LINES))
        });

        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "Failed to read yt-dlp output");
                        break;
                    }
                };
                match parse_progress_line(&line) {
                    Some(status) => hook(status),
                    None => debug!(output = %line, "yt-dlp"),
                }
            }
        }

        let status = child.wait()?;
        let stderr_tail = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(FetchError::Exited {
                code: status.code(),
                detail: if stderr_tail.is_empty() {
                    "no error output".to_string()
                } else {
                    stderr_tail
                },
            })
        }
    }
}

fn collect_tail(stream: impl Read, keep: usize) -> String {
    let mut tail = VecDeque::with_capacity(keep);
    for line in BufReader::new(stream).lines().map_while(Result::ok) {
        if line.trim().is_empty() {
            continue;
        }
        if tail.len() == keep {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Vec::from(tail).join("\n")
}
