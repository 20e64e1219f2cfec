use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as TokioCommand;

use log::{debug, info};

use crate::downloader::config::{DownloadConfiguration, PostProcessor};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{MediaInfo, NetworkConfig};
use crate::downloader::progress::{ProgressEvent, ProgressStatus};
use crate::downloader::traits::{MediaBackend, ProgressObserver};
use crate::downloader::utils::{
    error_summary, get_proxy_args, get_timeout_args, last_json_line, run_output_with_timeout,
    RunError,
};

/// Prefix of the machine-readable progress lines we ask yt-dlp to print
pub const PROGRESS_MARKER: &str = "[ytdl-progress] ";

/// Filename goes last: it is the only field that may contain `|`
const PROGRESS_TEMPLATE: &str = "download:[ytdl-progress] %(progress.status)s|%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.filename)s";

const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 300;

/// Drives the `yt-dlp` executable
pub struct YtDlpBackend {
    ytdlp_bin: String,
    network: NetworkConfig,
    ffmpeg_location: Option<String>,
    probe_timeout_secs: u64,
}

impl YtDlpBackend {
    pub fn new(ytdlp_bin: impl Into<String>) -> Self {
        Self {
            ytdlp_bin: ytdlp_bin.into(),
            network: NetworkConfig::default(),
            ffmpeg_location: None,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
        }
    }

    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    pub fn with_ffmpeg_location(mut self, location: Option<String>) -> Self {
        self.ffmpeg_location = location;
        self
    }

    pub fn with_probe_timeout(mut self, seconds: u64) -> Self {
        self.probe_timeout_secs = seconds;
        self
    }

    /// Arguments common to probe and download
    fn shared_args(&self, config: &DownloadConfiguration) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(password) = config.password() {
            args.push("--video-password".to_string());
            args.push(password.expose().to_string());
        }

        // Skip private or unavailable items instead of aborting the playlist
        if config.ignore_errors() {
            args.push("--ignore-errors".to_string());
        }

        args.extend(get_proxy_args(&self.network));
        args.extend(get_timeout_args(&self.network));

        if let Some(location) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(location.clone());
        }

        args
    }

    pub fn probe_args(&self, config: &DownloadConfiguration) -> Vec<String> {
        let mut args = vec!["--dump-single-json".to_string(), "--no-warnings".to_string()];
        args.extend(self.shared_args(config));
        args.push("--".to_string());
        args.push(config.url().to_string());
        args
    }

    pub fn download_args(&self, config: &DownloadConfiguration) -> Vec<String> {
        let mut args = vec![
            "--newline".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
            "--dump-single-json".to_string(),
            "--no-simulate".to_string(),
            "-f".to_string(),
            config.format_selector().to_string(),
            "-o".to_string(),
            config.output_template(),
        ];

        if let Some(format) = config.merge_output_format() {
            args.push("--merge-output-format".to_string());
            args.push(format.to_string());
        }

        for pp in config.post_processors() {
            args.extend(post_processor_args(pp));
        }

        if config.verbose() {
            args.push("--verbose".to_string());
        }

        args.extend(self.shared_args(config));
        args.push("--".to_string());
        args.push(config.url().to_string());
        args
    }

    fn spawn_error(&self, e: std::io::Error) -> DownloadError {
        if e.kind() == std::io::ErrorKind::NotFound {
            DownloadError::ToolNotFound(format!("{}: {}", self.ytdlp_bin, e))
        } else {
            DownloadError::Io(format!("Failed to start {}: {}", self.ytdlp_bin, e))
        }
    }
}

#[async_trait]
impl MediaBackend for YtDlpBackend {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn probe(&self, config: &DownloadConfiguration) -> Result<MediaInfo, DownloadError> {
        let args = self.probe_args(config);
        debug!("[yt-dlp] probe: {} ({} args)", config.url(), args.len());

        let output = run_output_with_timeout(&self.ytdlp_bin, &args, self.probe_timeout_secs)
            .await
            .map_err(|e| match e {
                RunError::Spawn { source, .. } => self.spawn_error(source),
                RunError::Timeout(secs) => {
                    DownloadError::Probe(format!("Timed out after {}s", secs))
                }
                RunError::Io(msg) => DownloadError::Io(msg),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        // Playlists with skipped entries exit non-zero but still print metadata
        match last_json_line(&stdout) {
            Some(doc) if output.status.success() || config.ignore_errors() => parse_media_info(doc),
            _ => Err(DownloadError::Probe(error_summary(&stderr).unwrap_or_else(|| {
                format!("yt-dlp exited with {}", output.status)
            }))),
        }
    }

    async fn download(
        &self,
        config: &DownloadConfiguration,
        observer: &mut (dyn ProgressObserver + Send),
    ) -> Result<MediaInfo, DownloadError> {
        let args = self.download_args(config);
        info!(
            "[yt-dlp] downloading {} into {}",
            config.url(),
            config.output_dir().display()
        );

        let mut child = TokioCommand::new(&self.ytdlp_bin)
            .args(&args)
            .env("PYTHONIOENCODING", "UTF-8")
            .env("PYTHONUTF8", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::Io("Failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::Io("Failed to capture stderr".to_string()))?;

        // Raw bytes, not `lines()`: yt-dlp may emit non-UTF-8 filenames and
        // a pipe must keep draining until EOF or the child blocks on write.
        let mut out_reader = BufReader::new(stdout);
        let mut err_reader = BufReader::new(stderr);
        let mut out_buf = Vec::new();
        let mut err_buf = Vec::new();
        let mut out_done = false;
        let mut err_done = false;
        let mut stdout_text = String::new();
        let mut stderr_text = String::new();

        // Some yt-dlp builds print progress to stdout, others to stderr.
        while !(out_done && err_done) {
            tokio::select! {
                read = out_reader.read_until(b'\n', &mut out_buf), if !out_done => match read {
                    Ok(0) => out_done = true,
                    Ok(_) => {
                        let line = decode_line(&out_buf);
                        out_buf.clear();
                        route_line(line, observer, &mut stdout_text);
                    }
                    Err(e) => {
                        debug!("[yt-dlp] stdout read failed: {}", e);
                        out_done = true;
                    }
                },
                read = err_reader.read_until(b'\n', &mut err_buf), if !err_done => match read {
                    Ok(0) => err_done = true,
                    Ok(_) => {
                        let line = decode_line(&err_buf);
                        err_buf.clear();
                        if !line.starts_with(PROGRESS_MARKER) {
                            debug!("[yt-dlp] {}", line);
                        }
                        route_line(line, observer, &mut stderr_text);
                    }
                    Err(e) => {
                        debug!("[yt-dlp] stderr read failed: {}", e);
                        err_done = true;
                    }
                },
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| DownloadError::Io(format!("Process error: {}", e)))?;

        match last_json_line(&stdout_text) {
            Some(doc) if status.success() || config.ignore_errors() => parse_media_info(doc),
            _ if status.success() => Err(DownloadError::Parse(
                "yt-dlp finished without printing metadata".to_string(),
            )),
            _ => Err(DownloadError::classify_download(
                error_summary(&stderr_text)
                    .unwrap_or_else(|| format!("yt-dlp exited with {}", status)),
            )),
        }
    }
}

/// One output line without its terminator, invalid UTF-8 replaced
fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}

/// Progress markers go to the observer, everything else is kept as text
fn route_line<O>(line: String, observer: &mut O, text: &mut String)
where
    O: ProgressObserver + ?Sized,
{
    match parse_progress_line(&line) {
        Some(event) => observer.on_progress(event),
        None => {
            text.push_str(&line);
            text.push('\n');
        }
    }
}

/// yt-dlp flags for one post-processing step
pub fn post_processor_args(pp: &PostProcessor) -> Vec<String> {
    match pp {
        PostProcessor::ExtractAudio {
            codec,
            quality_kbps,
        } => vec![
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            codec.as_str().to_string(),
            "--audio-quality".to_string(),
            format!("{}K", quality_kbps),
        ],
        PostProcessor::ConvertVideo { container } => {
            vec!["--recode-video".to_string(), container.clone()]
        }
    }
}

/// Parse a line produced by our progress template:
/// `[ytdl-progress] downloading|1048576|5242880|/path/to/file.mp4`
/// Missing counters come through as `NA`.
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let rest = line.trim_end().strip_prefix(PROGRESS_MARKER)?;
    let mut fields = rest.splitn(4, '|');

    let status = ProgressStatus::parse(fields.next()?);
    let downloaded_bytes = fields.next().and_then(parse_bytes);
    let total_bytes = fields.next().and_then(parse_bytes);
    let filename = fields
        .next()
        .filter(|f| !f.is_empty() && *f != "NA")
        .map(|f| f.to_string());

    Some(ProgressEvent {
        status,
        downloaded_bytes,
        total_bytes,
        filename,
    })
}

fn parse_bytes(field: &str) -> Option<u64> {
    let value: f64 = field.trim().parse().ok()?;
    if value.is_finite() && value >= 0.0 {
        Some(value as u64)
    } else {
        None
    }
}

fn parse_media_info(doc: &str) -> Result<MediaInfo, DownloadError> {
    serde_json::from_str(doc)
        .map_err(|e| DownloadError::Parse(format!("Invalid yt-dlp JSON: {}", e)))
}
