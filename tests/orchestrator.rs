use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use video_downloader_lib::downloader::{
    AudioCodec, DownloadConfiguration, DownloadError, DownloadOutcome, DownloadRequest, Downloader,
    MediaBackend, MediaEntry, MediaInfo, ProgressEvent, ProgressObserver, ProgressSink,
    ProgressStatus, ProgressUpdate, RunState,
};

/// What a scripted download call does
struct ScriptedDownload {
    events: Vec<ProgressEvent>,
    result: Result<MediaInfo, DownloadError>,
}

#[derive(Default)]
struct Calls {
    probes: usize,
    downloads: usize,
    codecs: Vec<Option<AudioCodec>>,
    extensions: Vec<String>,
}

#[derive(Clone, Default)]
struct FakeBackend {
    probe_result: Arc<Mutex<Option<Result<MediaInfo, DownloadError>>>>,
    downloads: Arc<Mutex<VecDeque<ScriptedDownload>>>,
    calls: Arc<Mutex<Calls>>,
}

impl FakeBackend {
    fn probing(self, result: Result<MediaInfo, DownloadError>) -> Self {
        *self.probe_result.lock().unwrap() = Some(result);
        self
    }

    fn then_download(self, events: Vec<ProgressEvent>, result: Result<MediaInfo, DownloadError>) -> Self {
        self.downloads
            .lock()
            .unwrap()
            .push_back(ScriptedDownload { events, result });
        self
    }

    fn probes(&self) -> usize {
        self.calls.lock().unwrap().probes
    }

    fn downloads(&self) -> usize {
        self.calls.lock().unwrap().downloads
    }
}

#[async_trait]
impl MediaBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn probe(&self, _config: &DownloadConfiguration) -> Result<MediaInfo, DownloadError> {
        self.calls.lock().unwrap().probes += 1;
        self.probe_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(single("Clip")))
    }

    async fn download(
        &self,
        config: &DownloadConfiguration,
        observer: &mut (dyn ProgressObserver + Send),
    ) -> Result<MediaInfo, DownloadError> {
        {
            let mut calls = self.calls.lock().unwrap();
            calls.downloads += 1;
            calls.codecs.push(config.audio_codec());
            calls.extensions.push(config.file_extension().to_string());
        }
        let scripted = self
            .downloads
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected download call");
        for event in scripted.events {
            observer.on_progress(event);
        }
        scripted.result
    }
}

#[derive(Default)]
struct Recorder(Mutex<Vec<ProgressUpdate>>);

impl ProgressSink for Recorder {
    fn report(&self, update: ProgressUpdate) {
        self.0.lock().unwrap().push(update);
    }
}

impl Recorder {
    fn updates(&self) -> Vec<ProgressUpdate> {
        self.0.lock().unwrap().clone()
    }
}

fn single(title: &str) -> MediaInfo {
    MediaInfo {
        title: Some(title.to_string()),
        ext: Some("webm".to_string()),
        entries: None,
    }
}

fn entry(title: &str) -> Option<MediaEntry> {
    Some(MediaEntry {
        id: Some(title.to_lowercase()),
        title: Some(title.to_string()),
        ext: Some("webm".to_string()),
    })
}

fn downloading(done: u64, total: u64, file: &str) -> ProgressEvent {
    ProgressEvent {
        status: ProgressStatus::Downloading,
        downloaded_bytes: Some(done),
        total_bytes: Some(total),
        filename: Some(file.to_string()),
    }
}

fn finished(file: &str) -> ProgressEvent {
    ProgressEvent {
        status: ProgressStatus::Finished,
        downloaded_bytes: None,
        total_bytes: None,
        filename: Some(file.to_string()),
    }
}

fn downloader(backend: &FakeBackend, dir: &tempfile::TempDir) -> Downloader {
    Downloader::new(Box::new(backend.clone()), dir.path().join("downloads"))
        .with_audio_codec(AudioCodec::Mp3)
}

#[tokio::test]
async fn empty_url_fails_without_touching_backend() {
    let tmp = tempfile::tempdir().unwrap();
    let backend = FakeBackend::default();
    let sink = Recorder::default();

    let (outcome, run) = downloader(&backend, &tmp)
        .download_traced(&DownloadRequest::new("", None, false), &sink)
        .await;

    assert_eq!(
        outcome,
        DownloadOutcome::Failure {
            error_text: "Error: Please enter a URL".to_string()
        }
    );
    assert_eq!(backend.probes(), 0);
    assert_eq!(backend.downloads(), 0);
    assert_eq!(run.history(), &[RunState::Idle, RunState::Failed]);
    assert!(sink.updates().is_empty());
}

#[tokio::test]
async fn single_video_success() {
    let tmp = tempfile::tempdir().unwrap();
    let file = "Clip.f137.mp4";
    let backend = FakeBackend::default().then_download(
        vec![
            downloading(10, 100, file),
            downloading(60, 100, file),
            downloading(100, 100, file),
            finished(file),
        ],
        Ok(single("Clip")),
    );
    let sink = Recorder::default();
    let dl = downloader(&backend, &tmp);

    let (outcome, run) = dl
        .download_traced(
            &DownloadRequest::new("https://www.youtube.com/watch?v=abc", None, false),
            &sink,
        )
        .await;

    let expected_path = tmp.path().join("downloads").join("Clip.mp4");
    assert_eq!(
        outcome,
        DownloadOutcome::Success {
            summary_text: format!("Downloaded to: {}", expected_path.display()),
            notification_text: "Download complete!".to_string(),
        }
    );
    assert!(tmp.path().join("downloads").is_dir());
    assert_eq!(
        run.history(),
        &[
            RunState::Idle,
            RunState::Probing,
            RunState::Downloading,
            RunState::Formatting,
            RunState::Done
        ]
    );

    let updates = sink.updates();
    let fractions: Vec<f64> = updates.iter().filter_map(|u| u.fraction).collect();
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]), "{:?}", fractions);

    // last byte-level update before the closing message is a full bar
    let before_last = &updates[updates.len() - 2];
    assert_eq!(before_last.fraction, Some(1.0));
    assert_eq!(before_last.label, "Download complete, processing file...");
    assert_eq!(updates.last().unwrap().label, "Download complete!");
}

#[tokio::test]
async fn audio_conversion_failure_retries_with_fallback_codec() {
    let tmp = tempfile::tempdir().unwrap();
    let backend = FakeBackend::default()
        .then_download(
            vec![],
            Err(DownloadError::classify_download(
                "ERROR: Postprocessing: audio conversion failed: Unknown encoder 'libmp3lame'",
            )),
        )
        .then_download(vec![finished("Clip.webm")], Ok(single("Clip")));
    let sink = Recorder::default();

    let (outcome, run) = downloader(&backend, &tmp)
        .download_traced(
            &DownloadRequest::new("https://www.youtube.com/watch?v=abc", None, true),
            &sink,
        )
        .await;

    let DownloadOutcome::Success { summary_text, .. } = &outcome else {
        panic!("expected success, got {:?}", outcome);
    };
    assert!(summary_text.contains("Clip.m4a"), "{}", summary_text);
    assert!(summary_text.ends_with("\nNote: Using M4A format instead of MP3 for better compatibility"));

    assert_eq!(backend.probes(), 2);
    assert_eq!(backend.downloads(), 2);
    let calls = backend.calls.lock().unwrap();
    assert_eq!(calls.codecs[0], Some(AudioCodec::Mp3));
    assert_eq!(calls.codecs[1], Some(AudioCodec::M4a));
    assert_eq!(calls.extensions[1], "m4a");

    assert_eq!(
        run.history(),
        &[
            RunState::Idle,
            RunState::Probing,
            RunState::Downloading,
            RunState::Probing,
            RunState::Downloading,
            RunState::Formatting,
            RunState::Done
        ]
    );
    assert!(sink
        .updates()
        .iter()
        .any(|u| u.label.contains("conversion failed, trying M4A format instead")));
}

#[tokio::test]
async fn second_audio_failure_is_terminal() {
    let tmp = tempfile::tempdir().unwrap();
    let backend = FakeBackend::default()
        .then_download(vec![], Err(DownloadError::classify_download("ERROR: mp3 encoder not found")))
        .then_download(vec![], Err(DownloadError::classify_download("ERROR: Postprocessor failed again")));
    let sink = Recorder::default();

    let (outcome, run) = downloader(&backend, &tmp)
        .download_traced(
            &DownloadRequest::new("https://www.youtube.com/watch?v=abc", None, true),
            &sink,
        )
        .await;

    assert_eq!(
        outcome,
        DownloadOutcome::Failure {
            error_text: "Error: ERROR: Postprocessor failed again".to_string()
        }
    );
    assert_eq!(backend.downloads(), 2);
    assert_eq!(run.state(), RunState::Failed);
}

#[tokio::test]
async fn no_retry_when_already_on_fallback_codec() {
    let tmp = tempfile::tempdir().unwrap();
    let backend = FakeBackend::default().then_download(
        vec![],
        Err(DownloadError::classify_download("ERROR: Postprocessing: audio conversion failed")),
    );
    let sink = Recorder::default();

    let (outcome, run) = downloader(&backend, &tmp)
        .with_audio_codec(AudioCodec::M4a)
        .download_traced(
            &DownloadRequest::new("https://www.youtube.com/watch?v=abc", None, true),
            &sink,
        )
        .await;

    assert_eq!(
        outcome.text(),
        "Error: ERROR: Postprocessing: audio conversion failed"
    );
    assert_eq!(backend.probes(), 1);
    assert_eq!(backend.downloads(), 1);
    assert_eq!(backend.calls.lock().unwrap().codecs, vec![Some(AudioCodec::M4a)]);
    assert_eq!(
        run.history(),
        &[
            RunState::Idle,
            RunState::Probing,
            RunState::Downloading,
            RunState::Failed
        ]
    );
    assert!(!sink
        .updates()
        .iter()
        .any(|u| u.label.contains("trying M4A format instead")));
}

#[tokio::test]
async fn other_failures_are_not_retried() {
    let tmp = tempfile::tempdir().unwrap();
    let backend = FakeBackend::default().then_download(
        vec![],
        Err(DownloadError::classify_download("ERROR: HTTP Error 403: Forbidden")),
    );
    let sink = Recorder::default();

    let outcome = downloader(&backend, &tmp)
        .download(
            &DownloadRequest::new("https://www.youtube.com/watch?v=abc", None, true),
            &sink,
        )
        .await;

    assert_eq!(outcome.text(), "Error: ERROR: HTTP Error 403: Forbidden");
    assert_eq!(backend.downloads(), 1);
}

#[tokio::test]
async fn video_runs_never_demote() {
    let tmp = tempfile::tempdir().unwrap();
    let error = DownloadError::classify_download("ERROR: Postprocessor: audio conversion failed");
    assert!(error.is_audio_conversion_failure());
    let backend = FakeBackend::default().then_download(vec![], Err(error));
    let sink = Recorder::default();

    let outcome = downloader(&backend, &tmp)
        .download(
            &DownloadRequest::new("https://www.youtube.com/watch?v=abc", None, false),
            &sink,
        )
        .await;

    assert!(!outcome.is_success());
    assert_eq!(backend.downloads(), 1);
}

#[tokio::test]
async fn playlist_with_inaccessible_entry() {
    let tmp = tempfile::tempdir().unwrap();
    let playlist = MediaInfo {
        title: Some("Mix".to_string()),
        ext: None,
        entries: Some(vec![entry("One"), None, entry("Three")]),
    };
    let backend = FakeBackend::default()
        .probing(Ok(playlist.clone()))
        .then_download(
            vec![
                downloading(50, 100, "One.webm"),
                finished("One.webm"),
                downloading(50, 100, "Three.webm"),
                finished("Three.webm"),
            ],
            Ok(playlist),
        );
    let sink = Recorder::default();

    let outcome = downloader(&backend, &tmp)
        .download(
            &DownloadRequest::new("https://www.youtube.com/playlist?list=PL1", None, false),
            &sink,
        )
        .await;

    let DownloadOutcome::Success {
        summary_text,
        notification_text,
    } = &outcome
    else {
        panic!("expected success, got {:?}", outcome);
    };
    assert!(summary_text.contains("Number of videos: 2 (downloaded) / 3 (total)"));
    assert_eq!(summary_text.matches("skipped]").count(), 1);
    assert_eq!(
        notification_text,
        "Download complete! 2 videos downloaded, 1 skipped."
    );

    let updates = sink.updates();
    assert!(updates
        .iter()
        .any(|u| u.label == "Processing YouTube playlist - this may take longer..."));
    assert!(updates
        .iter()
        .any(|u| u.label == "Found 2 available items in playlist. Starting downloads..."));

    let item_updates: Vec<&ProgressUpdate> = updates
        .iter()
        .filter(|u| u.label.starts_with("Item "))
        .collect();
    assert_eq!(item_updates[0].fraction, Some(0.25));
    assert_eq!(item_updates[0].label, "Item 1/2: Downloading: One.webm");
    assert_eq!(item_updates[1].fraction, Some(0.5));
    assert_eq!(item_updates[2].fraction, Some(0.75));
    assert_eq!(item_updates[2].label, "Item 2/2: Downloading: Three.webm");
    assert_eq!(item_updates[3].fraction, Some(1.0));
}

#[tokio::test]
async fn metadata_failure_on_showcase_adds_password_hint() {
    let tmp = tempfile::tempdir().unwrap();
    let backend = FakeBackend::default().probing(Err(DownloadError::Probe(
        "ERROR: [vimeo] This video is protected by a password".to_string(),
    )));
    let sink = Recorder::default();

    let (outcome, run) = downloader(&backend, &tmp)
        .download_traced(
            &DownloadRequest::new("https://vimeo.com/showcase/123", Some("wrong".to_string()), false),
            &sink,
        )
        .await;

    let text = outcome.text();
    assert!(text.starts_with("Error: Failed to read media information: "));
    assert!(text.contains("some videos might be unavailable or restricted"));
    assert!(text.contains("correct password"));
    assert!(!text.contains("wrong"));
    assert_eq!(outcome.notification(), "Download failed. See details in the result box.");
    assert_eq!(backend.downloads(), 0);
    assert_eq!(
        run.history(),
        &[RunState::Idle, RunState::Probing, RunState::Failed]
    );
}
