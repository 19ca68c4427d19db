use std::{
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;

use crate::config::beside_executable;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    HandposeEstimator,
    PalmDetector,
}

impl ModelKind {
    pub fn label(&self) -> &'static str {
        match self {
            ModelKind::HandposeEstimator => "handpose estimator",
            ModelKind::PalmDetector => "palm detector",
        }
    }

    fn url(&self) -> &'static str {
        match self {
            ModelKind::HandposeEstimator => HANDPOSE_ESTIMATOR_MODEL_URL,
            ModelKind::PalmDetector => PALM_DETECTOR_MODEL_URL,
        }
    }
}

const MODEL_DIR: &str = "models";
const HANDPOSE_ESTIMATOR_MODEL_FILENAME: &str = "handpose_estimation_mediapipe_2023feb.onnx";
const HANDPOSE_ESTIMATOR_MODEL_URL: &str = "https://raw.githubusercontent.com/214zzl995/gesture-universe/refs/heads/main/models/handpose_estimation_mediapipe_2023feb.onnx";
const PALM_DETECTOR_MODEL_FILENAME: &str = "palm_detection_mediapipe_2023feb.onnx";
const PALM_DETECTOR_MODEL_URL: &str = "https://raw.githubusercontent.com/214zzl995/gesture-universe/refs/heads/main/models/palm_detection_mediapipe_2023feb.onnx";

/// `models/` next to the running executable, like the default input files.
pub fn model_dir() -> PathBuf {
    beside_executable(MODEL_DIR)
}

pub fn default_handpose_estimator_model_path() -> PathBuf {
    model_dir().join(HANDPOSE_ESTIMATOR_MODEL_FILENAME)
}

pub fn default_palm_detector_model_path() -> PathBuf {
    model_dir().join(PALM_DETECTOR_MODEL_FILENAME)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelDownloadEvent {
    AlreadyPresent {
        model: ModelKind,
    },
    Started {
        model: ModelKind,
        total: Option<u64>,
    },
    Progress {
        model: ModelKind,
        downloaded: u64,
        total: Option<u64>,
    },
    Finished {
        model: ModelKind,
    },
}

/// Makes sure `model_path` holds the model, downloading it if missing.
pub fn ensure_model_ready<F>(
    model: ModelKind,
    model_path: &Path,
    mut on_event: F,
) -> anyhow::Result<()>
where
    F: FnMut(ModelDownloadEvent),
{
    if model_path.exists() {
        on_event(ModelDownloadEvent::AlreadyPresent { model });
        on_event(ModelDownloadEvent::Finished { model });
        return Ok(());
    }

    if let Some(parent) = model_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create model directory {}", parent.display()))?;
    }

    let mut progress: Option<ProgressBar> = None;
    download_to_path(model, model.url(), model_path, &mut |event| {
        match &event {
            ModelDownloadEvent::Started { total, .. } => {
                progress = Some(create_progress_bar(*total));
            }
            ModelDownloadEvent::Progress { downloaded, .. } => {
                if let Some(pb) = progress.as_ref() {
                    pb.set_position(*downloaded);
                }
            }
            ModelDownloadEvent::Finished { model } => {
                if let Some(pb) = progress.take() {
                    pb.finish_with_message(format!("{} model ready", model.label()));
                }
            }
            ModelDownloadEvent::AlreadyPresent { .. } => {}
        }
        on_event(event);
    })
    .with_context(|| {
        format!(
            "failed to download {} model to {}",
            model.label(),
            model_path.display()
        )
    })
}

fn download_to_path<F>(
    model: ModelKind,
    url: &str,
    dest: &Path,
    on_event: &mut F,
) -> anyhow::Result<()>
where
    F: FnMut(ModelDownloadEvent),
{
    log::info!(
        "downloading {} model from {url} to {}",
        model.label(),
        dest.display()
    );

    let client = Client::new();
    let mut response = client
        .get(url)
        .send()
        .context("failed to start model download")?
        .error_for_status()
        .context("model download returned error status")?;

    let total_size = response.content_length();
    on_event(ModelDownloadEvent::Started {
        model,
        total: total_size,
    });

    let tmp_path = dest.with_extension("download");
    stream_to_file(model, &mut response, total_size, &tmp_path, on_event)?;

    fs::rename(&tmp_path, dest).with_context(|| {
        format!(
            "failed to move temp model {} into place at {}",
            tmp_path.display(),
            dest.display()
        )
    })?;

    on_event(ModelDownloadEvent::Finished { model });
    Ok(())
}

/// Writes the body to `tmp_path`; a partial file is removed on failure.
fn stream_to_file<R, F>(
    model: ModelKind,
    reader: &mut R,
    total_size: Option<u64>,
    tmp_path: &Path,
    on_event: &mut F,
) -> anyhow::Result<()>
where
    R: Read,
    F: FnMut(ModelDownloadEvent),
{
    let result = copy_body(model, reader, total_size, tmp_path, on_event);
    if result.is_err() && tmp_path.exists() {
        if let Err(remove_err) = fs::remove_file(tmp_path) {
            log::warn!(
                "failed to remove partial download {}: {remove_err}",
                tmp_path.display()
            );
        }
    }
    result
}

fn copy_body<R, F>(
    model: ModelKind,
    reader: &mut R,
    total_size: Option<u64>,
    tmp_path: &Path,
    on_event: &mut F,
) -> anyhow::Result<()>
where
    R: Read,
    F: FnMut(ModelDownloadEvent),
{
    let mut file = fs::File::create(tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;

    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; 16 * 1024];
    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .context("failed while reading model bytes")?;
        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .context("failed while writing model to disk")?;
        downloaded += bytes_read as u64;
        on_event(ModelDownloadEvent::Progress {
            model,
            downloaded,
            total: total_size,
        });
    }

    file.sync_all()
        .context("failed to flush downloaded model to disk")
}

fn create_progress_bar(total_size: Option<u64>) -> ProgressBar {
    match total_size {
        Some(total) if total > 0 => {
            let pb = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            ) {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb
        }
        _ => {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.green} downloading model") {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_model_is_not_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("palm.onnx");
        fs::write(&path, b"onnx").unwrap();

        let mut events = Vec::new();
        ensure_model_ready(ModelKind::PalmDetector, &path, |evt| events.push(evt)).unwrap();

        assert_eq!(
            events,
            vec![
                ModelDownloadEvent::AlreadyPresent {
                    model: ModelKind::PalmDetector
                },
                ModelDownloadEvent::Finished {
                    model: ModelKind::PalmDetector
                },
            ]
        );
    }

    #[test]
    fn default_paths_live_under_models_beside_the_executable() {
        let exe_dir = std::env::current_exe()
            .unwrap()
            .parent()
            .unwrap()
            .to_path_buf();
        assert_eq!(model_dir(), exe_dir.join("models"));
        assert_eq!(
            default_palm_detector_model_path(),
            exe_dir.join("models/palm_detection_mediapipe_2023feb.onnx")
        );
        assert!(
            default_handpose_estimator_model_path()
                .ends_with("models/handpose_estimation_mediapipe_2023feb.onnx")
        );
    }

    /// Yields one chunk, then fails like a dropped connection.
    struct BrokenStream {
        sent: bool,
    }

    impl Read for BrokenStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.sent {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset",
                ));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"onnx");
            Ok(4)
        }
    }

    #[test]
    fn streams_body_and_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let tmp = dir.path().join("palm.download");
        let mut events = Vec::new();

        stream_to_file(
            ModelKind::PalmDetector,
            &mut std::io::Cursor::new(b"model bytes".to_vec()),
            Some(11),
            &tmp,
            &mut |evt| events.push(evt),
        )
        .unwrap();

        assert_eq!(fs::read(&tmp).unwrap(), b"model bytes");
        assert_eq!(
            events.last(),
            Some(&ModelDownloadEvent::Progress {
                model: ModelKind::PalmDetector,
                downloaded: 11,
                total: Some(11),
            })
        );
    }

    #[test]
    fn interrupted_download_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let tmp = dir.path().join("palm.download");

        let err = stream_to_file(
            ModelKind::PalmDetector,
            &mut BrokenStream { sent: false },
            None,
            &tmp,
            &mut |_| {},
        )
        .unwrap_err();

        assert!(format!("{err:#}").contains("connection reset"));
        assert!(!tmp.exists());
    }
}
