use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use serde::Serialize;

use super::Collector;
use crate::types::{DetectedHand, Frame, HandLandmarkerResult, Handedness, Landmark};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HandRecord {
    pub handedness: Handedness,
    pub score: f32,
    pub landmarks: Vec<Landmark>,
}

impl From<&DetectedHand> for HandRecord {
    fn from(hand: &DetectedHand) -> Self {
        Self {
            handedness: hand.handedness,
            score: hand.score,
            landmarks: hand.landmarks.to_vec(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameRecord {
    pub frame: usize,
    pub hands: Vec<HandRecord>,
}

/// Every frame's detections, in frame order, for writing out as JSON.
#[derive(Debug, Default)]
pub struct DetectionLog {
    records: Vec<FrameRecord>,
}

impl DetectionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[FrameRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<FrameRecord> {
        self.records
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.records).context("failed to serialize detections")
    }

    /// Writes the log as a pretty-printed JSON array, replacing `path`.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create output directory {}", parent.display()))?;
        }

        let file = fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.records)
            .with_context(|| format!("failed to write detections to {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("failed to flush {}", path.display()))?;

        log::info!("wrote {} frame records to {}", self.records.len(), path.display());
        Ok(())
    }
}

impl Collector for DetectionLog {
    fn collect(&mut self, frame: &Frame, result: &HandLandmarkerResult) {
        self.records.push(FrameRecord {
            frame: frame.index,
            hands: result.hands.iter().map(HandRecord::from).collect(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NUM_LANDMARKS;

    fn frame(index: usize) -> Frame {
        Frame {
            index,
            rgb: vec![0; 3],
            width: 1,
            height: 1,
        }
    }

    fn hand(handedness: Handedness, score: f32) -> DetectedHand {
        DetectedHand {
            handedness,
            score,
            landmarks: [Landmark::new(0.25, 0.5, -0.125); NUM_LANDMARKS],
            world_landmarks: [Landmark::default(); NUM_LANDMARKS],
        }
    }

    #[test]
    fn records_follow_frames_and_detection_order() {
        let mut log = DetectionLog::new();
        log.collect(&frame(0), &HandLandmarkerResult::empty());
        log.collect(
            &frame(1),
            &HandLandmarkerResult {
                hands: vec![hand(Handedness::Right, 0.75), hand(Handedness::Left, 0.5)],
            },
        );

        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].frame, 0);
        assert!(records[0].hands.is_empty());
        assert_eq!(records[1].hands[0].handedness, Handedness::Right);
        assert_eq!(records[1].hands[1].handedness, Handedness::Left);
        assert_eq!(records[1].hands[1].landmarks.len(), NUM_LANDMARKS);
    }

    #[test]
    fn json_keeps_field_names() {
        let mut log = DetectionLog::new();
        log.collect(
            &frame(4),
            &HandLandmarkerResult {
                hands: vec![hand(Handedness::Left, 0.75)],
            },
        );

        let value: serde_json::Value = serde_json::from_str(&log.to_json().unwrap()).unwrap();
        let first = &value[0];
        assert_eq!(first["frame"], 4);
        assert_eq!(first["hands"][0]["handedness"], "Left");
        assert_eq!(first["hands"][0]["score"], 0.75);
        assert_eq!(first["hands"][0]["landmarks"].as_array().unwrap().len(), 21);
        assert_eq!(first["hands"][0]["landmarks"][0]["x"], 0.25);
        assert_eq!(first["hands"][0]["landmarks"][0]["y"], 0.5);
        assert_eq!(first["hands"][0]["landmarks"][0]["z"], -0.125);
    }

    #[test]
    fn empty_log_is_an_empty_array() {
        assert_eq!(DetectionLog::new().to_json().unwrap(), "[]");
    }

    #[test]
    fn write_json_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/verified-detections.json");
        let mut log = DetectionLog::new();
        log.collect(&frame(0), &HandLandmarkerResult::empty());

        log.write_json(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, log.to_json().unwrap());
        assert!(written.contains("\n  {\n    \"frame\": 0,"));
    }
}
