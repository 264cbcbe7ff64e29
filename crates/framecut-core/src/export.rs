// crates/framecut-core/src/export.rs
//
// Export planning. The external export pipeline owns the actual FFmpeg
// invocation (separate decode/encode path, never the frame cache); this
// module turns the segment list into the per-clip timing and output naming
// that pipeline consumes, and fails fast on anything it would choke on.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::timeline::TimelineModel;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Mp4,
    Avi,
    Mov,
    Wmv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Mp4 => "mp4",
            ExportFormat::Avi => "avi",
            ExportFormat::Mov => "mov",
            ExportFormat::Wmv => "wmv",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportMode {
    /// One output file per segment.
    SeparateClips,
    /// Segments rendered to transport-stream parts, then concatenated into a
    /// single file (TS parts concatenate without re-encoding).
    Combined,
}

#[derive(Debug, Error, PartialEq)]
pub enum ExportPlanError {
    #[error("no segments to export")]
    NoSegments,
    #[error("invalid frame rate: {0}")]
    InvalidFps(f64),
    #[error("segment {id} is out of range for the loaded video")]
    InvalidSegment { id: Uuid },
}

/// Timing and destination for one segment render.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipJob {
    pub segment_id:    Uuid,
    pub start_secs:    f64,
    pub duration_secs: f64,
    pub output:        PathBuf,
}

/// Everything the external exporter needs to run, in timeline order.
#[derive(Clone, Debug)]
pub struct ExportPlan {
    pub mode: ExportMode,
    pub jobs: Vec<ClipJob>,
    /// Concat target in Combined mode; None when clips are the final files.
    pub final_output: Option<PathBuf>,
}

/// Build an export plan from the segment list.
///
/// `base` is the user-chosen output path without extension; separate clips
/// become `{base}_segment001.{ext}`, …, combined parts become
/// `{base}_temp001.ts` with the concat result at `{base}.{ext}`. All final
/// destinations are uniquified against existing files.
pub fn plan_export(
    model:  &TimelineModel,
    fps:    f64,
    mode:   ExportMode,
    format: ExportFormat,
    base:   &Path,
) -> Result<ExportPlan, ExportPlanError> {
    if model.is_empty() {
        return Err(ExportPlanError::NoSegments);
    }
    if fps <= 0.0 {
        return Err(ExportPlanError::InvalidFps(fps));
    }
    if let Some(bad) = model.segments().iter().find(|s| !model.is_valid_segment(s)) {
        return Err(ExportPlanError::InvalidSegment { id: bad.id });
    }

    let stem = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".into());
    let dir = base.parent().unwrap_or_else(|| Path::new(""));

    let jobs = model
        .segments()
        .iter()
        .enumerate()
        .map(|(i, seg)| {
            let n = i + 1;
            let output = match mode {
                ExportMode::SeparateClips => unique_path(
                    &dir.join(format!("{stem}_segment{n:03}.{}", format.extension())),
                ),
                ExportMode::Combined => dir.join(format!("{stem}_temp{n:03}.ts")),
            };
            ClipJob {
                segment_id:    seg.id,
                start_secs:    seg.in_point as f64 / fps,
                duration_secs: seg.duration_secs(fps),
                output,
            }
        })
        .collect();

    let final_output = match mode {
        ExportMode::SeparateClips => None,
        ExportMode::Combined => Some(unique_path(
            &dir.join(format!("{stem}.{}", format.extension())),
        )),
    };

    Ok(ExportPlan { mode, jobs, final_output })
}

/// Append `_1`, `_2`, … to the file stem until the path does not exist.
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let mut counter = 1u32;
    loop {
        let name = match &ext {
            Some(e) => format!("{stem}_{counter}.{e}"),
            None    => format!("{stem}_{counter}"),
        };
        let candidate = dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
