use super::frame::Frame;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameRangeError {
    #[error("Frame step must be positive")]
    ZeroStep,
    #[error("Frame range end ({end}) is before its beginning ({begin})")]
    Inverted { begin: usize, end: usize },
    #[error("Invalid frame range '{0}'. Expected 'begin:end:step' (e.g. '0:500:1')")]
    Malformed(String),
}

/// A `begin:end:step` selection of frames, with an open end meaning "to the last frame".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "FrameRangeRepr")]
pub struct FrameRange {
    begin: usize,
    end: Option<usize>,
    step: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FrameRangeRepr {
    Triple(Vec<usize>),
    Text(String),
}

impl TryFrom<FrameRangeRepr> for FrameRange {
    type Error = FrameRangeError;

    fn try_from(repr: FrameRangeRepr) -> Result<Self, Self::Error> {
        match repr {
            FrameRangeRepr::Triple(values) => match values.as_slice() {
                [begin, end, step] => FrameRange::new(*begin, Some(*end), *step),
                _ => Err(FrameRangeError::Malformed(format!("{:?}", values))),
            },
            FrameRangeRepr::Text(text) => text.parse(),
        }
    }
}

impl Default for FrameRange {
    fn default() -> Self {
        Self {
            begin: 0,
            end: None,
            step: 1,
        }
    }
}

impl FrameRange {
    pub fn new(begin: usize, end: Option<usize>, step: usize) -> Result<Self, FrameRangeError> {
        if step == 0 {
            return Err(FrameRangeError::ZeroStep);
        }
        if let Some(end) = end {
            if end < begin {
                return Err(FrameRangeError::Inverted { begin, end });
            }
        }
        Ok(Self { begin, end, step })
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> usize {
        self.begin
    }

    pub fn end(&self) -> Option<usize> {
        self.end
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Whether the frame at `index` in the source file is part of the selection.
    pub fn contains(&self, index: usize) -> bool {
        index >= self.begin
            && self.end.is_none_or(|end| index < end)
            && (index - self.begin) % self.step == 0
    }

    /// Whether no frame at or after `index` can be selected any more.
    pub fn is_exhausted_at(&self, index: usize) -> bool {
        self.end.is_some_and(|end| index >= end)
    }

    /// Source-file indices selected out of `total` frames.
    pub fn indices(&self, total: usize) -> impl Iterator<Item = usize> + '_ {
        let stop = self.end.map_or(total, |end| end.min(total));
        (self.begin..stop).step_by(self.step)
    }

    /// Label used in output file names, `begin-end-step`.
    ///
    /// An open end is rendered with the number of frames that were actually read.
    pub fn label(&self, frames_read: usize) -> String {
        let end = self
            .end
            .unwrap_or(self.begin + frames_read.saturating_sub(1) * self.step + 1);
        format!("{}-{}-{}", self.begin, end, self.step)
    }
}

impl FromStr for FrameRange {
    type Err = FrameRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || FrameRangeError::Malformed(s.to_string());
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(malformed());
        }
        let parse_opt = |p: &str| -> Result<Option<usize>, FrameRangeError> {
            if p.is_empty() {
                Ok(None)
            } else {
                p.parse().map(Some).map_err(|_| malformed())
            }
        };
        let begin = parse_opt(parts[0])?.unwrap_or(0);
        let end = parts.get(1).map_or(Ok(None), |p| parse_opt(p))?;
        let step = parts.get(2).map_or(Ok(None), |p| parse_opt(p))?.unwrap_or(1);
        FrameRange::new(begin, end, step)
    }
}

impl fmt::Display for FrameRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}:{}:{}", self.begin, end, self.step),
            None => write!(f, "{}::{}", self.begin, self.step),
        }
    }
}

/// An ordered sequence of frames together with the range they were read from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    frames: Vec<Frame>,
    range: FrameRange,
}

impl Trajectory {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            range: FrameRange::all(),
        }
    }

    pub fn with_range(frames: Vec<Frame>, range: FrameRange) -> Self {
        Self { frames, range }
    }

    pub fn range(&self) -> &FrameRange {
        &self.range
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut [Frame] {
        &mut self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn first(&self) -> Option<&Frame> {
        self.frames.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    /// Label of the frame selection for output file names.
    pub fn range_label(&self) -> String {
        self.range.label(self.frames.len())
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
