use crate::core::models::frame::Frame;
use crate::core::models::trajectory::{FrameRange, Trajectory};
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing trajectory file formats.
///
/// Implementors handle format-specific parsing of a stream of frames; the provided
/// methods take care of opening files and tagging the result with the frame range.
pub trait TrajectoryFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads the frames selected by `range` from a buffered reader.
    ///
    /// Frames outside the range are skipped without being parsed, and reading stops
    /// as soon as the range is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if a selected frame cannot be parsed or the stream is truncated.
    fn read_frames(reader: &mut impl BufRead, range: &FrameRange)
    -> Result<Vec<Frame>, Self::Error>;

    /// Writes a single frame to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_frame(frame: &Frame, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Writes a sequence of frames one after the other.
    fn write_frames<'a>(
        frames: impl IntoIterator<Item = &'a Frame>,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        for frame in frames {
            Self::write_frame(frame, writer)?;
        }
        Ok(())
    }

    /// Reads the selected frames of a trajectory file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(
        path: P,
        range: &FrameRange,
    ) -> Result<Trajectory, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let frames = Self::read_frames(&mut reader, range)?;
        Ok(Trajectory::with_range(frames, *range))
    }

    /// Writes all frames to a file path, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<'a, P: AsRef<Path>>(
        frames: impl IntoIterator<Item = &'a Frame>,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_frames(frames, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
