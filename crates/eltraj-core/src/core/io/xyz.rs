use crate::core::io::traits::TrajectoryFile;
use crate::core::models::cell::Cell;
use crate::core::models::element::{Element, symbol_for};
use crate::core::models::frame::Frame;
use crate::core::models::trajectory::FrameRange;
use nalgebra::{Matrix3, Point3};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: XyzParseErrorKind,
    },
    #[error("Frame {frame} is truncated: expected {expected} atom lines, found {found}")]
    Truncated {
        frame: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum XyzParseErrorKind {
    #[error("Invalid atom count '{value}'")]
    InvalidAtomCount { value: String },
    #[error("Invalid float in column {column} (value: '{value}')")]
    InvalidFloat { column: usize, value: String },
    #[error("Invalid integer in column {column} (value: '{value}')")]
    InvalidInt { column: usize, value: String },
    #[error("Expected at least {expected} columns, found {found}")]
    TooFewColumns { expected: usize, found: usize },
    #[error("Unknown species '{value}'")]
    UnknownSpecies { value: String },
    #[error("Lattice must contain 9 numbers (value: '{value}')")]
    InvalidLattice { value: String },
    #[error("pbc must contain 3 booleans (value: '{value}')")]
    InvalidPbc { value: String },
    #[error("Malformed Properties specification '{value}'")]
    InvalidProperties { value: String },
    #[error("Properties do not define species and 3D positions")]
    MissingColumns,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Column {
    name: String,
    kind: char,
    count: usize,
}

/// Column offsets of the per-atom fields eltraj understands.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Layout {
    width: usize,
    species: Option<usize>,
    numbers: Option<usize>,
    positions: usize,
    mol_ids: Option<usize>,
}

impl Layout {
    fn plain() -> Self {
        Self {
            width: 4,
            species: Some(0),
            numbers: None,
            positions: 1,
            mol_ids: None,
        }
    }

    fn from_properties(spec: &str) -> Result<Self, XyzParseErrorKind> {
        let invalid = || XyzParseErrorKind::InvalidProperties {
            value: spec.to_string(),
        };
        let parts: Vec<&str> = spec.split(':').collect();
        if parts.is_empty() || parts.len() % 3 != 0 {
            return Err(invalid());
        }
        let columns = parts
            .chunks(3)
            .map(|chunk| {
                let kind = chunk[1].chars().next().ok_or_else(invalid)?;
                let count = chunk[2].parse::<usize>().map_err(|_| invalid())?;
                Ok(Column {
                    name: chunk[0].to_string(),
                    kind: kind.to_ascii_uppercase(),
                    count,
                })
            })
            .collect::<Result<Vec<_>, XyzParseErrorKind>>()?;

        let mut offset = 0;
        let mut species = None;
        let mut numbers = None;
        let mut positions = None;
        let mut mol_ids = None;
        for column in &columns {
            match (column.name.as_str(), column.kind, column.count) {
                ("species", 'S', 1) => species = Some(offset),
                ("Z", 'I', 1) => numbers = Some(offset),
                ("pos", 'R', 3) => positions = Some(offset),
                ("molID", 'I', 1) => mol_ids = Some(offset),
                _ => {}
            }
            offset += column.count;
        }

        let positions = positions.ok_or(XyzParseErrorKind::MissingColumns)?;
        if species.is_none() && numbers.is_none() {
            return Err(XyzParseErrorKind::MissingColumns);
        }
        Ok(Self {
            width: offset,
            species,
            numbers,
            positions,
            mol_ids,
        })
    }
}

/// Parsed content of an (extended) XYZ comment line.
#[derive(Debug, Clone, PartialEq)]
struct Header {
    cell: Cell,
    pbc: [bool; 3],
    layout: Layout,
}

/// Splits a comment line into `key=value` pairs; keys are lower-cased and bare words
/// become flags with value `"T"`. An unterminated quote runs to the end of the line.
fn tokenize_comment(line: &str) -> HashMap<String, String> {
    let mut pairs = HashMap::new();
    let mut chars = line.chars().peekable();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }
        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c.is_whitespace() {
                break;
            }
            key.push(c);
            chars.next();
        }
        let mut value = String::from("T");
        if chars.peek() == Some(&'=') {
            chars.next();
            value.clear();
            if chars.peek() == Some(&'"') {
                chars.next();
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                    value.push(c);
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
            }
        }
        pairs.insert(key.to_ascii_lowercase(), value);
    }
    pairs
}

fn parse_bool(token: &str) -> Option<bool> {
    match token {
        "T" | "t" | "True" | "true" | "1" => Some(true),
        "F" | "f" | "False" | "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_header(line: &str) -> Result<Header, XyzParseErrorKind> {
    let pairs = tokenize_comment(line);

    let (cell, default_pbc) = match pairs.get("lattice") {
        Some(value) => {
            let numbers = value
                .split_whitespace()
                .map(str::parse::<f64>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| XyzParseErrorKind::InvalidLattice {
                    value: value.clone(),
                })?;
            if numbers.len() != 9 {
                return Err(XyzParseErrorKind::InvalidLattice {
                    value: value.clone(),
                });
            }
            (Cell::new(Matrix3::from_row_slice(&numbers)), true)
        }
        None => (Cell::default(), false),
    };

    let pbc = match pairs.get("pbc") {
        Some(value) => {
            let flags: Vec<bool> = value.split_whitespace().filter_map(parse_bool).collect();
            match flags.as_slice() {
                [a, b, c] => [*a, *b, *c],
                _ => {
                    return Err(XyzParseErrorKind::InvalidPbc {
                        value: value.clone(),
                    });
                }
            }
        }
        None => [default_pbc; 3],
    };

    let layout = match pairs.get("properties") {
        Some(spec) => Layout::from_properties(spec)?,
        None => Layout::plain(),
    };

    Ok(Header { cell, pbc, layout })
}

fn parse_atom_line(
    line: &str,
    layout: &Layout,
) -> Result<(u16, Point3<f64>, Option<usize>), XyzParseErrorKind> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < layout.width {
        return Err(XyzParseErrorKind::TooFewColumns {
            expected: layout.width,
            found: fields.len(),
        });
    }

    let parse_int = |column: usize| -> Result<usize, XyzParseErrorKind> {
        fields[column]
            .parse::<usize>()
            .map_err(|_| XyzParseErrorKind::InvalidInt {
                column: column + 1,
                value: fields[column].to_string(),
            })
    };

    let number = match (layout.species, layout.numbers) {
        (Some(column), _) => {
            let token = fields[column];
            match Element::from_symbol(token) {
                Ok(el) => el.number,
                Err(_) => token
                    .parse::<u16>()
                    .map_err(|_| XyzParseErrorKind::UnknownSpecies {
                        value: token.to_string(),
                    })?,
            }
        }
        (None, Some(column)) => {
            u16::try_from(parse_int(column)?).map_err(|_| XyzParseErrorKind::InvalidInt {
                column: column + 1,
                value: fields[column].to_string(),
            })?
        }
        (None, None) => return Err(XyzParseErrorKind::MissingColumns),
    };

    let mut coords = [0.0; 3];
    for (axis, coord) in coords.iter_mut().enumerate() {
        let column = layout.positions + axis;
        *coord = fields[column]
            .parse::<f64>()
            .map_err(|_| XyzParseErrorKind::InvalidFloat {
                column: column + 1,
                value: fields[column].to_string(),
            })?;
    }

    let mol_id = layout.mol_ids.map(parse_int).transpose()?;

    Ok((number, Point3::new(coords[0], coords[1], coords[2]), mol_id))
}

fn read_line(reader: &mut impl BufRead, buf: &mut String) -> io::Result<bool> {
    buf.clear();
    Ok(reader.read_line(buf)? > 0)
}

/// Reader and writer for plain and extended XYZ trajectories.
///
/// Extended comment lines are understood for `Lattice`, `pbc` and `Properties`
/// (`species:S:1`, `Z:I:1`, `pos:R:3` and `molID:I:1` columns); other keys and
/// columns are ignored. A plain XYZ frame gets a degenerate cell and no periodicity,
/// which a box file can supply afterwards.
pub struct XyzFile;

impl TrajectoryFile for XyzFile {
    type Error = XyzError;

    fn read_frames(
        reader: &mut impl BufRead,
        range: &FrameRange,
    ) -> Result<Vec<Frame>, Self::Error> {
        let mut frames = Vec::new();
        let mut buf = String::new();
        let mut line_num = 0usize;
        let mut frame_idx = 0usize;

        loop {
            if range.is_exhausted_at(frame_idx) {
                break;
            }

            let mut has_count = false;
            while read_line(reader, &mut buf)? {
                line_num += 1;
                if !buf.trim().is_empty() {
                    has_count = true;
                    break;
                }
            }
            if !has_count {
                break;
            }

            let count_str = buf.trim().to_string();
            let natoms: usize = count_str.parse().map_err(|_| XyzError::Parse {
                line: line_num,
                kind: XyzParseErrorKind::InvalidAtomCount { value: count_str },
            })?;

            if !read_line(reader, &mut buf)? {
                return Err(XyzError::Truncated {
                    frame: frame_idx,
                    expected: natoms,
                    found: 0,
                });
            }
            line_num += 1;

            if !range.contains(frame_idx) {
                for found in 0..natoms {
                    if !read_line(reader, &mut buf)? {
                        return Err(XyzError::Truncated {
                            frame: frame_idx,
                            expected: natoms,
                            found,
                        });
                    }
                    line_num += 1;
                }
                trace!(frame = frame_idx, "Skipped frame outside the selection.");
                frame_idx += 1;
                continue;
            }

            let header = parse_header(&buf).map_err(|kind| XyzError::Parse {
                line: line_num,
                kind,
            })?;

            let mut numbers = Vec::with_capacity(natoms);
            let mut positions = Vec::with_capacity(natoms);
            let mut mol_ids = Vec::new();
            for found in 0..natoms {
                if !read_line(reader, &mut buf)? {
                    return Err(XyzError::Truncated {
                        frame: frame_idx,
                        expected: natoms,
                        found,
                    });
                }
                line_num += 1;
                let (number, position, mol_id) =
                    parse_atom_line(&buf, &header.layout).map_err(|kind| XyzError::Parse {
                        line: line_num,
                        kind,
                    })?;
                numbers.push(number);
                positions.push(position);
                if let Some(id) = mol_id {
                    mol_ids.push(id);
                }
            }

            // Lengths agree by construction, so neither call can fail.
            let mut frame = Frame::new(numbers, positions, header.cell, header.pbc)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            if header.layout.mol_ids.is_some() {
                frame
                    .set_mol_ids(mol_ids)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            }
            frames.push(frame);
            frame_idx += 1;
        }

        debug!(
            frames_read = frames.len(),
            frames_scanned = frame_idx,
            "Finished reading XYZ stream."
        );
        Ok(frames)
    }

    fn write_frame(frame: &Frame, writer: &mut impl Write) -> Result<(), Self::Error> {
        let use_symbols = frame
            .numbers()
            .iter()
            .all(|&z| Element::from_number(z).is_ok());

        writeln!(writer, "{}", frame.len())?;

        let mut header = Vec::new();
        if !frame.cell().is_degenerate() {
            let m = frame.cell().matrix();
            let lattice: Vec<String> = (0..3)
                .flat_map(|i| (0..3).map(move |j| (i, j)))
                .map(|(i, j)| m[(i, j)].to_string())
                .collect();
            header.push(format!("Lattice=\"{}\"", lattice.join(" ")));
        }
        let mut properties = String::from(if use_symbols {
            "species:S:1:pos:R:3"
        } else {
            "Z:I:1:pos:R:3"
        });
        if frame.mol_ids().is_some() {
            properties.push_str(":molID:I:1");
        }
        header.push(format!("Properties={}", properties));
        let pbc: Vec<&str> = frame
            .pbc()
            .iter()
            .map(|&p| if p { "T" } else { "F" })
            .collect();
        header.push(format!("pbc=\"{}\"", pbc.join(" ")));
        writeln!(writer, "{}", header.join(" "))?;

        for (idx, (&z, pos)) in frame.numbers().iter().zip(frame.positions()).enumerate() {
            let species = if use_symbols {
                symbol_for(z).into_owned()
            } else {
                z.to_string()
            };
            write!(
                writer,
                "{:<3} {:>16} {:>16} {:>16}",
                species, pos.x, pos.y, pos.z
            )?;
            if let Some(ids) = frame.mol_ids() {
                write!(writer, " {:>6}", ids[idx])?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}
