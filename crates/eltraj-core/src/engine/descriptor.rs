use super::progress::{Progress, ProgressReporter};
use crate::core::io::npy::{NpyError, load_npy, save_npy};
use crate::core::io::traits::TrajectoryFile;
use crate::core::io::xyz::{XyzError, XyzFile};
use crate::core::models::frame::Frame;
use crate::core::models::trajectory::FrameRange;
use ndarray::{Array2, ArrayView2, Axis, concatenate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub const TURBO_TYPE: &str = "soap_turbo";

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("Descriptor parameters have no '{0}' entry")]
    MissingParameter(&'static str),
    #[error("Invalid descriptor parameters: {0}")]
    InvalidParameters(String),
    #[error("Central species {0} is not listed in species_Z")]
    UnknownCentralSpecies(u16),
    #[error("At least one central species (Zs) is required")]
    NoCentralSpecies,
    #[error("Chunk size must be at least 1")]
    ZeroChunk,
    #[error("No frames selected for descriptor evaluation")]
    EmptySelection,
    #[error("Descriptor rows have inconsistent lengths: {expected} and {actual}")]
    ColumnMismatch { expected: usize, actual: usize },
    #[error("Failed to run descriptor command '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Descriptor command '{program}' failed ({status}): {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error(transparent)]
    Xyz(#[from] XyzError),
    #[error(transparent)]
    Npy(#[from] NpyError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn python_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = v.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let repr = format!("{v:e}");
        if let Some((mantissa, exponent)) = repr.split_once('e') {
            if let Ok(exp) = exponent.parse::<i32>() {
                let sign = if exp < 0 { '-' } else { '+' };
                return format!("{mantissa}e{sign}{:02}", exp.abs());
            }
        }
        return repr;
    }
    if v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

fn python_repr(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => format!("'{s}'"),
        other => python_str(other),
    }
}

/// Renders a value the way Python's `str()` renders the equivalent object.
pub fn python_str(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => python_float(*f),
        toml::Value::Boolean(true) => "True".to_string(),
        toml::Value::Boolean(false) => "False".to_string(),
        toml::Value::Datetime(d) => d.to_string(),
        toml::Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(python_repr).collect();
            format!("[{}]", inner.join(", "))
        }
        toml::Value::Table(table) => {
            let inner: Vec<String> = table
                .iter()
                .map(|(k, v)| format!("'{k}': {}", python_repr(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

/// Drops the first and last character, e.g. the braces of `"{6 8}"`.
fn strip_delimiters(s: &str) -> &str {
    let mut chars = s.chars();
    chars.next();
    chars.next_back();
    chars.as_str()
}

/// A number that keeps the integer/float distinction of the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Integer(i64),
    Float(f64),
}

impl Scalar {
    pub fn as_f64(self) -> f64 {
        match self {
            Scalar::Integer(i) => i as f64,
            Scalar::Float(f) => f,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Integer(i) => write!(f, "{i}"),
            Scalar::Float(v) => f.write_str(&python_float(*v)),
        }
    }
}

/// Plain SOAP parameters: an ordered key/value table whose `type` entry names the descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoapParams(toml::Table);

impl SoapParams {
    pub fn new(table: toml::Table) -> Self {
        Self(table)
    }

    pub fn table(&self) -> &toml::Table {
        &self.0
    }

    fn get(&self, key: &'static str) -> Result<&toml::Value, DescriptorError> {
        self.0.get(key).ok_or(DescriptorError::MissingParameter(key))
    }

    fn get_str(&self, key: &'static str) -> Result<String, DescriptorError> {
        self.get(key).map(python_str)
    }

    pub fn kind(&self) -> Result<String, DescriptorError> {
        self.get_str("type")
    }

    /// `"{type} key=value key=value ... "`, in table order.
    pub fn descriptor_string(&self) -> String {
        let mut s = String::new();
        for (key, value) in &self.0 {
            let value = python_str(value);
            if key == "type" {
                s.push_str(&value);
            } else {
                s.push_str(key);
                s.push('=');
                s.push_str(&value);
            }
            s.push(' ');
        }
        s
    }

    pub fn save_name(&self, label: &str) -> Result<String, DescriptorError> {
        Ok(format!(
            "{}_rcut{}_nmax{}_lmax{}_n_Z{}_Z{}_{label}",
            self.kind()?,
            self.get_str("cutoff")?,
            self.get_str("n_max")?,
            self.get_str("l_max")?,
            self.get_str("n_Z")?,
            strip_delimiters(&self.get_str("Z")?),
        ))
    }

    pub fn frame_by_frame_name(
        &self,
        outheader: &str,
        n_frames: usize,
        every: usize,
    ) -> Result<String, DescriptorError> {
        let cutoff = match self.get("cutoff")? {
            toml::Value::Integer(i) => *i,
            toml::Value::Float(f) => f.trunc() as i64,
            other => {
                return Err(DescriptorError::InvalidParameters(format!(
                    "cutoff must be a number, got {other}"
                )));
            }
        };
        Ok(format!(
            "{outheader}_{}_rcut{cutoff}_n_Z{}_Z{}_Nframe{n_frames}every{every}",
            self.kind()?,
            self.get_str("n_Z")?,
            strip_delimiters(&self.get_str("Z")?),
        ))
    }
}

/// Per-species SOAP-turbo parameters, broadcast to every entry of `species_Z`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TurboMulti {
    pub alpha_max: Scalar,
    pub atom_sigma_r: Scalar,
    pub atom_sigma_t: Scalar,
    pub atom_sigma_r_scaling: Scalar,
    pub atom_sigma_t_scaling: Scalar,
    pub amplitude_scaling: Scalar,
    pub central_weight: Scalar,
}

impl TurboMulti {
    fn entries(&self) -> [(&'static str, Scalar); 7] {
        [
            ("alpha_max", self.alpha_max),
            ("atom_sigma_r", self.atom_sigma_r),
            ("atom_sigma_t", self.atom_sigma_t),
            ("atom_sigma_r_scaling", self.atom_sigma_r_scaling),
            ("atom_sigma_t_scaling", self.atom_sigma_t_scaling),
            ("amplitude_scaling", self.amplitude_scaling),
            ("central_weight", self.central_weight),
        ]
    }
}

fn default_turbo_type() -> String {
    TURBO_TYPE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TurboParams {
    #[serde(rename = "type", default = "default_turbo_type")]
    pub kind: String,
    /// Central species, one descriptor block each.
    #[serde(rename = "Zs")]
    pub zs: Vec<u16>,
    #[serde(rename = "species_Z")]
    pub species_z: Vec<u16>,
    pub l_max: u32,
    /// Accepted for compatibility; always recomputed from `species_Z`.
    #[serde(default, skip_serializing)]
    pub n_species: Option<usize>,
    pub rcut_hard: Scalar,
    pub rcut_soft: Scalar,
    pub basis: String,
    pub scaling_mode: String,
    pub radial_enhancement: Scalar,
    pub multi: TurboMulti,
}

impl TurboParams {
    fn central_index(&self, z: u16) -> Result<usize, DescriptorError> {
        self.species_z
            .iter()
            .position(|&s| s == z)
            .map(|i| i + 1)
            .ok_or(DescriptorError::UnknownCentralSpecies(z))
    }

    fn central_indices(&self) -> Result<Vec<usize>, DescriptorError> {
        if self.zs.is_empty() {
            return Err(DescriptorError::NoCentralSpecies);
        }
        self.zs.iter().map(|&z| self.central_index(z)).collect()
    }

    fn braced<T: ToString>(items: impl IntoIterator<Item = T>) -> String {
        let inner: Vec<String> = items.into_iter().map(|v| v.to_string()).collect();
        format!("{{{}}}", inner.join(" "))
    }

    /// `key=value ` pairs of one central species, in the order the backend expects.
    fn block(&self, central_index: usize) -> String {
        let n_species = self.species_z.len();
        let mut pairs: Vec<(&str, String)> = vec![
            ("species_Z", Self::braced(&self.species_z)),
            ("l_max", self.l_max.to_string()),
            ("n_species", n_species.to_string()),
            ("rcut_hard", self.rcut_hard.to_string()),
            ("rcut_soft", self.rcut_soft.to_string()),
            ("basis", self.basis.clone()),
            ("scaling_mode", self.scaling_mode.clone()),
            ("radial_enhancement", self.radial_enhancement.to_string()),
            ("central_index", central_index.to_string()),
        ];
        for (key, value) in self.multi.entries() {
            pairs.push((key, Self::braced(std::iter::repeat_n(value, n_species))));
        }

        let mut s = String::new();
        for (key, value) in pairs {
            s.push_str(key);
            s.push('=');
            s.push_str(&value);
            s.push(' ');
        }
        s
    }

    /// One `"{type} ..."` block per central species, each followed by a space.
    pub fn descriptor_string(&self) -> Result<String, DescriptorError> {
        let mut s = String::new();
        for index in self.central_indices()? {
            s.push_str(&self.kind);
            s.push(' ');
            s.push_str(&self.block(index));
            s.push(' ');
        }
        Ok(s)
    }

    /// Descriptor blocks for `gap_fit`: braces doubled, each block followed by
    /// `" : \n"` and the final newline and space cut, leaving a trailing `" :"`.
    pub fn gap_fit_string(&self) -> Result<String, DescriptorError> {
        let mut s = String::new();
        for index in self.central_indices()? {
            let qs = format!("{TURBO_TYPE} {}", self.block(index));
            s.push_str(&qs.replace('{', "{{").replace('}', "}}"));
            s.push_str(" : \n");
        }
        s.truncate(s.len().saturating_sub(2));
        Ok(s)
    }

    pub fn save_name(&self, label: &str) -> Result<String, DescriptorError> {
        let first = self.zs.first().ok_or(DescriptorError::NoCentralSpecies)?;
        Ok(format!(
            "turbo_rcutH{}_rcutS{}_nmax{}_lmax{}_n_Z{}_Z{first}_{label}",
            self.rcut_hard,
            self.rcut_soft,
            self.multi.alpha_max,
            self.l_max,
            self.zs.len(),
        ))
    }

    pub fn frame_by_frame_name(&self, outheader: &str, n_frames: usize, every: usize) -> String {
        format!(
            "{outheader}_{}_rcut{}_n_Z{}_Z{}_Nframe{n_frames}every{every}",
            self.kind,
            self.rcut_hard.as_f64().trunc() as i64,
            self.zs.len(),
            self.zs
                .iter()
                .map(u16::to_string)
                .collect::<Vec<_>>()
                .join(" "),
        )
    }
}

/// Descriptor parameters, dispatched on the `type` entry of the table.
#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorParams {
    Soap(SoapParams),
    Turbo(TurboParams),
}

impl DescriptorParams {
    pub fn from_table(table: toml::Table) -> Result<Self, DescriptorError> {
        let kind = table
            .get("type")
            .map(python_str)
            .ok_or(DescriptorError::MissingParameter("type"))?;
        if kind == TURBO_TYPE {
            let params: TurboParams = toml::Value::Table(table)
                .try_into()
                .map_err(|e: toml::de::Error| DescriptorError::InvalidParameters(e.to_string()))?;
            params.central_indices()?;
            Ok(DescriptorParams::Turbo(params))
        } else {
            Ok(DescriptorParams::Soap(SoapParams::new(table)))
        }
    }

    pub fn descriptor_string(&self) -> Result<String, DescriptorError> {
        match self {
            DescriptorParams::Soap(p) => Ok(p.descriptor_string()),
            DescriptorParams::Turbo(p) => p.descriptor_string(),
        }
    }

    pub fn save_name(&self, label: &str) -> Result<String, DescriptorError> {
        match self {
            DescriptorParams::Soap(p) => p.save_name(label),
            DescriptorParams::Turbo(p) => p.save_name(label),
        }
    }

    pub fn frame_by_frame_name(
        &self,
        outheader: &str,
        n_frames: usize,
        every: usize,
    ) -> Result<String, DescriptorError> {
        match self {
            DescriptorParams::Soap(p) => p.frame_by_frame_name(outheader, n_frames, every),
            DescriptorParams::Turbo(p) => Ok(p.frame_by_frame_name(outheader, n_frames, every)),
        }
    }
}

/// Computes descriptor rows for a batch of frames.
///
/// Implementations return one row per descriptor instance (per atom or per frame,
/// depending on the descriptor), rows of consecutive frames concatenated in order.
pub trait DescriptorBackend: Send + Sync {
    fn compute(&self, frames: &[Frame]) -> Result<Array2<f64>, DescriptorError>;
}

/// Runs an external program on an extended-XYZ file and reads back a `.npy` array.
///
/// The placeholders `{descriptor}`, `{input}` and `{output}` in `args` are replaced
/// by the descriptor string and the scratch input/output paths.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
    descriptor: String,
}

impl CommandBackend {
    pub fn new(program: impl Into<String>, args: Vec<String>, descriptor: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args,
            descriptor: descriptor.into(),
        }
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    fn render_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{descriptor}", &self.descriptor)
                    .replace("{input}", &input)
                    .replace("{output}", &output)
            })
            .collect()
    }
}

impl DescriptorBackend for CommandBackend {
    fn compute(&self, frames: &[Frame]) -> Result<Array2<f64>, DescriptorError> {
        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join("frames.xyz");
        let output = scratch.path().join("descriptor.npy");
        XyzFile::write_to_path(frames, &input)?;

        let args = self.render_args(&input, &output);
        debug!(program = %self.program, ?args, "Running descriptor command.");
        let result = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| DescriptorError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !result.status.success() {
            return Err(DescriptorError::CommandFailed {
                program: self.program.clone(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        Ok(load_npy(&output)?)
    }
}

/// A contiguous slice `start..end` of the loaded frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub start: usize,
    pub end: usize,
    /// `begin-end-step` in source-file frame indices.
    pub label: String,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Splits `n_loaded` frames into chunks of `chunk` frames; the last chunk may be shorter.
pub fn plan_chunks(
    n_loaded: usize,
    chunk: usize,
    range: &FrameRange,
) -> Result<Vec<Chunk>, DescriptorError> {
    if chunk == 0 {
        return Err(DescriptorError::ZeroChunk);
    }
    let absolute = |i: usize| range.begin() + i * range.step();
    Ok((0..n_loaded)
        .step_by(chunk)
        .map(|start| {
            let end = (start + chunk).min(n_loaded);
            Chunk {
                start,
                end,
                label: format!("{}-{}-{}", absolute(start), absolute(end), range.step()),
            }
        })
        .collect())
}

/// Evaluates every chunk and writes one `{save_name}.npy` per chunk into `out_dir`.
#[instrument(skip_all, name = "descriptor_chunks", fields(chunks = chunks.len()))]
pub fn evaluate_chunks(
    backend: &dyn DescriptorBackend,
    params: &DescriptorParams,
    frames: &[Frame],
    chunks: &[Chunk],
    out_dir: &Path,
    reporter: &ProgressReporter,
) -> Result<Vec<PathBuf>, DescriptorError> {
    reporter.report(Progress::TaskStart {
        total: chunks.len() as u64,
    });
    let mut written = Vec::with_capacity(chunks.len());
    for (c, chunk) in chunks.iter().enumerate() {
        let slice = frames
            .get(chunk.start..chunk.end)
            .ok_or(DescriptorError::EmptySelection)?;
        info!(chunk = c + 1, label = %chunk.label, frames = slice.len(), "Computing descriptor chunk.");
        let rows = backend.compute(slice)?;
        let path = out_dir.join(params.save_name(&chunk.label)?);
        written.push(save_npy(&path, &rows)?);
        reporter.tick();
    }
    reporter.report(Progress::TaskFinish);
    Ok(written)
}

fn stack_rows(blocks: &[Array2<f64>]) -> Result<Array2<f64>, DescriptorError> {
    let Some(first) = blocks.first() else {
        return Err(DescriptorError::EmptySelection);
    };
    let expected = first.ncols();
    if let Some(bad) = blocks.iter().find(|b| b.ncols() != expected) {
        return Err(DescriptorError::ColumnMismatch {
            expected,
            actual: bad.ncols(),
        });
    }
    let views: Vec<ArrayView2<f64>> = blocks.iter().map(|b| b.view()).collect();
    concatenate(Axis(0), &views).map_err(|e| DescriptorError::InvalidParameters(e.to_string()))
}

/// Evaluates frames `0, every, 2 * every, ...` below `n_frames` one at a time and
/// concatenates their rows.
#[instrument(skip_all, name = "descriptor_frame_by_frame", fields(n_frames = n_frames, every = every))]
pub fn evaluate_frame_by_frame(
    backend: &dyn DescriptorBackend,
    frames: &[Frame],
    n_frames: usize,
    every: usize,
    reporter: &ProgressReporter,
) -> Result<Array2<f64>, DescriptorError> {
    let every = every.max(1);
    if n_frames > frames.len() {
        warn!(
            requested = n_frames,
            available = frames.len(),
            "Fewer frames loaded than requested; evaluating the available ones."
        );
    }
    let selected: Vec<usize> = (0..n_frames.min(frames.len())).step_by(every).collect();
    reporter.report(Progress::TaskStart {
        total: selected.len() as u64,
    });
    let mut blocks = Vec::with_capacity(selected.len());
    for i in selected {
        blocks.push(backend.compute(std::slice::from_ref(&frames[i]))?);
        reporter.tick();
    }
    reporter.report(Progress::TaskFinish);
    stack_rows(&blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::cell::Cell;
    use nalgebra::Point3;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn soap_table() -> toml::Table {
        r#"
            type = "soap"
            cutoff = 5.0
            l_max = 4
            n_max = 8
            atom_sigma = 0.5
            n_Z = 2
            Z = "{6 8}"
            average = true
        "#
        .parse()
        .unwrap()
    }

    fn turbo_table(zs: &str) -> toml::Table {
        format!(
            r#"
                type = "soap_turbo"
                Zs = {zs}
                species_Z = [1, 3]
                l_max = 4
                n_species = 2
                rcut_hard = 6
                rcut_soft = 5.0
                basis = "poly3gauss"
                scaling_mode = "polynomial"
                radial_enhancement = 1

                [multi]
                alpha_max = 8
                atom_sigma_r = 0.2
                atom_sigma_t = 0.2
                atom_sigma_r_scaling = 0.1
                atom_sigma_t_scaling = 0.1
                amplitude_scaling = 1.0
                central_weight = 1.0
            "#
        )
        .parse()
        .unwrap()
    }

    fn turbo(zs: &str) -> TurboParams {
        match DescriptorParams::from_table(turbo_table(zs)).unwrap() {
            DescriptorParams::Turbo(p) => p,
            other => panic!("expected turbo parameters, got {other:?}"),
        }
    }

    const LI_BLOCK: &str = "species_Z={1 3} l_max=4 n_species=2 rcut_hard=6 rcut_soft=5.0 \
        basis=poly3gauss scaling_mode=polynomial radial_enhancement=1 central_index=2 \
        alpha_max={8 8} atom_sigma_r={0.2 0.2} atom_sigma_t={0.2 0.2} \
        atom_sigma_r_scaling={0.1 0.1} atom_sigma_t_scaling={0.1 0.1} \
        amplitude_scaling={1.0 1.0} central_weight={1.0 1.0} ";

    #[test]
    fn python_formatting_of_values() {
        assert_eq!(python_str(&toml::Value::Float(1.0)), "1.0");
        assert_eq!(python_str(&toml::Value::Float(0.1)), "0.1");
        assert_eq!(python_str(&toml::Value::Float(1e-5)), "1e-05");
        assert_eq!(python_str(&toml::Value::Boolean(false)), "False");
        let list = toml::Value::Array(vec![toml::Value::String("a".into()), toml::Value::Integer(1)]);
        assert_eq!(python_str(&list), "['a', 1]");
    }

    #[test]
    fn soap_string_keeps_table_order() {
        let params = SoapParams::new(soap_table());
        assert_eq!(
            params.descriptor_string(),
            "soap cutoff=5.0 l_max=4 n_max=8 atom_sigma=0.5 n_Z=2 Z={6 8} average=True "
        );
    }

    #[test]
    fn soap_names() {
        let params = SoapParams::new(soap_table());
        assert_eq!(
            params.save_name("0-100-1").unwrap(),
            "soap_rcut5.0_nmax8_lmax4_n_Z2_Z6 8_0-100-1"
        );
        assert_eq!(
            params.frame_by_frame_name("run1", 50, 5).unwrap(),
            "run1_soap_rcut5_n_Z2_Z6 8_Nframe50every5"
        );
    }

    #[test]
    fn soap_save_name_requires_its_keys() {
        let mut table = soap_table();
        table.remove("n_max");
        assert!(matches!(
            SoapParams::new(table).save_name("0-1-1"),
            Err(DescriptorError::MissingParameter("n_max"))
        ));
    }

    #[test]
    fn turbo_string_has_one_block_per_central_species() {
        let single = turbo("[3]");
        assert_eq!(
            single.descriptor_string().unwrap(),
            format!("soap_turbo {LI_BLOCK} ")
        );

        let double = turbo("[1, 3]").descriptor_string().unwrap();
        assert_eq!(double.matches("soap_turbo ").count(), 2);
        assert!(double.contains("central_index=1 "));
        assert!(double.contains("central_index=2 "));
    }

    #[test]
    fn gap_fit_string_doubles_braces_and_separates_blocks() {
        let s = turbo("[1, 3]").gap_fit_string().unwrap();
        let blocks: Vec<&str> = s.split(" : \n").collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].starts_with("soap_turbo species_Z={{1 3}} "));
        assert!(blocks[0].contains("central_index=1 "));
        assert!(blocks[0].ends_with("central_weight={{1.0 1.0}} "));
        assert!(blocks[1].ends_with("central_weight={{1.0 1.0}}  :"));
    }

    #[test]
    fn gap_fit_string_keeps_the_trailing_separator() {
        let s = turbo("[3]").gap_fit_string().unwrap();
        let doubled = LI_BLOCK.replace('{', "{{").replace('}', "}}");
        assert_eq!(s, format!("soap_turbo {doubled} :"));
    }

    #[test]
    fn turbo_save_name() {
        assert_eq!(
            turbo("[1, 3]").save_name("0-10-1").unwrap(),
            "turbo_rcutH6_rcutS5.0_nmax8_lmax4_n_Z2_Z1_0-10-1"
        );
    }

    #[test]
    fn unlisted_central_species_is_rejected() {
        assert!(matches!(
            DescriptorParams::from_table(turbo_table("[8]")),
            Err(DescriptorError::UnknownCentralSpecies(8))
        ));
        let mut table = turbo_table("[1]");
        table.insert("interpolate".into(), toml::Value::Boolean(true));
        assert!(matches!(
            DescriptorParams::from_table(table),
            Err(DescriptorError::InvalidParameters(_))
        ));
    }

    #[test]
    fn chunks_cover_all_frames_with_absolute_labels() {
        let range = FrameRange::new(100, None, 2).unwrap();
        let chunks = plan_chunks(25, 10, &range).unwrap();
        let spans: Vec<(usize, usize)> = chunks.iter().map(|c| (c.start, c.end)).collect();
        assert_eq!(spans, vec![(0, 10), (10, 20), (20, 25)]);
        assert_eq!(chunks[0].label, "100-120-2");
        assert_eq!(chunks[2].label, "140-150-2");
        assert_eq!(chunks[2].len(), 5);
        assert!(matches!(
            plan_chunks(5, 0, &range),
            Err(DescriptorError::ZeroChunk)
        ));
    }

    /// One row per atom: `[frame x of atom 0, atomic number]`.
    struct RowPerAtom {
        calls: AtomicUsize,
    }

    impl DescriptorBackend for RowPerAtom {
        fn compute(&self, frames: &[Frame]) -> Result<Array2<f64>, DescriptorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let rows: Vec<[f64; 2]> = frames
                .iter()
                .flat_map(|f| {
                    let x = f.positions()[0].x;
                    f.numbers().iter().map(move |&z| [x, z as f64])
                })
                .collect();
            Ok(Array2::from_shape_fn((rows.len(), 2), |(r, c)| rows[r][c]))
        }
    }

    fn frames(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|i| {
                Frame::new(
                    vec![3, 9],
                    vec![Point3::new(i as f64, 0.0, 0.0), Point3::new(5.0, 5.0, 5.0)],
                    Cell::cubic(10.0),
                    [true; 3],
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn chunk_evaluation_writes_one_array_per_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let params = DescriptorParams::Soap(SoapParams::new(soap_table()));
        let frames = frames(5);
        let chunks = plan_chunks(frames.len(), 2, &FrameRange::all()).unwrap();
        let backend = RowPerAtom {
            calls: AtomicUsize::new(0),
        };

        let written =
            evaluate_chunks(&backend, &params, &frames, &chunks, dir.path(), &ProgressReporter::new())
                .unwrap();
        assert_eq!(written.len(), 3);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert!(written[2].ends_with("soap_rcut5.0_nmax8_lmax4_n_Z2_Z6 8_4-5-1.npy"));

        let last: Array2<f64> = load_npy(&written[2]).unwrap();
        assert_eq!(last, ndarray::array![[4.0, 3.0], [4.0, 9.0]]);
    }

    #[test]
    fn frame_by_frame_concatenates_selected_frames() {
        let backend = RowPerAtom {
            calls: AtomicUsize::new(0),
        };
        let rows =
            evaluate_frame_by_frame(&backend, &frames(5), 5, 2, &ProgressReporter::new()).unwrap();
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert_eq!(rows.shape(), &[6, 2]);
        let xs: Vec<f64> = rows.column(0).iter().step_by(2).copied().collect();
        assert_eq!(xs, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn stacking_rejects_mismatched_columns() {
        let blocks = [Array2::<f64>::zeros((1, 3)), Array2::<f64>::zeros((1, 4))];
        assert!(matches!(
            stack_rows(&blocks),
            Err(DescriptorError::ColumnMismatch {
                expected: 3,
                actual: 4
            })
        ));
        assert!(matches!(stack_rows(&[]), Err(DescriptorError::EmptySelection)));
    }

    #[test]
    fn command_backend_substitutes_placeholders() {
        let backend = CommandBackend::new(
            "quip-descriptor",
            vec!["--descriptor={descriptor}".into(), "{input}".into(), "-o".into(), "{output}".into()],
            "soap cutoff=5.0 ",
        );
        let args = backend.render_args(Path::new("/tmp/in.xyz"), Path::new("/tmp/out.npy"));
        assert_eq!(
            args,
            vec!["--descriptor=soap cutoff=5.0 ", "/tmp/in.xyz", "-o", "/tmp/out.npy"]
        );
    }

    #[test]
    fn missing_command_is_reported() {
        let backend = CommandBackend::new("eltraj-no-such-descriptor-program", vec![], "soap");
        assert!(matches!(
            backend.compute(&frames(1)),
            Err(DescriptorError::Spawn { .. })
        ));
    }
}
