use super::ensure_dir;
use crate::core::io::npy::save_npy;
use crate::core::models::trajectory::Trajectory;
use crate::engine::config::{DescriptorConfig, DescriptorMode};
use crate::engine::descriptor::{
    DescriptorBackend, evaluate_chunks, evaluate_frame_by_frame, plan_chunks,
};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use std::path::PathBuf;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorOutput {
    pub descriptor_string: String,
    pub written: Vec<PathBuf>,
}

#[instrument(skip_all, name = "descriptor_workflow")]
pub fn run(
    trajectory: &Trajectory,
    config: &DescriptorConfig,
    backend: &dyn DescriptorBackend,
    reporter: &ProgressReporter,
) -> Result<DescriptorOutput, EngineError> {
    let descriptor_string = config.params.descriptor_string()?;
    info!(descriptor = %descriptor_string, "Descriptor parameters.");
    ensure_dir(&config.output_dir)?;

    let written = match &config.mode {
        DescriptorMode::Chunked { chunk } => {
            reporter.report(Progress::phase("Computing Descriptor (chunks)"));
            let chunks = plan_chunks(trajectory.len(), *chunk, trajectory.range())?;
            let written = evaluate_chunks(
                backend,
                &config.params,
                trajectory.frames(),
                &chunks,
                &config.output_dir,
                reporter,
            )?;
            reporter.report(Progress::PhaseFinish);
            written
        }
        DescriptorMode::FrameByFrame {
            n_frames,
            every,
            outheader,
        } => {
            reporter.report(Progress::phase("Computing Descriptor (frame by frame)"));
            let rows =
                evaluate_frame_by_frame(backend, trajectory.frames(), *n_frames, *every, reporter)?;
            let name = config
                .params
                .frame_by_frame_name(outheader, *n_frames, *every)?;
            let path = save_npy(&config.output_dir.join(name), &rows)?;
            reporter.report(Progress::PhaseFinish);
            vec![path]
        }
    };

    info!(files = written.len(), "Descriptor arrays written.");
    Ok(DescriptorOutput {
        descriptor_string,
        written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::npy::load_npy;
    use crate::core::models::frame::Frame;
    use crate::engine::config::DescriptorConfigBuilder;
    use crate::engine::descriptor::{DescriptorError, DescriptorParams};
    use crate::workflows::loader::{self, tests::fixture_config};
    use ndarray::Array2;

    /// One row per frame holding its atom count and the sum of atomic numbers.
    struct Counts;

    impl DescriptorBackend for Counts {
        fn compute(&self, frames: &[Frame]) -> Result<Array2<f64>, DescriptorError> {
            Ok(Array2::from_shape_fn((frames.len(), 2), |(i, c)| match c {
                0 => frames[i].len() as f64,
                _ => frames[i].numbers().iter().map(|&z| z as f64).sum(),
            }))
        }
    }

    fn soap() -> DescriptorParams {
        let table: toml::Table = r#"
            type = "soap"
            cutoff = 4.0
            n_max = 6
            l_max = 4
            n_Z = 1
            Z = "{3}"
        "#
        .parse()
        .unwrap();
        DescriptorParams::from_table(table).unwrap()
    }

    #[test]
    fn chunked_mode_writes_labelled_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = loader::run(&fixture_config(dir.path()).build().unwrap(), &ProgressReporter::new())
            .unwrap();
        let config = DescriptorConfigBuilder::new()
            .params(soap())
            .mode(DescriptorMode::Chunked { chunk: 2 })
            .output_dir(dir.path().join("descr"))
            .build()
            .unwrap();

        let output = run(&loaded.trajectory, &config, &Counts, &ProgressReporter::new()).unwrap();
        assert_eq!(output.descriptor_string, "soap cutoff=4.0 n_max=6 l_max=4 n_Z=1 Z={3} ");
        let names: Vec<String> = output
            .written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "soap_rcut4.0_nmax6_lmax4_n_Z1_Z3_0-2-1.npy",
                "soap_rcut4.0_nmax6_lmax4_n_Z1_Z3_2-3-1.npy",
            ]
        );
    }

    #[test]
    fn frame_by_frame_mode_writes_one_array() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = loader::run(&fixture_config(dir.path()).build().unwrap(), &ProgressReporter::new())
            .unwrap();
        let config = DescriptorConfigBuilder::new()
            .params(soap())
            .mode(DescriptorMode::FrameByFrame {
                n_frames: 3,
                every: 1,
                outheader: "run".to_string(),
            })
            .output_dir(dir.path().join("descr"))
            .build()
            .unwrap();

        let output = run(&loaded.trajectory, &config, &Counts, &ProgressReporter::new()).unwrap();
        assert_eq!(output.written.len(), 1);
        assert!(output.written[0].ends_with("run_soap_rcut4_n_Z1_Z3_Nframe3every1.npy"));
        let rows: Array2<f64> = load_npy(&output.written[0]).unwrap();
        assert_eq!(rows, ndarray::array![[4.0, 13.0], [4.0, 13.0], [4.0, 13.0]]);
    }
}
