use eltraj::engine::unwrap::UnwrapMethod;

pub struct DefaultsConfig {
    pub output_dir: String,
    pub molecules_file: String,
    pub cutoff: f64,
    pub unwrap_method: UnwrapMethod,
    pub rdf_rmax: f64,
    pub rdf_nbins: usize,
    pub rdf_window: usize,
    pub rdf_file: String,
    pub env_rcut: f64,
    pub env_file: String,
    pub chunk: usize,
    pub outheader: String,
    pub backend_args: Vec<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: "eltraj-out".to_string(),
            molecules_file: "molecules.xyz".to_string(),
            cutoff: 1.0,
            unwrap_method: UnwrapMethod::Hybrid,
            rdf_rmax: 6.0,
            rdf_nbins: 60,
            rdf_window: 1,
            rdf_file: "rdf.csv".to_string(),
            env_rcut: 5.0,
            env_file: "environments.csv".to_string(),
            chunk: 10,
            outheader: "desc".to_string(),
            backend_args: vec![
                "{descriptor}".to_string(),
                "{input}".to_string(),
                "{output}".to_string(),
            ],
        }
    }
}
