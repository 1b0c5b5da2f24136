use crate::cli::{CheckArgs, RunArgs};
use crate::error::{CliError, Result};
use std::path::{Path, PathBuf};
use toymc::core::io::param;
use toymc::core::models::value::Value;
use toymc::engine::config::{self as core_config, SimulationParameters};
use tracing::{debug, info};

/// Parameters ready for a run, with the keys the file declared but the
/// simulation does not use.
#[derive(Debug, Clone)]
pub struct ResolvedParameters {
    pub params: SimulationParameters,
    pub unknown_keys: Vec<String>,
}

/// Command-line values that take precedence over the parameter file.
#[derive(Debug, Clone, Default)]
pub struct Overrides<'a> {
    pub set_values: &'a [String],
    pub seed: Option<i64>,
    pub steps: Option<u64>,
    pub coordinates: Option<&'a Path>,
    pub output: Option<&'a Path>,
}

impl<'a> From<&'a RunArgs> for Overrides<'a> {
    fn from(args: &'a RunArgs) -> Self {
        Self {
            set_values: &args.set_values,
            seed: args.seed,
            steps: args.steps,
            coordinates: args.coordinates.as_deref(),
            output: args.output.as_deref(),
        }
    }
}

impl<'a> From<&'a CheckArgs> for Overrides<'a> {
    fn from(args: &'a CheckArgs) -> Self {
        Self {
            set_values: &args.set_values,
            ..Self::default()
        }
    }
}

/// Loads a parameter file and layers the command-line overrides on top.
///
/// Precedence, lowest first: built-in defaults, the file, `-S KEY=VALUE`, then
/// dedicated flags such as `--seed`. Relative paths inside the file are taken
/// relative to the file's directory; paths given on the command line are used
/// as is.
pub fn resolve(path: &Path, overrides: &Overrides<'_>) -> Result<ResolvedParameters> {
    debug!("Loading parameters from file: {:?}", path);
    let mut document = param::load_path(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })?;

    apply_set_values(&mut document, overrides.set_values)?;

    let mut params = SimulationParameters::default();
    let unknown_keys = params.bind(&document)?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    params.coordinates = params.coordinates.map(|p| relative_to(base_dir, p));
    params.output = params.output.map(|p| relative_to(base_dir, p));

    if let Some(seed) = overrides.seed {
        params.seed = seed;
    }
    if let Some(steps) = overrides.steps {
        params.n_steps = steps;
    }
    if let Some(coordinates) = overrides.coordinates {
        params.coordinates = Some(coordinates.to_path_buf());
    }
    if let Some(output) = overrides.output {
        params.output = Some(output.to_path_buf());
    }

    params.validate()?;
    info!(
        "Resolved parameters from {:?} ({} unknown key(s) ignored).",
        path,
        unknown_keys.len()
    );

    Ok(ResolvedParameters {
        params,
        unknown_keys,
    })
}

fn relative_to(base_dir: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

/// Applies `KEY=VALUE` pairs to a parsed parameter document.
///
/// `VALUE` is written in the parameter language, so `-S box_length=[4. 4. 4.]`
/// and `-S output="run.xyz"` work as in a file.
fn apply_set_values(document: &mut Value, set_values: &[String]) -> Result<()> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Argument(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let key = key.trim();

        if !core_config::is_known_key(key) {
            return Err(CliError::Argument(format!(
                "Unsupported parameter for --set: '{}'",
                key
            )));
        }

        let value = param::loads_value(value_str).map_err(|e| {
            CliError::Argument(format!("Invalid value for {}: '{}' ({})", key, value_str, e))
        })?;

        debug!("Overriding '{}' from the command line.", key);
        document
            .object_set(key, value)
            .map_err(|e| CliError::Other(e.into()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn write_params(content: &str) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sim.inp");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    const BASE: &str = "\
        seed 11\n\
        n_steps 20\n\
        box_length [6. 6. 6.]\n\
        VdW_cutoff 2.5\n\
        coordinates \"start.xyz\"\n\
        comment \"not a simulation key\"\n";

    #[test]
    fn file_values_are_loaded_over_defaults() {
        let (dir, path) = write_params(BASE);
        let resolved = resolve(&path, &Overrides::default()).unwrap();
        assert_eq!(resolved.params.seed, 11);
        assert_eq!(resolved.params.n_steps, 20);
        assert_eq!(resolved.params.temperature, 1.0);
        assert_eq!(resolved.params.coordinates, Some(dir.path().join("start.xyz")));
        assert_eq!(resolved.unknown_keys, vec!["comment".to_string()]);
    }

    #[test]
    fn set_values_override_file_and_flags_override_both() {
        let (_dir, path) = write_params(BASE);
        let set_values = vec![
            "temperature=0.75".to_string(),
            "n_steps=40".to_string(),
            "box_length=[7. 7. 8.]".to_string(),
        ];
        let overrides = Overrides {
            set_values: &set_values,
            steps: Some(5),
            seed: Some(-1),
            coordinates: Some(Path::new("other.xyz")),
            ..Overrides::default()
        };

        let resolved = resolve(&path, &overrides).unwrap();
        assert_eq!(resolved.params.temperature, 0.75);
        assert_eq!(resolved.params.box_length, [7.0, 7.0, 8.0]);
        assert_eq!(resolved.params.n_steps, 5);
        assert_eq!(resolved.params.seed, -1);
        assert_eq!(resolved.params.coordinates, Some(PathBuf::from("other.xyz")));
    }

    #[test]
    fn malformed_set_values_are_rejected() {
        let (_dir, path) = write_params(BASE);
        for bad in [
            "temperature",
            "nonsense=1",
            "temperature=hot",
            "temperature=1. 2.",
            "temperature=1. x 2.",
            "temperature=1. temperature 2.",
            "temperature=",
        ] {
            let set_values = vec![bad.to_string()];
            let overrides = Overrides {
                set_values: &set_values,
                ..Overrides::default()
            };
            assert!(
                matches!(resolve(&path, &overrides), Err(CliError::Argument(_))),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn type_errors_in_overrides_surface_as_config_errors() {
        let (_dir, path) = write_params(BASE);
        let set_values = vec!["temperature=1".to_string()];
        let overrides = Overrides {
            set_values: &set_values,
            ..Overrides::default()
        };
        assert!(matches!(
            resolve(&path, &overrides),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn syntax_errors_name_the_file() {
        let (_dir, path) = write_params("seed 1\ntemperature\n");
        let err = resolve(&path, &Overrides::default()).unwrap_err();
        assert!(matches!(err, CliError::FileParsing { .. }));
        assert!(err.to_string().contains("sim.inp"));
    }

    #[test]
    fn absolute_paths_in_file_are_kept() {
        let (_dir, path) = write_params("output \"/tmp/toymc-traj.xyz\"\n");
        let resolved = resolve(&path, &Overrides::default()).unwrap();
        assert_eq!(resolved.params.output, Some(PathBuf::from("/tmp/toymc-traj.xyz")));
    }
}
