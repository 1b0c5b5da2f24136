use crate::cli::{CheckArgs, OutputFormat};
use crate::config::{self, Overrides};
use crate::error::{CliError, Result};
use toymc::core::io::{traits::GeometryFile, xyz::XyzFile};
use toymc::engine::config::SimulationParameters;
use tracing::info;

pub fn run(args: CheckArgs) -> Result<()> {
    let resolved = config::resolve(&args.params, &Overrides::from(&args))?;
    println!("Parameter file '{}' is valid.", args.params.display());

    if !resolved.unknown_keys.is_empty() {
        println!(
            "Ignored unknown parameter(s): {}",
            resolved.unknown_keys.join(", ")
        );
    }

    if let Some(path) = &resolved.params.coordinates {
        info!("Checking starting geometry {:?}", path);
        let (geometry, _) = XyzFile::read_from_path(path).map_err(|e| CliError::FileParsing {
            path: path.clone(),
            source: e.into(),
        })?;
        println!(
            "Starting geometry '{}' holds {} atom(s).",
            path.display(),
            geometry.atom_count()
        );
    }

    println!();
    print!("{}", render(&resolved.params, args.format)?);
    Ok(())
}

/// Renders the resolved parameters in the requested format.
pub fn render(params: &SimulationParameters, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Params => Ok(format!("{}\n", params.to_value())),
        OutputFormat::Toml => toml::to_string(params).map_err(|e| CliError::Other(e.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use toymc::core::io::param;

    fn params() -> SimulationParameters {
        SimulationParameters {
            seed: 9,
            n_steps: 40,
            box_length: [6.0, 6.0, 6.0],
            vdw_cutoff: 2.5,
            coordinates: Some(PathBuf::from("start.xyz")),
            ..SimulationParameters::default()
        }
    }

    #[test]
    fn parameter_rendering_parses_back_to_the_same_values() {
        let text = render(&params(), OutputFormat::Params).unwrap();
        let mut reparsed = SimulationParameters::default();
        reparsed.bind(&param::loads(&text).unwrap()).unwrap();
        assert_eq!(reparsed, params());
    }

    #[test]
    fn toml_rendering_uses_parameter_file_names() {
        let text = render(&params(), OutputFormat::Toml).unwrap();
        let table: toml::Table = text.parse().unwrap();
        assert_eq!(table["seed"].as_integer(), Some(9));
        assert_eq!(table["VdW_cutoff"].as_float(), Some(2.5));
        assert_eq!(table["use_NpT"].as_bool(), Some(false));
        assert_eq!(table["coordinates"].as_str(), Some("start.xyz"));
        assert_eq!(table["box_length"].as_array().map(|a| a.len()), Some(3));
        assert!(!table.contains_key("output"));
    }

    #[test]
    fn check_verifies_the_starting_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.inp");
        fs::write(&path, "n_steps 2\ncoordinates \"start.xyz\"\n").unwrap();
        let args = CheckArgs {
            params: path.clone(),
            set_values: Vec::new(),
            format: OutputFormat::Params,
        };

        assert!(matches!(run(args), Err(CliError::FileParsing { .. })));

        fs::write(dir.path().join("start.xyz"), "1\nstart\nHe 0.1 0.1 0.1\n").unwrap();
        let args = CheckArgs {
            params: path,
            set_values: vec!["temperature=2.".to_string()],
            format: OutputFormat::Toml,
        };
        run(args).unwrap();
    }
}
