use crate::cli::RunArgs;
use crate::config::{self, Overrides};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use std::path::Path;
use toymc::{
    core::{
        io::{traits::GeometryFile, xyz::XyzFile},
        models::geometry::Geometry,
    },
    engine::{config::SimulationParameters, progress::ProgressReporter},
    workflows::simulate::{self, FrameSink, SimulationResult, XyzTrajectory},
};
use tracing::{info, warn};

pub fn run(args: RunArgs, quiet: bool) -> Result<()> {
    let resolved = config::resolve(&args.params, &Overrides::from(&args))?;
    for key in &resolved.unknown_keys {
        println!("Warning: ignoring unknown parameter '{}'.", key);
    }
    let params = resolved.params;

    let geometry = load_geometry(&args, &params)?;

    let mut trajectory = match &params.output {
        Some(path) => {
            info!("Writing trajectory frames to {:?}", path);
            Some(XyzTrajectory::create(path).map_err(|e| CliError::FileParsing {
                path: path.clone(),
                source: e.into(),
            })?)
        }
        None => None,
    };

    let progress_handler = (!args.no_progress && !quiet).then(CliProgressHandler::new);
    let reporter = match &progress_handler {
        Some(handler) => ProgressReporter::with_callback(handler.get_callback()),
        None => ProgressReporter::new(),
    };

    println!(
        "Starting {} simulation of {} atoms for {} steps (seed {})...",
        if params.use_npt { "NpT" } else { "NVT" },
        geometry.atom_count(),
        params.n_steps,
        params.seed
    );
    info!("Invoking the core simulation workflow...");

    let result = simulate::run(
        geometry,
        &params,
        &reporter,
        trajectory.as_mut().map(|t| t as &mut dyn FrameSink),
    )?;

    if let Some(path) = &args.final_geometry {
        write_final_geometry(path, &result)?;
        println!("Final configuration written to: {}", path.display());
    }

    print_summary(&params, &result);
    Ok(())
}

fn load_geometry(args: &RunArgs, params: &SimulationParameters) -> Result<Geometry> {
    if let Some(atom_count) = args.lattice {
        info!(
            "Building a cubic lattice of {} '{}' atoms.",
            atom_count, args.element
        );
        return Geometry::cubic_lattice(atom_count, params.box_length, &args.element)
            .map_err(|e| CliError::Argument(format!("Invalid --lattice {}: {}", atom_count, e)));
    }

    let Some(path) = &params.coordinates else {
        return Err(CliError::Argument(
            "No starting geometry: set 'coordinates' in the parameter file, or pass --coordinates or --lattice.".to_string(),
        ));
    };

    info!("Loading starting geometry from {:?}", path);
    let (geometry, metadata) =
        XyzFile::read_from_path(path).map_err(|e| CliError::FileParsing {
            path: path.clone(),
            source: e.into(),
        })?;
    if geometry.is_empty() {
        warn!("Starting geometry '{}' contains no atoms.", metadata.title);
    }
    Ok(geometry)
}

fn write_final_geometry(path: &Path, result: &SimulationResult) -> Result<()> {
    info!("Writing final configuration to {:?}", path);
    XyzFile::write_to_path(&result.geometry, &result.final_metadata(), path).map_err(|e| {
        CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        }
    })
}

fn print_summary(params: &SimulationParameters, result: &SimulationResult) {
    println!("Simulation complete after {} steps.", result.steps);
    println!(
        "  Final energy:    {:>12.4}   (mean {:.4})",
        result.energy, result.mean_energy
    );
    println!(
        "  Final pressure:  {:>12.4}   (mean {:.4})",
        result.pressure, result.mean_pressure
    );
    println!(
        "  Displacement acceptance: {:.1}%",
        result.stats.displacement_ratio() * 100.0
    );
    if params.use_npt {
        println!(
            "  Volume acceptance:       {:.1}%",
            result.stats.volume_ratio() * 100.0
        );
        println!(
            "  Final box: [{:.4} {:.4} {:.4}]",
            result.box_length[0], result.box_length[1], result.box_length[2]
        );
    }
    if let Some(output) = &params.output {
        println!(
            "  {} frame(s) written to: {}",
            result.frames_written,
            output.display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["toymc", "run"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::Run(args) => args,
            _ => panic!("Expected 'run' subcommand"),
        }
    }

    #[test]
    fn lattice_run_writes_trajectory_and_final_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let params = dir.path().join("sim.inp");
        fs::write(
            &params,
            "seed 3\nn_steps 6\noutput_freq 2\nbox_length [5. 5. 5.]\nVdW_cutoff 2.\n\
             output \"traj.xyz\"\n",
        )
        .unwrap();
        let final_path = dir.path().join("final.xyz");

        let args = run_args(&[
            params.to_str().unwrap(),
            "--lattice",
            "8",
            "--element",
            "Ar",
            "--final",
            final_path.to_str().unwrap(),
            "--no-progress",
        ]);
        run(args, false).unwrap();

        let trajectory = fs::read_to_string(dir.path().join("traj.xyz")).unwrap();
        assert_eq!(trajectory.lines().filter(|l| *l == "8").count(), 3);

        let (geometry, metadata) = XyzFile::read_from_path(&final_path).unwrap();
        assert_eq!(geometry.atom_count(), 8);
        assert_eq!(geometry.type_labels(), ["Ar".to_string()]);
        assert!(metadata.title.starts_with("E="));
    }

    #[test]
    fn coordinates_are_read_relative_to_the_parameter_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("start.xyz"),
            "2\npair\nNe 0.0 0.0 0.0\nNe 1.5 0.0 0.0\n",
        )
        .unwrap();
        let params = dir.path().join("sim.inp");
        fs::write(
            &params,
            "seed 1\nn_steps 2\nbox_length [4. 4. 4.]\nVdW_cutoff 1.5\ncoordinates \"start.xyz\"\n",
        )
        .unwrap();

        let args = run_args(&[params.to_str().unwrap(), "-q", "--no-progress"]);
        run(args, true).unwrap();
    }

    #[test]
    fn oversized_lattice_is_an_argument_error() {
        let dir = tempfile::tempdir().unwrap();
        let params = dir.path().join("sim.inp");
        fs::write(&params, "n_steps 2\n").unwrap();

        let lattice = usize::MAX.to_string();
        let args = run_args(&[params.to_str().unwrap(), "--lattice", &lattice, "--no-progress"]);
        assert!(matches!(run(args, false), Err(CliError::Argument(_))));
    }

    #[test]
    fn missing_geometry_is_an_argument_error() {
        let dir = tempfile::tempdir().unwrap();
        let params = dir.path().join("sim.inp");
        fs::write(&params, "n_steps 2\n").unwrap();

        let args = run_args(&[params.to_str().unwrap(), "--no-progress"]);
        assert!(matches!(run(args, false), Err(CliError::Argument(_))));
    }

    #[test]
    fn unreadable_coordinates_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.xyz"), "3\ntitle\nHe 0.0 0.0\n").unwrap();
        let params = dir.path().join("sim.inp");
        fs::write(&params, "n_steps 2\ncoordinates \"bad.xyz\"\n").unwrap();

        let args = run_args(&[params.to_str().unwrap(), "--no-progress"]);
        let err = run(args, false).unwrap_err();
        assert!(matches!(err, CliError::FileParsing { .. }));
        assert!(err.to_string().contains("bad.xyz"));
    }
}
