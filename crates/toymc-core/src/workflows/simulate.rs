use crate::core::io::traits::GeometryFile;
use crate::core::io::xyz::{XyzError, XyzFile, XyzMetadata};
use crate::core::models::geometry::Geometry;
use crate::engine::config::SimulationParameters;
use crate::engine::error::EngineError;
use crate::engine::monte_carlo::{MonteCarlo, MoveStats};
use crate::engine::progress::{Progress, ProgressReporter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, instrument};

/// A snapshot handed to a [`FrameSink`].
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub step: u64,
    pub geometry: &'a Geometry,
    pub box_length: [f64; 3],
    pub energy: f64,
    pub pressure: f64,
}

impl Frame<'_> {
    /// Title line used when the frame is stored as XYZ.
    pub fn title(&self) -> String {
        format!("E={:.3}, p={:.3}", self.energy, self.pressure)
    }
}

/// Destination for trajectory frames.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Frame<'_>) -> Result<(), XyzError>;

    fn finish(&mut self) -> Result<(), XyzError> {
        Ok(())
    }
}

/// Multi-frame XYZ trajectory: frames are concatenated XYZ documents.
pub struct XyzTrajectory<W: Write> {
    writer: W,
    frames: usize,
}

impl<W: Write> XyzTrajectory<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, frames: 0 }
    }

    pub fn frames_written(&self) -> usize {
        self.frames
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl XyzTrajectory<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, XyzError> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> FrameSink for XyzTrajectory<W> {
    fn write_frame(&mut self, frame: &Frame<'_>) -> Result<(), XyzError> {
        XyzFile::write_to(
            frame.geometry,
            &XyzMetadata::new(frame.title()),
            &mut self.writer,
        )?;
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), XyzError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub geometry: Geometry,
    pub box_length: [f64; 3],
    pub steps: u64,
    pub energy: f64,
    pub pressure: f64,
    /// Energy averaged over every step.
    pub mean_energy: f64,
    /// Pressure averaged over the steps sampled every `pressure_freq`.
    pub mean_pressure: f64,
    pub stats: MoveStats,
    pub frames_written: usize,
}

impl SimulationResult {
    /// The final configuration as XYZ metadata, titled with its energy and pressure.
    pub fn final_metadata(&self) -> XyzMetadata {
        XyzMetadata::new(format!("E={:.3}, p={:.3}", self.energy, self.pressure))
    }
}

#[instrument(skip_all, name = "simulation_workflow")]
pub fn run(
    geometry: Geometry,
    params: &SimulationParameters,
    reporter: &ProgressReporter,
    mut sink: Option<&mut dyn FrameSink>,
) -> Result<SimulationResult, EngineError> {
    // === Phase 1: Setup ===
    reporter.report(Progress::PhaseStart {
        name: "Initialization",
    });
    params.validate()?;
    let mut sampler = MonteCarlo::new(geometry, params)?;
    info!(
        "Starting simulation: {} atoms, density {:.4}, seed {}.",
        sampler.geometry().atom_count(),
        sampler.density(),
        params.seed
    );
    info!(
        "Initial state: U = {:.3}, p = {:.3}.",
        sampler.energy(),
        sampler.pressure()
    );
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Sampling ===
    reporter.report(Progress::PhaseStart { name: "Sampling" });
    reporter.report(Progress::TaskStart {
        total_steps: params.n_steps,
    });

    let mut energy_sum = 0.0;
    let mut pressure_sum = 0.0;
    let mut pressure_samples = 0u64;
    let mut frames_written = 0;

    for step in 1..=params.n_steps {
        sampler.step();

        let energy = sampler.energy();
        if !energy.is_finite() {
            return Err(EngineError::Diverged { step, energy });
        }
        energy_sum += energy;

        if step % params.pressure_freq == 0 {
            pressure_sum += sampler.pressure();
            pressure_samples += 1;
        }

        if step % params.print_freq == 0 {
            let pressure = sampler.pressure();
            info!("{:>6}: U = {:.3}, p = {:.3}", step, energy, pressure);
            reporter.report(Progress::Sample {
                step,
                energy,
                pressure,
                acceptance: sampler.stats().displacement_ratio(),
            });
        }

        if step % params.output_freq == 0 {
            if let Some(sink) = sink.as_deref_mut() {
                let frame = Frame {
                    step,
                    geometry: sampler.geometry(),
                    box_length: sampler.cell().lengths(),
                    energy,
                    pressure: sampler.pressure(),
                };
                sink.write_frame(&frame)
                    .map_err(|source| EngineError::Output { step, source })?;
                frames_written += 1;
            }
        }

        reporter.report(Progress::TaskIncrement);
    }

    if let Some(sink) = sink.as_deref_mut() {
        sink.finish().map_err(|source| EngineError::Output {
            step: params.n_steps,
            source,
        })?;
    }
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Results ===
    let stats = sampler.stats();
    info!(
        "Simulation complete: displacement acceptance {:.1}%{}.",
        stats.displacement_ratio() * 100.0,
        if params.use_npt {
            format!(", volume acceptance {:.1}%", stats.volume_ratio() * 100.0)
        } else {
            String::new()
        }
    );

    let energy = sampler.energy();
    let pressure = sampler.pressure();
    let box_length = sampler.cell().lengths();

    Ok(SimulationResult {
        geometry: sampler.into_geometry(),
        box_length,
        steps: params.n_steps,
        energy,
        pressure,
        mean_energy: energy_sum / params.n_steps as f64,
        mean_pressure: if pressure_samples == 0 {
            pressure
        } else {
            pressure_sum / pressure_samples as f64
        },
        stats,
        frames_written,
    })
}
