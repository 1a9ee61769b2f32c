use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SimError};
use crate::solver::{Executor, SolverParams, Sweep};
use crate::state::SimState;

/// File read when no `--config` path is given.
pub const DEFAULT_CONFIG_PATH: &str = "tidepool.yaml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub display: DisplayConfig,
    /// Stamps applied on start and reset. When absent, two drops and a gust
    /// are laid out for the configured grid.
    #[serde(default)]
    pub seeds: Option<Vec<Seed>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub width: usize,
    pub height: usize,
    pub diffusion: f64,
    pub viscosity: f64,
    pub iterations: usize,
    pub sweep: Sweep,
    pub executor: Executor,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub scale: usize,
    pub target_fps: usize,
    pub max_dt: f64,
    pub min_dt: f64,
}

/// Initial stamp applied on start and on reset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Seed {
    Drop { x: f64, y: f64, radius: f64, value: f64 },
    Wind { x: f64, y: f64, dx: f64, dy: f64 },
}

impl Seed {
    pub fn apply(&self, state: &mut SimState) {
        match *self {
            Seed::Drop { x, y, radius, value } => state.seed_density(x, y, radius, value),
            Seed::Wind { x, y, dx, dy } => state.seed_velocity(x, y, dx, dy),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let simulation = SimulationConfig::default();
        let seeds = default_seeds(simulation.width, simulation.height);
        Self {
            simulation,
            display: DisplayConfig::default(),
            seeds: Some(seeds),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 128,
            height: 96,
            diffusion: 0.0001,
            viscosity: 1.0,
            iterations: 150,
            sweep: Sweep::RedBlack,
            executor: Executor::Parallel,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            scale: 6,
            target_fps: 60,
            max_dt: 0.05,
            min_dt: 0.001,
        }
    }
}

/// Two stacked drops on the vertical centre line with a leftward gust
/// between them, laid out for a `width x height` grid.
pub fn default_seeds(width: usize, height: usize) -> Vec<Seed> {
    let (w, h) = (width as f64, height as f64);
    let radius = (h / 15.0).max(1.0);
    vec![
        Seed::Drop { x: w / 2.0, y: h * 0.6, radius, value: 0.9 },
        Seed::Drop { x: w / 2.0, y: h * 0.45, radius, value: 0.9 },
        Seed::Wind { x: w / 2.0, y: h * 0.5, dx: -10.0, dy: 0.0 },
    ]
}

impl Config {
    /// Solver parameters described by the `simulation` section, validated.
    pub fn solver_params(&self) -> Result<SolverParams> {
        let s = &self.simulation;
        let params = SolverParams {
            diff: s.diffusion,
            visc: s.viscosity,
            iterations: s.iterations,
            sweep: s.sweep,
            executor: s.executor,
        };
        params.validate()?;
        Ok(params)
    }

    /// Fresh state with the configured grid, parameters and seeds.
    pub fn build_state(&self) -> Result<SimState> {
        let mut state = SimState::new(self.simulation.width, self.simulation.height, self.solver_params()?)?;
        self.apply_seeds(&mut state);
        Ok(state)
    }

    /// Configured seeds, or the default layout for the configured grid.
    pub fn seeds(&self) -> Vec<Seed> {
        match &self.seeds {
            Some(seeds) => seeds.clone(),
            None => default_seeds(self.simulation.width, self.simulation.height),
        }
    }

    pub fn apply_seeds(&self, state: &mut SimState) {
        for seed in self.seeds() {
            seed.apply(state);
        }
    }
}

impl DisplayConfig {
    /// Clamp a measured frame time into `[min_dt, max_dt]`.
    pub fn clamp_dt(&self, elapsed: f64) -> f64 {
        if elapsed.is_nan() {
            return self.min_dt;
        }
        elapsed.max(self.min_dt).min(self.max_dt)
    }

    pub fn check(&self) -> Result<()> {
        if !(self.min_dt.is_finite() && self.min_dt > 0.0 && self.max_dt.is_finite() && self.max_dt >= self.min_dt) {
            return Err(SimError::Config(format!(
                "display: need 0 < min_dt <= max_dt, got min_dt={} max_dt={}",
                self.min_dt, self.max_dt
            )));
        }
        if self.scale == 0 || self.target_fps == 0 {
            return Err(SimError::Config("display: scale and target_fps must be positive".into()));
        }
        Ok(())
    }
}

/// Parse a YAML document into a config.
/// A missing `seeds` key resolves to the default layout for the parsed grid.
pub fn parse(contents: &str) -> Result<Config> {
    let mut cfg: Config = serde_yaml::from_str(contents).map_err(|e| SimError::Config(e.to_string()))?;
    if cfg.seeds.is_none() {
        cfg.seeds = Some(default_seeds(cfg.simulation.width, cfg.simulation.height));
    }
    Ok(cfg)
}

/// Load the config from `path`, or from `tidepool.yaml` when `None`.
/// A missing default file yields defaults; any read or parse failure is
/// logged and also yields defaults.
pub fn load(path: Option<&Path>) -> Config {
    let (path, explicit) = match path {
        Some(p) => (p, true),
        None => (Path::new(DEFAULT_CONFIG_PATH), false),
    };
    if !path.exists() {
        if explicit {
            log::warn!("config file {} not found; using defaults", path.display());
        }
        return Config::default();
    }
    match std::fs::read_to_string(path) {
        Ok(contents) => match parse(&contents) {
            Ok(cfg) => {
                log::debug!("loaded config from {}", path.display());
                cfg
            }
            Err(e) => {
                log::warn!("failed to parse {}: {e}; using defaults", path.display());
                Config::default()
            }
        },
        Err(e) => {
            log::warn!("failed to read {}: {e}; using defaults", path.display());
            Config::default()
        }
    }
}
