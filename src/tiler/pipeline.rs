//! The per-tile pipeline executor.
//!
//! A pipeline is an ordered list of named steps plus a final union
//! function. Tiles within a step complete in unspecified order; a step
//! never starts before the previous one has finished every tile it may
//! read through `get_prev_region`. Completed tiles are skipped on
//! re-runs, so a partially finished pipeline resumes from the first
//! missing tile.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{info, warn};
use ndarray::Array2;
use rayon::prelude::*;

use crate::error::{Error, Result};

use super::cancel::Coordinator;
use super::config::{tile_grid, ExecMode, PipelineParams, RunConfig, StoreKind};
use super::store::{DiskStore, MemoryStore, TileStore};
use super::{StepParams, TileData, TileParams};

pub type StepFn<'a> = Box<dyn Fn(&TileParams, &StepHelper) -> Result<()> + Send + Sync + 'a>;
pub type UnionFn<'a> = Box<dyn FnOnce(&StepHelper) -> Result<()> + 'a>;

/// The callbacks handed to a step function, bound to the current and
/// previous step of one store.
pub struct StepHelper<'a> {
    store: &'a dyn TileStore,
    curr: Option<&'a StepParams>,
    prev: Option<&'a StepParams>,
    regions_allowed: bool,
}

impl<'a> StepHelper<'a> {
    fn new(
        store: &'a dyn TileStore,
        curr: Option<&'a StepParams>,
        prev: Option<&'a StepParams>,
        regions_allowed: bool,
    ) -> Self {
        Self {
            store,
            curr,
            prev,
            regions_allowed,
        }
    }

    fn curr(&self) -> &StepParams {
        self.curr.expect("step helper has no current step")
    }

    fn prev(&self) -> &StepParams {
        self.prev.expect("step helper has no previous step")
    }

    pub fn has_curr_tile(&self, tile: &TileParams) -> bool {
        self.store.has_tile(self.curr(), tile)
    }

    pub fn save_curr_tile(&self, tile: &TileParams, data: TileData) -> Result<()> {
        self.store.save_tile(self.curr(), tile, data)
    }

    pub fn get_prev_tile(&self, tile: &TileParams) -> Result<Option<TileData>> {
        self.store.get_tile(self.prev(), tile)
    }

    /// Assemble a buffered rectangle of the previous step's output.
    /// Forbidden in independent mode, where the previous step is only
    /// materialized for this worker's own tile.
    pub fn get_prev_region(&self, region: &TileParams) -> Result<Array2<i32>> {
        assert!(
            self.regions_allowed,
            "get_prev_region is not available when tiles run independently"
        );
        self.store.get_region(self.prev(), region)
    }

    pub fn get_prev_tiles(&self) -> Result<Vec<(TileParams, TileData)>> {
        self.store.get_all_tiles(self.prev())
    }
}

pub struct Pipeline<'a> {
    steps: Vec<(StepParams, StepFn<'a>)>,
    union: UnionFn<'a>,
    params: PipelineParams,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        steps: Vec<(StepParams, StepFn<'a>)>,
        union: UnionFn<'a>,
        params: PipelineParams,
    ) -> Self {
        Self {
            steps,
            union,
            params,
        }
    }

    /// Run every step over every tile, then the union function.
    pub fn run(self) -> Result<()> {
        let Pipeline {
            steps,
            union,
            params,
        } = self;
        assert!(!steps.is_empty(), "pipeline needs at least one step");

        let coordinator = Coordinator::install();
        let config = RunConfig::choose(&params, steps.len())?;

        let store: Box<dyn TileStore> = match config.store {
            StoreKind::Disk => Box::new(DiskStore::new(
                config.work_dir.clone(),
                params.width,
                params.height,
                config.tile_size,
            )?),
            StoreKind::Memory => Box::new(MemoryStore::new(
                params.width,
                params.height,
                config.tile_size,
            )),
        };

        let tiles = tile_grid(params.width, params.height, config.tile_size);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
            .map_err(|e| Error::Config(format!("cannot build worker pool: {e}")))?;

        let result = match config.mode {
            ExecMode::StepWise { parallel } => run_step_wise(
                &steps,
                &coordinator,
                &config,
                store.as_ref(),
                &tiles,
                &pool,
                parallel,
            ),
            ExecMode::Independent => run_independent(
                &steps,
                &coordinator,
                &config,
                store.as_ref(),
                &tiles,
                &pool,
            ),
        }
        .and_then(|_| run_union(&steps, union, &coordinator, &config, store.as_ref()));

        if matches!(result, Err(Error::Cancelled)) {
            info!("clean exit");
            log_line(&config, "clean exit");
            return result;
        }
        result?;

        if config.store == StoreKind::Disk && config.cleanup {
            info!("removing working directory: {}", config.work_dir.display());
            if let Err(e) = std::fs::remove_dir_all(&config.work_dir) {
                warn!(
                    "could not remove working directory {}: {e}",
                    config.work_dir.display()
                );
            }
        }
        Ok(())
    }
}

fn run_step_wise(
    steps: &[(StepParams, StepFn<'_>)],
    coordinator: &Coordinator,
    config: &RunConfig,
    store: &dyn TileStore,
    tiles: &[TileParams],
    pool: &rayon::ThreadPool,
    parallel: bool,
) -> Result<()> {
    for i in 0..steps.len() {
        let (step, func) = &steps[i];
        let prev = i.checked_sub(1).map(|p| &steps[p].0);
        info!("[{}] processing {} tiles", step.name(), tiles.len());

        let process = |tile: &TileParams| {
            if coordinator.cancelled() {
                return;
            }
            let helper = StepHelper::new(store, Some(step), prev, true);
            if helper.has_curr_tile(tile) {
                return;
            }
            if let Err(e) = func(tile, &helper) {
                handle_fault(config, step.name(), Some(tile), &e);
            }
        };

        if parallel {
            pool.install(|| tiles.par_iter().for_each(process));
        } else {
            tiles.iter().for_each(process);
        }
        coordinator.checkpoint()?;
    }
    Ok(())
}

fn run_independent(
    steps: &[(StepParams, StepFn<'_>)],
    coordinator: &Coordinator,
    config: &RunConfig,
    shared: &dyn TileStore,
    tiles: &[TileParams],
    pool: &rayon::ThreadPool,
) -> Result<()> {
    let (width, height, tile_size) = shared.grid_dims();
    let (last_step, _) = steps.last().expect("pipeline has steps");
    info!(
        "processing {} tiles independently through {} steps",
        tiles.len(),
        steps.len()
    );

    pool.install(|| {
        tiles.par_iter().for_each(|tile| {
            if coordinator.cancelled() {
                return;
            }
            if shared.has_tile(last_step, tile) {
                return;
            }

            // This worker owns the whole store for its one tile.
            let private = MemoryStore::new(width, height, tile_size);
            for i in 0..steps.len() {
                let (step, func) = &steps[i];
                let prev = i.checked_sub(1).map(|p| &steps[p].0);
                let helper = StepHelper::new(&private, Some(step), prev, false);
                if let Err(e) = func(tile, &helper) {
                    handle_fault(config, step.name(), Some(tile), &e);
                    return;
                }
            }

            match private.get_tile(last_step, tile) {
                Ok(Some(data)) => {
                    if let Err(e) = shared.save_tile(last_step, tile, data) {
                        handle_fault(config, last_step.name(), Some(tile), &e);
                    }
                }
                Ok(None) => {}
                Err(e) => handle_fault(config, last_step.name(), Some(tile), &e),
            }
        });
    });
    coordinator.checkpoint()
}

fn run_union(
    steps: &[(StepParams, StepFn<'_>)],
    union: UnionFn<'_>,
    coordinator: &Coordinator,
    config: &RunConfig,
    store: &dyn TileStore,
) -> Result<()> {
    coordinator.checkpoint()?;
    let (last_step, _) = steps.last().expect("pipeline has steps");
    let helper = StepHelper::new(store, None, Some(last_step), true);

    // Any union failure is fatal to the run.
    let result = union(&helper);
    if let Err(e) = &result {
        handle_fault(config, "union", None, e);
    }
    result
}

/// Record a per-tile fault: warn on the log facade and append a
/// timestamped line to this worker's file under the log directory.
fn handle_fault(config: &RunConfig, step: &str, tile: Option<&TileParams>, error: &Error) {
    let message = match tile {
        Some(tile) => Error::WorkerFault {
            step: step.to_string(),
            tile: *tile,
            message: error.to_string(),
        }
        .to_string(),
        None => format!("step `{step}` failed: {error}"),
    };
    warn!("{message}");
    log_line(config, &message);
}

fn log_line(config: &RunConfig, message: &str) {
    let worker = rayon::current_thread_index()
        .map(|i| i.to_string())
        .unwrap_or_else(|| "main".to_string());
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let path = config.log_dir.join(format!("log-{worker}"));
    let line = format!("[{timestamp}] worker {worker}: {message}\n");
    let appended = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .and_then(|mut file| file.write_all(line.as_bytes()));
    if let Err(e) = appended {
        warn!("could not write log file {}: {e}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use ndarray::Array2;

    use super::*;
    use crate::tiler::StepKind;

    // Pipelines share the process-wide cancellation flag; tests that
    // touch it must not interleave.
    static PIPELINE_LOCK: Mutex<()> = Mutex::new(());

    fn raster_step<'a>(
        calls: &'a AtomicUsize,
    ) -> (StepParams, StepFn<'a>) {
        (
            StepParams::new("fill", StepKind::Raster),
            Box::new(move |tile: &TileParams, helper: &StepHelper| {
                calls.fetch_add(1, Ordering::SeqCst);
                helper.save_curr_tile(tile, TileData::Raster(Array2::zeros((2, 2))))
            }),
        )
    }

    fn params(work_dir: Option<std::path::PathBuf>, debug: bool) -> PipelineParams {
        PipelineParams {
            width: 4,
            height: 4,
            tile_size: 2,
            workers: 1,
            work_dir,
            debug,
            uses_regions: false,
        }
    }

    #[test]
    fn runs_every_tile_then_the_union() {
        let _guard = PIPELINE_LOCK.lock().unwrap();
        let calls = AtomicUsize::new(0);
        let union_tiles = AtomicUsize::new(0);

        let pipeline = Pipeline::new(
            vec![raster_step(&calls)],
            Box::new(|helper: &StepHelper| {
                union_tiles.store(helper.get_prev_tiles()?.len(), Ordering::SeqCst);
                Ok(())
            }),
            params(None, false),
        );
        pipeline.run().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(union_tiles.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn union_failure_is_fatal() {
        let _guard = PIPELINE_LOCK.lock().unwrap();
        let calls = AtomicUsize::new(0);

        let pipeline = Pipeline::new(
            vec![raster_step(&calls)],
            Box::new(|_helper: &StepHelper| {
                Err(Error::Topology("union came apart".to_string()))
            }),
            params(None, false),
        );
        assert!(matches!(pipeline.run(), Err(Error::Topology(_))));
    }

    #[test]
    fn per_tile_faults_do_not_abort_the_run() {
        let _guard = PIPELINE_LOCK.lock().unwrap();
        let union_tiles = AtomicUsize::new(0);

        let step: (StepParams, StepFn) = (
            StepParams::new("fill", StepKind::Raster),
            Box::new(|tile: &TileParams, helper: &StepHelper| {
                if tile.start_x == 0 && tile.start_y == 0 {
                    return Err(Error::Geometry("bad tile".to_string()));
                }
                helper.save_curr_tile(tile, TileData::Raster(Array2::zeros((2, 2))))
            }),
        );
        let pipeline = Pipeline::new(
            vec![step],
            Box::new(|helper: &StepHelper| {
                union_tiles.store(helper.get_prev_tiles()?.len(), Ordering::SeqCst);
                Ok(())
            }),
            params(None, false),
        );
        pipeline.run().unwrap();

        // Three tiles completed; the faulty one was isolated.
        assert_eq!(union_tiles.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn resume_skips_completed_tiles() {
        let _guard = PIPELINE_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let calls = AtomicUsize::new(0);

        let run_once = |calls: &AtomicUsize| {
            // Debug forces the disk store and keeps the directory.
            let p = params(Some(dir.path().to_path_buf()), true);
            let pipeline = Pipeline::new(
                vec![raster_step(calls)],
                Box::new(|_helper: &StepHelper| Ok(())),
                p,
            );
            pipeline.run().unwrap();
        };

        run_once(&calls);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        run_once(&calls);
        // Everything was already materialized on disk.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn cancellation_unwinds_without_output() {
        let _guard = PIPELINE_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let union_ran = AtomicUsize::new(0);

        let step: (StepParams, StepFn) = (
            StepParams::new("fill", StepKind::Raster),
            Box::new(|tile: &TileParams, helper: &StepHelper| {
                helper.save_curr_tile(tile, TileData::Raster(Array2::zeros((2, 2))))?;
                // Simulate SIGINT after the first completed tile.
                Coordinator::install().cancel();
                Ok(())
            }),
        );
        let p = params(Some(dir.path().to_path_buf()), true);
        let pipeline = Pipeline::new(
            vec![step],
            Box::new(|_helper: &StepHelper| {
                union_ran.store(1, Ordering::SeqCst);
                Ok(())
            }),
            p,
        );

        assert!(matches!(pipeline.run(), Err(Error::Cancelled)));
        // The union never ran, but the completed tile survives on disk
        // so a re-run can resume.
        assert_eq!(union_ran.load(Ordering::SeqCst), 0);
        let kept: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert!(!kept.is_empty());
    }
}
