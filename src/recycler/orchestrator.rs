//! Rebuilding an application while carrying driver logs across.

use crate::driver::{Drivers, MissingTargetPolicy};
use crate::error::{RecycleError, Result};
use crate::log::LogFile;
use std::fs;
use std::path::{Path, PathBuf};

use super::runtime::{Instance, Runtime, Sinks, Sources};

/// File extension of driver checkpoints.
const CHECKPOINT_EXTENSION: &str = "rlog";

/// Builds a fresh driver set. Must use the same driver names on every call.
pub type DriverFactory = Box<dyn Fn() -> Drivers + Send + Sync>;

/// Recycler configuration.
#[derive(Clone, Debug, Default)]
pub struct RecyclerConfig {
    /// Handling of old drivers with no same-named driver after a rebuild.
    pub missing_driver: MissingTargetPolicy,

    /// Directory for driver log checkpoints (None = in-memory only).
    pub checkpoint_dir: Option<PathBuf>,
}

/// Dispose `old`, then [`rebuild`] against `drivers`.
pub fn recycle<R, A>(
    runtime: &R,
    app: &A,
    drivers: &Drivers,
    old_drivers: &Drivers,
    old: Instance,
) -> Result<Instance>
where
    R: Runtime<A>,
{
    old.dispose()?;
    rebuild(runtime, app, drivers, old_drivers, MissingTargetPolicy::default())
}

/// Build and run `app` on `drivers`, then replay every old driver's log into
/// the same-named new driver and release the old drivers' taps.
///
/// If the logs cannot be transferred the new instance is disposed before the
/// error is returned, and the old drivers keep their logs and taps.
pub fn rebuild<R, A>(
    runtime: &R,
    app: &A,
    drivers: &Drivers,
    old_drivers: &Drivers,
    missing_driver: MissingTargetPolicy,
) -> Result<Instance>
where
    R: Runtime<A>,
{
    let instance = runtime.build(app, drivers)?.run()?;

    if let Err(e) = transfer_logs(drivers, old_drivers, missing_driver) {
        if let Err(dispose_err) = instance.dispose() {
            tracing::warn!(error = %dispose_err, "failed to dispose instance after aborted rebuild");
        }
        return Err(e);
    }

    for old in old_drivers.values() {
        old.release();
    }

    Ok(instance)
}

/// Move each old driver's log into the same-named new driver and replay it.
///
/// Old logs are only emptied once every replay has succeeded. Capture on the
/// old drivers is paused meanwhile, so values replayed into a stream they
/// share with the new drivers are not recorded twice.
pub fn transfer_logs(
    drivers: &Drivers,
    old_drivers: &Drivers,
    missing_driver: MissingTargetPolicy,
) -> Result<()> {
    if missing_driver == MissingTargetPolicy::Fail {
        if let Some(name) = old_drivers.keys().find(|name| !drivers.contains_key(*name)) {
            return Err(RecycleError::DriverMissing(name.clone()));
        }
    }

    let _paused: Vec<_> = old_drivers.values().map(|old| old.pause_capture()).collect();

    for (name, old) in old_drivers {
        let Some(new) = drivers.get(name) else {
            if missing_driver == MissingTargetPolicy::Warn {
                tracing::warn!(driver = %name, entries = old.log().len(), "driver missing after rebuild, log dropped");
            }
            continue;
        };

        let report = new.replay(old.log())?;
        tracing::debug!(
            driver = %name,
            replayed = report.replayed,
            dropped = report.dropped_entries,
            "transferred driver log"
        );
    }

    for old in old_drivers.values() {
        old.take_log();
    }

    Ok(())
}

/// Owns the current instance and driver set and rebuilds them on demand.
pub struct Recycler<R> {
    runtime: R,
    factory: DriverFactory,
    config: RecyclerConfig,
    drivers: Drivers,
    instance: Option<Instance>,
    generation: u64,
}

impl<R> Recycler<R> {
    /// Build drivers, run `app` once and hold the resulting instance.
    pub fn bootstrap<A, F>(runtime: R, app: &A, factory: F) -> Result<Self>
    where
        R: Runtime<A>,
        F: Fn() -> Drivers + Send + Sync + 'static,
    {
        Self::bootstrap_with_config(runtime, app, factory, RecyclerConfig::default())
    }

    /// Like [`Recycler::bootstrap`], replaying any checkpoints found in
    /// [`RecyclerConfig::checkpoint_dir`] into the new drivers.
    pub fn bootstrap_with_config<A, F>(
        runtime: R,
        app: &A,
        factory: F,
        config: RecyclerConfig,
    ) -> Result<Self>
    where
        R: Runtime<A>,
        F: Fn() -> Drivers + Send + Sync + 'static,
    {
        let drivers = factory();
        let instance = runtime.build(app, &drivers)?.run()?;

        let mut recycler = Self {
            runtime,
            factory: Box::new(factory),
            config,
            drivers,
            instance: Some(instance),
            generation: 0,
        };

        if let Some(dir) = recycler.config.checkpoint_dir.clone() {
            if let Err(e) = recycler.restore_checkpoints(&dir) {
                if let Some(instance) = recycler.instance.take() {
                    if let Err(dispose_err) = instance.dispose() {
                        tracing::warn!(error = %dispose_err, "failed to dispose instance after aborted bootstrap");
                    }
                }
                return Err(e);
            }
        }

        tracing::info!(drivers = recycler.drivers.len(), "application started");
        Ok(recycler)
    }

    /// Dispose the current instance and rebuild `app` on a fresh driver set,
    /// replaying the previous drivers' logs into it.
    ///
    /// On failure the previous instance stays disposed and the previous
    /// driver set is kept, so a later reload rebuilds from it.
    pub fn reload<A>(&mut self, app: &A) -> Result<()>
    where
        R: Runtime<A>,
    {
        if let Some(instance) = self.instance.take() {
            instance.dispose()?;
        }

        if let Some(dir) = &self.config.checkpoint_dir {
            write_checkpoints(dir, &self.drivers)?;
        }

        let drivers = (self.factory)();
        let instance = rebuild(
            &self.runtime,
            app,
            &drivers,
            &self.drivers,
            self.config.missing_driver,
        )?;

        self.drivers = drivers;
        self.instance = Some(instance);
        self.generation += 1;

        tracing::info!(generation = self.generation, "application recycled");
        Ok(())
    }

    /// Write every driver's current log to the checkpoint directory.
    ///
    /// Does nothing when no directory is configured.
    pub fn checkpoint(&self) -> Result<()> {
        match &self.config.checkpoint_dir {
            Some(dir) => write_checkpoints(dir, &self.drivers),
            None => Ok(()),
        }
    }

    /// Dispose the current instance, checkpointing first if configured.
    pub fn shutdown(mut self) -> Result<()> {
        self.checkpoint()?;
        if let Some(instance) = self.instance.take() {
            instance.dispose()?;
        }
        for driver in self.drivers.values() {
            driver.release();
        }
        Ok(())
    }

    pub fn sources(&self) -> Option<&Sources> {
        self.instance.as_ref().map(|instance| &instance.sources)
    }

    pub fn sinks(&self) -> Option<&Sinks> {
        self.instance.as_ref().map(|instance| &instance.sinks)
    }

    pub fn drivers(&self) -> &Drivers {
        &self.drivers
    }

    pub fn config(&self) -> &RecyclerConfig {
        &self.config
    }

    /// Number of successful reloads.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether an instance is currently running.
    pub fn is_live(&self) -> bool {
        self.instance.is_some()
    }

    fn restore_checkpoints(&self, dir: &Path) -> Result<()> {
        for (name, driver) in &self.drivers {
            let file = LogFile::new(checkpoint_path(dir, name));
            if !file.exists() {
                continue;
            }
            let report = driver.replay(file.read()?)?;
            tracing::debug!(driver = %name, replayed = report.replayed, "restored checkpoint");
        }
        Ok(())
    }
}

/// Bootstrap `app` and return its reload trigger.
pub fn recycler<R, A, F>(runtime: R, app: &A, factory: F) -> Result<impl FnMut(&A) -> Result<()>>
where
    R: Runtime<A>,
    F: Fn() -> Drivers + Send + Sync + 'static,
{
    let mut recycler = Recycler::bootstrap(runtime, app, factory)?;
    Ok(move |app: &A| recycler.reload(app))
}

/// Path of the checkpoint file for driver `name`.
pub fn checkpoint_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, CHECKPOINT_EXTENSION))
}

fn write_checkpoints(dir: &Path, drivers: &Drivers) -> Result<()> {
    fs::create_dir_all(dir)?;
    for (name, driver) in drivers {
        LogFile::new(checkpoint_path(dir, name)).write(&driver.log())?;
    }
    Ok(())
}
