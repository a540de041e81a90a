//! Interface to the reactive application runtime.

use crate::driver::Drivers;
use crate::error::Result;
use crate::source::SourceNode;
use crate::stream::Stream;
use std::collections::BTreeMap;
use std::fmt;

/// Sources handed to the application, by driver name.
pub type Sources = BTreeMap<String, SourceNode>;

/// Sinks the application produced, by driver name.
pub type Sinks = BTreeMap<String, Stream>;

/// Releases every subscription of a running application.
pub type Dispose = Box<dyn FnOnce() -> Result<()> + Send>;

type Run = Box<dyn FnOnce() -> Result<Dispose> + Send>;

/// Constructs applications from a description and a driver set.
pub trait Runtime<A> {
    fn build(&self, app: &A, drivers: &Drivers) -> Result<Application>;
}

impl<A, F> Runtime<A> for F
where
    F: Fn(&A, &Drivers) -> Result<Application>,
{
    fn build(&self, app: &A, drivers: &Drivers) -> Result<Application> {
        self(app, drivers)
    }
}

/// A built but not yet running application.
pub struct Application {
    pub sources: Sources,
    pub sinks: Sinks,
    run: Run,
}

impl Application {
    pub fn new<F>(sources: Sources, sinks: Sinks, run: F) -> Self
    where
        F: FnOnce() -> Result<Dispose> + Send + 'static,
    {
        Self {
            sources,
            sinks,
            run: Box::new(run),
        }
    }

    /// Start the application.
    pub fn run(self) -> Result<Instance> {
        let dispose = (self.run)()?;
        Ok(Instance {
            sources: self.sources,
            sinks: self.sinks,
            dispose: Some(dispose),
        })
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .field("sinks", &self.sinks.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// One live pairing of a running application and its driver set.
pub struct Instance {
    pub sources: Sources,
    pub sinks: Sinks,
    dispose: Option<Dispose>,
}

impl Instance {
    pub fn new<F>(sources: Sources, sinks: Sinks, dispose: F) -> Self
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        Self {
            sources,
            sinks,
            dispose: Some(Box::new(dispose)),
        }
    }

    /// Release the application's subscriptions.
    pub fn dispose(mut self) -> Result<()> {
        match self.dispose.take() {
            Some(dispose) => dispose(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .field("sinks", &self.sinks.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
