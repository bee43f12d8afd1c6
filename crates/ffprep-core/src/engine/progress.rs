/// Events emitted while a preparation workflow runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    StageStart { name: &'static str },
    StageFinish,

    BatchStart { molecules: u64 },
    MoleculeFinished { name: String, succeeded: bool },
    BatchFinish,
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards workflow events to an optional caller-supplied callback. Without a callback
/// every event is dropped.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    sink: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn silent() -> Self {
        Self { sink: None }
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            sink: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(sink) = &self.sink {
            sink(event);
        }
    }

    /// Runs `work` between a `StageStart` and a `StageFinish` event.
    pub fn stage<T>(&self, name: &'static str, work: impl FnOnce() -> T) -> T {
        self.report(Progress::StageStart { name });
        let output = work();
        self.report(Progress::StageFinish);
        output
    }
}
