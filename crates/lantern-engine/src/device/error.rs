use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// What the driver does after a surface acquisition error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; the next frame may render.
    Reconfigured,
    /// Transient; this frame draws offscreen only.
    SkipFrame,
    /// Unrecoverable (commonly out of memory).
    Fatal,
}

/// Error messages shared with wgpu's uncaptured-error callback, which may
/// fire on any thread.
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorLog {
    messages: Arc<Mutex<Vec<String>>>,
}

impl ErrorLog {
    pub(crate) fn push(&self, message: String) {
        self.lock().push(message);
    }

    pub(crate) fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock())
    }

    /// Handler for `Device::on_uncaptured_error`.
    pub(crate) fn uncaptured_handler(&self) -> impl Fn(wgpu::Error) + Send + Sync + 'static {
        let sink = self.clone();
        move |e| {
            log::error!("uncaptured wgpu error: {e}");
            sink.push(format!("wgpu: {e}"));
        }
    }

    // The Vec is valid even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn take_empties_the_log() {
        let log = ErrorLog::default();
        log.push("surface: lost".into());
        log.push("surface: outdated".into());

        assert_eq!(log.take(), vec!["surface: lost", "surface: outdated"]);
        assert!(log.take().is_empty());
    }

    #[test]
    fn uncaptured_errors_from_other_threads_are_collected() {
        let log = ErrorLog::default();
        let handler = log.uncaptured_handler();

        thread::spawn(move || {
            handler(wgpu::Error::Validation {
                source: "bad bind group".into(),
                description: "bad bind group".into(),
            })
        })
        .join()
        .unwrap();

        let errors = log.take();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("wgpu: "));
        assert!(errors[0].contains("bad bind group"));
    }

    #[test]
    fn poisoned_log_still_drains() {
        let log = ErrorLog::default();
        log.push("before".into());

        let clone = log.clone();
        let _ = thread::spawn(move || {
            let _guard = clone.messages.lock().unwrap();
            panic!("callback panicked");
        })
        .join();

        assert_eq!(log.take(), vec!["before"]);
    }
}
