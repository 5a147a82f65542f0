use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Sets `KPOOLS_WORKERS` for the guard's lifetime, restoring the old value on drop.
pub struct WorkersEnvGuard {
    previous: Option<String>,
    _lock: std::sync::MutexGuard<'static, ()>,
}

impl WorkersEnvGuard {
    pub fn set(value: &str) -> Self {
        let lock = ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        let previous = std::env::var(kpools::config::WORKERS_ENV).ok();
        // SAFETY: tests run under a global lock to prevent concurrent env mutations.
        unsafe {
            std::env::set_var(kpools::config::WORKERS_ENV, value);
        }
        Self {
            previous,
            _lock: lock,
        }
    }
}

impl Drop for WorkersEnvGuard {
    fn drop(&mut self) {
        if let Some(value) = self.previous.take() {
            // SAFETY: tests run under a global lock to prevent concurrent env mutations.
            unsafe {
                std::env::set_var(kpools::config::WORKERS_ENV, value);
            }
        } else {
            // SAFETY: tests run under a global lock to prevent concurrent env mutations.
            unsafe {
                std::env::remove_var(kpools::config::WORKERS_ENV);
            }
        }
    }
}
