/// Restores the captured variables when dropped, also when a test panics.
struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..) {
            match value {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}

/// Runs `f` with `vars` set (`Some`) or unset (`None`).
///
/// Callers must be `#[serial]`: the process environment is shared.
pub fn with_env<F>(vars: Vec<(&str, Option<&str>)>, f: F)
where
    F: FnOnce(),
{
    let _guard = EnvGuard {
        saved: vars
            .iter()
            .map(|(key, _)| (key.to_string(), std::env::var(key).ok()))
            .collect(),
    };

    for (key, value) in vars {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }

    f();
}
