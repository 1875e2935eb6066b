//! Classification of a working context into the set of legal operations.
//!
//! [`classify`] is pure: the caller gathers [`Observations`] from the
//! configuration, git and the database, and the resulting
//! [`RepositoryState`] decides which [`Operation`]s may run.

use std::fmt;

use crate::{error::HopError, release::ReleaseId, HopResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Keeps a package in sync with an externally managed database.
    SyncOnly,
    /// Authors and releases schema patches.
    Development,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// Every state-changing operation of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    New,
    Prepare,
    Stage,
    Apply,
    Undo,
    Release,
    Restore,
    Upgrade,
    SyncPackage,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::New => "new",
            Operation::Prepare => "prepare",
            Operation::Stage => "stage",
            Operation::Apply => "apply",
            Operation::Undo => "undo",
            Operation::Release => "release",
            Operation::Restore => "restore",
            Operation::Upgrade => "upgrade",
            Operation::SyncPackage => "sync-package",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw facts about the working context.
#[derive(Debug, Clone, Default)]
pub struct Observations {
    pub initialized: bool,
    pub devel: bool,
    pub production: bool,
    pub branch: Option<String>,
    pub last_applied_release: Option<ReleaseId>,
    pub last_committed_release: Option<ReleaseId>,
    /// Set when the git history could not be read.
    pub git_error: Option<String>,
    /// Set when the database could not be queried.
    pub database_error: Option<String>,
}

impl Observations {
    /// Observations outside of any hop repository.
    pub fn uninitialized() -> Self {
        Self::default()
    }
}

/// Classified state of a repository, computed fresh on every invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryState {
    pub initialized: bool,
    pub mode: Mode,
    pub environment: Environment,
    pub last_applied_release: Option<ReleaseId>,
    pub last_committed_release: Option<ReleaseId>,
    pub branch: Option<String>,
}

/// Classifies the working context.
///
/// # Errors
///
/// * [`HopError::EnvironmentUnknown`] when git or the database could not be read.
pub fn classify(observations: &Observations) -> HopResult<RepositoryState> {
    if !observations.initialized {
        return Ok(RepositoryState {
            initialized: false,
            mode: Mode::SyncOnly,
            environment: Environment::Development,
            last_applied_release: None,
            last_committed_release: None,
            branch: None,
        });
    }

    let reasons: Vec<String> = [
        observations
            .git_error
            .as_ref()
            .map(|err| format!("git history unreadable ({err})")),
        observations
            .database_error
            .as_ref()
            .map(|err| format!("database unreachable ({err})")),
    ]
    .into_iter()
    .flatten()
    .collect();

    if !reasons.is_empty() {
        return Err(HopError::EnvironmentUnknown {
            reason: reasons.join(", "),
        });
    }

    Ok(RepositoryState {
        initialized: true,
        mode: if observations.devel {
            Mode::Development
        } else {
            Mode::SyncOnly
        },
        environment: if observations.production {
            Environment::Production
        } else {
            Environment::Development
        },
        last_applied_release: observations.last_applied_release.clone(),
        last_committed_release: observations.last_committed_release.clone(),
        branch: observations.branch.clone(),
    })
}

impl RepositoryState {
    /// Operations legal in this state.
    pub fn allowed_operations(&self) -> &'static [Operation] {
        if !self.initialized {
            return &[Operation::New];
        }
        match (self.mode, self.environment) {
            (Mode::SyncOnly, _) => &[Operation::SyncPackage],
            (Mode::Development, Environment::Production) => {
                &[Operation::Upgrade, Operation::Restore]
            }
            (Mode::Development, Environment::Development) => {
                &[
                    Operation::Prepare,
                    Operation::Stage,
                    Operation::Apply,
                    Operation::Undo,
                    Operation::Release,
                ]
            }
        }
    }

    pub fn allows(&self, operation: Operation) -> bool {
        self.allowed_operations().contains(&operation)
    }

    /// # Errors
    ///
    /// * [`HopError::OperationNotAllowed`] if `operation` is not legal here.
    pub fn ensure_allowed(&self, operation: Operation) -> HopResult<()> {
        if self.allows(operation) {
            return Ok(());
        }
        Err(HopError::OperationNotAllowed {
            operation: operation.to_string(),
            state: self.describe(),
        })
    }

    /// Short human-readable description, e.g. `development repository, production database`.
    pub fn describe(&self) -> String {
        if !self.initialized {
            return "not a hop repository".to_string();
        }
        let mode = match self.mode {
            Mode::SyncOnly => "sync-only repository",
            Mode::Development => "development repository",
        };
        let environment = match self.environment {
            Environment::Development => "development database",
            Environment::Production => "production database",
        };
        format!("{mode}, {environment}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observed(devel: bool, production: bool) -> Observations {
        Observations {
            initialized: true,
            devel,
            production,
            branch: Some("hop_main".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_uninitialized_only_offers_new() {
        let state = classify(&Observations::uninitialized()).unwrap();
        assert!(!state.initialized);
        assert_eq!(state.allowed_operations(), &[Operation::New]);
    }

    #[test]
    fn test_sync_only() {
        for production in [false, true] {
            let state = classify(&observed(false, production)).unwrap();
            assert_eq!(state.mode, Mode::SyncOnly);
            assert_eq!(state.allowed_operations(), &[Operation::SyncPackage]);
        }
    }

    #[test]
    fn test_development_production() {
        let state = classify(&observed(true, true)).unwrap();
        assert_eq!(
            state.allowed_operations(),
            &[Operation::Upgrade, Operation::Restore]
        );
        assert!(state.ensure_allowed(Operation::Prepare).is_err());
    }

    #[test]
    fn test_development_development() {
        let state = classify(&observed(true, false)).unwrap();
        for op in [
            Operation::Prepare,
            Operation::Stage,
            Operation::Apply,
            Operation::Undo,
            Operation::Release,
        ] {
            assert!(state.allows(op), "{op} should be allowed");
        }
        for op in [Operation::Upgrade, Operation::Restore, Operation::SyncPackage, Operation::New] {
            assert!(!state.allows(op), "{op} should be refused");
        }
    }

    #[test]
    fn test_operation_not_allowed_message() {
        let state = classify(&observed(false, false)).unwrap();
        let err = state.ensure_allowed(Operation::Apply).unwrap_err();
        assert_eq!(
            err.to_string(),
            "`apply` is not allowed here (sync-only repository, development database)"
        );
    }

    #[test]
    fn test_contradictory_observations() {
        let mut observations = observed(true, false);
        observations.database_error = Some("unable to open database file".into());
        observations.git_error = Some("not a git repository".into());

        let err = classify(&observations).unwrap_err();
        match err {
            HopError::EnvironmentUnknown { reason } => {
                assert!(reason.contains("git history unreadable"));
                assert!(reason.contains("database unreachable"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_carries_release_facts() {
        let mut observations = observed(true, true);
        observations.last_applied_release = Some(ReleaseId::new(1, 1, 0));
        observations.last_committed_release = Some(ReleaseId::new(1, 2, 0));

        let state = classify(&observations).unwrap();
        assert_eq!(state.last_applied_release, Some(ReleaseId::new(1, 1, 0)));
        assert_eq!(state.last_committed_release, Some(ReleaseId::new(1, 2, 0)));
    }
}
