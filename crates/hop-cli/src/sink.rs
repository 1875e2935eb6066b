use hop_events::{EventSink, HopEvent, LogLevel, PatchStage, ReleaseStage};
use nu_ansi_term::Color::{Green, Red};
use tracing::{debug, error, info, trace, warn};

use crate::utils::{Colored, Icons};

/// Forwards engine events to the tracing subscriber.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: HopEvent) {
        match event {
            HopEvent::Patch {
                release,
                ordinal,
                name,
                stage,
            } => {
                match stage {
                    PatchStage::Staged => debug!(%release, ordinal, %name, "patch staged"),
                    PatchStage::Applying => trace!(%release, ordinal, %name, "applying patch"),
                    PatchStage::Reverting => trace!(%release, ordinal, %name, "reverting patch"),
                    PatchStage::Applied => {
                        info!("  {} {ordinal:03} {name}", Colored(Green, Icons::CHECK))
                    }
                    PatchStage::Reverted => {
                        info!("  {} {ordinal:03} {name}", Colored(Green, Icons::ARROW))
                    }
                    PatchStage::Failed(cause) => {
                        error!("  {} {ordinal:03} {name}: {cause}", Colored(Red, Icons::CROSS))
                    }
                }
            }
            HopEvent::Release { release, stage } => {
                match stage {
                    ReleaseStage::Failed { ordinal } => {
                        debug!(%release, ordinal, "release marked failed")
                    }
                    stage => debug!(%release, ?stage, "release transition"),
                }
            }
            HopEvent::Pushed {
                remote,
                branch,
                tags,
            } => debug!(%remote, %branch, ?tags, "pushed"),
            HopEvent::BindingUpdated { release } => {
                debug!(release = release.as_deref().unwrap_or("none"), "binding updated")
            }
            HopEvent::PackageRegenerated { files, changed } => {
                debug!(files = files.len(), changed, "package regenerated")
            }
            HopEvent::Log { level, message } => {
                match level {
                    LogLevel::Debug => debug!("{message}"),
                    LogLevel::Info => info!("{message}"),
                    LogLevel::Warning => warn!("{message}"),
                    LogLevel::Error => error!("{message}"),
                }
            }
        }
    }
}
