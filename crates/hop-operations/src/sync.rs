use hop_core::{environment::Operation, HopResult};
use tracing::debug;

use crate::{HopContext, SyncReport};

/// Regenerate the package from the database's current schema.
///
/// Touches neither version control nor the patch bookkeeping. Running it twice
/// in a row reports no change the second time.
pub fn sync_package(ctx: &HopContext) -> HopResult<SyncReport> {
    ctx.state()?.ensure_allowed(Operation::SyncPackage)?;
    let _lock = ctx.lock()?;

    let package = ctx
        .regenerate_package()
        .map_err(|err| err.into_package_sync_warning())?;

    if package.changed {
        debug!("Package updated");
    } else {
        debug!("Package already up to date");
    }
    Ok(SyncReport { package })
}
