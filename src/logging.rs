//=====================================================
// File: logging.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Tracing setup for binaries embedding the load service
// Objective: Install one fmt subscriber per process, filtered by RUST_LOG
//            with a caller-chosen default level
//=====================================================

use once_cell::sync::OnceCell;
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::SubscriberBuilder;

static INIT: OnceCell<()> = OnceCell::new();

/// Install the subscriber. Later calls are no-ops.
pub fn init_tracing(level: Level) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(level).into())
            .from_env_lossy();
        // another subscriber may already be installed by the host
        let _ = SubscriberBuilder::default()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .try_init();
    });
}

/// Level implied by the diagnostic switches.
pub fn level_for(debug_search: bool, debug_timing: bool, verbose: bool) -> Level {
    if debug_search {
        Level::DEBUG
    } else if debug_timing || verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}


//=====================================================
// End of file
//=====================================================
