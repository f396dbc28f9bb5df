//! The `rcvec` binary.
use std::io;

use rcvec_error_macros::user_error;

use rcvec_cli::{build_app, run_scenario, ScenarioConfig};

fn main() -> io::Result<()> {
    let _tracing_guards = rcvec_tracing::setup_tracing!();

    let matches = build_app().get_matches();

    let config = match ScenarioConfig::from_matches(&matches) {
        Ok(config) => config,
        Err(problem) => user_error!("{}", problem),
    };

    let stdout = io::stdout();
    run_scenario(&config, &mut stdout.lock())
}
