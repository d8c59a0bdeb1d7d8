//! # Ledger Telemetry
//!
//! Terminal front end for `ledger-telemetry-core`: polls a ledger node,
//! prints each published view and optionally exports the last one as JSON.
//!
//! ```bash
//! # Poll every 5 seconds and print tables
//! ledger-telemetry --node-url=http://localhost:3000
//!
//! # One cycle, JSON on stdout and in a file
//! ledger-telemetry --once --format=json --output-file=telemetry.json
//! ```

#[macro_use]
extern crate tracing;

mod app;
pub mod logging;
pub mod report;

pub use app::App;
use color_eyre::Result;
pub use ledger_telemetry_config::{
    Args,
    Config,
};

pub fn init_errors() -> Result<()> {
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default()
        .panic_section(format!(
            "This is a bug. Consider reporting it at {}",
            env!("CARGO_PKG_REPOSITORY")
        ))
        .capture_span_trace_by_default(false)
        .display_location_section(false)
        .display_env_section(false)
        .into_hooks();
    eyre_hook.install()?;
    std::panic::set_hook(Box::new(move |panic_info| {
        #[cfg(not(debug_assertions))]
        {
            use human_panic::{
                handle_dump,
                print_msg,
                Metadata,
            };
            let metadata = Metadata::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            let file_path = handle_dump(&metadata, panic_info);
            let _ = print_msg(file_path, &metadata);
            eprintln!("{}", panic_hook.panic_report(panic_info));
        }
        let msg = format!("{}", panic_hook.panic_report(panic_info));
        error!("Error: {}", strip_ansi_escapes::strip_str(msg));

        #[cfg(debug_assertions)]
        {
            better_panic::Settings::auto()
                .most_recent_first(false)
                .lineno_suffix(true)
                .verbosity(better_panic::Verbosity::Full)
                .create_panic_handler()(panic_info);
        }

        std::process::exit(1);
    }));
    Ok(())
}
