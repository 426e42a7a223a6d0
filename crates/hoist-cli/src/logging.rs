//! Tracing setup.
//!
//! The subscriber is only installed when `HOIST_LOG` or `RUST_LOG` is set.
//! `HOIST_LOG` takes precedence and uses the same filter syntax, e.g.
//! `HOIST_LOG=hoist_core::lowering=trace`. Output goes to stderr so it never
//! mixes with the IR or JSON written to stdout.

use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = match std::env::var("HOIST_LOG") {
        Ok(directives) => EnvFilter::builder().parse_lossy(directives),
        Err(_) if std::env::var("RUST_LOG").is_ok() => EnvFilter::from_default_env(),
        Err(_) => return,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
