use env_logger::Env;

/// Environment variable holding the log filter, e.g. `PSTREE_LOG=debug`.
pub const LOG_ENV: &str = "PSTREE_LOG";

/// Logs always go to stderr and default to `warn`, so they never interleave with a tree printed
/// on stdout.
pub fn init_logger() {
    env_logger::Builder::from_env(Env::new().filter_or(LOG_ENV, "warn"))
        .format_timestamp(None)
        .init();
}
