use flexi_logger::{
    default_format, opt_format, Cleanup, Criterion, FileSpec, FlexiLoggerError, Logger,
    LoggerHandle, Naming,
};
use std::path::Path;

/// Start the global logger.
///
/// The level comes from `RUST_LOG` when set, `level` otherwise. With a
/// directory, output goes to a rotating log file there (needed while the TUI
/// owns the terminal); without one it goes to stderr.
///
/// The returned handle must be kept alive for as long as logging is needed.
pub fn setup_logging(level: &str, directory: Option<&Path>) -> Result<LoggerHandle, FlexiLoggerError> {
    let logger = Logger::try_with_env_or_str(level)?;

    let logger = match directory {
        Some(dir) => logger
            .log_to_file(FileSpec::default().directory(dir))
            .format(opt_format)
            .rotate(
                Criterion::Size(10 * 1024 * 1024), // 10 MB per file
                Naming::Numbers,
                Cleanup::KeepLogFiles(3),
            ),
        None => logger.format(default_format),
    };

    logger.start()
}
