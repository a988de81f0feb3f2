/*!
 * Monitoring
 * Log levels and tracing subscriber setup
 */

mod level;
mod tracer;

pub use level::{log, LogLevel};
pub use tracer::{init_tracing, log_to_stderr, LOG_JSON_ENV};
