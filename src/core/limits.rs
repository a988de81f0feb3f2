/*!
 * Limits and Constants
 *
 * Centralized priorities, path limits and naming constants.
 */

use super::types::Priority;

// =============================================================================
// PRIORITIES
// =============================================================================

/// Minimum priority for the first shutdown pass
/// Ordinary resources register at 0 or above
pub const SHUTDOWN_FIRST_PASS_MIN_PRIORITY: Priority = 0;

/// Exit priority of the temp-directory removal finalizer
/// Runs after every non-negative finalizer in a full run
pub const TEMP_DIR_PRIORITY: Priority = -100;

// =============================================================================
// TEMP DIRECTORY NAMING
// =============================================================================

/// Prefix of the per-process temp directory
pub const TEMP_DIR_PREFIX: &str = "pfin-";

/// Random suffix length of generated names
pub const RANDOM_SUFFIX_LEN: usize = 8;

/// Length of a listener socket file component: `/sock-XXXXXXXX`
pub const SOCKET_COMPONENT_LEN: usize = "/sock-".len() + RANDOM_SUFFIX_LEN;

/// System-wide temp directories tried when the preferred base is too long
pub const FALLBACK_TEMP_DIRS: [&str; 3] = ["/tmp", "/var/tmp", "/usr/tmp"];

/// Config store key of the memoized temp directory
pub const TEMP_DIR_CONFIG_KEY: &str = "tempdir";

// =============================================================================
// SOCKET PATHS
// =============================================================================

/// Maximum AF_UNIX socket path length
/// [LINUX-COMPAT] 108 on Linux, 104 on the BSDs, 92 as the POSIX floor
#[cfg(any(target_os = "linux", target_os = "android"))]
pub const SUN_PATH_MAX: Option<usize> = Some(108);

#[cfg(any(target_os = "freebsd", target_os = "openbsd"))]
pub const SUN_PATH_MAX: Option<usize> = Some(104);

#[cfg(all(
    unix,
    not(any(
        target_os = "linux",
        target_os = "android",
        target_os = "freebsd",
        target_os = "openbsd"
    ))
))]
pub const SUN_PATH_MAX: Option<usize> = Some(92);

/// No AF_UNIX sockets are created on Windows
#[cfg(not(unix))]
pub const SUN_PATH_MAX: Option<usize> = None;
