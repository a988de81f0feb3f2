/*!
 * Socket Path Limits
 */

use crate::core::limits::SUN_PATH_MAX;

/// Platform limit on AF_UNIX socket path length, `None` where no sockets are created
#[inline]
pub const fn sun_path_max() -> Option<usize> {
    SUN_PATH_MAX
}

/// Whether the platform has an abstract socket namespace
#[inline]
pub const fn supports_abstract_sockets() -> bool {
    cfg!(any(target_os = "linux", target_os = "android"))
}

/// Whether `address` names a socket in the abstract namespace (leading NUL)
pub fn is_abstract_socket_namespace(address: impl AsRef<[u8]>) -> bool {
    address.as_ref().first() == Some(&0)
}
