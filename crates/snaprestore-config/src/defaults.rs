//! Default values and field names for restore configuration documents.
//!
//! # Design
//! - Centralize document keys so the loader and error messages agree.
//! - Keep retry defaults explicit; they match the observed propagation delay of snapshot links.

/// Document key holding the snapshot device path.
pub const SHADOW_PATH_FIELD: &str = "shadowPath";
/// Document key holding the restore destination.
pub const TARGET_PATH_FIELD: &str = "targetPath";
/// Document key holding the mount point.
pub const MOUNT_PATH_FIELD: &str = "mountPath";
/// Optional key toggling the free-space precondition.
pub const CHECK_CAPACITY_FIELD: &str = "checkCapacity";
/// Optional key toggling removal of the mount after a successful restore.
pub const UNMOUNT_ON_SUCCESS_FIELD: &str = "unmountOnSuccess";
/// Optional key overriding the number of mount verification attempts.
pub const VERIFY_ATTEMPTS_FIELD: &str = "verifyAttempts";
/// Optional key overriding the pause between verification attempts.
pub const VERIFY_DELAY_MS_FIELD: &str = "verifyDelayMs";
/// Optional key selecting the path convention.
pub const PATH_CONVENTION_FIELD: &str = "pathConvention";

/// Number of enumeration attempts made before a mount is declared dead.
pub(crate) const DEFAULT_VERIFY_ATTEMPTS: u32 = 5;
/// Pause between enumeration attempts, in milliseconds.
pub(crate) const DEFAULT_VERIFY_DELAY_MS: u64 = 500;
