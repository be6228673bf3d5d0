/// Smallest generated user code
pub const USER_CODE_MIN: u8 = 10;

/// Largest generated user code
pub const USER_CODE_MAX: u8 = 99;

/// Default capacity of the per-store insert notification buffer.
/// Subscribers that fall further behind than this refetch their thread.
pub const DEFAULT_NOTIFY_CAPACITY: usize = 256;

/// Header carrying the authenticated user id, set by the upstream gateway.
pub const ACTOR_HEADER: &str = "x-user-id";
