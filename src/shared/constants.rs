/// Default page size for pagination (file tables show five rows)
pub const DEFAULT_PAGE_SIZE: i64 = 5;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

/// Window used by every "recent" figure (shares, uploads, comments)
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Number of activity entries shown on the dashboard
pub const RECENT_ACTIVITY_LIMIT: i64 = 5;

/// Number of share links shown on the dashboard
pub const RECENT_SHARES_LIMIT: usize = 3;

/// Minimum password strength score accepted at sign-up and reset
pub const MIN_PASSWORD_STRENGTH: u8 = 75;
