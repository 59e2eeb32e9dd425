// Default tunables shared between the config layer and tests.

// Harvested tokens are single-use and rot quickly on the challenge side;
// anything older than this is not worth handing to a worker.
pub const DEFAULT_TOKEN_LIFETIME_MS: i64 = 110_000;

// Upper bound on pooled tokens. Overflow evicts the oldest entry rather than
// rejecting the newest, since fresher tokens are strictly more valuable.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 24;

// Fraction of max charge an account must reach before it is considered ready.
pub const DEFAULT_CHARGE_THRESHOLD_FRACTION: f64 = 0.8;

pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 5;

// Droplets kept untouched when computing spendable balance.
pub const DEFAULT_DROPLET_RESERVE: i64 = 500;

pub const DEFAULT_MAX_RETRY_COUNT: u32 = 3;
