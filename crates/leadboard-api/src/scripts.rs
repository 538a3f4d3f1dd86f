//! Lua scripts that keep multi-key lead writes atomic.
//!
//! Each lead lives in a hash with `doc` (JSON document) and `ver` (version)
//! fields, and is indexed in a sorted set scored by creation time.

/// Insert a lead that must not exist yet.
///
/// KEYS\[1\] = lead hash key
/// KEYS\[2\] = creation-time index
/// ARGV\[1\] = JSON document
/// ARGV\[2\] = version
/// ARGV\[3\] = creation time in epoch milliseconds
/// ARGV\[4\] = lead id
///
/// Returns 1 if inserted, 0 if the key was already taken.
pub const INSERT_LEAD: &str = r"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return 0
end
redis.call('HSET', KEYS[1], 'doc', ARGV[1], 'ver', ARGV[2])
redis.call('ZADD', KEYS[2], ARGV[3], ARGV[4])
return 1
";

/// Compare-and-swap a lead document on its version.
///
/// KEYS\[1\] = lead hash key
/// ARGV\[1\] = expected current version
/// ARGV\[2\] = new JSON document
/// ARGV\[3\] = new version
///
/// Returns:
///   - `[1, new_ver]` on success
///   - `[0, cur_ver]` on version mismatch
///   - `[-1, 0]` if the lead does not exist
pub const REPLACE_LEAD: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return {-1, 0}
end
local cur_ver = tonumber(redis.call('HGET', KEYS[1], 'ver'))
if cur_ver ~= tonumber(ARGV[1]) then
    return {0, cur_ver}
end
redis.call('HSET', KEYS[1], 'doc', ARGV[2], 'ver', ARGV[3])
return {1, tonumber(ARGV[3])}
";

/// Remove a lead and its index entry.
///
/// KEYS\[1\] = lead hash key
/// KEYS\[2\] = creation-time index
/// ARGV\[1\] = lead id
///
/// Returns the number of hashes removed (0 or 1).
pub const DELETE_LEAD: &str = r"
local removed = redis.call('DEL', KEYS[1])
redis.call('ZREM', KEYS[2], ARGV[1])
return removed
";
