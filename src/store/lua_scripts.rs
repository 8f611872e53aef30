//! Lua scripts for the atomic store operations.
//!
//! Redis runs each script without interleaving other commands, so the
//! read-modify-write inside a script cannot race with concurrent callers.

/// Capped append to a JSON array held in a hash field.
///
/// Arguments:
/// - KEYS[1]: Hash key (e.g., `meta:{room_id}`)
/// - ARGV[1]: Field name holding the JSON array
/// - ARGV[2]: Member to append
/// - ARGV[3]: Maximum array length
///
/// Returns:
/// - n > 0: Appended, n is the new length
/// - 0: Member already present
/// - -1: Hash key missing
/// - -2: Array full
pub const APPEND_CAPPED: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return -1
end

local raw = redis.call('HGET', KEYS[1], ARGV[1])
local members = {}
if raw and raw ~= '' then
    members = cjson.decode(raw)
end

for _, member in ipairs(members) do
    if member == ARGV[2] then
        return 0
    end
end

if #members >= tonumber(ARGV[3]) then
    return -2
end

table.insert(members, ARGV[2])
redis.call('HSET', KEYS[1], ARGV[1], cjson.encode(members))
return #members
"#;

/// Copy the remaining TTL of one key onto others.
///
/// Arguments:
/// - KEYS[1]: Source key
/// - KEYS[2..]: Target keys
///
/// Returns the source PTTL in milliseconds (-2 missing, -1 persistent).
/// Targets are deleted when the source is missing and left untouched when it
/// has no expiry. A PTTL of 0 still applies, which deletes the targets.
pub const COPY_TTL: &str = r#"
local ttl = redis.call('PTTL', KEYS[1])

if ttl == -2 then
    for i = 2, #KEYS do
        redis.call('DEL', KEYS[i])
    end
elseif ttl >= 0 then
    for i = 2, #KEYS do
        redis.call('PEXPIRE', KEYS[i], ttl)
    end
end

return ttl
"#;
