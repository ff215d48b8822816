//! Server name to plugin key normalization.

use mcpk_types::BridgeError;

/// Turn a server name into a plugin key made of `[A-Za-z0-9_]` only.
///
/// Every other character, including non-ASCII letters, becomes `_`. The
/// mapping is deterministic, so distinct names may collide
/// (`"a-b"` and `"a b"` both give `"a_b"`).
pub fn normalize_server_key(name: &str) -> Result<String, BridgeError> {
    if name.is_empty() {
        return Err(BridgeError::InvalidServerName {
            name: name.to_string(),
        });
    }
    Ok(name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect())
}
