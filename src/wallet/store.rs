//! Wallet data file
//!
//! The file holds the exported [`WalletData`] blob and nothing else.

use super::WalletData;
use crate::{Error, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Read persisted wallet data, if the file exists
pub fn load_wallet_data(path: &Path) -> Result<Option<WalletData>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let data = serde_json::from_str(content.trim()).map_err(|e| {
        Error::Wallet(format!("Corrupt wallet data in {}: {}", path.display(), e))
    })?;
    Ok(Some(data))
}

/// Persist wallet data, replacing any previous contents
///
/// The file carries the private key, so on unix it is readable by the owner
/// only, including when it already existed with wider permissions.
pub fn save_wallet_data(path: &Path, data: &WalletData) -> Result<()> {
    let json = serde_json::to_string(data)?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(0o600);
        if path.exists() {
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
    }

    let mut file = options.open(path)?;
    file.write_all(json.as_bytes())?;
    tracing::debug!(path = %path.display(), wallet_id = %data.wallet_id, "Persisted wallet data");
    Ok(())
}
