//! どこで: keystore読み込み / 何を: datadir配下の鍵を起動時に復号 / なぜ: /txの署名をローカル鍵で完結させるため

use std::collections::BTreeMap;
use std::path::Path;

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use tracing::info;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KeystoreError {
    Io(String),
    Decrypt(String),
}

/// Every key under `<datadir>/keystore`, decrypted once at init. Unlock
/// failures are fatal; a node without its keys cannot serve `/tx`.
#[derive(Debug)]
pub struct Keystore {
    signers: BTreeMap<Address, PrivateKeySigner>,
}

impl Keystore {
    pub fn load(dir: &Path, password: &str) -> Result<Self, KeystoreError> {
        std::fs::create_dir_all(dir)
            .map_err(|err| KeystoreError::Io(format!("{}: {err}", dir.display())))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))
                .map_err(|err| KeystoreError::Io(format!("{}: {err}", dir.display())))?;
        }

        let mut signers = BTreeMap::new();
        let entries = std::fs::read_dir(dir)
            .map_err(|err| KeystoreError::Io(format!("{}: {err}", dir.display())))?;
        for entry in entries {
            let entry = entry.map_err(|err| KeystoreError::Io(err.to_string()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let signer = PrivateKeySigner::decrypt_keystore(&path, password)
                .map_err(|err| KeystoreError::Decrypt(format!("{}: {err}", path.display())))?;
            info!(address = %signer.address(), "unlocked account");
            signers.insert(signer.address(), signer);
        }
        Ok(Self { signers })
    }

    pub fn empty() -> Self {
        Self {
            signers: BTreeMap::new(),
        }
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.signers.keys()
    }

    pub fn signer(&self, address: &Address) -> Option<&PrivateKeySigner> {
        self.signers.get(address)
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }
}
