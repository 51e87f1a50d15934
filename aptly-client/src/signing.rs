// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! GPG signing configuration for publishes.

Every publish create/update request carries a `Signing` object telling the
server how to sign the published indexes. Which parameters apply is resolved
per publish: a map keyed on `"{prefix}/{distribution}"` overrides a default.
*/

use {
    crate::error::{AptlyError, Result},
    serde::Deserialize,
    serde_json::{json, Map, Value},
    std::collections::HashMap,
};

fn default_batch() -> bool {
    true
}

/// GPG signing parameters for a publish.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SigningConfig {
    #[serde(default)]
    pub skip: bool,
    #[serde(default = "default_batch")]
    pub batch: bool,
    // Configuration files spell this "gpgkey" (e.g. signing.gpgkey=KEY).
    #[serde(default, rename = "gpgkey")]
    pub gpg_key: Option<String>,
    #[serde(default)]
    pub keyring: Option<String>,
    #[serde(default)]
    pub secret_keyring: Option<String>,
    #[serde(default)]
    pub passphrase: Option<String>,
    #[serde(default)]
    pub passphrase_file: Option<String>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            skip: false,
            batch: true,
            gpg_key: None,
            keyring: None,
            secret_keyring: None,
            passphrase: None,
            passphrase_file: None,
        }
    }
}

impl SigningConfig {
    /// Validate the invariants of a signing configuration.
    ///
    /// A non-skip configuration needs a key to sign with and exactly one way
    /// to obtain its passphrase.
    pub fn validate(&self) -> Result<()> {
        if self.skip {
            return Ok(());
        }

        if self.gpg_key.is_none() {
            return Err(AptlyError::Config(
                "signing config without skip requires gpg_key".to_string(),
            ));
        }

        match (&self.passphrase, &self.passphrase_file) {
            (Some(_), Some(_)) => Err(AptlyError::Config(
                "signing config must not set both passphrase and passphrase_file".to_string(),
            )),
            (None, None) => Err(AptlyError::Config(
                "signing config requires passphrase or passphrase_file".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// The `Signing` object for publish API bodies.
    ///
    /// A skipped configuration is exactly `{"Skip": true}`. Otherwise `Batch`
    /// is always present plus whichever optional parameters are set.
    pub fn to_api_params(&self) -> Value {
        if self.skip {
            return json!({"Skip": true});
        }

        let mut params = Map::new();
        params.insert("Batch".to_string(), Value::Bool(self.batch));

        for (key, value) in [
            ("GpgKey", &self.gpg_key),
            ("Keyring", &self.keyring),
            ("SecretKeyring", &self.secret_keyring),
            ("Passphrase", &self.passphrase),
            ("PassphraseFile", &self.passphrase_file),
        ] {
            if let Some(value) = value {
                if !value.is_empty() {
                    params.insert(key.to_string(), Value::String(value.clone()));
                }
            }
        }

        Value::Object(params)
    }
}

/// Per-publish signing resolution: a default plus overrides keyed on
/// `"{prefix}/{distribution}"`.
#[derive(Clone, Debug, Default)]
pub struct SigningResolver {
    pub default_config: SigningConfig,
    pub config_map: HashMap<String, SigningConfig>,
}

impl SigningResolver {
    /// Resolve the signing configuration for a publish.
    ///
    /// An empty prefix is looked up as `"."`, matching the full-prefix form
    /// used on the wire.
    pub fn resolve(&self, prefix: &str, distribution: &str) -> &SigningConfig {
        let prefix = if prefix.is_empty() { "." } else { prefix };
        let key = format!("{}/{}", prefix, distribution);

        self.config_map.get(&key).unwrap_or(&self.default_config)
    }
}
