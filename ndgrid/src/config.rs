/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Configuration for mapped storage.
//!
//! A [`StorageConfig`] can be built directly, loaded from environment
//! variables with [`StorageConfig::from_env`], or read from and
//! written to YAML files. Keys missing from a YAML file take their
//! default values.

use std::env;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

/// Environment variable overriding [`StorageConfig::flush_on_drop`].
pub const FLUSH_ON_DROP_ENV: &str = "NDGRID_FLUSH_ON_DROP";

/// Environment variable overriding [`StorageConfig::populate`].
pub const POPULATE_ENV: &str = "NDGRID_POPULATE";

/// Options applied when mapping a backing file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Flush dirty pages to the file before unmapping on drop. A
    /// failed flush on drop is logged; use `Direct::close` to observe
    /// it instead.
    pub flush_on_drop: bool,

    /// Pre-fault the whole mapping when it is opened.
    pub populate: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            flush_on_drop: true,
            populate: false,
        }
    }
}

impl StorageConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for unset or unparsable values.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Like [`StorageConfig::from_env`], reading variables through
    /// `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        for (name, slot) in [
            (FLUSH_ON_DROP_ENV, &mut config.flush_on_drop),
            (POPULATE_ENV, &mut config.populate),
        ] {
            let Some(value) = lookup(name) else {
                continue;
            };
            match parse_bool(&value) {
                Some(parsed) => *slot = parsed,
                None => tracing::error!(
                    "failed to override storage config from value \"{}\" in ${}",
                    value,
                    name
                ),
            }
        }
        tracing::info!("loaded storage configuration from environment: {:?}", config);
        config
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), anyhow::Error> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
