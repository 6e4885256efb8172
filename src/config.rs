// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::{
    fail::Fail,
    DEFAULT_TIMER_CAPACITY,
    DEFAULT_TRAMPOLINE_CAPACITY,
};
use ::std::{
    fs::File,
    io::Read,
};
use ::yaml_rust::{
    Yaml,
    YamlLoader,
};

//======================================================================================================================
// Constants
//======================================================================================================================

// Kernel tuning knobs. All keys are optional.
mod kernel_config {
    pub const SECTION_NAME: &str = "kernel";
    // Pre-allocated trampoline queue slots.
    pub const TRAMPOLINE_CAPACITY: &str = "trampoline_capacity";
    // Pre-allocated timer heap slots.
    pub const TIMER_CAPACITY: &str = "timer_capacity";
}

//======================================================================================================================
// Structures
//======================================================================================================================

/// Kernel configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Yaml);

//======================================================================================================================
// Associate Functions
//======================================================================================================================

/// Common associated functions for the kernel configuration object.
impl Config {
    /// Reads a configuration file into a [Config] object.
    pub fn new(config_path: String) -> Result<Self, Fail> {
        let mut config_s: String = String::new();
        File::open(config_path)?.read_to_string(&mut config_s)?;
        Self::from_yaml(&config_s)
    }

    /// Parses a configuration document from a string.
    pub fn from_yaml(config_s: &str) -> Result<Self, Fail> {
        let config: Vec<Yaml> = match YamlLoader::load_from_str(config_s) {
            Ok(config) => config,
            Err(_) => return Err(Fail::new(libc::EINVAL, "malformed config document")),
        };
        let config_obj: &Yaml = match &config[..] {
            &[ref c] => c,
            _ => return Err(Fail::new(libc::EINVAL, "wrong number of config objects")),
        };
        Ok(Self(config_obj.clone()))
    }

    /// Pre-allocated trampoline queue slots.
    pub fn trampoline_capacity(&self) -> Result<usize, Fail> {
        self.get_kernel_usize(kernel_config::TRAMPOLINE_CAPACITY, DEFAULT_TRAMPOLINE_CAPACITY)
    }

    /// Pre-allocated timer heap slots.
    pub fn timer_capacity(&self) -> Result<usize, Fail> {
        self.get_kernel_usize(kernel_config::TIMER_CAPACITY, DEFAULT_TIMER_CAPACITY)
    }

    fn get_kernel_usize(&self, key: &str, default: usize) -> Result<usize, Fail> {
        let section: &Yaml = &self.0[kernel_config::SECTION_NAME];
        if section.is_badvalue() {
            return Ok(default);
        }
        let value: &Yaml = &section[key];
        if value.is_badvalue() {
            return Ok(default);
        }
        match value.as_i64() {
            Some(value) if value > 0 => Ok(value as usize),
            _ => {
                let cause: String = format!("invalid config value (key={:?})", key);
                error!("get_kernel_usize(): {}", cause);
                Err(Fail::new(libc::EINVAL, &cause))
            },
        }
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================

#[cfg(test)]
mod tests {
    use super::Config;
    use ::anyhow::Result;

    /// Tests that missing sections and keys fall back to defaults.
    #[test]
    fn missing_keys_fall_back_to_defaults() -> Result<()> {
        let config: Config = Config::from_yaml("other:\n  key: 1\n")?;
        crate::ensure_eq!(config.trampoline_capacity()?, 64);
        crate::ensure_eq!(config.timer_capacity()?, 64);
        Ok(())
    }

    /// Tests that present keys are honored and malformed values rejected.
    #[test]
    fn present_keys_are_honored() -> Result<()> {
        let config: Config = Config::from_yaml("kernel:\n  trampoline_capacity: 128\n")?;
        crate::ensure_eq!(config.trampoline_capacity()?, 128);

        let config: Config = Config::from_yaml("kernel:\n  trampoline_capacity: -4\n")?;
        crate::ensure_eq!(config.trampoline_capacity().is_err(), true);

        Ok(())
    }
}
