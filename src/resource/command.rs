// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use crate::runtime::fail::Fail;
use ::std::time::Duration;

//==============================================================================
// Structures
//==============================================================================

/// The value a consumer pushes into its context each time it is pulled.
///
/// Commands are validated at construction; a negative or non-finite rate never
/// reaches the kernel. Use [Command::consume], [Command::idle] and
/// [Command::exit] rather than building variants directly.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Run at `limit` units/s, optionally for a bounded duration.
    Consume { limit: f64, duration: Option<Duration> },
    /// Do nothing, optionally until a deadline relative to now.
    Idle { deadline: Option<Duration> },
    /// Detach from the resource.
    Exit,
}

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate Functions for Commands
impl Command {
    /// Creates a command requesting to run at `limit` units/s for an optional
    /// bounded duration.
    pub fn consume(limit: f64, duration: Option<Duration>) -> Result<Self, Fail> {
        if !limit.is_finite() || limit < 0.0 {
            let cause: String = format!("invalid rate limit (limit={:?})", limit);
            error!("consume(): {}", cause);
            return Err(Fail::new(libc::EINVAL, &cause));
        }
        Ok(Self::Consume { limit, duration })
    }

    /// Creates a command requesting to idle, optionally until a deadline
    /// relative to the current instant.
    pub fn idle(deadline: Option<Duration>) -> Self {
        Self::Idle { deadline }
    }

    /// Creates a command requesting to detach from the resource.
    pub fn exit() -> Self {
        Self::Exit
    }
}

//==============================================================================
// Unit Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::Command;
    use ::anyhow::Result;
    use ::std::time::Duration;

    /// Tests that well-formed commands construct.
    #[test]
    fn valid_commands_construct() -> Result<()> {
        crate::ensure_eq!(Command::consume(0.0, None).is_ok(), true);
        crate::ensure_eq!(Command::consume(1000.0, Some(Duration::from_secs(1))).is_ok(), true);
        Ok(())
    }

    /// Tests that invalid rates are rejected eagerly, before they reach the
    /// kernel.
    #[test]
    fn invalid_rates_are_rejected() -> Result<()> {
        crate::ensure_eq!(Command::consume(-1.0, None).is_err(), true);
        crate::ensure_eq!(Command::consume(f64::NAN, None).is_err(), true);
        crate::ensure_eq!(Command::consume(f64::INFINITY, None).is_err(), true);
        Ok(())
    }
}
