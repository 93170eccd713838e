//! Error types.
//!
//! | Class                 | Where it surfaces                      | Handling                          |
//! |-----------------------|----------------------------------------|-----------------------------------|
//! | Configuration         | [`Mbhc::init`](crate::Mbhc::init)      | fatal, init unwinds and returns   |
//! | Hardware access       | any register or line operation         | handlers log and drop the event   |
//! | Wake lock unavailable | button press                           | press is dropped                  |
//! | Spurious events       | release without press, bounce, deinit  | silently discarded, never errors  |

use thiserror_no_std::Error;

/// Invalid configuration or a capability the configuration needs is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Configuration enables a feature whose driver capability is absent.
    #[error("driver lacks the {0} capability")]
    MissingCapability(&'static str),
    /// Two buttons are bound to the same key code.
    #[error("key code {0} bound to more than one button")]
    DuplicateKeyCode(u16),
    /// A timing parameter or limit is zero.
    #[error("{0} must be non-zero")]
    ZeroTiming(&'static str),
}

/// Error returned by the detection engine.
#[derive(Debug, Error)]
pub enum MbhcError<E: core::fmt::Debug> {
    /// The driver failed a register, interrupt or bias operation.
    #[error("hardware access failed: {0:?}")]
    Hardware(E),
    /// Configuration rejected at init.
    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigError),
    /// The wake lock could not be taken.
    #[error("wake lock unavailable")]
    WakeLock,
}

impl<E: core::fmt::Debug> MbhcError<E> {
    /// Short label for log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hardware(_) => "hardware",
            Self::Config(_) => "config",
            Self::WakeLock => "wake-lock",
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E> = core::result::Result<T, MbhcError<E>>;
