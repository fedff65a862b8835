//! Run configuration for the adapter pipeline.
//!
//! An [`AdapterConfig`] is assembled through [`AdapterConfigBuilder`], which
//! starts from production defaults and validates every knob in
//! [`AdapterConfigBuilder::build`]. The configuration is immutable once built
//! and is shared read-only by every stage.

use core::fmt;

use serde::{Deserialize, Serialize};

pub use crate::annotation::LexMode;

/// Verifier id the Cairo statement contract expects for the stone verifier.
pub const DEFAULT_CAIRO_VERIFIER_ID: u64 = 6;

/// Default width of a regular memory page.
pub const DEFAULT_MAX_REGULAR_PAGE_SIZE: usize = 256;

/// Default shortest run of sequential addresses hashed as a continuous page.
pub const DEFAULT_MIN_CONTINUOUS_RUN: usize = 2;

/// Validated adapter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdapterConfig {
    lex_mode: LexMode,
    max_regular_page_size: usize,
    min_continuous_run: usize,
    cairo_verifier_id: u64,
}

impl AdapterConfig {
    /// Returns a builder initialised with the production defaults.
    pub fn builder() -> AdapterConfigBuilder {
        AdapterConfigBuilder::new()
    }

    /// Handling of annotation lines outside the grammar.
    pub fn lex_mode(&self) -> LexMode {
        self.lex_mode
    }

    /// Maximum number of cells in a regular memory page.
    pub fn max_regular_page_size(&self) -> usize {
        self.max_regular_page_size
    }

    /// Shortest run of sequential addresses that becomes a continuous page.
    pub fn min_continuous_run(&self) -> usize {
        self.min_continuous_run
    }

    /// `cairo_verifier_id` argument of the main statement call.
    pub fn cairo_verifier_id(&self) -> u64 {
        self.cairo_verifier_id
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        AdapterConfig {
            lex_mode: LexMode::Strict,
            max_regular_page_size: DEFAULT_MAX_REGULAR_PAGE_SIZE,
            min_continuous_run: DEFAULT_MIN_CONTINUOUS_RUN,
            cairo_verifier_id: DEFAULT_CAIRO_VERIFIER_ID,
        }
    }
}

/// Builder used to assemble an [`AdapterConfig`] with validation.
///
/// | Field | Default |
/// |-------|---------|
/// | `lex_mode` | [`LexMode::Strict`] |
/// | `max_regular_page_size` | `256` cells |
/// | `min_continuous_run` | `2` cells |
/// | `cairo_verifier_id` | `6` |
#[derive(Debug, Clone)]
pub struct AdapterConfigBuilder {
    pub lex_mode: LexMode,
    pub max_regular_page_size: usize,
    pub min_continuous_run: usize,
    pub cairo_verifier_id: u64,
}

impl AdapterConfigBuilder {
    /// Returns a builder initialised with the production defaults.
    pub fn new() -> Self {
        let defaults = AdapterConfig::default();
        AdapterConfigBuilder {
            lex_mode: defaults.lex_mode,
            max_regular_page_size: defaults.max_regular_page_size,
            min_continuous_run: defaults.min_continuous_run,
            cairo_verifier_id: defaults.cairo_verifier_id,
        }
    }

    pub fn lex_mode(mut self, mode: LexMode) -> Self {
        self.lex_mode = mode;
        self
    }

    pub fn max_regular_page_size(mut self, cells: usize) -> Self {
        self.max_regular_page_size = cells;
        self
    }

    pub fn min_continuous_run(mut self, cells: usize) -> Self {
        self.min_continuous_run = cells;
        self
    }

    pub fn cairo_verifier_id(mut self, id: u64) -> Self {
        self.cairo_verifier_id = id;
        self
    }

    /// Validates the builder fields and emits an [`AdapterConfig`].
    pub fn build(&self) -> Result<AdapterConfig, ConfigError> {
        if self.max_regular_page_size == 0 {
            return Err(ConfigError::RegularPageSizeZero);
        }
        if self.min_continuous_run < 2 {
            return Err(ConfigError::ContinuousRunTooShort {
                min: 2,
                got: self.min_continuous_run,
            });
        }
        Ok(AdapterConfig {
            lex_mode: self.lex_mode,
            max_regular_page_size: self.max_regular_page_size,
            min_continuous_run: self.min_continuous_run,
            cairo_verifier_id: self.cairo_verifier_id,
        })
    }
}

impl Default for AdapterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Error enumeration for configuration validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Regular pages must hold at least one cell.
    RegularPageSizeZero,
    /// A continuous page needs at least two sequential cells.
    ContinuousRunTooShort { min: usize, got: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::RegularPageSizeZero => {
                write!(f, "max_regular_page_size must be non-zero")
            }
            ConfigError::ContinuousRunTooShort { min, got } => {
                write!(f, "min_continuous_run must be at least {min}, got {got}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build() {
        let config = AdapterConfigBuilder::new().build().expect("defaults are valid");
        assert_eq!(config, AdapterConfig::default());
        assert_eq!(config.cairo_verifier_id(), 6);
        assert_eq!(config.lex_mode(), LexMode::Strict);
    }

    #[test]
    fn rejects_degenerate_pages() {
        let err = AdapterConfig::builder()
            .max_regular_page_size(0)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::RegularPageSizeZero);

        let err = AdapterConfig::builder()
            .min_continuous_run(1)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::ContinuousRunTooShort { min: 2, got: 1 });
    }
}
