//! Encoder and decoder configuration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_INITIAL_BUFFER_SIZE, DEFAULT_MAX_DEPTH, DEFAULT_MAX_LENGTH};
use crate::{ExtensionCodec, ExtensionRegistry};

fn default_registry() -> Arc<dyn ExtensionRegistry> {
    Arc::new(ExtensionCodec::new())
}

#[derive(Debug, Clone)]
pub struct EncodeOptions {
    pub extension_codec: Arc<dyn ExtensionRegistry>,
    /// Deepest container nesting accepted; the top-level value is depth 1.
    pub max_depth: usize,
    pub initial_buffer_size: usize,
    /// Emit map keys in byte-wise sorted order.
    pub sort_keys: bool,
    /// Positional record encoding: a top-level map is written as an array
    /// holding the values of exactly these keys, in this order. Nested maps
    /// and arrays are written as usual.
    pub map_keys: Option<Vec<String>>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            extension_codec: default_registry(),
            max_depth: DEFAULT_MAX_DEPTH,
            initial_buffer_size: DEFAULT_INITIAL_BUFFER_SIZE,
            sort_keys: false,
            map_keys: None,
        }
    }
}

impl EncodeOptions {
    pub fn with_extension_codec(mut self, codec: Arc<dyn ExtensionRegistry>) -> Self {
        self.extension_codec = codec;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_initial_buffer_size(mut self, size: usize) -> Self {
        self.initial_buffer_size = size;
        self
    }

    pub fn with_sort_keys(mut self, sort_keys: bool) -> Self {
        self.sort_keys = sort_keys;
        self
    }

    pub fn with_map_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }
}

/// Per-category ceilings on decoded length prefixes.
///
/// Loadable from configuration; missing fields take the default of
/// 4294967295.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeLimits {
    pub max_str_length: usize,
    pub max_bin_length: usize,
    pub max_array_length: usize,
    pub max_map_length: usize,
    pub max_ext_length: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_str_length: DEFAULT_MAX_LENGTH,
            max_bin_length: DEFAULT_MAX_LENGTH,
            max_array_length: DEFAULT_MAX_LENGTH,
            max_map_length: DEFAULT_MAX_LENGTH,
            max_ext_length: DEFAULT_MAX_LENGTH,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecodeOptions {
    pub extension_codec: Arc<dyn ExtensionRegistry>,
    pub limits: DecodeLimits,
    /// Positional record decoding of a top-level array; must match the
    /// encoder's list.
    pub map_keys: Option<Vec<String>>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            extension_codec: default_registry(),
            limits: DecodeLimits::default(),
            map_keys: None,
        }
    }
}

impl DecodeOptions {
    pub fn with_extension_codec(mut self, codec: Arc<dyn ExtensionRegistry>) -> Self {
        self.extension_codec = codec;
        self
    }

    pub fn with_limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_max_str_length(mut self, max: usize) -> Self {
        self.limits.max_str_length = max;
        self
    }

    pub fn with_max_bin_length(mut self, max: usize) -> Self {
        self.limits.max_bin_length = max;
        self
    }

    pub fn with_max_array_length(mut self, max: usize) -> Self {
        self.limits.max_array_length = max;
        self
    }

    pub fn with_max_map_length(mut self, max: usize) -> Self {
        self.limits.max_map_length = max;
        self
    }

    pub fn with_max_ext_length(mut self, max: usize) -> Self {
        self.limits.max_ext_length = max;
        self
    }

    pub fn with_map_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }
}
