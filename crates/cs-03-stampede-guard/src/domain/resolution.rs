//! Outcome of one `resolve` call

/// Where a resolution's answer came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResolutionSource {
    /// The membership filter ruled the key out; nothing else was consulted.
    FilteredAbsent,
    /// Answered from the cache (a value or a cached absence).
    CacheHit,
    /// Loaded from the authoritative source and cached as present.
    CacheMiss,
    /// Authoritative source had nothing; the absence marker was cached.
    AbsentCached,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub value: Option<Vec<u8>>,
    pub source: ResolutionSource,
}

impl Resolution {
    pub fn new(value: Option<Vec<u8>>, source: ResolutionSource) -> Self {
        Self { value, source }
    }

    pub fn found(&self) -> bool {
        self.value.is_some()
    }

    pub fn into_value(self) -> Option<Vec<u8>> {
        self.value
    }
}
