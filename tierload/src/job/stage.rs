//! Job stages, run reasons and the stage transition table.

use crate::error::ProtocolFault;
use crate::strategy::CacheStrategy;
use std::fmt;

/// Where a job is in its resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Initial stage, before any tier is chosen.
    Initialize,
    /// Looking for a transformed resource in the byte cache.
    ResourceCache,
    /// Looking for raw source bytes in the byte cache.
    DataCache,
    /// Fetching from the original source.
    Source,
    /// Writing the deferred encode after a successful decode.
    Encode,
    /// No more tiers to try.
    Finished,
}

impl Stage {
    /// The stage that follows this one.
    ///
    /// Skips tiers the cache strategy excludes. `Encode` has no successor in
    /// the table; it always ends the job directly.
    pub fn next(self, strategy: CacheStrategy, only_from_cache: bool) -> Result<Stage, ProtocolFault> {
        match self {
            Stage::Initialize => {
                if strategy.decode_cached_resource() {
                    Ok(Stage::ResourceCache)
                } else {
                    Stage::ResourceCache.next(strategy, only_from_cache)
                }
            }
            Stage::ResourceCache => {
                if strategy.decode_cached_data() {
                    Ok(Stage::DataCache)
                } else {
                    Stage::DataCache.next(strategy, only_from_cache)
                }
            }
            Stage::DataCache => {
                if only_from_cache {
                    Ok(Stage::Finished)
                } else {
                    Ok(Stage::Source)
                }
            }
            Stage::Source | Stage::Finished => Ok(Stage::Finished),
            Stage::Encode => Err(ProtocolFault::UnrecognizedStage(Some(self))),
        }
    }

    /// Whether this stage reads from the byte cache.
    pub fn is_cache_tier(&self) -> bool {
        matches!(self, Stage::ResourceCache | Stage::DataCache)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Initialize => "initialize",
            Stage::ResourceCache => "resource-cache",
            Stage::DataCache => "data-cache",
            Stage::Source => "source",
            Stage::Encode => "encode",
            Stage::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Why a job is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunReason {
    /// First run: choose the first stage and start iterating tiers.
    Initialize,
    /// Resume tier iteration, typically on the source executor.
    SwitchToSource,
    /// Decode data that was retrieved on another executor.
    DecodeRetrieved,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_honours_strategy() {
        assert_eq!(
            Stage::Initialize.next(CacheStrategy::Automatic, false).unwrap(),
            Stage::ResourceCache
        );
        assert_eq!(
            Stage::Initialize.next(CacheStrategy::Data, false).unwrap(),
            Stage::DataCache
        );
        assert_eq!(
            Stage::Initialize.next(CacheStrategy::None, false).unwrap(),
            Stage::Source
        );
        assert_eq!(
            Stage::Initialize.next(CacheStrategy::None, true).unwrap(),
            Stage::Finished
        );
    }

    #[test]
    fn test_resource_strategy_skips_data_cache() {
        assert_eq!(
            Stage::ResourceCache.next(CacheStrategy::Resource, false).unwrap(),
            Stage::Source
        );
    }

    #[test]
    fn test_terminal_stages() {
        for strategy in CacheStrategy::ALL_STRATEGIES {
            assert_eq!(Stage::Source.next(strategy, false).unwrap(), Stage::Finished);
            assert_eq!(Stage::Finished.next(strategy, true).unwrap(), Stage::Finished);
        }
    }

    #[test]
    fn test_every_strategy_finishes_within_four_steps() {
        for strategy in CacheStrategy::ALL_STRATEGIES {
            for only_from_cache in [false, true] {
                let mut stage = Stage::Initialize;
                let mut steps = 0;
                while stage != Stage::Finished {
                    let next = stage.next(strategy, only_from_cache).unwrap();
                    assert_ne!(next, stage, "{strategy} stalled at {stage}");
                    stage = next;
                    steps += 1;
                    assert!(steps <= 4, "{strategy} took more than four steps");
                }
            }
        }
    }

    #[test]
    fn test_encode_has_no_successor() {
        let err = Stage::Encode.next(CacheStrategy::All, false).unwrap_err();
        assert!(matches!(err, ProtocolFault::UnrecognizedStage(Some(Stage::Encode))));
    }

    #[test]
    fn test_cache_tiers() {
        assert!(Stage::ResourceCache.is_cache_tier());
        assert!(Stage::DataCache.is_cache_tier());
        assert!(!Stage::Source.is_cache_tier());
    }
}
