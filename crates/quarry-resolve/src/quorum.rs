//! Quorum verification: majority-by-corroboration across mirrors.
//!
//! Several repositories may each offer the same module version with
//! different content hashes (a stale mirror, a compromised mirror, or a
//! legitimate re-publish). The verifier groups offers by declared hash and
//! trusts the hash corroborated by the most mirrors.

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use semver::{Version, VersionReq};
use std::collections::BTreeMap;
use std::future::Future;
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::source::{SharedDownloadable, SharedRepository};

/// How many repositories are queried concurrently during gathering.
const QUERY_CONCURRENCY: usize = 8;

/// Resolve one module against every live source, returning at most one
/// verified artifact per distinct version satisfying `constraint`.
///
/// `combine` turns each winning group of agreeing offers into the single
/// artifact handed back to the caller.
#[instrument(skip(sources, combine), fields(sources = sources.len()))]
pub async fn find_verified<C>(
    sources: &[SharedRepository],
    module: &str,
    constraint: &VersionReq,
    combine: C,
) -> Result<Vec<SharedDownloadable>>
where
    C: Fn(Vec<SharedDownloadable>) -> Result<SharedDownloadable>,
{
    let candidates = gather(sources, |repo: SharedRepository| async move {
        repo.find(module, constraint).await
    })
    .await;
    combine_winners(candidates, combine)
}

/// Enumerate every module and version observed across the live sources,
/// returning at most one verified artifact per `(name, version)` pair.
#[instrument(skip(sources, combine), fields(sources = sources.len()))]
pub async fn find_all_verified<C>(
    sources: &[SharedRepository],
    combine: C,
) -> Result<Vec<SharedDownloadable>>
where
    C: Fn(Vec<SharedDownloadable>) -> Result<SharedDownloadable>,
{
    let candidates =
        gather(sources, |repo: SharedRepository| async move { repo.find_all().await }).await;
    combine_winners(candidates, combine)
}

/// Query all non-caching sources concurrently and pool their offers.
///
/// A source that fails its query is treated as offering nothing; going
/// offline is a normal condition for a mirror, not an error for the
/// resolution as a whole.
async fn gather<F, Fut>(sources: &[SharedRepository], query: F) -> Vec<SharedDownloadable>
where
    F: Fn(SharedRepository) -> Fut,
    Fut: Future<Output = Result<Vec<SharedDownloadable>>> + Send,
{
    let live: Vec<SharedRepository> = sources
        .iter()
        .filter(|source| !source.is_caching())
        .cloned()
        .collect();

    let queries: Vec<_> = live
        .into_iter()
        .map(|repo: SharedRepository| {
            let name = repo.name().to_string();
            let fut = query(repo);
            async move { (name, fut.await) }.boxed()
        })
        .collect();

    let results: Vec<(String, Result<Vec<SharedDownloadable>>)> = stream::iter(queries)
        .buffer_unordered(QUERY_CONCURRENCY)
        .collect()
        .await;

    let mut candidates = Vec::new();
    for (source, result) in results {
        match result {
            Ok(offers) => {
                debug!("{} offered {} artifacts", source, offers.len());
                candidates.extend(offers);
            }
            Err(e) => warn!("Skipping unreachable repository {}: {}", source, e),
        }
    }
    candidates
}

/// Partition offers per `(name, version)` into hash groups, pick each
/// winning group and hand it to the combiner.
fn combine_winners<C>(
    candidates: Vec<SharedDownloadable>,
    combine: C,
) -> Result<Vec<SharedDownloadable>>
where
    C: Fn(Vec<SharedDownloadable>) -> Result<SharedDownloadable>,
{
    let mut verified = Vec::new();
    for group in select_quorums(candidates) {
        verified.push(combine(group)?);
    }
    Ok(verified)
}

/// Group offers by module identity and declared hash, then select the
/// largest hash group per identity.
///
/// Ties between equally corroborated groups break toward the
/// lexicographically smallest content hash, so selection is deterministic
/// regardless of the order mirrors answered in. A group of size one still
/// wins when it is the only one; corroboration improves confidence but is
/// not required.
fn select_quorums(candidates: Vec<SharedDownloadable>) -> Vec<Vec<SharedDownloadable>> {
    let mut by_module: BTreeMap<(String, Version), BTreeMap<String, Vec<SharedDownloadable>>> =
        BTreeMap::new();

    for offer in candidates {
        by_module
            .entry((offer.name().to_string(), offer.version().clone()))
            .or_default()
            .entry(offer.content_hash().to_lowercase())
            .or_default()
            .push(offer);
    }

    let mut winners = Vec::new();
    for ((name, version), groups) in by_module {
        let mut best: Option<(String, Vec<SharedDownloadable>)> = None;
        let contenders = groups.len();

        // Ascending hash order, so the first group of maximal size is the
        // smallest hash among the tied ones.
        for (hash, group) in groups {
            match &best {
                Some((_, current)) if group.len() <= current.len() => {}
                _ => best = Some((hash, group)),
            }
        }

        if let Some((hash, group)) = best {
            if contenders > 1 {
                debug!(
                    "{}@{}: {} hash groups, trusting {} ({} mirrors)",
                    name,
                    version,
                    contenders,
                    &hash[..hash.len().min(12)],
                    group.len()
                );
            }
            winners.push(group);
        }
    }
    winners
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combined::CombinedDownloadable;
    use crate::source::Downloadable;
    use bytes::Bytes;
    use std::sync::Arc;

    struct Offer {
        name: String,
        version: Version,
        hash: String,
    }

    #[async_trait::async_trait]
    impl Downloadable for Offer {
        fn name(&self) -> &str {
            &self.name
        }
        fn version(&self) -> &Version {
            &self.version
        }
        fn content_hash(&self) -> &str {
            &self.hash
        }
        async fn fetch_zip(&self) -> Result<Bytes> {
            unimplemented!("selection tests never fetch")
        }
    }

    fn offer(name: &str, version: &str, hash: &str) -> SharedDownloadable {
        Arc::new(Offer {
            name: name.to_string(),
            version: version.parse().unwrap(),
            hash: hash.to_string(),
        })
    }

    #[test]
    fn test_majority_wins() {
        let winners = select_quorums(vec![
            offer("test/a", "1.0.0", "aa"),
            offer("test/a", "1.0.0", "bb"),
            offer("test/a", "1.0.0", "aa"),
            offer("test/a", "1.0.0", "aa"),
        ]);

        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].len(), 3);
        assert!(winners[0].iter().all(|d| d.content_hash() == "aa"));
    }

    #[test]
    fn test_tie_breaks_to_smallest_hash() {
        let winners = select_quorums(vec![
            offer("test/a", "1.0.0", "ff"),
            offer("test/a", "1.0.0", "aa"),
        ]);

        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0][0].content_hash(), "aa");
    }

    #[test]
    fn test_single_mirror_still_wins() {
        let winners = select_quorums(vec![offer("test/a", "1.0.0", "aa")]);
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].len(), 1);
    }

    #[test]
    fn test_one_winner_per_version() {
        let winners = select_quorums(vec![
            offer("test/a", "1.0.0", "aa"),
            offer("test/a", "1.1.0", "bb"),
            offer("test/b", "2.0.0", "cc"),
        ]);
        assert_eq!(winners.len(), 3);
    }

    #[test]
    fn test_empty_observation_is_not_an_error() {
        assert!(select_quorums(Vec::new()).is_empty());
        assert!(combine_winners(Vec::new(), CombinedDownloadable::combine)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_hash_grouping_is_case_insensitive() {
        let winners = select_quorums(vec![
            offer("test/a", "1.0.0", "AA"),
            offer("test/a", "1.0.0", "aa"),
            offer("test/a", "1.0.0", "bb"),
        ]);
        assert_eq!(winners[0].len(), 2);
    }
}
