//! Desired-to-live matching.
//!
//! Pairs each desired resource with its live instance by identity-tuple
//! equality. The index already hashes identities, so matching a batch is
//! O(n); the expensive-scan concern the index's threshold policy addresses
//! must not be reintroduced here as a linear search.

use crate::desired::DesiredResource;
use crate::index::{Instance, InstanceIndex};

/// One matched pair: a desired resource and its live counterpart, if any.
/// `None` signals Create.
pub type Match<'a> = (&'a DesiredResource, Option<&'a Instance>);

/// Matches every desired resource against the index.
pub fn match_desired<'a>(
    desired: &'a [DesiredResource],
    index: &'a InstanceIndex,
) -> Vec<Match<'a>> {
    desired
        .iter()
        .map(|resource| (resource, index.get(&resource.identity)))
        .collect()
}
