use buddy_model::{MediaKind, MediaNode, NodeId, RuleScope};

use crate::catalog::CatalogSnapshot;
use crate::error::{CoreError, Result, ScopeKind};

/// Candidate episodes for `scope`, possibly with repeats when scopes
/// overlap. Every referenced id is checked before anything is collected.
///
/// Libraries only contribute when no show or season is named explicitly.
pub(crate) fn expand<'a>(
    snapshot: &'a CatalogSnapshot,
    scope: &RuleScope,
    include_specials: bool,
) -> Result<Vec<&'a MediaNode>> {
    validate(snapshot, scope)?;

    let mut candidates = Vec::new();
    for id in scope.shows.iter().chain(&scope.seasons) {
        candidates.extend(snapshot.episodes_under(id));
    }
    for id in &scope.collections {
        if let Some(collection) = snapshot.collection(id) {
            for member in &collection.members {
                candidates.extend(snapshot.episodes_under(member));
            }
        }
    }
    if !scope.has_explicit_nodes() {
        for library in &scope.libraries {
            for show in snapshot.shows_in(library) {
                candidates.extend(snapshot.episodes_under(show));
            }
        }
    }

    if !include_specials {
        candidates.retain(|node| !node.is_special());
    }
    Ok(candidates)
}

fn validate(snapshot: &CatalogSnapshot, scope: &RuleScope) -> Result<()> {
    if let Some(missing) =
        scope.libraries.iter().find(|id| !snapshot.has_library(id))
    {
        return Err(not_found(ScopeKind::Library, missing));
    }
    if let Some(missing) = scope
        .shows
        .iter()
        .find(|id| !is_kind(snapshot, id, MediaKind::Show))
    {
        return Err(not_found(ScopeKind::Show, missing));
    }
    if let Some(missing) = scope
        .seasons
        .iter()
        .find(|id| !is_kind(snapshot, id, MediaKind::Season))
    {
        return Err(not_found(ScopeKind::Season, missing));
    }
    if let Some(missing) = scope
        .collections
        .iter()
        .find(|id| snapshot.collection(id).is_none())
    {
        return Err(not_found(ScopeKind::Collection, missing));
    }
    Ok(())
}

fn is_kind(snapshot: &CatalogSnapshot, id: &NodeId, kind: MediaKind) -> bool {
    snapshot.get(id).is_some_and(|node| node.kind == kind)
}

fn not_found(scope: ScopeKind, id: impl ToString) -> CoreError {
    CoreError::ScopeNotFound {
        scope,
        id: id.to_string(),
    }
}
