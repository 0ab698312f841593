//! Reverse index from definitions to the type cells that name them.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::ids::{Definition, FieldId, MapId, OneOfFieldId, RpcId};

/// A committed type cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeSite {
    Field(FieldId),
    MapValue(MapId),
    OneOfField(OneOfFieldId),
    RpcRequest(RpcId),
    RpcResponse(RpcId),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ReferenceIndex {
    referrers: BTreeMap<Definition, BTreeSet<TypeSite>>,
}

impl ReferenceIndex {
    /// Moves `site` from the referrers of `old` to those of `new`.
    pub(crate) fn rebind(&mut self, site: TypeSite, old: Option<Definition>, new: Option<Definition>) {
        if old == new {
            return;
        }
        if let Some(old) = old {
            if let Some(sites) = self.referrers.get_mut(&old) {
                sites.remove(&site);
                if sites.is_empty() {
                    self.referrers.remove(&old);
                }
            }
        }
        if let Some(new) = new {
            self.referrers.entry(new).or_default().insert(site);
        }
    }

    pub(crate) fn referrers(&self, definition: Definition) -> impl Iterator<Item = TypeSite> + '_ {
        self.referrers
            .get(&definition)
            .into_iter()
            .flat_map(|sites| sites.iter().copied())
    }
}
