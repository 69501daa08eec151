//! Resolution of the constraint usage graph.

use crate::FormatError;
use kconvert_core::ModelBuilder;
use log::{debug, trace};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Resolves the reference ids found in the properties of each symbol
/// into the names of the symbols they stand for.
///
/// Only the forward relation is set here:
/// the reverse one is computed when the model gets built,
/// once every symbol's constraints are known.
pub(crate) fn link(
    symbols: &mut ModelBuilder,
    id_to_name: &HashMap<String, String>,
    used_ids: BTreeMap<String, BTreeSet<String>>,
) -> Result<(), FormatError> {
    let mut edges = 0;
    for (name, ids) in used_ids {
        let used = ids
            .into_iter()
            .map(|id| {
                id_to_name
                    .get(&id)
                    .filter(|used| symbols.contains(used))
                    .cloned()
                    .ok_or(FormatError::UnresolvedId(id))
            })
            .collect::<Result<BTreeSet<_>, _>>()?;
        trace!(target: "parser", "'{name}' uses {} symbols", used.len());
        edges += used.len();
        symbols.set_used_in_constraints(&name, used)?;
    }
    debug!(target: "parser", "resolved {edges} constraint references");
    Ok(())
}
