//! Out-of-band fragment merging.
//!
//! Every additional fragment must be a single root element with an `id`.
//! The root gets an `hx-swap-oob="<mode>:#<id>"` attribute and is queued on
//! the primary reply; the markup is appended when the reply is finalized.

use crate::error::FragmentRule;
use crate::markup;
use crate::{Error, Reply};

pub const OOB_ATTRIBUTE: &str = "hx-swap-oob";

/// A validated and tagged out-of-band fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OobEntry {
    pub id: String,
    pub swap: String,
    /// Fragment markup with the swap attribute set on its root
    pub rendered: String,
}

/// Validate `markup` and tag its root element for an out-of-band swap
pub fn tag_fragment(markup: &str, swap_mode: &str) -> Result<OobEntry, Error> {
    let top = markup::top_level(markup);
    let root = top.single_root().ok_or(Error::MalformedFragment {
        rule: FragmentRule::ExactlyOneRoot,
    })?;

    let id = root
        .attr("id")
        .filter(|id| !id.is_empty())
        .ok_or(Error::MalformedFragment {
            rule: FragmentRule::IdentifiedRoot,
        })?
        .to_string();

    let value = format!("{}:#{}", swap_mode, id);
    Ok(OobEntry {
        rendered: markup::set_attr(markup, root, OOB_ATTRIBUTE, &value),
        swap: swap_mode.to_string(),
        id,
    })
}

/// Queue `additional` fragments onto `primary`, in order.
///
/// Validation happens up front: if any fragment is malformed nothing is
/// queued and the error is returned.
pub fn merge(primary: Reply, additional: Vec<Reply>, swap_mode: &str) -> Result<Reply, Error> {
    let mut primary = primary;
    let mut entries = Vec::new();
    for fragment in additional {
        let (response, nested) = fragment.into_parts();
        entries.extend(nested);
        entries.push(tag_fragment(&response.body_str(), swap_mode)?);
    }

    tracing::debug!(count = entries.len(), swap = swap_mode, "Merging out-of-band fragments");
    primary.queue_oob(entries);
    Ok(primary)
}
