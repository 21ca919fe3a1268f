//! Reserved namespaces and the prefix bindings every query sees.

use std::collections::HashMap;

/// Directive elements (`xt:string`, `xt:contents`, `xt:append`) and the
/// `xt:extends` attribute.
pub const XT_NS: &str = "http://ki.ujep.cz/ns/xtools";
/// Custom functions callable as `f:name(...)`.
pub const FUNC_NS: &str = "http://ki.ujep.cz/ns/func";
/// Hoisted tag attributes and their wrapper elements.
pub const TAG_NS: &str = "http://ki.ujep.cz/ns/xtags";
pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
/// Person records read by the `aname` function.
pub const AK_NS: &str = "http://ki.ujep.cz/ns/akreditace";

pub const XT_PREFIX: &str = "xt";
pub const FUNC_PREFIX: &str = "f";
pub const TAG_PREFIX: &str = "tag";

/// Prefixes that always resolve to the engine's own namespaces.
pub const RESERVED: [(&str, &str); 3] = [
    (XT_PREFIX, XT_NS),
    (FUNC_PREFIX, FUNC_NS),
    (TAG_PREFIX, TAG_NS),
];

/// The reserved bindings on top of `user` bindings.
pub fn with_reserved(user: impl IntoIterator<Item = (String, String)>) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = user.into_iter().collect();
    for (prefix, uri) in RESERVED {
        map.insert(prefix.to_string(), uri.to_string());
    }
    map
}
