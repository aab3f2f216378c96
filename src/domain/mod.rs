pub(crate) mod account;
pub(crate) mod record;
pub(crate) mod roster;

/// Trims a caller-supplied optional field, folding empty into absent. Empty
/// string and `None` are the same semantic state everywhere in this crate.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
