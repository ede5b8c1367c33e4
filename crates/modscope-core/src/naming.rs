//! Module name utilities.
//!
//! A module's full name may carry qualifiers after the first comma
//! (`Billing, Version=1.0.0.0, Culture=neutral`). The simple name is the part
//! before it.
//!
//! Name length is defined once: the number of characters in the simple name.
//! Dots are ordinary characters, so `Billing.Api` has length 11.

/// The simple name of a module, without version or culture qualifiers.
///
/// # Examples
/// ```
/// use modscope_core::naming::simple_name;
/// assert_eq!(simple_name("Billing, Version=1.0.0.0"), "Billing");
/// assert_eq!(simple_name("Billing"), "Billing");
/// ```
pub fn simple_name(full_name: &str) -> &str {
    full_name
        .split_once(',')
        .map_or(full_name, |(name, _)| name)
        .trim()
}

/// Character count of a module's simple name.
///
/// # Examples
/// ```
/// use modscope_core::naming::name_length;
/// assert_eq!(name_length("Billing.Api"), 11);
/// assert_eq!(name_length("Billing.Api, Version=2.0.0.0"), 11);
/// ```
pub fn name_length(name: &str) -> usize {
    simple_name(name).chars().count()
}
