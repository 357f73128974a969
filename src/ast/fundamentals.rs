//! The fixed registry of built-in fundamental scalar types.
//!
//! Built once at startup and read-only thereafter. Modules never own these
//! as registry entries; [`Module::find`](super::Module::find) falls back to
//! this list on a registry miss and lazily interns a per-module node for
//! each hit.

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;

use super::path::{Segment, SymbolPath};

/// Signed/unsigned variations of one integral base name, plus the
/// ` int`-suffixed forms where the language allows them
/// (`short` → `short int`, `unsigned long` → `unsigned long int`, ...).
fn variations(out: &mut Vec<String>, base: &str, do_int: bool) {
    out.push(base.to_owned());
    out.push(format!("signed {base}"));
    out.push(format!("unsigned {base}"));
    if do_int {
        variations(out, &format!("{base} int"), false);
    }
}

/// Every fundamental scalar type name, built once.
pub static FUNDAMENTAL_TYPE_NAMES: Lazy<Vec<String>> = Lazy::new(|| {
    let mut names = vec![
        "wchar_t".to_owned(),
        "void".to_owned(),
        "bool".to_owned(),
        "float".to_owned(),
        "double".to_owned(),
        "long double".to_owned(),
    ];
    variations(&mut names, "char", false);
    variations(&mut names, "short", true);
    variations(&mut names, "int", false);
    variations(&mut names, "long", true);
    variations(&mut names, "long long", true);
    names
});

static FUNDAMENTAL_SET: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    FUNDAMENTAL_TYPE_NAMES.iter().map(|s| s.as_str()).collect()
});

/// True if `path` names a fundamental scalar type: a single basic segment
/// matching the registry.
pub fn is_fundamental(path: &SymbolPath) -> bool {
    if path.len() != 1 {
        return false;
    }
    match path.own_name() {
        Some(Segment::Basic(name)) => FUNDAMENTAL_SET.contains(name.as_str()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("char")]
    #[case("signed char")]
    #[case("unsigned char")]
    #[case("short")]
    #[case("short int")]
    #[case("unsigned short int")]
    #[case("int")]
    #[case("signed int")]
    #[case("long")]
    #[case("long int")]
    #[case("unsigned long long int")]
    #[case("long double")]
    #[case("wchar_t")]
    fn test_variation_present(#[case] name: &str) {
        assert!(
            FUNDAMENTAL_TYPE_NAMES.iter().any(|n| n == name),
            "missing {name}"
        );
    }

    #[rstest]
    #[case("char int")]
    #[case("int int")]
    #[case("signed bool")]
    fn test_invalid_spellings_absent(#[case] name: &str) {
        assert!(!FUNDAMENTAL_TYPE_NAMES.iter().any(|n| n == name));
    }

    #[test]
    fn test_is_fundamental() {
        assert!(is_fundamental(&SymbolPath::root().join_name("bool")));
        assert!(is_fundamental(
            &SymbolPath::root().join_name("unsigned long long")
        ));
        assert!(!is_fundamental(&SymbolPath::root().join_name("Widget")));
        // Nested paths are never fundamental.
        assert!(!is_fundamental(
            &SymbolPath::root().join_name("std").join_name("int")
        ));
    }
}
