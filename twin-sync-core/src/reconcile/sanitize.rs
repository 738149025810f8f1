/// Map a property key to one legal for the store's property-bag schema.
///
/// Reported-property names must not contain `.`, `$`, `#`, or spaces; each
/// occurrence becomes `_`. Total and idempotent.
pub fn sanitize_property_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '.' | '$' | '#' | ' ' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_every_forbidden_character() {
        assert_eq!(sanitize_property_name("a.b"), "a_b");
        assert_eq!(sanitize_property_name("$version"), "_version");
        assert_eq!(sanitize_property_name("#tag"), "_tag");
        assert_eq!(sanitize_property_name("two words"), "two_words");
        assert_eq!(sanitize_property_name("a.b$c#d e"), "a_b_c_d_e");
    }

    #[test]
    fn leaves_legal_names_alone() {
        assert_eq!(sanitize_property_name("temperature"), "temperature");
        assert_eq!(sanitize_property_name("already_clean-1"), "already_clean-1");
        assert_eq!(sanitize_property_name(""), "");
    }

    #[test]
    fn is_idempotent() {
        for name in ["a.b.c", "$x $y", "plain", "#.$ ", "ünïcödé.key"] {
            let once = sanitize_property_name(name);
            assert_eq!(sanitize_property_name(&once), once);
        }
    }
}
