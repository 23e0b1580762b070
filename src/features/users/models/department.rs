/// Offices a user can belong to, `(code, full name)`
pub const DEPARTMENTS: &[(&str, &str)] = &[
    ("PGSO", "Provincial General Services Office"),
    ("OPG", "Office of the Provincial Governor"),
    ("PBO", "Provincial Budget Office"),
    ("PPDO", "Provincial Planning and Development Office"),
    ("PTO", "Provincial Treasury Office"),
];

/// Canonical (upper-case) code for a department, if it is known
pub fn canonical_code(code: &str) -> Option<&'static str> {
    let code = code.trim();
    DEPARTMENTS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(code))
        .map(|(known, _)| *known)
}

/// Full office name; unknown codes are echoed back unchanged.
pub fn full_name(code: &str) -> String {
    let code_trimmed = code.trim();
    DEPARTMENTS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(code_trimmed))
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_is_case_insensitive() {
        assert_eq!(full_name("pgso"), "Provincial General Services Office");
        assert_eq!(full_name("Ppdo"), "Provincial Planning and Development Office");
    }

    #[test]
    fn test_unknown_code_echoes() {
        assert_eq!(full_name("HR"), "HR");
        assert_eq!(canonical_code("HR"), None);
    }

    #[test]
    fn test_canonical_code() {
        assert_eq!(canonical_code(" opg "), Some("OPG"));
        assert_eq!(canonical_code("PTO"), Some("PTO"));
    }
}
