//! Grafo de referidos: atribución al momento de crear la cuenta.

/// Decide el `referred_by` de una cuenta nueva.
///
/// Se invoca una única vez, dentro de la misma unidad atómica que inserta la
/// cuenta. Si el código candidato no resuelve a una cuenta existente, o es el
/// propio código de la cuenta nueva, la atribución se descarta en silencio:
/// el referido enriquece el signup, nunca lo bloquea.
pub fn attribute<F>(candidate: Option<&str>, own_code: &str, resolves: F) -> Option<String>
    where F: FnOnce(&str) -> bool
{
    let code = candidate.map(str::trim).filter(|c| !c.is_empty())?;
    if code == own_code {
        return None;
    }
    resolves(code).then(|| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_unknown_blank_and_self_codes() {
        assert_eq!(attribute(Some("IK-AAAA0000"), "IK-BBBB0000", |_| false), None);
        assert_eq!(attribute(Some("   "), "IK-BBBB0000", |_| true), None);
        assert_eq!(attribute(None, "IK-BBBB0000", |_| true), None);
        assert_eq!(attribute(Some("IK-BBBB0000"), "IK-BBBB0000", |_| true), None);
    }

    #[test]
    fn keeps_resolvable_code() {
        assert_eq!(attribute(Some(" IK-AAAA0000 "), "IK-BBBB0000", |c| c == "IK-AAAA0000"),
                   Some("IK-AAAA0000".to_string()));
    }
}
