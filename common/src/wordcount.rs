use std::collections::HashMap;

/// Conteo palabra -> ocurrencias. Es el formato de todos los artefactos
/// intermedios y finales que se guardan en el store (JSON).
pub type WordCounts = HashMap<String, u64>;

/// Caracteres que se recortan de los extremos de cada token.
pub const TRIM_CHARS: &[char] = &['.', ',', '!', '?', ';', ':', '"', '\'', '(', ')', '[', ']', '{', '}'];

/// Normaliza un token crudo: recorta puntuación de los extremos y pasa a minúscula.
/// Devuelve None si no queda nada.
pub fn normalize_token(raw: &str) -> Option<String> {
    let cleaned = raw.trim_matches(|c| TRIM_CHARS.contains(&c)).to_lowercase();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Cuenta palabras normalizadas de un texto.
pub fn count_words(text: &str) -> WordCounts {
    let mut counts: WordCounts = HashMap::new();

    for raw in text.split_whitespace() {
        if let Some(word) = normalize_token(raw) {
            *counts.entry(word).or_insert(0) += 1;
        }
    }

    counts
}

/// Cantidad de tokens separados por espacios (antes de normalizar).
pub fn raw_token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Suma `other` dentro de `into`, clave por clave.
pub fn merge_counts(into: &mut WordCounts, other: WordCounts) {
    for (word, count) in other {
        *into.entry(word).or_insert(0) += count;
    }
}

/// Total de ocurrencias de un conteo.
pub fn total_occurrences(counts: &WordCounts) -> u64 {
    counts.values().sum()
}

/// Las `n` palabras más frecuentes (empates por orden alfabético).
pub fn top_words(counts: &WordCounts, n: usize) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = counts
        .iter()
        .map(|(w, c)| (w.clone(), *c))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(n);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Caso feliz: texto normal, mayúsculas, signos, etc.
    #[test]
    fn count_words_normalizes_case_and_punctuation() {
        let text = "Hola hola, mundo!!\n(mundo)   \"mundo_prueba\"";

        let counts = count_words(text);

        assert_eq!(counts.get("hola"), Some(&2));
        assert_eq!(counts.get("mundo"), Some(&2));
        assert_eq!(counts.get("mundo_prueba"), Some(&1));
        assert_eq!(counts.len(), 3);
    }

    /// Sólo se recortan los extremos: la puntuación interna se conserva.
    #[test]
    fn normalize_token_keeps_inner_punctuation() {
        assert_eq!(normalize_token("don't"), Some("don't".to_string()));
        assert_eq!(normalize_token("'Tis,"), Some("tis".to_string()));
        assert_eq!(normalize_token("e.g."), Some("e.g".to_string()));
        assert_eq!(normalize_token("--"), Some("--".to_string()));
    }

    #[test]
    fn normalize_token_drops_pure_punctuation() {
        assert_eq!(normalize_token("..."), None);
        assert_eq!(normalize_token("!?"), None);
        assert_eq!(normalize_token("()"), None);
    }

    /// Texto vacío: conteo vacío.
    #[test]
    fn count_words_on_empty_input_is_empty() {
        assert!(count_words("").is_empty());
        assert!(count_words("   \n\t ").is_empty());
        assert_eq!(raw_token_count("  "), 0);
    }

    #[test]
    fn merge_counts_sums_per_key() {
        let mut a = count_words("uno dos dos");
        let b = count_words("dos tres");

        merge_counts(&mut a, b);

        assert_eq!(a.get("uno"), Some(&1));
        assert_eq!(a.get("dos"), Some(&3));
        assert_eq!(a.get("tres"), Some(&1));
        assert_eq!(total_occurrences(&a), 5);
    }

    #[test]
    fn top_words_orders_by_count_then_word() {
        let counts = count_words("b a c a b a z");

        let top = top_words(&counts, 2);

        assert_eq!(top, vec![("a".to_string(), 3), ("b".to_string(), 2)]);
    }
}
