//! Compara un conteo local (una sola máquina) del input contra el resultado
//! final del reduce. Usa la misma normalización que los mappers.

use common::store::get_json;
use common::wordcount::{count_words, top_words, total_occurrences, WordCounts};
use common::{ChunkStore, StoreError};
use serde::Serialize;
use tracing::info;

pub const TOP_WORDS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub word: String,
    pub local: u64,
    pub mapreduce: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    pub local_total: u64,
    pub local_unique: usize,
    pub mr_total: u64,
    pub mr_unique: usize,
    /// En el input pero no en el resultado
    pub missing: Vec<(String, u64)>,
    pub mismatched: Vec<Mismatch>,
    /// En el resultado pero no en el input
    pub extra: Vec<(String, u64)>,
    pub top: Vec<(String, u64)>,
}

impl VerifyReport {
    pub fn is_match(&self) -> bool {
        self.missing.is_empty() && self.mismatched.is_empty() && self.extra.is_empty()
    }
}

pub fn compare(local: &WordCounts, mapreduce: &WordCounts) -> VerifyReport {
    let mut missing = Vec::new();
    let mut mismatched = Vec::new();
    for (word, &count) in local {
        match mapreduce.get(word) {
            None => missing.push((word.clone(), count)),
            Some(&mr) if mr != count => mismatched.push(Mismatch {
                word: word.clone(),
                local: count,
                mapreduce: mr,
            }),
            Some(_) => {}
        }
    }
    let mut extra: Vec<(String, u64)> = mapreduce
        .iter()
        .filter(|(word, _)| !local.contains_key(*word))
        .map(|(word, &count)| (word.clone(), count))
        .collect();

    missing.sort();
    mismatched.sort_by(|a, b| a.word.cmp(&b.word));
    extra.sort();

    VerifyReport {
        local_total: total_occurrences(local),
        local_unique: local.len(),
        mr_total: total_occurrences(mapreduce),
        mr_unique: mapreduce.len(),
        missing,
        mismatched,
        extra,
        top: top_words(mapreduce, TOP_WORDS),
    }
}

/// Lee el input y el resultado final del store y los compara.
pub async fn verify(
    store: &dyn ChunkStore,
    bucket: &str,
    input_key: &str,
    final_key: &str,
) -> Result<VerifyReport, StoreError> {
    let input = store.get(bucket, input_key).await?;
    let local = count_words(&String::from_utf8_lossy(&input));
    let mapreduce: WordCounts = get_json(store, bucket, final_key).await?;

    let report = compare(&local, &mapreduce);
    info!(
        "verify {}/{}: local {} únicas, mapreduce {} únicas, coincide={}",
        bucket,
        input_key,
        report.local_unique,
        report.mr_unique,
        report.is_match()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::store::put_json;
    use common::{MemoryStore, FINAL_OUTPUT_KEY};

    fn counts(pairs: &[(&str, u64)]) -> WordCounts {
        pairs.iter().map(|(w, c)| (w.to_string(), *c)).collect()
    }

    #[test]
    fn identical_counts_match() {
        let c = counts(&[("the", 3), ("cat", 1)]);
        let report = compare(&c, &c);
        assert!(report.is_match());
        assert_eq!(report.local_total, 4);
        assert_eq!(report.mr_unique, 2);
        assert_eq!(report.top[0], ("the".to_string(), 3));
    }

    #[test]
    fn differences_are_classified() {
        let local = counts(&[("the", 3), ("cat", 1), ("hat", 2)]);
        let mr = counts(&[("the", 2), ("cat", 1), ("bat", 4)]);

        let report = compare(&local, &mr);

        assert!(!report.is_match());
        assert_eq!(report.missing, vec![("hat".to_string(), 2)]);
        assert_eq!(
            report.mismatched,
            vec![Mismatch {
                word: "the".into(),
                local: 3,
                mapreduce: 2
            }]
        );
        assert_eq!(report.extra, vec![("bat".to_string(), 4)]);
    }

    #[tokio::test]
    async fn verify_reads_input_and_final_counts_from_store() {
        let store = MemoryStore::new();
        store
            .put("b", "input.txt", b"The cat. the HAT!".to_vec(), "text/plain")
            .await
            .unwrap();
        put_json(
            &store,
            "b",
            FINAL_OUTPUT_KEY,
            &counts(&[("the", 2), ("cat", 1), ("hat", 1)]),
        )
        .await
        .unwrap();

        let report = verify(&store, "b", "input.txt", FINAL_OUTPUT_KEY).await.unwrap();

        assert!(report.is_match());
        assert_eq!(report.local_unique, 3);
        assert_eq!(report.local_total, 4);
    }

    #[tokio::test]
    async fn missing_final_counts_is_a_store_error() {
        let store = MemoryStore::new();
        store.put("b", "input.txt", b"x".to_vec(), "text/plain").await.unwrap();

        let err = verify(&store, "b", "input.txt", FINAL_OUTPUT_KEY).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
