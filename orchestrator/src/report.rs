//! Salida legible para humanos: reporte por fases, tabla de escalamiento y
//! resultado de la verificación.

use std::fmt::Write;
use std::time::Duration;

use common::{PipelineReport, PipelineState, ScaleRow};

use crate::verify::VerifyReport;

const RULE: &str = "============================================================";

pub fn fmt_secs(d: Duration) -> String {
    format!("{:.3}s", d.as_secs_f64())
}

fn fmt_opt(d: Option<Duration>) -> String {
    d.map(fmt_secs).unwrap_or_else(|| "-".to_string())
}

pub fn render_header(chunks: usize, mappers: usize) -> String {
    format!("{RULE}\nMapReduce: {chunks} chunks, {mappers} mapper(s)\n{RULE}\n")
}

pub fn render_report(report: &PipelineReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{RULE}");
    match report.state {
        PipelineState::Complete => {
            let _ = writeln!(out, "✅ PIPELINE COMPLETO");
        }
        PipelineState::Failed { phase } => {
            let _ = writeln!(out, "❌ PIPELINE FALLÓ en {phase}");
        }
        other => {
            let _ = writeln!(out, "PIPELINE en estado {other}");
        }
    }
    let _ = writeln!(out, "{RULE}");

    let _ = writeln!(out, "  Run:           {}", report.run_id);
    let _ = writeln!(out, "  Split:         {}", fmt_opt(report.split_time));
    let _ = writeln!(
        out,
        "  Map:           {} (wall clock, {} chunks)",
        fmt_opt(report.map_time),
        report.chunk_count
    );
    if let Some(sum) = report.map_task_time_sum {
        let _ = writeln!(out, "  Map (suma):    {}", fmt_secs(sum));
    }
    let _ = writeln!(out, "  Reduce:        {}", fmt_opt(report.reduce_time));
    let _ = writeln!(out, "  Total:         {}", fmt_secs(report.total_time));

    match report.unique_words {
        Some(n) => {
            let _ = writeln!(out, "  Únicas:        {n}");
        }
        None => {
            let _ = writeln!(out, "  Únicas:        N/A");
        }
    }
    let _ = writeln!(
        out,
        "  Salida:        {}",
        report.output.as_deref().unwrap_or("N/A")
    );

    if !report.chunks.is_empty() {
        let _ = writeln!(out, "\n  Chunks:");
        for c in &report.chunks {
            let status = if c.succeeded { "ok" } else { "FALLÓ" };
            let _ = write!(
                out,
                "    #{:<3} {:<5} {:>9}  {} intento(s)  {}",
                c.index,
                status,
                fmt_secs(c.duration),
                c.attempts_used,
                c.endpoint
            );
            if let Some(words) = c.unique_words {
                let _ = write!(out, "  ({words} únicas)");
            }
            let _ = writeln!(out);
        }
    }

    if let Some(failure) = &report.failure {
        let _ = writeln!(out, "\n⚠️  Fase:          {}", failure.phase);
        if !failure.chunk_indices.is_empty() {
            let _ = writeln!(out, "   Chunks:        {:?}", failure.chunk_indices);
        }
        let _ = writeln!(out, "   Intentos:      {}", failure.attempts);
        let _ = writeln!(out, "   Último error:  {}", failure.last_error);
        if failure.phase == common::Phase::Map {
            let _ = writeln!(
                out,
                "   Sin todas las salidas de los mappers no hay resultado correcto; el reduce no se ejecutó."
            );
        }
    }

    out
}

pub fn render_scale_table(rows: &[ScaleRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "RESUMEN DE ESCALAMIENTO");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "{:<10} {:<12} {:<12}", "Chunks", "Map Time", "Total Time");
    let _ = writeln!(out, "{}", "-".repeat(34));
    for row in rows {
        let _ = writeln!(
            out,
            "{:<10} {:<12.3} {:<12.3}",
            row.chunk_count,
            row.map_time.as_secs_f64(),
            row.total_time.as_secs_f64()
        );
    }
    out
}

pub fn render_verify(report: &VerifyReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Conteo local (una máquina) ===");
    let _ = writeln!(out, "Total de palabras: {}", report.local_total);
    let _ = writeln!(out, "Palabras únicas:   {}", report.local_unique);

    let _ = writeln!(out, "\n=== Conteo MapReduce ===");
    let _ = writeln!(out, "Total de palabras: {}", report.mr_total);
    let _ = writeln!(out, "Palabras únicas:   {}", report.mr_unique);

    let _ = writeln!(out, "\n=== Comparación ===");
    for (word, count) in &report.missing {
        let _ = writeln!(out, "FALTA en MapReduce: '{word}' (count: {count})");
    }
    for m in &report.mismatched {
        let _ = writeln!(
            out,
            "DIFIERE: '{}' -> local: {}, mapreduce: {}",
            m.word, m.local, m.mapreduce
        );
    }
    for (word, count) in &report.extra {
        let _ = writeln!(out, "SOBRA en MapReduce: '{word}' (count: {count})");
    }
    if report.is_match() {
        let _ = writeln!(out, "✅ COINCIDENCIA PERFECTA");
    } else {
        let _ = writeln!(out, "❌ Los resultados difieren");
    }

    let _ = writeln!(out, "\n=== Top {} ===", report.top.len());
    for (word, count) in &report.top {
        let _ = writeln!(out, "  {word}: {count}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ChunkOutcome, FailureSummary, Phase};

    fn complete_report() -> PipelineReport {
        let mut r = PipelineReport::new("b", "input.txt", 1);
        r.chunk_count = 3;
        r.state = PipelineState::Complete;
        r.split_time = Some(Duration::from_millis(120));
        r.map_time = Some(Duration::from_millis(1500));
        r.map_task_time_sum = Some(Duration::from_millis(4000));
        r.reduce_time = Some(Duration::from_millis(250));
        r.total_time = Duration::from_millis(1870);
        r.unique_words = Some(4837);
        r.output = Some("s3://b/results/final_counts.json".into());
        r
    }

    #[test]
    fn complete_report_lists_every_phase() {
        let text = render_report(&complete_report());

        assert!(text.contains("PIPELINE COMPLETO"));
        assert!(text.contains("Split:         0.120s"));
        assert!(text.contains("Map:           1.500s (wall clock, 3 chunks)"));
        assert!(text.contains("Map (suma):    4.000s"));
        assert!(text.contains("Reduce:        0.250s"));
        assert!(text.contains("Total:         1.870s"));
        assert!(text.contains("4837"));
        assert!(text.contains("s3://b/results/final_counts.json"));
        assert!(!text.contains("Último error"));
    }

    #[test]
    fn failed_report_names_phase_chunks_attempts_and_error() {
        let mut r = PipelineReport::new("b", "input.txt", 1);
        r.chunk_count = 2;
        r.state = PipelineState::Failed { phase: Phase::Map };
        r.split_time = Some(Duration::from_millis(10));
        r.map_time = Some(Duration::from_secs(4));
        r.chunks = vec![ChunkOutcome {
            index: 1,
            endpoint: "http://localhost:9999".into(),
            succeeded: false,
            attempts_used: 3,
            duration: Duration::from_secs(4),
            unique_words: None,
            total_words: None,
            error: Some("connection refused".into()),
        }];
        r.failure = Some(FailureSummary {
            phase: Phase::Map,
            chunk_indices: vec![1],
            attempts: 3,
            last_error: "falló tras 3 intentos: connection refused".into(),
        });

        let text = render_report(&r);

        assert!(text.contains("FALLÓ en Map"));
        assert!(text.contains("Chunks:        [1]"));
        assert!(text.contains("Intentos:      3"));
        assert!(text.contains("connection refused"));
        assert!(text.contains("Reduce:        -"));
        assert!(text.contains("Únicas:        N/A"));
    }

    #[test]
    fn scale_table_has_one_row_per_run() {
        let rows: Vec<ScaleRow> = [1usize, 5]
            .iter()
            .map(|&n| {
                let mut r = complete_report();
                r.chunk_count = n;
                ScaleRow::from_report(&r).unwrap()
            })
            .collect();

        let table = render_scale_table(&rows);
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines.contains(&"Chunks     Map Time     Total Time  "));
        assert!(table.contains("1          1.500        1.870"));
        assert!(table.contains("5          1.500        1.870"));
    }

    #[test]
    fn verify_output_flags_differences() {
        let report = VerifyReport {
            local_total: 3,
            local_unique: 2,
            mr_total: 2,
            mr_unique: 1,
            missing: vec![("gato".into(), 1)],
            top: vec![("el".into(), 2)],
            ..VerifyReport::default()
        };
        let text = render_verify(&report);
        assert!(text.contains("FALTA en MapReduce: 'gato' (count: 1)"));
        assert!(text.contains("Los resultados difieren"));
        assert!(text.contains("  el: 2"));
    }

    #[test]
    fn fmt_secs_uses_millisecond_precision() {
        assert_eq!(fmt_secs(Duration::from_millis(4001)), "4.001s");
        assert_eq!(render_header(3, 2).lines().nth(1), Some("MapReduce: 3 chunks, 2 mapper(s)"));
    }
}
