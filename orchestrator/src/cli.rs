use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use common::{ChunkStore, MapQuery, PipelineReport, ScaleRow, FINAL_OUTPUT_KEY};
use tracing::warn;

use crate::client::{endpoint_url, WorkerApi, WorkerClient};
use crate::config::{
    check_chunks, default_bucket, default_input_key, default_mapper_urls, default_reducer_url,
    default_scale_sequence, default_store_dir, parse_chunk_counts, parse_url_list,
    OrchestratorConfig, StoreConfig,
};
use crate::dispatcher::TaskDispatcher;
use crate::pipeline::PipelineRunner;
use crate::report::{render_header, render_report, render_scale_table, render_verify};
use crate::retry::{Backoff, RetryPolicy};
use crate::splitter::FixedCount;
use crate::verify::verify;

#[derive(Parser)]
#[command(name = "orchestrator")]
#[command(about = "Orquestador MapReduce de conteo de palabras (split -> map -> reduce)")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Bucket donde viven input, chunks y resultados
    #[arg(long, global = true, default_value_t = default_bucket())]
    bucket: String,

    #[arg(long, global = true, default_value_t = default_input_key())]
    input_key: String,

    /// URLs de los mappers separadas por coma
    #[arg(long, global = true, default_value_t = default_mapper_urls())]
    mappers: String,

    #[arg(long, global = true, default_value_t = default_reducer_url())]
    reducer: String,

    /// Directorio del store local (el mismo que montan los workers)
    #[arg(long, global = true, default_value_t = default_store_dir())]
    store_dir: String,

    #[arg(long, global = true, default_value_t = false)]
    s3: bool,

    #[arg(long, global = true, env = "S3_ENDPOINT")]
    s3_endpoint: Option<String>,

    #[arg(long, global = true, env = "AWS_REGION", default_value = "us-east-1")]
    region: String,

    /// Intentos totales por tarea
    #[arg(long, global = true, default_value_t = 3)]
    max_attempts: u32,

    #[arg(long, global = true, default_value_t = 2000)]
    retry_delay_ms: u64,

    #[arg(long, global = true, value_enum, default_value_t = BackoffKind::Fixed)]
    backoff: BackoffKind,

    /// Tope de espera con backoff exponencial
    #[arg(long, global = true, default_value_t = 30_000)]
    max_delay_ms: u64,

    /// Timeout de cada request HTTP
    #[arg(long, global = true, default_value_t = 30)]
    timeout_secs: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BackoffKind {
    Fixed,
    Exponential,
}

#[derive(Subcommand)]
enum Commands {
    /// Corre el pipeline completo una vez
    Run {
        #[arg(long, default_value_t = 3)]
        chunks: usize,

        /// Imprime el reporte como JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Corre el pipeline para varias cantidades de chunks y compara tiempos
    Scale {
        #[arg(long, default_value_t = default_scale_sequence())]
        chunks: String,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Demo: llama a un mapper inexistente para mostrar los reintentos
    RetryDemo {
        #[arg(long, default_value = "http://localhost:9999")]
        url: String,
    },
    /// Consulta /health y /stats de todos los workers
    Health,
    /// Compara el resultado final contra un conteo local del input
    Verify {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

impl GlobalArgs {
    fn config(&self) -> Result<OrchestratorConfig> {
        let backoff = match self.backoff {
            BackoffKind::Fixed => Backoff::Fixed,
            BackoffKind::Exponential => Backoff::Exponential {
                factor: 2,
                max_delay: Duration::from_millis(self.max_delay_ms),
            },
        };
        let store = if self.s3 {
            StoreConfig::S3 {
                region: self.region.clone(),
                endpoint: self.s3_endpoint.clone(),
            }
        } else {
            StoreConfig::Fs {
                root: PathBuf::from(&self.store_dir),
            }
        };

        let config = OrchestratorConfig {
            bucket: self.bucket.clone(),
            input_key: self.input_key.clone(),
            mapper_urls: parse_url_list(&self.mappers),
            reducer_url: self.reducer.trim_end_matches('/').to_string(),
            store,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                delay: Duration::from_millis(self.retry_delay_ms),
                backoff,
            },
            request_timeout: Duration::from_secs(self.timeout_secs),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Una corrida completa con `chunks` chunks. Un runner nuevo por corrida.
pub async fn run_once(
    config: &OrchestratorConfig,
    store: Arc<dyn ChunkStore>,
    api: Arc<dyn WorkerApi>,
    chunks: usize,
) -> Result<PipelineReport> {
    let chunks = check_chunks(chunks)?;
    let mut runner = PipelineRunner::new(config, store, api);
    Ok(runner.run(&FixedCount(chunks)).await?)
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.global.config()?;
    let client = WorkerClient::new(config.request_timeout)?;
    let api: Arc<dyn WorkerApi> = Arc::new(client);

    match cli.command {
        Commands::Run { chunks, json } => {
            let store = config.store.open().await?;
            if !json {
                println!("{}", render_header(chunks, config.mapper_urls.len()));
            }

            let report = run_once(&config, store, api, chunks).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", render_report(&report));
            }
            if !report.succeeded() {
                bail!("el pipeline terminó en {}", report.state);
            }
        }

        Commands::Scale { chunks, json } => {
            let counts = parse_chunk_counts(&chunks)?;
            let store = config.store.open().await?;
            let mut reports = Vec::with_capacity(counts.len());

            for n in counts {
                if !json {
                    println!("\n--- Probando con {n} chunk(s) ---");
                    println!("{}", render_header(n, config.mapper_urls.len()));
                }
                let report = run_once(&config, store.clone(), api.clone(), n).await?;
                if !json {
                    println!("{}", render_report(&report));
                }
                if !report.succeeded() {
                    warn!("corrida con {} chunks terminó en {}, queda fuera de la tabla", n, report.state);
                }
                reports.push(report);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                let rows: Vec<ScaleRow> = reports.iter().filter_map(ScaleRow::from_report).collect();
                println!("{}", render_scale_table(&rows));
            }
        }

        Commands::RetryDemo { url } => {
            println!("{}", "=".repeat(60));
            println!("🧪 DEMO: reintentos");
            println!("{}", "=".repeat(60));
            println!("Llamando a un mapper que no existe ({url})...\n");

            let dispatcher = TaskDispatcher::new(config.retry);
            let policy = dispatcher.policy();
            println!(
                "Política: {} intento(s), espera {}, {:?}; peor caso {} de espera acumulada\n",
                policy.max_attempts,
                crate::report::fmt_secs(policy.delay),
                policy.backoff,
                crate::report::fmt_secs(policy.worst_case_wait())
            );
            let query = MapQuery {
                bucket: config.bucket.clone(),
                key: common::chunk_key(0),
                output_key: common::mapper_output_key(0),
            };
            let task = dispatcher.task("Demo mapper", endpoint_url(&url, "/map", &query));
            let result = dispatcher
                .dispatch(task, || async { api.map(&url, &query).await })
                .await;

            if result.succeeded {
                println!("\n  Sorprendentemente respondió: {:?}", result.response_payload);
            } else {
                println!("\n  El orquestador atrapó el fallo: {}", result.error_message());
                println!(
                    "  {} intento(s) en {}",
                    result.attempts_used,
                    crate::report::fmt_secs(result.duration)
                );
                for a in &result.attempts {
                    println!(
                        "    intento {}: {} {}",
                        a.attempt,
                        crate::report::fmt_secs(a.duration),
                        a.error.as_deref().unwrap_or("ok")
                    );
                }
            }
        }

        Commands::Health => {
            let mut down = 0;
            let targets = config
                .mapper_urls
                .iter()
                .map(|u| ("mapper", u))
                .chain(std::iter::once(("reducer", &config.reducer_url)));

            for (role, url) in targets {
                match api.health(url).await {
                    Ok(h) => {
                        print!("✅ {role:<8} {url}: {}", h.status);
                        if let Ok(stats) = api.stats(url).await {
                            print!(
                                "  (host={}, requests={}, ok={}, fallidas={})",
                                stats.hostname, stats.requests, stats.succeeded, stats.failed
                            );
                        }
                        println!();
                    }
                    Err(e) => {
                        down += 1;
                        println!("❌ {role:<8} {url}: {e}");
                    }
                }
            }
            if down > 0 {
                bail!("{down} worker(s) sin responder");
            }
        }

        Commands::Verify { json } => {
            let store = config.store.open().await?;
            let report = verify(
                store.as_ref(),
                &config.bucket,
                &config.input_key,
                FINAL_OUTPUT_KEY,
            )
            .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", render_verify(&report));
            }
            if !report.is_match() {
                bail!("el resultado MapReduce no coincide con el conteo local");
            }
        }
    }

    Ok(())
}
