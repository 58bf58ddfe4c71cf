use anyhow::Result;
use clap::{Parser, ValueEnum};
use common::{ChunkStore, FsStore, WorkerRole};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use worker::{build_router, AppState};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Role {
    Mapper,
    Reducer,
}

impl From<Role> for WorkerRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Mapper => WorkerRole::Mapper,
            Role::Reducer => WorkerRole::Reducer,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "worker")]
#[command(about = "Mapper / reducer HTTP del word count")]
struct Args {
    /// mapper o reducer
    #[arg(long, value_enum, env = "WORKER_ROLE")]
    role: Role,

    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Directorio raíz del store local ({dir}/{bucket}/{key})
    #[arg(long, env = "STORE_DIR", default_value = "/data/store")]
    store_dir: String,

    /// Usar S3/MinIO en vez del directorio local
    #[arg(long, default_value_t = false)]
    s3: bool,

    #[arg(long, env = "S3_ENDPOINT")]
    s3_endpoint: Option<String>,

    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    region: String,
}

async fn open_store(args: &Args) -> Result<Arc<dyn ChunkStore>> {
    if args.s3 {
        #[cfg(feature = "s3")]
        {
            let store = common::S3Store::connect(&args.region, args.s3_endpoint.clone()).await;
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "s3"))]
        anyhow::bail!("compilado sin la feature `s3` (region={})", args.region);
    }
    Ok(Arc::new(FsStore::new(&args.store_dir)))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("worker=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let store = open_store(&args).await?;
    let state = AppState::new(args.role.into(), store.clone());

    info!(
        "worker {:?} en {} usando store {}",
        state.role,
        state.hostname,
        store.describe()
    );

    let app = build_router(state);

    let listener = TcpListener::bind(("0.0.0.0", args.port)).await?;
    info!("worker escuchando en {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
