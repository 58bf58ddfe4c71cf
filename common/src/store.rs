//! Adaptadores del object store.
//!
//! Todas las fases intercambian datos a través de un `ChunkStore`: el splitter
//! escribe chunks, los mappers leen chunks y escriben conteos parciales, el
//! reducer lee los parciales y escribe el conteo final. Esta capa no cachea ni
//! reintenta; los reintentos son del que llama.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::chunk::JSON_CONTENT_TYPE;
use crate::error::StoreError;

#[async_trait]
pub trait ChunkStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Una vez que devuelve Ok el objeto es visible para todos (sin rollback).
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError>;

    /// Nombre corto del backend para logs.
    fn describe(&self) -> String;
}

/// Lee un objeto JSON y lo deserializa.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn ChunkStore,
    bucket: &str,
    key: &str,
) -> Result<T, StoreError> {
    let bytes = store.get(bucket, key).await?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::io(key, format!("JSON inválido: {e}")))
}

/// Serializa a JSON y escribe con content type `application/json`.
pub async fn put_json<T: Serialize + Sync>(
    store: &dyn ChunkStore,
    bucket: &str,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(value).map_err(|e| StoreError::io(key, e))?;
    store.put(bucket, key, bytes, JSON_CONTENT_TYPE).await
}

/* ---------------- memoria ---------------- */

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Store en memoria, compartible entre tareas (tests y demos de un solo proceso).
#[derive(Clone, Default)]
pub struct MemoryStore {
    objects: Arc<Mutex<HashMap<(String, String), StoredObject>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Objeto completo (bytes + content type), si existe.
    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        let objects = self.objects.lock().ok()?;
        objects.get(&(bucket.to_string(), key.to_string())).cloned()
    }

    /// Claves de un bucket, ordenadas.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let Ok(objects) = self.objects.lock() else {
            return Vec::new();
        };
        let mut keys: Vec<String> = objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ChunkStore for MemoryStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let objects = self
            .objects
            .lock()
            .map_err(|_| StoreError::Backend("lock objects".into()))?;

        objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.bytes.clone())
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| StoreError::Backend("lock objects".into()))?;

        objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/* ---------------- sistema de archivos ---------------- */

/// Store sobre un directorio local: `{root}/{bucket}/{key}`.
/// Sirve para correr mappers/reducer en la misma máquina o sobre un volumen compartido.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resuelve la ruta de un objeto. Rechaza claves absolutas o con `..`.
    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        for part in [bucket, key] {
            let path = Path::new(part);
            let safe = !part.is_empty()
                && path
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)));
            if !safe {
                return Err(StoreError::InvalidKey(format!("{bucket}/{key}")));
            }
        }
        Ok(self.root.join(bucket).join(key))
    }
}

#[async_trait]
impl ChunkStore for FsStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(StoreError::io(key, e)),
        }
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key)?;

        // Crear carpeta intermedia si hace falta
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(key, e))?;
        }

        debug!("fs put {} ({} bytes, {})", path.display(), bytes.len(), content_type);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StoreError::io(key, e))
    }

    fn describe(&self) -> String {
        format!("fs:{}", self.root.display())
    }
}

/* ---------------- S3 / MinIO ---------------- */

#[cfg(feature = "s3")]
pub use s3_backend::S3Store;

#[cfg(feature = "s3")]
mod s3_backend {
    use async_trait::async_trait;
    use aws_sdk_s3::primitives::ByteStream;
    use aws_sdk_s3::Client;

    use super::ChunkStore;
    use crate::error::StoreError;

    /// Store sobre S3 (o MinIO si se pasa `endpoint`).
    #[derive(Clone)]
    pub struct S3Store {
        client: Client,
    }

    impl S3Store {
        pub async fn connect(region: &str, endpoint: Option<String>) -> Self {
            let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_config::Region::new(region.to_string()));
            if let Some(url) = endpoint {
                loader = loader.endpoint_url(url);
            }
            let shared = loader.load().await;

            // MinIO necesita path-style
            let config = aws_sdk_s3::config::Builder::from(&shared)
                .force_path_style(true)
                .build();

            Self {
                client: Client::from_conf(config),
            }
        }
    }

    #[async_trait]
    impl ChunkStore for S3Store {
        async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
            let object = match self.client.get_object().bucket(bucket).key(key).send().await {
                Ok(object) => object,
                Err(e) => {
                    let missing = e
                        .as_service_error()
                        .map(|se| se.is_no_such_key())
                        .unwrap_or(false);
                    if missing {
                        return Err(StoreError::NotFound {
                            bucket: bucket.to_string(),
                            key: key.to_string(),
                        });
                    }
                    return Err(StoreError::Backend(format!("get {bucket}/{key}: {e}")));
                }
            };

            let data = object
                .body
                .collect()
                .await
                .map_err(|e| StoreError::io(key, e))?;
            Ok(data.into_bytes().to_vec())
        }

        async fn put(
            &self,
            bucket: &str,
            key: &str,
            bytes: Vec<u8>,
            content_type: &str,
        ) -> Result<(), StoreError> {
            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .content_type(content_type)
                .body(ByteStream::from(bytes))
                .send()
                .await
                .map_err(|e| StoreError::Backend(format!("put {bucket}/{key}: {e}")))?;
            Ok(())
        }

        fn describe(&self) -> String {
            "s3".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wordcount::{count_words, WordCounts};
    use std::fs;

    fn temp_dir(sub: &str) -> PathBuf {
        let base = std::env::temp_dir().join("chunk_store_tests").join(sub);
        let _ = fs::remove_dir_all(&base);
        fs::create_dir_all(&base).unwrap();
        base
    }

    #[tokio::test]
    async fn memory_store_put_then_get() {
        let store = MemoryStore::new();
        store
            .put("b", "chunks/chunk_0.txt", b"hola mundo".to_vec(), "text/plain")
            .await
            .unwrap();

        let bytes = store.get("b", "chunks/chunk_0.txt").await.unwrap();
        assert_eq!(bytes, b"hola mundo");
        assert_eq!(store.keys("b"), vec!["chunks/chunk_0.txt".to_string()]);
        assert!(store.keys("otro").is_empty());
    }

    #[tokio::test]
    async fn memory_store_missing_key_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get("b", "nada").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn json_helpers_set_content_type() {
        let store = MemoryStore::new();
        let counts = count_words("a b a");

        put_json(&store, "b", "results/mapper_0.json", &counts)
            .await
            .unwrap();

        let object = store.object("b", "results/mapper_0.json").unwrap();
        assert_eq!(object.content_type, "application/json");

        let back: WordCounts = get_json(&store, "b", "results/mapper_0.json").await.unwrap();
        assert_eq!(back, counts);
    }

    #[tokio::test]
    async fn get_json_rejects_garbage() {
        let store = MemoryStore::new();
        store
            .put("b", "results/bad.json", b"no es json".to_vec(), "application/json")
            .await
            .unwrap();

        let res: Result<WordCounts, _> = get_json(&store, "b", "results/bad.json").await;
        assert!(matches!(res, Err(StoreError::Io { .. })));
    }

    /// Debe crear directorios intermedios para la clave.
    #[tokio::test]
    async fn fs_store_creates_nested_directories() {
        let tmp = temp_dir("nested");
        let store = FsStore::new(&tmp);

        store
            .put("bucket", "chunks/chunk_3.txt", b"test test".to_vec(), "text/plain")
            .await
            .unwrap();

        assert!(tmp.join("bucket").join("chunks").join("chunk_3.txt").exists());
        let bytes = store.get("bucket", "chunks/chunk_3.txt").await.unwrap();
        assert_eq!(bytes, b"test test");
    }

    #[tokio::test]
    async fn fs_store_missing_object_is_not_found() {
        let tmp = temp_dir("missing");
        let store = FsStore::new(&tmp);

        let err = store.get("bucket", "no_existe.txt").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn fs_store_rejects_escaping_keys() {
        let tmp = temp_dir("escape");
        let store = FsStore::new(&tmp);

        for key in ["../fuera.txt", "/etc/passwd", "", "a/../../b"] {
            let err = store
                .put("bucket", key, Vec::new(), "text/plain")
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::InvalidKey(_)), "clave {key:?}");
        }
    }
}
