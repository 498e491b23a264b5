//! RediSearch vector store backend.
//!
//! Provides [`RedisVectorStore`] which implements [`VectorStore`] on top of
//! Redis hashes indexed by RediSearch, using the [redis](https://docs.rs/redis)
//! crate over a multiplexed async connection.
//!
//! Records are hashes with the fields `text`, `file`, `chunk` and `embedding`
//! (little-endian `f32` bytes). Search uses the KNN query syntax and returns
//! `text`, `file` and the distance alias `vector_score`.
//!
//! # Example
//!
//! ```rust,ignore
//! use smart_rag::redisearch::RedisVectorStore;
//!
//! let store = RedisVectorStore::connect("redis://127.0.0.1:6379").await?;
//! store.ensure_index("docs_index", "docs_index:", 768).await?;
//! let chunks = store.search(&query_embedding, "docs_index", 5).await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, Cmd, RedisError, Value};
use tracing::debug;

use crate::codec::encode_vector;
use crate::document::{Chunk, VectorRecord};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Alias under which the KNN distance is returned.
pub const SCORE_FIELD: &str = "vector_score";

const DEFAULT_ADDR: &str = "127.0.0.1:6379";

/// A [`VectorStore`] backed by Redis with the RediSearch module.
///
/// The multiplexed connection is cheap to clone and safe to use from many
/// workers at once; each call works on its own clone.
#[derive(Clone)]
pub struct RedisVectorStore {
    conn: MultiplexedConnection,
}

impl RedisVectorStore {
    /// Connect to the Redis server at `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url).map_err(Self::map_err)?;
        let conn = client.get_multiplexed_async_connection().await.map_err(Self::map_err)?;
        debug!(url, "connected to redis");
        Ok(Self { conn })
    }

    /// Connect using [`redis_url_from_env`].
    pub async fn from_env() -> Result<Self> {
        Self::connect(&redis_url_from_env()).await
    }

    /// Wrap an existing multiplexed connection.
    pub fn from_connection(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    fn map_err(e: RedisError) -> RagError {
        RagError::VectorStoreError { backend: "redis".to_string(), message: e.to_string() }
    }

    /// Read the declared dimension of `index_name`'s `embedding` field via `FT.INFO`.
    async fn index_dimension(&self, index_name: &str) -> Result<Option<usize>> {
        let mut conn = self.conn.clone();
        let info: Value = redis::cmd("FT.INFO")
            .arg(index_name)
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(find_vector_dim(&info))
    }
}

/// Resolve the Redis URL from the environment.
///
/// `REDIS_URL` wins; otherwise the address comes from `REDIS_ADDR`, then
/// `REDIS_HOST` + `REDIS_PORT`, then `127.0.0.1:6379`, with `REDIS_PASSWORD`
/// applied when set.
pub fn redis_url_from_env() -> String {
    redis_url_from_lookup(|key| std::env::var(key).ok())
}

fn redis_url_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> String {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(url) = get("REDIS_URL") {
        return url;
    }
    let addr = match (get("REDIS_ADDR"), get("REDIS_HOST"), get("REDIS_PORT")) {
        (Some(addr), _, _) => addr,
        (None, Some(host), Some(port)) => format!("{host}:{port}"),
        _ => DEFAULT_ADDR.to_string(),
    };
    match get("REDIS_PASSWORD") {
        Some(password) => format!("redis://:{password}@{addr}"),
        None => format!("redis://{addr}"),
    }
}

/// `FT.CREATE` for hash records under `key_prefix` with an HNSW cosine vector field.
pub fn create_index_cmd(index_name: &str, key_prefix: &str, dim: usize) -> Cmd {
    let mut cmd = redis::cmd("FT.CREATE");
    cmd.arg(index_name)
        .arg("ON")
        .arg("HASH")
        .arg("PREFIX")
        .arg(1)
        .arg(key_prefix)
        .arg("SCHEMA")
        .arg("text")
        .arg("TEXT")
        .arg("file")
        .arg("TAG")
        .arg("chunk")
        .arg("NUMERIC")
        .arg("embedding")
        .arg("VECTOR")
        .arg("HNSW")
        .arg(6)
        .arg("TYPE")
        .arg("FLOAT32")
        .arg("DIM")
        .arg(dim)
        .arg("DISTANCE_METRIC")
        .arg("COSINE");
    cmd
}

/// `FT.SEARCH` KNN query returning `text`, `file` and [`SCORE_FIELD`], closest first.
pub fn knn_search_cmd(index_name: &str, query_embedding: &[f32], top_k: usize) -> Cmd {
    let mut cmd = redis::cmd("FT.SEARCH");
    cmd.arg(index_name)
        .arg(format!("*=>[KNN {top_k} @embedding $vec AS {SCORE_FIELD}]"))
        .arg("PARAMS")
        .arg(2)
        .arg("vec")
        .arg(encode_vector(query_embedding))
        .arg("SORTBY")
        .arg(SCORE_FIELD)
        .arg("ASC")
        .arg("RETURN")
        .arg(3)
        .arg("text")
        .arg("file")
        .arg(SCORE_FIELD)
        .arg("LIMIT")
        .arg(0)
        .arg(top_k)
        .arg("DIALECT")
        .arg(2);
    cmd
}

/// `HSET` writing one record's fields.
pub fn store_record_cmd(key: &str, record: &VectorRecord) -> Cmd {
    let mut cmd = redis::cmd("HSET");
    cmd.arg(key)
        .arg("text")
        .arg(&record.text)
        .arg("file")
        .arg(&record.file)
        .arg("chunk")
        .arg(record.chunk_index)
        .arg("embedding")
        .arg(encode_vector(&record.embedding));
    cmd
}

fn is_already_exists(e: &RedisError) -> bool {
    e.to_string().to_ascii_lowercase().contains("already exists")
}

#[async_trait]
impl VectorStore for RedisVectorStore {
    async fn list_indexes(&self) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let reply: Value =
            redis::cmd("FT._LIST").query_async(&mut conn).await.map_err(Self::map_err)?;
        match unwrap_attribute(&reply) {
            Value::Array(items) | Value::Set(items) => {
                Ok(items.iter().filter_map(scalar).collect())
            }
            Value::Nil => Ok(Vec::new()),
            other => Err(RagError::ParseError(format!("unexpected FT._LIST reply: {other:?}"))),
        }
    }

    async fn ensure_index(&self, index_name: &str, key_prefix: &str, dim: usize) -> Result<()> {
        let indexes = self.list_indexes().await?;
        if indexes.iter().any(|name| name == index_name) {
            match self.index_dimension(index_name).await? {
                Some(existing) if existing != dim => {
                    return Err(RagError::SchemaError {
                        index: index_name.to_string(),
                        message: format!(
                            "existing index has dimension {existing}, requested {dim}"
                        ),
                    });
                }
                Some(_) => {}
                None => debug!(index = index_name, "could not read index dimension from FT.INFO"),
            }
            debug!(index = index_name, "redisearch index already exists, skipping creation");
            return Ok(());
        }

        let mut conn = self.conn.clone();
        let created: redis::RedisResult<()> =
            create_index_cmd(index_name, key_prefix, dim).query_async(&mut conn).await;
        match created {
            Ok(()) => {
                debug!(index = index_name, prefix = key_prefix, dim, "created redisearch index");
                Ok(())
            }
            Err(e) if is_already_exists(&e) => {
                debug!(index = index_name, "index created concurrently by another caller");
                Ok(())
            }
            Err(e) => Err(RagError::SchemaError {
                index: index_name.to_string(),
                message: format!("FT.CREATE with dimension {dim} failed: {e}"),
            }),
        }
    }

    async fn store_record(&self, key: &str, record: &VectorRecord) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 =
            store_record_cmd(key, record).query_async(&mut conn).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        index_name: &str,
        top_k: usize,
    ) -> Result<Vec<Chunk>> {
        let mut conn = self.conn.clone();
        let reply: Value = knn_search_cmd(index_name, query_embedding, top_k)
            .query_async(&mut conn)
            .await
            .map_err(|e| RagError::SearchError {
                index: index_name.to_string(),
                message: e.to_string(),
            })?;
        let chunks = parse_search_reply(&reply)?;
        debug!(index = index_name, top_k, returned = chunks.len(), "knn search");
        Ok(chunks)
    }
}

// ── Reply decoding ──

/// One search hit: the record key and its returned fields.
#[derive(Debug, Default, PartialEq)]
struct Hit {
    key: String,
    fields: Vec<(String, String)>,
}

/// The two shapes an `FT.SEARCH` reply comes in.
#[derive(Debug, PartialEq)]
enum SearchReply {
    /// RESP2: `[total, key, [field, value, ...], key, [...], ...]`.
    Flat { total: i64, hits: Vec<Hit> },
    /// RESP3: `{total_results, results: [{id, extra_attributes: {field: value}}]}`.
    Nested { hits: Vec<Hit> },
}

impl SearchReply {
    fn decode(value: &Value) -> Result<Self> {
        match unwrap_attribute(value) {
            Value::Array(items) => Self::decode_flat(items),
            Value::Map(entries) => Self::decode_nested(entries),
            other => Err(RagError::ParseError(format!("unexpected FT.SEARCH reply: {other:?}"))),
        }
    }

    fn decode_flat(items: &[Value]) -> Result<Self> {
        let Some((head, rest)) = items.split_first() else {
            return Ok(SearchReply::Flat { total: 0, hits: Vec::new() });
        };
        let total = match head {
            Value::Int(n) => *n,
            other => {
                return Err(RagError::ParseError(format!(
                    "FT.SEARCH reply must start with a result count, got {other:?}"
                )));
            }
        };
        if rest.len() % 2 != 0 {
            return Err(RagError::ParseError(format!(
                "FT.SEARCH reply has {} trailing elements, expected key/fields pairs",
                rest.len()
            )));
        }
        let hits = rest
            .chunks_exact(2)
            .map(|pair| {
                let key = scalar(&pair[0]).ok_or_else(|| {
                    RagError::ParseError(format!("result key is not a string: {:?}", pair[0]))
                })?;
                Ok(Hit { key, fields: field_pairs(&pair[1])? })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(SearchReply::Flat { total, hits })
    }

    fn decode_nested(entries: &[(Value, Value)]) -> Result<Self> {
        let results = map_get(entries, "results")
            .ok_or_else(|| RagError::ParseError("FT.SEARCH map reply has no 'results'".into()))?;
        let Value::Array(results) = unwrap_attribute(results) else {
            return Err(RagError::ParseError(format!("'results' is not a list: {results:?}")));
        };
        let hits = results
            .iter()
            .map(|result| {
                let Value::Map(result) = unwrap_attribute(result) else {
                    return Err(RagError::ParseError(format!("result is not a map: {result:?}")));
                };
                let key = map_get(result, "id").and_then(scalar).unwrap_or_default();
                let fields = match map_get(result, "extra_attributes") {
                    Some(attrs) => field_pairs(attrs)?,
                    None => Vec::new(),
                };
                Ok(Hit { key, fields })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(SearchReply::Nested { hits })
    }

    fn into_chunks(self) -> Vec<Chunk> {
        let hits = match self {
            SearchReply::Flat { hits, .. } | SearchReply::Nested { hits } => hits,
        };
        hits.into_iter().map(Hit::into_chunk).collect()
    }
}

impl Hit {
    fn into_chunk(self) -> Chunk {
        let mut chunk = Chunk { metadata: HashMap::new(), ..Chunk::default() };
        for (key, value) in self.fields {
            match key.as_str() {
                "text" => chunk.text = value,
                SCORE_FIELD => {
                    chunk.score = value
                        .trim()
                        .parse::<f64>()
                        .ok()
                        .filter(|score| score.is_finite())
                        .unwrap_or(0.0);
                }
                _ => {
                    chunk.metadata.insert(key, value);
                }
            }
        }
        chunk
    }
}

/// Normalize either `FT.SEARCH` reply shape into chunks, in reply order.
pub(crate) fn parse_search_reply(value: &Value) -> Result<Vec<Chunk>> {
    let reply = SearchReply::decode(value)?;
    if let SearchReply::Flat { total, hits } = &reply {
        debug!(total, returned = hits.len(), "decoded flat search reply");
    }
    Ok(reply.into_chunks())
}

fn unwrap_attribute(value: &Value) -> &Value {
    match value {
        Value::Attribute { data, .. } => unwrap_attribute(data),
        other => other,
    }
}

/// Render a scalar reply element as a string. Aggregates yield `None`.
fn scalar(value: &Value) -> Option<String> {
    match unwrap_attribute(value) {
        Value::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::SimpleString(s) => Some(s.clone()),
        Value::VerbatimString { text, .. } => Some(text.clone()),
        Value::Int(n) => Some(n.to_string()),
        Value::Double(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Okay => Some("OK".to_string()),
        Value::Nil => Some(String::new()),
        _ => None,
    }
}

fn map_get<'a>(entries: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    entries.iter().find(|(k, _)| scalar(k).as_deref() == Some(key)).map(|(_, v)| v)
}

/// Decode a field container: a flat `[k, v, k, v]` array or a map.
fn field_pairs(value: &Value) -> Result<Vec<(String, String)>> {
    match unwrap_attribute(value) {
        Value::Array(items) => Ok(items
            .chunks_exact(2)
            .filter_map(|pair| Some((scalar(&pair[0])?, scalar(&pair[1])?)))
            .collect()),
        Value::Map(entries) => {
            Ok(entries.iter().filter_map(|(k, v)| Some((scalar(k)?, scalar(v)?))).collect())
        }
        Value::Nil => Ok(Vec::new()),
        other => Err(RagError::ParseError(format!("result fields are not a list: {other:?}"))),
    }
}

/// Find the `dim` of the `embedding` vector attribute in an `FT.INFO` reply.
fn find_vector_dim(value: &Value) -> Option<usize> {
    let as_pairs: Vec<(String, &Value)> = match unwrap_attribute(value) {
        Value::Array(items) => items
            .chunks_exact(2)
            .filter_map(|pair| scalar(&pair[0]).map(|k| (k, &pair[1])))
            .collect(),
        Value::Map(entries) => {
            entries.iter().filter_map(|(k, v)| scalar(k).map(|k| (k, v))).collect()
        }
        _ => return None,
    };

    let describes_embedding = as_pairs.iter().any(|(k, v)| {
        matches!(k.to_ascii_lowercase().as_str(), "identifier" | "attribute")
            && scalar(v).as_deref() == Some("embedding")
    });
    if describes_embedding {
        if let Some(dim) = as_pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("dim"))
            .and_then(|(_, v)| scalar(v))
            .and_then(|v| v.parse().ok())
        {
            return Some(dim);
        }
    }

    let children: Box<dyn Iterator<Item = &Value>> = match unwrap_attribute(value) {
        Value::Array(items) => Box::new(items.iter()),
        Value::Map(entries) => Box::new(entries.iter().map(|(_, v)| v)),
        _ => return None,
    };
    children.filter_map(find_vector_dim).next()
}

#[cfg(test)]
mod tests {
    use redis::ErrorKind;

    use super::*;

    fn bulk(s: &str) -> Value {
        Value::BulkString(s.as_bytes().to_vec())
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn flat_reply_decodes_to_chunks() {
        let reply = Value::Array(vec![
            Value::Int(2),
            bulk("proj_index:main.go:0"),
            Value::Array(vec![
                bulk("text"),
                bulk("package main"),
                bulk("file"),
                bulk("/src/main.go"),
                bulk(SCORE_FIELD),
                bulk("0.125"),
            ]),
            bulk("proj_index:lib.go:1"),
            Value::Array(vec![bulk(SCORE_FIELD), bulk("0.5"), bulk("text"), bulk("func f()")]),
        ]);

        let chunks = parse_search_reply(&reply).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "package main");
        assert_eq!(chunks[0].file(), Some("/src/main.go"));
        assert_eq!(chunks[0].score, 0.125);
        assert!(!chunks[0].metadata.contains_key(SCORE_FIELD));
        assert_eq!(chunks[1].score, 0.5);
    }

    #[test]
    fn nested_reply_decodes_to_same_chunks_as_flat() {
        let flat = Value::Array(vec![
            Value::Int(1),
            bulk("k:0"),
            Value::Array(vec![
                bulk("text"),
                bulk("hello"),
                bulk("file"),
                bulk("a.md"),
                bulk(SCORE_FIELD),
                bulk("0.25"),
            ]),
        ]);
        let nested = Value::Map(vec![
            (bulk("attributes"), Value::Array(vec![])),
            (bulk("total_results"), Value::Int(1)),
            (
                bulk("results"),
                Value::Array(vec![Value::Map(vec![
                    (bulk("id"), bulk("k:0")),
                    (
                        bulk("extra_attributes"),
                        Value::Map(vec![
                            (bulk("text"), bulk("hello")),
                            (bulk("file"), bulk("a.md")),
                            (bulk(SCORE_FIELD), Value::Double(0.25)),
                        ]),
                    ),
                    (bulk("values"), Value::Array(vec![])),
                ])]),
            ),
        ]);

        assert_eq!(parse_search_reply(&flat).unwrap(), parse_search_reply(&nested).unwrap());
    }

    #[test]
    fn unparsable_score_defaults_to_zero() {
        let reply = Value::Array(vec![
            Value::Int(1),
            bulk("k:0"),
            Value::Array(vec![bulk("text"), bulk("t"), bulk(SCORE_FIELD), bulk("not-a-number")]),
        ]);
        let chunks = parse_search_reply(&reply).unwrap();
        assert_eq!(chunks[0].score, 0.0);
        assert_eq!(chunks[0].text, "t");
    }

    #[test]
    fn non_finite_score_defaults_to_zero() {
        for raw in ["nan", "-nan", "inf", "-inf"] {
            let reply = Value::Array(vec![
                Value::Int(1),
                bulk("k:0"),
                Value::Array(vec![bulk("text"), bulk("t"), bulk(SCORE_FIELD), bulk(raw)]),
            ]);
            let chunks = parse_search_reply(&reply).unwrap();
            assert_eq!(chunks[0].score, 0.0, "score {raw}");
        }
    }

    #[test]
    fn unknown_fields_fold_into_metadata() {
        let reply = Value::Array(vec![
            Value::Int(1),
            bulk("k:0"),
            Value::Array(vec![bulk("chunk"), Value::Int(4), bulk("lang"), bulk("go")]),
        ]);
        let chunk = &parse_search_reply(&reply).unwrap()[0];
        assert_eq!(chunk.metadata.get("chunk").map(String::as_str), Some("4"));
        assert_eq!(chunk.metadata.get("lang").map(String::as_str), Some("go"));
    }

    #[test]
    fn empty_replies_yield_no_chunks() {
        assert!(parse_search_reply(&Value::Array(vec![Value::Int(0)])).unwrap().is_empty());
        assert!(parse_search_reply(&Value::Array(vec![])).unwrap().is_empty());
        let nested = Value::Map(vec![
            (bulk("total_results"), Value::Int(0)),
            (bulk("results"), Value::Array(vec![])),
        ]);
        assert!(parse_search_reply(&nested).unwrap().is_empty());
    }

    #[test]
    fn unexpected_shapes_are_parse_errors() {
        for reply in [
            Value::Int(3),
            Value::Array(vec![bulk("no-count"), bulk("k"), Value::Array(vec![])]),
            Value::Array(vec![Value::Int(1), bulk("dangling-key")]),
            Value::Map(vec![(bulk("total_results"), Value::Int(0))]),
        ] {
            assert!(
                matches!(parse_search_reply(&reply), Err(RagError::ParseError(_))),
                "expected parse error for {reply:?}"
            );
        }
    }

    #[test]
    fn create_index_cmd_declares_schema() {
        let packed = create_index_cmd("proj_index", "proj_index:", 768).get_packed_command();
        for needle in [
            &b"FT.CREATE"[..],
            b"proj_index:",
            b"HASH",
            b"TAG",
            b"NUMERIC",
            b"HNSW",
            b"FLOAT32",
            b"768",
            b"COSINE",
        ] {
            assert!(contains(&packed, needle), "missing {}", String::from_utf8_lossy(needle));
        }
    }

    #[test]
    fn knn_cmd_binds_little_endian_vector() {
        let packed = knn_search_cmd("proj_index", &[1.0, -2.0], 7).get_packed_command();
        assert!(contains(&packed, b"*=>[KNN 7 @embedding $vec AS vector_score]"));
        assert!(contains(&packed, &encode_vector(&[1.0, -2.0])));
        assert!(contains(&packed, b"SORTBY"));
        assert!(contains(&packed, b"ASC"));
        assert!(contains(&packed, b"DIALECT"));
    }

    #[test]
    fn store_cmd_writes_all_fields() {
        let record = VectorRecord {
            text: "fn main() {}".into(),
            file: "src/main.rs".into(),
            chunk_index: 2,
            embedding: vec![0.5, 0.25],
        };
        let packed = store_record_cmd("idx:main.rs:2", &record).get_packed_command();
        assert!(contains(&packed, b"HSET"));
        assert!(contains(&packed, b"idx:main.rs:2"));
        assert!(contains(&packed, b"src/main.rs"));
        assert!(contains(&packed, &encode_vector(&[0.5, 0.25])));
    }

    #[test]
    fn recognises_already_exists_errors() {
        let exists = RedisError::from((
            ErrorKind::ResponseError,
            "An error was signalled by the server",
            "Index already exists".to_string(),
        ));
        assert!(is_already_exists(&exists));

        let other = RedisError::from((
            ErrorKind::ResponseError,
            "An error was signalled by the server",
            "Unknown argument `HNSWX`".to_string(),
        ));
        assert!(!is_already_exists(&other));
    }

    #[test]
    fn finds_dimension_in_ft_info() {
        let info = Value::Array(vec![
            bulk("index_name"),
            bulk("proj_index"),
            bulk("attributes"),
            Value::Array(vec![
                Value::Array(vec![
                    bulk("identifier"),
                    bulk("text"),
                    bulk("attribute"),
                    bulk("text"),
                    bulk("type"),
                    bulk("TEXT"),
                ]),
                Value::Array(vec![
                    bulk("identifier"),
                    bulk("embedding"),
                    bulk("attribute"),
                    bulk("embedding"),
                    bulk("type"),
                    bulk("VECTOR"),
                    bulk("algorithm"),
                    bulk("HNSW"),
                    bulk("dim"),
                    Value::Int(768),
                ]),
            ]),
        ]);
        assert_eq!(find_vector_dim(&info), Some(768));
        assert_eq!(find_vector_dim(&Value::Array(vec![bulk("index_name"), bulk("x")])), None);
    }

    #[test]
    fn url_resolution_order() {
        let env = |pairs: &'static [(&'static str, &'static str)]| {
            move |key: &str| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
        };
        assert_eq!(redis_url_from_lookup(env(&[])), "redis://127.0.0.1:6379");
        assert_eq!(
            redis_url_from_lookup(env(&[
                ("REDIS_URL", "redis://cache:6380"),
                ("REDIS_ADDR", "x:1"),
            ])),
            "redis://cache:6380"
        );
        assert_eq!(
            redis_url_from_lookup(env(&[("REDIS_HOST", "db"), ("REDIS_PORT", "7000")])),
            "redis://db:7000"
        );
        assert_eq!(
            redis_url_from_lookup(env(&[("REDIS_ADDR", "db:1"), ("REDIS_PASSWORD", "pw")])),
            "redis://:pw@db:1"
        );
    }
}
