//! Exact nearest-neighbour store over fixed-width embeddings.
//!
//! Embeddings live in one flat row-major buffer next to the parallel list of
//! documents. Row `i` of the buffer always belongs to `documents[i]`, and rows
//! are only ever appended.
//!
//! On disk a store is a directory holding two artifacts:
//! - `vectors.index`: `b"VCIX"`, `u32` version, `u32` dimension, `u64` row
//!   count, then the rows as little-endian `f32`
//! - `documents.json`: a JSON array of the document texts

use std::cmp::Ordering;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use vcraft_core::{AppError, AppResult};

/// File holding the raw vectors.
pub const INDEX_FILE: &str = "vectors.index";

/// File holding the document texts.
pub const DOCUMENTS_FILE: &str = "documents.json";

const MAGIC: &[u8; 4] = b"VCIX";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Flat L2 vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorStore {
    dimension: usize,
    embeddings: Vec<f32>,
    documents: Vec<String>,
}

impl VectorStore {
    /// Create an empty store for vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            embeddings: Vec::new(),
            documents: Vec::new(),
        }
    }

    /// Vector width accepted by this store.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored documents.
    pub fn size(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Document text at `index`, if any.
    pub fn document(&self, index: usize) -> Option<&str> {
        self.documents.get(index).map(String::as_str)
    }

    fn row(&self, index: usize) -> &[f32] {
        let start = index * self.dimension;
        &self.embeddings[start..start + self.dimension]
    }

    /// Append documents with their embeddings.
    ///
    /// Everything is validated before anything is appended, so a failed call
    /// leaves the store as it was.
    pub fn add_documents(&mut self, embeddings: &[Vec<f32>], documents: &[String]) -> AppResult<()> {
        if embeddings.len() != documents.len() {
            return Err(AppError::LengthMismatch {
                embeddings: embeddings.len(),
                documents: documents.len(),
            });
        }

        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimension) {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        self.embeddings.reserve(embeddings.len() * self.dimension);
        for embedding in embeddings {
            self.embeddings.extend_from_slice(embedding);
        }
        self.documents.extend_from_slice(documents);

        tracing::debug!(
            "Added {} documents to vector store (size now {})",
            documents.len(),
            self.documents.len()
        );

        Ok(())
    }

    /// Return up to `k` documents nearest to `query` with their squared L2 distances.
    ///
    /// Results are ordered by ascending distance; equal distances keep
    /// insertion order. An empty store yields no results whatever the query.
    pub fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<(String, f32)>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        if query.len() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = (0..self.size())
            .map(|i| (i, squared_l2(query, self.row(i))))
            .collect();

        scored.sort_by(|a, b| match a.1.total_cmp(&b.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, distance)| (self.documents[i].clone(), distance))
            .collect())
    }

    /// Persist the store into `dir`, creating it if needed.
    ///
    /// The vector file is written first and the documents file last; each goes
    /// through a temporary file and a rename.
    pub fn save(&self, dir: &Path) -> AppResult<()> {
        fs::create_dir_all(dir)?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + self.embeddings.len() * 4);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.size() as u64).to_le_bytes());
        for value in &self.embeddings {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        write_atomic(&dir.join(INDEX_FILE), &bytes)?;

        let documents = serde_json::to_vec(&self.documents)?;
        write_atomic(&dir.join(DOCUMENTS_FILE), &documents)?;

        tracing::info!(
            "Saved vector store ({} documents, dimension {}) to {:?}",
            self.size(),
            self.dimension,
            dir
        );
        Ok(())
    }

    /// Replace the contents of this store with the one persisted in `dir`.
    ///
    /// The dimension is taken from the file. Nothing changes unless both
    /// artifacts are present and consistent.
    pub fn load(&mut self, dir: &Path) -> AppResult<()> {
        *self = Self::read_from(dir)?;
        tracing::info!(
            "Loaded vector store ({} documents, dimension {}) from {:?}",
            self.size(),
            self.dimension,
            dir
        );
        Ok(())
    }

    /// Read a persisted store from `dir`.
    pub fn read_from(dir: &Path) -> AppResult<Self> {
        let index_path = dir.join(INDEX_FILE);
        let documents_path = dir.join(DOCUMENTS_FILE);

        for path in [&index_path, &documents_path] {
            if !path.is_file() {
                return Err(AppError::NotFound(path.clone()));
            }
        }

        let bytes = fs::read(&index_path)?;
        let (dimension, embeddings) = decode_index(&bytes)?;

        let documents: Vec<String> = serde_json::from_slice(&fs::read(&documents_path)?)
            .map_err(|e| AppError::Knowledge(format!("Corrupt documents file: {}", e)))?;

        let rows = if dimension == 0 { 0 } else { embeddings.len() / dimension };
        if rows != documents.len() {
            return Err(AppError::Knowledge(format!(
                "Index holds {} vectors but {} documents",
                rows,
                documents.len()
            )));
        }

        Ok(Self {
            dimension,
            embeddings,
            documents,
        })
    }
}

/// Whether both artifacts of a persisted store exist in `dir`.
pub fn index_exists(dir: &Path) -> bool {
    dir.join(INDEX_FILE).is_file() && dir.join(DOCUMENTS_FILE).is_file()
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

fn decode_index(bytes: &[u8]) -> AppResult<(usize, Vec<f32>)> {
    let corrupt = |reason: &str| AppError::Knowledge(format!("Corrupt vector index: {}", reason));

    if bytes.len() < HEADER_LEN {
        return Err(corrupt("truncated header"));
    }
    if &bytes[0..4] != MAGIC {
        return Err(corrupt("bad magic"));
    }

    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != FORMAT_VERSION {
        return Err(corrupt(&format!("unsupported version {}", version)));
    }

    let dimension = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&bytes[12..20]);
    let count = u64::from_le_bytes(count_bytes) as usize;

    let expected = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| corrupt("row count overflow"))?;
    let payload = &bytes[HEADER_LEN..];
    if payload.len() != expected {
        return Err(corrupt(&format!(
            "expected {} payload bytes, found {}",
            expected,
            payload.len()
        )));
    }

    let embeddings = payload
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok((dimension, embeddings))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> AppResult<()> {
    let mut tmp = PathBuf::from(path);
    tmp.set_extension("tmp");

    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn docs(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn alpha_beta() -> VectorStore {
        let mut store = VectorStore::new(3);
        store
            .add_documents(
                &[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
                &docs(&["alpha", "beta"]),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_search_orders_by_squared_distance() {
        let store = alpha_beta();

        let results = store.search(&[0.9, 0.1, 0.0], 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "alpha");

        let results = store.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results, vec![("alpha".to_string(), 0.0), ("beta".to_string(), 2.0)]);
    }

    #[test]
    fn test_search_squared_l2_convention() {
        let mut store = VectorStore::new(3);
        store
            .add_documents(&[vec![1.0, 1.0, 1.0]], &docs(&["ones"]))
            .unwrap();

        let results = store.search(&[0.0, 0.0, 0.0], 5).unwrap();
        assert_eq!(results, vec![("ones".to_string(), 3.0)]);
    }

    #[test]
    fn test_origin_and_far_point() {
        let mut store = VectorStore::new(3);
        store
            .add_documents(
                &[vec![0.0, 0.0, 0.0], vec![10.0, 10.0, 10.0]],
                &docs(&["alpha", "beta"]),
            )
            .unwrap();

        assert_eq!(
            store.search(&[1.0, 1.0, 1.0], 1).unwrap(),
            vec![("alpha".to_string(), 3.0)]
        );
    }

    #[test]
    fn test_append_preserves_order() {
        let mut store = alpha_beta();
        store
            .add_documents(
                &[vec![0.0, 0.0, 1.0], vec![0.5, 0.5, 0.0]],
                &docs(&["gamma", "delta"]),
            )
            .unwrap();

        assert_eq!(store.size(), 4);
        assert_eq!(store.document(0), Some("alpha"));
        assert_eq!(store.document(2), Some("gamma"));
        assert_eq!(store.document(3), Some("delta"));
    }

    #[test]
    fn test_search_ties_keep_insertion_order() {
        let mut store = VectorStore::new(2);
        store
            .add_documents(
                &[vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0]],
                &docs(&["first", "second", "third"]),
            )
            .unwrap();

        let results = store.search(&[0.0, 0.0], 3).unwrap();
        let order: Vec<&str> = results.iter().map(|(d, _)| d.as_str()).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_repeated_search_is_stable() {
        let mut store = alpha_beta();
        store
            .add_documents(
                &[vec![0.0, 0.0, 1.0], vec![1.0, 0.0, 0.0]],
                &docs(&["gamma", "alpha-copy"]),
            )
            .unwrap();

        let query = [0.6, 0.3, 0.2];
        let first = store.search(&query, 4).unwrap();
        for _ in 0..10 {
            assert_eq!(store.search(&query, 4).unwrap(), first);
        }
        assert_eq!(first[0].0, "alpha");
        assert_eq!(first[1].0, "alpha-copy");
    }

    #[test]
    fn test_search_caps_at_size_and_zero_k() {
        let store = alpha_beta();
        assert_eq!(store.search(&[0.0, 0.0, 1.0], 10).unwrap().len(), 2);
        assert!(store.search(&[0.0, 0.0, 1.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_empty_store_search() {
        let store = VectorStore::new(384);
        assert!(store.search(&[0.5; 3], 5).unwrap().is_empty());
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let store = alpha_beta();
        assert!(matches!(
            store.search(&[1.0, 0.0], 1),
            Err(AppError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_add_documents_validates_before_mutation() {
        let mut store = alpha_beta();
        let before = store.clone();

        let err = store
            .add_documents(&[vec![0.0, 0.0, 1.0]], &docs(&["gamma", "delta"]))
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::LengthMismatch {
                embeddings: 1,
                documents: 2
            }
        ));

        let err = store
            .add_documents(
                &[vec![0.0, 0.0, 1.0], vec![0.0, 1.0]],
                &docs(&["gamma", "delta"]),
            )
            .unwrap_err();
        assert!(matches!(err, AppError::DimensionMismatch { .. }));

        assert_eq!(store, before);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("vector_index");
        let store = alpha_beta();
        store.save(&dir).unwrap();

        assert!(index_exists(&dir));

        let mut loaded = VectorStore::new(384);
        loaded.load(&dir).unwrap();
        assert_eq!(loaded.dimension(), 3);
        assert_eq!(loaded.size(), 2);
        assert_eq!(loaded.document(1), Some("beta"));
        assert_eq!(
            loaded.search(&[0.9, 0.1, 0.0], 2).unwrap(),
            store.search(&[0.9, 0.1, 0.0], 2).unwrap()
        );
    }

    #[test]
    fn test_load_missing_artifact() {
        let temp = TempDir::new().unwrap();
        alpha_beta().save(temp.path()).unwrap();
        fs::remove_file(temp.path().join(DOCUMENTS_FILE)).unwrap();

        let mut store = VectorStore::new(3);
        match store.load(temp.path()) {
            Err(AppError::NotFound(path)) => assert!(path.ends_with(DOCUMENTS_FILE)),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_corrupt_index_leaves_store_unchanged() {
        let temp = TempDir::new().unwrap();
        alpha_beta().save(temp.path()).unwrap();

        let index_path = temp.path().join(INDEX_FILE);
        let mut bytes = fs::read(&index_path).unwrap();
        bytes.truncate(bytes.len() - 2);
        fs::write(&index_path, &bytes).unwrap();

        let mut store = VectorStore::new(3);
        store
            .add_documents(&[vec![0.0, 0.0, 1.0]], &docs(&["gamma"]))
            .unwrap();
        let before = store.clone();

        assert!(matches!(store.load(temp.path()), Err(AppError::Knowledge(_))));
        assert_eq!(store, before);
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let temp = TempDir::new().unwrap();
        alpha_beta().save(temp.path()).unwrap();
        fs::write(temp.path().join(DOCUMENTS_FILE), r#"["alpha"]"#).unwrap();

        match VectorStore::read_from(temp.path()) {
            Err(AppError::Knowledge(msg)) => assert!(msg.contains("2 vectors but 1 documents")),
            other => panic!("expected count mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_magic_rejected() {
        let temp = TempDir::new().unwrap();
        alpha_beta().save(temp.path()).unwrap();

        let index_path = temp.path().join(INDEX_FILE);
        let mut bytes = fs::read(&index_path).unwrap();
        bytes[0] = b'X';
        fs::write(&index_path, &bytes).unwrap();

        assert!(VectorStore::read_from(temp.path()).is_err());
    }

    #[test]
    fn test_save_empty_store() {
        let temp = TempDir::new().unwrap();
        VectorStore::new(8).save(temp.path()).unwrap();

        let loaded = VectorStore::read_from(temp.path()).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.dimension(), 8);
        assert!(!temp.path().join("vectors.tmp").exists());
    }
}
