//! In-process vector store for uploaded documents
//!
//! Each indexed document becomes a collection of text chunks with their
//! embeddings, addressed by a [`StoreHandle`]. Collections are kept in memory
//! and written to `<dir>/<handle>.bin` so a handle stays answerable after a
//! restart.

use super::StoreHandle;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub chunks: Vec<Chunk>,
}

/// Split text into chunks of at most `size` characters, each starting
/// `size - overlap` characters after the previous one. Cuts are moved back to
/// the nearest whitespace when there is one in the second half of the window.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || size == 0 {
        return Vec::new();
    }
    let overlap = overlap.min(size.saturating_sub(1));

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let mut end = (start + size).min(chars.len());
        if end < chars.len() {
            let floor = start + size / 2;
            if let Some(ws) = (floor..end).rev().find(|&i| chars[i].is_whitespace()) {
                end = ws;
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if end >= chars.len() {
            break;
        }
        // Always make progress, even when the overlap swallows the whole window
        start = (end.saturating_sub(overlap)).max(start + 1);
    }
    chunks
}

/// Cosine similarity between two embedding vectors
/// Returns a value between -1.0 and 1.0 (1.0 = identical, 0.0 = orthogonal)
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Find the top N chunks most similar to a query embedding
/// Returns (chunk_index, similarity_score) pairs, sorted by similarity descending
pub fn find_similar(query: &[f32], chunks: &[Chunk], top_n: usize) -> Vec<(usize, f32)> {
    let mut similarities: Vec<(usize, f32)> = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| (i, cosine_similarity(query, &chunk.embedding)))
        .collect();

    similarities.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    similarities.truncate(top_n);
    similarities
}

pub struct VectorStore {
    dir: PathBuf,
    collections: RwLock<HashMap<StoreHandle, Arc<Collection>>>,
}

impl VectorStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            collections: RwLock::new(HashMap::new()),
        }
    }

    fn collection_path(&self, handle: StoreHandle) -> PathBuf {
        self.dir.join(format!("{}.bin", handle))
    }

    /// Save a collection under a fresh handle
    pub fn insert(&self, collection: Collection) -> Result<StoreHandle, String> {
        let handle = StoreHandle::new();
        write_collection(&self.collection_path(handle), &collection)?;

        let chunk_count = collection.chunks.len();
        self.collections
            .write()
            .map_err(|_| "Failed to acquire vector store lock")?
            .insert(handle, Arc::new(collection));

        info!("Indexed {} chunks under {}", chunk_count, handle);
        Ok(handle)
    }

    /// Collection for a handle, loading it from disk if it is not resident
    pub fn get(&self, handle: StoreHandle) -> Result<Arc<Collection>, String> {
        if let Some(collection) = self.collections
            .read()
            .map_err(|_| "Failed to acquire vector store lock")?
            .get(&handle)
        {
            return Ok(collection.clone());
        }

        let path = self.collection_path(handle);
        if !path.exists() {
            return Err(format!("Unknown document handle {}", handle));
        }
        let collection = Arc::new(read_collection(&path)?);
        debug!("Loaded collection {} from disk", handle);

        self.collections
            .write()
            .map_err(|_| "Failed to acquire vector store lock")?
            .insert(handle, collection.clone());
        Ok(collection)
    }

    /// Texts of the `top_n` chunks closest to the query, best first
    pub fn search(&self, handle: StoreHandle, query: &[f32], top_n: usize) -> Result<Vec<String>, String> {
        let collection = self.get(handle)?;
        Ok(find_similar(query, &collection.chunks, top_n)
            .into_iter()
            .map(|(i, _)| collection.chunks[i].text.clone())
            .collect())
    }
}

fn write_collection(path: &Path, collection: &Collection) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create vector store directory: {}", e))?;
    }
    let bytes = bincode::serialize(collection)
        .map_err(|e| format!("Failed to serialize collection: {}", e))?;
    fs::write(path, bytes).map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}

fn read_collection(path: &Path) -> Result<Collection, String> {
    let bytes = fs::read(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    bincode::deserialize(&bytes).map_err(|e| format!("Corrupted collection {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, embedding: Vec<f32>) -> Chunk {
        Chunk { text: text.to_string(), embedding }
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_mismatched_dims() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_find_similar() {
        let chunks = vec![
            chunk("orthogonal", vec![0.0, 1.0, 0.0]),
            chunk("close", vec![0.9, 0.1, 0.0]),
            chunk("opposite", vec![-1.0, 0.0, 0.0]),
            chunk("identical", vec![1.0, 0.0, 0.0]),
        ];

        let similar = find_similar(&[1.0, 0.0, 0.0], &chunks, 2);
        assert_eq!(similar.len(), 2);
        assert_eq!(similar[0].0, 3);
        assert_eq!(similar[1].0, 1);
    }

    #[test]
    fn test_chunk_short_text_is_one_chunk() {
        assert_eq!(chunk_text("Climate change is real.", 100, 10), vec!["Climate change is real."]);
        assert!(chunk_text("", 100, 10).is_empty());
        assert!(chunk_text("   ", 100, 10).is_empty());
    }

    #[test]
    fn test_chunk_respects_size_and_overlap() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let chunks = chunk_text(text, 20, 6);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
        // Cuts land on word boundaries
        assert_eq!(chunks[0], "alpha beta gamma");
        // Consecutive chunks share text
        assert!(chunks[1].starts_with("gamma") || chunks[1].starts_with("amma"));
        assert!(chunks.last().unwrap().ends_with("kappa"));
    }

    #[test]
    fn test_chunk_without_whitespace_terminates() {
        let text = "x".repeat(55);
        let chunks = chunk_text(&text, 10, 50);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.len() <= 10));
    }

    #[test]
    fn test_search_and_reload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::new(dir.path());
        let handle = store.insert(Collection {
            chunks: vec![
                chunk("greenhouse gases trap heat", vec![1.0, 0.0]),
                chunk("ice sheets are melting", vec![0.0, 1.0]),
            ],
        }).unwrap();

        let hits = store.search(handle, &[0.9, 0.1], 1).unwrap();
        assert_eq!(hits, vec!["greenhouse gases trap heat"]);

        // A fresh store over the same directory finds the collection on disk
        let reopened = VectorStore::new(dir.path());
        let hits = reopened.search(handle, &[0.0, 1.0], 1).unwrap();
        assert_eq!(hits, vec!["ice sheets are melting"]);
    }

    #[test]
    fn test_unknown_handle() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::new(dir.path());
        assert!(store.get(StoreHandle::new()).is_err());
    }
}
