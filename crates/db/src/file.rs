use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::model::{Book, BookFields, BookId};
use crate::state::Catalog;
use crate::BookStore;

/// [`BookStore`] persisted as a single JSON snapshot.
///
/// Each mutation is applied to a copy of the catalog, written to a sibling
/// temp file, synced, and renamed over the snapshot. The in-memory catalog is
/// only swapped once the rename succeeded, so a failed write is never visible.
#[derive(Debug)]
pub struct FileBookStore {
    path: PathBuf,
    catalog: RwLock<Catalog>,
}

impl FileBookStore {
    /// Opens (or starts) the catalog at `path`. A missing file is an empty catalog.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let catalog = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Catalog>(&bytes)?.checked()?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Catalog::default(),
            Err(err) => return Err(err.into()),
        };

        tracing::info!(path = %path.display(), "book catalog opened");

        Ok(Self {
            path,
            catalog: RwLock::new(catalog),
        })
    }

    async fn commit(&self, catalog: &Catalog) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(catalog)?;
        let tmp = self.path.with_extension("json.tmp");

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        self.sync_parent().await
    }

    /// Makes the rename itself durable.
    #[cfg(unix)]
    async fn sync_parent(&self) -> Result<(), StoreError> {
        let parent = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => std::path::Path::new("."),
        };
        tokio::fs::File::open(parent).await?.sync_all().await?;
        Ok(())
    }

    #[cfg(not(unix))]
    async fn sync_parent(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Runs `op` against a copy of the catalog and commits the copy on success.
    async fn mutate<T>(
        &self,
        op: impl FnOnce(&mut Catalog) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.catalog.write().await;
        let mut next = guard.clone();
        let out = op(&mut next)?;
        self.commit(&next).await?;
        *guard = next;
        Ok(out)
    }
}

#[async_trait]
impl BookStore for FileBookStore {
    async fn list(&self) -> Result<Vec<Book>, StoreError> {
        Ok(self.catalog.read().await.list())
    }

    async fn get(&self, id: BookId) -> Result<Book, StoreError> {
        self.catalog.read().await.get(id)
    }

    async fn create(&self, fields: BookFields) -> Result<Book, StoreError> {
        let book = self.mutate(|catalog| catalog.create(fields)).await?;
        tracing::debug!(book_id = book.id, title = %book.title, "book created");
        Ok(book)
    }

    async fn update(&self, id: BookId, fields: BookFields) -> Result<Book, StoreError> {
        let book = self.mutate(|catalog| catalog.update(id, fields)).await?;
        tracing::debug!(book_id = id, "book updated");
        Ok(book)
    }

    async fn delete(&self, id: BookId) -> Result<(), StoreError> {
        self.mutate(|catalog| catalog.delete(id)).await?;
        tracing::debug!(book_id = id, "book deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn catalog_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.json");

        let store = FileBookStore::open(&path).await.unwrap();
        let dune = store
            .create(BookFields::new("Dune", "Herbert", "Sci-fi"))
            .await
            .unwrap();
        let emma = store
            .create(BookFields::new("Emma", "Austen", "Novel"))
            .await
            .unwrap();
        store.delete(emma.id).await.unwrap();
        drop(store);

        let reopened = FileBookStore::open(&path).await.unwrap();
        assert_eq!(reopened.list().await.unwrap(), vec![dune]);

        // The counter is persisted, so the deleted id stays retired.
        let next = reopened
            .create(BookFields::new("Ulysses", "Joyce", ""))
            .await
            .unwrap();
        assert_eq!(next.id, emma.id + 1);
    }

    #[tokio::test]
    async fn missing_parent_directories_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/data/books.json");

        let store = FileBookStore::open(&path).await.unwrap();
        store
            .create(BookFields::new("Dune", "Herbert", ""))
            .await
            .unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn rejected_create_does_not_touch_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.json");

        let store = FileBookStore::open(&path).await.unwrap();
        store
            .create(BookFields::new("Dune", "Herbert", ""))
            .await
            .unwrap();
        let before = std::fs::read(&path).unwrap();

        let err = store
            .create(BookFields::new("Dune", "Other", ""))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn lagging_counter_does_not_clobber_stored_books() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.json");
        std::fs::write(
            &path,
            r#"{"next_id":1,"books":{"1":{"id":1,"title":"Dune","author":"Herbert","description":"Sci-fi"}}}"#,
        )
        .unwrap();

        let store = FileBookStore::open(&path).await.unwrap();
        let emma = store
            .create(BookFields::new("Emma", "Austen", "Novel"))
            .await
            .unwrap();

        assert_eq!(emma.id, 2);
        let titles: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|book| book.title)
            .collect();
        assert_eq!(titles, vec!["Dune", "Emma"]);
    }

    #[tokio::test]
    async fn misfiled_book_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.json");
        std::fs::write(
            &path,
            r#"{"next_id":9,"books":{"1":{"id":4,"title":"Dune","author":"Herbert","description":""}}}"#,
        )
        .unwrap();

        let err = FileBookStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn duplicate_titles_from_updates_still_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.json");

        let store = FileBookStore::open(&path).await.unwrap();
        store
            .create(BookFields::new("Dune", "Herbert", ""))
            .await
            .unwrap();
        let emma = store
            .create(BookFields::new("Emma", "Austen", ""))
            .await
            .unwrap();
        store
            .update(emma.id, BookFields::new("Dune", "Austen", ""))
            .await
            .unwrap();
        drop(store);

        let reopened = FileBookStore::open(&path).await.unwrap();
        assert_eq!(reopened.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn corrupt_snapshot_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.json");
        std::fs::write(&path, b"not json").unwrap();

        let err = FileBookStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
