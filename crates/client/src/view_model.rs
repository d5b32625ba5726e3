//! Local projection of the catalog and the create/edit form.

use std::time::Duration;

use bookshelf_db::{Book, BookFields, BookId};

use crate::api::BooksApi;
use crate::error::ClientError;
use crate::notice::{Notice, NoticeSlot};

pub const REQUIRED_FIELDS: &str = "All fields are required.";

/// Client-side copy of the server's book list.
///
/// Every merge bumps `version`, so callers can tell whether the projection
/// changed without comparing contents.
#[derive(Debug, Clone, Default)]
pub struct LocalBooks {
    books: Vec<Book>,
    version: u64,
}

impl LocalBooks {
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, id: BookId) -> Option<&Book> {
        self.books.iter().find(|book| book.id == id)
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Replaces the whole projection with a fresh server snapshot.
    pub fn replace_all(&mut self, books: Vec<Book>) {
        self.books = books;
        self.version += 1;
    }

    /// Adds a newly created book. An entry with the same id is replaced.
    pub fn append(&mut self, book: Book) {
        if !self.replace_by_id(book.clone()) {
            self.books.push(book);
            self.version += 1;
        }
    }

    /// Replaces the entry with the same id. Returns false if there is none.
    pub fn replace_by_id(&mut self, book: Book) -> bool {
        match self.books.iter_mut().find(|existing| existing.id == book.id) {
            Some(existing) => {
                *existing = book;
                self.version += 1;
                true
            }
            None => false,
        }
    }

    /// Removes the entry with `id`. Returns false if there is none.
    pub fn remove_by_id(&mut self, id: BookId) -> bool {
        let before = self.books.len();
        self.books.retain(|book| book.id != id);
        let removed = self.books.len() != before;
        if removed {
            self.version += 1;
        }
        removed
    }
}

/// The single editable form. `editing_id` selects update over create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub description: String,
    editing_id: Option<BookId>,
}

impl BookForm {
    pub fn editing_id(&self) -> Option<BookId> {
        self.editing_id
    }

    pub fn is_editing(&self) -> bool {
        self.editing_id.is_some()
    }

    pub fn set_fields(&mut self, fields: BookFields) {
        self.title = fields.title;
        self.author = fields.author;
        self.description = fields.description;
    }

    fn fields(&self) -> BookFields {
        BookFields {
            title: self.title.clone(),
            author: self.author.clone(),
            description: self.description.clone(),
        }
    }

    fn is_complete(&self) -> bool {
        [&self.title, &self.author, &self.description]
            .iter()
            .all(|value| !value.trim().is_empty())
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Holds `loading` up while a fetch is in flight and lowers it when dropped,
/// including when the fetch future itself is dropped.
struct LoadingFlag<'a>(&'a mut bool);

impl<'a> LoadingFlag<'a> {
    fn raise(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

/// Book list screen state: the local projection, the form and a notice slot.
///
/// Every operation takes `&mut self`, so a submit can never interleave with
/// an in-flight load on the same view-model.
pub struct BookListViewModel<A> {
    api: A,
    books: LocalBooks,
    form: BookForm,
    loading: bool,
    notices: NoticeSlot,
}

impl<A: BooksApi> BookListViewModel<A> {
    pub fn new(api: A, notice_ttl: Duration) -> Self {
        Self {
            api,
            books: LocalBooks::default(),
            form: BookForm::default(),
            loading: false,
            notices: NoticeSlot::new(notice_ttl),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn books(&self) -> &LocalBooks {
        &self.books
    }

    pub fn form(&self) -> &BookForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut BookForm {
        &mut self.form
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn notice(&self) -> Option<Notice> {
        self.notices.current()
    }

    /// Fetches the full list. On failure the previous projection is kept.
    pub async fn load(&mut self) -> Result<(), ClientError> {
        let flag = LoadingFlag::raise(&mut self.loading);
        let result = self.api.list().await;
        drop(flag);

        match result {
            Ok(books) => {
                tracing::debug!(count = books.len(), "book list loaded");
                self.books.replace_all(books);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load books");
                self.notices.error("Failed to load books.");
                Err(err)
            }
        }
    }

    /// Copies a listed book into the form and switches to edit mode.
    /// Returns false if the book is not in the local list.
    pub fn begin_edit(&mut self, id: BookId) -> bool {
        let Some(book) = self.books.get(id) else {
            return false;
        };
        let fields = book.fields();
        self.form.set_fields(fields);
        self.form.editing_id = Some(id);
        true
    }

    /// Clears the form back to create mode.
    pub fn cancel_edit(&mut self) {
        self.form.reset();
    }

    /// Creates or updates depending on the form mode.
    ///
    /// On success the server's book is merged into the list and the form is
    /// reset. On failure the list and the form are left as they were.
    pub async fn submit(&mut self) -> Result<Book, ClientError> {
        if !self.form.is_complete() {
            self.notices.error(REQUIRED_FIELDS);
            return Err(ClientError::InvalidInput(REQUIRED_FIELDS.to_string()));
        }

        let fields = self.form.fields();
        match self.form.editing_id {
            None => match self.api.create(&fields).await {
                Ok(book) => {
                    self.books.append(book.clone());
                    self.form.reset();
                    self.notices.success("Book added successfully.");
                    Ok(book)
                }
                Err(err) => Err(self.fail(err, "Failed to add the book.")),
            },
            Some(id) => match self.api.update(&Book::new(id, fields)).await {
                Ok(book) => {
                    if !self.books.replace_by_id(book.clone()) {
                        self.books.append(book.clone());
                    }
                    self.form.reset();
                    self.notices.success("Book updated successfully.");
                    Ok(book)
                }
                Err(err) => Err(self.fail(err, "Failed to update the book.")),
            },
        }
    }

    /// Deletes remotely, then drops the local entry.
    pub async fn delete(&mut self, id: BookId) -> Result<(), ClientError> {
        match self.api.delete(id).await {
            Ok(()) => {
                self.books.remove_by_id(id);
                if self.form.editing_id == Some(id) {
                    self.form.reset();
                }
                self.notices.success("Book deleted successfully.");
                Ok(())
            }
            Err(err) => Err(self.fail(err, "Failed to delete the book.")),
        }
    }

    /// Shows the server's message for rejections, `fallback` otherwise.
    fn fail(&mut self, err: ClientError, fallback: &str) -> ClientError {
        tracing::warn!(error = %err, "books api call failed");
        let text = match &err {
            ClientError::InvalidInput(message)
            | ClientError::Conflict(message)
            | ClientError::NotFound(message) => message.clone(),
            ClientError::Server { .. } | ClientError::Transport(_) => fallback.to_string(),
        };
        self.notices.error(text);
        err
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bookshelf_db::{BookStore, MemoryBookStore, StoreError};

    use super::*;
    use crate::notice::NoticeKind;

    /// In-process server stand-in. `normalize` makes updates store trimmed
    /// titles, like a server that rewrites what it was sent.
    #[derive(Default)]
    struct FakeApi {
        store: MemoryBookStore,
        offline: AtomicBool,
        /// `list` never answers
        stalled: AtomicBool,
        normalize: bool,
        calls: AtomicUsize,
    }

    impl FakeApi {
        fn check(&self) -> Result<(), ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(ClientError::Server {
                    status: 503,
                    message: "unavailable".into(),
                });
            }
            Ok(())
        }
    }

    fn map(err: StoreError) -> ClientError {
        let message = err.to_string();
        match err {
            StoreError::NotFound(_) => ClientError::NotFound(message),
            StoreError::Conflict { .. } => {
                ClientError::Conflict("A book with the same title already exists.".into())
            }
            StoreError::InvalidInput { .. } => ClientError::InvalidInput(message),
            _ => ClientError::Server {
                status: 500,
                message,
            },
        }
    }

    #[async_trait]
    impl BooksApi for FakeApi {
        async fn list(&self) -> Result<Vec<Book>, ClientError> {
            self.check()?;
            if self.stalled.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            self.store.list().await.map_err(map)
        }

        async fn get(&self, id: BookId) -> Result<Book, ClientError> {
            self.check()?;
            self.store.get(id).await.map_err(map)
        }

        async fn create(&self, fields: &BookFields) -> Result<Book, ClientError> {
            self.check()?;
            self.store.create(fields.clone()).await.map_err(map)
        }

        async fn update(&self, book: &Book) -> Result<Book, ClientError> {
            self.check()?;
            let mut fields = book.fields();
            if self.normalize {
                fields.title = fields.title.trim().to_string();
            }
            self.store.update(book.id, fields).await.map_err(map)
        }

        async fn delete(&self, id: BookId) -> Result<(), ClientError> {
            self.check()?;
            self.store.delete(id).await.map_err(map)
        }
    }

    fn view_model(api: FakeApi) -> BookListViewModel<FakeApi> {
        BookListViewModel::new(api, Duration::from_secs(3))
    }

    fn fill(vm: &mut BookListViewModel<FakeApi>, title: &str, author: &str, description: &str) {
        vm.form_mut()
            .set_fields(BookFields::new(title, author, description));
    }

    async fn seeded() -> BookListViewModel<FakeApi> {
        let api = FakeApi::default();
        api.store
            .create(BookFields::new("Dune", "Herbert", "Sci-fi"))
            .await
            .unwrap();
        api.store
            .create(BookFields::new("Emma", "Austen", "Novel"))
            .await
            .unwrap();
        let mut vm = view_model(api);
        vm.load().await.unwrap();
        vm
    }

    #[test]
    fn local_books_merge_rules() {
        let mut local = LocalBooks::default();
        local.replace_all(vec![Book::new(1, BookFields::new("Dune", "Herbert", ""))]);
        assert_eq!(local.version(), 1);

        local.append(Book::new(2, BookFields::new("Emma", "Austen", "")));
        assert_eq!(local.len(), 2);

        assert!(local.replace_by_id(Book::new(1, BookFields::new("Dune", "F. Herbert", ""))));
        assert_eq!(local.get(1).unwrap().author, "F. Herbert");
        assert!(!local.replace_by_id(Book::new(9, BookFields::default())));

        assert!(local.remove_by_id(2));
        assert!(!local.remove_by_id(2));
        assert_eq!(local.len(), 1);
        assert_eq!(local.version(), 4);
    }

    #[tokio::test]
    async fn load_replaces_projection() {
        let vm = seeded().await;
        assert!(!vm.is_loading());
        let titles: Vec<_> = vm.books().books().iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Dune", "Emma"]);
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_list() {
        let mut vm = seeded().await;
        vm.api().offline.store(true, Ordering::SeqCst);

        assert!(vm.load().await.is_err());
        assert_eq!(vm.books().len(), 2);
        assert!(!vm.is_loading());
        assert_eq!(vm.notice().unwrap().text, "Failed to load books.");
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_load_clears_loading_flag() {
        let mut vm = seeded().await;
        vm.api().stalled.store(true, Ordering::SeqCst);

        let outcome = tokio::time::timeout(Duration::from_millis(10), vm.load()).await;

        assert!(outcome.is_err());
        assert!(!vm.is_loading());
        assert_eq!(vm.books().len(), 2);
    }

    #[tokio::test]
    async fn create_appends_server_book_and_resets_form() {
        let mut vm = seeded().await;
        fill(&mut vm, "Ulysses", "Joyce", "Modernist");

        let book = vm.submit().await.unwrap();

        assert_eq!(book.id, 3);
        assert_eq!(vm.books().get(3), Some(&book));
        assert_eq!(vm.form(), &BookForm::default());
        let notice = vm.notice().unwrap();
        assert_eq!(notice.kind, NoticeKind::Success);
        assert_eq!(notice.text, "Book added successfully.");
    }

    #[tokio::test]
    async fn duplicate_create_adds_no_phantom_entry() {
        let mut vm = seeded().await;
        let version = vm.books().version();
        fill(&mut vm, "Dune", "Someone", "Again");

        let err = vm.submit().await.unwrap_err();

        assert!(matches!(err, ClientError::Conflict(_)));
        assert_eq!(vm.books().len(), 2);
        assert_eq!(vm.books().version(), version);
        assert_eq!(vm.form().title, "Dune");
        let notice = vm.notice().unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.text, "A book with the same title already exists.");
    }

    #[tokio::test]
    async fn incomplete_form_is_rejected_locally() {
        let mut vm = seeded().await;
        let calls = vm.api().calls.load(Ordering::SeqCst);
        fill(&mut vm, "Ulysses", "", "Modernist");

        assert!(matches!(
            vm.submit().await,
            Err(ClientError::InvalidInput(_))
        ));
        assert_eq!(vm.api().calls.load(Ordering::SeqCst), calls);
        assert_eq!(vm.notice().unwrap().text, REQUIRED_FIELDS);
    }

    #[tokio::test]
    async fn edit_round_trip_trusts_server_response() {
        let api = FakeApi {
            normalize: true,
            ..FakeApi::default()
        };
        api.store
            .create(BookFields::new("Dune", "Herbert", "Sci-fi"))
            .await
            .unwrap();
        let mut vm = view_model(api);
        vm.load().await.unwrap();

        assert!(vm.begin_edit(1));
        assert_eq!(vm.form().editing_id(), Some(1));
        assert_eq!(vm.form().author, "Herbert");

        vm.form_mut().title = "  Dune  ".to_string();
        vm.form_mut().author = "F. Herbert".to_string();
        let book = vm.submit().await.unwrap();

        assert_eq!(book.title, "Dune");
        assert_eq!(vm.books().get(1), Some(&book));
        assert_eq!(vm.books().len(), 1);
        assert!(!vm.form().is_editing());
        assert_eq!(vm.notice().unwrap().text, "Book updated successfully.");
    }

    #[tokio::test]
    async fn failed_update_leaves_list_untouched() {
        let mut vm = seeded().await;
        assert!(vm.begin_edit(2));
        vm.form_mut().author = "J. Austen".to_string();
        vm.api().offline.store(true, Ordering::SeqCst);

        let err = vm.submit().await.unwrap_err();

        assert!(matches!(err, ClientError::Server { status: 503, .. }));
        assert_eq!(vm.books().get(2).unwrap().author, "Austen");
        assert_eq!(vm.form().editing_id(), Some(2));
        assert_eq!(vm.notice().unwrap().text, "Failed to update the book.");
    }

    #[tokio::test]
    async fn begin_edit_unknown_book_keeps_create_mode() {
        let mut vm = seeded().await;
        assert!(!vm.begin_edit(42));
        assert!(!vm.form().is_editing());
    }

    #[tokio::test]
    async fn cancel_edit_returns_to_create_mode() {
        let mut vm = seeded().await;
        assert!(vm.begin_edit(1));
        vm.cancel_edit();
        assert_eq!(vm.form(), &BookForm::default());
    }

    #[tokio::test]
    async fn delete_removes_after_success_only() {
        let mut vm = seeded().await;

        vm.api().offline.store(true, Ordering::SeqCst);
        assert!(vm.delete(1).await.is_err());
        assert!(vm.books().get(1).is_some());
        assert_eq!(vm.notice().unwrap().text, "Failed to delete the book.");

        vm.api().offline.store(false, Ordering::SeqCst);
        assert!(vm.begin_edit(1));
        vm.delete(1).await.unwrap();
        assert!(vm.books().get(1).is_none());
        assert!(!vm.form().is_editing());
        assert_eq!(vm.notice().unwrap().text, "Book deleted successfully.");
    }

    #[tokio::test]
    async fn delete_of_vanished_book_reports_not_found() {
        let mut vm = seeded().await;
        vm.api().store.delete(2).await.unwrap();

        let err = vm.delete(2).await.unwrap_err();

        assert!(matches!(err, ClientError::NotFound(_)));
        assert!(vm.books().get(2).is_some());
        assert_eq!(vm.notice().unwrap().kind, NoticeKind::Error);
    }
}
