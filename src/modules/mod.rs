pub mod books;

use std::sync::Arc;

use bookshelf_db::BookStore;
use bookshelf_kernel::ModuleRegistry;

/// Register all application modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, store: Arc<dyn BookStore>) {
    registry.register(books::create_module(store));
}
