pub mod archive;
pub mod chunk;
pub mod flatten;

pub use archive::{validate_archive_path, ArchiveLoader, ExtractionDir, CONVERSATIONS_FILE};
pub use chunk::{chunk_text, DEFAULT_CHUNK_SIZE};
pub use flatten::{extract_user_prompts, flatten_user_text};
