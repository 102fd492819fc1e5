pub mod handlers;
pub mod importer;
pub mod session;
pub mod storage;

pub use handlers::TransferHost;
pub use importer::{FolderProject, ImportedItem, InsertionPoint, MediaImporter};
pub use session::{ClosedFile, SessionMachine};
pub use storage::WorkArea;
