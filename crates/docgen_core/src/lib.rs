pub mod domain;
pub mod fallback;
pub mod outline;
pub mod ports;

pub use domain::{
    Content, DocumentKind, ExportedDocument, Feedback, Generated, GenerationSource,
    NewContent, NewProject, OutlineEntry, Project, RefinementHistory, User, UserCredentials,
};
pub use fallback::{KeywordRewriter, RefinementRewriter};
pub use ports::{
    ContentGenerationService, DatabaseService, DocumentExporter, PortError, PortResult,
};
