mod source_factory;

pub use source_factory::{
    Endpoints, SourceFactory, SourceKind, SourceSettings, DEFAULT_SNYK_TOKEN_ENV, DEFAULT_TIMEOUT,
};
