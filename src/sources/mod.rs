pub mod resolver;

pub use resolver::SourceResolver;
