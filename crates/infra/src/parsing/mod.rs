//! Natural-language parsing adapters.

mod date_parser;

pub use date_parser::NaturalDateParser;
