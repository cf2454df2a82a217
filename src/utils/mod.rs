pub mod chain_normalizer;

pub use chain_normalizer::{is_same_chain, normalize_chain_identifier, parse_chain_id};
