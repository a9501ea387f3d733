pub mod patterns;
pub mod version_parser;

pub use version_parser::{parse_solidity_version, SolidityVersion};
