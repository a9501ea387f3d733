//! Built-in vulnerability detectors.
//!
//! Each detector reads the [`SourceUnit`] model only; none of them look at the
//! syntax tree again. That keeps them cheap and lets one model feed all rules.

pub mod access_control;
pub mod constructor_validation;
pub mod gas_limit;
pub mod integer_overflow;
pub mod redundant_safemath;
pub mod reentrancy;
pub mod timestamp;
pub mod tx_origin;
pub mod unchecked_return;

pub use access_control::AccessControlDetector;
pub use constructor_validation::ConstructorValidationDetector;
pub use gas_limit::GasLimitDetector;
pub use integer_overflow::IntegerOverflowDetector;
pub use redundant_safemath::RedundantSafeMathDetector;
pub use reentrancy::ReentrancyDetector;
pub use timestamp::TimestampDetector;
pub use tx_origin::TxOriginDetector;
pub use unchecked_return::UncheckedReturnDetector;

use crate::core::{AuditConfig, Detector, Location};
use crate::model::{ContractDef, ContractKind, FunctionDef, SourceUnit};
use std::sync::Arc;

/// The built-in rule set in registration order.
pub fn builtin_detectors(config: &AuditConfig) -> Vec<Arc<dyn Detector>> {
    vec![
        Arc::new(ReentrancyDetector::with_config(config)),
        Arc::new(IntegerOverflowDetector::new()),
        Arc::new(AccessControlDetector::with_config(config)),
        Arc::new(TxOriginDetector::new()),
        Arc::new(UncheckedReturnDetector::new()),
        Arc::new(TimestampDetector::new()),
        Arc::new(GasLimitDetector::new()),
        Arc::new(ConstructorValidationDetector::new()),
        Arc::new(RedundantSafeMathDetector::new()),
    ]
}

pub(crate) fn function_location(
    unit: &SourceUnit,
    contract: &ContractDef,
    function: &FunctionDef,
    line: usize,
    statement_index: Option<usize>,
) -> Location {
    let location = Location::new(unit.path.clone(), line)
        .with_contract(contract.name.clone())
        .with_function(function.name.clone());
    match statement_index {
        Some(index) => location.with_statement_index(index),
        None => location,
    }
}

/// Contracts that carry implementation code.
pub(crate) fn concrete_contracts(unit: &SourceUnit) -> impl Iterator<Item = &ContractDef> {
    unit.contracts
        .iter()
        .filter(|c| c.kind != ContractKind::Interface)
}

/// Functions followed by modifier bodies.
pub(crate) fn all_bodies(contract: &ContractDef) -> impl Iterator<Item = &FunctionDef> {
    contract.functions.iter().chain(contract.modifier_defs.iter())
}

#[cfg(test)]
pub(crate) fn parse_unit(source: &str) -> SourceUnit {
    crate::model::SourceModelBuilder::new()
        .unwrap()
        .build("test.sol", source)
        .unwrap()
}
