//! Fix suggestions keyed by rule id.

const REENTRANCY: &str = "Apply the Checks-Effects-Interactions pattern: validate inputs, update \
state, and only then perform the external call. Protect value-moving functions with a \
reentrancy guard such as OpenZeppelin's ReentrancyGuard `nonReentrant` modifier.";

const INTEGER_OVERFLOW: &str = "Compile with Solidity 0.8.0 or later to get checked arithmetic, \
or route arithmetic through a SafeMath library on older compilers. Reserve `unchecked` blocks \
for operations whose bounds have already been proven.";

const ACCESS_CONTROL: &str = "Restrict privileged functions with an authorization modifier \
(Ownable's `onlyOwner`, AccessControl's `onlyRole`) or an explicit `require(msg.sender == ...)` \
check. Never authorize with tx.origin.";

const TX_ORIGIN: &str = "Authorize with msg.sender instead of tx.origin. A contract called by \
the owner can otherwise act on the owner's behalf (phishing).";

const UNCHECKED_RETURN: &str = "Check the boolean returned by low-level calls and `send`, for \
example `(bool ok, ) = to.call{value: v}(\"\"); require(ok);`. For ERC20 tokens use SafeERC20.";

const TIMESTAMP: &str = "Do not use block.timestamp for randomness or exact equality. \
Miners can shift it by several seconds; tolerate that drift in time windows.";

const GAS_LIMIT: &str = "Avoid iterating over storage arrays that grow without bound. Paginate \
the work or switch to a pull-based design so each transaction does bounded work.";

const CONSTRUCTOR_VALIDATION: &str = "Validate constructor arguments (non-zero addresses, sane \
ranges) with require statements. Constructor mistakes are permanent once deployed.";

const REDUNDANT_SAFEMATH: &str = "Solidity 0.8.0 and later revert on overflow by default. \
SafeMath can be removed to save gas.";

const GENERIC: &str = "Review the reported code against the external tool's documentation \
for this check and apply the recommended fix.";

/// Remediation text for a rule. Unknown and `external:` rules get generic advice.
pub fn advice_for(rule_id: &str) -> &'static str {
    match rule_id {
        "reentrancy" => REENTRANCY,
        "integer_overflow" => INTEGER_OVERFLOW,
        "access_control" => ACCESS_CONTROL,
        "tx_origin" => TX_ORIGIN,
        "unchecked_return" => UNCHECKED_RETURN,
        "timestamp" => TIMESTAMP,
        "gas_limit" => GAS_LIMIT,
        "constructor_validation" => CONSTRUCTOR_VALIDATION,
        "redundant_safemath" => REDUNDANT_SAFEMATH,
        _ => GENERIC,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_rules_have_specific_advice() {
        assert!(advice_for("tx_origin").contains("msg.sender"));
        assert!(advice_for("integer_overflow").contains("0.8.0"));
        assert_eq!(advice_for("external:shadowing-state"), GENERIC);
    }
}
