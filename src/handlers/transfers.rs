//! Builtin transfer recognition handlers
//!
//! Each handler decodes one recognized method shape and records its economic
//! effect: balance adjustments on the shared [`StateChange`] and one payment
//! per recognized movement. Decoding uses `sol!`-generated bindings; a
//! decode failure for a matched selector is fatal to the interpretation run.
//!
//! [`StateChange`]: crate::balance::StateChange

use alloy::primitives::U256;
use alloy::sol_types::SolCall;

use super::CallHandler;
use crate::errors::InterpretError;
use crate::interpreter::Interpretation;
use crate::types::{CallTrace, TokenId, NATIVE_TOKEN_ADDRESS};

/// ABI bindings for the recognized methods
///
/// Overloaded names (`safeTransferFrom`, `deposit`, `transfer`) live in
/// separate modules so each signature gets its own call type.
mod abi {
    pub(super) mod erc20 {
        alloy::sol! {
            function transfer(address to, uint256 value);
            // Shared ERC20/ERC721 shape; the third word is a value for
            // fungible tokens and a token id otherwise.
            function transferFrom(address from, address to, uint256 valueOrTokenId);
            function transferWithAuthorization(
                address from,
                address to,
                uint256 value,
                uint256 validAfter,
                uint256 validBefore,
                bytes32 nonce,
                uint8 v,
                bytes32 r,
                bytes32 s
            );
            function mint(address to, uint256 value);
            function burn(uint256 value);
        }
    }

    pub(super) mod erc721 {
        alloy::sol! {
            function safeTransferFrom(address from, address to, uint256 tokenId);
        }
    }

    pub(super) mod erc721_with_data {
        alloy::sol! {
            function safeTransferFrom(address from, address to, uint256 tokenId, bytes data);
        }
    }

    pub(super) mod erc1155 {
        alloy::sol! {
            function safeTransferFrom(address from, address to, uint256 id, uint256 value, bytes data);
            function safeBatchTransferFrom(address from, address to, uint256[] ids, uint256[] values, bytes data);
        }
    }

    pub(super) mod wrapped {
        alloy::sol! {
            function deposit();
            function depositTo(address to);
            function withdraw(uint256 value);
            function withdrawTo(address to, uint256 value);
            function withdrawFrom(address from, address to, uint256 value);
        }
    }

    pub(super) mod wrapped_with_beneficiary {
        alloy::sol! {
            function deposit(address to);
        }
    }

    pub(super) mod bridge {
        alloy::sol! {
            function transfer(address token, address to, uint256 amount);
        }
    }
}

/// The builtin handler set, in registration order
pub(super) fn builtin_handlers() -> Vec<CallHandler> {
    vec![
        CallHandler {
            selector: None,
            handle: native_transfer,
        },
        CallHandler {
            selector: Some(abi::erc20::transferCall::SELECTOR.into()),
            handle: erc20_transfer,
        },
        CallHandler {
            selector: Some(abi::erc20::transferFromCall::SELECTOR.into()),
            handle: transfer_from,
        },
        CallHandler {
            selector: Some(abi::erc721::safeTransferFromCall::SELECTOR.into()),
            handle: erc721_safe_transfer_from,
        },
        CallHandler {
            selector: Some(abi::erc721_with_data::safeTransferFromCall::SELECTOR.into()),
            handle: erc721_safe_transfer_from_with_data,
        },
        CallHandler {
            selector: Some(abi::erc1155::safeTransferFromCall::SELECTOR.into()),
            handle: erc1155_safe_transfer_from,
        },
        CallHandler {
            selector: Some(abi::erc1155::safeBatchTransferFromCall::SELECTOR.into()),
            handle: erc1155_safe_batch_transfer_from,
        },
        CallHandler {
            selector: Some(abi::erc20::mintCall::SELECTOR.into()),
            handle: erc20_mint,
        },
        CallHandler {
            selector: Some(abi::erc20::burnCall::SELECTOR.into()),
            handle: erc20_burn,
        },
        CallHandler {
            selector: Some(abi::erc20::transferWithAuthorizationCall::SELECTOR.into()),
            handle: transfer_with_authorization,
        },
        CallHandler {
            selector: Some(abi::wrapped::depositCall::SELECTOR.into()),
            handle: wrapped_deposit,
        },
        CallHandler {
            selector: Some(abi::wrapped_with_beneficiary::depositCall::SELECTOR.into()),
            handle: wrapped_deposit_with_beneficiary,
        },
        CallHandler {
            selector: Some(abi::wrapped::depositToCall::SELECTOR.into()),
            handle: wrapped_deposit_to,
        },
        CallHandler {
            selector: Some(abi::wrapped::withdrawCall::SELECTOR.into()),
            handle: wrapped_withdraw,
        },
        CallHandler {
            selector: Some(abi::wrapped::withdrawToCall::SELECTOR.into()),
            handle: wrapped_withdraw_to,
        },
        CallHandler {
            selector: Some(abi::wrapped::withdrawFromCall::SELECTOR.into()),
            handle: wrapped_withdraw_from,
        },
        CallHandler {
            selector: Some(abi::bridge::transferCall::SELECTOR.into()),
            handle: native_bridge_transfer,
        },
    ]
}

/// Native asset moved via call value
///
/// Generic: fires on every call node, independent of the input. Synthetic
/// internal transfers touching a reserved precompile address are not real
/// economic transfers and are suppressed.
fn native_transfer(run: &mut Interpretation, trace: &CallTrace) -> Result<(), InterpretError> {
    if trace.value.is_zero() {
        return Ok(());
    }
    let config = run.config();
    if config.is_precompile(trace.from) || config.is_precompile(trace.to) {
        return Ok(());
    }
    run.transfer(trace.from, trace.to, TokenId::Native, trace.value)
}

/// ERC20 `transfer(address,uint256)`
fn erc20_transfer(run: &mut Interpretation, trace: &CallTrace) -> Result<(), InterpretError> {
    let call = abi::erc20::transferCall::abi_decode(&trace.input)
        .map_err(InterpretError::decoder("transfer(address,uint256)"))?;
    run.transfer(trace.from, call.to, TokenId::erc20(trace.to), call.value)
}

/// Combined ERC20/ERC721 `transferFrom(address,address,uint256)`
///
/// The two standards share this selector. ERC20 returns a boolean word,
/// ERC721 returns nothing, so non-empty return data resolves to ERC20.
/// Contracts on the configured allow-list are fungible despite returning no
/// data and always resolve to ERC20.
fn transfer_from(run: &mut Interpretation, trace: &CallTrace) -> Result<(), InterpretError> {
    let call = abi::erc20::transferFromCall::abi_decode(&trace.input)
        .map_err(InterpretError::decoder("transferFrom(address,address,uint256)"))?;
    let fungible =
        !trace.output.is_empty() || run.config().non_standard_erc20.contains(&trace.to);
    if fungible {
        run.transfer(
            call.from,
            call.to,
            TokenId::erc20(trace.to),
            call.valueOrTokenId,
        )
    } else {
        run.transfer(
            call.from,
            call.to,
            TokenId::erc721(trace.to, call.valueOrTokenId),
            U256::ONE,
        )
    }
}

/// ERC721 `safeTransferFrom(address,address,uint256)`
fn erc721_safe_transfer_from(
    run: &mut Interpretation,
    trace: &CallTrace,
) -> Result<(), InterpretError> {
    let call = abi::erc721::safeTransferFromCall::abi_decode(&trace.input).map_err(
        InterpretError::decoder("safeTransferFrom(address,address,uint256)"),
    )?;
    run.transfer(
        call.from,
        call.to,
        TokenId::erc721(trace.to, call.tokenId),
        U256::ONE,
    )
}

/// ERC721 `safeTransferFrom(address,address,uint256,bytes)`
fn erc721_safe_transfer_from_with_data(
    run: &mut Interpretation,
    trace: &CallTrace,
) -> Result<(), InterpretError> {
    let call = abi::erc721_with_data::safeTransferFromCall::abi_decode(&trace.input).map_err(
        InterpretError::decoder("safeTransferFrom(address,address,uint256,bytes)"),
    )?;
    run.transfer(
        call.from,
        call.to,
        TokenId::erc721(trace.to, call.tokenId),
        U256::ONE,
    )
}

/// ERC1155 `safeTransferFrom(address,address,uint256,uint256,bytes)`
fn erc1155_safe_transfer_from(
    run: &mut Interpretation,
    trace: &CallTrace,
) -> Result<(), InterpretError> {
    let call = abi::erc1155::safeTransferFromCall::abi_decode(&trace.input).map_err(
        InterpretError::decoder("safeTransferFrom(address,address,uint256,uint256,bytes)"),
    )?;
    run.transfer(
        call.from,
        call.to,
        TokenId::erc1155(trace.to, call.id),
        call.value,
    )
}

/// ERC1155 `safeBatchTransferFrom`
///
/// The ids and values arrays run in parallel and must have equal length;
/// each index yields its own adjustment pair and payment, never merged.
fn erc1155_safe_batch_transfer_from(
    run: &mut Interpretation,
    trace: &CallTrace,
) -> Result<(), InterpretError> {
    let call = abi::erc1155::safeBatchTransferFromCall::abi_decode(&trace.input).map_err(
        InterpretError::decoder(
            "safeBatchTransferFrom(address,address,uint256[],uint256[],bytes)",
        ),
    )?;
    if call.ids.len() != call.values.len() {
        return Err(InterpretError::BatchLengthMismatch {
            ids: call.ids.len(),
            values: call.values.len(),
        });
    }
    for (id, value) in call.ids.iter().zip(&call.values) {
        run.transfer(
            call.from,
            call.to,
            TokenId::erc1155(trace.to, *id),
            *value,
        )?;
    }
    Ok(())
}

/// `mint(address,uint256)`: an inflow from the zero address
fn erc20_mint(run: &mut Interpretation, trace: &CallTrace) -> Result<(), InterpretError> {
    let call = abi::erc20::mintCall::abi_decode(&trace.input)
        .map_err(InterpretError::decoder("mint(address,uint256)"))?;
    run.transfer(
        NATIVE_TOKEN_ADDRESS,
        call.to,
        TokenId::erc20(trace.to),
        call.value,
    )
}

/// `burn(uint256)`: the caller's balance flows to the zero address
fn erc20_burn(run: &mut Interpretation, trace: &CallTrace) -> Result<(), InterpretError> {
    let call = abi::erc20::burnCall::abi_decode(&trace.input)
        .map_err(InterpretError::decoder("burn(uint256)"))?;
    run.transfer(
        trace.from,
        NATIVE_TOKEN_ADDRESS,
        TokenId::erc20(trace.to),
        call.value,
    )
}

/// EIP-3009 `transferWithAuthorization`: a standard transfer between the
/// decoded from/to pair
fn transfer_with_authorization(
    run: &mut Interpretation,
    trace: &CallTrace,
) -> Result<(), InterpretError> {
    let call = abi::erc20::transferWithAuthorizationCall::abi_decode(&trace.input).map_err(
        InterpretError::decoder(
            "transferWithAuthorization(address,address,uint256,uint256,uint256,bytes32,uint8,bytes32,bytes32)",
        ),
    )?;
    run.transfer(call.from, call.to, TokenId::erc20(trace.to), call.value)
}

/// `deposit()`: attached native value wrapped for the caller
fn wrapped_deposit(run: &mut Interpretation, trace: &CallTrace) -> Result<(), InterpretError> {
    if trace.value.is_zero() {
        return Ok(());
    }
    run.deposit(trace.from, TokenId::erc20(trace.to), trace.value)
}

/// `deposit(address)`: attached native value wrapped for the beneficiary
fn wrapped_deposit_with_beneficiary(
    run: &mut Interpretation,
    trace: &CallTrace,
) -> Result<(), InterpretError> {
    if trace.value.is_zero() {
        return Ok(());
    }
    let call = abi::wrapped_with_beneficiary::depositCall::abi_decode(&trace.input)
        .map_err(InterpretError::decoder("deposit(address)"))?;
    run.deposit(call.to, TokenId::erc20(trace.to), trace.value)
}

/// `depositTo(address)`
fn wrapped_deposit_to(run: &mut Interpretation, trace: &CallTrace) -> Result<(), InterpretError> {
    if trace.value.is_zero() {
        return Ok(());
    }
    let call = abi::wrapped::depositToCall::abi_decode(&trace.input)
        .map_err(InterpretError::decoder("depositTo(address)"))?;
    run.deposit(call.to, TokenId::erc20(trace.to), trace.value)
}

/// `withdraw(uint256)`: the caller unwraps back to native
fn wrapped_withdraw(run: &mut Interpretation, trace: &CallTrace) -> Result<(), InterpretError> {
    let call = abi::wrapped::withdrawCall::abi_decode(&trace.input)
        .map_err(InterpretError::decoder("withdraw(uint256)"))?;
    run.withdraw(trace.from, TokenId::erc20(trace.to), call.value)
}

/// `withdrawTo(address,uint256)`: the caller unwraps in favor of another
/// recipient; the token side still leaves the caller
fn wrapped_withdraw_to(run: &mut Interpretation, trace: &CallTrace) -> Result<(), InterpretError> {
    let call = abi::wrapped::withdrawToCall::abi_decode(&trace.input)
        .map_err(InterpretError::decoder("withdrawTo(address,uint256)"))?;
    run.withdraw(trace.from, TokenId::erc20(trace.to), call.value)
}

/// `withdrawFrom(address,address,uint256)`: unwraps the decoded holder
fn wrapped_withdraw_from(
    run: &mut Interpretation,
    trace: &CallTrace,
) -> Result<(), InterpretError> {
    let call = abi::wrapped::withdrawFromCall::abi_decode(&trace.input)
        .map_err(InterpretError::decoder("withdrawFrom(address,address,uint256)"))?;
    run.withdraw(call.from, TokenId::erc20(trace.to), call.value)
}

/// Chain-specific native-asset bridge `transfer(address,address,uint256)`
///
/// Fires only against the configured system contract, and only when the
/// decoded token argument is the native sentinel. Models a protocol-level
/// mint/refund: credit without a matching debit, with the payment flowing
/// from the system address. The target check runs before decoding so
/// unrelated contracts sharing the selector are ignored rather than failing
/// the run.
fn native_bridge_transfer(
    run: &mut Interpretation,
    trace: &CallTrace,
) -> Result<(), InterpretError> {
    if run.config().native_bridge != Some(trace.to) {
        return Ok(());
    }
    let call = abi::bridge::transferCall::abi_decode(&trace.input)
        .map_err(InterpretError::decoder("transfer(address,address,uint256)"))?;
    if call.token != NATIVE_TOKEN_ADDRESS {
        return Ok(());
    }
    run.bridge_credit(trace.to, call.to, call.amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn builtin_selectors_are_unique() {
        let handlers = builtin_handlers();
        let selectors: HashSet<_> = handlers.iter().filter_map(|h| h.selector).collect();
        assert_eq!(selectors.len(), handlers.len() - 1, "one generic handler");
    }

    #[test]
    fn well_known_selectors() {
        assert_eq!(abi::erc20::transferCall::SELECTOR, [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(
            abi::erc20::transferFromCall::SELECTOR,
            [0x23, 0xb8, 0x72, 0xdd]
        );
        assert_eq!(abi::wrapped::depositCall::SELECTOR, [0xd0, 0xe3, 0x0d, 0xb0]);
        assert_eq!(abi::wrapped::withdrawCall::SELECTOR, [0x2e, 0x1a, 0x7d, 0x4d]);
    }
}
