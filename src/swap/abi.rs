//! Call encoding and event decoding for ERC-20 and V2 router interactions

use alloy::{
    primitives::{Address, B256, U256, keccak256},
    rpc::types::eth::Log,
    sol_types::{SolType, SolValue, abi::TokenSeq},
};
use anyhow::{Context, Result};

fn encode_call<T: SolValue>(signature: &str, args: &T) -> Vec<u8>
where
    for<'a> <T::SolType as SolType>::Token<'a>: TokenSeq<'a>,
{
    let mut data = keccak256(signature)[..4].to_vec();
    data.extend_from_slice(&args.abi_encode_params());
    data
}

pub fn erc20_balance_of(owner: Address) -> Vec<u8> {
    encode_call("balanceOf(address)", &(owner,))
}

pub fn erc20_allowance(owner: Address, spender: Address) -> Vec<u8> {
    encode_call("allowance(address,address)", &(owner, spender))
}

pub fn erc20_approve(spender: Address, amount: U256) -> Vec<u8> {
    encode_call("approve(address,uint256)", &(spender, amount))
}

pub fn router_get_amounts_out(amount_in: U256, path: &[Address]) -> Vec<u8> {
    encode_call(
        "getAmountsOut(uint256,address[])",
        &(amount_in, path.to_vec()),
    )
}

pub fn router_swap_exact_tokens(
    amount_in: U256,
    min_out: U256,
    path: &[Address],
    recipient: Address,
    deadline: U256,
) -> Vec<u8> {
    encode_call(
        "swapExactTokensForTokens(uint256,uint256,address[],address,uint256)",
        &(amount_in, min_out, path.to_vec(), recipient, deadline),
    )
}

pub fn decode_uint(data: &[u8]) -> Result<U256> {
    U256::abi_decode(data, true).context("Failed to decode uint256 return value")
}

pub fn decode_amounts(data: &[u8]) -> Result<Vec<U256>> {
    <Vec<U256>>::abi_decode(data, true).context("Failed to decode amounts array")
}

/// keccak topic of the V2 pair `Swap` event.
pub fn swap_event_topic() -> B256 {
    keccak256("Swap(address,uint256,uint256,uint256,uint256,address)")
}

/// Recover the realized (in, out) amounts of a single-hop swap from receipt
/// logs. Returns None when no parseable Swap event is present.
pub fn parse_swap_amounts(logs: &[Log]) -> Option<(U256, U256)> {
    let topic = swap_event_topic();

    for log in logs {
        let topics = log.inner.data.topics();
        if topics.first() != Some(&topic) {
            continue;
        }

        let Ok((amount0_in, amount1_in, amount0_out, amount1_out)) =
            <(U256, U256, U256, U256)>::abi_decode(&log.inner.data.data, true)
        else {
            continue;
        };

        let amount_in = amount0_in.max(amount1_in);
        let amount_out = amount0_out.max(amount1_out);
        if amount_out > U256::ZERO {
            return Some((amount_in, amount_out));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn call_data_starts_with_the_selector() {
        let owner = address!("1111111111111111111111111111111111111111");
        let data = erc20_balance_of(owner);
        assert_eq!(&data[..4], &keccak256("balanceOf(address)")[..4]);
        // selector + one 32-byte word
        assert_eq!(data.len(), 4 + 32);
    }

    #[test]
    fn swap_call_encodes_the_full_parameter_set() {
        let path = vec![
            address!("1111111111111111111111111111111111111111"),
            address!("2222222222222222222222222222222222222222"),
        ];
        let data = router_swap_exact_tokens(
            U256::from(1000u64),
            U256::from(990u64),
            &path,
            address!("3333333333333333333333333333333333333333"),
            U256::from(1_700_000_000u64),
        );
        // selector + 5 head words + array length word + 2 elements
        assert_eq!(data.len(), 4 + 32 * 8);
    }

    #[test]
    fn uint_decoding_round_trips() {
        let value = U256::from(123_456u64);
        let encoded = value.abi_encode();
        assert_eq!(decode_uint(&encoded).unwrap(), value);
    }

    #[test]
    fn amounts_decoding_round_trips() {
        let amounts = vec![U256::from(5u64), U256::from(7u64)];
        let encoded = amounts.abi_encode();
        assert_eq!(decode_amounts(&encoded).unwrap(), amounts);
    }
}
