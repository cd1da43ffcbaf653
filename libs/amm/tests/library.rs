//! Registry-backed quoting: reserve lookups and multi-hop amount walks

mod common;

use common::{engine, eth, milli, wei, Engine};
use pairswap_amm::{AmmError, Amount, V2Math};

/// Pools A/B (1, 2), B/C (1, 0.5), C/D (1, 2)
fn four_token_path() -> Engine {
    let e = engine(4);
    e.seed(0, 1, eth(1), eth(2));
    e.seed(1, 2, eth(1), milli(500));
    e.seed(2, 3, eth(1), eth(2));
    e
}

#[test]
fn test_get_reserves_follows_requested_order() {
    let e = engine(2);
    e.seed(1, 0, eth(3), eth(7));

    let factory = e.factory();
    assert_eq!(
        V2Math::get_reserves(factory, e.token(1), e.token(0)).unwrap(),
        (eth(3), eth(7))
    );
    assert_eq!(
        V2Math::get_reserves(factory, e.token(0), e.token(1)).unwrap(),
        (eth(7), eth(3))
    );

    let pair = factory.pair_for(e.token(0), e.token(1)).unwrap();
    assert_eq!(pair.reserves().reserve0, eth(7));
}

#[test]
fn test_get_reserves_missing_pair() {
    let e = engine(3);
    assert_eq!(
        V2Math::get_reserves(e.factory(), e.token(0), e.token(2)).unwrap_err(),
        AmmError::PairNotFound(e.token(0), e.token(2))
    );
    assert_eq!(
        V2Math::get_reserves(e.factory(), e.token(0), e.token(0)).unwrap_err(),
        AmmError::IdenticalAssets
    );
}

#[test]
fn test_get_amounts_out_over_three_hops() {
    let e = four_token_path();
    let amounts = V2Math::get_amounts_out(e.factory(), milli(100), &e.path(&[0, 1, 2, 3])).unwrap();
    assert_eq!(
        amounts,
        vec![
            milli(100),
            wei(181_322_178_776_029_826),
            wei(76_550_452_221_167_502),
            wei(141_817_942_760_565_270),
        ]
    );
}

#[test]
fn test_get_amounts_in_over_three_hops() {
    let e = four_token_path();
    let amounts = V2Math::get_amounts_in(e.factory(), milli(100), &e.path(&[0, 1, 2, 3])).unwrap();
    assert_eq!(
        amounts,
        vec![
            wei(63_113_405_152_841_847),
            wei(118_398_043_685_444_580),
            wei(52_789_948_793_749_671),
            milli(100),
        ]
    );
}

#[test]
fn test_reverse_direction_uses_flipped_reserves() {
    let e = engine(2);
    e.seed(0, 1, eth(1), eth(2));

    let forward = V2Math::get_amounts_out(e.factory(), milli(100), &e.path(&[0, 1])).unwrap();
    assert_eq!(forward[1], wei(181_322_178_776_029_826));

    let backward = V2Math::get_amounts_out(e.factory(), milli(200), &e.path(&[1, 0])).unwrap();
    assert_eq!(backward[1], wei(90_661_089_388_014_913));
}

#[test]
fn test_amount_walks_reject_short_paths() {
    let e = four_token_path();
    assert_eq!(
        V2Math::get_amounts_out(e.factory(), eth(1), &e.path(&[0])).unwrap_err(),
        AmmError::InvalidPath
    );
    assert_eq!(
        V2Math::get_amounts_in(e.factory(), eth(1), &[]).unwrap_err(),
        AmmError::InvalidPath
    );
    assert_eq!(
        V2Math::get_amounts_out(e.factory(), eth(1), &e.path(&[0, 3])).unwrap_err(),
        AmmError::PairNotFound(e.token(0), e.token(3))
    );
}

#[test]
fn test_amount_walks_propagate_hop_errors() {
    let e = four_token_path();
    // C/D only holds 2 D
    assert_eq!(
        V2Math::get_amounts_in(e.factory(), eth(2), &e.path(&[2, 3])).unwrap_err(),
        AmmError::InsufficientLiquidity
    );
    assert_eq!(
        V2Math::get_amounts_out(e.factory(), Amount::zero(), &e.path(&[0, 1])).unwrap_err(),
        AmmError::InsufficientAmount
    );

    // A pool that exists but was never funded
    e.router.create_pair(e.token(0), e.token(3)).unwrap();
    assert_eq!(
        V2Math::get_amounts_out(e.factory(), eth(1), &e.path(&[0, 3])).unwrap_err(),
        AmmError::InsufficientLiquidity
    );
}

#[test]
fn test_quote_after_seeding() {
    let e = engine(2);
    e.seed(0, 1, eth(1), eth(2));
    let (reserve_a, reserve_b) = e.router.get_reserves(e.token(0), e.token(1)).unwrap();
    assert_eq!(V2Math::quote(milli(500), reserve_a, reserve_b).unwrap(), eth(1));
    assert_eq!(V2Math::quote(eth(1), reserve_b, reserve_a).unwrap(), milli(500));
}
