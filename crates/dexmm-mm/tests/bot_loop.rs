//! Drives `BasicMarketMaker::bot_loop` through a channel-backed book feed.

use std::sync::Arc;
use std::time::Duration;

use dexmm_core::{AssetInfo, BookUpdate, Market, MiniOrder, ResolvedEpoch, TradePlacement};
use dexmm_mm::{
    BasicMarketMaker, BasicMarketMakingConfig, EngineError, GapStrategy, MmError, MockBotCore,
    OrderPlacement, StaticOracle,
};
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

fn market() -> Arc<Market> {
    Arc::new(
        Market::new(
            "dex.example.org:7232",
            AssetInfo::new(42, "dcr", 100_000_000),
            AssetInfo::new(0, "btc", 100_000_000),
            100_000_000,
            1,
        )
        .unwrap(),
    )
}

fn setup() -> (Arc<BasicMarketMaker>, Arc<MockBotCore>, CancellationToken) {
    let core = Arc::new(MockBotCore::new());
    core.set_fees(1_000_000, 1_000_000);
    let kill = CancellationToken::new();
    let cfg = BasicMarketMakingConfig {
        gap_strategy: GapStrategy::Percent,
        sell_placements: vec![OrderPlacement::new(1, 0.01)],
        buy_placements: vec![OrderPlacement::new(1, 0.01)],
        drift_tolerance: 0.002,
    };
    let mm = BasicMarketMaker::new(
        cfg,
        market(),
        core.clone(),
        Arc::new(StaticOracle::new(dec!(0.005))),
        kill.clone(),
    )
    .unwrap();
    (Arc::new(mm), core, kill)
}

async fn wait_for_reports(core: &MockBotCore, n: usize) {
    for _ in 0..200 {
        if core.epoch_reports().len() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {n} epoch reports");
}

fn order(epoch: u64) -> MiniOrder {
    MiniOrder {
        token: "abcd".to_string(),
        sell: true,
        msg_rate: 500_000,
        qty_atomic: 100_000_000,
        epoch,
    }
}

#[tokio::test]
async fn test_bot_loop_rebalances_on_resolved_epoch() {
    let (mm, core, kill) = setup();
    let shutdown = CancellationToken::new();
    let handle = mm.clone().bot_loop(shutdown.clone()).await.unwrap();
    let tx = core.book_sender().unwrap();

    tx.send(BookUpdate::EpochOrder(order(10))).await.unwrap();
    tx.send(BookUpdate::ResolvedEpoch(ResolvedEpoch {
        current: 11,
        resolved: 10,
    }))
    .await
    .unwrap();
    wait_for_reports(&core, 1).await;

    let trades = core.multi_trades();
    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].placements, vec![TradePlacement::new(495_000, 1)]);
    assert_eq!(trades[1].placements, vec![TradePlacement::new(505_000, 1)]);
    assert!(trades.iter().all(|t| t.epoch == 11 && t.drift_tolerance == 0.002));
    assert_eq!(core.epoch_reports()[0].epoch_num, 11);

    shutdown.cancel();
    handle.await.unwrap();
    assert!(!kill.is_cancelled());
}

#[tokio::test]
async fn test_bot_loop_ignores_other_updates() {
    let (mm, core, _) = setup();
    let shutdown = CancellationToken::new();
    let handle = mm.clone().bot_loop(shutdown.clone()).await.unwrap();
    let tx = core.book_sender().unwrap();

    tx.send(BookUpdate::BookOrder(order(3))).await.unwrap();
    tx.send(BookUpdate::UnbookOrder {
        token: "abcd".to_string(),
    })
    .await
    .unwrap();
    tx.send(BookUpdate::ResolvedEpoch(ResolvedEpoch {
        current: 4,
        resolved: 3,
    }))
    .await
    .unwrap();
    wait_for_reports(&core, 1).await;

    assert_eq!(core.epoch_reports().len(), 1);
    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_bot_loop_feed_closed_kills_bot() {
    let (mm, core, kill) = setup();
    let handle = mm.clone().bot_loop(CancellationToken::new()).await.unwrap();

    core.close_book();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(kill.is_cancelled());
    assert!(core.epoch_reports().is_empty());
}

#[tokio::test]
async fn test_bot_loop_sync_book_error() {
    let (mm, core, _) = setup();
    core.set_sync_error(EngineError::NotConnected("dex.example.org:7232".to_string()));

    let res = mm.bot_loop(CancellationToken::new()).await;
    assert!(matches!(res, Err(MmError::SyncBook(_))));
}
