//! 청크 백필 엔진 통합 테스트.

mod common;

use chrono::{Duration, TimeZone, Utc};
use common::{MemoryStore, MockProvider};
use rust_decimal_macros::dec;
use xrpbot_collector::modules::run_backfill;
use xrpbot_collector::CollectorError;
use xrpbot_data::DataError;

#[tokio::test]
async fn two_day_backfill_stores_192_unique_points() {
    let store = MemoryStore::new();
    let provider = MockProvider::new();

    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    let end = start + Duration::days(2);

    let stats = run_backfill(&store, &provider, start, end).await.unwrap();

    assert_eq!(store.len(), 192);
    assert_eq!(stats.candles, 192);
    assert_eq!(stats.chunks, 2);
    assert_eq!(stats.calls, 2);
    assert_eq!(provider.calls(), 2);

    let all = store.all();
    assert_eq!(all.first().unwrap().timestamp, start);
    assert_eq!(
        all.last().unwrap().timestamp,
        end - Duration::minutes(15)
    );
    for candle in &all {
        assert_eq!(candle.price_change, candle.close - candle.open);
        assert_eq!(candle.price_change, dec!(0.05));
    }
}

#[tokio::test]
async fn failure_on_second_chunk_leaves_first_chunk_committed() {
    let store = MemoryStore::new();
    let provider = MockProvider::failing_on(2);

    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    let end = start + Duration::days(3);

    let err = run_backfill(&store, &provider, start, end).await.unwrap_err();

    // 에러는 가공 없이 그대로 전파된다
    match err {
        CollectorError::Data(DataError::FetchError(msg)) => {
            assert_eq!(msg, "synthetic outage");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // 첫 청크(하루치 96개)만 커밋되어 있어야 한다
    assert_eq!(store.len(), 96);
    let day_one_end = start + Duration::days(1);
    for candle in store.all() {
        assert!(candle.timestamp < day_one_end);
    }

    // 실패한 청크 이후로는 시도하지 않는다
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn rerun_over_populated_range_is_idempotent() {
    let store = MemoryStore::new();
    let provider = MockProvider::new();

    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    let end = start + Duration::days(2);

    run_backfill(&store, &provider, start, end).await.unwrap();
    assert_eq!(store.len(), 192);

    // 같은 범위 재실행은 에러도 중복도 만들지 않는다
    let stats = run_backfill(&store, &provider, start, end).await.unwrap();
    assert_eq!(store.len(), 192);
    assert_eq!(stats.chunks, 2);
}

#[tokio::test]
async fn partial_final_chunk_is_smaller_than_a_day() {
    let store = MemoryStore::new();
    let provider = MockProvider::new();

    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    let end = start + Duration::days(1) + Duration::hours(1);

    let stats = run_backfill(&store, &provider, start, end).await.unwrap();

    assert_eq!(stats.chunks, 2);
    assert_eq!(store.len(), 96 + 4);
}

#[tokio::test]
async fn empty_range_does_nothing() {
    let store = MemoryStore::new();
    let provider = MockProvider::new();

    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();

    let stats = run_backfill(&store, &provider, start, start).await.unwrap();

    assert_eq!(stats.chunks, 0);
    assert_eq!(store.len(), 0);
    assert_eq!(provider.calls(), 0);
}
