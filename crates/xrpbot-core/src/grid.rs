//! 15분 그리드 시간 연산.
//!
//! 시리즈의 모든 타임스탬프는 15분 그리드에 정렬됩니다. 이 모듈은
//! 그리드 내림 정렬과 두 시점 사이의 그리드 구간 수 계산을 제공합니다.
//! 모든 함수는 순수하며 실패 경로가 없습니다.

use chrono::{DateTime, Duration, Timelike, Utc};

/// 그리드 구간 길이 (분).
pub const GRID_MINUTES: i64 = 15;

/// 하루에 포함된 그리드 구간 수.
pub const INTERVALS_PER_DAY: i64 = 24 * 60 / GRID_MINUTES;

/// 한 그리드 구간의 길이를 반환합니다.
pub fn grid_step() -> Duration {
    Duration::minutes(GRID_MINUTES)
}

/// `t` 이하의 가장 늦은 그리드 정렬 시간을 반환합니다.
///
/// 초와 서브초를 0으로 만들고 분을 15의 배수로 내림합니다.
/// 멱등하며 결과는 항상 `t` 이하입니다.
pub fn round_down_to_grid(t: DateTime<Utc>) -> DateTime<Utc> {
    let t = t
        .with_nanosecond(0)
        .and_then(|t| t.with_second(0))
        .unwrap_or(t);
    t - Duration::minutes(t.minute() as i64 % GRID_MINUTES)
}

/// `a`에서 `b`까지의 완전한 그리드 구간 수를 반환합니다.
///
/// `floor((b - a) / 15min)`. 호출자는 `b >= a`를 보장해야 하며,
/// 같은 시점이면 0을 반환합니다.
pub fn grid_intervals_between(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    (b - a).num_minutes().max(0) / GRID_MINUTES
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_round_down_floors_to_quarter_hour() {
        let t = Utc.with_ymd_and_hms(2023, 1, 1, 12, 44, 59).unwrap();
        let rounded = round_down_to_grid(t);
        assert_eq!(rounded, Utc.with_ymd_and_hms(2023, 1, 1, 12, 30, 0).unwrap());
    }

    #[test]
    fn test_round_down_is_idempotent_and_not_after_input() {
        let samples = [
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 14, 59).unwrap(),
            Utc.with_ymd_and_hms(2023, 6, 15, 23, 59, 59).unwrap(),
            Utc.with_ymd_and_hms(2023, 12, 31, 9, 15, 0).unwrap(),
        ];
        for t in samples {
            let once = round_down_to_grid(t);
            assert!(once <= t);
            assert_eq!(round_down_to_grid(once), once);
            assert_eq!(once.second(), 0);
            assert_eq!(once.minute() as i64 % GRID_MINUTES, 0);
        }
    }

    #[test]
    fn test_round_down_zeroes_subseconds() {
        let t = Utc
            .with_ymd_and_hms(2023, 1, 1, 0, 15, 0)
            .unwrap()
            .with_nanosecond(123_456_789)
            .unwrap();
        assert_eq!(
            round_down_to_grid(t),
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 15, 0).unwrap()
        );
    }

    #[test]
    fn test_intervals_between() {
        let a = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(grid_intervals_between(a, a), 0);
        assert_eq!(grid_intervals_between(a, a + grid_step()), 1);
        assert_eq!(grid_intervals_between(a, a + Duration::days(1)), INTERVALS_PER_DAY);
    }

    #[test]
    fn test_intervals_between_one_hour_gap() {
        let latest = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2023, 1, 1, 1, 0, 0).unwrap();
        assert_eq!(grid_intervals_between(latest, now), 4);
    }

    #[test]
    fn test_intervals_per_day() {
        assert_eq!(INTERVALS_PER_DAY, 96);
    }
}
